/// Session-unique identifier of a target. Ids increase with target time,
/// across loop cycles as well as within one.
pub type TargetId = u64;

/// A timed chord challenge ("question").
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: TargetId,
    pub chord: String,
    /// 1-based measure within the loop.
    pub measure: u32,
    /// 1-based beat within the measure; may be fractional.
    pub beat: f64,
    /// Absolute hit time on the session timeline.
    pub target_time_ms: f64,
    pub window_start_ms: f64,
    pub window_end_ms: f64,
    pub resolved: bool,
    /// Loop cycle this target belongs to (0 for the first pass).
    pub cycle: u32,
    /// Running position in the chord progression; `None` for random draws.
    pub progression_index: Option<u64>,
}

impl Target {
    /// Whether `now_ms` lies inside the inclusive judgment window.
    pub fn window_contains(&self, now_ms: f64) -> bool {
        now_ms >= self.window_start_ms && now_ms <= self.window_end_ms
    }

    /// Whether the window has closed strictly before `now_ms`.
    pub fn is_expired(&self, now_ms: f64) -> bool {
        now_ms > self.window_end_ms
    }
}
