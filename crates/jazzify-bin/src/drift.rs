use jazzify_timing::{PlaybackClock, TimeSource};

/// Simulated audio playback whose position runs at `rate` times the
/// reference clock, so the transport has real drift to resync against.
pub struct DriftingPlayback<C> {
    reference: C,
    rate: f64,
    base_ms: f64,
    anchor_ms: f64,
}

impl<C: TimeSource> DriftingPlayback<C> {
    pub fn new(reference: C, rate: f64) -> Self {
        let anchor_ms = reference.now_ms();
        Self {
            reference,
            rate,
            base_ms: 0.0,
            anchor_ms,
        }
    }
}

impl<C: TimeSource> PlaybackClock for DriftingPlayback<C> {
    fn position_ms(&self) -> f64 {
        self.base_ms + (self.reference.now_ms() - self.anchor_ms) * self.rate
    }

    fn seek_ms(&mut self, position_ms: f64) {
        self.base_ms = position_ms;
        self.anchor_ms = self.reference.now_ms();
    }
}
