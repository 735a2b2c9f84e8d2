//! Fixtures shared by the engine crates' tests.

use crate::config::TimingConfig;
use crate::target::Target;

/// 120 BPM, 4/4, `measures` long, no count-in, no ready time.
pub fn config_120(measures: u32) -> TimingConfig {
    TimingConfig::new(120.0, 4, measures).expect("120 BPM 4/4 is a valid config")
}

/// A target at `time_ms` with a symmetric window of `tolerance_ms`.
pub fn target_at(id: u64, chord: &str, time_ms: f64, tolerance_ms: f64) -> Target {
    Target {
        id,
        chord: chord.to_string(),
        measure: 1,
        beat: 1.0,
        target_time_ms: time_ms,
        window_start_ms: time_ms - tolerance_ms,
        window_end_ms: time_ms + tolerance_ms,
        resolved: false,
        cycle: 0,
        progression_index: None,
    }
}
