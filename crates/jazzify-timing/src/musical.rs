//! Conversions between musical position and milliseconds.

use jazzify_types::TimingConfig;

pub fn ms_per_beat(bpm: f64) -> f64 {
    60_000.0 / bpm
}

/// Duration of `beats` beats at `bpm`.
pub fn beat_to_ms(beats: f64, bpm: f64) -> f64 {
    beats * ms_per_beat(bpm)
}

/// Absolute time of a 1-based `(measure, beat)` on the session timeline.
///
/// Count-in and ready time are folded in so every downstream comparison
/// uses one timeline.
pub fn measure_beat_to_ms(
    measure: u32,
    beat: f64,
    bpm: f64,
    time_signature: u32,
    count_in_measures: u32,
    ready_duration_ms: f64,
) -> f64 {
    let measures_before = measure as f64 - 1.0 + count_in_measures as f64;
    let beats_before_measure = measures_before * time_signature as f64;
    ready_duration_ms + beat_to_ms(beats_before_measure + (beat - 1.0), bpm)
}

/// Length of one loop of `measure_count` measures, count-in excluded.
pub fn loop_length_ms(measure_count: u32, time_signature: u32, bpm: f64) -> f64 {
    beat_to_ms(measure_count as f64 * time_signature as f64, bpm)
}

/// [`measure_beat_to_ms`] with the parameters taken from `config`.
pub fn target_time_ms(config: &TimingConfig, measure: u32, beat: f64) -> f64 {
    measure_beat_to_ms(
        measure,
        beat,
        config.bpm(),
        config.time_signature(),
        config.count_in_measures(),
        config.ready_duration_ms(),
    )
}
