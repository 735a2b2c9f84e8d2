use thiserror::Error;

/// Configuration errors. These are fatal at stage load time and never
/// deferred into the running session.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StageError {
    #[error("bpm must be a positive finite number, got {bpm}")]
    NonPositiveBpm { bpm: f64 },

    #[error("time signature must be at least 1 beat per measure")]
    ZeroTimeSignature,

    #[error("measure count must be at least 1")]
    ZeroMeasureCount,

    #[error("window tolerance must be a non-negative finite number, got {tolerance_ms}ms")]
    NegativeTolerance { tolerance_ms: f64 },

    #[error("perfect window {perfect_ms}ms must lie within 0..={tolerance_ms}ms")]
    InvalidPerfectWindow { perfect_ms: f64, tolerance_ms: f64 },

    #[error("ready duration must be a non-negative finite number, got {ready_ms}ms")]
    NegativeReadyDuration { ready_ms: f64 },

    #[error("random mode requires at least one allowed chord")]
    EmptyChordSet,

    #[error("random mode requires at least one target per measure")]
    ZeroTargetsPerMeasure,

    #[error("progression entry {index} ({chord} at {measure}:{beat}) lies outside the loop")]
    ProgressionOutOfRange {
        index: usize,
        chord: String,
        measure: u32,
        beat: f64,
    },

    #[error("progression entry {index} is not strictly after the previous entry")]
    ProgressionOutOfOrder { index: usize },

    #[error("judgment windows overlap: targets {spacing_ms}ms apart with tolerance {tolerance_ms}ms")]
    OverlappingWindows { spacing_ms: f64, tolerance_ms: f64 },

    #[error("invalid encounter: {0}")]
    InvalidEncounter(String),

    #[error("failed to parse stage descriptor: {0}")]
    Parse(String),
}
