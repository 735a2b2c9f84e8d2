use crate::error::StageError;

/// Default judgment half-window in milliseconds.
pub const DEFAULT_TOLERANCE_MS: f64 = 200.0;
/// Default half-width of the "perfect" band in milliseconds.
pub const DEFAULT_PERFECT_MS: f64 = 50.0;

/// Immutable per-session timing parameters.
///
/// Fields are private so a validated config cannot be mutated after
/// construction; use [`TimingConfig::builder`] to create one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingConfig {
    bpm: f64,
    time_signature: u32,
    measure_count: u32,
    count_in_measures: u32,
    window_tolerance_ms: f64,
    perfect_window_ms: f64,
    ready_duration_ms: f64,
}

impl TimingConfig {
    /// Shorthand for a config with default tolerance, no count-in and no ready time.
    pub fn new(bpm: f64, time_signature: u32, measure_count: u32) -> Result<Self, StageError> {
        Self::builder()
            .bpm(bpm)
            .time_signature(time_signature)
            .measure_count(measure_count)
            .build()
    }

    pub fn builder() -> TimingConfigBuilder {
        TimingConfigBuilder::default()
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn time_signature(&self) -> u32 {
        self.time_signature
    }

    pub fn measure_count(&self) -> u32 {
        self.measure_count
    }

    pub fn count_in_measures(&self) -> u32 {
        self.count_in_measures
    }

    pub fn window_tolerance_ms(&self) -> f64 {
        self.window_tolerance_ms
    }

    pub fn perfect_window_ms(&self) -> f64 {
        self.perfect_window_ms
    }

    pub fn ready_duration_ms(&self) -> f64 {
        self.ready_duration_ms
    }

    pub fn ms_per_beat(&self) -> f64 {
        60_000.0 / self.bpm
    }

    pub fn measure_ms(&self) -> f64 {
        self.ms_per_beat() * self.time_signature as f64
    }

    pub fn count_in_beats(&self) -> f64 {
        self.count_in_measures as f64 * self.time_signature as f64
    }

    pub fn count_in_ms(&self) -> f64 {
        self.count_in_beats() * self.ms_per_beat()
    }

    /// Beats in one loop cycle (count-in excluded).
    pub fn loop_beats(&self) -> f64 {
        self.measure_count as f64 * self.time_signature as f64
    }

    pub fn loop_length_ms(&self) -> f64 {
        self.loop_beats() * self.ms_per_beat()
    }
}

/// Builder for [`TimingConfig`]. Unset fields fall back to defaults
/// (120 BPM, 4/4, 4 measures, 200ms tolerance, 50ms perfect band).
#[derive(Debug, Default)]
pub struct TimingConfigBuilder {
    bpm: Option<f64>,
    time_signature: Option<u32>,
    measure_count: Option<u32>,
    count_in_measures: Option<u32>,
    window_tolerance_ms: Option<f64>,
    perfect_window_ms: Option<f64>,
    ready_duration_ms: Option<f64>,
}

impl TimingConfigBuilder {
    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = Some(bpm);
        self
    }

    pub fn time_signature(mut self, beats: u32) -> Self {
        self.time_signature = Some(beats);
        self
    }

    pub fn measure_count(mut self, measures: u32) -> Self {
        self.measure_count = Some(measures);
        self
    }

    pub fn count_in_measures(mut self, measures: u32) -> Self {
        self.count_in_measures = Some(measures);
        self
    }

    pub fn window_tolerance_ms(mut self, ms: f64) -> Self {
        self.window_tolerance_ms = Some(ms);
        self
    }

    pub fn perfect_window_ms(mut self, ms: f64) -> Self {
        self.perfect_window_ms = Some(ms);
        self
    }

    pub fn ready_duration_ms(mut self, ms: f64) -> Self {
        self.ready_duration_ms = Some(ms);
        self
    }

    pub fn build(self) -> Result<TimingConfig, StageError> {
        let window_tolerance_ms = self.window_tolerance_ms.unwrap_or(DEFAULT_TOLERANCE_MS);
        let config = TimingConfig {
            bpm: self.bpm.unwrap_or(120.0),
            time_signature: self.time_signature.unwrap_or(4),
            measure_count: self.measure_count.unwrap_or(4),
            count_in_measures: self.count_in_measures.unwrap_or(0),
            window_tolerance_ms,
            // An unset perfect band never exceeds a narrowed tolerance.
            perfect_window_ms: self
                .perfect_window_ms
                .unwrap_or(DEFAULT_PERFECT_MS.min(window_tolerance_ms)),
            ready_duration_ms: self.ready_duration_ms.unwrap_or(0.0),
        };
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &TimingConfig) -> Result<(), StageError> {
    if !(config.bpm.is_finite() && config.bpm > 0.0) {
        return Err(StageError::NonPositiveBpm { bpm: config.bpm });
    }
    if config.time_signature == 0 {
        return Err(StageError::ZeroTimeSignature);
    }
    if config.measure_count == 0 {
        return Err(StageError::ZeroMeasureCount);
    }
    let tolerance_ms = config.window_tolerance_ms;
    if !(tolerance_ms.is_finite() && tolerance_ms >= 0.0) {
        return Err(StageError::NegativeTolerance { tolerance_ms });
    }
    let perfect_ms = config.perfect_window_ms;
    if !(perfect_ms.is_finite() && (0.0..=tolerance_ms).contains(&perfect_ms)) {
        return Err(StageError::InvalidPerfectWindow {
            perfect_ms,
            tolerance_ms,
        });
    }
    let ready_ms = config.ready_duration_ms;
    if !(ready_ms.is_finite() && ready_ms >= 0.0) {
        return Err(StageError::NegativeReadyDuration { ready_ms });
    }
    Ok(())
}
