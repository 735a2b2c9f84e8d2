use jazzify_chord::{ChordResolver, PitchClassSet};
use jazzify_types::{Classification, JudgmentResult, Target, TimingConfig};

/// Whether `now_ms` lies within `tolerance_ms` of `target_ms`, inclusive.
pub fn in_window(now_ms: f64, target_ms: f64, tolerance_ms: f64) -> bool {
    (now_ms - target_ms).abs() <= tolerance_ms
}

/// Timing thresholds for classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgeWindows {
    pub perfect_ms: f64,
    pub tolerance_ms: f64,
}

impl JudgeWindows {
    pub fn new(perfect_ms: f64, tolerance_ms: f64) -> Self {
        Self {
            perfect_ms,
            tolerance_ms,
        }
    }

    pub fn from_config(config: &TimingConfig) -> Self {
        Self::new(config.perfect_window_ms(), config.window_tolerance_ms())
    }

    pub fn in_window(&self, now_ms: f64, target_ms: f64) -> bool {
        in_window(now_ms, target_ms, self.tolerance_ms)
    }

    /// Classify `now_ms` against `target_ms`. Both thresholds are closed.
    pub fn classify(&self, now_ms: f64, target_ms: f64) -> JudgmentResult {
        let signed_error_ms = now_ms - target_ms;
        let abs_error = signed_error_ms.abs();
        let classification = if abs_error <= self.perfect_ms {
            Classification::Perfect
        } else if abs_error > self.tolerance_ms {
            Classification::Miss
        } else if signed_error_ms > 0.0 {
            Classification::Late
        } else {
            Classification::Early
        };
        JudgmentResult {
            classification,
            signed_error_ms,
        }
    }
}

impl Default for JudgeWindows {
    fn default() -> Self {
        Self::new(
            jazzify_types::DEFAULT_PERFECT_MS,
            jazzify_types::DEFAULT_TOLERANCE_MS,
        )
    }
}

/// A target whose window is open, with the pitch classes seen so far.
#[derive(Debug, Clone)]
pub struct ActiveTarget {
    pub target: Target,
    /// `None` when the chord could not be resolved; such a target can only fail.
    required: Option<PitchClassSet>,
    observed: PitchClassSet,
}

impl ActiveTarget {
    pub fn new(target: Target, required: Option<PitchClassSet>) -> Self {
        Self {
            target,
            required,
            observed: PitchClassSet::empty(),
        }
    }

    pub fn required(&self) -> Option<PitchClassSet> {
        self.required
    }

    pub fn observed(&self) -> PitchClassSet {
        self.observed
    }

    pub fn is_satisfiable(&self) -> bool {
        self.required.is_some()
    }

    /// Accumulate `input` and report whether every required class has now
    /// been observed. Extra classes never invalidate a match.
    pub fn observe(&mut self, input: PitchClassSet) -> bool {
        self.observed = self.observed.union(input);
        self.is_covered()
    }

    pub fn is_covered(&self) -> bool {
        self.required
            .is_some_and(|required| self.observed.is_superset_of(required))
    }
}

/// Matches live input against the active targets.
pub struct JudgmentEngine {
    windows: JudgeWindows,
    resolver: Box<dyn ChordResolver>,
}

impl JudgmentEngine {
    pub fn new(windows: JudgeWindows, resolver: Box<dyn ChordResolver>) -> Self {
        Self { windows, resolver }
    }

    pub fn windows(&self) -> &JudgeWindows {
        &self.windows
    }

    /// Resolve the target's chord and open it for input.
    pub fn arm(&self, target: Target) -> ActiveTarget {
        let required = self.resolver.resolve(&target.chord);
        if required.is_none() {
            log::warn!(
                "chord {:?} (target {}) cannot be resolved; it will fail at window close",
                target.chord,
                target.id
            );
        }
        ActiveTarget::new(target, required)
    }

    /// Feed one input event to every active target still inside its window.
    ///
    /// Returns the indices (into `active`) of targets the input completed,
    /// each with its timing judgment. A single event may complete several.
    pub fn judge_input(
        &self,
        active: &mut [ActiveTarget],
        notes: &[u8],
        now_ms: f64,
    ) -> Vec<(usize, JudgmentResult)> {
        let input = PitchClassSet::from_notes(notes);
        active
            .iter_mut()
            .enumerate()
            .filter(|(_, entry)| entry.target.window_contains(now_ms))
            .filter_map(|(index, entry)| {
                entry
                    .observe(input)
                    .then(|| (index, self.windows.classify(now_ms, entry.target.target_time_ms)))
            })
            .collect()
    }
}
