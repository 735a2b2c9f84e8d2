use rand::Rng;
use rand::seq::SliceRandom;

use jazzify_timing::target_time_ms;
use jazzify_types::{
    PlayMode, ProgressionEntry, StageDescriptor, StageError, Target, TargetId, TimingConfig,
};

/// Where a cycle's chords come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulePlan {
    /// Independent uniform draws from `chords`, `targets_per_measure`
    /// evenly spaced targets per measure.
    Random {
        chords: Vec<String>,
        targets_per_measure: u32,
    },
    /// A fixed script replayed verbatim.
    Progression(Vec<ProgressionEntry>),
}

impl SchedulePlan {
    pub fn from_stage(stage: &StageDescriptor) -> Self {
        match stage.mode {
            PlayMode::Random => Self::Random {
                chords: stage
                    .allowed_chords
                    .iter()
                    .map(|spec| spec.symbol().to_string())
                    .collect(),
                targets_per_measure: stage.targets_per_measure,
            },
            PlayMode::Progression => Self::Progression(stage.chord_progression.clone()),
        }
    }

    pub fn mode(&self) -> PlayMode {
        match self {
            Self::Random { .. } => PlayMode::Random,
            Self::Progression(_) => PlayMode::Progression,
        }
    }
}

/// Builds the ordered target list for each loop cycle.
///
/// Ids and the progression index run across cycles; they are never reset.
#[derive(Debug, Clone)]
pub struct QuestionGenerator {
    config: TimingConfig,
    next_id: TargetId,
    progression_index: u64,
}

impl QuestionGenerator {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            next_id: 0,
            progression_index: 0,
        }
    }

    /// Number of progression steps issued so far in this session.
    pub fn progression_index(&self) -> u64 {
        self.progression_index
    }

    /// Generate the targets of loop `cycle`, offset by `cycle` loop lengths.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        plan: &SchedulePlan,
        cycle: u32,
        rng: &mut R,
    ) -> Result<Vec<Target>, StageError> {
        let slots = match plan {
            SchedulePlan::Random {
                chords,
                targets_per_measure,
            } => self.random_slots(chords, *targets_per_measure, rng)?,
            SchedulePlan::Progression(entries) => progression_slots(entries)?,
        };

        let offset_ms = cycle as f64 * self.config.loop_length_ms();
        let tolerance_ms = self.config.window_tolerance_ms();
        let targets = slots
            .into_iter()
            .map(|(chord, measure, beat)| {
                let time_ms = target_time_ms(&self.config, measure, beat) + offset_ms;
                let progression_index = matches!(plan, SchedulePlan::Progression(_)).then(|| {
                    let index = self.progression_index;
                    self.progression_index += 1;
                    index
                });
                let id = self.next_id;
                self.next_id += 1;
                Target {
                    id,
                    chord,
                    measure,
                    beat,
                    target_time_ms: time_ms,
                    window_start_ms: time_ms - tolerance_ms,
                    window_end_ms: time_ms + tolerance_ms,
                    resolved: false,
                    cycle,
                    progression_index,
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "generated {} {:?} targets for cycle {cycle}",
            targets.len(),
            plan.mode()
        );
        Ok(targets)
    }

    fn random_slots<R: Rng + ?Sized>(
        &self,
        chords: &[String],
        targets_per_measure: u32,
        rng: &mut R,
    ) -> Result<Vec<(String, u32, f64)>, StageError> {
        if chords.is_empty() {
            return Err(StageError::EmptyChordSet);
        }
        if targets_per_measure == 0 {
            return Err(StageError::ZeroTargetsPerMeasure);
        }
        let step = self.config.time_signature() as f64 / targets_per_measure as f64;
        let capacity = self.config.measure_count() * targets_per_measure;
        let mut slots = Vec::with_capacity(capacity as usize);
        for measure in 1..=self.config.measure_count() {
            for k in 0..targets_per_measure {
                let chord = chords.choose(rng).cloned().unwrap_or_default();
                slots.push((chord, measure, 1.0 + k as f64 * step));
            }
        }
        Ok(slots)
    }
}

fn progression_slots(
    entries: &[ProgressionEntry],
) -> Result<Vec<(String, u32, f64)>, StageError> {
    for (index, pair) in entries.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if (next.measure, next.beat) <= (prev.measure, prev.beat) {
            return Err(StageError::ProgressionOutOfOrder { index: index + 1 });
        }
    }
    Ok(entries
        .iter()
        .map(|entry| (entry.chord.clone(), entry.measure, entry.beat))
        .collect())
}
