use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PERFECT_MS, DEFAULT_TOLERANCE_MS, TimingConfig};
use crate::error::StageError;

/// How a stage produces its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Independent random draws from `allowed_chords`, redrawn every loop.
    #[default]
    #[serde(alias = "single")]
    Random,
    /// Fixed chord script replayed verbatim every loop.
    Progression,
}

/// An allowed chord, either a bare symbol or a voiced chord object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChordSpec {
    Symbol(String),
    Voiced {
        chord: String,
        #[serde(default)]
        octave: Option<u8>,
        #[serde(default)]
        inversion: Option<u8>,
    },
}

impl ChordSpec {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Symbol(symbol) => symbol,
            Self::Voiced { chord, .. } => chord,
        }
    }
}

impl From<&str> for ChordSpec {
    fn from(symbol: &str) -> Self {
        Self::Symbol(symbol.to_string())
    }
}

/// One scripted progression step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionEntry {
    pub chord: String,
    pub measure: u32,
    #[serde(default = "default_beat")]
    pub beat: f64,
}

impl ProgressionEntry {
    pub fn new(chord: &str, measure: u32, beat: f64) -> Self {
        Self {
            chord: chord.to_string(),
            measure,
            beat,
        }
    }
}

/// Externally supplied stage/session descriptor.
///
/// Catalog-only fields such as `question_count` and `enemy_gauge_seconds`
/// are accepted and ignored: loop length and target spacing decide how many
/// questions a cycle holds, and the gauge follows the next target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    #[serde(default)]
    pub stage_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub bpm: f64,
    #[serde(default = "default_time_signature")]
    pub time_signature: u32,
    pub measure_count: u32,
    #[serde(default)]
    pub count_in_measures: u32,
    #[serde(default)]
    pub mode: PlayMode,
    #[serde(default)]
    pub allowed_chords: Vec<ChordSpec>,
    #[serde(default)]
    pub chord_progression: Vec<ProgressionEntry>,
    /// Random mode only: evenly spaced targets per measure.
    #[serde(default = "default_one")]
    pub targets_per_measure: u32,
    #[serde(default = "default_tolerance_ms")]
    pub tolerance_ms: f64,
    #[serde(default = "default_perfect_ms")]
    pub perfect_window_ms: f64,
    #[serde(default)]
    pub ready_duration_ms: f64,
    /// How long before its hit time a target becomes visible.
    #[serde(default = "default_spawn_lead_ms")]
    pub spawn_lead_ms: f64,
    /// Player hit points.
    #[serde(default = "default_max_hp")]
    pub max_hp: u32,
    #[serde(default = "default_one")]
    pub enemy_count: u32,
    #[serde(default = "default_enemy_hp")]
    pub enemy_hp: u32,
    #[serde(default = "default_one")]
    pub min_damage: u32,
    #[serde(default = "default_one")]
    pub max_damage: u32,
}

fn default_beat() -> f64 {
    1.0
}

fn default_time_signature() -> u32 {
    4
}

fn default_one() -> u32 {
    1
}

fn default_tolerance_ms() -> f64 {
    DEFAULT_TOLERANCE_MS
}

fn default_perfect_ms() -> f64 {
    DEFAULT_PERFECT_MS
}

fn default_spawn_lead_ms() -> f64 {
    3000.0
}

fn default_max_hp() -> u32 {
    5
}

fn default_enemy_hp() -> u32 {
    5
}

impl StageDescriptor {
    /// A random-mode stage with defaults for everything but tempo and chords.
    pub fn random(bpm: f64, measure_count: u32, chords: &[&str]) -> Self {
        Self {
            stage_number: String::new(),
            name: String::new(),
            description: String::new(),
            bpm,
            time_signature: default_time_signature(),
            measure_count,
            count_in_measures: 0,
            mode: PlayMode::Random,
            allowed_chords: chords.iter().map(|c| ChordSpec::from(*c)).collect(),
            chord_progression: Vec::new(),
            targets_per_measure: 1,
            tolerance_ms: DEFAULT_TOLERANCE_MS,
            perfect_window_ms: DEFAULT_PERFECT_MS,
            ready_duration_ms: 0.0,
            spawn_lead_ms: default_spawn_lead_ms(),
            max_hp: default_max_hp(),
            enemy_count: 1,
            enemy_hp: default_enemy_hp(),
            min_damage: 1,
            max_damage: 1,
        }
    }

    /// A progression-mode stage replaying `entries`.
    pub fn progression(bpm: f64, measure_count: u32, entries: Vec<ProgressionEntry>) -> Self {
        Self {
            mode: PlayMode::Progression,
            allowed_chords: Vec::new(),
            chord_progression: entries,
            ..Self::random(bpm, measure_count, &[])
        }
    }

    pub fn from_json(json: &str) -> Result<Self, StageError> {
        let stage: Self =
            serde_json::from_str(json).map_err(|e| StageError::Parse(e.to_string()))?;
        stage.validate()?;
        Ok(stage)
    }

    pub fn timing_config(&self) -> Result<TimingConfig, StageError> {
        TimingConfig::builder()
            .bpm(self.bpm)
            .time_signature(self.time_signature)
            .measure_count(self.measure_count)
            .count_in_measures(self.count_in_measures)
            .window_tolerance_ms(self.tolerance_ms)
            .perfect_window_ms(self.perfect_window_ms)
            .ready_duration_ms(self.ready_duration_ms)
            .build()
    }

    /// Validate everything that can be checked before a session starts.
    pub fn validate(&self) -> Result<(), StageError> {
        let config = self.timing_config()?;

        if self.enemy_count == 0 || self.enemy_hp == 0 || self.max_hp == 0 {
            return Err(StageError::InvalidEncounter(
                "enemy count, enemy hp and player hp must be at least 1".to_string(),
            ));
        }
        if self.max_damage == 0 || self.min_damage > self.max_damage {
            return Err(StageError::InvalidEncounter(format!(
                "damage range {}..={} is empty",
                self.min_damage, self.max_damage
            )));
        }
        if !(self.spawn_lead_ms.is_finite() && self.spawn_lead_ms >= 0.0) {
            return Err(StageError::InvalidEncounter(format!(
                "spawn lead {}ms must be non-negative",
                self.spawn_lead_ms
            )));
        }

        let offsets = match self.mode {
            PlayMode::Random => {
                if self.allowed_chords.is_empty() {
                    return Err(StageError::EmptyChordSet);
                }
                if self.targets_per_measure == 0 {
                    return Err(StageError::ZeroTargetsPerMeasure);
                }
                random_grid_offsets(&config, self.targets_per_measure)
            }
            PlayMode::Progression => progression_offsets(&config, &self.chord_progression)?,
        };

        check_spacing(&config, &offsets)
    }
}

/// Beat offsets (0-based, from loop start) of an evenly spaced random grid.
pub fn random_grid_offsets(config: &TimingConfig, targets_per_measure: u32) -> Vec<f64> {
    let ts = config.time_signature() as f64;
    let step = ts / targets_per_measure.max(1) as f64;
    (0..config.measure_count())
        .flat_map(|m| {
            (0..targets_per_measure).map(move |k| m as f64 * ts + k as f64 * step)
        })
        .collect()
}

fn progression_offsets(
    config: &TimingConfig,
    entries: &[ProgressionEntry],
) -> Result<Vec<f64>, StageError> {
    let ts = config.time_signature() as f64;
    let mut offsets = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let in_range = (1..=config.measure_count()).contains(&entry.measure)
            && entry.beat.is_finite()
            && entry.beat >= 1.0
            && entry.beat < ts + 1.0;
        if !in_range {
            return Err(StageError::ProgressionOutOfRange {
                index,
                chord: entry.chord.clone(),
                measure: entry.measure,
                beat: entry.beat,
            });
        }
        let offset = (entry.measure - 1) as f64 * ts + (entry.beat - 1.0);
        if offsets.last().is_some_and(|&prev| offset <= prev) {
            return Err(StageError::ProgressionOutOfOrder { index });
        }
        offsets.push(offset);
    }
    Ok(offsets)
}

/// Reject schedules whose windows would overlap, including across the loop seam.
fn check_spacing(config: &TimingConfig, offsets: &[f64]) -> Result<(), StageError> {
    let (Some(first), Some(last)) = (offsets.first(), offsets.last()) else {
        return Ok(());
    };
    let seam = first + config.loop_beats() - last;
    let min_beats = offsets
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(seam, f64::min);
    let spacing_ms = min_beats * config.ms_per_beat();
    let tolerance_ms = config.window_tolerance_ms();
    if spacing_ms <= 2.0 * tolerance_ms {
        return Err(StageError::OverlappingWindows {
            spacing_ms,
            tolerance_ms,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_catalog_style_json() {
        let json = r#"{
            "stage_number": "6-5",
            "name": "Aurora Observatory",
            "bpm": 120,
            "measure_count": 8,
            "mode": "single",
            "allowed_chords": [
                {"chord": "Cdim", "octave": 4, "inversion": 0},
                "Ddim"
            ],
            "max_hp": 5,
            "enemy_count": 1,
            "enemy_hp": 5,
            "question_count": 8,
            "enemy_gauge_seconds": 4.0
        }"#;
        let stage = StageDescriptor::from_json(json).unwrap();
        assert_eq!(stage.mode, PlayMode::Random);
        assert_eq!(stage.allowed_chords[0].symbol(), "Cdim");
        assert_eq!(stage.allowed_chords[1].symbol(), "Ddim");
        assert_eq!(stage.time_signature, 4);
        assert!((stage.tolerance_ms - 200.0).abs() < f64::EPSILON);
        assert!((stage.spawn_lead_ms - 3000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_progression_with_default_beat() {
        let json = r#"{
            "bpm": 100,
            "measure_count": 4,
            "mode": "progression",
            "chord_progression": [
                {"chord": "Dm7", "measure": 1},
                {"chord": "G7", "measure": 2, "beat": 3},
                {"chord": "CM7", "measure": 3}
            ]
        }"#;
        let stage = StageDescriptor::from_json(json).unwrap();
        assert_eq!(stage.mode, PlayMode::Progression);
        assert!((stage.chord_progression[0].beat - 1.0).abs() < f64::EPSILON);
        assert!((stage.chord_progression[1].beat - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = StageDescriptor::from_json("{\"bpm\": }");
        assert!(matches!(result, Err(StageError::Parse(_))));
    }

    #[test]
    fn empty_chord_set_rejected_in_random_mode() {
        let stage = StageDescriptor::random(120.0, 4, &[]);
        assert_eq!(stage.validate(), Err(StageError::EmptyChordSet));
    }

    #[test]
    fn empty_progression_is_valid() {
        let stage = StageDescriptor::progression(120.0, 4, Vec::new());
        assert_eq!(stage.validate(), Ok(()));
    }

    #[test]
    fn progression_outside_loop_rejected() {
        let stage =
            StageDescriptor::progression(120.0, 2, vec![ProgressionEntry::new("C", 3, 1.0)]);
        assert!(matches!(
            stage.validate(),
            Err(StageError::ProgressionOutOfRange { index: 0, .. })
        ));

        let stage =
            StageDescriptor::progression(120.0, 2, vec![ProgressionEntry::new("C", 1, 5.0)]);
        assert!(matches!(
            stage.validate(),
            Err(StageError::ProgressionOutOfRange { .. })
        ));
    }

    #[test]
    fn progression_must_be_strictly_increasing() {
        let stage = StageDescriptor::progression(
            120.0,
            4,
            vec![
                ProgressionEntry::new("C", 2, 1.0),
                ProgressionEntry::new("F", 1, 1.0),
            ],
        );
        assert_eq!(
            stage.validate(),
            Err(StageError::ProgressionOutOfOrder { index: 1 })
        );
    }

    #[test]
    fn overlapping_windows_rejected() {
        // 240 BPM -> 250ms per beat; two targets one beat apart overlap at 200ms tolerance.
        let stage = StageDescriptor::progression(
            240.0,
            2,
            vec![
                ProgressionEntry::new("C", 1, 1.0),
                ProgressionEntry::new("F", 1, 2.0),
            ],
        );
        assert!(matches!(
            stage.validate(),
            Err(StageError::OverlappingWindows { .. })
        ));
    }

    #[test]
    fn random_grid_spacing_checked() {
        let mut stage = StageDescriptor::random(120.0, 2, &["C"]);
        stage.targets_per_measure = 4;
        // 500ms spacing > 400ms: fine.
        assert_eq!(stage.validate(), Ok(()));
        stage.targets_per_measure = 8;
        assert!(matches!(
            stage.validate(),
            Err(StageError::OverlappingWindows { .. })
        ));
    }

    #[test]
    fn random_grid_offsets_are_evenly_spaced() {
        let config = TimingConfig::new(120.0, 4, 2).unwrap();
        let offsets = random_grid_offsets(&config, 2);
        assert_eq!(offsets, vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn invalid_damage_range_rejected() {
        let mut stage = StageDescriptor::random(120.0, 4, &["C"]);
        stage.min_damage = 3;
        stage.max_damage = 2;
        assert!(matches!(
            stage.validate(),
            Err(StageError::InvalidEncounter(_))
        ));
    }

    #[test]
    fn huge_measure_count_validates() {
        let json = r#"{
            "bpm": 120,
            "measure_count": 2000000000,
            "mode": "progression",
            "chord_progression": [{"chord": "C", "measure": 1}]
        }"#;
        let stage = StageDescriptor::from_json(json).unwrap();
        let config = stage.timing_config().unwrap();
        assert!((config.loop_beats() - 8_000_000_000.0).abs() < 1.0);
    }

    proptest! {
        #[test]
        fn random_grid_accepted_iff_windows_are_apart(
            bpm in 40.0f64..240.0,
            measures in 1u32..6,
            per_measure in 1u32..8,
        ) {
            let mut stage = StageDescriptor::random(bpm, measures, &["C"]);
            stage.targets_per_measure = per_measure;
            let spacing_ms = 4.0 / per_measure as f64 * 60_000.0 / bpm;
            prop_assume!((spacing_ms - 2.0 * DEFAULT_TOLERANCE_MS).abs() > 1e-6);
            prop_assert_eq!(stage.validate().is_ok(), spacing_ms > 2.0 * DEFAULT_TOLERANCE_MS);
        }

        #[test]
        fn grid_offsets_stay_inside_loop(measures in 1u32..16, per_measure in 1u32..8) {
            let config = TimingConfig::new(120.0, 4, measures).unwrap();
            let offsets = random_grid_offsets(&config, per_measure);
            prop_assert_eq!(offsets.len(), (measures * per_measure) as usize);
            prop_assert!(offsets.windows(2).all(|w| w[1] > w[0]));
            prop_assert!(offsets.iter().all(|&o| (0.0..config.loop_beats()).contains(&o)));
        }
    }
}
