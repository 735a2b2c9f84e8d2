use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;

use jazzify_chord::ChordTable;
use jazzify_play::{Encounter, FramePort, ManualFrames, Outcome, PacedFrames, Session, Tally};
use jazzify_timing::{AudioClock, ManualClock, TimeSource, Transport, WallClock};
use jazzify_types::StageDescriptor;

use crate::autoplay::Autoplay;
use crate::drift::DriftingPlayback;

/// Simulated frame length when not running in real time.
pub const SIM_FRAME_MS: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ClockKind {
    /// Free-running reference clock.
    Wall,
    /// Simulated audio playback, resynced at every loop end.
    Audio,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub seed: u64,
    pub clock: ClockKind,
    pub realtime: bool,
    pub accuracy_ms: f64,
    pub miss_every: Option<u32>,
    pub max_cycles: u32,
    pub drift: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            clock: ClockKind::Wall,
            realtime: false,
            accuracy_ms: 0.0,
            miss_every: None,
            max_cycles: 8,
            drift: 1.002,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub stage_name: String,
    pub outcome: Outcome,
    pub tally: Tally,
    pub player_hp: u32,
    pub player_max_hp: u32,
    pub enemies_defeated: usize,
    pub enemy_count: usize,
    pub cycles: u32,
    pub resyncs: u32,
    pub completed: bool,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "stage:    {}", self.stage_name)?;
        writeln!(f, "outcome:  {:?}", self.outcome)?;
        writeln!(
            f,
            "judged:   {} perfect, {} early, {} late, {} missed",
            self.tally.perfect, self.tally.early, self.tally.late, self.tally.miss
        )?;
        writeln!(
            f,
            "enemies:  {}/{} defeated ({} damage)",
            self.enemies_defeated, self.enemy_count, self.tally.damage_dealt
        )?;
        writeln!(f, "hp:       {}/{}", self.player_hp, self.player_max_hp)?;
        write!(f, "cycles:   {} ({} resyncs)", self.cycles, self.resyncs)
    }
}

pub fn load_stage(path: &Path) -> Result<StageDescriptor> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read stage file {}", path.display()))?;
    StageDescriptor::from_json(&json)
        .with_context(|| format!("invalid stage file {}", path.display()))
}

/// How the session's clock is advanced.
enum Driver {
    Simulated(ManualClock),
    Realtime,
}

fn time_source(options: &RunOptions) -> (Box<dyn TimeSource>, Driver) {
    match (options.realtime, options.clock) {
        (false, ClockKind::Wall) => {
            let clock = ManualClock::new();
            (Box::new(clock.clone()), Driver::Simulated(clock))
        }
        (false, ClockKind::Audio) => {
            let clock = ManualClock::new();
            let playback = DriftingPlayback::new(clock.clone(), options.drift);
            (
                Box::new(AudioClock::new(clock.clone(), playback)),
                Driver::Simulated(clock),
            )
        }
        (true, ClockKind::Wall) => (Box::new(WallClock::new()), Driver::Realtime),
        (true, ClockKind::Audio) => {
            let playback = DriftingPlayback::new(WallClock::new(), options.drift);
            (
                Box::new(AudioClock::new(WallClock::new(), playback)),
                Driver::Realtime,
            )
        }
    }
}

/// Play `stage` with the autoplayer until the encounter ends or the cycle
/// cap is reached.
pub fn run(stage: &StageDescriptor, options: &RunOptions) -> Result<Summary> {
    let (source, driver) = time_source(options);
    let frames: Box<dyn FramePort> = match driver {
        Driver::Simulated(_) => Box::new(ManualFrames::new()),
        Driver::Realtime => Box::new(PacedFrames::default()),
    };
    let encounter = Encounter::from_stage(stage, StdRng::seed_from_u64(options.seed ^ 0x5eed));
    let mut session = Session::load_stage(
        stage,
        Transport::new(source),
        Box::new(ChordTable::new()),
        frames,
        encounter,
    )?
    .with_seed(options.seed);
    let mut autoplay = Autoplay::new(options.accuracy_ms, options.miss_every);

    session.start()?;
    while session.is_running() && session.cycle() < options.max_cycles {
        match &driver {
            Driver::Simulated(clock) => clock.advance(SIM_FRAME_MS),
            Driver::Realtime => thread::sleep(Duration::from_millis(1)),
        }
        if !session.pump() {
            continue;
        }
        let now = session.transport().position().elapsed_ms;
        for notes in autoplay.due(session.active_questions(), now) {
            session.handle_input(&notes);
        }
    }

    let resyncs = session.transport().resync_count();
    let cycles = session.cycle() + 1;
    if session.is_running() {
        log::info!("cycle cap of {} reached", options.max_cycles);
    }
    session.dispose();

    let encounter = session.into_listener();
    Ok(Summary {
        stage_name: stage.name.clone(),
        outcome: encounter.outcome(),
        tally: *encounter.tally(),
        player_hp: encounter.player_hp(),
        player_max_hp: encounter.player_max_hp(),
        enemies_defeated: encounter.enemies().iter().filter(|e| e.defeated).count(),
        enemy_count: encounter.enemies().len(),
        cycles,
        resyncs,
        completed: encounter.completed(),
    })
}
