#![allow(dead_code)]

use anyhow::Result;
use jazzify_chord::ChordTable;
use jazzify_play::{ManualFrames, Session, SessionListener};
use jazzify_timing::{ManualClock, TimeSource, Transport};
use jazzify_types::{Classification, JudgmentResult, StageDescriptor, Target, TargetId};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Activated(TargetId),
    Success(TargetId, Classification),
    Fail(TargetId),
    Loop(u32),
    Complete,
}

/// Records every callback; optionally reports completion after `goal` successes.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub goal: Option<usize>,
    pub progression_seen: Vec<Option<u64>>,
    pub chords_seen: Vec<String>,
}

impl Recorder {
    pub fn with_goal(goal: usize) -> Self {
        Self {
            goal: Some(goal),
            ..Self::default()
        }
    }

    pub fn successes(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Success(..)))
            .count()
    }

    pub fn fails(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Fail(_)))
            .count()
    }

    pub fn completions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Complete))
            .count()
    }
}

impl SessionListener for Recorder {
    fn on_question_activated(&mut self, target: &Target) -> Result<()> {
        self.events.push(Event::Activated(target.id));
        self.progression_seen.push(target.progression_index);
        self.chords_seen.push(target.chord.clone());
        Ok(())
    }

    fn on_attack_success(&mut self, target: &Target, judgment: &JudgmentResult) -> Result<()> {
        self.events
            .push(Event::Success(target.id, judgment.classification));
        Ok(())
    }

    fn on_attack_fail(&mut self, target: &Target) -> Result<()> {
        self.events.push(Event::Fail(target.id));
        Ok(())
    }

    fn on_game_complete(&mut self) -> Result<()> {
        self.events.push(Event::Complete);
        Ok(())
    }

    fn on_loop(&mut self, cycle: u32) -> Result<()> {
        self.events.push(Event::Loop(cycle));
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.goal.is_some_and(|goal| self.successes() >= goal)
    }
}

pub struct Harness<L: SessionListener> {
    pub session: Session<L>,
    pub clock: ManualClock,
    pub frames: ManualFrames,
}

impl<L: SessionListener> Harness<L> {
    pub fn new(stage: &StageDescriptor, listener: L) -> Self {
        let clock = ManualClock::new();
        let frames = ManualFrames::new();
        let session = Session::load_stage(
            stage,
            Transport::new(Box::new(clock.clone())),
            Box::new(ChordTable::new()),
            Box::new(frames.clone()),
            listener,
        )
        .expect("stage should load")
        .with_seed(7);
        Self {
            session,
            clock,
            frames,
        }
    }

    pub fn started(stage: &StageDescriptor, listener: L) -> Self {
        let mut harness = Self::new(stage, listener);
        harness.session.start().expect("stage should start");
        harness
    }

    /// Move the clock to `time_ms` and run the due frame.
    pub fn frame_at(&mut self, time_ms: f64) {
        self.clock.set_time(time_ms);
        self.session.pump();
    }

    /// Step frames of `step_ms` until `end_ms` (inclusive) or completion.
    pub fn run_until(&mut self, end_ms: f64, step_ms: f64) {
        let mut t = self.clock.now_ms();
        while t <= end_ms && self.session.is_running() {
            self.frame_at(t);
            t += step_ms;
        }
    }

    pub fn input_at(&mut self, time_ms: f64, notes: &[u8]) -> usize {
        self.clock.set_time(time_ms);
        self.session.handle_input(notes)
    }
}
