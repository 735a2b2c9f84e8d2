use rand::SeedableRng;
use rand::rngs::StdRng;

use jazzify_chord::ChordResolver;
use jazzify_timing::Transport;
use jazzify_types::{JudgmentResult, StageDescriptor, StageError, Target, TargetId, TimingConfig};

use crate::frame::{FrameId, FramePort};
use crate::generator::{QuestionGenerator, SchedulePlan};
use crate::judge::{ActiveTarget, JudgeWindows, JudgmentEngine};
use crate::listener::{SessionListener, dispatch, poll_complete};
use crate::spawn::{NoteState, SpawnManager};

/// Upper bound on the per-frame delta handed to presentation code.
pub const MAX_FRAME_DELTA_MS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Stopped,
    Disposed,
}

/// One stage being played: owns the transport, the generated targets and
/// the judgment state, and reports outcomes to a [`SessionListener`].
///
/// Driven cooperatively: the owner calls [`Session::pump`] whenever its
/// frame port may have a due callback, and [`Session::handle_input`] for
/// every input event.
pub struct Session<L: SessionListener> {
    stage_name: String,
    config: TimingConfig,
    plan: SchedulePlan,
    transport: Transport,
    judge: JudgmentEngine,
    generator: QuestionGenerator,
    frames: Box<dyn FramePort>,
    listener: L,
    rng: StdRng,
    spawner: SpawnManager,
    targets: Vec<Target>,
    active: Vec<ActiveTarget>,
    phase: Phase,
    cycle: u32,
    generated: bool,
    pending_frame: Option<FrameId>,
    last_frame_ms: Option<f64>,
    frame_delta_ms: f64,
}

impl<L: SessionListener> Session<L> {
    /// Validate `stage` and wire up a session for it. Invalid configuration
    /// is rejected here rather than surfacing mid-session.
    pub fn load_stage(
        stage: &StageDescriptor,
        transport: Transport,
        resolver: Box<dyn ChordResolver>,
        frames: Box<dyn FramePort>,
        listener: L,
    ) -> Result<Self, StageError> {
        stage.validate()?;
        let config = stage.timing_config()?;
        Ok(Self {
            stage_name: stage.name.clone(),
            config,
            plan: SchedulePlan::from_stage(stage),
            transport,
            judge: JudgmentEngine::new(JudgeWindows::from_config(&config), resolver),
            generator: QuestionGenerator::new(config),
            frames,
            listener,
            rng: StdRng::from_entropy(),
            spawner: SpawnManager::new(stage.spawn_lead_ms),
            targets: Vec::new(),
            active: Vec::new(),
            phase: Phase::Idle,
            cycle: 0,
            generated: false,
            pending_frame: None,
            last_frame_ms: None,
            frame_delta_ms: 0.0,
        })
    }

    /// Use a fixed seed for random chord draws.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Generate the first cycle's targets ahead of `start`. Idempotent.
    pub fn prepare(&mut self) -> Result<(), StageError> {
        if !self.generated {
            self.targets = self.generator.generate(&self.plan, 0, &mut self.rng)?;
            self.generated = true;
        }
        Ok(())
    }

    /// `idle -> running`. Starting a session that already left `idle` is a no-op.
    pub fn start(&mut self) -> Result<(), StageError> {
        if self.phase != Phase::Idle {
            log::warn!("start ignored: session is {:?}", self.phase);
            return Ok(());
        }
        self.prepare()?;
        self.transport.set_start(self.config);
        self.phase = Phase::Running;
        self.spawner
            .on_measure(0.0, &self.targets, self.config.measure_ms());
        self.pending_frame = Some(self.frames.request_frame());
        log::info!(
            "session {:?} started: {:?} mode, {} targets per cycle",
            self.stage_name,
            self.plan.mode(),
            self.targets.len()
        );
        Ok(())
    }

    /// Run the frame callback if the frame port reports it due.
    ///
    /// Returns whether a tick ran.
    pub fn pump(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        match self.frames.take_due() {
            Some(id) if Some(id) == self.pending_frame => {
                self.pending_frame = None;
                self.tick();
                if self.phase == Phase::Running {
                    self.pending_frame = Some(self.frames.request_frame());
                }
                true
            }
            Some(id) => {
                log::debug!("ignoring stale frame {id}");
                false
            }
            None => false,
        }
    }

    /// One scheduling step. A no-op unless the session is running.
    pub fn tick(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        let events = self.transport.tick();
        let position = *self.transport.position();
        let now = position.elapsed_ms;

        if let Some(last) = self.last_frame_ms {
            self.frame_delta_ms = (now - last).clamp(0.0, MAX_FRAME_DELTA_MS);
        }
        self.last_frame_ms = Some(now);

        if events.looped {
            log::debug!("transport loop {} at {now:.1}ms", position.loop_index);
        }
        if events.measure_changed {
            self.spawner
                .on_measure(now, &self.targets, self.config.measure_ms());
            dispatch(&mut self.listener, "on_measure", |l| l.on_measure(&position));
        }

        self.expire_active(now);
        self.sweep_targets(now);
        self.spawner.cull(now);
        self.check_completion(now);
    }

    /// Feed one input event (raw note numbers) to the active targets.
    ///
    /// Returns the number of targets the event completed. Ignored unless
    /// the session is running.
    pub fn handle_input(&mut self, notes: &[u8]) -> usize {
        if self.phase != Phase::Running {
            return 0;
        }
        let Some(now) = self.transport.sample_elapsed_ms() else {
            return 0;
        };

        // Bring the active set up to date with the input timestamp.
        self.expire_active(now);
        self.sweep_targets(now);

        let mut hits = self.judge.judge_input(&mut self.active, notes, now);
        hits.sort_by_key(|(index, _)| std::cmp::Reverse(*index));
        let mut completed: Vec<(TargetId, JudgmentResult)> = hits
            .into_iter()
            .map(|(index, judgment)| (self.active.remove(index).target.id, judgment))
            .collect();
        completed.reverse();

        for (id, judgment) in &completed {
            self.resolve_success(*id, judgment);
        }
        self.check_completion(now);
        completed.len()
    }

    /// Cancel the pending frame, clear the active set and stop the clock.
    /// Safe to call repeatedly or before `start`.
    pub fn stop(&mut self) {
        self.halt();
        if self.phase != Phase::Disposed {
            self.phase = Phase::Stopped;
        }
    }

    /// Stop and release per-session state. Idempotent.
    pub fn dispose(&mut self) {
        self.halt();
        self.targets.clear();
        self.spawner.clear();
        self.phase = Phase::Disposed;
    }

    fn halt(&mut self) {
        if let Some(id) = self.pending_frame.take() {
            self.frames.cancel_frame(id);
        }
        self.active.clear();
        self.transport.stop();
        self.last_frame_ms = None;
    }

    fn complete(&mut self) {
        log::info!(
            "session {:?} complete after {} cycle(s)",
            self.stage_name,
            self.cycle + 1
        );
        self.stop();
        dispatch(&mut self.listener, "on_game_complete", |l| l.on_game_complete());
    }

    fn expire_active(&mut self, now: f64) {
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|entry| entry.target.is_expired(now));
        self.active = live;
        for entry in expired {
            self.resolve_failed(entry.target.id);
        }
    }

    /// Activate targets whose window now contains `now`, and fail any that
    /// were skipped over entirely without ever being activated.
    fn sweep_targets(&mut self, now: f64) {
        let mut to_activate = Vec::new();
        let mut to_fail = Vec::new();
        for target in &self.targets {
            if target.window_start_ms > now {
                break;
            }
            if target.resolved || self.active.iter().any(|a| a.target.id == target.id) {
                continue;
            }
            if target.is_expired(now) {
                to_fail.push(target.id);
            } else {
                to_activate.push(target.clone());
            }
        }

        for id in to_fail {
            log::debug!("target {id} passed without activation");
            self.resolve_failed(id);
        }
        for target in to_activate {
            log::debug!(
                "activated {} (target {}, due {:.1}ms)",
                target.chord,
                target.id,
                target.target_time_ms
            );
            self.active.push(self.judge.arm(target.clone()));
            dispatch(&mut self.listener, "on_question_activated", |l| {
                l.on_question_activated(&target)
            });
        }
    }

    fn resolve_failed(&mut self, id: TargetId) {
        let Some(target) = self.mark_resolved(id) else {
            return;
        };
        self.spawner.mark(id, NoteState::Missed);
        log::debug!("target {id} ({}) failed", target.chord);
        dispatch(&mut self.listener, "on_attack_fail", |l| l.on_attack_fail(&target));
    }

    fn resolve_success(&mut self, id: TargetId, judgment: &JudgmentResult) {
        let Some(target) = self.mark_resolved(id) else {
            return;
        };
        self.spawner.mark(id, NoteState::Hit);
        log::debug!(
            "target {id} ({}) hit: {} ({:+.1}ms)",
            target.chord,
            judgment.classification.label(),
            judgment.signed_error_ms
        );
        dispatch(&mut self.listener, "on_attack_success", |l| {
            l.on_attack_success(&target, judgment)
        });
    }

    /// Mark `id` resolved; `None` if it is unknown or was already resolved.
    fn mark_resolved(&mut self, id: TargetId) -> Option<Target> {
        let target = self
            .targets
            .iter_mut()
            .find(|t| t.id == id && !t.resolved)?;
        target.resolved = true;
        Some(target.clone())
    }

    fn check_completion(&mut self, now: f64) {
        if self.phase != Phase::Running {
            return;
        }
        if poll_complete(&self.listener) {
            self.complete();
            return;
        }
        if !self.targets.iter().all(|t| t.resolved) {
            return;
        }
        if self.targets.is_empty() {
            self.complete();
            return;
        }
        self.next_cycle(now);
    }

    fn next_cycle(&mut self, now: f64) {
        let cycle = self.cycle + 1;
        match self.generator.generate(&self.plan, cycle, &mut self.rng) {
            Ok(targets) => {
                self.cycle = cycle;
                self.targets = targets;
                self.spawner
                    .on_measure(now, &self.targets, self.config.measure_ms());
                log::debug!("cycle {cycle}: {} targets", self.targets.len());
                dispatch(&mut self.listener, "on_loop", |l| l.on_loop(cycle));
            }
            Err(e) => {
                log::error!("failed to generate cycle {cycle}: {e}");
                self.stop();
            }
        }
    }

    /// Visual progress in `[0, 1]` toward the next unresolved target:
    /// 0 one measure or more before it, 1 at its hit time.
    pub fn gauge_progress(&self, now_ms: f64) -> f64 {
        let Some(next) = self.targets.iter().find(|t| !t.resolved) else {
            return 0.0;
        };
        let remaining = next.target_time_ms - now_ms;
        (1.0 - remaining / self.config.measure_ms()).clamp(0.0, 1.0)
    }

    /// Targets whose window is currently open.
    pub fn active_questions(&self) -> impl Iterator<Item = &Target> {
        self.active.iter().map(|entry| &entry.target)
    }

    /// Targets of the current cycle, resolved or not.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn progression_index(&self) -> u64 {
        self.generator.progression_index()
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn spawner(&self) -> &SpawnManager {
        &self.spawner
    }

    /// Clamped time between the last two ticks.
    pub fn frame_delta_ms(&self) -> f64 {
        self.frame_delta_ms
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }
}
