use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub type FrameId = u64;

/// Scheduling port for the per-frame callback.
/// Implementations: PacedFrames (production), ManualFrames (testing).
pub trait FramePort {
    /// Schedule the next frame callback.
    fn request_frame(&mut self) -> FrameId;

    /// Cancel a pending callback. Unknown ids are ignored.
    fn cancel_frame(&mut self, id: FrameId);

    /// Id of a callback that is due now, if any. Each due frame is
    /// reported once.
    fn take_due(&mut self) -> Option<FrameId>;
}

#[derive(Debug, Default)]
struct ManualState {
    next_id: FrameId,
    pending: Option<FrameId>,
    requested: u32,
    cancelled: u32,
}

/// Deterministic frame port: every `take_due` fires the pending frame.
/// Clones share state so tests can inspect what the session scheduled.
#[derive(Debug, Clone, Default)]
pub struct ManualFrames {
    state: Rc<RefCell<ManualState>>,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<FrameId> {
        self.state.borrow().pending
    }

    pub fn requested(&self) -> u32 {
        self.state.borrow().requested
    }

    pub fn cancelled(&self) -> u32 {
        self.state.borrow().cancelled
    }
}

impl FramePort for ManualFrames {
    fn request_frame(&mut self) -> FrameId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.pending = Some(id);
        state.requested += 1;
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        let mut state = self.state.borrow_mut();
        if state.pending == Some(id) {
            state.pending = None;
            state.cancelled += 1;
        }
    }

    fn take_due(&mut self) -> Option<FrameId> {
        self.state.borrow_mut().pending.take()
    }
}

/// Best-effort fixed cadence backed by `Instant`. No catch-up: a late frame
/// simply fires late.
#[derive(Debug)]
pub struct PacedFrames {
    cadence: Duration,
    next_id: FrameId,
    due: Option<(FrameId, Instant)>,
}

impl PacedFrames {
    /// Roughly 60 frames per second.
    pub const DEFAULT_CADENCE: Duration = Duration::from_micros(16_667);

    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            next_id: 0,
            due: None,
        }
    }

    /// Time left until the pending frame is due; `None` if nothing is pending.
    pub fn until_due(&self) -> Option<Duration> {
        self.due
            .map(|(_, at)| at.saturating_duration_since(Instant::now()))
    }
}

impl Default for PacedFrames {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CADENCE)
    }
}

impl FramePort for PacedFrames {
    fn request_frame(&mut self) -> FrameId {
        let id = self.next_id;
        self.next_id += 1;
        self.due = Some((id, Instant::now() + self.cadence));
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if self.due.is_some_and(|(pending, _)| pending == id) {
            self.due = None;
        }
    }

    fn take_due(&mut self) -> Option<FrameId> {
        match self.due {
            Some((id, at)) if Instant::now() >= at => {
                self.due = None;
                Some(id)
            }
            _ => None,
        }
    }
}
