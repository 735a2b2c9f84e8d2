//! Session engine: question generation, judgment, the cooperative loop
//! driver and the presentation-side spawn list.

pub mod encounter;
pub mod frame;
pub mod generator;
pub mod judge;
pub mod listener;
pub mod session;
pub mod spawn;

pub use encounter::{Encounter, Enemy, Outcome, PERFECT_BONUS, Tally};
pub use frame::{FrameId, FramePort, ManualFrames, PacedFrames};
pub use generator::{QuestionGenerator, SchedulePlan};
pub use judge::{ActiveTarget, JudgeWindows, JudgmentEngine, in_window};
pub use listener::SessionListener;
pub use session::{MAX_FRAME_DELTA_MS, Phase, Session};
pub use spawn::{DEFAULT_CAPACITY, DEFAULT_LINGER_MS, NoteState, SpawnManager, SpawnedNote};
