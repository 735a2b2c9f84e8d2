//! Shared data model for the rhythm timing and judgment engine.

pub mod config;
pub mod error;
pub mod judgment;
pub mod stage;
pub mod target;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{DEFAULT_PERFECT_MS, DEFAULT_TOLERANCE_MS, TimingConfig, TimingConfigBuilder};
pub use error::StageError;
pub use judgment::{Classification, JudgmentResult};
pub use stage::{ChordSpec, PlayMode, ProgressionEntry, StageDescriptor};
pub use target::{Target, TargetId};
