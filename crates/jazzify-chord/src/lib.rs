//! Chord-symbol to pitch-class resolution.

pub mod pitch;
pub mod resolver;

pub use pitch::{PitchClassSet, SEMITONES};
pub use resolver::{ChordResolver, ChordTable, parse_root};
