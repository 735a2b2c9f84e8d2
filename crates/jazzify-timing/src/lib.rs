//! Musical clock: time sources and the transport that turns a clock
//! reading into measure/beat position.

pub mod musical;
pub mod source;
pub mod transport;

pub use musical::{beat_to_ms, loop_length_ms, measure_beat_to_ms, ms_per_beat, target_time_ms};
pub use source::{AudioClock, ManualClock, ManualPlayback, PlaybackClock, TimeSource, WallClock};
pub use transport::{RESYNC_EPSILON_MS, TickEvents, Transport, TransportState, compute_state};
