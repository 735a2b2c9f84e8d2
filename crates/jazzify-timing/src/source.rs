use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Abstraction over time sources.
/// Implementations: WallClock (production), ManualClock (testing and
/// headless simulation), AudioClock (playback-synchronized).
pub trait TimeSource {
    /// Current time in milliseconds from an arbitrary epoch.
    fn now_ms(&self) -> f64;

    /// Playback capability. Sources that expose one are resynchronized
    /// against the audio position at every loop boundary.
    fn playback(&mut self) -> Option<&mut dyn PlaybackClock> {
        None
    }
}

/// An audio playback position that can be read and seeked.
pub trait PlaybackClock {
    /// Offset into the audio track in milliseconds.
    fn position_ms(&self) -> f64;

    /// Jump the playback to `position_ms`.
    fn seek_ms(&mut self, position_ms: f64);
}

/// Free-running clock backed by `Instant`.
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually stepped clock. Clones share the same reading, so a test can keep
/// a handle while the transport owns another.
#[derive(Clone, Default)]
pub struct ManualClock {
    current_ms: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, ms: f64) {
        self.current_ms.set(ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.current_ms.set(self.current_ms.get() + delta_ms);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> f64 {
        self.current_ms.get()
    }
}

/// Manually driven playback position. Clones share state; `seek_count`
/// records how often the transport resynced it.
#[derive(Clone, Default)]
pub struct ManualPlayback {
    position_ms: Rc<Cell<f64>>,
    seeks: Rc<Cell<u32>>,
}

impl ManualPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&self, ms: f64) {
        self.position_ms.set(ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.position_ms.set(self.position_ms.get() + delta_ms);
    }

    pub fn seek_count(&self) -> u32 {
        self.seeks.get()
    }
}

impl PlaybackClock for ManualPlayback {
    fn position_ms(&self) -> f64 {
        self.position_ms.get()
    }

    fn seek_ms(&mut self, position_ms: f64) {
        self.position_ms.set(position_ms);
        self.seeks.set(self.seeks.get() + 1);
    }
}

/// A reference clock paired with an audio playback position.
///
/// The reference clock times the ready/pre-roll segment; after that the
/// playback position is authoritative.
pub struct AudioClock<C, P> {
    reference: C,
    playback: P,
}

impl<C: TimeSource, P: PlaybackClock> AudioClock<C, P> {
    pub fn new(reference: C, playback: P) -> Self {
        Self {
            reference,
            playback,
        }
    }
}

impl<C: TimeSource, P: PlaybackClock> TimeSource for AudioClock<C, P> {
    fn now_ms(&self) -> f64 {
        self.reference.now_ms()
    }

    fn playback(&mut self) -> Option<&mut dyn PlaybackClock> {
        Some(&mut self.playback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advance() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_ms(), 0.0);
        clock.advance(1000.0);
        assert_eq!(clock.now_ms(), 1000.0);
        clock.advance(500.0);
        assert_eq!(clock.now_ms(), 1500.0);
    }

    #[test]
    fn manual_clock_clones_share_reading() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.set_time(5000.0);
        assert_eq!(clock.now_ms(), 5000.0);
    }

    #[test]
    fn wall_clock_monotonic() {
        let clock = WallClock::new();
        let t1 = clock.now_ms();
        let t2 = clock.now_ms();
        assert!(t2 >= t1);
    }

    #[test]
    fn only_audio_clock_exposes_playback() {
        let mut wall = WallClock::new();
        assert!(wall.playback().is_none());

        let playback = ManualPlayback::new();
        let mut audio = AudioClock::new(ManualClock::new(), playback.clone());
        let port = audio.playback().unwrap();
        port.seek_ms(250.0);
        assert_eq!(playback.position_ms(), 250.0);
        assert_eq!(playback.seek_count(), 1);
    }
}
