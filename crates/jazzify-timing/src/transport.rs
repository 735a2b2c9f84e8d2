use jazzify_types::TimingConfig;

use crate::source::TimeSource;

/// How close to the loop end the playback may get before it is pulled back.
pub const RESYNC_EPSILON_MS: f64 = 2.0;

/// Musical position derived on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    /// Reference-clock reading captured by `set_start`.
    pub start_ms: f64,
    /// Unwrapped session time. Never jumps back at loop boundaries.
    pub elapsed_ms: f64,
    /// 1-based measure within the loop. Zero or negative during count-in.
    pub current_measure: i32,
    /// 1-based, fractional beat within the measure.
    pub current_beat: f64,
    pub is_count_in: bool,
    /// True while the ready/pre-roll segment is still running.
    pub is_pre_roll: bool,
    pub loop_index: u32,
    /// Beats since the end of count-in. Keeps climbing across loops;
    /// negative during count-in.
    pub absolute_beat: f64,
}

impl TransportState {
    fn initial(start_ms: f64) -> Self {
        Self {
            start_ms,
            elapsed_ms: 0.0,
            current_measure: 1,
            current_beat: 1.0,
            is_count_in: false,
            is_pre_roll: true,
            loop_index: 0,
            absolute_beat: 0.0,
        }
    }
}

/// Edge events observed by one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEvents {
    pub measure_changed: bool,
    pub beat_changed: bool,
    /// A loop boundary was crossed (or the playback was resynced).
    pub looped: bool,
}

/// Maps a time source reading to musical position.
///
/// A source without playback capability is treated as free-running; one
/// with a [`PlaybackClock`](crate::source::PlaybackClock) is hard-resynced
/// at every loop boundary instead of being allowed to drift.
pub struct Transport {
    source: Box<dyn TimeSource>,
    config: Option<TimingConfig>,
    state: TransportState,
    last_measure: Option<(u32, i32)>,
    last_beat: Option<i64>,
    resync_count: u32,
    /// Whether the playback has been aligned to the end of the ready segment.
    playback_aligned: bool,
}

impl Transport {
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self {
            source,
            config: None,
            state: TransportState::initial(0.0),
            last_measure: None,
            last_beat: None,
            resync_count: 0,
            playback_aligned: false,
        }
    }

    /// Reading of the underlying reference clock.
    pub fn now_ms(&self) -> f64 {
        self.source.now_ms()
    }

    pub fn is_started(&self) -> bool {
        self.config.is_some()
    }

    /// Initialize the start instant from the time source.
    pub fn set_start(&mut self, config: TimingConfig) {
        let now = self.source.now_ms();
        self.set_start_at(config, now);
    }

    /// Initialize the start instant explicitly and reset to the pre-roll state.
    pub fn set_start_at(&mut self, config: TimingConfig, now_ms: f64) {
        if let Some(playback) = self.source.playback() {
            playback.seek_ms(0.0);
        }
        self.config = Some(config);
        self.state = TransportState::initial(now_ms);
        self.last_measure = None;
        self.last_beat = None;
        self.resync_count = 0;
        self.playback_aligned = config.ready_duration_ms() <= 0.0;
        log::debug!(
            "transport started at {now_ms:.1}ms ({} bpm, {} beats x {} measures)",
            config.bpm(),
            config.time_signature(),
            config.measure_count()
        );
    }

    /// Tear down the session clock. Later ticks are no-ops until restarted.
    pub fn stop(&mut self) {
        self.config = None;
        self.state = TransportState::initial(0.0);
        self.last_measure = None;
        self.last_beat = None;
        self.playback_aligned = false;
    }

    pub fn position(&self) -> &TransportState {
        &self.state
    }

    pub fn config(&self) -> Option<&TimingConfig> {
        self.config.as_ref()
    }

    pub fn loop_index(&self) -> u32 {
        self.state.loop_index
    }

    pub fn absolute_beat(&self) -> f64 {
        self.state.absolute_beat
    }

    /// Number of hard resyncs performed against the playback clock.
    pub fn resync_count(&self) -> u32 {
        self.resync_count
    }

    /// Unwrapped session time, or `None` before `set_start`.
    pub fn elapsed_ms(&self) -> Option<f64> {
        self.config.map(|_| self.state.elapsed_ms)
    }

    /// Fresh unwrapped session time for input timestamps. Unlike `tick`, this
    /// never seeks the playback or touches the derived position.
    pub fn sample_elapsed_ms(&mut self) -> Option<f64> {
        let config = self.config?;
        let wall_elapsed = self.source.now_ms() - self.state.start_ms;
        let resyncs = self.resync_count as f64;
        Some(match self.source.playback() {
            Some(playback)
                if self.playback_aligned && wall_elapsed >= config.ready_duration_ms() =>
            {
                config.ready_duration_ms()
                    + playback.position_ms().max(0.0)
                    + resyncs * config.loop_length_ms()
            }
            _ => wall_elapsed,
        })
    }

    /// Recompute the position from the time source.
    pub fn tick(&mut self) -> TickEvents {
        let Some(config) = self.config else {
            return TickEvents::default();
        };

        let wall_elapsed = self.source.now_ms() - self.state.start_ms;
        let mut resynced = false;
        let elapsed = match self.source.playback() {
            Some(playback) if wall_elapsed >= config.ready_duration_ms() => {
                let loop_start = config.count_in_ms();
                let loop_len = config.loop_length_ms();
                let loop_end = loop_start + loop_len;
                if !self.playback_aligned {
                    // Playback position 0 is the end of the ready segment,
                    // whenever the playback itself was started.
                    playback.seek_ms(wall_elapsed - config.ready_duration_ms());
                    self.playback_aligned = true;
                }
                let mut position = playback.position_ms();
                if position >= loop_end - RESYNC_EPSILON_MS {
                    let over = position - loop_start;
                    let loops = ((over + RESYNC_EPSILON_MS) / loop_len).floor().max(1.0);
                    position = loop_start + (over - loops * loop_len).max(0.0);
                    playback.seek_ms(position);
                    self.resync_count += loops as u32;
                    resynced = true;
                }
                if resynced {
                    self.last_measure = None;
                    self.last_beat = None;
                    log::debug!(
                        "playback resynced to {position:.1}ms (resync #{})",
                        self.resync_count
                    );
                }
                config.ready_duration_ms()
                    + position.max(0.0)
                    + self.resync_count as f64 * loop_len
            }
            _ => wall_elapsed,
        };

        self.state = compute_state(&config, self.state.start_ms, elapsed);
        self.edge_events(resynced)
    }

    fn edge_events(&mut self, resynced: bool) -> TickEvents {
        let mut events = TickEvents {
            looped: resynced,
            ..TickEvents::default()
        };
        if self.state.is_pre_roll {
            return events;
        }

        let measure_key = (self.state.loop_index, self.state.current_measure);
        if matches!(self.last_measure, Some((prev_loop, _)) if prev_loop != self.state.loop_index) {
            events.looped = true;
        }
        if self.last_measure != Some(measure_key) {
            events.measure_changed = true;
            self.last_measure = Some(measure_key);
        }

        let beat_index = self.state.absolute_beat.floor() as i64;
        if self.last_beat != Some(beat_index) {
            events.beat_changed = true;
            self.last_beat = Some(beat_index);
        }
        events
    }
}

/// Pure position computation for an unwrapped elapsed time.
pub fn compute_state(config: &TimingConfig, start_ms: f64, elapsed_ms: f64) -> TransportState {
    let mut state = TransportState::initial(start_ms);
    state.elapsed_ms = elapsed_ms;

    let ready = config.ready_duration_ms();
    if elapsed_ms < ready {
        return state;
    }
    state.is_pre_roll = false;

    let ts = config.time_signature() as f64;
    let beats_from_start = (elapsed_ms - ready) / config.ms_per_beat();
    let count_in_beats = config.count_in_beats();
    state.absolute_beat = beats_from_start - count_in_beats;

    if beats_from_start < count_in_beats {
        state.is_count_in = true;
        let count_in_measure = (beats_from_start / ts).floor() as i32;
        state.current_measure = count_in_measure - config.count_in_measures() as i32 + 1;
        state.current_beat = beats_from_start.rem_euclid(ts) + 1.0;
        return state;
    }

    let play_beats = beats_from_start - count_in_beats;
    let loop_beats = config.loop_beats();
    let loop_index = (play_beats / loop_beats).floor();
    let in_loop = play_beats - loop_index * loop_beats;
    state.loop_index = loop_index as u32;
    state.current_measure = (in_loop / ts).floor() as i32 + 1;
    state.current_beat = in_loop.rem_euclid(ts) + 1.0;
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{AudioClock, ManualClock, ManualPlayback, PlaybackClock};
    use jazzify_types::test_support::config_120;

    fn manual_transport() -> (Transport, ManualClock) {
        let clock = ManualClock::new();
        (Transport::new(Box::new(clock.clone())), clock)
    }

    #[test]
    fn tick_before_start_is_noop() {
        let (mut transport, clock) = manual_transport();
        clock.set_time(10_000.0);
        assert_eq!(transport.tick(), TickEvents::default());
        assert!(!transport.is_started());
        assert_eq!(transport.elapsed_ms(), None);
        assert_eq!(transport.position().current_measure, 1);
    }

    #[test]
    fn pre_roll_holds_initial_position() {
        let config = TimingConfig::builder()
            .ready_duration_ms(1000.0)
            .count_in_measures(1)
            .build()
            .unwrap();
        let (mut transport, clock) = manual_transport();
        transport.set_start(config);
        clock.advance(999.0);
        transport.tick();
        let pos = transport.position();
        assert!(pos.is_pre_roll);
        assert_eq!(pos.current_measure, 1);
        assert!((pos.current_beat - 1.0).abs() < 1e-9);
        assert!(!pos.is_count_in);
    }

    #[test]
    fn count_in_measures_are_non_positive() {
        let config = TimingConfig::builder().count_in_measures(2).build().unwrap();
        let (mut transport, clock) = manual_transport();
        transport.set_start(config);

        transport.tick();
        assert!(transport.position().is_count_in);
        assert_eq!(transport.position().current_measure, -1);

        clock.set_time(2500.0);
        transport.tick();
        let pos = transport.position();
        assert!(pos.is_count_in);
        assert_eq!(pos.current_measure, 0);
        assert!((pos.current_beat - 2.0).abs() < 1e-9);

        clock.set_time(4000.0);
        transport.tick();
        let pos = transport.position();
        assert!(!pos.is_count_in);
        assert_eq!(pos.current_measure, 1);
        assert!((pos.absolute_beat).abs() < 1e-9);
    }

    #[test]
    fn measure_and_beat_from_elapsed() {
        let (mut transport, clock) = manual_transport();
        transport.set_start(config_120(4));
        clock.set_time(3250.0);
        transport.tick();
        let pos = transport.position();
        assert_eq!(pos.current_measure, 2);
        assert!((pos.current_beat - 3.5).abs() < 1e-9);
        assert_eq!(pos.loop_index, 0);
    }

    #[test]
    fn free_running_loop_wraps_but_absolute_beat_climbs() {
        let (mut transport, clock) = manual_transport();
        transport.set_start(config_120(2));
        transport.tick();

        clock.set_time(4000.0);
        let events = transport.tick();
        let pos = *transport.position();
        assert!(events.looped);
        assert!(events.measure_changed);
        assert_eq!(pos.loop_index, 1);
        assert_eq!(pos.current_measure, 1);
        assert!((pos.absolute_beat - 8.0).abs() < 1e-9);
    }

    #[test]
    fn measure_change_fires_once_per_measure() {
        let (mut transport, clock) = manual_transport();
        transport.set_start(config_120(4));
        assert!(transport.tick().measure_changed);
        clock.set_time(500.0);
        let events = transport.tick();
        assert!(!events.measure_changed);
        assert!(events.beat_changed);
        clock.set_time(2000.0);
        assert!(transport.tick().measure_changed);
    }

    #[test]
    fn stop_returns_to_uninitialized() {
        let (mut transport, clock) = manual_transport();
        transport.set_start(config_120(4));
        clock.set_time(1000.0);
        transport.tick();
        transport.stop();
        transport.stop();
        assert!(!transport.is_started());
        assert_eq!(transport.tick(), TickEvents::default());
    }

    #[test]
    fn playback_resyncs_at_loop_end() {
        let clock = ManualClock::new();
        let playback = ManualPlayback::new();
        let mut transport =
            Transport::new(Box::new(AudioClock::new(clock.clone(), playback.clone())));
        // 2 measures at 120 BPM: loop is 4000ms.
        transport.set_start(config_120(2));
        assert_eq!(playback.seek_count(), 1);

        clock.set_time(3000.0);
        playback.set_position(3000.0);
        transport.tick();
        assert_eq!(transport.position().current_measure, 2);

        // Drifted playback almost at the loop end.
        clock.set_time(3990.0);
        playback.set_position(3999.0);
        let events = transport.tick();
        assert!(events.looped);
        assert!(events.measure_changed);
        assert_eq!(transport.resync_count(), 1);
        assert_eq!(playback.seek_count(), 2);
        assert!(playback.position_ms().abs() < 1e-9);

        let pos = transport.position();
        assert_eq!(pos.loop_index, 1);
        assert_eq!(pos.current_measure, 1);
        assert!((pos.elapsed_ms - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn playback_elapsed_is_monotonic_across_resync() {
        let clock = ManualClock::new();
        let playback = ManualPlayback::new();
        let mut transport =
            Transport::new(Box::new(AudioClock::new(clock.clone(), playback.clone())));
        let config = TimingConfig::builder()
            .measure_count(1)
            .count_in_measures(1)
            .ready_duration_ms(500.0)
            .build()
            .unwrap();
        transport.set_start(config);

        let mut last = f64::MIN;
        for step in 0..200 {
            clock.advance(50.0);
            if step >= 10 {
                // Playback runs slightly fast.
                playback.advance(50.5);
            }
            transport.tick();
            let elapsed = transport.position().elapsed_ms;
            assert!(elapsed >= last, "elapsed went backwards at step {step}");
            last = elapsed;
        }
        assert!(transport.resync_count() >= 3);
        assert!(!transport.position().is_count_in);
    }

    #[test]
    fn sample_elapsed_does_not_seek() {
        let clock = ManualClock::new();
        let playback = ManualPlayback::new();
        let mut transport =
            Transport::new(Box::new(AudioClock::new(clock.clone(), playback.clone())));
        assert_eq!(transport.sample_elapsed_ms(), None);

        transport.set_start(config_120(2));
        clock.set_time(3990.0);
        playback.set_position(3999.0);
        let sampled = transport.sample_elapsed_ms().unwrap();
        assert!((sampled - 3999.0).abs() < 1e-9);
        assert_eq!(playback.seek_count(), 1);
        assert_eq!(transport.resync_count(), 0);
    }

    #[test]
    fn sample_elapsed_follows_wall_clock() {
        let (mut transport, clock) = manual_transport();
        clock.set_time(500.0);
        transport.set_start(config_120(4));
        clock.set_time(1730.0);
        assert_eq!(transport.sample_elapsed_ms(), Some(1230.0));
    }

    #[test]
    fn playback_aligned_when_ready_segment_ends() {
        let clock = ManualClock::new();
        let playback = ManualPlayback::new();
        let mut transport =
            Transport::new(Box::new(AudioClock::new(clock.clone(), playback.clone())));
        let config = TimingConfig::builder()
            .ready_duration_ms(1000.0)
            .count_in_measures(1)
            .build()
            .unwrap();
        transport.set_start(config);

        // Playback has been running since the start instant.
        clock.set_time(990.0);
        playback.set_position(990.0);
        transport.tick();
        assert!(transport.position().is_pre_roll);
        assert!((transport.sample_elapsed_ms().unwrap() - 990.0).abs() < 1e-9);

        clock.set_time(1010.0);
        playback.set_position(1010.0);
        transport.tick();
        let pos = *transport.position();
        assert!((pos.elapsed_ms - 1010.0).abs() < 1e-9);
        assert!(pos.is_count_in);
        assert_eq!(pos.current_measure, 0);
        assert!((pos.current_beat - 1.02).abs() < 1e-9);
        assert!((playback.position_ms() - 10.0).abs() < 1e-9);

        clock.set_time(1500.0);
        playback.advance(490.0);
        transport.tick();
        assert!((transport.position().elapsed_ms - 1500.0).abs() < 1e-9);
        assert_eq!(playback.seek_count(), 2);
    }

    #[test]
    fn overshoot_past_several_loops_counts_each_wrap() {
        let clock = ManualClock::new();
        let playback = ManualPlayback::new();
        let mut transport =
            Transport::new(Box::new(AudioClock::new(clock.clone(), playback.clone())));
        transport.set_start(config_120(2));

        clock.set_time(9000.0);
        playback.set_position(9100.0);
        let events = transport.tick();
        assert!(events.looped);
        assert_eq!(transport.resync_count(), 2);
        assert!((playback.position_ms() - 1100.0).abs() < 1e-9);

        let pos = transport.position();
        assert!((pos.elapsed_ms - 9100.0).abs() < 1e-9);
        assert_eq!(pos.loop_index, 2);
        assert_eq!(pos.current_measure, 1);
        assert!((pos.current_beat - 3.2).abs() < 1e-9);
    }

    #[test]
    fn playback_position_ignored_during_pre_roll() {
        let clock = ManualClock::new();
        let playback = ManualPlayback::new();
        let mut transport =
            Transport::new(Box::new(AudioClock::new(clock.clone(), playback.clone())));
        let config = TimingConfig::builder().ready_duration_ms(1000.0).build().unwrap();
        transport.set_start(config);
        clock.set_time(400.0);
        playback.set_position(9999.0);
        transport.tick();
        assert!(transport.position().is_pre_roll);
        assert_eq!(transport.resync_count(), 0);
    }
}
