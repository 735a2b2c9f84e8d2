use std::collections::VecDeque;

use jazzify_types::{Target, TargetId};

/// How long a note stays visible after its hit time.
pub const DEFAULT_LINGER_MS: f64 = 600.0;
/// Upper bound on simultaneously tracked notes.
pub const DEFAULT_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Pending,
    Hit,
    Missed,
}

/// Presentation-side record of an upcoming target.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedNote {
    pub target_id: TargetId,
    pub chord: String,
    pub target_time_ms: f64,
    /// When the approach animation begins.
    pub appear_at_ms: f64,
    pub state: NoteState,
}

impl SpawnedNote {
    /// Approach progress in `[0, 1]`: 0 when the note appears, 1 at its hit time.
    pub fn approach_progress(&self, now_ms: f64) -> f64 {
        let span = self.target_time_ms - self.appear_at_ms;
        if span <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.appear_at_ms) / span).clamp(0.0, 1.0)
    }
}

/// Bounded list of upcoming notes, spawned on measure changes and culled
/// by a per-frame filter.
#[derive(Debug, Clone)]
pub struct SpawnManager {
    lead_ms: f64,
    linger_ms: f64,
    capacity: usize,
    notes: VecDeque<SpawnedNote>,
    spawned_through: Option<TargetId>,
}

impl SpawnManager {
    pub fn new(lead_ms: f64) -> Self {
        Self {
            lead_ms,
            linger_ms: DEFAULT_LINGER_MS,
            capacity: DEFAULT_CAPACITY,
            notes: VecDeque::new(),
            spawned_through: None,
        }
    }

    pub fn with_linger_ms(mut self, linger_ms: f64) -> Self {
        self.linger_ms = linger_ms;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn lead_ms(&self) -> f64 {
        self.lead_ms
    }

    /// Spawn every not-yet-spawned target that will start its approach
    /// before `now_ms + horizon_ms`. Targets must be in id order.
    ///
    /// Returns the number of notes spawned.
    pub fn on_measure(&mut self, now_ms: f64, targets: &[Target], horizon_ms: f64) -> usize {
        let limit = now_ms + horizon_ms;
        let mut spawned = 0;
        for target in targets {
            if self.spawned_through.is_some_and(|last| target.id <= last) {
                continue;
            }
            let appear_at_ms = target.target_time_ms - self.lead_ms;
            if appear_at_ms > limit {
                break;
            }
            self.notes.push_back(SpawnedNote {
                target_id: target.id,
                chord: target.chord.clone(),
                target_time_ms: target.target_time_ms,
                appear_at_ms,
                state: NoteState::Pending,
            });
            self.spawned_through = Some(target.id);
            spawned += 1;
        }
        while self.notes.len() > self.capacity {
            self.notes.pop_front();
        }
        spawned
    }

    /// Drop notes whose presentation lifetime has elapsed.
    pub fn cull(&mut self, now_ms: f64) -> usize {
        let before = self.notes.len();
        let linger = self.linger_ms;
        self.notes
            .retain(|note| note.target_time_ms + linger > now_ms);
        before - self.notes.len()
    }

    /// Update the state of a spawned note. Unknown ids are ignored.
    pub fn mark(&mut self, target_id: TargetId, state: NoteState) {
        if let Some(note) = self.notes.iter_mut().find(|n| n.target_id == target_id) {
            note.state = state;
        }
    }

    pub fn notes(&self) -> impl Iterator<Item = &SpawnedNote> {
        self.notes.iter()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
        self.spawned_through = None;
    }
}
