use std::collections::HashMap;

use jazzify_chord::{ChordResolver, ChordTable};
use jazzify_types::{Target, TargetId};

/// Octave the autoplayer voices chords in (C4 = 60).
const BASE_NOTE: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Play,
    Skip,
    Done,
}

/// Plays each active target's chord at `target + offset_ms`, deliberately
/// sitting out every `miss_every`-th target.
pub struct Autoplay {
    resolver: ChordTable,
    offset_ms: f64,
    miss_every: Option<u32>,
    seen: u32,
    plans: HashMap<TargetId, Plan>,
}

impl Autoplay {
    pub fn new(offset_ms: f64, miss_every: Option<u32>) -> Self {
        Self {
            resolver: ChordTable::new(),
            offset_ms,
            miss_every: miss_every.filter(|n| *n > 0),
            seen: 0,
            plans: HashMap::new(),
        }
    }

    /// Note events to send at `now_ms`, one per target that is due.
    pub fn due<'a>(
        &mut self,
        active: impl Iterator<Item = &'a Target>,
        now_ms: f64,
    ) -> Vec<Vec<u8>> {
        let mut events = Vec::new();
        let mut oldest: Option<TargetId> = None;
        for target in active {
            oldest = Some(oldest.map_or(target.id, |id| id.min(target.id)));
            let plan = *self.plans.entry(target.id).or_insert_with(|| {
                self.seen += 1;
                match self.miss_every {
                    Some(n) if self.seen % n == 0 => Plan::Skip,
                    _ => Plan::Play,
                }
            });
            if plan != Plan::Play || now_ms < target.target_time_ms + self.offset_ms {
                continue;
            }
            self.plans.insert(target.id, Plan::Done);
            match self.resolver.resolve(&target.chord) {
                Some(classes) => events.push(classes.iter().map(|pc| BASE_NOTE + pc).collect()),
                None => log::warn!("autoplay cannot voice {:?}", target.chord),
            }
        }
        // Ids only grow, so anything older than the oldest active target is gone.
        if let Some(oldest) = oldest {
            self.plans.retain(|id, _| *id >= oldest);
        }
        events
    }
}
