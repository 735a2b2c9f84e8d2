use std::collections::HashMap;

use crate::pitch::PitchClassSet;

/// Chord-symbol lookup. `None` means the symbol is unknown; callers must
/// treat it as unsatisfiable rather than substituting a default.
pub trait ChordResolver {
    fn resolve(&self, symbol: &str) -> Option<PitchClassSet>;
}

/// Intervals above the root for each supported quality suffix.
const QUALITIES: &[(&str, &[u8])] = &[
    ("", &[0, 4, 7]),
    ("m", &[0, 3, 7]),
    ("dim", &[0, 3, 6]),
    ("aug", &[0, 4, 8]),
    ("+", &[0, 4, 8]),
    ("sus2", &[0, 2, 7]),
    ("sus4", &[0, 5, 7]),
    ("6", &[0, 4, 7, 9]),
    ("m6", &[0, 3, 7, 9]),
    ("7", &[0, 4, 7, 10]),
    ("M7", &[0, 4, 7, 11]),
    ("maj7", &[0, 4, 7, 11]),
    ("m7", &[0, 3, 7, 10]),
    ("m7b5", &[0, 3, 6, 10]),
    ("m/maj7", &[0, 3, 7, 11]),
    ("mM7", &[0, 3, 7, 11]),
    ("aug7", &[0, 4, 8, 10]),
    ("dim7", &[0, 3, 6, 9]),
    ("7sus4", &[0, 5, 7, 10]),
    ("add9", &[0, 2, 4, 7]),
];

/// Parse a note name such as `C`, `F#` or `Bb` at the start of `text`.
/// Returns the pitch class and the number of bytes consumed.
pub fn parse_root(text: &str) -> Option<(u8, usize)> {
    let mut chars = text.chars();
    let natural = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    match chars.next() {
        Some('#') | Some('♯') => Some(((natural + 1) % 12, 1 + chars_len_of(text, 1))),
        Some('b') | Some('♭') => Some(((natural + 11) % 12, 1 + chars_len_of(text, 1))),
        _ => Some((natural, 1)),
    }
}

fn chars_len_of(text: &str, nth: usize) -> usize {
    text.chars().nth(nth).map_or(0, char::len_utf8)
}

/// Built-in chord table. Construct once at the composition root and share
/// by reference.
#[derive(Debug, Clone)]
pub struct ChordTable {
    qualities: HashMap<&'static str, PitchClassSet>,
    overrides: HashMap<String, PitchClassSet>,
}

impl Default for ChordTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordTable {
    pub fn new() -> Self {
        let qualities = QUALITIES
            .iter()
            .map(|(suffix, intervals)| (*suffix, PitchClassSet::from_classes(intervals)))
            .collect();
        Self {
            qualities,
            overrides: HashMap::new(),
        }
    }

    /// Register or replace the pitch classes for an exact symbol.
    pub fn with_override(mut self, symbol: &str, classes: PitchClassSet) -> Self {
        self.overrides.insert(symbol.to_string(), classes);
        self
    }

    fn resolve_rooted(&self, symbol: &str) -> Option<PitchClassSet> {
        let (root, consumed) = parse_root(symbol)?;
        let suffix = &symbol[consumed..];
        self.qualities
            .get(suffix)
            .map(|intervals| intervals.transposed(root))
    }
}

impl ChordResolver for ChordTable {
    fn resolve(&self, symbol: &str) -> Option<PitchClassSet> {
        let symbol = symbol.trim();
        if let Some(classes) = self.overrides.get(symbol) {
            return Some(*classes);
        }
        if let Some(classes) = self.resolve_rooted(symbol) {
            return Some(classes);
        }
        // Slash chord: upper structure plus a bass note, e.g. "C/E".
        let (upper, bass) = symbol.rsplit_once('/')?;
        let (bass_class, consumed) = parse_root(bass)?;
        if consumed != bass.len() {
            return None;
        }
        let mut classes = self.resolve_rooted(upper)?;
        classes.insert(bass_class);
        Some(classes)
    }
}

impl<R: ChordResolver + ?Sized> ChordResolver for &R {
    fn resolve(&self, symbol: &str) -> Option<PitchClassSet> {
        (**self).resolve(symbol)
    }
}
