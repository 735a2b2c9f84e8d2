use std::fmt;

pub const SEMITONES: u8 = 12;

/// A set of pitch classes (0 = C .. 11 = B), stored as a 12-bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PitchClassSet(u16);

impl PitchClassSet {
    const MASK: u16 = (1 << SEMITONES) - 1;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from pitch classes; values are reduced modulo 12.
    pub fn from_classes(classes: &[u8]) -> Self {
        let mut set = Self::empty();
        for &pc in classes {
            set.insert(pc);
        }
        set
    }

    /// Build from raw note numbers (e.g. MIDI), ignoring octave.
    pub fn from_notes(notes: &[u8]) -> Self {
        Self::from_classes(notes)
    }

    pub fn insert(&mut self, class: u8) {
        self.0 |= 1 << (class % SEMITONES);
    }

    pub fn contains(self, class: u8) -> bool {
        self.0 & (1 << (class % SEMITONES)) != 0
    }

    /// Every class in `other` is also in `self`.
    pub fn is_superset_of(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Transpose every class upward by `semitones`.
    pub fn transposed(self, semitones: u8) -> Self {
        let shift = u32::from(semitones % SEMITONES);
        let bits = u32::from(self.0);
        let rotated = (bits << shift) | (bits >> (u32::from(SEMITONES) - shift));
        Self(rotated as u16 & Self::MASK)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..SEMITONES).filter(move |&pc| self.contains(pc))
    }

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PitchClassSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<u8> for PitchClassSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::empty();
        for pc in iter {
            set.insert(pc);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn notes_reduce_to_pitch_classes() {
        let set = PitchClassSet::from_notes(&[60, 64, 67, 72]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 4, 7]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn superset_tolerates_extra_classes() {
        let required = PitchClassSet::from_classes(&[0, 4, 7]);
        let played = PitchClassSet::from_classes(&[0, 2, 4, 7, 11]);
        assert!(played.is_superset_of(required));
        assert!(!required.is_superset_of(played));
    }

    #[test]
    fn transpose_wraps_at_octave() {
        let c_major = PitchClassSet::from_classes(&[0, 4, 7]);
        let a_major = c_major.transposed(9);
        assert_eq!(a_major.iter().collect::<Vec<_>>(), vec![1, 4, 9]);
        assert_eq!(c_major.transposed(12), c_major);
    }

    #[test]
    fn debug_lists_classes() {
        let set = PitchClassSet::from_classes(&[7, 0]);
        assert_eq!(format!("{set:?}"), "{0, 7}");
    }

    proptest! {
        #[test]
        fn empty_set_is_subset_of_everything(bits in 0u16..4096) {
            let set = PitchClassSet::from_iter((0..12u8).filter(|pc| bits & (1 << pc) != 0));
            prop_assert!(set.is_superset_of(PitchClassSet::empty()));
            prop_assert_eq!(set.len(), bits.count_ones() as usize);
        }

        #[test]
        fn transpose_preserves_size(bits in 0u16..4096, shift in 0u8..24) {
            let set = PitchClassSet::from_iter((0..12u8).filter(|pc| bits & (1 << pc) != 0));
            prop_assert_eq!(set.transposed(shift).len(), set.len());
        }
    }
}
