//! Transposition table: a fixed-size, power-of-two array of slots
//! keyed by Zobrist hash, with depth-preferred replacement (spec.md
//! §4.6).
//!
//! Each slot stores the best move found, the search depth it was
//! searched to, a score, and whether that score is exact or a
//! lower/upper bound produced by alpha-beta cutoffs. A new entry
//! replaces the resident one when it comes from a deeper search, or
//! when the resident entry is from an earlier search generation
//! (`age`) -- otherwise the table would fill up with shallow entries
//! from old positions and never be reused.

use log::info;

use crate::chess_move::Move;
use crate::eval::Score;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    key: u64,
    best_move: Move,
    depth: i8,
    score: Score,
    bound: Bound,
    age: u16,
}

const EMPTY_SLOT: Slot = Slot {
    key: 0,
    best_move: Move::NONE,
    depth: -1,
    score: 0,
    bound: Bound::Exact,
    age: 0,
};

pub struct Probe {
    pub best_move: Move,
    pub depth: i8,
    pub score: Score,
    pub bound: Bound,
}

pub struct TranspositionTable {
    slots: Vec<Slot>,
    mask: usize,
    generation: u16,
}

impl TranspositionTable {
    /// `size_mb` is rounded down to the largest power-of-two slot
    /// count that fits.
    pub fn with_size_mb(size_mb: usize) -> TranspositionTable {
        let slot_size = std::mem::size_of::<Slot>();
        let capacity = ((size_mb * 1024 * 1024) / slot_size).max(1);
        let slot_count = capacity.next_power_of_two() / 2;
        let slot_count = slot_count.max(1);
        info!("transposition table sized to {} MB ({} slots)", size_mb, slot_count);
        TranspositionTable {
            slots: vec![EMPTY_SLOT; slot_count],
            mask: slot_count - 1,
            generation: 0,
        }
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        (key as usize) & self.mask
    }

    /// Starts a new search generation; entries from prior generations
    /// are replaced more readily (spec.md §4.6).
    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn probe(&self, key: u64) -> Option<Probe> {
        let slot = &self.slots[self.index(key)];
        if slot.key == key && slot.depth >= 0 {
            Some(Probe {
                best_move: slot.best_move,
                depth: slot.depth,
                score: slot.score,
                bound: slot.bound,
            })
        } else {
            None
        }
    }

    pub fn store(&mut self, key: u64, best_move: Move, depth: i8, score: Score, bound: Bound) {
        let idx = self.index(key);
        let slot = &mut self.slots[idx];
        let should_replace = slot.key != key && slot.depth < 0
            || slot.age != self.generation
            || depth >= slot.depth
            || slot.key == key;
        if should_replace {
            *slot = Slot {
                key,
                best_move,
                depth,
                score,
                bound,
                age: self.generation,
            };
        }
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = EMPTY_SLOT;
        }
        self.generation = 0;
        info!("transposition table cleared");
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basetypes::{E2, E4};

    #[test]
    fn test_store_and_probe_roundtrip() {
        let mut tt = TranspositionTable::with_size_mb(1);
        let mv = Move::quiet(E2, E4);
        tt.store(0xABCD, mv, 4, 55, Bound::Exact);
        let probe = tt.probe(0xABCD).unwrap();
        assert_eq!(probe.best_move, mv);
        assert_eq!(probe.depth, 4);
        assert_eq!(probe.score, 55);
    }

    #[test]
    fn test_probe_miss_on_key_mismatch() {
        let tt = TranspositionTable::with_size_mb(1);
        assert!(tt.probe(0x1234).is_none());
    }

    #[test]
    fn test_deeper_entry_replaces_shallower() {
        let mut tt = TranspositionTable::with_size_mb(1);
        // Force a collision by using the same low bits.
        let key_a = 0u64;
        tt.store(key_a, Move::quiet(E2, E4), 2, 10, Bound::Exact);
        tt.store(key_a, Move::quiet(E2, E4), 6, 20, Bound::Exact);
        let probe = tt.probe(key_a).unwrap();
        assert_eq!(probe.depth, 6);
    }
}
