use std::collections::{HashMap, VecDeque};

use crate::board::ChessMove;
use crate::types::{Score, SCORE_MATE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TTFlag {
    Exact,
    LowerBound, // Beta cutoff (score >= beta)
    UpperBound, // Failed low (score <= alpha)
}

#[derive(Clone, Copy, Debug)]
pub struct TranspositionEntry {
    pub depth: u8,
    pub score: Score,
    pub flag: TTFlag,
    pub best_move: Option<ChessMove>,
}

/// Bounded transposition table with insertion-order (FIFO) eviction.
///
/// Capacity `<= 0` means unbounded — entries are never evicted. A capacity `> 0`
/// evicts the oldest-inserted key once the table would exceed it. Re-`put`ing an
/// existing key overwrites its entry in place without moving it in eviction order,
/// matching a plain `HashMap` — simpler and faster than true LRU, and sufficient
/// for this table's replacement needs since the search layer gates depth itself.
pub struct TranspositionTable {
    entries: HashMap<u64, TranspositionEntry>,
    order: VecDeque<u64>,
    capacity: i64,
}

impl TranspositionTable {
    /// Create a table. `capacity <= 0` means unbounded.
    pub fn new(capacity: i64) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// Create a table sized to roughly fill `mb` megabytes, as the UCI `Hash` option
    /// specifies it. This is a convenience over `new` for the search harness; the
    /// table itself only knows about entry-count capacity.
    pub fn with_hash_mb(mb: usize) -> Self {
        let entry_size = std::mem::size_of::<(u64, TranspositionEntry)>();
        let num_entries = (mb * 1024 * 1024) / entry_size.max(1);
        Self::new(num_entries.max(1024) as i64)
    }

    pub fn get(&self, key: u64) -> Option<&TranspositionEntry> {
        self.entries.get(&key)
    }

    /// Insert or overwrite an entry. A re-`put` of an existing key does not move
    /// it in eviction order — only brand-new keys are pushed onto the order queue.
    pub fn put(&mut self, key: u64, entry: TranspositionEntry) {
        if self.entries.insert(key, entry).is_none() {
            self.order.push_back(key);
            if self.capacity > 0 && self.order.len() as i64 > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fraction of capacity currently filled, in `[0, 1]`. `0.0` when unbounded
    /// (`capacity <= 0`) — there's no ceiling to measure fullness against.
    pub fn load(&self) -> f64 {
        if self.capacity > 0 {
            self.entries.len() as f64 / self.capacity as f64
        } else {
            0.0
        }
    }

    /// Retrieve score from TT entry, adjusting mate scores for current ply.
    pub fn retrieve_score(entry: &TranspositionEntry, ply: usize, alpha: Score, beta: Score) -> Option<Score> {
        let mut score = entry.score;

        // Adjust mate scores from storage format (relative to root) to current ply
        if score > SCORE_MATE - 100 {
            score -= ply as Score;
        } else if score < -SCORE_MATE + 100 {
            score += ply as Score;
        }

        match entry.flag {
            TTFlag::Exact => Some(score),
            TTFlag::LowerBound => {
                if score >= beta { Some(score) } else { None }
            }
            TTFlag::UpperBound => {
                if score <= alpha { Some(score) } else { None }
            }
        }
    }

    /// Adjust a raw search score into root-relative storage format for a mate score.
    pub fn store_score(mut score: Score, ply: usize) -> Score {
        if score > SCORE_MATE - 100 {
            score += ply as Score;
        } else if score < -SCORE_MATE + 100 {
            score -= ply as Score;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SCORE_INFINITY;

    fn entry(score: Score) -> TranspositionEntry {
        TranspositionEntry { depth: 5, score, flag: TTFlag::Exact, best_move: None }
    }

    #[test]
    fn test_put_and_get() {
        let mut tt = TranspositionTable::new(0); // unbounded
        tt.put(0x1234, entry(100));
        let got = tt.get(0x1234);
        assert!(got.is_some());
        assert_eq!(got.unwrap().score, 100);
    }

    #[test]
    fn test_miss() {
        let tt = TranspositionTable::new(0);
        assert!(tt.get(0xDEADBEEF).is_none());
    }

    #[test]
    fn test_unbounded_never_evicts() {
        let mut tt = TranspositionTable::new(0);
        for k in 0..10_000u64 {
            tt.put(k, entry(k as Score));
        }
        assert_eq!(tt.len(), 10_000);
        assert!(tt.get(0).is_some());
    }

    #[test]
    fn test_capacity_zero_or_negative_is_unbounded() {
        let mut tt = TranspositionTable::new(-5);
        for k in 0..100u64 {
            tt.put(k, entry(k as Score));
        }
        assert_eq!(tt.len(), 100);
    }

    #[test]
    fn test_fifo_eviction_order() {
        let mut tt = TranspositionTable::new(3);
        tt.put(1, entry(1));
        tt.put(2, entry(2));
        tt.put(3, entry(3));
        assert_eq!(tt.len(), 3);

        // inserting a 4th key evicts the first-inserted key (1)
        tt.put(4, entry(4));
        assert_eq!(tt.len(), 3);
        assert!(tt.get(1).is_none(), "the first key inserted should be evicted");
        assert!(tt.get(2).is_some());
        assert!(tt.get(3).is_some());
        assert!(tt.get(4).is_some());
    }

    #[test]
    fn test_reput_does_not_refresh_eviction_order() {
        let mut tt = TranspositionTable::new(3);
        tt.put(1, entry(1));
        tt.put(2, entry(2));
        tt.put(3, entry(3));

        // re-put key 1 with a new value — should overwrite in place, not move to the back
        tt.put(1, entry(111));
        assert_eq!(tt.get(1).unwrap().score, 111);

        // key 1 is still the oldest in eviction order, so the next insert evicts it
        tt.put(4, entry(4));
        assert!(tt.get(1).is_none(), "re-put should not protect a key from FIFO eviction");
        assert!(tt.get(2).is_some());
        assert!(tt.get(3).is_some());
        assert!(tt.get(4).is_some());
    }

    #[test]
    fn test_load_factor() {
        let mut tt = TranspositionTable::new(4);
        assert_eq!(tt.load(), 0.0);
        tt.put(1, entry(1));
        tt.put(2, entry(2));
        assert_eq!(tt.load(), 0.5);
        tt.put(3, entry(3));
        tt.put(4, entry(4));
        assert_eq!(tt.load(), 1.0);
    }

    #[test]
    fn test_load_unbounded_is_zero() {
        let mut tt = TranspositionTable::new(0);
        for k in 0..5_000u64 {
            tt.put(k, entry(k as Score));
        }
        assert_eq!(tt.load(), 0.0);
    }

    #[test]
    fn test_clear() {
        let mut tt = TranspositionTable::new(0);
        tt.put(1, entry(1));
        tt.put(2, entry(2));
        tt.clear();
        assert_eq!(tt.len(), 0);
        assert!(tt.get(1).is_none());
    }

    #[test]
    fn test_mate_score_store_and_retrieve() {
        let mate_score = SCORE_MATE - 3;
        let stored = TranspositionTable::store_score(mate_score, 3);
        assert_eq!(stored, SCORE_MATE);

        let e = TranspositionEntry { depth: 10, score: stored, flag: TTFlag::Exact, best_move: None };
        let retrieved = TranspositionTable::retrieve_score(&e, 5, -SCORE_INFINITY, SCORE_INFINITY);
        assert_eq!(retrieved, Some(SCORE_MATE - 5));
    }
}

// The table is a plain `HashMap<u64, TranspositionEntry>` keyed by the full Zobrist hash,
// with a side `VecDeque<u64>` tracking insertion order for FIFO eviction. There's no
// depth-preferred replacement here — the search layer gates puts by depth itself, since
// the table is specified to have no opinion on replacement policy beyond "oldest out".

// Mate score adjustment: mate scores are stored relative to the root (ie. mate in 5 from
// root) but need to be adjusted to the current ply when probed (ie. mate in 3 from this
// node). This is done by adding/subtracting the ply difference.
