use std::collections::HashMap;

use crate::{game::Eval, state::State};

/// Default maximum number of entries
pub const DEFAULT_TABLE_SIZE: usize = 1 << 20;

/// How a stored value relates to the true value of a position
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flag {
    /// The value is the true value
    Exact,
    /// The true value is at least the stored value (fail-high)
    LowerBound,
    /// The true value is at most the stored value (fail-low)
    UpperBound,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Entry {
    pub value: Eval,
    /// Remaining search depth the value was computed with
    pub depth: u32,
    pub flag: Flag,
}

const NIL: usize = usize::MAX;

#[derive(Clone)]
struct Node {
    state: State,
    entry: Entry,
    prev: usize,
    next: usize,
}

/// A fixed size transposition table with least-recently-used replacement
///
/// Entries live in a slab linked into a recency list by index, with `head`
/// the most recently used. Every operation is O(1).
#[derive(Clone)]
pub struct TranspositionTable {
    index: HashMap<State, usize>,
    nodes: Vec<Node>,
    head: usize,
    tail: usize,
    max_size: usize,
    accesses: u64,
    misses: u64,
}

impl TranspositionTable {
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "transposition table must hold at least one entry");
        Self {
            index: HashMap::new(),
            nodes: Vec::new(),
            head: NIL,
            tail: NIL,
            max_size,
            accesses: 0,
            misses: 0,
        }
    }

    /// Looks up a state, marking it as most recently used
    pub fn find(&mut self, state: &State) -> Option<Entry> {
        self.accesses += 1;
        match self.index.get(state) {
            Some(&slot) => {
                self.promote(slot);
                Some(self.nodes[slot].entry)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts or overwrites the entry for a state, evicting the least recently used entry if full
    pub fn emplace(&mut self, state: State, value: Eval, depth: u32, flag: Flag) {
        let entry = Entry { value, depth, flag };
        if let Some(&slot) = self.index.get(&state) {
            self.nodes[slot].entry = entry;
            self.promote(slot);
            return;
        }

        let slot = if self.index.len() >= self.max_size {
            // reuse the slot of the evicted entry
            let slot = self.tail;
            self.unlink(slot);
            self.index.remove(&self.nodes[slot].state);
            self.nodes[slot].state = state;
            self.nodes[slot].entry = entry;
            slot
        } else {
            self.nodes.push(Node {
                state,
                entry,
                prev: NIL,
                next: NIL,
            });
            self.nodes.len() - 1
        };
        self.push_front(slot);
        self.index.insert(state, slot);
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Fraction of lookups that found an entry
    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            return 0.0;
        }
        (self.accesses - self.misses) as f64 / self.accesses as f64
    }

    fn promote(&mut self, slot: usize) {
        if self.head != slot {
            self.unlink(slot);
            self.push_front(slot);
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.nodes[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.nodes[next].prev = prev;
        }
        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = NIL;
    }

    fn push_front(&mut self, slot: usize) {
        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::game::Game;

    fn positions(count: usize) -> Vec<State> {
        let game = Game::new();
        let start = State::new();
        game.actions(&start)
            .into_iter()
            .map(|action| game.result(&start, action))
            .take(count)
            .collect()
    }

    #[test]
    fn evicts_least_recently_used() {
        let states = positions(4);
        let mut table = TranspositionTable::new(3);
        table.emplace(states[0], 1.0, 1, Flag::Exact);
        table.emplace(states[1], 2.0, 1, Flag::LowerBound);
        table.emplace(states[2], 3.0, 1, Flag::UpperBound);

        // touching the oldest entry makes states[1] the eviction candidate
        assert!(table.find(&states[0]).is_some());
        table.emplace(states[3], 4.0, 2, Flag::Exact);

        assert_eq!(table.len(), 3);
        assert!(table.find(&states[1]).is_none());
        assert_eq!(table.find(&states[0]).map(|e| e.value), Some(1.0));
        assert_eq!(
            table.find(&states[3]),
            Some(Entry {
                value: 4.0,
                depth: 2,
                flag: Flag::Exact
            })
        );
    }

    #[test]
    fn overwrites_and_clears() {
        let states = positions(2);
        let mut table = TranspositionTable::new(2);
        table.emplace(states[0], 1.0, 1, Flag::Exact);
        table.emplace(states[0], -1.0, 3, Flag::UpperBound);
        assert_eq!(table.len(), 1);
        assert_eq!(table.max_size(), 2);
        assert_eq!(table.find(&states[0]).map(|e| e.depth), Some(3));

        table.emplace(states[1], 0.5, 1, Flag::Exact);
        table.clear();
        assert!(table.is_empty());
        assert!(table.find(&states[1]).is_none());
        assert!(table.hit_rate() > 0.0);
    }
}
