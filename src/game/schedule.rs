//! Deferred match tasks (respawns, alert expiry)
//!
//! Tasks carry the generation of the match that scheduled them; bumping the
//! generation on start drops anything left over from the previous match.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    RespawnFood,
    RespawnBot,
    ClearBossAlert,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    due_ms: f64,
    /// Insertion order; keeps equal deadlines FIFO
    seq: u64,
    generation: u64,
    task: Deferred,
}

impl Eq for Entry {}

impl Ord for Entry {
    // Min-heap on (due, seq)
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .total_cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Entry>,
    generation: u64,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new match lifetime; all pending tasks become stale
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn schedule(&mut self, task: Deferred, now_ms: f64, delay_ms: f64) {
        self.seq += 1;
        self.queue.push(Entry {
            due_ms: now_ms + delay_ms,
            seq: self.seq,
            generation: self.generation,
            task,
        });
    }

    /// Pop every task due at `now_ms` that belongs to the current generation
    pub fn take_due(&mut self, now_ms: f64) -> Vec<Deferred> {
        let mut due = Vec::new();
        while let Some(entry) = self.queue.peek() {
            if entry.due_ms > now_ms {
                break;
            }
            if let Some(entry) = self.queue.pop() {
                if entry.generation == self.generation {
                    due.push(entry.task);
                }
            }
        }
        due
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
