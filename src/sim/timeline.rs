//! Virtual-time task queue
//!
//! Stands in for setTimeout/setInterval. Entries fire in deadline order
//! (ties in scheduling order) when the owner advances the clock, so a whole
//! session can be replayed from a seed and a list of timestamps.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::effects::Task;

/// A queued task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    /// Absolute deadline in ms
    pub due_ms: u64,
    /// Insertion counter (tie breaker)
    pub seq: u64,
    /// Engine generation the task was scheduled under
    pub generation: u32,
    pub task: Task,
}

// Min-heap on (due_ms, seq)
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    now_ms: u64,
    next_seq: u64,
    queue: BinaryHeap<Scheduled>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Deadline of the next entry, if any
    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|s| s.due_ms)
    }

    /// Queue `task` to run `delay_ms` after the current time
    pub fn schedule(&mut self, delay_ms: u64, generation: u32, task: Task) {
        let entry = Scheduled {
            due_ms: self.now_ms.saturating_add(delay_ms),
            seq: self.next_seq,
            generation,
            task,
        };
        self.next_seq += 1;
        self.queue.push(entry);
    }

    /// Pop the earliest entry due at or before `until_ms`, moving the clock
    /// to its deadline
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Scheduled> {
        if self.queue.peek()?.due_ms > until_ms {
            return None;
        }
        let entry = self.queue.pop()?;
        self.now_ms = self.now_ms.max(entry.due_ms);
        Some(entry)
    }

    /// Move the clock forward (never backward)
    pub fn advance_to(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Drop every queued entry matching `pred`; returns how many were removed
    pub fn cancel(&mut self, pred: impl Fn(&Task) -> bool) -> usize {
        let before = self.queue.len();
        self.queue.retain(|s| !pred(&s.task));
        before - self.queue.len()
    }

    /// Iterate queued tasks (unordered)
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.queue.iter().map(|s| &s.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::effects::{CatchTask, PuzzleTask};

    #[test]
    fn test_fires_in_deadline_order() {
        let mut tl = Timeline::new();
        tl.schedule(500, 1, PuzzleTask::SettleChain.into());
        tl.schedule(300, 1, PuzzleTask::HideTile(4).into());
        tl.schedule(400, 1, CatchTask::Spawn.into());

        assert_eq!(tl.next_due(), Some(300));
        assert!(tl.pop_due(299).is_none());

        let order: Vec<u64> = std::iter::from_fn(|| tl.pop_due(1000))
            .map(|s| s.due_ms)
            .collect();
        assert_eq!(order, vec![300, 400, 500]);
        assert_eq!(tl.now_ms(), 500);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut tl = Timeline::new();
        tl.schedule(100, 1, PuzzleTask::HideTile(1).into());
        tl.schedule(100, 1, PuzzleTask::HideTile(2).into());

        let first = tl.pop_due(100).unwrap();
        let second = tl.pop_due(100).unwrap();
        assert_eq!(first.task, Task::Puzzle(PuzzleTask::HideTile(1)));
        assert_eq!(second.task, Task::Puzzle(PuzzleTask::HideTile(2)));
    }

    #[test]
    fn test_schedule_is_relative_to_now() {
        let mut tl = Timeline::new();
        tl.advance_to(1000);
        tl.schedule(400, 2, CatchTask::Spawn.into());
        assert_eq!(tl.next_due(), Some(1400));

        let entry = tl.pop_due(5000).unwrap();
        assert_eq!(entry.generation, 2);
        // Clock lands on the deadline, not on the advance target
        assert_eq!(tl.now_ms(), 1400);
    }

    #[test]
    fn test_clock_never_rewinds() {
        let mut tl = Timeline::new();
        tl.advance_to(800);
        tl.advance_to(200);
        assert_eq!(tl.now_ms(), 800);
    }

    #[test]
    fn test_cancel() {
        let mut tl = Timeline::new();
        tl.schedule(400, 1, CatchTask::Spawn.into());
        tl.schedule(1000, 1, CatchTask::Countdown.into());
        tl.schedule(2500, 1, CatchTask::ResolveDrop(7).into());

        let removed = tl.cancel(|t| {
            matches!(t, Task::Catch(CatchTask::Spawn | CatchTask::Countdown))
        });
        assert_eq!(removed, 2);
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.tasks().next(), Some(&Task::Catch(CatchTask::ResolveDrop(7))));
    }
}
