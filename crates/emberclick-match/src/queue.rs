//! The matchmaking queue: a concurrency-safe FIFO of waiting players.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use emberclick_types::PlayerId;

/// FIFO of players awaiting an opponent.
///
/// Pairing is strictly first-come-first-served — no skill rating. Each
/// operation takes `&self` and is atomic with respect to the others; the
/// queue never holds its lock across anything that could block.
///
/// Invariant: a player appears at most once. [`MatchQueue::enqueue`] is
/// idempotent, so a client hammering find-match while waiting doesn't
/// pile up duplicate entries.
pub struct MatchQueue {
    waiting: Mutex<VecDeque<PlayerId>>,
}

impl MatchQueue {
    /// Creates a new, empty queue.
    pub fn new() -> Self {
        Self {
            waiting: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PlayerId>> {
        // A poisoned lock means a panic elsewhere; the queue itself is
        // still structurally sound, so recover rather than propagate.
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `player` at the tail.
    ///
    /// No-op if the player is already queued. Returns `true` when the
    /// player was actually added.
    pub fn enqueue(&self, player: PlayerId) -> bool {
        let mut waiting = self.lock();
        if waiting.contains(&player) {
            return false;
        }
        waiting.push_back(player);
        tracing::debug!(%player, depth = waiting.len(), "player queued");
        true
    }

    /// Atomically removes and returns the queue head as an opponent for
    /// `player`.
    ///
    /// Returns `None` when the queue is empty or the head is `player`
    /// itself — self-matching is structurally impossible, not an error.
    pub fn try_pair_with(&self, player: PlayerId) -> Option<PlayerId> {
        let mut waiting = self.lock();
        match waiting.front() {
            Some(head) if *head != player => waiting.pop_front(),
            _ => None,
        }
    }

    /// Removes every occurrence of `player`. Idempotent.
    ///
    /// Returns `true` when the player was actually queued.
    pub fn cancel(&self, player: PlayerId) -> bool {
        let mut waiting = self.lock();
        let before = waiting.len();
        waiting.retain(|queued| *queued != player);
        let removed = waiting.len() < before;
        if removed {
            tracing::debug!(%player, "search cancelled");
        }
        removed
    }

    /// Whether `player` is currently queued.
    pub fn contains(&self, player: PlayerId) -> bool {
        self.lock().contains(&player)
    }

    /// Number of waiting players.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for MatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
