//! The session store: every live duel, keyed by match id.
//!
//! This is the single owner of [`GameSession`] records from pairing until
//! the sweep reclaims them. All reads hand out clones (snapshots); all
//! mutations happen under the store lock, which is what makes the
//! terminal transition — and therefore reward settlement — exactly-once
//! under concurrent duplicate finish calls.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use emberclick_types::{GameSession, GameStatus, MatchId, PlayerId, UnixMillis};

use crate::MatchError;

/// Result of a [`SessionStore::finish_with`] call.
#[derive(Debug, Clone)]
pub struct FinishOutcome {
    /// Snapshot of the session after the call.
    pub session: GameSession,
    /// `true` only for the call that performed the terminal transition.
    /// Duplicate finishes observe `false` and must not settle again.
    pub newly_finished: bool,
}

/// Counters returned by an expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Unfinished sessions discarded because their deadline passed.
    /// Abandoned matches forfeit rewards — nothing is settled for them.
    pub abandoned: usize,
    /// Finished sessions reclaimed after the retention window.
    pub reclaimed: usize,
}

impl SweepStats {
    /// Returns `true` when the sweep removed nothing.
    pub fn is_empty(&self) -> bool {
        self.abandoned == 0 && self.reclaimed == 0
    }
}

/// Concurrency-safe keyed store of active duel sessions.
pub struct SessionStore {
    sessions: Mutex<HashMap<MatchId, GameSession>>,
}

impl SessionStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MatchId, GameSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a freshly created session.
    ///
    /// # Errors
    /// [`MatchError::IdCollision`] if the id is already present. The id
    /// space is 128 random bits, so a collision means the generator is
    /// broken — reject loudly instead of overwriting a live session.
    pub fn create(&self, session: GameSession) -> Result<(), MatchError> {
        let mut sessions = self.lock();
        if sessions.contains_key(&session.match_id) {
            return Err(MatchError::IdCollision(session.match_id));
        }
        tracing::info!(
            match_id = %session.match_id,
            player1 = %session.player1_id,
            player2 = %session.player2_id,
            "session created"
        );
        sessions.insert(session.match_id.clone(), session);
        Ok(())
    }

    /// Returns a snapshot of the session, or `None` for an unknown id.
    pub fn get(&self, match_id: &MatchId) -> Option<GameSession> {
        self.lock().get(match_id).cloned()
    }

    /// Overwrites the score slot belonging to `player`.
    ///
    /// Any value from a recognized member is accepted — plausibility
    /// checking is explicitly not this layer's job.
    ///
    /// # Errors
    /// - [`MatchError::NotFound`] — unknown match id
    /// - [`MatchError::AlreadyFinished`] — scores are frozen
    /// - [`MatchError::NotInMatch`] — `player` is in neither slot
    pub fn mutate_score(
        &self,
        match_id: &MatchId,
        player: PlayerId,
        score: u32,
    ) -> Result<(), MatchError> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(match_id)
            .ok_or_else(|| MatchError::NotFound(match_id.clone()))?;

        if session.status.is_finished() {
            return Err(MatchError::AlreadyFinished(match_id.clone()));
        }
        if !session.set_score(player, score) {
            return Err(MatchError::NotInMatch(player, match_id.clone()));
        }
        Ok(())
    }

    /// Performs the terminal transition, exactly once.
    ///
    /// On the first call for a session: flips the status to `Finished`,
    /// stamps `end_time = now`, runs `seal` on the record (winner choice
    /// and settlement live in the engine's closure), and reports
    /// `newly_finished = true`. Every later call returns the preserved
    /// terminal snapshot with `newly_finished = false` — `seal` never
    /// runs twice. The whole sequence happens under the store lock, so
    /// two racing finish calls cannot both observe "not finished yet".
    ///
    /// # Errors
    /// [`MatchError::NotFound`] for an unknown id.
    pub fn finish_with(
        &self,
        match_id: &MatchId,
        now: UnixMillis,
        seal: impl FnOnce(&mut GameSession),
    ) -> Result<FinishOutcome, MatchError> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(match_id)
            .ok_or_else(|| MatchError::NotFound(match_id.clone()))?;

        if session.status.is_finished() {
            return Ok(FinishOutcome {
                session: session.clone(),
                newly_finished: false,
            });
        }

        session.status = GameStatus::Finished;
        session.end_time = now;
        seal(session);

        Ok(FinishOutcome {
            session: session.clone(),
            newly_finished: true,
        })
    }

    /// Removes stale sessions.
    ///
    /// Two populations are reclaimed:
    /// - unfinished sessions whose deadline (`end_time`) is in the past —
    ///   discarded outright, with no settlement;
    /// - finished sessions older than `end_time + retention`.
    ///
    /// Everything else, including finished sessions still inside the
    /// retention window, is left untouched. Safe to call on any cadence
    /// and concurrently with mutation of other sessions.
    pub fn sweep_expired(&self, now: UnixMillis, retention: Duration) -> SweepStats {
        let mut stats = SweepStats::default();
        let mut sessions = self.lock();

        sessions.retain(|match_id, session| match session.status {
            GameStatus::Finished => {
                if session.end_time + retention < now {
                    tracing::debug!(%match_id, "finished session reclaimed");
                    stats.reclaimed += 1;
                    false
                } else {
                    true
                }
            }
            GameStatus::Waiting => {
                if session.end_time < now {
                    tracing::info!(%match_id, "abandoned session discarded");
                    stats.abandoned += 1;
                    false
                } else {
                    true
                }
            }
        });

        stats
    }

    /// Snapshot of every live session, for diagnostics.
    pub fn active_games(&self) -> HashMap<MatchId, GameSession> {
        self.lock().clone()
    }

    /// Number of stored sessions (any state).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
