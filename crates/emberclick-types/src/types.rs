//! Core identity, time, and session types.
//!
//! Everything here is API-facing: these structures are what the request
//! layer serializes back to clients, so their JSON shapes are part of the
//! contract and are pinned by tests at the bottom of this file.

use std::fmt;
use std::ops::Add;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Newtype over `u64` so a player id can't be confused with a score or a
/// coin amount in a signature. `#[serde(transparent)]` keeps the JSON
/// representation a plain number: `PlayerId(42)` serializes as `42`.
///
/// Player ids are externally owned — this core never creates or destroys
/// them, it only routes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a duel session.
///
/// Opaque 32-character lowercase hex string, generated by the matchmaking
/// engine when two players are paired. Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Wall-clock milliseconds since the Unix epoch.
///
/// All stored timestamps (energy regen, passive income, session deadlines)
/// use this unit. A "nullable timestamp" is `Option<UnixMillis>` — absent
/// means "never observed yet", and the first observation establishes the
/// baseline without retroactive credit.
///
/// Subtraction saturates: a `now` earlier than a stored timestamp (clock
/// skew) reads as zero elapsed time, never as negative time or a rollback.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnixMillis(pub u64);

impl UnixMillis {
    /// The current wall-clock time.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self(since_epoch.as_millis() as u64)
    }

    /// Milliseconds elapsed since `earlier`, saturating at zero.
    pub fn saturating_millis_since(self, earlier: UnixMillis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for UnixMillis {
    type Output = UnixMillis;

    fn add(self, rhs: Duration) -> UnixMillis {
        UnixMillis(self.0.saturating_add(rhs.as_millis() as u64))
    }
}

impl fmt::Display for UnixMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Session status
// ---------------------------------------------------------------------------

/// The persisted lifecycle state of a duel session.
///
/// Only two states are stored. "Active" is not one of them — it is inferred
/// from the time window:
///
/// ```text
/// Waiting ──(countdown elapses)──→ [active: start ≤ now < end] ──→ Finished
///                                                                    │
///              (deadline passes without a finish: swept, no rewards) ┘
/// ```
///
/// A session transitions to `Finished` exactly once, either through an
/// explicit finish request or when the sweep discovers the deadline has
/// passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Created, counting down or in play; scores may still change.
    Waiting,
    /// Terminal. Scores are frozen and rewards (if any) are settled.
    Finished,
}

impl GameStatus {
    /// Returns `true` for the terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::Finished => write!(f, "FINISHED"),
        }
    }
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// One timed duel between two paired players.
///
/// Created when the engine pairs a newcomer with the queue head. The two
/// player slots are ordered and not interchangeable — score reports are
/// addressed to "slot of player N", so `player1_id` is always the player
/// whose `find_opponent` call completed the pairing and `player2_id` the
/// player who was waiting in the queue.
///
/// Field names serialize in camelCase: this struct is the body of the
/// match-status response, and the client contract predates this
/// implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    /// Unique id, generated at pairing time.
    pub match_id: MatchId,
    /// The player who completed the pairing.
    pub player1_id: PlayerId,
    /// The player who was waiting in the queue.
    pub player2_id: PlayerId,
    pub player1_name: String,
    pub player2_name: String,
    pub player1_score: u32,
    pub player2_score: u32,
    pub status: GameStatus,
    /// Pairing time plus the start countdown.
    pub start_time: UnixMillis,
    /// The authoritative deadline: `start_time` plus the play duration.
    /// Rewritten to the actual finish time when the session terminates.
    pub end_time: UnixMillis,
    /// Set exactly once, when the session finishes.
    pub winner_id: Option<PlayerId>,
    /// The winner's payout. Stays `None` when the settlement gate blocked
    /// the transfer (or the session was never explicitly finished).
    pub coins_reward: Option<i64>,
}

impl GameSession {
    /// Returns `true` if `player` occupies one of the two slots.
    pub fn involves(&self, player: PlayerId) -> bool {
        player == self.player1_id || player == self.player2_id
    }

    /// The current score of `player`, or `None` for a non-member.
    pub fn score_of(&self, player: PlayerId) -> Option<u32> {
        if player == self.player1_id {
            Some(self.player1_score)
        } else if player == self.player2_id {
            Some(self.player2_score)
        } else {
            None
        }
    }

    /// Overwrites the score slot belonging to `player`.
    ///
    /// Returns `false` (and changes nothing) when `player` is in neither
    /// slot. The store turns that into a typed error.
    pub fn set_score(&mut self, player: PlayerId, score: u32) -> bool {
        if player == self.player1_id {
            self.player1_score = score;
            true
        } else if player == self.player2_id {
            self.player2_score = score;
            true
        } else {
            false
        }
    }

    /// The other member of the session, or `None` for a non-member.
    pub fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        if player == self.player1_id {
            Some(self.player2_id)
        } else if player == self.player2_id {
            Some(self.player1_id)
        } else {
            None
        }
    }

    /// Whether the duel is in its play window at `now`.
    ///
    /// "Active" is derived, never stored: a `Waiting` session whose
    /// countdown has elapsed and whose deadline hasn't.
    pub fn is_active(&self, now: UnixMillis) -> bool {
        self.status == GameStatus::Waiting
            && self.start_time <= now
            && now < self.end_time
    }
}

// ---------------------------------------------------------------------------
// MatchReply
// ---------------------------------------------------------------------------

/// The matchmaking engine's answer to a find-opponent request.
///
/// `#[serde(tag = "status")]` produces the wire shape the lobby polls for:
/// `{ "status": "SEARCHING", "countdownSeconds": 30 }` or
/// `{ "status": "FOUND", "matchId": "…", … }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all_fields = "camelCase")]
pub enum MatchReply {
    /// No opponent available yet; the caller is (still) queued.
    /// `countdown_seconds` is the remaining client-side search budget.
    #[serde(rename = "SEARCHING")]
    Searching { countdown_seconds: u32 },

    /// Paired. The session exists and starts after the countdown.
    #[serde(rename = "FOUND")]
    Found {
        match_id: MatchId,
        opponent_id: PlayerId,
        opponent_name: String,
        countdown_seconds: u32,
    },
}

impl MatchReply {
    /// Returns `true` when a session was created for the caller.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

// =========================================================================
// Tests
// =========================================================================
