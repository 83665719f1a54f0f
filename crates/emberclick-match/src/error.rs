//! Error types for the match layer.

use emberclick_types::{LedgerError, MatchId, PlayerId};

/// Errors that can occur during matchmaking and session operations.
///
/// None of these are fatal to the process: unknown ids surface as typed
/// errors (the request layer maps them to 404-equivalents), and state
/// violations that the original backend swallowed silently are reported
/// explicitly so callers can tell "accepted" from "ignored".
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// No session exists for the given match id.
    #[error("match {0} not found")]
    NotFound(MatchId),

    /// The session has already reached its terminal state; scores are
    /// frozen and rewards were settled (at most) once.
    #[error("match {0} is already finished")]
    AlreadyFinished(MatchId),

    /// The player occupies neither score slot of the session.
    #[error("player {0} is not part of match {1}")]
    NotInMatch(PlayerId, MatchId),

    /// A freshly generated match id is already present in the store.
    /// With 128-bit random ids this is practically unreachable; rejecting
    /// beats silently overwriting a live session.
    #[error("generated match id {0} collides with a live session")]
    IdCollision(MatchId),

    /// The player-ledger collaborator failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
