//! Unified error type for the Emberclick core.

use emberclick_match::MatchError;
use emberclick_types::LedgerError;

use crate::EconomyError;

/// Top-level error that wraps all crate-specific errors.
///
/// Request handlers built on the `emberclick` meta-crate deal with this
/// single type; the `#[from]` variants let `?` convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum EmberclickError {
    /// A matchmaking or session error (not found, already finished, …).
    #[error(transparent)]
    Match(#[from] MatchError),

    /// An economy error (out of energy, ledger failure during accrual).
    #[error(transparent)]
    Economy(#[from] EconomyError),

    /// A direct ledger failure outside the economy paths.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use emberclick_types::{MatchId, PlayerId};

    use super::*;

    #[test]
    fn test_from_match_error() {
        let err = MatchError::NotFound(MatchId("abcd".into()));
        let top: EmberclickError = err.into();
        assert!(matches!(top, EmberclickError::Match(_)));
        assert!(top.to_string().contains("abcd"));
    }

    #[test]
    fn test_from_economy_error() {
        let err = EconomyError::OutOfEnergy(PlayerId(3));
        let top: EmberclickError = err.into();
        assert!(matches!(top, EmberclickError::Economy(_)));
    }

    #[test]
    fn test_from_ledger_error() {
        let err = LedgerError::PlayerNotFound(PlayerId(5));
        let top: EmberclickError = err.into();
        assert!(matches!(top, EmberclickError::Ledger(_)));
        assert!(top.to_string().contains("P-5"));
    }
}
