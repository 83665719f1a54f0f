//! The player-ledger boundary: how the core reads and writes player state.
//!
//! Emberclick doesn't own player records — a database behind the request
//! layer does. The core only needs a narrow window into it: read a
//! snapshot, move coins, and stamp the two accrual timestamps. That window
//! is the [`PlayerLedger`] trait.
//!
//! Implementations are expected to be durable and strongly consistent
//! per record. Transactionality across two `adjust_coins` calls (reward
//! settlement touches winner and loser) is the implementation's concern;
//! the engine orders the calls and logs, it does not roll back.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, UnixMillis};

// ---------------------------------------------------------------------------
// PlayerRecord
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of one player's ledger state.
///
/// `card_incomes` carries each owned card's current per-minute income —
/// the only thing the accrual model needs from the card catalog. Card
/// ownership and upgrades are managed elsewhere; from this core's
/// perspective the rates are read-only inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub username: String,
    pub coins: i64,
    pub level: u32,
    pub energy: u32,
    pub max_energy: u32,
    /// When energy was last recomputed. `None` until first observed.
    pub last_energy_update: Option<UnixMillis>,
    /// When passive income was last collected. `None` until first observed.
    pub last_passive_income: Option<UnixMillis>,
    /// Current per-minute income of each owned card.
    pub card_incomes: Vec<i64>,
}

impl PlayerRecord {
    /// Default starting energy pool for a fresh player.
    pub const STARTING_ENERGY: u32 = 500;

    /// A fresh record with the starting defaults: no coins, level 1, a
    /// full starting energy pool, no cards, and no accrual baselines yet.
    pub fn new(id: PlayerId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            coins: 0,
            level: 1,
            energy: Self::STARTING_ENERGY,
            max_energy: Self::STARTING_ENERGY,
            last_energy_update: None,
            last_passive_income: None,
            card_incomes: Vec::new(),
        }
    }

    /// Sets the starting coin balance.
    pub fn with_coins(mut self, coins: i64) -> Self {
        self.coins = coins;
        self
    }

    /// Sets the energy pool.
    pub fn with_energy(mut self, energy: u32, max_energy: u32) -> Self {
        self.energy = energy;
        self.max_energy = max_energy;
        self
    }

    /// Sets the owned cards' per-minute incomes.
    pub fn with_card_incomes(mut self, incomes: Vec<i64>) -> Self {
        self.card_incomes = incomes;
        self
    }
}

// ---------------------------------------------------------------------------
// LedgerError
// ---------------------------------------------------------------------------

/// Errors the ledger collaborator can report.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No record exists for the given player.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// The backing store couldn't serve the request (connection lost,
    /// timeout, …). Carries the backend's own description.
    #[error("ledger backend unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// PlayerLedger
// ---------------------------------------------------------------------------

/// The external player store, as seen from the core.
///
/// All operations are synchronous and expected to be short: the engine
/// calls them from inside its critical sections (pairing, settlement),
/// where suspension would be a liveness hazard. An async persistence
/// backend belongs behind an implementation of this trait, not in it.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` — one ledger instance is shared (via `Arc`)
/// between the engine, the economy service, and the sweeper task.
///
/// # Example
///
/// ```rust
/// use emberclick_types::{LedgerError, PlayerId, PlayerLedger, PlayerRecord, UnixMillis};
///
/// /// Rejects every operation; a placeholder while wiring things up.
/// struct NullLedger;
///
/// impl PlayerLedger for NullLedger {
///     fn player(&self, id: PlayerId) -> Result<PlayerRecord, LedgerError> {
///         Err(LedgerError::PlayerNotFound(id))
///     }
///
///     fn adjust_coins(&self, id: PlayerId, _delta: i64) -> Result<i64, LedgerError> {
///         Err(LedgerError::PlayerNotFound(id))
///     }
///
///     fn write_energy(
///         &self,
///         id: PlayerId,
///         _energy: u32,
///         _updated_at: UnixMillis,
///     ) -> Result<(), LedgerError> {
///         Err(LedgerError::PlayerNotFound(id))
///     }
///
///     fn write_passive_income(
///         &self,
///         id: PlayerId,
///         _collected_at: UnixMillis,
///     ) -> Result<(), LedgerError> {
///         Err(LedgerError::PlayerNotFound(id))
///     }
///
///     fn write_level(&self, id: PlayerId, _level: u32) -> Result<(), LedgerError> {
///         Err(LedgerError::PlayerNotFound(id))
///     }
/// }
/// ```
pub trait PlayerLedger: Send + Sync + 'static {
    /// Reads a snapshot of the player's current state.
    fn player(&self, id: PlayerId) -> Result<PlayerRecord, LedgerError>;

    /// Applies a signed coin delta and returns the new balance.
    fn adjust_coins(&self, id: PlayerId, delta: i64) -> Result<i64, LedgerError>;

    /// Persists a recomputed energy value together with its regen
    /// timestamp.
    fn write_energy(
        &self,
        id: PlayerId,
        energy: u32,
        updated_at: UnixMillis,
    ) -> Result<(), LedgerError>;

    /// Persists the passive-income collection timestamp.
    fn write_passive_income(
        &self,
        id: PlayerId,
        collected_at: UnixMillis,
    ) -> Result<(), LedgerError>;

    /// Persists a new player level.
    fn write_level(&self, id: PlayerId, level: u32) -> Result<(), LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_starting_defaults() {
        let rec = PlayerRecord::new(PlayerId(1), "ash");
        assert_eq!(rec.coins, 0);
        assert_eq!(rec.level, 1);
        assert_eq!(rec.energy, PlayerRecord::STARTING_ENERGY);
        assert_eq!(rec.max_energy, PlayerRecord::STARTING_ENERGY);
        assert!(rec.last_energy_update.is_none());
        assert!(rec.last_passive_income.is_none());
        assert!(rec.card_incomes.is_empty());
    }

    #[test]
    fn test_builder_style_setters() {
        let rec = PlayerRecord::new(PlayerId(2), "brook")
            .with_coins(250)
            .with_energy(10, 20)
            .with_card_incomes(vec![50, 100]);
        assert_eq!(rec.coins, 250);
        assert_eq!(rec.energy, 10);
        assert_eq!(rec.max_energy, 20);
        assert_eq!(rec.card_incomes, vec![50, 100]);
    }

    #[test]
    fn test_record_json_uses_camel_case_keys() {
        let rec = PlayerRecord::new(PlayerId(3), "cid");
        let json: serde_json::Value = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["maxEnergy"], PlayerRecord::STARTING_ENERGY);
        assert!(json["lastEnergyUpdate"].is_null());
        assert!(json["cardIncomes"].is_array());
    }

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::PlayerNotFound(PlayerId(9));
        assert_eq!(err.to_string(), "player P-9 not found");
    }
}
