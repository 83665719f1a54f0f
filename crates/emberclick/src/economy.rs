//! The idle economy: taps, energy, levels, and passive income.
//!
//! Nothing here runs on a timer. Energy and passive income are recomputed
//! lazily — on every profile read, tap, or collection — through the pure
//! functions in `emberclick-accrual`, and the results are persisted back
//! through the ledger. A player who closes the game for an hour gets the
//! same outcome as one who polls every second.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use emberclick_accrual::{accrue_passive_income, regenerate_energy};
use emberclick_types::{LedgerError, PlayerId, PlayerLedger, PlayerRecord, UnixMillis};

/// Hard cap on player level.
pub const MAX_LEVEL: u32 = 1_000;

/// Reaching level N requires `N × COINS_PER_LEVEL` lifetime coins.
pub const COINS_PER_LEVEL: i64 = 1_000;

/// Errors from the economy paths.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// The player's energy pool is empty; wait for regeneration.
    #[error("player {0} is out of energy")]
    OutOfEnergy(PlayerId),

    /// The ledger collaborator failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result of a successful tap. Serialized as the click response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapOutcome {
    /// Coin balance after the tap.
    pub coins: i64,
    /// Level after the tap (may have just increased).
    pub level: u32,
    /// Energy remaining after spending one point.
    pub energy: u32,
    pub max_energy: u32,
    /// `true` when this tap crossed a level threshold.
    pub leveled_up: bool,
}

/// Player-facing economy operations, built on the accrual model and the
/// ledger boundary. Stateless apart from the shared ledger handle, so
/// it's cheap to clone into request handlers.
#[derive(Clone)]
pub struct EconomyService {
    ledger: Arc<dyn PlayerLedger>,
}

impl EconomyService {
    pub fn new(ledger: Arc<dyn PlayerLedger>) -> Self {
        Self { ledger }
    }

    /// Reads a player's profile with energy brought up to date.
    ///
    /// Recomputes regeneration and persists the new value and timestamp
    /// when anything changed (including the very first observation, which
    /// establishes the regen baseline).
    pub fn profile(&self, player: PlayerId) -> Result<PlayerRecord, EconomyError> {
        let mut record = self.ledger.player(player)?;
        let now = UnixMillis::now();

        let regen = regenerate_energy(
            record.energy,
            record.max_energy,
            record.last_energy_update,
            now,
        );
        let baseline = record.last_energy_update.is_none();
        if regen.restored > 0 || baseline {
            self.ledger
                .write_energy(player, regen.energy, regen.last_update)?;
            if regen.restored > 0 {
                tracing::debug!(%player, restored = regen.restored, energy = regen.energy, "energy regenerated");
            }
        }

        record.energy = regen.energy;
        record.last_energy_update = Some(regen.last_update);
        Ok(record)
    }

    /// Handles one tap: spend 1 energy, earn 1 coin, maybe level up.
    ///
    /// Energy is regenerated first, so a pool that looks empty in the
    /// stored record may have refilled by wall-clock time.
    ///
    /// # Errors
    /// [`EconomyError::OutOfEnergy`] when the regenerated pool is still
    /// empty — the tap is rejected and nothing is charged.
    pub fn tap(&self, player: PlayerId) -> Result<TapOutcome, EconomyError> {
        let record = self.profile(player)?;
        if record.energy == 0 {
            return Err(EconomyError::OutOfEnergy(player));
        }

        let energy = record.energy - 1;
        let stamped = record.last_energy_update.unwrap_or_else(UnixMillis::now);
        // Spending energy doesn't advance the regen clock; keep the
        // timestamp the regeneration left behind.
        self.ledger.write_energy(player, energy, stamped)?;

        let coins = self.ledger.adjust_coins(player, 1)?;

        let mut level = record.level;
        let mut leveled_up = false;
        if level < MAX_LEVEL && coins >= i64::from(level + 1) * COINS_PER_LEVEL {
            level += 1;
            leveled_up = true;
            self.ledger.write_level(player, level)?;
            tracing::info!(%player, level, "level up");
        }

        Ok(TapOutcome {
            coins,
            level,
            energy,
            max_energy: record.max_energy,
            leveled_up,
        })
    }

    /// Refills the energy pool to its cap and resets the regen baseline.
    ///
    /// Returns the new (full) energy value.
    pub fn restore_full_energy(&self, player: PlayerId) -> Result<u32, EconomyError> {
        let record = self.ledger.player(player)?;
        self.ledger
            .write_energy(player, record.max_energy, UnixMillis::now())?;
        tracing::debug!(%player, energy = record.max_energy, "energy fully restored");
        Ok(record.max_energy)
    }

    /// Collects passive card income accrued since the last collection.
    ///
    /// Returns the credited amount (0 on the baseline call and within the
    /// same minute). The collection timestamp only advances by the whole
    /// minutes actually paid out, so sub-minute remainders carry over.
    pub fn collect_passive_income(&self, player: PlayerId) -> Result<i64, EconomyError> {
        let record = self.ledger.player(player)?;
        let now = UnixMillis::now();

        let accrual = accrue_passive_income(
            &record.card_incomes,
            record.coins,
            record.last_passive_income,
            now,
        );

        let timestamp_moved = record.last_passive_income != Some(accrual.last_collect);
        if accrual.credited != 0 {
            self.ledger.adjust_coins(player, accrual.credited)?;
            tracing::debug!(%player, credited = accrual.credited, "passive income collected");
        }
        if timestamp_moved {
            self.ledger
                .write_passive_income(player, accrual.last_collect)?;
        }

        Ok(accrual.credited)
    }
}

// =========================================================================
// Tests
// =========================================================================
