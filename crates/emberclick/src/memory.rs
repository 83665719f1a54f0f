//! An in-memory player ledger for development, demos, and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use emberclick_types::{LedgerError, PlayerId, PlayerLedger, PlayerRecord, UnixMillis};

/// A `HashMap`-backed [`PlayerLedger`].
///
/// Stands in for the real persistence collaborator wherever a process
/// doesn't have one: the demo binary, integration tests, local hacking.
/// Writes are atomic per record (one lock around the map), which is all
/// the trait asks for. Not a database — nothing survives the process.
#[derive(Default)]
pub struct MemoryLedger {
    players: Mutex<HashMap<PlayerId, PlayerRecord>>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PlayerId, PlayerRecord>> {
        self.players.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts (or replaces) a player record.
    pub fn insert(&self, record: PlayerRecord) {
        self.lock().insert(record.id, record);
    }

    /// A snapshot of the stored record, for assertions and display.
    pub fn snapshot(&self, id: PlayerId) -> Option<PlayerRecord> {
        self.lock().get(&id).cloned()
    }

    /// Number of stored players.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no players are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl PlayerLedger for MemoryLedger {
    fn player(&self, id: PlayerId) -> Result<PlayerRecord, LedgerError> {
        self.lock()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::PlayerNotFound(id))
    }

    fn adjust_coins(&self, id: PlayerId, delta: i64) -> Result<i64, LedgerError> {
        let mut players = self.lock();
        let record = players.get_mut(&id).ok_or(LedgerError::PlayerNotFound(id))?;
        record.coins += delta;
        Ok(record.coins)
    }

    fn write_energy(
        &self,
        id: PlayerId,
        energy: u32,
        updated_at: UnixMillis,
    ) -> Result<(), LedgerError> {
        let mut players = self.lock();
        let record = players.get_mut(&id).ok_or(LedgerError::PlayerNotFound(id))?;
        record.energy = energy;
        record.last_energy_update = Some(updated_at);
        Ok(())
    }

    fn write_passive_income(
        &self,
        id: PlayerId,
        collected_at: UnixMillis,
    ) -> Result<(), LedgerError> {
        let mut players = self.lock();
        let record = players.get_mut(&id).ok_or(LedgerError::PlayerNotFound(id))?;
        record.last_passive_income = Some(collected_at);
        Ok(())
    }

    fn write_level(&self, id: PlayerId, level: u32) -> Result<(), LedgerError> {
        let mut players = self.lock();
        let record = players.get_mut(&id).ok_or(LedgerError::PlayerNotFound(id))?;
        record.level = level;
        Ok(())
    }
}
