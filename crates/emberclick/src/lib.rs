//! # Emberclick
//!
//! The in-memory core of an idle/clicker game backend: FIFO duel
//! matchmaking with timed sessions and exactly-once reward settlement,
//! plus a lazy, loss-free accrual model for regenerating energy and
//! passive card income.
//!
//! The HTTP layer, player persistence, and the card catalog live outside
//! this workspace; they meet the core at two seams:
//!
//! - implement [`PlayerLedger`] over your player store, and
//! - inject one [`MatchmakingEngine`] and one [`EconomyService`] into
//!   your request handlers.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use emberclick::{
//!     EconomyService, MatchConfig, MatchmakingEngine, MemoryLedger, PlayerId,
//!     PlayerRecord,
//! };
//!
//! let ledger = Arc::new(MemoryLedger::new());
//! ledger.insert(PlayerRecord::new(PlayerId(1), "ash").with_coins(500));
//! ledger.insert(PlayerRecord::new(PlayerId(2), "brook").with_coins(500));
//!
//! let engine = Arc::new(MatchmakingEngine::new(
//!     Arc::clone(&ledger) as _,
//!     MatchConfig::default(),
//! ));
//! let economy = EconomyService::new(Arc::clone(&ledger) as _);
//!
//! // Player 1 searches, player 2 pairs with them.
//! assert!(!engine.find_opponent(PlayerId(1)).unwrap().is_found());
//! assert!(engine.find_opponent(PlayerId(2)).unwrap().is_found());
//!
//! // Meanwhile the idle economy keeps ticking lazily.
//! let outcome = economy.tap(PlayerId(1)).unwrap();
//! assert_eq!(outcome.coins, 501);
//! ```

mod economy;
mod error;
mod memory;

pub use economy::{COINS_PER_LEVEL, EconomyError, EconomyService, MAX_LEVEL, TapOutcome};
pub use error::EmberclickError;
pub use memory::MemoryLedger;

pub use emberclick_accrual::{
    ENERGY_REGEN_MILLIS, EnergyRegen, INCOME_INTERVAL, IncomeAccrual, accrue_passive_income,
    regenerate_energy,
};
pub use emberclick_match::{
    FinishOutcome, MatchConfig, MatchError, MatchQueue, MatchmakingEngine, SessionStore,
    SweepStats, spawn_sweeper,
};
pub use emberclick_types::{
    GameSession, GameStatus, LedgerError, MatchId, MatchReply, PlayerId, PlayerLedger,
    PlayerRecord, UnixMillis,
};
