//! Shared types for Emberclick.
//!
//! This crate defines the vocabulary the rest of the stack speaks:
//!
//! - **Identity** ([`PlayerId`], [`MatchId`]) — newtype ids used as map keys
//!   and in every API-facing payload.
//! - **Time** ([`UnixMillis`]) — wall-clock milliseconds, the unit every
//!   stored timestamp and deadline is expressed in.
//! - **Sessions** ([`GameSession`], [`GameStatus`], [`MatchReply`]) — the
//!   duel record and the matchmaking replies.
//! - **Ledger boundary** ([`PlayerLedger`], [`PlayerRecord`],
//!   [`LedgerError`]) — the interface to the external player store.
//!
//! # Architecture
//!
//! The types layer sits below everything else. It doesn't know about
//! queues, engines, or accrual math — it only defines the data they
//! exchange.
//!
//! ```text
//! Ledger (external) → Types (this crate) → Accrual / Match engine
//! ```

mod ledger;
mod types;

pub use ledger::{LedgerError, PlayerLedger, PlayerRecord};
pub use types::{GameSession, GameStatus, MatchId, MatchReply, PlayerId, UnixMillis};
