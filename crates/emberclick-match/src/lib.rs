//! Live matchmaking and duel sessions for Emberclick.
//!
//! This crate owns the two shared mutable structures of the backend and
//! the engine that orchestrates them:
//!
//! 1. **Queue** — a concurrency-safe FIFO of players waiting for an
//!    opponent ([`MatchQueue`]).
//! 2. **Store** — the keyed map of live [`GameSession`] records, with an
//!    idempotent terminal gate and an expiry sweep ([`SessionStore`]).
//! 3. **Engine** — pairing, score routing, winner choice, and
//!    exactly-once reward settlement ([`MatchmakingEngine`]).
//! 4. **Sweeper** — a periodic maintenance task discarding stale sessions
//!    ([`spawn_sweeper`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Request layer (above)  ← injects one engine instance into handlers
//!     ↕
//! Match layer (this crate)  ← queue + sessions + settlement
//!     ↕
//! Ledger boundary (below)  ← coin balances live in the external store
//! ```
//!
//! [`GameSession`]: emberclick_types::GameSession

mod config;
mod engine;
mod error;
mod queue;
mod store;
mod sweeper;

pub use config::MatchConfig;
pub use engine::MatchmakingEngine;
pub use error::MatchError;
pub use queue::MatchQueue;
pub use store::{FinishOutcome, SessionStore, SweepStats};
pub use sweeper::spawn_sweeper;
