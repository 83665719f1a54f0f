//! Background sweeper: periodic reclamation of stale sessions.
//!
//! The engine never cleans up by itself — an unfinished duel whose
//! deadline passed, or a finished record past its retention window, stays
//! in memory until something sweeps it. This task is that something: a
//! detached Tokio task running [`MatchmakingEngine::sweep_expired`] on
//! the configured cadence.
//!
//! Sweeping is also safe to invoke opportunistically (e.g. from an admin
//! endpoint); the store tolerates concurrent sweeps and mutation.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use emberclick_types::UnixMillis;

use crate::MatchmakingEngine;

/// Spawns the sweep loop for `engine` and returns its task handle.
///
/// The cadence comes from `MatchConfig::sweep_interval`. The task runs
/// until aborted (`handle.abort()`) or until the runtime shuts down; a
/// missed tick (e.g. the process was suspended) is delayed, not bursted.
pub fn spawn_sweeper(engine: Arc<MatchmakingEngine>) -> JoinHandle<()> {
    let interval = engine.config().sweep_interval;

    tokio::spawn(async move {
        tracing::debug!(?interval, "session sweeper started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let stats = engine.sweep_expired(UnixMillis::now());
            if stats.is_empty() {
                tracing::trace!("sweep pass: nothing to reclaim");
            } else {
                tracing::info!(
                    abandoned = stats.abandoned,
                    reclaimed = stats.reclaimed,
                    remaining = engine.session_count(),
                    "sweep removed stale sessions"
                );
            }
        }
    })
}
