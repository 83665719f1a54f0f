//! Matchmaking configuration.

use std::time::Duration;

/// Tuning knobs for the matchmaking engine.
///
/// The defaults reproduce the production duel format: a 5-second
/// countdown, a 60-second play window, +350/−100 settlement gated on the
/// loser holding at least 100 coins. Retention and sweep cadence are
/// explicit here so operators (and tests) control how long finished
/// records linger instead of relying on an ad-hoc cleanup call.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Client-side search budget advertised in SEARCHING replies.
    pub search_timeout: Duration,

    /// Delay between pairing and the start of play.
    pub start_countdown: Duration,

    /// Length of the play window. `start_time + play_duration` is the
    /// authoritative deadline.
    pub play_duration: Duration,

    /// How long finished sessions stay readable before the sweep
    /// reclaims them.
    pub finished_retention: Duration,

    /// Cadence of the background sweep task.
    pub sweep_interval: Duration,

    /// Coins credited to the winner on settlement.
    pub win_reward: i64,

    /// Signed delta applied to the loser on settlement.
    pub loss_penalty: i64,

    /// The loser must hold at least this many coins before settlement,
    /// or the whole transfer (winner's credit included) is skipped.
    pub loss_stake_floor: i64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            search_timeout: Duration::from_secs(30),
            start_countdown: Duration::from_secs(5),
            play_duration: Duration::from_secs(60),
            finished_retention: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(30),
            win_reward: 350,
            loss_penalty: -100,
            loss_stake_floor: 100,
        }
    }
}
