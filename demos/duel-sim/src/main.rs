//! Duel simulator: drives the full Emberclick core in one process.
//!
//! Two players tap for coins, search for a match, duel, and settle —
//! all against an in-memory ledger. Run with:
//!
//! ```text
//! RUST_LOG=info cargo run -p duel-sim
//! ```

use std::sync::Arc;
use std::time::Duration;

use emberclick::{
    EconomyService, MatchConfig, MatchReply, MatchmakingEngine, MemoryLedger, PlayerId,
    PlayerRecord, spawn_sweeper,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let ash = PlayerId(1);
    let brook = PlayerId(2);

    let ledger = Arc::new(MemoryLedger::new());
    ledger.insert(
        PlayerRecord::new(ash, "ash")
            .with_coins(1_000)
            .with_card_incomes(vec![50, 100]),
    );
    ledger.insert(PlayerRecord::new(brook, "brook").with_coins(250));

    // A short duel format so the simulation finishes quickly.
    let config = MatchConfig {
        start_countdown: Duration::from_secs(1),
        play_duration: Duration::from_secs(3),
        sweep_interval: Duration::from_secs(2),
        ..MatchConfig::default()
    };
    let engine = Arc::new(MatchmakingEngine::new(Arc::clone(&ledger) as _, config));
    let economy = EconomyService::new(Arc::clone(&ledger) as _);
    let sweeper = spawn_sweeper(Arc::clone(&engine));

    // Idle phase: both players grind some taps.
    for _ in 0..10 {
        economy.tap(ash).expect("ash taps");
        economy.tap(brook).expect("brook taps");
    }
    let credited = economy
        .collect_passive_income(ash)
        .expect("collect passive income");
    tracing::info!(player = %ash, credited, "passive income baseline established");

    // Matchmaking: ash queues, brook pairs.
    let reply = engine.find_opponent(ash).expect("ash searches");
    tracing::info!(?reply, "ash search reply");

    let MatchReply::Found { match_id, opponent_name, .. } =
        engine.find_opponent(brook).expect("brook searches")
    else {
        panic!("brook should pair with ash");
    };
    tracing::info!(%match_id, opponent = %opponent_name, "brook paired");

    // Play phase: both clients report scores while the window is open.
    tokio::time::sleep(Duration::from_secs(1)).await;
    engine.update_score(&match_id, ash, 42).expect("ash score");
    engine.update_score(&match_id, brook, 37).expect("brook score");
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Finish and settle.
    let session = engine.finish_game(&match_id).expect("finish");
    println!(
        "final session:\n{}",
        serde_json::to_string_pretty(&session).expect("session serializes")
    );
    for player in [ash, brook] {
        let record = ledger.snapshot(player).expect("player exists");
        println!(
            "{}: {} coins, level {}, {}/{} energy",
            record.username, record.coins, record.level, record.energy, record.max_energy
        );
    }

    // Let the sweeper reclaim the finished record once retention allows.
    let stats = engine.sweep_expired(emberclick::UnixMillis::now());
    tracing::info!(?stats, sessions = engine.session_count(), "manual sweep pass");

    sweeper.abort();
}
