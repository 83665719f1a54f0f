//! The matchmaking engine: pairing, score routing, and settlement.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use emberclick_types::{
    GameSession, GameStatus, MatchId, MatchReply, PlayerId, PlayerLedger, UnixMillis,
};

use crate::{MatchConfig, MatchError, MatchQueue, SessionStore, SweepStats};

/// Orchestrates the queue and the session store into the duel state
/// machine, and settles rewards through the player ledger.
///
/// One engine is instantiated per process and injected into request
/// handlers — the shared mutable state lives *inside* it, never in
/// globals. All operations take `&self`, are short, and never block on
/// an opponent: `find_opponent` answers immediately with SEARCHING and
/// the countdown is client-polled.
///
/// Per player the flow is:
///
/// ```text
/// idle ──(find_opponent: queued)──→ searching ──(someone pairs them)──→ in session
///   ↑                                   │
///   └──────────(cancel_search)──────────┘
/// ```
pub struct MatchmakingEngine {
    queue: MatchQueue,
    store: SessionStore,
    ledger: Arc<dyn PlayerLedger>,
    config: MatchConfig,
    /// Tie-break coin flips and match-id bytes come from here. Seedable
    /// so tests can pin the flip sequence.
    rng: Mutex<StdRng>,
    /// Serializes the dequeue-then-create-session sequence. Without it,
    /// a paired-but-not-yet-stored player could slip back into the queue
    /// through a concurrent call and end up in two sessions.
    pairing: Mutex<()>,
}

impl MatchmakingEngine {
    /// Creates an engine with an OS-seeded rng.
    pub fn new(ledger: Arc<dyn PlayerLedger>, config: MatchConfig) -> Self {
        Self::with_rng(ledger, config, StdRng::from_os_rng())
    }

    /// Creates an engine with a deterministic rng, for tests that need a
    /// reproducible tie-break sequence.
    pub fn with_seed(ledger: Arc<dyn PlayerLedger>, config: MatchConfig, seed: u64) -> Self {
        Self::with_rng(ledger, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(ledger: Arc<dyn PlayerLedger>, config: MatchConfig, rng: StdRng) -> Self {
        Self {
            queue: MatchQueue::new(),
            store: SessionStore::new(),
            ledger,
            config,
            rng: Mutex::new(rng),
            pairing: Mutex::new(()),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------
    // Pairing
    // -----------------------------------------------------------------

    /// Finds an opponent for `player`, or queues them.
    ///
    /// 1. Already queued → SEARCHING (a poll, not a new request).
    /// 2. A different player waits at the queue head → pair with them:
    ///    create the session and reply FOUND with the start countdown.
    /// 3. Nobody available → enqueue and reply SEARCHING.
    ///
    /// Steps 2–3 run inside the pairing critical section, so concurrent
    /// calls can never pair the same waiter twice or double-queue a
    /// player.
    ///
    /// # Errors
    /// [`MatchError::Ledger`] when a paired player has no ledger record.
    pub fn find_opponent(&self, player: PlayerId) -> Result<MatchReply, MatchError> {
        let _guard = self.pairing.lock().unwrap_or_else(PoisonError::into_inner);

        if self.queue.contains(player) {
            return Ok(self.searching_reply());
        }

        match self.queue.try_pair_with(player) {
            Some(opponent) => self.create_match(player, opponent),
            None => {
                self.queue.enqueue(player);
                Ok(self.searching_reply())
            }
        }
    }

    fn searching_reply(&self) -> MatchReply {
        MatchReply::Searching {
            countdown_seconds: self.config.search_timeout.as_secs() as u32,
        }
    }

    fn create_match(
        &self,
        player: PlayerId,
        opponent: PlayerId,
    ) -> Result<MatchReply, MatchError> {
        let caller = self.ledger.player(player)?;
        let paired = self.ledger.player(opponent)?;

        let match_id = self.generate_match_id();
        let now = UnixMillis::now();
        let start_time = now + self.config.start_countdown;
        let end_time = start_time + self.config.play_duration;

        self.store.create(GameSession {
            match_id: match_id.clone(),
            player1_id: player,
            player2_id: opponent,
            player1_name: caller.username,
            player2_name: paired.username.clone(),
            player1_score: 0,
            player2_score: 0,
            status: GameStatus::Waiting,
            start_time,
            end_time,
            winner_id: None,
            coins_reward: None,
        })?;

        tracing::info!(%match_id, %player, %opponent, "players paired");

        Ok(MatchReply::Found {
            match_id,
            opponent_id: opponent,
            opponent_name: paired.username,
            countdown_seconds: self.config.start_countdown.as_secs() as u32,
        })
    }

    /// 16 random bytes as 32 lowercase hex chars — unique for all
    /// practical purposes; the store still collision-checks on insert.
    fn generate_match_id(&self) -> MatchId {
        let bytes: [u8; 16] = self.rng().random();
        MatchId(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Removes `player` from the queue. Idempotent; a session they were
    /// already paired into is unaffected.
    pub fn cancel_search(&self, player: PlayerId) {
        self.queue.cancel(player);
    }

    // -----------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------

    /// Snapshot of one session, or `None` for an unknown id.
    pub fn session(&self, match_id: &MatchId) -> Option<GameSession> {
        self.store.get(match_id)
    }

    /// Overwrites `player`'s score slot in the session.
    ///
    /// Any integer from a recognized member is accepted — the reported
    /// score is trusted, anti-cheat is out of scope.
    ///
    /// # Errors
    /// See [`SessionStore::mutate_score`].
    pub fn update_score(
        &self,
        match_id: &MatchId,
        player: PlayerId,
        score: u32,
    ) -> Result<(), MatchError> {
        self.store.mutate_score(match_id, player, score)
    }

    /// Finishes the session and settles rewards, exactly once.
    ///
    /// The first call performs the terminal transition: the higher score
    /// wins; an exact tie is decided by a uniformly random coin flip
    /// (intentional — the duel format has no draws). Settlement then
    /// transfers `win_reward` to the winner and `loss_penalty` to the
    /// loser, but only when the loser's pre-settlement balance is at
    /// least `loss_stake_floor` — otherwise the whole transfer is
    /// skipped, the winner included, and `coins_reward` stays unset.
    ///
    /// Duplicate calls (including concurrent ones) return the same
    /// terminal snapshot without settling again.
    ///
    /// # Errors
    /// [`MatchError::NotFound`] for an unknown id.
    pub fn finish_game(&self, match_id: &MatchId) -> Result<GameSession, MatchError> {
        let outcome = self.store.finish_with(match_id, UnixMillis::now(), |session| {
            let winner = self.pick_winner(session);
            session.winner_id = Some(winner);
            self.settle(session, winner);
        })?;

        if outcome.newly_finished {
            tracing::info!(
                %match_id,
                winner = ?outcome.session.winner_id,
                reward = ?outcome.session.coins_reward,
                "match finished"
            );
        }
        Ok(outcome.session)
    }

    fn pick_winner(&self, session: &GameSession) -> PlayerId {
        if session.player1_score > session.player2_score {
            session.player1_id
        } else if session.player2_score > session.player1_score {
            session.player2_id
        } else if self.rng().random_bool(0.5) {
            session.player1_id
        } else {
            session.player2_id
        }
    }

    /// Best-effort coin transfer; runs inside the terminal gate, so at
    /// most once per session. A missing ledger record skips the whole
    /// transfer (the session still finishes), matching the store being
    /// authoritative for balances.
    fn settle(&self, session: &mut GameSession, winner: PlayerId) {
        let Some(loser) = session.opponent_of(winner) else {
            // Unreachable: the winner always comes from one of the slots.
            return;
        };

        let loser_balance = match self.ledger.player(loser) {
            Ok(record) => record.coins,
            Err(err) => {
                tracing::warn!(match_id = %session.match_id, %loser, %err, "settlement skipped");
                return;
            }
        };
        if let Err(err) = self.ledger.player(winner) {
            tracing::warn!(match_id = %session.match_id, %winner, %err, "settlement skipped");
            return;
        }

        if loser_balance < self.config.loss_stake_floor {
            tracing::debug!(
                match_id = %session.match_id,
                %loser,
                loser_balance,
                floor = self.config.loss_stake_floor,
                "loser below stake floor, no transfer"
            );
            return;
        }

        if let Err(err) = self.ledger.adjust_coins(winner, self.config.win_reward) {
            tracing::warn!(match_id = %session.match_id, %winner, %err, "winner credit failed");
            return;
        }
        if let Err(err) = self.ledger.adjust_coins(loser, self.config.loss_penalty) {
            tracing::warn!(match_id = %session.match_id, %loser, %err, "loser debit failed");
        }
        session.coins_reward = Some(self.config.win_reward);
    }

    // -----------------------------------------------------------------
    // Maintenance & diagnostics
    // -----------------------------------------------------------------

    /// Runs one expiry sweep at `now`, using the configured retention.
    pub fn sweep_expired(&self, now: UnixMillis) -> SweepStats {
        self.store
            .sweep_expired(now, self.config.finished_retention)
    }

    /// Snapshot of every stored session (diagnostic endpoint).
    pub fn active_games(&self) -> HashMap<MatchId, GameSession> {
        self.store.active_games()
    }

    /// Number of players currently waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    /// Number of stored sessions (any state).
    pub fn session_count(&self) -> usize {
        self.store.len()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use emberclick_types::{LedgerError, PlayerRecord};

    use super::*;

    // -- A minimal in-memory ledger for engine tests ----------------------

    #[derive(Default)]
    struct TestLedger {
        players: Mutex<HashMap<PlayerId, PlayerRecord>>,
        adjustments: AtomicUsize,
    }

    impl TestLedger {
        fn with_players(records: Vec<PlayerRecord>) -> Arc<Self> {
            let ledger = Self::default();
            {
                let mut players = ledger.players.lock().unwrap();
                for record in records {
                    players.insert(record.id, record);
                }
            }
            Arc::new(ledger)
        }

        fn coins(&self, id: PlayerId) -> i64 {
            self.players.lock().unwrap()[&id].coins
        }

        fn adjustment_count(&self) -> usize {
            self.adjustments.load(Ordering::SeqCst)
        }
    }

    impl PlayerLedger for TestLedger {
        fn player(&self, id: PlayerId) -> Result<PlayerRecord, LedgerError> {
            self.players
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or(LedgerError::PlayerNotFound(id))
        }

        fn adjust_coins(&self, id: PlayerId, delta: i64) -> Result<i64, LedgerError> {
            let mut players = self.players.lock().unwrap();
            let record = players
                .get_mut(&id)
                .ok_or(LedgerError::PlayerNotFound(id))?;
            record.coins += delta;
            self.adjustments.fetch_add(1, Ordering::SeqCst);
            Ok(record.coins)
        }

        fn write_energy(
            &self,
            _id: PlayerId,
            _energy: u32,
            _updated_at: UnixMillis,
        ) -> Result<(), LedgerError> {
            Ok(())
        }

        fn write_passive_income(
            &self,
            _id: PlayerId,
            _collected_at: UnixMillis,
        ) -> Result<(), LedgerError> {
            Ok(())
        }

        fn write_level(&self, _id: PlayerId, _level: u32) -> Result<(), LedgerError> {
            Ok(())
        }
    }

    // -- Helpers ----------------------------------------------------------

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn two_player_engine(coins1: i64, coins2: i64) -> (MatchmakingEngine, Arc<TestLedger>) {
        let ledger = TestLedger::with_players(vec![
            PlayerRecord::new(pid(1), "ash").with_coins(coins1),
            PlayerRecord::new(pid(2), "brook").with_coins(coins2),
        ]);
        let engine =
            MatchmakingEngine::with_seed(Arc::clone(&ledger) as _, MatchConfig::default(), 7);
        (engine, ledger)
    }

    /// Queues player 1, pairs player 2 against them, returns the match id.
    fn pair(engine: &MatchmakingEngine) -> MatchId {
        assert!(!engine.find_opponent(pid(1)).unwrap().is_found());
        match engine.find_opponent(pid(2)).unwrap() {
            MatchReply::Found { match_id, .. } => match_id,
            other => panic!("expected FOUND, got {other:?}"),
        }
    }

    // =====================================================================
    // find_opponent()
    // =====================================================================

    #[test]
    fn test_find_opponent_first_caller_searches() {
        let (engine, _) = two_player_engine(0, 0);

        let reply = engine.find_opponent(pid(1)).unwrap();

        assert_eq!(
            reply,
            MatchReply::Searching {
                countdown_seconds: 30
            }
        );
        assert_eq!(engine.queue_depth(), 1);
    }

    #[test]
    fn test_find_opponent_repeat_poll_stays_searching() {
        let (engine, _) = two_player_engine(0, 0);
        engine.find_opponent(pid(1)).unwrap();

        // Polling again must not duplicate the queue entry or pair the
        // player with themselves.
        let reply = engine.find_opponent(pid(1)).unwrap();

        assert!(!reply.is_found());
        assert_eq!(engine.queue_depth(), 1);
        assert_eq!(engine.session_count(), 0);
    }

    #[test]
    fn test_find_opponent_second_caller_pairs() {
        let (engine, _) = two_player_engine(0, 0);
        engine.find_opponent(pid(1)).unwrap();

        let reply = engine.find_opponent(pid(2)).unwrap();

        let MatchReply::Found {
            match_id,
            opponent_id,
            opponent_name,
            countdown_seconds,
        } = reply
        else {
            panic!("expected FOUND");
        };
        assert_eq!(opponent_id, pid(1));
        assert_eq!(opponent_name, "ash");
        assert_eq!(countdown_seconds, 5);
        assert_eq!(match_id.0.len(), 32);

        // The queue drained into a stored session.
        assert_eq!(engine.queue_depth(), 0);
        let session = engine.session(&match_id).expect("session stored");
        assert_eq!(session.player1_id, pid(2));
        assert_eq!(session.player2_id, pid(1));
        assert_eq!(session.status, GameStatus::Waiting);
    }

    #[test]
    fn test_find_opponent_session_window_uses_config() {
        let (engine, _) = two_player_engine(0, 0);
        let match_id = pair(&engine);

        let session = engine.session(&match_id).unwrap();
        let window = session.end_time.saturating_millis_since(session.start_time);
        assert_eq!(window, 60_000);
        assert!(session.start_time > UnixMillis(0));
    }

    #[test]
    fn test_find_opponent_unknown_player_fails_without_losing_session() {
        // Player 3 has no ledger record; pairing against them must error,
        // and no half-built session may remain.
        let ledger =
            TestLedger::with_players(vec![PlayerRecord::new(pid(1), "ash")]);
        let engine =
            MatchmakingEngine::with_seed(Arc::clone(&ledger) as _, MatchConfig::default(), 7);

        engine.find_opponent(pid(1)).unwrap();
        let result = engine.find_opponent(pid(3));

        assert!(matches!(
            result,
            Err(MatchError::Ledger(LedgerError::PlayerNotFound(p))) if p == pid(3)
        ));
        assert_eq!(engine.session_count(), 0);
    }

    #[test]
    fn test_cancel_search_dequeues() {
        let (engine, _) = two_player_engine(0, 0);
        engine.find_opponent(pid(1)).unwrap();

        engine.cancel_search(pid(1));

        assert_eq!(engine.queue_depth(), 0);
        // Next caller queues instead of pairing.
        assert!(!engine.find_opponent(pid(2)).unwrap().is_found());
    }

    // =====================================================================
    // update_score()
    // =====================================================================

    #[test]
    fn test_update_score_accepts_any_member_value() {
        let (engine, _) = two_player_engine(0, 0);
        let match_id = pair(&engine);

        engine.update_score(&match_id, pid(1), 400).unwrap();
        engine.update_score(&match_id, pid(2), 12).unwrap();
        // Overwrites, not increments — the client reports totals.
        engine.update_score(&match_id, pid(2), 9).unwrap();

        let session = engine.session(&match_id).unwrap();
        assert_eq!(session.score_of(pid(1)), Some(400));
        assert_eq!(session.score_of(pid(2)), Some(9));
    }

    #[test]
    fn test_update_score_after_finish_is_rejected() {
        let (engine, _) = two_player_engine(500, 500);
        let match_id = pair(&engine);
        engine.finish_game(&match_id).unwrap();

        let result = engine.update_score(&match_id, pid(1), 99);
        assert!(matches!(result, Err(MatchError::AlreadyFinished(_))));
    }

    // =====================================================================
    // finish_game(): winner and settlement
    // =====================================================================

    #[test]
    fn test_finish_game_higher_score_wins_and_settles() {
        // Winner holds 1000, loser 200: the gate passes, the winner ends
        // at 1350 and the loser at exactly 100.
        let (engine, ledger) = two_player_engine(200, 1_000);
        let match_id = pair(&engine);
        engine.update_score(&match_id, pid(2), 10).unwrap();
        engine.update_score(&match_id, pid(1), 3).unwrap();

        let session = engine.finish_game(&match_id).unwrap();

        assert_eq!(session.status, GameStatus::Finished);
        assert_eq!(session.winner_id, Some(pid(2)));
        assert_eq!(session.coins_reward, Some(350));
        assert_eq!(ledger.coins(pid(2)), 1_350);
        assert_eq!(ledger.coins(pid(1)), 100);
    }

    #[test]
    fn test_finish_game_poor_loser_blocks_whole_transfer() {
        // Loser holds 50 < 100: nobody is paid, reward stays unset.
        let (engine, ledger) = two_player_engine(50, 1_000);
        let match_id = pair(&engine);
        engine.update_score(&match_id, pid(2), 10).unwrap(); // pid(2) wins

        let session = engine.finish_game(&match_id).unwrap();

        assert_eq!(session.winner_id, Some(pid(2)));
        assert_eq!(session.coins_reward, None);
        assert_eq!(ledger.coins(pid(1)), 50);
        assert_eq!(ledger.coins(pid(2)), 1_000);
        assert_eq!(ledger.adjustment_count(), 0);
    }

    #[test]
    fn test_finish_game_loser_at_floor_settles() {
        // Exactly 100 passes the gate and may go to zero.
        let (engine, ledger) = two_player_engine(100, 1_000);
        let match_id = pair(&engine);
        engine.update_score(&match_id, pid(2), 10).unwrap();

        let session = engine.finish_game(&match_id).unwrap();

        assert_eq!(session.coins_reward, Some(350));
        assert_eq!(ledger.coins(pid(1)), 0);
        assert_eq!(ledger.coins(pid(2)), 1_350);
    }

    #[test]
    fn test_finish_game_twice_settles_once() {
        let (engine, ledger) = two_player_engine(1_000, 1_000);
        let match_id = pair(&engine);
        engine.update_score(&match_id, pid(2), 5).unwrap();

        let first = engine.finish_game(&match_id).unwrap();
        let second = engine.finish_game(&match_id).unwrap();

        assert_eq!(first.winner_id, second.winner_id);
        assert_eq!(second.coins_reward, Some(350));
        // Two adjustments total (winner + loser), not four.
        assert_eq!(ledger.adjustment_count(), 2);
        assert_eq!(ledger.coins(pid(2)), 1_350);
        assert_eq!(ledger.coins(pid(1)), 900);
    }

    #[test]
    fn test_finish_game_tie_picks_each_player_sometimes() {
        // Run many seeded tie matches; both players must win at least
        // once and the winner is always one of the two.
        let ledger = TestLedger::with_players(vec![
            PlayerRecord::new(pid(1), "ash").with_coins(1_000_000),
            PlayerRecord::new(pid(2), "brook").with_coins(1_000_000),
        ]);
        let engine = MatchmakingEngine::with_seed(
            Arc::clone(&ledger) as _,
            MatchConfig::default(),
            42,
        );

        let mut wins: HashMap<PlayerId, usize> = HashMap::new();
        for _ in 0..100 {
            let match_id = pair(&engine);
            engine.update_score(&match_id, pid(1), 5).unwrap();
            engine.update_score(&match_id, pid(2), 5).unwrap();
            let session = engine.finish_game(&match_id).unwrap();
            let winner = session.winner_id.expect("tie still yields a winner");
            assert!(session.involves(winner));
            *wins.entry(winner).or_default() += 1;
        }

        assert!(wins[&pid(1)] > 0, "player 1 never won a tie");
        assert!(wins[&pid(2)] > 0, "player 2 never won a tie");
    }

    #[test]
    fn test_finish_game_same_seed_same_tie_sequence() {
        let run = |seed: u64| -> Vec<PlayerId> {
            let ledger = TestLedger::with_players(vec![
                PlayerRecord::new(pid(1), "ash").with_coins(1_000_000),
                PlayerRecord::new(pid(2), "brook").with_coins(1_000_000),
            ]);
            let engine = MatchmakingEngine::with_seed(
                Arc::clone(&ledger) as _,
                MatchConfig::default(),
                seed,
            );
            (0..20)
                .map(|_| {
                    let match_id = pair(&engine);
                    engine
                        .finish_game(&match_id)
                        .unwrap()
                        .winner_id
                        .expect("winner set")
                })
                .collect()
        };

        assert_eq!(run(9), run(9));
    }

    #[test]
    fn test_finish_game_unknown_match_returns_not_found() {
        let (engine, _) = two_player_engine(0, 0);
        let result = engine.finish_game(&MatchId("ghost".into()));
        assert!(matches!(result, Err(MatchError::NotFound(_))));
    }

    // =====================================================================
    // sweep_expired()
    // =====================================================================

    #[test]
    fn test_sweep_discards_abandoned_and_keeps_recent_finished() {
        // Zero countdown and zero play duration: sessions are born at
        // their deadline, so any later sweep sees them as expired.
        let config = MatchConfig {
            start_countdown: Duration::ZERO,
            play_duration: Duration::ZERO,
            ..MatchConfig::default()
        };
        let ledger = TestLedger::with_players(vec![
            PlayerRecord::new(pid(1), "ash").with_coins(500),
            PlayerRecord::new(pid(2), "brook").with_coins(500),
            PlayerRecord::new(pid(3), "cid").with_coins(500),
            PlayerRecord::new(pid(4), "dot").with_coins(500),
        ]);
        let engine = MatchmakingEngine::with_seed(Arc::clone(&ledger) as _, config, 7);

        // One abandoned session (1 vs 2)…
        engine.find_opponent(pid(1)).unwrap();
        let abandoned = match engine.find_opponent(pid(2)).unwrap() {
            MatchReply::Found { match_id, .. } => match_id,
            other => panic!("expected FOUND, got {other:?}"),
        };
        // …and one explicitly finished session (3 vs 4).
        engine.find_opponent(pid(3)).unwrap();
        let finished = match engine.find_opponent(pid(4)).unwrap() {
            MatchReply::Found { match_id, .. } => match_id,
            other => panic!("expected FOUND, got {other:?}"),
        };
        engine.finish_game(&finished).unwrap();

        let stats = engine.sweep_expired(UnixMillis::now() + Duration::from_secs(1));

        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.reclaimed, 0, "finished session is inside retention");
        assert!(engine.session(&abandoned).is_none());
        assert!(engine.session(&finished).is_some());
    }
}
