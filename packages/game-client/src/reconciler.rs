use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument, warn};

use crate::errors::{ReconcileError, TransportError};
use crate::local_game::LocalGame;
use crate::retry::{retry, RetryPolicy};
use crate::transport::GameTransport;
use shared::models::game_state::MoveOutcome;
use shared::models::move_request::MoveRequest;
use shared::services::rules_engine::RulesEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A move is shown locally and awaiting the server.
    Tentative,
}

/// How a played move ended. Either way the reconciler is idle again; after
/// an ambiguous failure the baseline is the server's current position.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveResolution {
    Confirmed(MoveOutcome),
    RolledBack(TransportError),
}

/// Applies moves optimistically on the client and reconciles them with
/// the server's verdict.
pub struct MoveReconciler {
    game_id: String,
    transport: Arc<dyn GameTransport>,
    rules: Arc<dyn RulesEngine>,
    policy: RetryPolicy,
    state: Arc<Mutex<LocalGame>>,
}

impl MoveReconciler {
    pub fn new(
        game_id: &str,
        local: LocalGame,
        transport: Arc<dyn GameTransport>,
        rules: Arc<dyn RulesEngine>,
        policy: RetryPolicy,
    ) -> Self {
        MoveReconciler {
            game_id: game_id.to_string(),
            transport,
            rules,
            policy,
            state: Arc::new(Mutex::new(local)),
        }
    }

    /// Loads the game from the server and starts from its current position.
    pub async fn attach(
        game_id: &str,
        transport: Arc<dyn GameTransport>,
        rules: Arc<dyn RulesEngine>,
        policy: RetryPolicy,
    ) -> Result<Self, ReconcileError> {
        let details = retry(&policy, || transport.get_game(game_id)).await?;
        let local = LocalGame::from_details(&details);
        Ok(MoveReconciler::new(game_id, local, transport, rules, policy))
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn local(&self) -> LocalGame {
        lock(&self.state).clone()
    }

    pub fn phase(&self) -> Phase {
        if lock(&self.state).is_tentative() {
            Phase::Tentative
        } else {
            Phase::Idle
        }
    }

    /// Target squares reachable from `from` in the displayed position.
    pub fn legal_targets(&self, from: &str) -> Vec<String> {
        let position = lock(&self.state).position().to_string();
        let mut targets: Vec<String> = self
            .rules
            .legal_moves(&position)
            .unwrap_or_default()
            .into_iter()
            .filter(|uci| uci.starts_with(from))
            .filter_map(|uci| uci.get(2..4).map(str::to_string))
            .collect();
        targets.dedup();
        targets
    }

    /// Shows `request` locally, submits it, and settles on the server's
    /// answer. Illegal moves are rejected without contacting the server.
    ///
    /// The submission runs on its own task, which also settles local state.
    /// If this future is dropped the move stays tentative until the server
    /// answers, so no second move can be sent in the meantime.
    #[instrument(skip(self, request), fields(game_id = %self.game_id, from = %request.from, to = %request.to))]
    pub async fn play(&self, request: MoveRequest) -> Result<MoveResolution, ReconcileError> {
        {
            let mut state = lock(&self.state);
            let tentative = state.propose(self.rules.as_ref(), &request)?;
            *state = tentative;
        }

        let submission = tokio::spawn(submit_and_settle(
            self.state.clone(),
            self.transport.clone(),
            self.policy.clone(),
            self.game_id.clone(),
            request,
        ));

        match submission.await {
            Ok(resolution) => Ok(resolution),
            Err(e) => {
                let mut state = lock(&self.state);
                *state = state.roll_back();
                Ok(MoveResolution::RolledBack(TransportError::Network(format!(
                    "submission task failed: {}",
                    e
                ))))
            }
        }
    }

    /// Replaces local state with the server's view of the game.
    pub async fn resync(&self) -> Result<(), ReconcileError> {
        if lock(&self.state).is_tentative() {
            return Err(ReconcileError::MoveInFlight);
        }
        let details = retry(&self.policy, || self.transport.get_game(&self.game_id)).await?;
        let mut state = lock(&self.state);
        if state.is_tentative() {
            return Err(ReconcileError::MoveInFlight);
        }
        *state = LocalGame::from_details(&details);
        Ok(())
    }
}

fn lock(state: &Mutex<LocalGame>) -> MutexGuard<'_, LocalGame> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends the pending move and moves local state out of Tentative.
///
/// A failure after a retried or ambiguous attempt may hide a move the
/// server already applied, so the baseline is reloaded from the server
/// instead of simply discarding the pending move.
async fn submit_and_settle(
    state: Arc<Mutex<LocalGame>>,
    transport: Arc<dyn GameTransport>,
    policy: RetryPolicy,
    game_id: String,
    request: MoveRequest,
) -> MoveResolution {
    let mut attempts = 0u32;
    let result = retry(&policy, || {
        attempts += 1;
        transport.submit_move(&game_id, &request)
    })
    .await;

    let err = match result {
        Ok(outcome) => {
            let mut state = lock(&state);
            *state = state.confirm(&outcome);
            debug!("Move confirmed as {}", outcome.summary.san);
            return MoveResolution::Confirmed(outcome);
        }
        Err(err) => err,
    };

    let server_view = if attempts > 1 || err.is_retryable() {
        match retry(&policy, || transport.get_game(&game_id)).await {
            Ok(details) => Some(details),
            Err(reload_err) => {
                warn!("Could not reload game after failed move: {}", reload_err);
                None
            }
        }
    } else {
        None
    };

    let mut state = lock(&state);
    *state = match &server_view {
        Some(details) => LocalGame::from_details(details),
        None => state.roll_back(),
    };
    info!("Move rolled back: {}", err);
    MoveResolution::RolledBack(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared::models::api_response::ErrorCode;
    use shared::models::game::{Game, GameDetails, GameStatus, TimeControl, STARTING_POSITION};
    use shared::models::game_move::GameMove;
    use shared::models::game_state::{GameStateSnapshot, MoveSummary};
    use shared::services::chess_service::ChessService;
    use shared::services::rules_engine::CandidateMove;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    /// Replays scripted answers; optionally holds each call until released.
    #[derive(Default)]
    struct ScriptedTransport {
        answers: Mutex<VecDeque<Result<MoveOutcome, TransportError>>>,
        calls: AtomicU32,
        completed: AtomicU32,
        gate: Option<Arc<Notify>>,
        server_game: Option<GameDetails>,
    }

    impl ScriptedTransport {
        fn answering(answers: Vec<Result<MoveOutcome, TransportError>>) -> Self {
            ScriptedTransport {
                answers: Mutex::new(answers.into()),
                ..Default::default()
            }
        }

        fn gated(self, gate: Arc<Notify>) -> Self {
            ScriptedTransport {
                gate: Some(gate),
                ..self
            }
        }

        fn with_server_game(self, details: GameDetails) -> Self {
            ScriptedTransport {
                server_game: Some(details),
                ..self
            }
        }
    }

    #[async_trait]
    impl GameTransport for ScriptedTransport {
        async fn submit_move(
            &self,
            _game_id: &str,
            _request: &MoveRequest,
        ) -> Result<MoveOutcome, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let answer = self
                .answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(TransportError::Network("no answer scripted".into())));
            self.completed.fetch_add(1, Ordering::SeqCst);
            answer
        }

        async fn get_game(&self, _game_id: &str) -> Result<GameDetails, TransportError> {
            self.server_game
                .clone()
                .ok_or(TransportError::Status {
                    status: 404,
                    code: Some(ErrorCode::GameNotFound),
                    message: "not scripted".into(),
                })
        }
    }

    fn outcome(fen: &str) -> MoveOutcome {
        MoveOutcome {
            summary: MoveSummary {
                from: "e2".into(),
                to: "e4".into(),
                san: "e4".into(),
                piece: 'p',
                captured: None,
                promotion: None,
            },
            game_state: GameStateSnapshot {
                fen: fen.to_string(),
                turn: 'b',
                check: false,
                checkmate: false,
                stalemate: false,
                draw: false,
                game_over: false,
                move_number: 1,
                status: GameStatus::Active,
                result: None,
                termination: None,
            },
        }
    }

    /// Server state after white's e2-e4 has been committed.
    fn server_after_e4() -> GameDetails {
        let applied = ChessService::new()
            .try_move(
                STARTING_POSITION,
                &CandidateMove::try_from(&MoveRequest::new("e2", "e4")).unwrap(),
                &[],
            )
            .unwrap();
        let mut game = Game::new("white", "black", TimeControl::default());
        game.current_position = applied.position_after.clone();
        game.move_count = 1;
        GameDetails {
            game,
            moves: vec![GameMove {
                id: "m1".into(),
                game_id: "game-1".into(),
                move_number: applied.move_number,
                color: applied.color,
                from_square: applied.from,
                to_square: applied.to,
                piece_moved: applied.piece,
                captured_piece: None,
                is_castling: false,
                is_en_passant: false,
                promotion_piece: None,
                check_status: None,
                notation: applied.san,
                position_after: applied.position_after,
                time_taken: None,
                time_left: 600_000,
                created_at: chrono::Utc::now(),
            }],
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            attempt_timeout: Duration::from_secs(5),
        }
    }

    fn reconciler(transport: Arc<ScriptedTransport>) -> MoveReconciler {
        MoveReconciler::new(
            "game-1",
            LocalGame::new(STARTING_POSITION, Vec::new()),
            transport,
            Arc::new(ChessService::new()),
            policy(),
        )
    }

    #[tokio::test]
    async fn test_confirmed_move_becomes_baseline() {
        let transport = Arc::new(ScriptedTransport::answering(vec![Ok(outcome(AFTER_E4))]));
        let reconciler = reconciler(transport.clone());

        let resolution = reconciler.play(MoveRequest::new("e2", "e4")).await.unwrap();

        assert!(matches!(resolution, MoveResolution::Confirmed(_)));
        assert_eq!(reconciler.phase(), Phase::Idle);
        assert_eq!(reconciler.local().baseline(), AFTER_E4);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejection_rolls_back_to_baseline() {
        let rejection = TransportError::Status {
            status: 400,
            code: Some(ErrorCode::GameNotActive),
            message: "Game is not active".into(),
        };
        let transport = Arc::new(ScriptedTransport::answering(vec![Err(rejection.clone())]));
        let reconciler = reconciler(transport.clone());

        let resolution = reconciler.play(MoveRequest::new("e2", "e4")).await.unwrap();

        assert_eq!(resolution, MoveResolution::RolledBack(rejection));
        assert_eq!(reconciler.phase(), Phase::Idle);
        assert_eq!(reconciler.local().position(), STARTING_POSITION);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_roll_back() {
        let conflict = TransportError::Status {
            status: 409,
            code: Some(ErrorCode::Conflict),
            message: "stale".into(),
        };
        let transport = Arc::new(ScriptedTransport::answering(vec![
            Err(conflict.clone()),
            Err(conflict.clone()),
        ]));
        let reconciler = reconciler(transport.clone());

        let resolution = reconciler.play(MoveRequest::new("e2", "e4")).await.unwrap();

        assert_eq!(resolution, MoveResolution::RolledBack(conflict));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(reconciler.local().baseline(), STARTING_POSITION);
    }

    #[tokio::test]
    async fn test_illegal_move_never_reaches_server() {
        let transport = Arc::new(ScriptedTransport::default());
        let reconciler = reconciler(transport.clone());

        let result = reconciler.play(MoveRequest::new("e2", "e5")).await;

        assert!(matches!(result, Err(ReconcileError::IllegalLocalMove(_))));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reconciler.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_one_tentative_move_at_a_time() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(
            ScriptedTransport::answering(vec![Ok(outcome(AFTER_E4))]).gated(gate.clone()),
        );
        let reconciler = Arc::new(reconciler(transport.clone()));

        let first = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.play(MoveRequest::new("e2", "e4")).await })
        };
        while transport.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(reconciler.phase(), Phase::Tentative);
        assert_eq!(reconciler.local().position(), AFTER_E4);
        let second = reconciler.play(MoveRequest::new("d2", "d4")).await;
        assert_eq!(second, Err(ReconcileError::MoveInFlight));

        gate.notify_one();
        let resolution = first.await.unwrap().unwrap();
        assert!(matches!(resolution, MoveResolution::Confirmed(_)));
        assert_eq!(reconciler.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_abandoned_play_blocks_new_moves_until_settled() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(
            ScriptedTransport::answering(vec![Ok(outcome(AFTER_E4))]).gated(gate.clone()),
        );
        let reconciler = Arc::new(reconciler(transport.clone()));

        let play = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.play(MoveRequest::new("e2", "e4")).await })
        };
        while transport.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        play.abort();
        assert!(play.await.unwrap_err().is_cancelled());

        assert_eq!(reconciler.phase(), Phase::Tentative);
        let second = reconciler.play(MoveRequest::new("d2", "d4")).await;
        assert_eq!(second, Err(ReconcileError::MoveInFlight));
        assert_eq!(reconciler.resync().await, Err(ReconcileError::MoveInFlight));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        while reconciler.phase() == Phase::Tentative {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.completed.load(Ordering::SeqCst), 1);
        assert_eq!(reconciler.local().baseline(), AFTER_E4);
    }

    #[tokio::test]
    async fn test_lost_response_then_rejection_reloads_server_position() {
        let invalid = TransportError::Status {
            status: 400,
            code: Some(ErrorCode::InvalidMove),
            message: "Not your turn".into(),
        };
        let transport = Arc::new(
            ScriptedTransport::answering(vec![Err(TransportError::Timeout), Err(invalid.clone())])
                .with_server_game(server_after_e4()),
        );
        let reconciler = reconciler(transport.clone());

        let resolution = reconciler.play(MoveRequest::new("e2", "e4")).await.unwrap();

        assert_eq!(resolution, MoveResolution::RolledBack(invalid));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(reconciler.phase(), Phase::Idle);
        assert_eq!(reconciler.local().baseline(), AFTER_E4);

        let reply = reconciler.local().propose(&ChessService::new(), &MoveRequest::new("e7", "e5"));
        assert!(reply.is_ok());
    }

    #[tokio::test]
    async fn test_first_attempt_rejection_does_not_reload() {
        let invalid = TransportError::Status {
            status: 400,
            code: Some(ErrorCode::InvalidMove),
            message: "Illegal move".into(),
        };
        let transport = Arc::new(
            ScriptedTransport::answering(vec![Err(invalid.clone())])
                .with_server_game(server_after_e4()),
        );
        let reconciler = reconciler(transport.clone());

        let resolution = reconciler.play(MoveRequest::new("e2", "e4")).await.unwrap();

        assert_eq!(resolution, MoveResolution::RolledBack(invalid));
        assert_eq!(reconciler.local().baseline(), STARTING_POSITION);
    }

    #[tokio::test]
    async fn test_legal_targets_from_square() {
        let reconciler = reconciler(Arc::new(ScriptedTransport::default()));

        let mut targets = reconciler.legal_targets("g1");
        targets.sort();

        assert_eq!(targets, vec!["f3".to_string(), "h3".to_string()]);
        assert!(reconciler.legal_targets("e5").is_empty());
    }
}
