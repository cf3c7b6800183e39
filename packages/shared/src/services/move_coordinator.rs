use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    models::{
        game::{Color, Game, GameResult, GameStatus, Termination, STARTING_POSITION},
        game_move::{GameMove, PieceKind},
        game_state::{GameStateSnapshot, MoveOutcome, MoveSummary},
        move_request::MoveRequest,
    },
    repositories::game_repository::{GameRepository, GameVersion},
    services::{
        errors::move_coordinator_errors::MoveCoordinatorError,
        rules_engine::{AppliedMove, CandidateMove, PositionFacts, RulesEngine},
    },
};

/// Server-side authority for move submission.
///
/// A submission is checked against the stored game, validated by the rules
/// engine and persisted as one conditional write: the new move and the
/// updated game are stored together only if the game has not changed since
/// it was read. A lost race surfaces as `Conflict` and nothing is written.
#[derive(Clone)]
pub struct MoveCoordinator {
    repository: Arc<dyn GameRepository + Send + Sync>,
    rules: Arc<dyn RulesEngine + Send + Sync>,
}

impl MoveCoordinator {
    pub fn new(
        repository: Arc<dyn GameRepository + Send + Sync>,
        rules: Arc<dyn RulesEngine + Send + Sync>,
    ) -> Self {
        MoveCoordinator { repository, rules }
    }

    #[instrument(skip(self, request), fields(from = %request.from, to = %request.to))]
    pub async fn submit_move(
        &self,
        game_id: &str,
        request: &MoveRequest,
    ) -> Result<MoveOutcome, MoveCoordinatorError> {
        let game = self
            .repository
            .get_game(game_id)
            .await?
            .ok_or_else(|| MoveCoordinatorError::GameNotFound(game_id.to_string()))?;

        if !game.status.accepts_moves() {
            debug!("Rejected move for game in status {}", game.status.as_str());
            return Err(MoveCoordinatorError::GameNotActive(game.status));
        }

        let candidate = CandidateMove::try_from(request)?;
        let history = self.prior_positions(&game).await?;
        let applied = self
            .rules
            .try_move(&game.current_position, &candidate, &history)
            .map_err(|e| {
                let err = MoveCoordinatorError::from(e);
                if let MoveCoordinatorError::CorruptGame(msg) = &err {
                    warn!("Stored position for game {} is unreadable: {}", game.id, msg);
                }
                err
            })?;

        let now = Utc::now();
        let game_move = record_move(&game, &applied, request, now);
        let updated = advance_game(&game, &applied, request, now);

        self.repository
            .append_move(&GameVersion::of(&game), &updated, &game_move)
            .await?;

        if updated.status == GameStatus::Completed {
            info!(
                "Game {} completed: {} ({})",
                updated.id,
                updated.result.map_or("*", |r| r.as_str()),
                updated.termination.map_or("unknown", |t| t.as_str())
            );
        }

        Ok(outcome(&applied, &updated))
    }

    /// Positions preceding the current one, oldest first.
    async fn prior_positions(&self, game: &Game) -> Result<Vec<String>, MoveCoordinatorError> {
        if game.move_count == 0 {
            return Ok(Vec::new());
        }
        let moves = self.repository.list_moves(&game.id).await?;
        let mut positions = Vec::with_capacity(moves.len() + 1);
        positions.push(STARTING_POSITION.to_string());
        positions.extend(moves.into_iter().map(|m| m.position_after));
        positions.pop();
        Ok(positions)
    }
}

/// Result and termination for a finished game, or `None` if play continues.
pub fn terminal_outcome(
    mover: Color,
    facts: &PositionFacts,
) -> Option<(GameResult, Termination)> {
    if facts.checkmate {
        return Some((GameResult::win_for(mover), Termination::Checkmate));
    }
    facts
        .draw_reason()
        .map(|reason| (GameResult::Draw, reason))
}

pub fn record_move(
    game: &Game,
    applied: &AppliedMove,
    request: &MoveRequest,
    now: DateTime<Utc>,
) -> GameMove {
    GameMove {
        id: Uuid::new_v4().to_string(),
        game_id: game.id.clone(),
        move_number: applied.move_number,
        color: applied.color,
        from_square: applied.from.clone(),
        to_square: applied.to.clone(),
        piece_moved: applied.piece,
        captured_piece: applied.captured,
        is_castling: applied.is_castling,
        is_en_passant: applied.is_en_passant,
        promotion_piece: applied.promotion,
        check_status: applied.facts.check_status(),
        notation: applied.san.clone(),
        position_after: applied.position_after.clone(),
        time_taken: request.time_taken,
        time_left: request
            .time_left
            .unwrap_or_else(|| u64::from(game.clock_for(applied.color)) * 1000),
        created_at: now,
    }
}

/// The game as it stands after `applied`.
pub fn advance_game(
    game: &Game,
    applied: &AppliedMove,
    request: &MoveRequest,
    now: DateTime<Utc>,
) -> Game {
    let mut updated = game.clone();
    updated.current_position = applied.position_after.clone();
    updated.move_count = game.move_count + 1;
    updated.last_move_at = Some(now);
    updated.game_pgn = Some(append_movetext(game.game_pgn.as_deref(), applied));

    if let Some(time_left) = request.time_left {
        let seconds = u32::try_from(time_left / 1000).unwrap_or(u32::MAX);
        updated.set_clock(applied.color, seconds);
    }

    if game.status == GameStatus::Waiting {
        updated.status = GameStatus::Active;
        updated.started_at = Some(now);
    }

    if let Some((result, termination)) = terminal_outcome(applied.color, &applied.facts) {
        updated.status = GameStatus::Completed;
        updated.result = Some(result);
        updated.termination = Some(termination);
        if termination == Termination::Checkmate {
            updated.winner_id = Some(game.player_for(applied.color).to_string());
        }
        if updated.ended_at.is_none() {
            updated.ended_at = Some(now);
        }
    }

    updated
}

fn append_movetext(movetext: Option<&str>, applied: &AppliedMove) -> String {
    let existing = movetext.unwrap_or("").trim();
    let token = match applied.color {
        Color::White => format!("{}. {}", applied.move_number, applied.san),
        Color::Black if existing.is_empty() => {
            format!("{}... {}", applied.move_number, applied.san)
        }
        Color::Black => applied.san.clone(),
    };
    if existing.is_empty() {
        token
    } else {
        format!("{} {}", existing, token)
    }
}

fn outcome(applied: &AppliedMove, updated: &Game) -> MoveOutcome {
    let facts = &applied.facts;
    MoveOutcome {
        summary: MoveSummary {
            from: applied.from.clone(),
            to: applied.to.clone(),
            san: applied.san.clone(),
            piece: applied.piece.letter(),
            captured: applied.captured.map(PieceKind::letter),
            promotion: applied.promotion.map(PieceKind::letter),
        },
        game_state: GameStateSnapshot {
            fen: applied.position_after.clone(),
            turn: facts.turn.letter(),
            check: facts.in_check,
            checkmate: facts.checkmate,
            stalemate: facts.stalemate,
            draw: facts.is_draw(),
            game_over: facts.is_game_over(),
            move_number: facts.fullmove_number,
            status: updated.status,
            result: updated.result,
            termination: updated.termination,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::TimeControl;
    use crate::models::game_move::CheckStatus;
    use crate::repositories::errors::game_repository_errors::GameRepositoryError;
    use crate::repositories::game_repository::MockGameRepository;
    use crate::services::chess_service::ChessService;
    use crate::services::errors::chess_service_errors::ChessServiceError;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    struct ScriptedEngine {
        result: Result<AppliedMove, ChessServiceError>,
    }

    impl RulesEngine for ScriptedEngine {
        fn try_move(
            &self,
            _position: &str,
            _candidate: &CandidateMove,
            _prior_positions: &[String],
        ) -> Result<AppliedMove, ChessServiceError> {
            self.result.clone()
        }

        fn legal_moves(&self, _position: &str) -> Result<Vec<String>, ChessServiceError> {
            Ok(Vec::new())
        }
    }

    fn facts() -> PositionFacts {
        PositionFacts {
            turn: Color::Black,
            in_check: false,
            checkmate: false,
            stalemate: false,
            insufficient_material: false,
            threefold_repetition: false,
            fifty_move_rule: false,
            fullmove_number: 1,
        }
    }

    fn applied_e4() -> AppliedMove {
        AppliedMove {
            from: "e2".to_string(),
            to: "e4".to_string(),
            color: Color::White,
            piece: PieceKind::Pawn,
            captured: None,
            promotion: None,
            is_castling: false,
            is_en_passant: false,
            san: "e4".to_string(),
            move_number: 1,
            position_after: AFTER_E4.to_string(),
            facts: facts(),
        }
    }

    fn game() -> Game {
        Game::new("white-id", "black-id", TimeControl::default())
    }

    fn coordinator_with(
        repository: MockGameRepository,
        rules: Arc<dyn RulesEngine + Send + Sync>,
    ) -> MoveCoordinator {
        MoveCoordinator::new(Arc::new(repository), rules)
    }

    #[tokio::test]
    async fn test_submit_move_game_not_found() {
        let mut repository = MockGameRepository::new();
        repository.expect_get_game().returning(|_| Ok(None));
        let coordinator = coordinator_with(repository, Arc::new(ChessService::new()));

        let result = coordinator
            .submit_move("missing", &MoveRequest::new("e2", "e4"))
            .await;

        match result.unwrap_err() {
            MoveCoordinatorError::GameNotFound(id) => assert_eq!(id, "missing"),
            other => panic!("Expected GameNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_move_game_not_active() {
        let mut completed = game();
        completed.status = GameStatus::Completed;
        let mut repository = MockGameRepository::new();
        repository
            .expect_get_game()
            .returning(move |_| Ok(Some(completed.clone())));
        let coordinator = coordinator_with(repository, Arc::new(ChessService::new()));

        let result = coordinator
            .submit_move("game", &MoveRequest::new("e2", "e4"))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            MoveCoordinatorError::GameNotActive(GameStatus::Completed)
        ));
        assert_eq!(
            err.code(),
            crate::models::api_response::ErrorCode::GameNotActive
        );
    }

    #[tokio::test]
    async fn test_illegal_move_writes_nothing() {
        let stored = game();
        let mut repository = MockGameRepository::new();
        repository
            .expect_get_game()
            .returning(move |_| Ok(Some(stored.clone())));
        repository.expect_append_move().never();
        let coordinator = coordinator_with(repository, Arc::new(ChessService::new()));

        let result = coordinator
            .submit_move("game", &MoveRequest::new("e2", "e5"))
            .await;

        assert!(matches!(
            result,
            Err(MoveCoordinatorError::InvalidMove(ChessServiceError::IllegalMove(_)))
        ));
    }

    #[tokio::test]
    async fn test_malformed_square_is_invalid_move() {
        let stored = game();
        let mut repository = MockGameRepository::new();
        repository
            .expect_get_game()
            .returning(move |_| Ok(Some(stored.clone())));
        repository.expect_append_move().never();
        let coordinator = coordinator_with(repository, Arc::new(ChessService::new()));

        let result = coordinator
            .submit_move("game", &MoveRequest::new("e9", "e4"))
            .await;

        assert!(matches!(
            result,
            Err(MoveCoordinatorError::InvalidMove(ChessServiceError::ValidationError(_)))
        ));
    }

    #[tokio::test]
    async fn test_first_move_activates_game_and_persists_atomically() {
        let stored = game();
        let game_id = stored.id.clone();
        let mut repository = MockGameRepository::new();
        let returned = stored.clone();
        repository
            .expect_get_game()
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_append_move()
            .withf(|expected, updated, game_move| {
                expected.move_count == 0
                    && expected.position == STARTING_POSITION
                    && updated.move_count == 1
                    && updated.current_position == AFTER_E4
                    && updated.status == GameStatus::Active
                    && updated.started_at.is_some()
                    && updated.game_pgn.as_deref() == Some("1. e4")
                    && game_move.move_number == 1
                    && game_move.color == Color::White
                    && game_move.notation == "e4"
                    && game_move.time_left == 600_000
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let coordinator = coordinator_with(repository, Arc::new(ChessService::new()));

        let outcome = coordinator
            .submit_move(&game_id, &MoveRequest::new("e2", "e4"))
            .await
            .unwrap();

        assert_eq!(outcome.summary.san, "e4");
        assert_eq!(outcome.summary.piece, 'p');
        assert_eq!(outcome.game_state.turn, 'b');
        assert_eq!(outcome.game_state.status, GameStatus::Active);
        assert_eq!(outcome.game_state.move_number, 1);
        assert!(!outcome.game_state.game_over);
        assert!(outcome.game_state.result.is_none());
    }

    #[tokio::test]
    async fn test_store_conflict_is_reported() {
        let stored = game();
        let mut repository = MockGameRepository::new();
        repository
            .expect_get_game()
            .returning(move |_| Ok(Some(stored.clone())));
        repository
            .expect_append_move()
            .returning(|_, _, _| Err(GameRepositoryError::Conflict));
        let coordinator = coordinator_with(repository, Arc::new(ChessService::new()));

        let result = coordinator
            .submit_move("game", &MoveRequest::new("e2", "e4"))
            .await;

        assert!(matches!(result, Err(MoveCoordinatorError::Conflict)));
    }

    #[tokio::test]
    async fn test_store_failure_is_internal() {
        let mut repository = MockGameRepository::new();
        repository
            .expect_get_game()
            .returning(|_| Err(GameRepositoryError::PoolExhausted));
        let coordinator = coordinator_with(repository, Arc::new(ChessService::new()));

        let err = coordinator
            .submit_move("game", &MoveRequest::new("e2", "e4"))
            .await
            .unwrap_err();

        assert!(matches!(err, MoveCoordinatorError::RepositoryError(_)));
        assert_eq!(
            err.code(),
            crate::models::api_response::ErrorCode::InternalError
        );
    }

    #[tokio::test]
    async fn test_unreadable_position_is_internal() {
        let stored = game();
        let mut repository = MockGameRepository::new();
        repository
            .expect_get_game()
            .returning(move |_| Ok(Some(stored.clone())));
        repository.expect_append_move().never();
        let engine = ScriptedEngine {
            result: Err(ChessServiceError::InvalidPosition("bad".to_string())),
        };
        let coordinator = coordinator_with(repository, Arc::new(engine));

        let result = coordinator
            .submit_move("game", &MoveRequest::new("e2", "e4"))
            .await;

        assert!(matches!(result, Err(MoveCoordinatorError::CorruptGame(_))));
    }

    #[tokio::test]
    async fn test_history_feeds_the_engine_for_later_moves() {
        let mut stored = game();
        stored.status = GameStatus::Active;
        stored.move_count = 1;
        stored.current_position = AFTER_E4.to_string();
        let first = record_move(&game(), &applied_e4(), &MoveRequest::new("e2", "e4"), Utc::now());
        let mut repository = MockGameRepository::new();
        repository
            .expect_get_game()
            .returning(move |_| Ok(Some(stored.clone())));
        repository
            .expect_list_moves()
            .times(1)
            .returning(move |_| Ok(vec![first.clone()]));
        repository
            .expect_append_move()
            .withf(|expected, _, game_move| {
                expected.move_count == 1
                    && game_move.move_number == 1
                    && game_move.color == Color::Black
            })
            .returning(|_, _, _| Ok(()));
        let coordinator = coordinator_with(repository, Arc::new(ChessService::new()));

        let outcome = coordinator
            .submit_move("game", &MoveRequest::new("e7", "e5"))
            .await
            .unwrap();

        assert_eq!(outcome.game_state.move_number, 2);
        assert_eq!(outcome.game_state.turn, 'w');
    }

    #[test]
    fn test_checkmate_completes_game_with_winner() {
        let mut stored = game();
        stored.status = GameStatus::Active;
        let applied = AppliedMove {
            color: Color::Black,
            san: "Qh4#".to_string(),
            move_number: 2,
            facts: PositionFacts {
                turn: Color::White,
                in_check: true,
                checkmate: true,
                fullmove_number: 3,
                ..facts()
            },
            ..applied_e4()
        };
        let now = Utc::now();

        let updated = advance_game(&stored, &applied, &MoveRequest::new("d8", "h4"), now);
        let record = record_move(&stored, &applied, &MoveRequest::new("d8", "h4"), now);

        assert_eq!(updated.status, GameStatus::Completed);
        assert_eq!(updated.result, Some(GameResult::BlackWins));
        assert_eq!(updated.termination, Some(Termination::Checkmate));
        assert_eq!(updated.winner_id.as_deref(), Some("black-id"));
        assert_eq!(updated.ended_at, Some(now));
        assert_eq!(record.check_status, Some(CheckStatus::Checkmate));
    }

    #[test]
    fn test_draw_keeps_winner_unset_and_existing_end_time() {
        let mut stored = game();
        stored.status = GameStatus::Active;
        let ended = Utc::now() - chrono::Duration::minutes(1);
        stored.ended_at = Some(ended);
        let applied = AppliedMove {
            facts: PositionFacts {
                stalemate: true,
                ..facts()
            },
            ..applied_e4()
        };

        let updated = advance_game(&stored, &applied, &MoveRequest::new("e2", "e4"), Utc::now());

        assert_eq!(updated.result, Some(GameResult::Draw));
        assert_eq!(updated.termination, Some(Termination::Stalemate));
        assert!(updated.winner_id.is_none());
        assert_eq!(updated.ended_at, Some(ended));
    }

    #[test]
    fn test_reported_time_left_sets_mover_clock() {
        let stored = game();
        let request = MoveRequest {
            time_taken: Some(4_200),
            time_left: Some(595_800),
            ..MoveRequest::new("e2", "e4")
        };

        let updated = advance_game(&stored, &applied_e4(), &request, Utc::now());
        let record = record_move(&stored, &applied_e4(), &request, Utc::now());

        assert_eq!(updated.white_time_left, 595);
        assert_eq!(updated.black_time_left, 600);
        assert_eq!(record.time_left, 595_800);
        assert_eq!(record.time_taken, Some(4_200));
    }

    #[test]
    fn test_movetext_numbering() {
        let black_reply = AppliedMove {
            color: Color::Black,
            san: "e5".to_string(),
            ..applied_e4()
        };
        let second_white = AppliedMove {
            san: "Nf3".to_string(),
            move_number: 2,
            ..applied_e4()
        };

        let after_white = append_movetext(None, &applied_e4());
        let after_black = append_movetext(Some(&after_white), &black_reply);
        let after_second = append_movetext(Some(&after_black), &second_white);

        assert_eq!(after_second, "1. e4 e5 2. Nf3");
        assert_eq!(append_movetext(None, &black_reply), "1... e5");
    }
}
