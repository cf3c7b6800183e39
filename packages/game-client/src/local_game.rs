use shared::models::game::{GameDetails, STARTING_POSITION};
use shared::models::game_state::MoveOutcome;
use shared::models::move_request::MoveRequest;
use shared::services::rules_engine::{AppliedMove, CandidateMove, RulesEngine};

use crate::errors::ReconcileError;

/// A move shown locally before the server has confirmed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub request: MoveRequest,
    pub applied: AppliedMove,
}

/// Client view of one game. `baseline` is the last server-confirmed
/// position; `pending` is at most one unconfirmed move on top of it.
///
/// Values are never mutated in place: each transition returns a new
/// `LocalGame`, so rolling back is just keeping the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalGame {
    baseline: String,
    prior_positions: Vec<String>,
    pending: Option<PendingMove>,
}

impl LocalGame {
    pub fn new(baseline: &str, prior_positions: Vec<String>) -> Self {
        LocalGame {
            baseline: baseline.to_string(),
            prior_positions,
            pending: None,
        }
    }

    pub fn from_details(details: &GameDetails) -> Self {
        let mut prior_positions = Vec::with_capacity(details.moves.len());
        if !details.moves.is_empty() {
            prior_positions.push(STARTING_POSITION.to_string());
            prior_positions.extend(details.moves.iter().map(|m| m.position_after.clone()));
            prior_positions.pop();
        }
        LocalGame::new(&details.game.current_position, prior_positions)
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    pub fn is_tentative(&self) -> bool {
        self.pending.is_some()
    }

    /// Position to display: the pending move's result if there is one.
    pub fn position(&self) -> &str {
        self.pending
            .as_ref()
            .map_or(&self.baseline, |p| &p.applied.position_after)
    }

    pub fn propose(
        &self,
        rules: &dyn RulesEngine,
        request: &MoveRequest,
    ) -> Result<LocalGame, ReconcileError> {
        if self.pending.is_some() {
            return Err(ReconcileError::MoveInFlight);
        }
        let candidate =
            CandidateMove::try_from(request).map_err(ReconcileError::IllegalLocalMove)?;
        let applied = rules
            .try_move(&self.baseline, &candidate, &self.prior_positions)
            .map_err(ReconcileError::IllegalLocalMove)?;

        Ok(LocalGame {
            pending: Some(PendingMove {
                request: request.clone(),
                applied,
            }),
            ..self.clone()
        })
    }

    /// Adopts the server-reported position as the new baseline.
    pub fn confirm(&self, outcome: &MoveOutcome) -> LocalGame {
        let mut prior_positions = self.prior_positions.clone();
        prior_positions.push(self.baseline.clone());
        LocalGame {
            baseline: outcome.game_state.fen.clone(),
            prior_positions,
            pending: None,
        }
    }

    pub fn roll_back(&self) -> LocalGame {
        LocalGame {
            pending: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::game::{Game, GameStatus, TimeControl};
    use shared::models::game_move::GameMove;
    use shared::models::game_state::{GameStateSnapshot, MoveSummary};
    use shared::services::chess_service::ChessService;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

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

    #[test]
    fn test_propose_shows_move_without_touching_baseline() {
        let game = LocalGame::new(STARTING_POSITION, Vec::new());

        let tentative = game
            .propose(&ChessService::new(), &MoveRequest::new("e2", "e4"))
            .unwrap();

        assert!(tentative.is_tentative());
        assert_eq!(tentative.baseline(), STARTING_POSITION);
        assert_eq!(tentative.position(), AFTER_E4);
        assert!(!game.is_tentative());
    }

    #[test]
    fn test_second_proposal_is_rejected() {
        let tentative = LocalGame::new(STARTING_POSITION, Vec::new())
            .propose(&ChessService::new(), &MoveRequest::new("e2", "e4"))
            .unwrap();

        let result = tentative.propose(&ChessService::new(), &MoveRequest::new("d2", "d4"));

        assert_eq!(result, Err(ReconcileError::MoveInFlight));
    }

    #[test]
    fn test_illegal_proposal_is_rejected_locally() {
        let game = LocalGame::new(STARTING_POSITION, Vec::new());

        let result = game.propose(&ChessService::new(), &MoveRequest::new("e2", "e5"));

        assert!(matches!(result, Err(ReconcileError::IllegalLocalMove(_))));
    }

    #[test]
    fn test_roll_back_restores_baseline() {
        let game = LocalGame::new(STARTING_POSITION, Vec::new());
        let tentative = game
            .propose(&ChessService::new(), &MoveRequest::new("e2", "e4"))
            .unwrap();

        assert_eq!(tentative.roll_back(), game);
    }

    #[test]
    fn test_confirm_adopts_server_position() {
        let tentative = LocalGame::new(STARTING_POSITION, Vec::new())
            .propose(&ChessService::new(), &MoveRequest::new("e2", "e4"))
            .unwrap();

        let confirmed = tentative.confirm(&outcome(AFTER_E4));

        assert!(!confirmed.is_tentative());
        assert_eq!(confirmed.baseline(), AFTER_E4);
        assert_eq!(confirmed.prior_positions, vec![STARTING_POSITION.to_string()]);
    }

    #[test]
    fn test_from_details_rebuilds_history() {
        let mut game = Game::new("w", "b", TimeControl::default());
        game.current_position = AFTER_E4.to_string();
        let tentative = LocalGame::new(STARTING_POSITION, Vec::new())
            .propose(&ChessService::new(), &MoveRequest::new("e2", "e4"))
            .unwrap();
        let applied = tentative.pending().unwrap().applied.clone();
        let details = GameDetails {
            game,
            moves: vec![GameMove {
                id: "m1".into(),
                game_id: "g".into(),
                move_number: 1,
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
        };

        let local = LocalGame::from_details(&details);

        assert_eq!(local.baseline(), AFTER_E4);
        assert_eq!(local.prior_positions, vec![STARTING_POSITION.to_string()]);
    }
}
