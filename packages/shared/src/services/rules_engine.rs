use crate::models::game::{Color, Termination};
use crate::models::game_move::{is_valid_square, CheckStatus, PieceKind};
use crate::models::move_request::MoveRequest;
use crate::services::errors::chess_service_errors::ChessServiceError;

/// A move as proposed by a player, with squares already checked for shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMove {
    pub from: String,
    pub to: String,
    pub promotion: Option<PieceKind>,
}

impl CandidateMove {
    pub fn new(from: &str, to: &str, promotion: Option<PieceKind>) -> Self {
        CandidateMove {
            from: from.to_string(),
            to: to.to_string(),
            promotion,
        }
    }
}

impl TryFrom<&MoveRequest> for CandidateMove {
    type Error = ChessServiceError;

    fn try_from(request: &MoveRequest) -> Result<Self, Self::Error> {
        for square in [&request.from, &request.to] {
            if !is_valid_square(square) {
                return Err(ChessServiceError::ValidationError(format!(
                    "Invalid square: {}",
                    square
                )));
            }
        }
        let promotion = match request.promotion.as_deref() {
            None | Some("") => None,
            Some(raw) => match raw.parse::<PieceKind>() {
                Ok(piece) if piece.is_promotion_target() => Some(piece),
                _ => {
                    return Err(ChessServiceError::ValidationError(format!(
                        "Invalid promotion piece: {}",
                        raw
                    )))
                }
            },
        };
        Ok(CandidateMove::new(&request.from, &request.to, promotion))
    }
}

/// Facts about the position reached after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionFacts {
    pub turn: Color,
    pub in_check: bool,
    pub checkmate: bool,
    pub stalemate: bool,
    pub insufficient_material: bool,
    pub threefold_repetition: bool,
    pub fifty_move_rule: bool,
    /// Full-move counter of the resulting position.
    pub fullmove_number: u32,
}

impl PositionFacts {
    /// The first applicable draw reason, if any.
    pub fn draw_reason(&self) -> Option<Termination> {
        if self.checkmate {
            None
        } else if self.stalemate {
            Some(Termination::Stalemate)
        } else if self.insufficient_material {
            Some(Termination::InsufficientMaterial)
        } else if self.threefold_repetition {
            Some(Termination::ThreefoldRepetition)
        } else if self.fifty_move_rule {
            Some(Termination::FiftyMoveRule)
        } else {
            None
        }
    }

    pub fn is_draw(&self) -> bool {
        self.draw_reason().is_some()
    }

    pub fn is_game_over(&self) -> bool {
        self.checkmate || self.is_draw()
    }

    pub fn check_status(&self) -> Option<CheckStatus> {
        if self.checkmate {
            Some(CheckStatus::Checkmate)
        } else if self.in_check {
            Some(CheckStatus::Check)
        } else {
            None
        }
    }
}

/// A legal move applied to a position, with everything needed to record it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub from: String,
    pub to: String,
    pub color: Color,
    pub piece: PieceKind,
    pub captured: Option<PieceKind>,
    pub promotion: Option<PieceKind>,
    pub is_castling: bool,
    pub is_en_passant: bool,
    pub san: String,
    /// Full-move index of the position the move was played from.
    pub move_number: u32,
    pub position_after: String,
    pub facts: PositionFacts,
}

/// Pure chess rules over serialized positions.
pub trait RulesEngine: Send + Sync {
    /// Applies `candidate` to `position`. `prior_positions` are the positions
    /// that preceded `position` in the same game, oldest first, and feed
    /// repetition detection.
    fn try_move(
        &self,
        position: &str,
        candidate: &CandidateMove,
        prior_positions: &[String],
    ) -> Result<AppliedMove, ChessServiceError>;

    /// Legal moves in long algebraic form, e.g. `e2e4` or `a7a8q`.
    fn legal_moves(&self, position: &str) -> Result<Vec<String>, ChessServiceError>;
}
