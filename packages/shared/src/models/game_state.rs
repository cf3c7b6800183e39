use serde::{Deserialize, Serialize};

use crate::models::game::{GameResult, GameStatus, Termination};

/// The accepted move as echoed back to clients. Pieces use single letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSummary {
    pub from: String,
    pub to: String,
    pub san: String,
    pub piece: char,
    pub captured: Option<char>,
    pub promotion: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub fen: String,
    /// `w` or `b`.
    pub turn: char,
    pub check: bool,
    pub checkmate: bool,
    pub stalemate: bool,
    pub draw: bool,
    pub game_over: bool,
    pub move_number: u32,
    pub status: GameStatus,
    pub result: Option<GameResult>,
    pub termination: Option<Termination>,
}

/// Success payload of a move submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    #[serde(rename = "move")]
    pub summary: MoveSummary,
    pub game_state: GameStateSnapshot,
}
