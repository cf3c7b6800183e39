use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game::Color;
use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::Pawn => "pawn",
            PieceKind::Knight => "knight",
            PieceKind::Bishop => "bishop",
            PieceKind::Rook => "rook",
            PieceKind::Queen => "queen",
            PieceKind::King => "king",
        }
    }

    /// Lowercase single-letter code, e.g. `n` for a knight.
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub fn is_promotion_target(self) -> bool {
        matches!(
            self,
            PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen
        )
    }
}

impl FromStr for PieceKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "p" | "pawn" => Ok(PieceKind::Pawn),
            "n" | "knight" => Ok(PieceKind::Knight),
            "b" | "bishop" => Ok(PieceKind::Bishop),
            "r" | "rook" => Ok(PieceKind::Rook),
            "q" | "queen" => Ok(PieceKind::Queen),
            "k" | "king" => Ok(PieceKind::King),
            _ => Err(UnknownVariant::new("piece", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Check,
    Checkmate,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Check => "check",
            CheckStatus::Checkmate => "checkmate",
        }
    }
}

impl FromStr for CheckStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check" => Ok(CheckStatus::Check),
            "checkmate" => Ok(CheckStatus::Checkmate),
            _ => Err(UnknownVariant::new("check status", s)),
        }
    }
}

/// One accepted half-move. Records are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMove {
    pub id: String,
    pub game_id: String,
    /// Full-move index: white's move and black's reply share a number.
    pub move_number: u32,
    pub color: Color,
    pub from_square: String,
    pub to_square: String,
    pub piece_moved: PieceKind,
    pub captured_piece: Option<PieceKind>,
    pub is_castling: bool,
    pub is_en_passant: bool,
    pub promotion_piece: Option<PieceKind>,
    pub check_status: Option<CheckStatus>,
    #[serde(rename = "move_notation")]
    pub notation: String,
    pub position_after: String,
    /// Milliseconds the mover spent, as reported by the client.
    pub time_taken: Option<u64>,
    /// Milliseconds left on the mover's clock after the move.
    pub time_left: u64,
    pub created_at: DateTime<Utc>,
}

impl GameMove {
    /// Sort key giving history order: by move number, white before black.
    pub fn history_key(&self) -> (u32, u8) {
        let side = match self.color {
            Color::White => 0,
            Color::Black => 1,
        };
        (self.move_number, side)
    }
}

pub fn sort_history(moves: &mut [GameMove]) {
    moves.sort_by_key(GameMove::history_key);
}

/// True for algebraic squares `a1` through `h8`.
pub fn is_valid_square(square: &str) -> bool {
    let bytes = square.as_bytes();
    bytes.len() == 2 && (b'a'..=b'h').contains(&bytes[0]) && (b'1'..=b'8').contains(&bytes[1])
}
