use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::game_move::GameMove;
use crate::models::UnknownVariant;

pub const STARTING_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }

    /// Side-to-move letter as written in a FEN string.
    pub fn letter(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

impl FromStr for Color {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" | "w" => Ok(Color::White),
            "black" | "b" => Ok(Color::Black),
            _ => Err(UnknownVariant::new("color", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Active,
    Completed,
    Aborted,
    DrawOffered,
    Adjourned,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Active => "active",
            GameStatus::Completed => "completed",
            GameStatus::Aborted => "aborted",
            GameStatus::DrawOffered => "draw_offered",
            GameStatus::Adjourned => "adjourned",
        }
    }

    pub fn accepts_moves(&self) -> bool {
        matches!(self, GameStatus::Waiting | GameStatus::Active)
    }
}

impl FromStr for GameStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(GameStatus::Waiting),
            "active" => Ok(GameStatus::Active),
            "completed" => Ok(GameStatus::Completed),
            "aborted" => Ok(GameStatus::Aborted),
            "draw_offered" => Ok(GameStatus::DrawOffered),
            "adjourned" => Ok(GameStatus::Adjourned),
            _ => Err(UnknownVariant::new("game status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    #[serde(rename = "1-0")]
    WhiteWins,
    #[serde(rename = "0-1")]
    BlackWins,
    #[serde(rename = "1/2-1/2")]
    Draw,
    #[serde(rename = "*")]
    Ongoing,
}

impl GameResult {
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => GameResult::WhiteWins,
            Color::Black => GameResult::BlackWins,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Ongoing => "*",
        }
    }
}

impl FromStr for GameResult {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1-0" => Ok(GameResult::WhiteWins),
            "0-1" => Ok(GameResult::BlackWins),
            "1/2-1/2" => Ok(GameResult::Draw),
            "*" => Ok(GameResult::Ongoing),
            _ => Err(UnknownVariant::new("game result", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Checkmate,
    Resignation,
    Timeout,
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    #[serde(rename = "50_move_rule")]
    FiftyMoveRule,
    DrawAgreement,
    Abandoned,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Checkmate => "checkmate",
            Termination::Resignation => "resignation",
            Termination::Timeout => "timeout",
            Termination::Stalemate => "stalemate",
            Termination::InsufficientMaterial => "insufficient_material",
            Termination::ThreefoldRepetition => "threefold_repetition",
            Termination::FiftyMoveRule => "50_move_rule",
            Termination::DrawAgreement => "draw_agreement",
            Termination::Abandoned => "abandoned",
        }
    }
}

impl FromStr for Termination {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checkmate" => Ok(Termination::Checkmate),
            "resignation" => Ok(Termination::Resignation),
            "timeout" => Ok(Termination::Timeout),
            "stalemate" => Ok(Termination::Stalemate),
            "insufficient_material" => Ok(Termination::InsufficientMaterial),
            "threefold_repetition" => Ok(Termination::ThreefoldRepetition),
            "50_move_rule" => Ok(Termination::FiftyMoveRule),
            "draw_agreement" => Ok(Termination::DrawAgreement),
            "abandoned" => Ok(Termination::Abandoned),
            _ => Err(UnknownVariant::new("termination", s)),
        }
    }
}

/// Clock settings in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeControl {
    pub initial: u32,
    pub increment: u32,
}

impl Default for TimeControl {
    fn default() -> Self {
        TimeControl {
            initial: 600,
            increment: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub white_player_id: String,
    pub black_player_id: String,
    pub status: GameStatus,
    pub time_control: TimeControl,
    pub winner_id: Option<String>,
    pub result: Option<GameResult>,
    pub termination: Option<Termination>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(rename = "current_fen")]
    pub current_position: String,
    pub game_pgn: Option<String>,
    pub white_time_left: u32,
    pub black_time_left: u32,
    pub move_count: u32,
    pub last_move_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub fn new(white_player_id: &str, black_player_id: &str, time_control: TimeControl) -> Self {
        Game {
            id: Uuid::new_v4().to_string(),
            white_player_id: white_player_id.to_string(),
            black_player_id: black_player_id.to_string(),
            status: GameStatus::Waiting,
            time_control,
            winner_id: None,
            result: None,
            termination: None,
            started_at: None,
            ended_at: None,
            current_position: STARTING_POSITION.to_string(),
            game_pgn: None,
            white_time_left: time_control.initial,
            black_time_left: time_control.initial,
            move_count: 0,
            last_move_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn player_for(&self, color: Color) -> &str {
        match color {
            Color::White => &self.white_player_id,
            Color::Black => &self.black_player_id,
        }
    }

    /// Remaining clock time in seconds.
    pub fn clock_for(&self, color: Color) -> u32 {
        match color {
            Color::White => self.white_time_left,
            Color::Black => self.black_time_left,
        }
    }

    pub fn set_clock(&mut self, color: Color, seconds: u32) {
        match color {
            Color::White => self.white_time_left = seconds,
            Color::Black => self.black_time_left = seconds,
        }
    }
}

/// Body of `POST /games`. An empty body is treated as all defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGameRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_control: Option<TimeControl>,
}

/// A game together with its full move history, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDetails {
    #[serde(flatten)]
    pub game: Game,
    pub moves: Vec<GameMove>,
}
