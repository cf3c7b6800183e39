use chess::{Board, BoardStatus, ChessMove, Color as BoardColor, File, MoveGen, Piece, Rank, Square, EMPTY};
use std::str::FromStr;

use crate::{
    models::{game::Color, game_move::PieceKind},
    services::{
        errors::chess_service_errors::ChessServiceError,
        rules_engine::{AppliedMove, CandidateMove, PositionFacts, RulesEngine},
    },
};

/// Rules engine backed by the `chess` crate.
///
/// The crate's board does not track the halfmove clock or the fullmove
/// number, so both counters are carried alongside it and written back into
/// the position string after each move.
#[derive(Clone, Default)]
pub struct ChessService;

struct ParsedPosition {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl ChessService {
    pub fn new() -> Self {
        ChessService
    }
}

impl RulesEngine for ChessService {
    fn try_move(
        &self,
        position: &str,
        candidate: &CandidateMove,
        prior_positions: &[String],
    ) -> Result<AppliedMove, ChessServiceError> {
        let parsed = parse_position(position)?;
        let board = parsed.board;

        if board.status() != BoardStatus::Ongoing {
            return Err(ChessServiceError::GameOver(
                "Game is already over".to_string(),
            ));
        }

        let from_sq = Square::from_str(&candidate.from)
            .map_err(|_| ChessServiceError::ValidationError("Invalid from square".to_string()))?;
        let to_sq = Square::from_str(&candidate.to)
            .map_err(|_| ChessServiceError::ValidationError("Invalid to square".to_string()))?;

        let piece = board.piece_on(from_sq).ok_or_else(|| {
            ChessServiceError::IllegalMove(format!("No piece on {}", candidate.from))
        })?;

        // Promotion is only meaningful for a pawn reaching the last rank; an
        // omitted piece there defaults to a queen.
        let reaches_last_rank = matches!(to_sq.get_rank(), Rank::First | Rank::Eighth);
        let promotion = if piece == Piece::Pawn && reaches_last_rank {
            Some(board_piece(candidate.promotion.unwrap_or(PieceKind::Queen)))
        } else {
            None
        };

        let chess_move = ChessMove::new(from_sq, to_sq, promotion);

        // Validate the move by checking if it's in legal moves
        if !MoveGen::new_legal(&board).any(|m| m == chess_move) {
            return Err(ChessServiceError::IllegalMove(format!(
                "{} to {} is not legal",
                candidate.from, candidate.to
            )));
        }

        let mover = board.side_to_move();
        let is_en_passant = piece == Piece::Pawn
            && from_sq.get_file() != to_sq.get_file()
            && board.piece_on(to_sq).is_none();
        let captured = if is_en_passant {
            Some(Piece::Pawn)
        } else {
            board.piece_on(to_sq)
        };
        let is_castling = piece == Piece::King
            && from_sq.get_file().to_index().abs_diff(to_sq.get_file().to_index()) == 2;

        let new_board = board.make_move_new(chess_move);

        let halfmove_clock = if piece == Piece::Pawn || captured.is_some() {
            0
        } else {
            parsed.halfmove_clock + 1
        };
        let fullmove_number = match mover {
            BoardColor::White => parsed.fullmove_number,
            BoardColor::Black => parsed.fullmove_number + 1,
        };

        let status = new_board.status();
        let target_hash = new_board.get_hash();
        let repetitions = prior_positions
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(position))
            .filter_map(|p| parse_position(p).ok())
            .filter(|p| p.board.get_hash() == target_hash)
            .count();

        let facts = PositionFacts {
            turn: color_of(new_board.side_to_move()),
            in_check: *new_board.checkers() != EMPTY,
            checkmate: status == BoardStatus::Checkmate,
            stalemate: status == BoardStatus::Stalemate,
            insufficient_material: insufficient_material(&new_board),
            threefold_repetition: repetitions + 1 >= 3,
            fifty_move_rule: halfmove_clock >= 100,
            fullmove_number,
        };

        Ok(AppliedMove {
            from: candidate.from.clone(),
            to: candidate.to.clone(),
            color: color_of(mover),
            piece: piece_kind(piece),
            captured: captured.map(piece_kind),
            promotion: promotion.map(piece_kind),
            is_castling,
            is_en_passant,
            san: san(&board, chess_move, piece, captured.is_some(), is_castling, &new_board),
            move_number: parsed.fullmove_number,
            position_after: format_position(&new_board, halfmove_clock, fullmove_number),
            facts,
        })
    }

    /// Get legal moves for the current position (for UI hints)
    fn legal_moves(&self, position: &str) -> Result<Vec<String>, ChessServiceError> {
        let parsed = parse_position(position)?;

        let legal_moves: Vec<String> = MoveGen::new_legal(&parsed.board)
            .map(|m| match m.get_promotion() {
                Some(p) => format!(
                    "{}{}{}",
                    m.get_source(),
                    m.get_dest(),
                    piece_kind(p).letter()
                ),
                None => format!("{}{}", m.get_source(), m.get_dest()),
            })
            .collect();

        Ok(legal_moves)
    }
}

fn parse_position(position: &str) -> Result<ParsedPosition, ChessServiceError> {
    let fields: Vec<&str> = position.split_whitespace().collect();
    if !(4..=6).contains(&fields.len()) {
        return Err(ChessServiceError::InvalidPosition(format!(
            "Invalid FEN: {}",
            position
        )));
    }

    let board = Board::from_str(&fields.join(" "))
        .map_err(|e| ChessServiceError::InvalidPosition(format!("Invalid FEN: {}", e)))?;

    Ok(ParsedPosition {
        board,
        halfmove_clock: parse_counter(fields.get(4), 0)?,
        fullmove_number: parse_counter(fields.get(5), 1)?,
    })
}

fn parse_counter(field: Option<&&str>, default: u32) -> Result<u32, ChessServiceError> {
    match field {
        Some(raw) => raw.parse().map_err(|_| {
            ChessServiceError::InvalidPosition(format!("Invalid move counter: {}", raw))
        }),
        None => Ok(default),
    }
}

fn format_position(board: &Board, halfmove_clock: u32, fullmove_number: u32) -> String {
    let fen = board.to_string();
    let placement: Vec<&str> = fen.split_whitespace().take(4).collect();
    format!("{} {} {}", placement.join(" "), halfmove_clock, fullmove_number)
}

fn san(
    board: &Board,
    chess_move: ChessMove,
    piece: Piece,
    is_capture: bool,
    is_castling: bool,
    after: &Board,
) -> String {
    let source = chess_move.get_source();
    let dest = chess_move.get_dest();

    let mut notation = if is_castling {
        if dest.get_file() == File::G {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else if piece == Piece::Pawn {
        let mut s = String::new();
        if is_capture {
            s.push(file_char(source));
            s.push('x');
        }
        s.push_str(&dest.to_string());
        if let Some(promoted) = chess_move.get_promotion() {
            s.push('=');
            s.push(piece_kind(promoted).letter().to_ascii_uppercase());
        }
        s
    } else {
        let mut s = String::new();
        s.push(piece_kind(piece).letter().to_ascii_uppercase());

        let rivals: Vec<Square> = MoveGen::new_legal(board)
            .filter(|m| {
                m.get_dest() == dest
                    && m.get_source() != source
                    && board.piece_on(m.get_source()) == Some(piece)
            })
            .map(|m| m.get_source())
            .collect();
        if !rivals.is_empty() {
            let shares_file = rivals.iter().any(|sq| sq.get_file() == source.get_file());
            let shares_rank = rivals.iter().any(|sq| sq.get_rank() == source.get_rank());
            if !shares_file {
                s.push(file_char(source));
            } else if !shares_rank {
                s.push(rank_char(source));
            } else {
                s.push(file_char(source));
                s.push(rank_char(source));
            }
        }

        if is_capture {
            s.push('x');
        }
        s.push_str(&dest.to_string());
        s
    };

    if after.status() == BoardStatus::Checkmate {
        notation.push('#');
    } else if *after.checkers() != EMPTY {
        notation.push('+');
    }
    notation
}

/// Dead positions: bare kings, a single minor piece, or bishops that all
/// stand on one square colour.
fn insufficient_material(board: &Board) -> bool {
    let heavy =
        *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy != EMPTY {
        return false;
    }

    let knights = board.pieces(Piece::Knight).popcnt();
    let bishops = *board.pieces(Piece::Bishop);
    if knights + bishops.popcnt() <= 1 {
        return true;
    }
    if knights > 0 {
        return false;
    }

    let light = bishops.filter(|sq| is_light_square(*sq)).count() as u32;
    light == 0 || light == bishops.popcnt()
}

fn is_light_square(square: Square) -> bool {
    (square.get_file().to_index() + square.get_rank().to_index()) % 2 == 1
}

fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

fn color_of(color: BoardColor) -> Color {
    match color {
        BoardColor::White => Color::White,
        BoardColor::Black => Color::Black,
    }
}

fn piece_kind(piece: Piece) -> PieceKind {
    match piece {
        Piece::Pawn => PieceKind::Pawn,
        Piece::Knight => PieceKind::Knight,
        Piece::Bishop => PieceKind::Bishop,
        Piece::Rook => PieceKind::Rook,
        Piece::Queen => PieceKind::Queen,
        Piece::King => PieceKind::King,
    }
}

fn board_piece(kind: PieceKind) -> Piece {
    match kind {
        PieceKind::Pawn => Piece::Pawn,
        PieceKind::Knight => Piece::Knight,
        PieceKind::Bishop => Piece::Bishop,
        PieceKind::Rook => Piece::Rook,
        PieceKind::Queen => Piece::Queen,
        PieceKind::King => Piece::King,
    }
}
