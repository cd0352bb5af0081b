//! The mutable chess position: piece placement, side to move, castling
//! rights, en-passant state, move counters, and an incrementally
//! maintained Zobrist key (spec.md §3, §4.1).
//!
//! `Position` does not know about search, repetition draws by game
//! history, or evaluation -- it only knows how to apply and undo a
//! move and answer attack queries. Higher layers (`movegen`, `see`,
//! `eval`, `search`) are built on top of it.

use crate::attacks::{self, Occupancy};
use crate::basetypes::*;
use crate::castling::{CastlingRights, BLACK_KINGSIDE, BLACK_QUEENSIDE, WHITE_KINGSIDE, WHITE_QUEENSIDE};
use crate::chess_move::Move;
use crate::error::FenError;
use crate::zobrist;

/// The opening position, in Forsyth-Edwards notation.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Everything needed to undo exactly one `make_move` call, in reverse
/// order (spec.md §3). Kept as its own record rather than packed into
/// the move bits, so the move encoding stays free of position-specific
/// state.
#[derive(Debug, Clone, Copy)]
pub struct Undo {
    mv: Move,
    captured_piece: Piece,
    castling: CastlingRights,
    en_passant_square: Option<Square>,
    halfmove_clock: u32,
    zobrist_key: u64,
}

#[derive(Clone)]
pub struct Position {
    board: [Piece; 128],
    to_move: Color,
    castling: CastlingRights,

    /// The square a pawn capture would land on to take en passant, if
    /// any (i.e. the square just jumped over by the last double push).
    en_passant_square: Option<Square>,

    halfmove_clock: u32,
    fullmove_number: u32,

    king_square: [Square; 2],
    occupied_by: [Occupancy; 2],
    zobrist_key: u64,
}

impl Position {
    /// Parses a FEN string into a fully validated position (spec.md
    /// §4.1). Rejects malformed fields, wrong king counts, pawns on
    /// the back ranks, castling rights inconsistent with king/rook
    /// placement, an en-passant target inconsistent with the board,
    /// and a position where the side not to move is in check.
    pub fn from_fen(fen: &str) -> Result<Position, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(FenError::WrongFieldCount(fields.len()));
        }
        let mut pos = Position {
            board: [EMPTY; 128],
            to_move: WHITE,
            castling: CastlingRights::NONE,
            en_passant_square: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            king_square: [-1, -1],
            occupied_by: [0, 0],
            zobrist_key: 0,
        };

        pos.place_pieces(fields[0])?;
        pos.to_move = parse_active_color(fields[1])?;
        pos.castling = CastlingRights::from_fen(fields[2]).map_err(FenError::BadCastlingLetter)?;
        pos.validate_castling_rights()?;
        pos.en_passant_square = parse_en_passant(fields[3], pos.to_move)?;
        pos.validate_en_passant()?;
        pos.halfmove_clock = fields[4]
            .parse()
            .map_err(|_| FenError::BadHalfmoveClock(fields[4].to_string()))?;
        pos.fullmove_number = fields[5]
            .parse()
            .map_err(|_| FenError::BadFullmoveNumber(fields[5].to_string()))?;
        if pos.fullmove_number == 0 {
            return Err(FenError::BadFullmoveNumber(fields[5].to_string()));
        }

        pos.validate_king_counts()?;
        pos.validate_no_pawns_on_back_ranks()?;
        pos.zobrist_key = pos.calc_zobrist_key();
        if pos.is_in_check(1 ^ pos.to_move) {
            return Err(FenError::OpponentKingInCheck);
        }
        Ok(pos)
    }

    fn place_pieces(&mut self, field: &str) -> Result<(), FenError> {
        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::WrongRankCount(ranks.len()));
        }
        // FEN ranks run 8 down to 1; board ranks run 0 (rank 1) up to 7 (rank 8).
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank_index = 7 - i;
            let mut file_index = 0i32;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file_index += skip as i32;
                } else {
                    let (color, kind) = parse_piece_letter(c).ok_or(FenError::BadPieceLetter(c))?;
                    if !(0..8).contains(&file_index) {
                        return Err(FenError::WrongFileCount(rank_index));
                    }
                    let sq = square(file_index, rank_index as i32);
                    let piece = make_piece(color, kind);
                    self.board[sq as usize] = piece;
                    self.occupied_by[color] |= 1u128 << sq;
                    if kind == KING {
                        self.king_square[color] = sq;
                    }
                    file_index += 1;
                }
            }
            if file_index != 8 {
                return Err(FenError::WrongFileCount(rank_index));
            }
        }
        Ok(())
    }

    fn validate_king_counts(&self) -> Result<(), FenError> {
        let white_count = self.count_of_kind(WHITE, KING);
        let black_count = self.count_of_kind(BLACK, KING);
        if white_count != 1 || black_count != 1 {
            return Err(FenError::WrongKingCount {
                white: white_count as u32,
                black: black_count as u32,
            });
        }
        Ok(())
    }

    fn count_of_kind(&self, color: Color, kind: PieceKind) -> usize {
        self.board
            .iter()
            .enumerate()
            .filter(|&(sq, &p)| {
                on_board(sq as Square) && p != EMPTY && piece_color(p) == color && piece_kind(p) == kind
            })
            .count()
    }

    fn validate_no_pawns_on_back_ranks(&self) -> Result<(), FenError> {
        for file_index in 0..8 {
            for &r in &[0, 7] {
                let sq = square(file_index, r);
                let p = self.board[sq as usize];
                if p != EMPTY && piece_kind(p) == PAWN {
                    return Err(FenError::PawnOnBackRank);
                }
            }
        }
        Ok(())
    }

    fn validate_castling_rights(&self) -> Result<(), FenError> {
        let checks = [
            (WHITE_KINGSIDE, 'K', WHITE, E1, H1),
            (WHITE_QUEENSIDE, 'Q', WHITE, E1, A1),
            (BLACK_KINGSIDE, 'k', BLACK, E8, H8),
            (BLACK_QUEENSIDE, 'q', BLACK, E8, A8),
        ];
        for (bit, letter, color, king_home, rook_home) in checks {
            if self.castling.has(bit) {
                let king_ok = self.board[king_home as usize] == make_piece(color, KING);
                let rook_ok = self.board[rook_home as usize] == make_piece(color, ROOK);
                if !king_ok || !rook_ok {
                    return Err(FenError::InconsistentCastlingRights(letter));
                }
            }
        }
        Ok(())
    }

    fn validate_en_passant(&self) -> Result<(), FenError> {
        let ep = match self.en_passant_square {
            None => return Ok(()),
            Some(sq) => sq,
        };
        let render = || square_notation(ep);
        let them = 1 ^ self.to_move;
        let direction = pawn_push_direction(them);
        // `them` (the side that just moved) double-pushed a pawn from
        // `vacated`, over `ep`, landing on `landed`.
        let vacated = ep - 16 * direction;
        let landed = ep + 16 * direction;
        if self.board[ep as usize] != EMPTY {
            return Err(FenError::InconsistentEnPassant(render()));
        }
        if self.board[vacated as usize] != EMPTY {
            return Err(FenError::InconsistentEnPassant(render()));
        }
        if self.board[landed as usize] != make_piece(them, PAWN) {
            return Err(FenError::InconsistentEnPassant(render()));
        }
        Ok(())
    }

    fn calc_zobrist_key(&self) -> u64 {
        let z = zobrist::keys();
        let mut key = 0u64;
        for sq in 0..128 {
            if on_board(sq) {
                let p = self.board[sq as usize];
                if p != EMPTY {
                    key ^= z.piece_key(p, sq);
                }
            }
        }
        key ^= z.castling[self.castling.0 as usize];
        if let Some(sq) = self.en_passant_square {
            key ^= z.en_passant_file[file(sq) as usize];
        }
        if self.to_move == BLACK {
            key ^= z.side_to_move;
        }
        key
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Piece {
        self.board[sq as usize]
    }

    #[inline]
    pub fn to_move(&self) -> Color {
        self.to_move
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    #[inline]
    pub fn en_passant_square(&self) -> Option<Square> {
        self.en_passant_square
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.king_square[color]
    }

    #[inline]
    pub fn zobrist_key(&self) -> u64 {
        self.zobrist_key
    }

    #[inline]
    pub fn occupied(&self) -> Occupancy {
        self.occupied_by[WHITE] | self.occupied_by[BLACK]
    }

    #[inline]
    pub fn occupied_by_color(&self, color: Color) -> Occupancy {
        self.occupied_by[color]
    }

    /// Returns `true` if `square` is attacked by any piece of `by_color`.
    pub fn is_attacked_by(&self, square: Square, by_color: Color) -> bool {
        let occ = self.occupied();
        let tables = attacks::tables();

        if tables.knight_attacks(square) & self.pieces_of(by_color, KNIGHT) != 0 {
            return true;
        }
        if tables.king_attacks(square) & self.pieces_of(by_color, KING) != 0 {
            return true;
        }
        // A pawn of `by_color` attacks `square` iff `square` is one of
        // the squares that pawn's own attack table covers from its
        // square -- equivalently, stand a phantom opposite-colored
        // pawn on `square` and see if it reaches a real `by_color` pawn.
        if tables.pawn_attacks(1 ^ by_color, square) & self.pieces_of(by_color, PAWN) != 0 {
            return true;
        }
        let queens = self.pieces_of(by_color, QUEEN);
        if tables.bishop_attacks(square, occ) & (self.pieces_of(by_color, BISHOP) | queens) != 0 {
            return true;
        }
        if tables.rook_attacks(square, occ) & (self.pieces_of(by_color, ROOK) | queens) != 0 {
            return true;
        }
        false
    }

    #[inline]
    pub fn is_in_check(&self, color: Color) -> bool {
        self.is_attacked_by(self.king_square[color], 1 ^ color)
    }

    /// A bitboard of every `color` piece of kind `kind`. Exposed
    /// crate-wide for SEE, which needs to classify attackers by kind
    /// as it peels pieces off the target square (spec.md §4.4).
    pub(crate) fn piece_bb(&self, color: Color, kind: PieceKind) -> Occupancy {
        self.pieces_of(color, kind)
    }

    fn pieces_of(&self, color: Color, kind: PieceKind) -> Occupancy {
        // A small scan rather than a cached bitboard-per-piece-kind
        // table: `Position` keeps only per-color occupancy, matching
        // spec.md §3's square-centric array model. Called only on the
        // (already narrow) attack-query path.
        let mut bb = 0u128;
        for sq in 0..128 {
            if on_board(sq) {
                let p = self.board[sq as usize];
                if p != EMPTY && piece_color(p) == color && piece_kind(p) == kind {
                    bb |= 1u128 << sq;
                }
            }
        }
        bb
    }

    #[inline]
    fn put_piece(&mut self, sq: Square, piece: Piece) {
        debug_assert_eq!(self.board[sq as usize], EMPTY);
        self.board[sq as usize] = piece;
        self.occupied_by[piece_color(piece)] |= 1u128 << sq;
        self.zobrist_key ^= zobrist::keys().piece_key(piece, sq);
        if piece_kind(piece) == KING {
            self.king_square[piece_color(piece)] = sq;
        }
    }

    #[inline]
    fn remove_piece(&mut self, sq: Square) -> Piece {
        let piece = self.board[sq as usize];
        debug_assert_ne!(piece, EMPTY);
        self.board[sq as usize] = EMPTY;
        self.occupied_by[piece_color(piece)] &= !(1u128 << sq);
        self.zobrist_key ^= zobrist::keys().piece_key(piece, sq);
        piece
    }

    /// Applies `mv`, which must be a pseudo-legal move generated for
    /// this exact position. Returns an `Undo` record that `unmake_move`
    /// needs to restore the prior state, or `None` if playing it would
    /// leave the mover's own king in check (in which case the position
    /// is left unchanged).
    pub fn make_move(&mut self, mv: Move) -> Option<Undo> {
        let us = self.to_move;
        let them = 1 ^ us;
        let from = mv.from();
        let to = mv.to();

        let undo = Undo {
            mv,
            captured_piece: EMPTY,
            castling: self.castling,
            en_passant_square: self.en_passant_square,
            halfmove_clock: self.halfmove_clock,
            zobrist_key: self.zobrist_key,
        };

        let moving_piece = self.board[from as usize];
        debug_assert_ne!(moving_piece, EMPTY);
        debug_assert_eq!(piece_color(moving_piece), us);

        let mut captured_piece = EMPTY;
        if mv.is_en_passant() {
            let captured_sq = square(file(to), rank(from));
            captured_piece = self.remove_piece(captured_sq);
        } else if mv.is_capture() {
            captured_piece = self.remove_piece(to);
        }

        self.remove_piece(from);
        let placed = if mv.is_promotion() {
            make_piece(us, mv.promotion_kind())
        } else {
            moving_piece
        };
        self.put_piece(to, placed);

        if mv.is_castle() {
            let (rook_from, rook_to) = castling_rook_squares(us, from, to);
            let rook = self.remove_piece(rook_from);
            self.put_piece(rook_to, rook);
        }

        if piece_kind(moving_piece) == KING && self.king_would_pass_through_check(us, from, to, mv) {
            self.unmake_move_inner(mv, captured_piece, &undo);
            return None;
        }
        if self.is_in_check(us) {
            self.unmake_move_inner(mv, captured_piece, &undo);
            return None;
        }

        self.zobrist_key ^= zobrist::keys().castling[self.castling.0 as usize];
        self.update_castling_rights(from, to, moving_piece, captured_piece);
        self.zobrist_key ^= zobrist::keys().castling[self.castling.0 as usize];

        if let Some(sq) = self.en_passant_square {
            self.zobrist_key ^= zobrist::keys().en_passant_file[file(sq) as usize];
        }
        self.en_passant_square = if mv.is_double_push() {
            Some(square(file(from), (rank(from) + rank(to)) / 2))
        } else {
            None
        };
        if let Some(sq) = self.en_passant_square {
            self.zobrist_key ^= zobrist::keys().en_passant_file[file(sq) as usize];
        }

        self.halfmove_clock = if piece_kind(moving_piece) == PAWN || captured_piece != EMPTY {
            0
        } else {
            self.halfmove_clock + 1
        };
        if us == BLACK {
            self.fullmove_number += 1;
        }

        self.to_move = them;
        self.zobrist_key ^= zobrist::keys().side_to_move;

        Some(Undo { captured_piece, ..undo })
    }

    /// Shared teardown used both when a candidate move turns out
    /// illegal (king left in check) and is rolled back immediately,
    /// and from the public `unmake_move`.
    fn unmake_move_inner(&mut self, mv: Move, captured_piece: Piece, undo: &Undo) {
        let us = piece_color(self.board[mv.to() as usize]);
        let from = mv.from();
        let to = mv.to();

        if mv.is_castle() {
            let (rook_from, rook_to) = castling_rook_squares(us, from, to);
            let rook = self.remove_piece(rook_to);
            self.put_piece(rook_from, rook);
        }

        let placed = self.remove_piece(to);
        let original = if mv.is_promotion() {
            make_piece(us, PAWN)
        } else {
            placed
        };
        self.put_piece(from, original);

        if captured_piece != EMPTY {
            let captured_sq = if mv.is_en_passant() {
                square(file(to), rank(from))
            } else {
                to
            };
            self.put_piece(captured_sq, captured_piece);
        }

        self.castling = undo.castling;
        self.en_passant_square = undo.en_passant_square;
        self.halfmove_clock = undo.halfmove_clock;
        self.zobrist_key = undo.zobrist_key;
    }

    /// Takes back the move described by `undo`, which **must** be the
    /// value `make_move` just returned (spec.md §3).
    pub fn unmake_move(&mut self, undo: Undo) {
        let them = self.to_move;
        self.to_move = 1 ^ them;
        if self.to_move == BLACK {
            self.fullmove_number -= 1;
        }
        self.unmake_move_inner(undo.mv, undo.captured_piece, &undo);
    }

    fn king_would_pass_through_check(&self, us: Color, from: Square, to: Square, mv: Move) -> bool {
        if !mv.is_castle() {
            return false;
        }
        let passing = square((file(from) + file(to)) / 2, rank(from));
        self.is_attacked_by(from, 1 ^ us) || self.is_attacked_by(passing, 1 ^ us)
    }

    fn update_castling_rights(&mut self, from: Square, to: Square, moving_piece: Piece, _captured: Piece) {
        for &(sq, bit) in &[(E1, WHITE_KINGSIDE | WHITE_QUEENSIDE), (E8, BLACK_KINGSIDE | BLACK_QUEENSIDE)] {
            if from == sq && piece_kind(moving_piece) == KING {
                self.castling.0 &= !bit;
            }
        }
        for &(sq, bit) in &[
            (A1, WHITE_QUEENSIDE),
            (H1, WHITE_KINGSIDE),
            (A8, BLACK_QUEENSIDE),
            (H8, BLACK_KINGSIDE),
        ] {
            if from == sq || to == sq {
                self.castling.clear(bit);
            }
        }
    }

    /// Plays a null move: flips the side to move without moving a
    /// piece, used by the search's null-move pruning (spec.md §4.7).
    /// Illegal while in check -- callers must check `is_in_check`
    /// first.
    pub fn make_null_move(&mut self) -> Undo {
        debug_assert!(!self.is_in_check(self.to_move));
        let undo = Undo {
            mv: Move::NONE,
            captured_piece: EMPTY,
            castling: self.castling,
            en_passant_square: self.en_passant_square,
            halfmove_clock: self.halfmove_clock,
            zobrist_key: self.zobrist_key,
        };
        if let Some(sq) = self.en_passant_square {
            self.zobrist_key ^= zobrist::keys().en_passant_file[file(sq) as usize];
        }
        self.en_passant_square = None;
        self.to_move = 1 ^ self.to_move;
        self.zobrist_key ^= zobrist::keys().side_to_move;
        undo
    }

    pub fn unmake_null_move(&mut self, undo: Undo) {
        self.to_move = 1 ^ self.to_move;
        self.castling = undo.castling;
        self.en_passant_square = undo.en_passant_square;
        self.halfmove_clock = undo.halfmove_clock;
        self.zobrist_key = undo.zobrist_key;
    }

    /// Renders the position back to FEN, e.g. for logging a crash
    /// report (spec.md §7).
    pub fn to_fen(&self) -> String {
        let mut ranks = Vec::with_capacity(8);
        for r in (0..8).rev() {
            let mut s = String::new();
            let mut empty_run = 0;
            for f in 0..8 {
                let p = self.board[square(f, r) as usize];
                if p == EMPTY {
                    empty_run += 1;
                } else {
                    if empty_run > 0 {
                        s.push_str(&empty_run.to_string());
                        empty_run = 0;
                    }
                    s.push(piece_letter(p));
                }
            }
            if empty_run > 0 {
                s.push_str(&empty_run.to_string());
            }
            ranks.push(s);
        }
        format!(
            "{} {} {} {} {} {}",
            ranks.join("/"),
            if self.to_move == WHITE { "w" } else { "b" },
            self.castling.to_fen(),
            self.en_passant_square.map(square_notation).unwrap_or_else(|| "-".to_string()),
            self.halfmove_clock,
            self.fullmove_number,
        )
    }

    /// Parses `text` as a coordinate move (spec.md §6) and plays it if
    /// it is legal here. This is the interface boundary spec.md §7
    /// describes for "impossible move request": a syntactically valid
    /// move that isn't in the current legal set is rejected with
    /// `IllegalMoveError`, never silently accepted or panicked on.
    pub fn play_coordinate_move(&mut self, text: &str) -> Result<Undo, crate::error::PlayMoveError> {
        let (from, to, promotion) = crate::chess_move::parse_coordinate_move(text)?;
        let legal = crate::movegen::generate_legal_moves(self);
        let candidate = legal.iter().find(|m| {
            m.from() == from && m.to() == to && m.promotion_kind() == promotion
        });
        match candidate {
            Some(&mv) => Ok(self.make_move(mv).expect("move was drawn from the legal move list")),
            None => Err(crate::error::IllegalMoveError::new(from, to).into()),
        }
    }
}

fn castling_rook_squares(color: Color, king_from: Square, king_to: Square) -> (Square, Square) {
    let kingside = king_to > king_from;
    match (color, kingside) {
        (WHITE, true) => (H1, F1),
        (WHITE, false) => (A1, D1),
        (BLACK, true) => (H8, F8),
        (BLACK, false) => (A8, D8),
        _ => unreachable!(),
    }
}

fn parse_active_color(s: &str) -> Result<Color, FenError> {
    match s {
        "w" => Ok(WHITE),
        "b" => Ok(BLACK),
        _ => Err(FenError::BadActiveColor(s.to_string())),
    }
}

fn parse_en_passant(s: &str, to_move: Color) -> Result<Option<Square>, FenError> {
    if s == "-" {
        return Ok(None);
    }
    let sq = parse_square(s).ok_or_else(|| FenError::BadEnPassantSquare(s.to_string()))?;
    let expected_rank = if to_move == WHITE { 5 } else { 2 };
    if rank(sq) != expected_rank {
        return Err(FenError::BadEnPassantSquare(s.to_string()));
    }
    Ok(Some(sq))
}

fn parse_piece_letter(c: char) -> Option<(Color, PieceKind)> {
    let color = if c.is_ascii_uppercase() { WHITE } else { BLACK };
    let kind = match c.to_ascii_lowercase() {
        'p' => PAWN,
        'n' => KNIGHT,
        'b' => BISHOP,
        'r' => ROOK,
        'q' => QUEEN,
        'k' => KING,
        _ => return None,
    };
    Some((color, kind))
}

fn piece_letter(p: Piece) -> char {
    let letters = ['P', 'N', 'B', 'R', 'Q', 'K'];
    let c = letters[piece_kind(p) as usize - 1];
    if piece_color(p) == WHITE {
        c
    } else {
        c.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_position_roundtrip() {
        let pos = Position::from_fen(STARTING_FEN).unwrap();
        assert_eq!(pos.to_fen(), STARTING_FEN);
        assert_eq!(pos.to_move(), WHITE);
        assert_eq!(pos.king_square(WHITE), E1);
        assert_eq!(pos.king_square(BLACK), E8);
    }

    #[test]
    fn test_wrong_field_count() {
        assert_eq!(
            Position::from_fen("8/8/8/8/8/8/8/8 w - -"),
            Err(FenError::WrongFieldCount(4))
        );
    }

    #[test]
    fn test_wrong_rank_count() {
        assert!(matches!(
            Position::from_fen("8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::WrongRankCount(7))
        ));
    }

    #[test]
    fn test_wrong_king_count() {
        assert!(matches!(
            Position::from_fen("8/8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::WrongKingCount { white: 0, black: 0 })
        ));
        assert!(matches!(
            Position::from_fen("k7/8/8/8/8/8/8/6KK w - - 0 1"),
            Err(FenError::WrongKingCount { white: 2, black: 1 })
        ));
    }

    #[test]
    fn test_pawn_on_back_rank() {
        assert_eq!(
            Position::from_fen("k3P3/8/8/8/8/8/8/7K w - - 0 1"),
            Err(FenError::PawnOnBackRank)
        );
    }

    #[test]
    fn test_inconsistent_castling_rights() {
        assert!(matches!(
            Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2B w KQkq - 0 1"),
            Err(FenError::InconsistentCastlingRights(_))
        ));
        assert!(Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").is_ok());
    }

    #[test]
    fn test_opponent_king_in_check_is_rejected() {
        assert_eq!(
            Position::from_fen("k7/1P6/8/8/8/8/8/7K w - - 0 1"),
            Err(FenError::OpponentKingInCheck)
        );
        assert!(Position::from_fen("k7/1N6/8/8/8/8/8/7K w - - 0 1").is_ok());
    }

    #[test]
    fn test_en_passant_validation() {
        assert!(Position::from_fen("k7/8/8/8/7P/8/8/7K b - h3 0 1").is_ok());
        assert!(Position::from_fen("k7/8/8/8/7P/8/8/7K w - h3 0 1").is_err());
        assert!(Position::from_fen("k7/8/8/7P/8/8/8/7K b - h4 0 1").is_err());
    }

    #[test]
    fn test_make_and_unmake_move_restores_state() {
        let mut pos = Position::from_fen(STARTING_FEN).unwrap();
        let key_before = pos.zobrist_key();
        let mv = Move::double_push(E2, E4);
        let undo = pos.make_move(mv).expect("legal move");
        assert_eq!(pos.to_move(), BLACK);
        assert_eq!(pos.en_passant_square(), Some(E3));
        pos.unmake_move(undo);
        assert_eq!(pos.to_move(), WHITE);
        assert_eq!(pos.zobrist_key(), key_before);
        assert_eq!(pos.to_fen(), STARTING_FEN);
    }

    #[test]
    fn test_castling_updates_rook_and_rights() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let undo = pos.make_move(Move::castle(E1, G1)).expect("legal castle");
        assert_eq!(pos.piece_at(F1), make_piece(WHITE, ROOK));
        assert_eq!(pos.piece_at(G1), make_piece(WHITE, KING));
        assert!(!pos.castling_rights().has(WHITE_KINGSIDE));
        assert!(!pos.castling_rights().has(WHITE_QUEENSIDE));
        pos.unmake_move(undo);
        assert_eq!(pos.piece_at(E1), make_piece(WHITE, KING));
        assert_eq!(pos.piece_at(H1), make_piece(WHITE, ROOK));
        assert!(pos.castling_rights().has(WHITE_KINGSIDE));
    }

    #[test]
    fn test_en_passant_capture() {
        // White pawn e5, black just played d7-d5; white captures e.p.
        let mut pos = Position::from_fen("k7/8/8/3pP3/8/8/8/7K w - d6 0 1").unwrap();
        let undo = pos.make_move(Move::en_passant(E5, D6)).expect("legal en passant");
        assert_eq!(pos.piece_at(D6), make_piece(WHITE, PAWN));
        assert_eq!(pos.piece_at(D5), EMPTY, "captured pawn is removed");
        assert_eq!(pos.piece_at(E5), EMPTY);
        pos.unmake_move(undo);
        assert_eq!(pos.piece_at(E5), make_piece(WHITE, PAWN));
        assert_eq!(pos.piece_at(D5), make_piece(BLACK, PAWN));
        assert_eq!(pos.piece_at(D6), EMPTY);
    }

    #[test]
    fn test_play_coordinate_move_rejects_illegal_text() {
        let mut pos = Position::from_fen(STARTING_FEN).unwrap();
        let err = pos.play_coordinate_move("e2e5").unwrap_err();
        assert!(matches!(err, crate::error::PlayMoveError::Illegal(_)));
    }

    #[test]
    fn test_play_coordinate_move_applies_legal_move() {
        let mut pos = Position::from_fen(STARTING_FEN).unwrap();
        pos.play_coordinate_move("e2e4").unwrap();
        assert_eq!(pos.piece_at(E4), make_piece(WHITE, PAWN));
        assert_eq!(pos.to_move(), BLACK);
    }
}
