//! Typed errors for the parts of the crate that face the outside world:
//! FEN parsing, coordinate-move parsing, and the "is this move legal
//! here" boundary check (spec.md §7).
//!
//! Internal invariant violations (unbalanced make/unmake, Zobrist
//! drift, a move generator disagreeing with the brute-force
//! cross-check) are deliberately **not** represented here: spec.md §7
//! treats those as programmer errors that should abort with a
//! diagnostic, not as recoverable `Result`s.

use thiserror::Error;

use crate::basetypes::Square;

/// Something wrong with a FEN-like position string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("expected 6 space-separated fields, found {0}")]
    WrongFieldCount(usize),

    #[error("piece placement field has {0} ranks, expected 8")]
    WrongRankCount(usize),

    #[error("rank {0} does not add up to 8 files")]
    WrongFileCount(usize),

    #[error("unrecognized piece letter '{0}'")]
    BadPieceLetter(char),

    #[error("active color must be 'w' or 'b', found '{0}'")]
    BadActiveColor(String),

    #[error("unrecognized castling letter '{0}'")]
    BadCastlingLetter(char),

    #[error("invalid en-passant target square '{0}'")]
    BadEnPassantSquare(String),

    #[error("halfmove clock is not a valid number: '{0}'")]
    BadHalfmoveClock(String),

    #[error("fullmove number is not a valid number: '{0}'")]
    BadFullmoveNumber(String),

    #[error("position has {white} white king(s) and {black} black king(s); exactly one each is required")]
    WrongKingCount { white: u32, black: u32 },

    #[error("side not to move is in check, which cannot follow a legal move")]
    OpponentKingInCheck,

    #[error("a pawn cannot stand on the first or eighth rank")]
    PawnOnBackRank,

    #[error("castling right '{0}' claimed but the king or rook is not on its home square")]
    InconsistentCastlingRights(char),

    #[error("en-passant target '{0}' is not consistent with the board")]
    InconsistentEnPassant(String),
}

/// A coordinate move string (spec.md §6) that could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("coordinate move '{0}' has the wrong length")]
    WrongLength(String),

    #[error("coordinate move '{0}' has an invalid square")]
    BadSquare(String),

    #[error("unrecognized promotion letter '{0}'")]
    BadPromotionLetter(char),
}

/// An externally supplied move that parsed syntactically but is not in
/// the legal move set of the current position.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("move {square_from}{square_to} is not legal in the current position")]
pub struct IllegalMoveError {
    pub square_from: String,
    pub square_to: String,
}

impl IllegalMoveError {
    pub fn new(from: Square, to: Square) -> Self {
        IllegalMoveError {
            square_from: crate::basetypes::square_notation(from),
            square_to: crate::basetypes::square_notation(to),
        }
    }
}

/// Everything that can go wrong handing an externally supplied
/// coordinate move to `Position::play_coordinate_move`: either the
/// text itself doesn't parse, or it parses but is not legal here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayMoveError {
    #[error(transparent)]
    Parse(#[from] MoveParseError),

    #[error(transparent)]
    Illegal(#[from] IllegalMoveError),
}
