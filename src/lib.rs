//! A chess move generation, evaluation, and search library built
//! around a 0x88 board representation.
//!
//! The crate is organized bottom-up: `basetypes` and `error` have no
//! internal dependencies; `castling`, `zobrist`, `chess_move`,
//! `movelist`, and `attacks` build on those; `position` ties them
//! together into the mutable board state; `movegen` and `see` read a
//! `Position`; `eval`, `tt`, and `search` form the decision-making
//! layer; `perft` and `engine` are outer-shell concerns for testing
//! and for driving a search from a frontend.

#[macro_use]
extern crate lazy_static;

pub mod attacks;
pub mod basetypes;
pub mod castling;
pub mod chess_move;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod movegen;
pub mod movelist;
pub mod perft;
pub mod position;
pub mod search;
pub mod tt;
pub mod zobrist;

pub use chess_move::Move;
pub use error::{FenError, IllegalMoveError, MoveParseError, PlayMoveError};
pub use position::Position;
