//! Castling rights: a 4-bit set tracking which castling moves each side
//! has not yet forfeited (spec.md §3). The bitset only ever shrinks
//! over the life of a game.

use crate::basetypes::{Color, WHITE};

pub const WHITE_KINGSIDE: u8 = 0b0001;
pub const WHITE_QUEENSIDE: u8 = 0b0010;
pub const BLACK_KINGSIDE: u8 = 0b0100;
pub const BLACK_QUEENSIDE: u8 = 0b1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights(pub u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const ALL: CastlingRights = CastlingRights(
        WHITE_KINGSIDE | WHITE_QUEENSIDE | BLACK_KINGSIDE | BLACK_QUEENSIDE,
    );

    #[inline]
    pub fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    #[inline]
    pub fn clear(&mut self, bit: u8) {
        self.0 &= !bit;
    }

    /// Returns the kingside/queenside bits belonging to `color`.
    #[inline]
    pub fn for_color(color: Color) -> (u8, u8) {
        if color == WHITE {
            (WHITE_KINGSIDE, WHITE_QUEENSIDE)
        } else {
            (BLACK_KINGSIDE, BLACK_QUEENSIDE)
        }
    }

    pub fn to_fen(self) -> String {
        if self.0 == 0 {
            return "-".to_string();
        }
        let mut s = String::with_capacity(4);
        if self.has(WHITE_KINGSIDE) {
            s.push('K');
        }
        if self.has(WHITE_QUEENSIDE) {
            s.push('Q');
        }
        if self.has(BLACK_KINGSIDE) {
            s.push('k');
        }
        if self.has(BLACK_QUEENSIDE) {
            s.push('q');
        }
        s
    }

    pub fn from_fen(s: &str) -> Result<CastlingRights, char> {
        if s == "-" {
            return Ok(CastlingRights::NONE);
        }
        let mut bits = 0u8;
        for c in s.chars() {
            bits |= match c {
                'K' => WHITE_KINGSIDE,
                'Q' => WHITE_QUEENSIDE,
                'k' => BLACK_KINGSIDE,
                'q' => BLACK_QUEENSIDE,
                other => return Err(other),
            };
        }
        Ok(CastlingRights(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fen_roundtrip() {
        for s in ["KQkq", "Kq", "-", "k"] {
            let cr = CastlingRights::from_fen(s).unwrap();
            assert_eq!(cr.to_fen(), s);
        }
    }
}
