//! Legal move generation (spec.md §4.3).
//!
//! Moves are generated pseudo-legally first -- every move a piece
//! could make ignoring whether it leaves the mover's own king in
//! check -- then filtered to legality in one pass over an opponent
//! attack/pin/checker scan computed once per call:
//!
//! 1. Walk the eight queen directions from the king. The first friendly
//!    piece found on a ray, if an enemy slider of matching direction
//!    lies beyond it with nothing else between, is pinned. If no
//!    friendly piece intervenes and the first piece is such a slider,
//!    it is a checker. Knight and pawn checks are adjacency tests.
//! 2. Two or more checkers: only king moves are legal.
//! 3. One checker: a non-king move is legal only if its destination is
//!    the checker's square or a square between the king and a sliding
//!    checker (the "block set").
//! 4. A pinned piece's move is legal only if its destination stays on
//!    the line through the king in the pin direction.
//!
//! King moves and en-passant captures are not decided by this scan --
//! the former because a ray "through" the king's own square isn't
//! represented in it, the latter because removing two pawns from the
//! same rank can expose a horizontal discovered check the scan never
//! considered. Both are instead verified by actually playing the move
//! with `Position::make_move` (which already refuses to leave the king
//! in check) and immediately taking it back.
//!
//! In debug builds, the result is cross-checked against the brute-force
//! oracle (every pseudo-legal move played and unplayed) so a mistake in
//! the scan above shows up as a test failure rather than a silently
//! wrong move list.

use crate::attacks::{self, Occupancy};
use crate::basetypes::*;
use crate::castling::{BLACK_KINGSIDE, BLACK_QUEENSIDE, WHITE_KINGSIDE, WHITE_QUEENSIDE};
use crate::chess_move::Move;
use crate::movelist::MoveList;
use crate::position::Position;

/// Appends every pseudo-legal move available to the side to move. If
/// `captures_and_promotions_only` is set, only captures, en-passant
/// captures, and promotions are generated -- the surface quiescence
/// search walks (spec.md §4.7.3).
pub fn generate_pseudo_legal_moves(pos: &Position, list: &mut MoveList, captures_and_promotions_only: bool) {
    let us = pos.to_move();
    let them = 1 ^ us;
    let occ = pos.occupied();
    let occupied_by_us = pos.occupied_by_color(us);
    let occupied_by_them = pos.occupied_by_color(them);
    let tables = attacks::tables();

    for sq in 0..128 {
        if !on_board(sq) {
            continue;
        }
        let piece = pos.piece_at(sq);
        if piece == EMPTY || piece_color(piece) != us {
            continue;
        }
        match piece_kind(piece) {
            PAWN => generate_pawn_moves(pos, sq, us, occ, occupied_by_them, list, captures_and_promotions_only),
            KNIGHT => {
                push_targets(sq, tables.knight_attacks(sq), occupied_by_us, occupied_by_them, list, captures_and_promotions_only)
            }
            BISHOP => {
                push_targets(sq, tables.bishop_attacks(sq, occ), occupied_by_us, occupied_by_them, list, captures_and_promotions_only)
            }
            ROOK => {
                push_targets(sq, tables.rook_attacks(sq, occ), occupied_by_us, occupied_by_them, list, captures_and_promotions_only)
            }
            QUEEN => {
                push_targets(sq, tables.queen_attacks(sq, occ), occupied_by_us, occupied_by_them, list, captures_and_promotions_only)
            }
            KING => {
                push_targets(sq, tables.king_attacks(sq), occupied_by_us, occupied_by_them, list, captures_and_promotions_only);
                if !captures_and_promotions_only {
                    generate_castling_moves(pos, us, list);
                }
            }
            _ => unreachable!("no piece on the board has kind 0"),
        }
    }
}

fn push_targets(
    from: Square,
    targets: Occupancy,
    occupied_by_us: Occupancy,
    occupied_by_them: Occupancy,
    list: &mut MoveList,
    captures_only: bool,
) {
    let mut bb = targets & !occupied_by_us;
    while bb != 0 {
        let to = bb.trailing_zeros() as Square;
        bb &= bb - 1;
        let is_capture = occupied_by_them & (1u128 << to) != 0;
        if is_capture {
            list.push(Move::capture(from, to));
        } else if !captures_only {
            list.push(Move::quiet(from, to));
        }
    }
}

fn generate_pawn_moves(
    pos: &Position,
    from: Square,
    us: Color,
    occ: Occupancy,
    occupied_by_them: Occupancy,
    list: &mut MoveList,
    captures_and_promotions_only: bool,
) {
    let direction = pawn_push_direction(us);
    let promotion_rank = pawn_promotion_rank(us);
    let push_to = square(file(from), rank(from) + direction);

    if on_board(push_to) && occ & (1u128 << push_to) == 0 {
        if rank(push_to) == promotion_rank {
            push_promotions(from, push_to, false, list);
        } else if !captures_and_promotions_only {
            list.push(Move::quiet(from, push_to));
            if rank(from) == pawn_home_rank(us) {
                let double_to = square(file(from), rank(from) + 2 * direction);
                if occ & (1u128 << double_to) == 0 {
                    list.push(Move::double_push(from, double_to));
                }
            }
        }
    }

    for df in [-1, 1] {
        let f = file(from) + df;
        let r = rank(from) + direction;
        if !(0..8).contains(&f) || !(0..8).contains(&r) {
            continue;
        }
        let to = square(f, r);
        if occupied_by_them & (1u128 << to) != 0 {
            if rank(to) == promotion_rank {
                push_promotions(from, to, true, list);
            } else {
                list.push(Move::capture(from, to));
            }
        } else if Some(to) == pos.en_passant_square() {
            list.push(Move::en_passant(from, to));
        }
    }
}

fn push_promotions(from: Square, to: Square, is_capture: bool, list: &mut MoveList) {
    for &kind in &[QUEEN, ROOK, BISHOP, KNIGHT] {
        list.push(Move::promotion(from, to, kind, is_capture));
    }
}

fn generate_castling_moves(pos: &Position, us: Color, list: &mut MoveList) {
    let occ = pos.occupied();
    let rights = pos.castling_rights();
    let (kingside, queenside, home, king_to, rook_to, between_k, between_q) = if us == WHITE {
        (WHITE_KINGSIDE, WHITE_QUEENSIDE, E1, G1, F1, [F1, G1], [D1, C1, B1])
    } else {
        (BLACK_KINGSIDE, BLACK_QUEENSIDE, E8, G8, F8, [F8, G8], [D8, C8, B8])
    };
    let _ = rook_to;

    if rights.has(kingside) && between_k.iter().all(|&sq| occ & (1u128 << sq) == 0) {
        list.push(Move::castle(home, king_to));
    }
    if rights.has(queenside) && between_q.iter().all(|&sq| occ & (1u128 << sq) == 0) {
        let queen_king_to = square(file(home) - 2, rank(home));
        list.push(Move::castle(home, queen_king_to));
    }
}

/// The result of the opponent attack/pin/checker scan from the side to
/// move's king (spec.md §4.3 phase 1), enough to decide legality of
/// every pseudo-legal non-king, non-en-passant move without playing it.
struct CheckInfo {
    king_sq: Square,
    checker_count: usize,
    /// Valid destination squares for a non-king move when
    /// `checker_count == 1`: the checker's square, plus (for a sliding
    /// checker) every square strictly between it and the king.
    /// Meaningless when `checker_count != 1`.
    block_set: Occupancy,
    /// Indexed by square: `Some((df, dr))` if the piece standing there
    /// is pinned along that line through the king.
    pinned: [Option<(i32, i32)>; 128],
}

fn compute_check_info(pos: &Position) -> CheckInfo {
    let us = pos.to_move();
    let them = 1 ^ us;
    let king_sq = pos.king_square(us);
    let tables = attacks::tables();

    let mut checker_count = 0;
    let mut pinned: [Option<(i32, i32)>; 128] = [None; 128];
    // The single checker's square and, if it is a slider, the direction
    // from the king to it -- all that's needed to build `block_set`.
    let mut lone_checker: Option<(Square, Option<(i32, i32)>)> = None;

    fn record_checker(
        sq: Square,
        dir: Option<(i32, i32)>,
        count: &mut usize,
        lone: &mut Option<(Square, Option<(i32, i32)>)>,
    ) {
        *count += 1;
        if *count == 1 {
            *lone = Some((sq, dir));
        }
    }

    let mut knight_checkers = tables.knight_attacks(king_sq) & pos.piece_bb(them, KNIGHT);
    while knight_checkers != 0 {
        let sq = knight_checkers.trailing_zeros() as Square;
        knight_checkers &= knight_checkers - 1;
        record_checker(sq, None, &mut checker_count, &mut lone_checker);
    }

    let mut pawn_checkers = tables.pawn_attacks(us, king_sq) & pos.piece_bb(them, PAWN);
    while pawn_checkers != 0 {
        let sq = pawn_checkers.trailing_zeros() as Square;
        pawn_checkers &= pawn_checkers - 1;
        record_checker(sq, None, &mut checker_count, &mut lone_checker);
    }

    for &(df, dr) in &QUEEN_DIRS {
        let diagonal = df != 0 && dr != 0;
        let mut f = file(king_sq) + df;
        let mut r = rank(king_sq) + dr;
        let mut blocker: Option<Square> = None;
        while (0..8).contains(&f) && (0..8).contains(&r) {
            let sq = square(f, r);
            let piece = pos.piece_at(sq);
            if piece == EMPTY {
                f += df;
                r += dr;
                continue;
            }
            if piece_color(piece) == us {
                if blocker.is_none() {
                    blocker = Some(sq);
                    f += df;
                    r += dr;
                    continue;
                }
                break;
            }
            let kind = piece_kind(piece);
            let matches_direction = if diagonal { kind == BISHOP || kind == QUEEN } else { kind == ROOK || kind == QUEEN };
            if matches_direction {
                match blocker {
                    None => record_checker(sq, Some((df, dr)), &mut checker_count, &mut lone_checker),
                    Some(friendly) => pinned[friendly as usize] = Some((df, dr)),
                }
            }
            break;
        }
    }

    let mut block_set: Occupancy = 0;
    if checker_count == 1 {
        let (checker_sq, dir) = lone_checker.expect("checker_count == 1 implies lone_checker is set");
        block_set |= 1u128 << checker_sq;
        if let Some((df, dr)) = dir {
            let mut f = file(king_sq) + df;
            let mut r = rank(king_sq) + dr;
            loop {
                let sq = square(f, r);
                if sq == checker_sq {
                    break;
                }
                block_set |= 1u128 << sq;
                f += df;
                r += dr;
            }
        }
    }

    CheckInfo { king_sq, checker_count, block_set, pinned }
}

/// `true` if `to` lies on the infinite line through `king_sq` in
/// direction `dir` (either sense) -- the pin filter of spec.md §4.3
/// phase 4.
fn on_pin_line(king_sq: Square, dir: (i32, i32), to: Square) -> bool {
    let (df, dr) = dir;
    let dx = file(to) - file(king_sq);
    let dy = rank(to) - rank(king_sq);
    dx * dr == dy * df
}

fn verify_by_make_unmake(pos: &mut Position, mv: Move) -> bool {
    match pos.make_move(mv) {
        Some(undo) => {
            pos.unmake_move(undo);
            true
        }
        None => false,
    }
}

fn is_legal(pos: &mut Position, info: &CheckInfo, mv: Move) -> bool {
    let from = mv.from();
    if piece_kind(pos.piece_at(from)) == KING {
        return verify_by_make_unmake(pos, mv);
    }
    if info.checker_count >= 2 {
        return false;
    }
    if mv.is_en_passant() {
        // Double check was already ruled out above; a single check or
        // no check plus the possibility of a discovered check along the
        // vacated rank are both resolved by actually playing the move.
        return verify_by_make_unmake(pos, mv);
    }
    if info.checker_count == 1 && info.block_set & (1u128 << mv.to()) == 0 {
        return false;
    }
    if let Some(dir) = info.pinned[from as usize] {
        if !on_pin_line(info.king_sq, dir, mv.to()) {
            return false;
        }
    }
    true
}

#[cfg(debug_assertions)]
fn brute_force_legal_moves(pos: &mut Position, captures_and_promotions_only: bool) -> MoveList {
    let mut pseudo = MoveList::new();
    generate_pseudo_legal_moves(pos, &mut pseudo, captures_and_promotions_only);
    let mut legal = MoveList::new();
    for &mv in pseudo.iter() {
        if let Some(undo) = pos.make_move(mv) {
            pos.unmake_move(undo);
            legal.push(mv);
        }
    }
    legal
}

#[cfg(debug_assertions)]
fn debug_cross_check(pos: &mut Position, fast: &MoveList, captures_and_promotions_only: bool) {
    let brute = brute_force_legal_moves(pos, captures_and_promotions_only);
    debug_assert_eq!(
        fast.len(),
        brute.len(),
        "pin/checker move generator disagrees with the brute-force oracle on move count in '{}': fast={}, brute={}",
        pos.to_fen(),
        fast.len(),
        brute.len(),
    );
    for &mv in fast.iter() {
        debug_assert!(
            brute.iter().any(|&b| b == mv),
            "pin/checker move generator produced an illegal move {} in '{}'",
            mv,
            pos.to_fen(),
        );
    }
}

/// Generates every legal move in `pos` (spec.md §4.3). `pos` is
/// restored to its original state before returning.
pub fn generate_legal_moves(pos: &mut Position) -> MoveList {
    let mut pseudo = MoveList::new();
    generate_pseudo_legal_moves(pos, &mut pseudo, false);
    let info = compute_check_info(pos);
    let mut legal = MoveList::new();
    for &mv in pseudo.iter() {
        if is_legal(pos, &info, mv) {
            legal.push(mv);
        }
    }
    #[cfg(debug_assertions)]
    debug_cross_check(pos, &legal, false);
    legal
}

/// Generates only the legal captures, en-passant captures, and
/// promotions -- the quiescence search's move set (spec.md §4.7.3).
pub fn generate_legal_captures(pos: &mut Position) -> MoveList {
    let mut pseudo = MoveList::new();
    generate_pseudo_legal_moves(pos, &mut pseudo, true);
    let info = compute_check_info(pos);
    let mut legal = MoveList::new();
    for &mv in pseudo.iter() {
        if is_legal(pos, &info, mv) {
            legal.push(mv);
        }
    }
    #[cfg(debug_assertions)]
    debug_cross_check(pos, &legal, true);
    legal
}

#[inline]
pub fn in_check(pos: &Position) -> bool {
    pos.is_in_check(pos.to_move())
}

/// `true` if the side to move has at least one legal move. Stops at
/// the first one found rather than generating the full list.
pub fn has_any_legal_move(pos: &mut Position) -> bool {
    let mut pseudo = MoveList::new();
    generate_pseudo_legal_moves(pos, &mut pseudo, false);
    for &mv in pseudo.iter() {
        if let Some(undo) = pos.make_move(mv) {
            pos.unmake_move(undo);
            return true;
        }
    }
    false
}

pub fn is_checkmate(pos: &mut Position) -> bool {
    in_check(pos) && !has_any_legal_move(pos)
}

pub fn is_stalemate(pos: &mut Position) -> bool {
    !in_check(pos) && !has_any_legal_move(pos)
}

/// spec.md §4.3 edge case: fifty full moves (100 halfmoves) without a
/// pawn move or a capture is a claimable draw.
pub fn is_fifty_move_draw(pos: &Position) -> bool {
    pos.halfmove_clock() >= 100
}

/// `true` when neither side has enough material to deliver checkmate
/// by any sequence of legal moves: K vs K, K+N vs K, or K+B vs K (any
/// number of same-colored bishops for one side also counts, but that
/// case is rare enough in practice that callers fall back to the
/// search depth limit instead of special-casing it here).
pub fn is_insufficient_material(pos: &Position) -> bool {
    let mut minor_count = 0;
    for sq in 0..128 {
        if !on_board(sq) {
            continue;
        }
        let p = pos.piece_at(sq);
        if p == EMPTY {
            continue;
        }
        match piece_kind(p) {
            KING => {}
            KNIGHT | BISHOP => minor_count += 1,
            _ => return false,
        }
    }
    minor_count <= 1
}

/// Whether `current_key` has already occurred at least `threshold`
/// times earlier in `history` -- used by the search to treat a
/// repeated position as a draw (spec.md §4.3 edge case: draw by
/// repetition along the search path).
pub fn is_repetition(history: &[u64], current_key: u64, threshold: usize) -> bool {
    history.iter().filter(|&&k| k == current_key).count() >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::STARTING_FEN;

    #[test]
    fn test_starting_position_move_count() {
        let mut pos = Position::from_fen(STARTING_FEN).unwrap();
        let moves = generate_legal_moves(&mut pos);
        assert_eq!(moves.len(), 20);
    }

    #[test]
    fn test_castling_requires_clear_path() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let moves = generate_legal_moves(&mut pos);
        let castles: Vec<_> = moves.iter().filter(|m| m.is_castle()).collect();
        assert_eq!(castles.len(), 2);
    }

    #[test]
    fn test_castling_blocked_through_check() {
        // Black rook controls the f-file, so the king's kingside
        // passing square (f1) is attacked; only queenside castling
        // should remain legal.
        let mut pos = Position::from_fen("k4r2/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let moves = generate_legal_moves(&mut pos);
        let castles: Vec<_> = moves.iter().filter(|m| m.is_castle()).collect();
        assert_eq!(castles.len(), 1);
        assert_eq!(castles[0].to(), C1);
    }

    #[test]
    fn test_checkmate_detection() {
        // Fool's mate final position (1. f3 e5 2. g4 Qh4#), white to move and mated.
        let mut pos =
            Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        assert!(is_checkmate(&mut pos));
    }

    #[test]
    fn test_stalemate_detection() {
        let mut pos = Position::from_fen("7k/8/6Q1/8/8/8/8/K7 b - - 0 1").unwrap();
        assert!(is_stalemate(&mut pos));
    }

    #[test]
    fn test_insufficient_material() {
        let pos = Position::from_fen("8/8/8/4k3/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(is_insufficient_material(&pos));
        let pos = Position::from_fen("8/8/8/4k3/8/8/8/3RK3 w - - 0 1").unwrap();
        assert!(!is_insufficient_material(&pos));
    }

    #[test]
    fn test_pinned_rook_restricted_to_pin_line() {
        // White rook on d4 is pinned to the king on d1 by the black
        // rook on d8; it may shuffle up and down the d-file but cannot
        // step off it.
        let mut pos = Position::from_fen("3r2k1/8/8/8/3R4/8/8/3K4 w - - 0 1").unwrap();
        let moves = generate_legal_moves(&mut pos);
        let rook_moves: Vec<_> = moves.iter().filter(|m| m.from() == D4).collect();
        assert!(rook_moves.iter().all(|m| file(m.to()) == file(D4)));
        assert!(rook_moves.iter().any(|m| m.to() == D8));
    }

    #[test]
    fn test_double_check_allows_only_king_moves() {
        // White king on e1 is checked by both the rook on e8 (along the
        // open e-file) and the knight on d3; every legal move must be a
        // king move.
        let mut pos = Position::from_fen("k3r3/8/8/8/8/3n4/8/4K3 w - - 0 1").unwrap();
        let moves = generate_legal_moves(&mut pos);
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|m| m.from() == E1));
    }

    #[test]
    fn test_single_check_restricts_to_block_set() {
        // White king on e1 is checked by the rook on e8 along the open
        // e-file; the queen on a5 is unpinned but every one of its
        // moves that doesn't interpose or capture on the e-file is
        // illegal while the king is in check.
        let mut pos = Position::from_fen("4r2k/8/8/Q7/8/8/8/4K3 w - - 0 1").unwrap();
        let moves = generate_legal_moves(&mut pos);
        let queen_moves: Vec<_> = moves.iter().filter(|m| m.from() == A5).collect();
        assert!(!queen_moves.is_empty());
        assert!(queen_moves.iter().all(|m| file(m.to()) == file(E1)));
    }
}
