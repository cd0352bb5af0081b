//! Iterative deepening over a negamax principal-variation search with
//! alpha-beta pruning, null-move pruning, and quiescence at the
//! leaves (spec.md §4.7).
//!
//! The search core is a plain function over an explicit
//! `SearchContext` -- no global mutable state, no thread spawned
//! internally, no panics used for control flow. A caller that wants a
//! background search with progress reports builds that on top (see
//! `crate::engine`), mirroring the way this keeps "can this search be
//! stopped and resumed" entirely the caller's problem.

pub mod ordering;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::basetypes::*;
use crate::chess_move::Move;
use crate::config::EngineConfig;
use crate::eval::{self, Score, DRAW, MATE, MATE_THRESHOLD};
use crate::movegen;
use crate::movelist::MoveList;
use crate::position::Position;
use crate::tt::{Bound, TranspositionTable};

use ordering::{HistoryTable, KillerTable};

/// The maximum search depth in plies. Kept comfortably under the
/// 0x88 move-encoding square range and the killer/history table sizes
/// below it.
pub const MAX_DEPTH: i8 = 64;

/// Checked every `NODES_PER_TIME_CHECK` nodes rather than on every
/// node, since `Instant::now()` is not free.
const NODES_PER_TIME_CHECK: u64 = 2048;

/// Everything one call to `run_iterative_deepening` needs and
/// mutates. Built fresh by the caller for each search; never touches
/// global state.
pub struct SearchContext<'a> {
    pos: &'a mut Position,
    tt: &'a mut TranspositionTable,
    config: EngineConfig,
    killers: KillerTable,
    history: HistoryTable,
    /// Zobrist keys of positions on the path from the game's start (or
    /// the last irreversible move) to the search root, used to detect
    /// repetition draws that span outside the search tree itself.
    root_history: Vec<u64>,
    /// The best move found by the previous completed iteration, tried
    /// first at the root of the next one (spec.md §4.7.2's root-PV
    /// ordering bonus).
    root_pv_move: Move,
    nodes: u64,
    deadline: Option<Instant>,
    /// Cooperative cancellation flag shared with the caller (e.g.
    /// `engine::EngineHandle::request_stop`); polled alongside
    /// `deadline` in `check_time` so a caller-requested stop and a
    /// time-budget expiry are handled identically.
    stop_flag: Arc<AtomicBool>,
    stopped: bool,
    /// Set once a null-move search is skipped for lack of material, so
    /// the warning is logged at most once per search rather than once
    /// per node (spec.md §4.9).
    warned_zugzwang_skip: bool,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        pos: &'a mut Position,
        tt: &'a mut TranspositionTable,
        config: EngineConfig,
        root_history: Vec<u64>,
        deadline: Option<Instant>,
        stop_flag: Arc<AtomicBool>,
    ) -> Self {
        SearchContext {
            pos,
            tt,
            killers: KillerTable::new(config.max_depth as usize + 1),
            history: HistoryTable::new(),
            config,
            root_history,
            root_pv_move: Move::NONE,
            nodes: 0,
            deadline,
            stop_flag,
            stopped: false,
            warned_zugzwang_skip: false,
        }
    }

    #[inline]
    fn check_time(&mut self) {
        if self.nodes % NODES_PER_TIME_CHECK == 0 {
            if self.stop_flag.load(Ordering::Relaxed) {
                self.stopped = true;
                return;
            }
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.stopped = true;
                }
            }
        }
    }

    fn is_repetition(&self, search_line: &[u64]) -> bool {
        let key = self.pos.zobrist_key();
        // `search_line` already holds the current node's own key (the
        // caller pushes it before recursing), so a match against the
        // node itself doesn't count as a repeat; only a second
        // occurrence -- a strict ancestor -- does. `root_history` never
        // includes the current position, so it stays at threshold 1.
        movegen::is_repetition(&self.root_history, key, 1) || movegen::is_repetition(search_line, key, 2)
    }
}

/// One line of principal variation.
#[derive(Debug, Clone, Default)]
pub struct Pv {
    pub moves: Vec<Move>,
}

impl fmt::Display for Pv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rendered: Vec<String> = self.moves.iter().map(|m| m.to_string()).collect();
        write!(f, "{}", rendered.join(" "))
    }
}

/// The outcome of a completed (or time-cut) search (spec.md §6).
/// `Display` produces exactly the progress-report line format spec.md
/// §6 specifies: depth, elapsed milliseconds, total nodes searched,
/// nodes per second, and the PV as space-separated coordinate moves.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub depth: i8,
    pub score: Score,
    pub nodes: u64,
    pub elapsed: Duration,
    pub best_move: Move,
    pub pv: Pv,
}

impl SearchReport {
    pub fn nodes_per_second(&self) -> u64 {
        let ms = self.elapsed.as_millis().max(1) as u64;
        self.nodes * 1000 / ms
    }
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.depth,
            self.elapsed.as_millis(),
            self.nodes,
            self.nodes_per_second(),
            self.pv,
        )
    }
}

/// Runs iterative deepening from depth 1 up to `config.max_depth`,
/// stopping early if `deadline` passes. Always returns the best move
/// found by the last fully- or partially-completed iteration
/// (spec.md §4.7.1, §6).
pub fn run_iterative_deepening(
    pos: &mut Position,
    tt: &mut TranspositionTable,
    config: EngineConfig,
    root_history: Vec<u64>,
    max_depth: i8,
    deadline: Option<Instant>,
    stop_flag: Arc<AtomicBool>,
) -> SearchReport {
    tt.new_search();
    let started = Instant::now();
    let mut ctx = SearchContext::new(pos, tt, config, root_history, deadline, stop_flag);

    let mut last_report = SearchReport {
        depth: 0,
        score: DRAW,
        nodes: 0,
        elapsed: Duration::from_millis(0),
        best_move: Move::NONE,
        pv: Pv::default(),
    };

    for depth in 1..=max_depth.min(config.max_depth) {
        let mut search_line = Vec::with_capacity(depth as usize);
        let score = negamax(&mut ctx, -MATE, MATE, depth, 0, &mut search_line);
        if ctx.stopped && depth > 1 {
            break;
        }
        let pv = extract_pv(&mut ctx, depth);
        ctx.root_pv_move = pv.moves.first().copied().unwrap_or(Move::NONE);
        last_report = SearchReport {
            depth,
            score,
            nodes: ctx.nodes,
            elapsed: started.elapsed(),
            best_move: ctx.root_pv_move,
            pv,
        };
        debug!(
            "completed depth {} in {} ms, {} nodes, score {}",
            last_report.depth,
            last_report.elapsed.as_millis(),
            last_report.nodes,
            last_report.score,
        );
        if ctx.stopped || score.abs() >= MATE_THRESHOLD {
            break;
        }
    }
    last_report
}

fn extract_pv(ctx: &mut SearchContext, max_len: i8) -> Pv {
    let mut moves = Vec::new();
    let mut undone = Vec::new();
    for _ in 0..max_len {
        let probe = match ctx.tt.probe(ctx.pos.zobrist_key()) {
            Some(p) if p.best_move != Move::NONE => p,
            _ => break,
        };
        let legal = movegen::generate_legal_moves(ctx.pos);
        if !legal.iter().any(|&m| m == probe.best_move) {
            break;
        }
        let undo = ctx.pos.make_move(probe.best_move);
        match undo {
            Some(undo) => {
                undone.push(undo);
                moves.push(probe.best_move);
            }
            None => break,
        }
    }
    for undo in undone.into_iter().rev() {
        ctx.pos.unmake_move(undo);
    }
    Pv { moves }
}

/// Encodes a ply-relative mate score as a ply-independent one before
/// storing it in the transposition table, and the inverse on the way
/// out (spec.md §4.6, §4.7).
fn score_to_tt(score: Score, ply: i32) -> Score {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: Score, ply: i32) -> Score {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

fn non_pawn_material(pos: &Position, color: Color) -> i32 {
    let mut total = 0;
    for kind in [KNIGHT, BISHOP, ROOK, QUEEN] {
        total += pos.piece_bb(color, kind).count_ones() as i32 * PIECE_VALUE[kind];
    }
    total
}

fn negamax(ctx: &mut SearchContext, mut alpha: Score, beta: Score, depth: i8, ply: i32, search_line: &mut Vec<u64>) -> Score {
    ctx.nodes += 1;
    ctx.check_time();
    if ctx.stopped {
        return 0;
    }

    if ply > 0 {
        if ctx.is_repetition(search_line) || movegen::is_fifty_move_draw(ctx.pos) {
            return DRAW;
        }
        if movegen::is_insufficient_material(ctx.pos) {
            return DRAW;
        }
    }

    if depth <= 0 {
        return quiescence(ctx, alpha, beta, ply);
    }

    let key = ctx.pos.zobrist_key();
    let mut tt_move = Move::NONE;
    if let Some(probe) = ctx.tt.probe(key) {
        tt_move = probe.best_move;
        if probe.depth as i8 >= depth {
            let score = score_from_tt(probe.score, ply);
            match probe.bound {
                Bound::Exact => return score,
                Bound::Lower if score >= beta => return score,
                Bound::Upper if score <= alpha => return score,
                _ => {}
            }
        }
    }

    let in_check = movegen::in_check(ctx.pos);
    let us = ctx.pos.to_move();

    if !in_check && depth >= ctx.config.null_move_min_depth && beta.abs() < MATE_THRESHOLD {
        if non_pawn_material(ctx.pos, us) >= ctx.config.null_move_material_threshold {
            let undo = ctx.pos.make_null_move();
            search_line.push(ctx.pos.zobrist_key());
            let reduction = ctx.config.null_move_reduction;
            let score = -negamax(ctx, -beta, -beta + 1, depth - 1 - reduction, ply + 1, search_line);
            search_line.pop();
            ctx.pos.unmake_null_move(undo);
            if ctx.stopped {
                return 0;
            }
            if score >= beta {
                return beta;
            }
        } else if !ctx.warned_zugzwang_skip {
            warn!("null-move pruning skipped: insufficient non-pawn material for side to move");
            ctx.warned_zugzwang_skip = true;
        }
    }

    let mut moves = movegen::generate_legal_moves(ctx.pos);
    if moves.is_empty() {
        return if in_check { -MATE + ply } else { DRAW };
    }
    let root_pv_hint = ctx.root_pv_move;
    ordering::order_moves(ctx.pos, &mut moves, tt_move, root_pv_hint, &ctx.killers, &ctx.history, ply as usize);

    let original_alpha = alpha;
    let mut best_move = Move::NONE;
    let mut best_score = -MATE;
    let mut searched = 0;

    for &mv in moves.iter() {
        let undo = match ctx.pos.make_move(mv) {
            Some(undo) => undo,
            None => continue,
        };
        search_line.push(ctx.pos.zobrist_key());

        let score = if searched == 0 {
            -negamax(ctx, -beta, -alpha, depth - 1, ply + 1, search_line)
        } else {
            let reduced = -negamax(ctx, -alpha - 1, -alpha, depth - 1, ply + 1, search_line);
            if reduced > alpha && reduced < beta {
                -negamax(ctx, -beta, -alpha, depth - 1, ply + 1, search_line)
            } else {
                reduced
            }
        };

        search_line.pop();
        ctx.pos.unmake_move(undo);
        searched += 1;

        if ctx.stopped {
            return 0;
        }

        if score > best_score {
            best_score = score;
            best_move = mv;
        }
        if score > alpha {
            alpha = score;
        }
        if alpha >= beta {
            if !mv.is_capture() {
                ctx.killers.record(ply as usize, mv);
                ctx.history.record(us, mv.from(), mv.to(), depth);
            }
            break;
        }
    }

    let bound = if best_score <= original_alpha {
        Bound::Upper
    } else if best_score >= beta {
        Bound::Lower
    } else {
        Bound::Exact
    };
    ctx.tt.store(key, best_move, depth, score_to_tt(best_score, ply), bound);
    best_score
}

/// Extends the search with captures and promotions only, past the
/// nominal horizon, to avoid misjudging positions in the middle of a
/// capture sequence (the "horizon effect", spec.md §4.7.3).
fn quiescence(ctx: &mut SearchContext, mut alpha: Score, beta: Score, ply: i32) -> Score {
    ctx.nodes += 1;
    ctx.check_time();
    if ctx.stopped {
        return 0;
    }

    let stand_pat = if ctx.pos.to_move() == WHITE { eval::evaluate(ctx.pos) } else { -eval::evaluate(ctx.pos) };
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let mut captures = movegen::generate_legal_captures(ctx.pos);
    let killers = KillerTable::new(0);
    let history = HistoryTable::new();
    ordering::order_moves(ctx.pos, &mut captures, Move::NONE, Move::NONE, &killers, &history, 0);

    for &mv in captures.iter() {
        if !mv.is_promotion() {
            let see = crate::see::see_capture_value(ctx.pos, mv.from(), mv.to());
            if see < 0 {
                continue;
            }
        }
        let undo = match ctx.pos.make_move(mv) {
            Some(undo) => undo,
            None => continue,
        };
        let score = -quiescence(ctx, -beta, -alpha, ply + 1);
        ctx.pos.unmake_move(undo);

        if ctx.stopped {
            return 0;
        }
        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }
    alpha
}

/// Runs `run_iterative_deepening` with the default `EngineConfig` and
/// no time limit, for an arbitrary fixed depth -- used by tests and by
/// `perft`-adjacent sanity checks that want a single-depth score.
pub fn search_fixed_depth(pos: &mut Position, tt: &mut TranspositionTable, depth: i8) -> SearchReport {
    run_iterative_deepening(pos, tt, EngineConfig::default(), Vec::new(), depth, None, Arc::new(AtomicBool::new(false)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::STARTING_FEN;

    #[test]
    fn test_finds_mate_in_one() {
        let mut pos = Position::from_fen("6k1/8/5K2/8/8/8/8/7Q w - - 0 1").unwrap();
        let mut tt = TranspositionTable::with_size_mb(1);
        let report = search_fixed_depth(&mut pos, &mut tt, 3);
        assert!(report.score >= MATE_THRESHOLD);
    }

    #[test]
    fn test_captures_a_hanging_queen() {
        let mut pos = Position::from_fen("4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let mut tt = TranspositionTable::with_size_mb(1);
        let report = search_fixed_depth(&mut pos, &mut tt, 3);
        assert_eq!(report.best_move.from(), E4);
        assert_eq!(report.best_move.to(), D5);
    }

    #[test]
    fn test_starting_position_search_terminates() {
        let mut pos = Position::from_fen(STARTING_FEN).unwrap();
        let mut tt = TranspositionTable::with_size_mb(1);
        let report = search_fixed_depth(&mut pos, &mut tt, 2);
        assert!(report.best_move != Move::NONE);
    }

    #[test]
    fn test_report_display_matches_progress_line_format() {
        let mut pos = Position::from_fen(STARTING_FEN).unwrap();
        let mut tt = TranspositionTable::with_size_mb(1);
        let report = search_fixed_depth(&mut pos, &mut tt, 1);
        let rendered = report.to_string();
        let fields: Vec<&str> = rendered.split(' ').collect();
        assert!(fields.len() >= 4);
        assert_eq!(fields[0], "1");
    }
}
