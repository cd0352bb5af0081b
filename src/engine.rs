//! A thread-and-channel wrapper around the synchronous search core in
//! `crate::search`, for callers (a CLI, a UCI-like frontend) that want
//! to start a search, keep doing other things, and poll for progress
//! reports without blocking (spec.md §5, §9 "global mutable state"
//! design note, and the teacher's own
//! `SearchExecutor`/`Command`/`Report` split in `search/mod.rs`).
//!
//! `EngineHandle` owns exactly one background thread holding the
//! `Position` and `TranspositionTable`; the caller only ever talks to
//! it through two channels. There is no shared mutable state between
//! the calling thread and the search thread -- every message is owned
//! data moving one way across an `mpsc::channel`. Unlike the teacher's
//! layered `AlphabetaSearcher`/`DeepeningSearcher`/`AspirationSearcher`
//! stack, there is only ever one worker thread here and no
//! aspiration-window or multi-PV layering, since this crate's search
//! core has no equivalent layers to wrap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::position::Position;
use crate::search::{self, SearchReport};
use crate::tt::TranspositionTable;

/// A request to search a position, sent to the engine thread.
pub struct SearchRequest {
    pub position: Position,
    pub max_depth: i8,
    pub move_time: Option<Duration>,
    /// Zobrist keys of the game history leading up to `position`, for
    /// repetition detection that reaches outside the search tree.
    pub history: Vec<u64>,
}

enum Command {
    Search(SearchRequest),
    Quit,
}

/// Owns the background search thread. Dropping it requests
/// termination and joins the thread, so a caller never needs to
/// manage shutdown explicitly.
pub struct EngineHandle {
    commands: Sender<Command>,
    reports: Receiver<SearchReport>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Spawns the engine thread with `config`, reused across searches
    /// for the life of the handle.
    pub fn new(config: EngineConfig) -> EngineHandle {
        let (commands_tx, commands_rx) = channel::<Command>();
        let (reports_tx, reports_rx) = channel::<SearchReport>();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let worker_stop_flag = Arc::clone(&stop_flag);

        let thread = thread::spawn(move || {
            let mut tt = TranspositionTable::with_size_mb(config.tt_size_mb);
            for command in commands_rx.iter() {
                match command {
                    Command::Search(request) => {
                        worker_stop_flag.store(false, Ordering::Relaxed);
                        let deadline = request.move_time.map(|d| Instant::now() + d);
                        let mut position = request.position;
                        let report = search::run_iterative_deepening(
                            &mut position,
                            &mut tt,
                            config,
                            request.history,
                            request.max_depth,
                            deadline,
                            Arc::clone(&worker_stop_flag),
                        );
                        // A send failure means the handle was dropped
                        // mid-search; nothing left to report to.
                        let _ = reports_tx.send(report);
                    }
                    Command::Quit => break,
                }
            }
        });

        EngineHandle {
            commands: commands_tx,
            reports: reports_rx,
            stop_flag,
            thread: Some(thread),
        }
    }

    /// Submits a new search. The engine thread processes one search
    /// at a time; submitting a second request before the first
    /// reports completion simply queues behind it.
    pub fn start_search(&self, request: SearchRequest) {
        let _ = self.commands.send(Command::Search(request));
    }

    /// Blocks until a completed `SearchReport` is available, or the
    /// timeout elapses first.
    pub fn wait_report(&self, timeout: Duration) -> Result<SearchReport, RecvTimeoutError> {
        self.reports.recv_timeout(timeout)
    }

    /// Requests the running search stop at its next time check and
    /// return its best-so-far move. Cooperative, not forced: the
    /// search loop polls this flag alongside the deadline (see
    /// `search::SearchContext::check_time`) and only stops between
    /// nodes.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Consumes the handle, requesting termination and waiting for
    /// the worker thread to exit.
    pub fn join(mut self) {
        let _ = self.commands.send(Command::Quit);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Quit);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::STARTING_FEN;

    #[test]
    fn test_engine_returns_a_move() {
        let engine = EngineHandle::new(EngineConfig { tt_size_mb: 1, ..EngineConfig::default() });
        let position = Position::from_fen(STARTING_FEN).unwrap();
        engine.start_search(SearchRequest {
            position,
            max_depth: 2,
            move_time: Some(Duration::from_millis(500)),
            history: Vec::new(),
        });
        let report = engine.wait_report(Duration::from_secs(5)).expect("search completes");
        assert!(report.best_move != crate::chess_move::Move::NONE);
    }
}
