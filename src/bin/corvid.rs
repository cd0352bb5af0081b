//! `corvid` -- a minimal command-line harness around the search and
//! perft cores (spec.md §1's "external collaborator" boundary). No
//! UCI protocol, no book, no persistent options: load a FEN, run one
//! search or one perft, print the result, exit.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use corvid::config::EngineConfig;
use corvid::engine::{EngineHandle, SearchRequest};
use corvid::perft;
use corvid::position::{Position, STARTING_FEN};

#[derive(Parser)]
#[command(name = "corvid", about = "Search-and-evaluation core of a chess engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run iterative-deepening search from a position and print the best move.
    Search {
        #[arg(long, default_value = STARTING_FEN)]
        fen: String,
        #[arg(long, default_value_t = 8)]
        depth: i8,
        #[arg(long)]
        movetime: Option<u64>,
        #[arg(long, default_value_t = 64)]
        hash_mb: usize,
    },
    /// Count leaf nodes at a fixed depth by full enumeration.
    Perft {
        #[arg(long, default_value = STARTING_FEN)]
        fen: String,
        #[arg(long, default_value_t = 5)]
        depth: u32,
        /// Report a per-root-move breakdown instead of just the total.
        #[arg(long)]
        divide: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Search { fen, depth, movetime, hash_mb } => run_search(&fen, depth, movetime, hash_mb),
        Command::Perft { fen, depth, divide } => run_perft(&fen, depth, divide),
    }
}

fn run_search(fen: &str, depth: i8, movetime: Option<u64>, hash_mb: usize) -> ExitCode {
    let position = match Position::from_fen(fen) {
        Ok(position) => position,
        Err(err) => {
            eprintln!("invalid FEN '{fen}': {err}");
            return ExitCode::FAILURE;
        }
    };

    let config = EngineConfig { tt_size_mb: hash_mb, ..EngineConfig::default() };
    let engine = EngineHandle::new(config);
    engine.start_search(SearchRequest {
        position,
        max_depth: depth,
        move_time: movetime.map(Duration::from_millis),
        history: Vec::new(),
    });

    match engine.wait_report(Duration::from_secs(300)) {
        Ok(report) => {
            println!("{report}");
            if report.best_move == corvid::Move::NONE {
                println!("bestmove (none)");
            } else {
                println!("bestmove {}", report.best_move);
            }
            ExitCode::SUCCESS
        }
        Err(_) => {
            eprintln!("search did not complete within the time budget");
            ExitCode::FAILURE
        }
    }
}

fn run_perft(fen: &str, depth: u32, divide: bool) -> ExitCode {
    let mut position = match Position::from_fen(fen) {
        Ok(position) => position,
        Err(err) => {
            eprintln!("invalid FEN '{fen}': {err}");
            return ExitCode::FAILURE;
        }
    };

    if divide {
        let mut total = 0u64;
        for (mv, nodes) in perft::perft_divide(&mut position, depth) {
            println!("{mv} {nodes}");
            total += nodes;
        }
        println!("total {total}");
    } else {
        println!("{}", perft::perft(&mut position, depth));
    }
    ExitCode::SUCCESS
}
