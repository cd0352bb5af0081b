//! Integration test running the full perft scenario table from
//! spec.md §8 at its published depths. These are slow (position 3
//! alone visits 11,030,083 nodes) and excluded from the default test
//! run; invoke with `cargo test --test perft -- --ignored`.

use corvid::perft::perft;
use corvid::Position;

const SCENARIOS: &[(&str, u32, u64)] = &[
    ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 5, 4_865_609),
    ("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1", 4, 4_085_603),
    ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 6, 11_030_083),
    ("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1", 5, 15_833_292),
    ("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8", 4, 2_103_487),
    ("r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10", 4, 3_894_594),
];

#[test]
#[ignore]
fn test_perft_scenario_table() {
    for &(fen, depth, expected) in SCENARIOS {
        let mut position = Position::from_fen(fen).unwrap_or_else(|err| panic!("bad FEN '{fen}': {err}"));
        let nodes = perft(&mut position, depth);
        assert_eq!(nodes, expected, "perft({depth}) mismatch for '{fen}'");
    }
}
