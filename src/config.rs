//! Engine-wide tunables the search leaves as open parameters
//! (spec.md §9). A plain struct, not a file format -- there is no
//! persistent configuration file in scope, matching the distilled
//! spec's silence on configuration beyond "document the chosen
//! threshold" for null-move pruning.

use crate::basetypes::{PIECE_VALUE, KNIGHT};
use crate::search::MAX_DEPTH;

/// Bundles the search's runtime-tunable parameters. Defaults are
/// documented in `DESIGN.md` under "Open Question resolutions".
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Transposition table size, in megabytes.
    pub tt_size_mb: usize,
    /// Plies subtracted from the remaining depth on a null-move
    /// search (the "R" in "null-move reduction R").
    pub null_move_reduction: i8,
    /// Null-move pruning is skipped below this remaining depth.
    pub null_move_min_depth: i8,
    /// Null-move pruning is skipped when the side to move holds less
    /// non-pawn, non-king material than this, to avoid the zugzwang
    /// positions where "passing" is actually the best move.
    pub null_move_material_threshold: i32,
    /// Hard ceiling on iterative-deepening depth.
    pub max_depth: i8,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            tt_size_mb: 64,
            null_move_reduction: 2,
            null_move_min_depth: 3,
            null_move_material_threshold: PIECE_VALUE[KNIGHT],
            max_depth: MAX_DEPTH,
        }
    }
}
