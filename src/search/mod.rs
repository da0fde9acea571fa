//! Top-K maximal clique search.
//!
//! [`CliqueSearch`] runs a pivoted Bron–Kerbosch recursion over the mutual
//! neighbor relation exposed by a [`NeighborResolver`]. The worst kept entry
//! of the caller-owned [`RankingBuffer`] is the live pruning bound: a branch
//! is abandoned once `|R| + |P|` falls below it, and a vertex is only
//! branched on when its neighbor count reaches it.

mod engine;
mod neighbors;
mod ranking;

pub use engine::{
    AbortReason, CliqueSearch, PivotRule, SearchOptions, SearchOutcome, SearchProgress,
    SearchStats,
};
pub use neighbors::{NeighborCacheStats, NeighborResolver, DEFAULT_NEIGHBOR_CACHE_CAPACITY};
pub use ranking::RankingBuffer;
