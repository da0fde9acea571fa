//! Label-resolved search results.

use serde::Serialize;

use crate::error::Result;
use crate::search::{AbortReason, RankingBuffer, SearchOutcome, SearchStats};
use crate::storage::VertexCatalog;

/// One ranking slot with its members resolved to labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CliqueReport {
    /// One-based position in the ranking.
    pub rank: usize,
    /// Member count.
    pub size: usize,
    /// Member labels in vertex id order.
    pub members: Vec<String>,
}

/// Everything a caller needs to print or serialize the outcome of a search.
#[derive(Clone, Debug, Serialize)]
pub struct SearchReport {
    /// `false` when a limit or a storage failure cut the search short.
    pub complete: bool,
    /// Limit that stopped the search, if any.
    pub abort_reason: Option<AbortReason>,
    /// Requested number of cliques.
    pub top_k: usize,
    /// Ranking slots, best first; empty slots included.
    pub cliques: Vec<CliqueReport>,
    /// Search counters, absent when the search failed before finishing.
    pub stats: Option<SearchStats>,
}

impl SearchReport {
    /// Resolves every ranked clique against `catalog`.
    ///
    /// Passing `None` for the outcome marks the report incomplete.
    pub fn build<C>(
        catalog: &C,
        ranking: &RankingBuffer,
        outcome: Option<&SearchOutcome>,
    ) -> Result<Self>
    where
        C: VertexCatalog + ?Sized,
    {
        let mut cliques = Vec::with_capacity(ranking.capacity());
        for (idx, clique) in ranking.slots().iter().enumerate() {
            let members = clique
                .members()
                .iter()
                .map(|&id| catalog.resolve(id))
                .collect::<Result<Vec<_>>>()?;
            cliques.push(CliqueReport {
                rank: idx + 1,
                size: clique.len(),
                members,
            });
        }
        Ok(Self {
            complete: outcome.is_some_and(SearchOutcome::is_complete),
            abort_reason: outcome.and_then(|o| o.aborted),
            top_k: ranking.capacity(),
            cliques,
            stats: outcome.map(|o| o.stats.clone()),
        })
    }

    /// Plain-text rendering, one line per slot.
    pub fn render_lines(&self) -> Vec<String> {
        self.cliques
            .iter()
            .map(|c| format!("{} Result of length {}: {}", c.rank, c.size, c.members.join(", ")))
            .collect()
    }
}
