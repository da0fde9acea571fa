use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::error::{CliqueError, Result};
use crate::storage::EdgeStore;
use crate::types::{Clique, VertexId, VertexSet};

use super::neighbors::{NeighborCacheStats, NeighborResolver, DEFAULT_NEIGHBOR_CACHE_CAPACITY};
use super::ranking::RankingBuffer;

/// How the branch pivot is chosen from `P ∪ X`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PivotRule {
    /// First vertex in set iteration order.
    #[default]
    First,
    /// Vertex with the most mutual neighbors inside `P` (ties to lowest id).
    MaxCandidates,
}

/// Tuning knobs for [`CliqueSearch`].
#[derive(Clone, Debug)]
pub struct SearchOptions {
    /// Number of cliques to keep.
    pub top_k: usize,
    /// Emit a progress event every this many top-level branches.
    pub info_interval: Option<u64>,
    /// Pivot selection rule.
    pub pivot: PivotRule,
    /// Neighbor cache entries; zero disables the cache.
    pub neighbor_cache_capacity: usize,
    /// Stop after this much wall-clock time.
    pub time_limit: Option<Duration>,
    /// Stop after this many recursive calls.
    pub max_calls: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            info_interval: Some(5_000),
            pivot: PivotRule::First,
            neighbor_cache_capacity: DEFAULT_NEIGHBOR_CACHE_CAPACITY,
            time_limit: None,
            max_calls: None,
        }
    }
}

impl SearchOptions {
    /// Validates the options, rejecting values the search cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(CliqueError::InvalidArgument(
                "top_k must be at least 1".into(),
            ));
        }
        if self.info_interval == Some(0) {
            return Err(CliqueError::InvalidArgument(
                "info_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Why a search stopped before exhausting the graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// `time_limit` elapsed.
    TimeLimit,
    /// `max_calls` exhausted.
    CallLimit,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::TimeLimit => f.write_str("time limit reached"),
            AbortReason::CallLimit => f.write_str("call limit reached"),
        }
    }
}

/// Counters collected during one run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SearchStats {
    /// Recursive calls entered.
    pub calls: u64,
    /// Maximal cliques offered to the ranking.
    pub cliques_reported: u64,
    /// Offers that entered the ranking.
    pub cliques_accepted: u64,
    /// Calls cut by `|R| + |P| < bound`.
    pub pruned_by_size: u64,
    /// Branches skipped because the vertex had too few neighbors.
    pub pruned_by_degree: u64,
    /// Deepest recursion level reached.
    pub max_depth: usize,
    /// Wall-clock duration of the run.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    /// Neighbor cache counters.
    pub neighbor_cache: NeighborCacheStats,
}

/// Result of [`CliqueSearch::run`].
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    /// Counters for the run.
    pub stats: SearchStats,
    /// Set when a limit stopped the search early.
    pub aborted: Option<AbortReason>,
}

impl SearchOutcome {
    /// Whether the whole graph was explored.
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// Snapshot passed to the progress callback.
#[derive(Clone, Copy, Debug)]
pub struct SearchProgress {
    /// Top-level branches finished.
    pub processed: u64,
    /// `|P| + |X|` at the top level when the run started.
    pub total: u64,
    /// Current pruning bound.
    pub bound: usize,
    /// Size of the best clique so far.
    pub best: usize,
}

type ProgressFn<'a> = Box<dyn FnMut(SearchProgress) + 'a>;

/// Top-K maximal clique search over a sealed store.
pub struct CliqueSearch<'a, S: EdgeStore + ?Sized> {
    resolver: NeighborResolver<'a, S>,
    opts: SearchOptions,
    progress: Option<ProgressFn<'a>>,
    stats: SearchStats,
    deadline: Option<Instant>,
    r: Vec<VertexId>,
}

impl<'a, S: EdgeStore + ?Sized> CliqueSearch<'a, S> {
    /// Prepares a search; nothing is read from the store until `run`.
    pub fn new(store: &'a S, opts: SearchOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            resolver: NeighborResolver::new(store, opts.neighbor_cache_capacity),
            opts,
            progress: None,
            stats: SearchStats::default(),
            deadline: None,
            r: Vec::new(),
        })
    }

    /// Installs a callback invoked alongside each progress event.
    pub fn with_progress(mut self, callback: impl FnMut(SearchProgress) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Searches the whole vertex universe of the store.
    pub fn run(&mut self, ranking: &mut RankingBuffer) -> Result<SearchOutcome> {
        let universe = self.resolver.store().all_vertex_ids()?;
        self.run_from(universe, ranking)
    }

    /// Searches the cliques contained in `universe`.
    ///
    /// On `Err` the ranking keeps whatever was found before the failure.
    pub fn run_from(
        &mut self,
        universe: VertexSet,
        ranking: &mut RankingBuffer,
    ) -> Result<SearchOutcome> {
        let started = Instant::now();
        self.stats = SearchStats::default();
        self.deadline = self.opts.time_limit.map(|limit| started + limit);
        self.r.clear();
        debug!(
            vertices = universe.len(),
            top_k = ranking.capacity(),
            pivot = ?self.opts.pivot,
            "search.start"
        );

        let flow = self.expand(universe, VertexSet::default(), 0, ranking);
        self.stats.elapsed = started.elapsed();
        self.stats.neighbor_cache = self.resolver.stats();
        let aborted = match flow? {
            ControlFlow::Continue(()) => None,
            ControlFlow::Break(reason) => Some(reason),
        };
        info!(
            calls = self.stats.calls,
            reported = self.stats.cliques_reported,
            best = ranking.best().len(),
            bound = ranking.bound(),
            elapsed_ms = self.stats.elapsed.as_millis() as u64,
            aborted = ?aborted,
            "search.finish"
        );
        Ok(SearchOutcome {
            stats: self.stats.clone(),
            aborted,
        })
    }

    fn expand(
        &mut self,
        mut p: VertexSet,
        mut x: VertexSet,
        depth: usize,
        ranking: &mut RankingBuffer,
    ) -> Result<ControlFlow<AbortReason>> {
        self.stats.calls += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);
        if let Some(reason) = self.limit_reached() {
            return Ok(ControlFlow::Break(reason));
        }

        if self.r.len() + p.len() < ranking.bound() {
            self.stats.pruned_by_size += 1;
            return Ok(ControlFlow::Continue(()));
        }

        if p.is_empty() && x.is_empty() {
            self.report(ranking);
            return Ok(ControlFlow::Continue(()));
        }

        let branches = self.branch_candidates(&p, &x)?;
        let total = (p.len() + x.len()) as u64;
        let mut processed = 0u64;
        for v in branches {
            let neighbors = self.resolver.neighbors_of(v)?;
            if neighbors.len() >= ranking.bound() {
                let next_p = intersect(&p, &neighbors);
                let next_x = intersect(&x, &neighbors);
                self.r.push(v);
                let flow = self.expand(next_p, next_x, depth + 1, ranking);
                self.r.pop();
                if let ControlFlow::Break(reason) = flow? {
                    return Ok(ControlFlow::Break(reason));
                }
            } else {
                self.stats.pruned_by_degree += 1;
            }
            p.remove(&v);
            x.insert(v);

            if depth == 0 {
                processed += 1;
                self.maybe_progress(processed, total, ranking);
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn branch_candidates(&mut self, p: &VertexSet, x: &VertexSet) -> Result<Vec<VertexId>> {
        let Some(pivot) = self.pivot(p, x)? else {
            return Ok(p.iter().copied().collect());
        };
        let skip = self.resolver.neighbors_of(pivot)?;
        Ok(p.iter().copied().filter(|v| !skip.contains(v)).collect())
    }

    fn pivot(&mut self, p: &VertexSet, x: &VertexSet) -> Result<Option<VertexId>> {
        match self.opts.pivot {
            PivotRule::First => Ok(p.iter().chain(x.iter()).next().copied()),
            PivotRule::MaxCandidates => {
                let mut best: Option<(usize, VertexId)> = None;
                for &u in p.iter().chain(x.iter()) {
                    let neighbors = self.resolver.neighbors_of(u)?;
                    let score = if neighbors.len() <= p.len() {
                        neighbors.iter().filter(|w| p.contains(w)).count()
                    } else {
                        p.iter().filter(|w| neighbors.contains(w)).count()
                    };
                    let better = match best {
                        None => true,
                        Some((top, id)) => score > top || (score == top && u < id),
                    };
                    if better {
                        best = Some((score, u));
                    }
                }
                Ok(best.map(|(_, id)| id))
            }
        }
    }

    fn report(&mut self, ranking: &mut RankingBuffer) {
        self.stats.cliques_reported += 1;
        let clique = Clique::from_members(self.r.iter().copied());
        let size = clique.len();
        if let Some(rank) = ranking.offer(clique) {
            self.stats.cliques_accepted += 1;
            trace!(rank, size, bound = ranking.bound(), "search.clique");
        }
    }

    fn limit_reached(&self) -> Option<AbortReason> {
        if let Some(max) = self.opts.max_calls {
            if self.stats.calls > max {
                return Some(AbortReason::CallLimit);
            }
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(AbortReason::TimeLimit),
            _ => None,
        }
    }

    fn maybe_progress(&mut self, processed: u64, total: u64, ranking: &RankingBuffer) {
        let Some(interval) = self.opts.info_interval else {
            return;
        };
        if processed % interval != 0 {
            return;
        }
        let event = SearchProgress {
            processed,
            total,
            bound: ranking.bound(),
            best: ranking.best().len(),
        };
        info!(
            processed,
            total,
            bound = event.bound,
            best = event.best,
            calls = self.stats.calls,
            "search.progress"
        );
        if let Some(callback) = self.progress.as_mut() {
            callback(event);
        }
    }
}

fn intersect(set: &VertexSet, neighbors: &VertexSet) -> VertexSet {
    let (small, large) = if set.len() <= neighbors.len() {
        (set, neighbors)
    } else {
        (neighbors, set)
    };
    let mut out = FxHashSet::default();
    out.extend(small.iter().copied().filter(|v| large.contains(v)));
    out
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}
