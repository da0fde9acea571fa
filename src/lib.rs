//! Top-K maximal clique search over large directed-link graphs.
//!
//! Links are ingested into an out-of-core [`storage::GraphStore`] (SQLite by
//! default), the store is sealed, and [`search::CliqueSearch`] then walks the
//! mutual-link relation with a bounded Bron–Kerbosch search that keeps only
//! the K largest maximal cliques.

#![warn(missing_docs)]

pub mod cli;
pub mod error;
pub mod generator;
pub mod ingest;
pub mod report;
pub mod search;
pub mod storage;
pub mod types;

pub use error::{CliqueError, Result};
pub use ingest::{DocumentReader, IngestOptions, IngestStats, Ingestor, InputFormat, LinkDocument};
pub use report::{CliqueReport, SearchReport};
pub use search::{
    AbortReason, CliqueSearch, PivotRule, RankingBuffer, SearchOptions, SearchOutcome, SearchStats,
};
pub use storage::{
    EdgeStore, GraphStore, MemoryGraphStore, SqliteGraphStore, StoreOptions, VertexCatalog,
};
pub use types::{Clique, VertexId, VertexSet};
