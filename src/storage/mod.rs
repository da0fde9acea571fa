//! Out-of-core graph storage.
//!
//! The store is split along the two contracts the search relies on: a
//! [`VertexCatalog`] that maps opaque labels to dense [`VertexId`]s and an
//! [`EdgeStore`] that persists the directed link relation and answers
//! per-endpoint range queries. [`GraphStore`] ties both together with the
//! ingestion/search phase lifecycle.

use crate::error::Result;
use crate::types::{VertexId, VertexSet};

mod memory;
mod options;
mod sqlite;

#[cfg(test)]
mod tests;

pub use memory::MemoryGraphStore;
pub use options::{JournalMode, StoreOptions, Synchronous};
pub use sqlite::SqliteGraphStore;

/// Label to identifier mapping.
pub trait VertexCatalog {
    /// Returns the id for `label`, assigning a fresh one on first sight.
    fn intern(&mut self, label: &str) -> Result<VertexId>;

    /// Looks up the id for `label` without mutating the catalog.
    fn lookup(&self, label: &str) -> Result<Option<VertexId>>;

    /// Returns the label interned under `id`.
    ///
    /// Fails with [`crate::CliqueError::VertexNotFound`] for ids that were
    /// never handed out.
    fn resolve(&self, id: VertexId) -> Result<String>;

    /// Number of interned labels.
    fn vertex_count(&self) -> Result<u64>;
}

/// Directed edge relation keyed by both endpoints.
pub trait EdgeStore {
    /// Records the directed edge `from -> to`.
    fn insert_edge(&mut self, from: VertexId, to: VertexId) -> Result<()>;

    /// Records a batch of directed edges.
    fn insert_edges(&mut self, edges: &[(VertexId, VertexId)]) -> Result<()> {
        for &(from, to) in edges {
            self.insert_edge(from, to)?;
        }
        Ok(())
    }

    /// Targets of edges leaving `id`.
    fn outgoing(&self, id: VertexId) -> Result<VertexSet>;

    /// Sources of edges arriving at `id`.
    fn incoming(&self, id: VertexId) -> Result<VertexSet>;

    /// Every vertex id in the store, used once to seed the search universe.
    fn all_vertex_ids(&self) -> Result<VertexSet>;

    /// Number of stored edge rows, duplicates included.
    fn edge_count(&self) -> Result<u64>;
}

/// Phase lifecycle shared by all backends.
///
/// A store is writable until [`GraphStore::seal`] is called. After that every
/// write fails with [`crate::CliqueError::Sealed`]; the neighbor cache used by
/// the search has no invalidation path and relies on this.
pub trait GraphStore: VertexCatalog + EdgeStore {
    /// Starts grouping writes into one batch.
    fn begin_bulk(&mut self) -> Result<()> {
        Ok(())
    }

    /// Makes writes since [`GraphStore::begin_bulk`] durable.
    fn commit_bulk(&mut self) -> Result<()> {
        Ok(())
    }

    /// Ends the ingestion phase.
    fn seal(&mut self) -> Result<()>;

    /// Whether [`GraphStore::seal`] has been called.
    fn is_sealed(&self) -> bool;
}
