use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{CliqueError, Result};
use crate::types::{VertexId, VertexSet};

use super::{EdgeStore, GraphStore, StoreOptions, VertexCatalog};

/// Heap-resident graph store.
///
/// Mirrors [`super::SqliteGraphStore`] semantics (ids start at 1 and are
/// never reused, edges keep their multiplicity unless deduplication is
/// enabled) for graphs that fit in memory and for tests.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    ids: FxHashMap<String, VertexId>,
    labels: Vec<String>,
    outgoing: FxHashMap<VertexId, Vec<VertexId>>,
    incoming: FxHashMap<VertexId, Vec<VertexId>>,
    edges: u64,
    dedup_edges: bool,
    sealed: bool,
}

impl MemoryGraphStore {
    /// Creates an empty store with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store honouring the backend-neutral parts of `opts`.
    pub fn with_options(opts: &StoreOptions) -> Self {
        Self {
            dedup_edges: opts.dedup_edges,
            ..Self::default()
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.sealed {
            return Err(CliqueError::Sealed);
        }
        Ok(())
    }

    fn ensure_known(&self, id: VertexId) -> Result<()> {
        if id.0 == 0 || id.0 > self.labels.len() as u64 {
            return Err(CliqueError::VertexNotFound(id));
        }
        Ok(())
    }
}

impl VertexCatalog for MemoryGraphStore {
    fn intern(&mut self, label: &str) -> Result<VertexId> {
        if let Some(&existing) = self.ids.get(label) {
            return Ok(existing);
        }
        self.ensure_writable()?;
        self.labels.push(label.to_owned());
        let id = VertexId(self.labels.len() as u64);
        self.ids.insert(label.to_owned(), id);
        trace!(id = id.0, "store.memory.intern.insert");
        Ok(id)
    }

    fn lookup(&self, label: &str) -> Result<Option<VertexId>> {
        Ok(self.ids.get(label).copied())
    }

    fn resolve(&self, id: VertexId) -> Result<String> {
        self.ensure_known(id)?;
        Ok(self.labels[(id.0 - 1) as usize].clone())
    }

    fn vertex_count(&self) -> Result<u64> {
        Ok(self.labels.len() as u64)
    }
}

impl EdgeStore for MemoryGraphStore {
    fn insert_edge(&mut self, from: VertexId, to: VertexId) -> Result<()> {
        self.ensure_writable()?;
        self.ensure_known(from)?;
        self.ensure_known(to)?;
        let targets = self.outgoing.entry(from).or_default();
        if self.dedup_edges && targets.contains(&to) {
            return Ok(());
        }
        targets.push(to);
        self.incoming.entry(to).or_default().push(from);
        self.edges += 1;
        Ok(())
    }

    fn outgoing(&self, id: VertexId) -> Result<VertexSet> {
        Ok(self
            .outgoing
            .get(&id)
            .map(|targets| targets.iter().copied().collect())
            .unwrap_or_default())
    }

    fn incoming(&self, id: VertexId) -> Result<VertexSet> {
        Ok(self
            .incoming
            .get(&id)
            .map(|sources| sources.iter().copied().collect())
            .unwrap_or_default())
    }

    fn all_vertex_ids(&self) -> Result<VertexSet> {
        Ok((1..=self.labels.len() as u64).map(VertexId).collect())
    }

    fn edge_count(&self) -> Result<u64> {
        Ok(self.edges)
    }
}

impl GraphStore for MemoryGraphStore {
    fn seal(&mut self) -> Result<()> {
        self.sealed = true;
        Ok(())
    }

    fn is_sealed(&self) -> bool {
        self.sealed
    }
}
