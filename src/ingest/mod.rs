//! Ingestion boundary: link documents in, interned vertices and edges out.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use crate::error::{CliqueError, Result};
use crate::storage::GraphStore;
use crate::types::VertexId;

mod reader;

pub use reader::{ByteCounter, DocumentReader, InputFormat, ReaderOptions};

/// A source label together with every label it links to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDocument {
    /// Label of the linking vertex.
    pub source: String,
    /// Labels linked from `source`; may be empty.
    #[serde(default)]
    pub targets: BTreeSet<String>,
}

impl LinkDocument {
    /// Builds a document from borrowed labels.
    pub fn new<'t>(source: &str, targets: impl IntoIterator<Item = &'t str>) -> Self {
        Self {
            source: source.to_owned(),
            targets: targets.into_iter().map(str::to_owned).collect(),
        }
    }
}

/// Tuning knobs for [`Ingestor`].
#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// Label → id cache entries; zero disables the cache.
    pub intern_cache_capacity: usize,
    /// Documents per committed batch.
    pub batch_documents: usize,
    /// Emit a progress event every this many documents.
    pub info_interval: Option<u64>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            intern_cache_capacity: 1 << 20,
            batch_documents: 10_000,
            info_interval: Some(5_000),
        }
    }
}

/// Summary returned by [`Ingestor::finish`].
#[derive(Clone, Debug, Default, Serialize)]
pub struct IngestStats {
    /// Documents consumed.
    pub documents: u64,
    /// Distinct vertices in the store afterwards.
    pub vertices: u64,
    /// Edges handed to the store.
    pub edges_inserted: u64,
    /// Label lookups answered by the cache.
    pub cache_hits: u64,
    /// Label lookups that went to the store.
    pub cache_misses: u64,
    /// Wall-clock time spent ingesting.
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

/// Snapshot passed to the ingestion progress callback.
#[derive(Clone, Copy, Debug)]
pub struct IngestProgress {
    /// Documents consumed so far.
    pub documents: u64,
    /// Edges inserted so far.
    pub edges: u64,
}

type ProgressFn<'a> = Box<dyn FnMut(IngestProgress) + 'a>;

/// Feeds documents into a writable store.
///
/// Writes are grouped into bulk batches of `batch_documents` documents.
/// Dropping the ingestor without calling [`Ingestor::finish`] leaves the last
/// batch uncommitted.
pub struct Ingestor<'a, S: GraphStore + ?Sized> {
    store: &'a mut S,
    cache: Option<LruCache<String, VertexId>>,
    opts: IngestOptions,
    stats: IngestStats,
    in_batch: usize,
    batch_open: bool,
    edges: Vec<(VertexId, VertexId)>,
    started: Instant,
    progress: Option<ProgressFn<'a>>,
}

impl<'a, S: GraphStore + ?Sized> Ingestor<'a, S> {
    /// Wraps `store` for ingestion.
    pub fn new(store: &'a mut S, opts: IngestOptions) -> Result<Self> {
        if opts.batch_documents == 0 {
            return Err(CliqueError::InvalidArgument(
                "batch_documents must be at least 1".into(),
            ));
        }
        if opts.info_interval == Some(0) {
            return Err(CliqueError::InvalidArgument(
                "info_interval must be positive".into(),
            ));
        }
        if store.is_sealed() {
            return Err(CliqueError::Sealed);
        }
        Ok(Self {
            store,
            cache: NonZeroUsize::new(opts.intern_cache_capacity).map(LruCache::new),
            opts,
            stats: IngestStats::default(),
            in_batch: 0,
            batch_open: false,
            edges: Vec::new(),
            started: Instant::now(),
            progress: None,
        })
    }

    /// Installs a callback invoked alongside each progress event.
    pub fn with_progress(mut self, callback: impl FnMut(IngestProgress) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Interns the document's labels and stores its `source → target` edges.
    pub fn ingest(&mut self, doc: &LinkDocument) -> Result<()> {
        if doc.source.is_empty() {
            return Err(CliqueError::input(
                self.stats.documents + 1,
                "empty source label",
            ));
        }
        if !self.batch_open {
            self.store.begin_bulk()?;
            self.batch_open = true;
        }

        let source = self.intern(&doc.source)?;
        self.edges.clear();
        for target in &doc.targets {
            let target = self.intern(target)?;
            self.edges.push((source, target));
        }
        self.store.insert_edges(&self.edges)?;
        self.stats.edges_inserted += self.edges.len() as u64;
        self.stats.documents += 1;
        self.in_batch += 1;

        if self.in_batch >= self.opts.batch_documents {
            self.commit()?;
        }
        if let Some(interval) = self.opts.info_interval {
            if self.stats.documents % interval == 0 {
                self.emit_progress();
            }
        }
        Ok(())
    }

    /// Ingests every document of `docs`, stopping at the first error.
    pub fn ingest_all<I>(&mut self, docs: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<LinkDocument>>,
    {
        for doc in docs {
            self.ingest(&doc?)?;
        }
        Ok(())
    }

    /// Counters so far.
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Commits the open batch and returns the final counters.
    pub fn finish(mut self) -> Result<IngestStats> {
        self.commit()?;
        self.stats.vertices = self.store.vertex_count()?;
        self.stats.elapsed = self.started.elapsed();
        info!(
            documents = self.stats.documents,
            vertices = self.stats.vertices,
            edges = self.stats.edges_inserted,
            elapsed_ms = self.stats.elapsed.as_millis() as u64,
            "ingest.finish"
        );
        Ok(self.stats)
    }

    fn intern(&mut self, label: &str) -> Result<VertexId> {
        if let Some(cache) = self.cache.as_mut() {
            if let Some(&id) = cache.get(label) {
                self.stats.cache_hits += 1;
                return Ok(id);
            }
        }
        self.stats.cache_misses += 1;
        let id = self.store.intern(label)?;
        if let Some(cache) = self.cache.as_mut() {
            cache.put(label.to_owned(), id);
        }
        Ok(id)
    }

    fn commit(&mut self) -> Result<()> {
        if self.batch_open {
            self.store.commit_bulk()?;
            self.batch_open = false;
            trace!(documents = self.in_batch, "ingest.commit");
            self.in_batch = 0;
        }
        Ok(())
    }

    fn emit_progress(&mut self) {
        let event = IngestProgress {
            documents: self.stats.documents,
            edges: self.stats.edges_inserted,
        };
        info!(
            documents = event.documents,
            edges = event.edges,
            cache_hits = self.stats.cache_hits,
            "ingest.progress"
        );
        if let Some(callback) = self.progress.as_mut() {
            callback(event);
        }
    }
}

fn serialize_millis<S: serde::Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}
