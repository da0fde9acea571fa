use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::CliqueError;
use crate::ingest::{
    DocumentReader, IngestOptions, IngestProgress, IngestStats, Ingestor, InputFormat,
    ReaderOptions,
};
use crate::report::SearchReport;
use crate::search::{CliqueSearch, RankingBuffer, SearchOptions, SearchProgress};
use crate::storage::{GraphStore, SqliteGraphStore, StoreOptions};

const SCRATCH_FILE: &str = "links.sqlite";

/// Where and how to read link documents.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Link-list file (`.csv`, `.jsonl`, optionally `.gz`).
    pub input: PathBuf,
    /// Explicit format; detected from the extension when `None`.
    pub format: Option<InputFormat>,
    /// Skip the first CSV row.
    pub has_header: bool,
    /// Ingestor tuning.
    pub ingest: IngestOptions,
    /// Store tuning.
    pub store: StoreOptions,
}

/// Configuration for `linkclique run`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Input and store settings.
    pub ingest: IngestConfig,
    /// Search settings.
    pub search: SearchOptions,
    /// Scratch store path; a fresh temporary directory when `None`.
    pub scratch: Option<PathBuf>,
    /// Keep the scratch store after the run.
    pub keep_db: bool,
}

/// Result of `linkclique ingest`.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    /// Store that was built.
    pub db_path: PathBuf,
    /// Ingestion counters.
    pub stats: IngestStats,
}

/// Result of `linkclique run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Ingestion counters.
    pub ingest: IngestStats,
    /// Search report.
    pub report: SearchReport,
    /// Store path when it was kept.
    pub kept_db: Option<PathBuf>,
}

/// Error type for pipeline operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Store, ingestion or search failure.
    #[error(transparent)]
    Clique(#[from] CliqueError),
    /// The search failed part way; `report` holds what was found until then.
    #[error("search failed: {source}")]
    SearchFailed {
        /// Partial ranking, marked incomplete.
        report: Box<SearchReport>,
        /// Underlying failure.
        source: CliqueError,
    },
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Message(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Message(value)
    }
}

/// Receives progress from long-running pipeline steps.
pub trait PipelineObserver {
    /// Called every `info_interval` documents with bytes read so far.
    fn ingest_progress(&mut self, _progress: IngestProgress, _bytes_read: u64, _total_bytes: u64) {}

    /// Called every `info_interval` top-level search branches.
    fn search_progress(&mut self, _progress: SearchProgress) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default)]
pub struct Silent;

impl PipelineObserver for Silent {}

/// Builds a new store at `db_path` from `cfg.input` and seals it.
pub fn run_ingest(
    cfg: &IngestConfig,
    db_path: &Path,
    observer: &mut dyn PipelineObserver,
) -> Result<IngestSummary, CliError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut store = SqliteGraphStore::create(db_path, cfg.store.clone())?;
    let stats = ingest_into(&mut store, cfg, observer)?;
    store.seal()?;
    Ok(IngestSummary {
        db_path: store.path().unwrap_or(db_path).to_path_buf(),
        stats,
    })
}

/// Searches an existing store.
pub fn run_search(
    db_path: &Path,
    store_opts: &StoreOptions,
    opts: &SearchOptions,
    observer: &mut dyn PipelineObserver,
) -> Result<SearchReport, CliError> {
    let mut store = SqliteGraphStore::open(db_path, store_opts.clone())?;
    store.seal()?;
    search_store(&store, opts, observer)
}

/// Ingests into a scratch store, searches it and removes it unless kept.
pub fn run(cfg: &RunConfig, observer: &mut dyn PipelineObserver) -> Result<RunSummary, CliError> {
    let scratch = ScratchStore::prepare(cfg.scratch.as_deref(), cfg.keep_db)?;
    let (ingest, report) = {
        let mut store = SqliteGraphStore::create(scratch.path(), cfg.ingest.store.clone())?;
        let ingest = ingest_into(&mut store, &cfg.ingest, observer)?;
        store.seal()?;
        let report = search_store(&store, &cfg.search, observer)?;
        (ingest, report)
    };
    Ok(RunSummary {
        ingest,
        report,
        kept_db: scratch.keep(),
    })
}

/// Feeds `cfg.input` into any writable store.
pub fn ingest_into<S>(
    store: &mut S,
    cfg: &IngestConfig,
    observer: &mut dyn PipelineObserver,
) -> Result<IngestStats, CliError>
where
    S: GraphStore + ?Sized,
{
    let format = match cfg.format {
        Some(format) => format,
        None => InputFormat::detect(&cfg.input).ok_or_else(|| {
            CliError::Message(format!(
                "cannot detect input format of {} (use --input-format)",
                cfg.input.display()
            ))
        })?,
    };
    let total_bytes = fs::metadata(&cfg.input)?.len();
    let reader = DocumentReader::open(
        &cfg.input,
        ReaderOptions {
            format,
            has_header: cfg.has_header,
        },
    )?;
    let counter = reader.byte_counter();
    info!(input = %cfg.input.display(), ?format, total_bytes, "ingest.start");

    let mut ingestor = Ingestor::new(store, cfg.ingest.clone())?.with_progress(|progress| {
        observer.ingest_progress(progress, counter.get(), total_bytes)
    });
    ingestor.ingest_all(reader)?;
    Ok(ingestor.finish()?)
}

/// Searches a sealed store and resolves the ranking to labels.
///
/// A storage failure part way through yields [`CliError::SearchFailed`]
/// carrying the partial, incomplete report.
pub fn search_store<S>(
    store: &S,
    opts: &SearchOptions,
    observer: &mut dyn PipelineObserver,
) -> Result<SearchReport, CliError>
where
    S: GraphStore + ?Sized,
{
    if !store.is_sealed() {
        warn!("searching a store that was not sealed");
    }
    let mut ranking = RankingBuffer::new(opts.top_k)?;
    let outcome = CliqueSearch::new(store, opts.clone())?
        .with_progress(|progress| observer.search_progress(progress))
        .run(&mut ranking);
    match outcome {
        Ok(outcome) => Ok(SearchReport::build(store, &ranking, Some(&outcome))?),
        Err(source) => {
            let report = SearchReport::build(store, &ranking, None)?;
            Err(CliError::SearchFailed {
                report: Box::new(report),
                source,
            })
        }
    }
}

/// Scratch database location, removed on drop unless kept.
struct ScratchStore {
    path: PathBuf,
    dir: Option<TempDir>,
    keep: bool,
}

impl ScratchStore {
    fn prepare(explicit: Option<&Path>, keep: bool) -> Result<Self, CliError> {
        match explicit {
            Some(path) => {
                if path.exists() {
                    return Err(CliqueError::StoreExists(path.to_path_buf()).into());
                }
                Ok(Self {
                    path: path.to_path_buf(),
                    dir: None,
                    keep,
                })
            }
            None => {
                let dir = tempfile::Builder::new().prefix("linkclique-").tempdir()?;
                Ok(Self {
                    path: dir.path().join(SCRATCH_FILE),
                    dir: Some(dir),
                    keep,
                })
            }
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn keep(&self) -> Option<PathBuf> {
        self.keep.then(|| self.path.clone())
    }
}

impl Drop for ScratchStore {
    fn drop(&mut self) {
        if self.keep {
            if let Some(dir) = self.dir.take() {
                let _ = dir.keep();
            }
            return;
        }
        if self.dir.is_none() && self.path.exists() {
            if let Err(err) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %err, "scratch.cleanup.failed");
            }
        }
    }
}
