use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, trace, warn};

use crate::error::{CliqueError, Result};
use crate::types::{VertexId, VertexSet};

use super::{EdgeStore, GraphStore, StoreOptions, VertexCatalog};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vertices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS edges (
    from_id INTEGER NOT NULL REFERENCES vertices (id),
    to_id INTEGER NOT NULL REFERENCES vertices (id)
);";

const EDGE_INDEXES: &str = "
CREATE INDEX IF NOT EXISTS idx_edges_from ON edges (from_id);
CREATE INDEX IF NOT EXISTS idx_edges_to ON edges (to_id);";

const PAIR_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_edges_pair ON edges (from_id, to_id);";

const INSERT_EDGE: &str = "INSERT INTO edges (from_id, to_id) VALUES (?1, ?2)";
const INSERT_EDGE_DEDUP: &str = "INSERT OR IGNORE INTO edges (from_id, to_id) VALUES (?1, ?2)";

/// Graph store persisted in a SQLite database.
///
/// Labels live in `vertices` (the `UNIQUE` constraint deduplicates them and
/// `AUTOINCREMENT` guarantees ids are never reused), links in `edges` with
/// one index per endpoint so both directional queries are index range scans.
pub struct SqliteGraphStore {
    conn: Connection,
    path: Option<PathBuf>,
    opts: StoreOptions,
    in_bulk: bool,
    sealed: bool,
}

impl SqliteGraphStore {
    /// Creates a fresh store at `path`, refusing to touch an existing file.
    pub fn create(path: impl AsRef<Path>, opts: StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(CliqueError::StoreExists(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        let store = Self::init(conn, Some(path.to_path_buf()), opts)?;
        info!(path = %path.display(), "store.sqlite.create");
        Ok(store)
    }

    /// Opens a store previously built by [`SqliteGraphStore::create`].
    pub fn open(path: impl AsRef<Path>, opts: StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CliqueError::MissingStore(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        apply_pragmas(&conn, &opts)?;
        let tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('vertices', 'edges')",
            [],
            |row| row.get(0),
        )?;
        if tables != 2 {
            return Err(CliqueError::Corruption("graph schema missing"));
        }
        let mut opts = opts;
        if opts.dedup_edges && !has_index(&conn, "idx_edges_pair")? {
            warn!(path = %path.display(), "store.sqlite.open.dedup_unavailable");
            opts.dedup_edges = false;
        }
        if !opts.defer_indexes {
            conn.execute_batch(EDGE_INDEXES)?;
        }
        info!(path = %path.display(), dedup = opts.dedup_edges, "store.sqlite.open");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            opts,
            in_bulk: false,
            sealed: false,
        })
    }

    /// Creates a store that lives only as long as this value.
    pub fn in_memory(opts: StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None, opts)
    }

    /// Backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init(conn: Connection, path: Option<PathBuf>, opts: StoreOptions) -> Result<Self> {
        apply_pragmas(&conn, &opts)?;
        conn.execute_batch(SCHEMA)?;
        if opts.dedup_edges {
            conn.execute_batch(PAIR_INDEX)?;
        }
        if !opts.defer_indexes {
            conn.execute_batch(EDGE_INDEXES)?;
        }
        Ok(Self {
            conn,
            path,
            opts,
            in_bulk: false,
            sealed: false,
        })
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.sealed {
            return Err(CliqueError::Sealed);
        }
        Ok(())
    }

    fn insert_sql(&self) -> &'static str {
        if self.opts.dedup_edges {
            INSERT_EDGE_DEDUP
        } else {
            INSERT_EDGE
        }
    }

    fn query_ids(&self, sql: &str, id: VertexId) -> Result<VertexSet> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![id.to_sql()], |row| row.get::<_, i64>(0))?;
        let mut ids = VertexSet::default();
        for row in rows {
            ids.insert(VertexId::from_sql(row?));
        }
        Ok(ids)
    }

    fn count(&self, sql: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn apply_pragmas(conn: &Connection, opts: &StoreOptions) -> Result<()> {
    conn.pragma_update(None, "synchronous", opts.synchronous.pragma_value())?;
    let mode: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        opts.journal_mode.pragma_value(),
        |row| row.get(0),
    )?;
    conn.pragma_update(None, "cache_size", -i64::from(opts.cache_size_kib))?;
    conn.pragma_update(None, "foreign_keys", true)?;
    debug!(journal_mode = %mode, synchronous = opts.synchronous.pragma_value(), "store.sqlite.pragmas");
    Ok(())
}

fn has_index(conn: &Connection, name: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1",
            params![name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert_rows(conn: &Connection, sql: &str, edges: &[(VertexId, VertexId)]) -> Result<()> {
    let mut stmt = conn.prepare_cached(sql)?;
    for &(from, to) in edges {
        stmt.execute(params![from.to_sql(), to.to_sql()])?;
    }
    Ok(())
}

impl VertexCatalog for SqliteGraphStore {
    fn intern(&mut self, label: &str) -> Result<VertexId> {
        if let Some(existing) = self.lookup(label)? {
            trace!(id = existing.0, "store.sqlite.intern.hit");
            return Ok(existing);
        }
        self.ensure_writable()?;
        self.conn
            .prepare_cached("INSERT INTO vertices (label) VALUES (?1)")?
            .execute(params![label])?;
        let id = VertexId::from_sql(self.conn.last_insert_rowid());
        trace!(id = id.0, len = label.len(), "store.sqlite.intern.insert");
        Ok(id)
    }

    fn lookup(&self, label: &str) -> Result<Option<VertexId>> {
        let raw = self
            .conn
            .prepare_cached("SELECT id FROM vertices WHERE label = ?1")?
            .query_row(params![label], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(raw.map(VertexId::from_sql))
    }

    fn resolve(&self, id: VertexId) -> Result<String> {
        self.conn
            .prepare_cached("SELECT label FROM vertices WHERE id = ?1")?
            .query_row(params![id.to_sql()], |row| row.get::<_, String>(0))
            .optional()?
            .ok_or(CliqueError::VertexNotFound(id))
    }

    fn vertex_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM vertices")
    }
}

impl EdgeStore for SqliteGraphStore {
    fn insert_edge(&mut self, from: VertexId, to: VertexId) -> Result<()> {
        self.ensure_writable()?;
        self.conn
            .prepare_cached(self.insert_sql())?
            .execute(params![from.to_sql(), to.to_sql()])?;
        Ok(())
    }

    fn insert_edges(&mut self, edges: &[(VertexId, VertexId)]) -> Result<()> {
        self.ensure_writable()?;
        let sql = self.insert_sql();
        if self.in_bulk {
            return insert_rows(&self.conn, sql, edges);
        }
        let tx = self.conn.transaction()?;
        insert_rows(&tx, sql, edges)?;
        tx.commit()?;
        Ok(())
    }

    fn outgoing(&self, id: VertexId) -> Result<VertexSet> {
        self.query_ids("SELECT to_id FROM edges WHERE from_id = ?1", id)
    }

    fn incoming(&self, id: VertexId) -> Result<VertexSet> {
        self.query_ids("SELECT from_id FROM edges WHERE to_id = ?1", id)
    }

    fn all_vertex_ids(&self) -> Result<VertexSet> {
        let mut stmt = self.conn.prepare("SELECT id FROM vertices")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        let mut ids = VertexSet::default();
        for row in rows {
            ids.insert(VertexId::from_sql(row?));
        }
        Ok(ids)
    }

    fn edge_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM edges")
    }
}

impl GraphStore for SqliteGraphStore {
    fn begin_bulk(&mut self) -> Result<()> {
        self.ensure_writable()?;
        if !self.in_bulk {
            self.conn.execute_batch("BEGIN")?;
            self.in_bulk = true;
        }
        Ok(())
    }

    fn commit_bulk(&mut self) -> Result<()> {
        if self.in_bulk {
            self.conn.execute_batch("COMMIT")?;
            self.in_bulk = false;
        }
        Ok(())
    }

    fn seal(&mut self) -> Result<()> {
        if self.sealed {
            return Ok(());
        }
        self.commit_bulk()?;
        self.conn.execute_batch(EDGE_INDEXES)?;
        self.conn.pragma_update(None, "query_only", true)?;
        self.sealed = true;
        info!(
            vertices = self.vertex_count()?,
            edges = self.edge_count()?,
            "store.sqlite.sealed"
        );
        Ok(())
    }

    fn is_sealed(&self) -> bool {
        self.sealed
    }
}
