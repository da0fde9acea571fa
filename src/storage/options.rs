/// SQLite `synchronous` pragma.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Synchronous {
    /// Sync on every commit.
    Full,
    /// Sync at critical moments only.
    Normal,
    /// Never sync; the store is scratch space that is rebuilt on failure.
    #[default]
    Off,
}

impl Synchronous {
    pub(crate) fn pragma_value(self) -> &'static str {
        match self {
            Synchronous::Full => "FULL",
            Synchronous::Normal => "NORMAL",
            Synchronous::Off => "OFF",
        }
    }
}

/// SQLite `journal_mode` pragma.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JournalMode {
    /// Write-ahead log.
    Wal,
    /// Rollback journal kept in memory.
    #[default]
    Memory,
    /// No journal.
    Off,
}

impl JournalMode {
    pub(crate) fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
            JournalMode::Off => "OFF",
        }
    }
}

/// Configuration options supplied when creating or opening a graph store.
#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Durability level for commits.
    pub synchronous: Synchronous,
    /// Journal strategy.
    pub journal_mode: JournalMode,
    /// SQLite page cache budget in KiB.
    pub cache_size_kib: u32,
    /// Ignore edges that are already stored instead of storing them again.
    pub dedup_edges: bool,
    /// Build the edge endpoint indexes at seal time instead of at creation.
    pub defer_indexes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            synchronous: Synchronous::Off,
            journal_mode: JournalMode::Memory,
            cache_size_kib: 64 * 1024,
            dedup_edges: false,
            defer_indexes: false,
        }
    }
}

impl StoreOptions {
    /// Options for a store that should survive a crash.
    pub fn durable() -> Self {
        Self {
            synchronous: Synchronous::Full,
            journal_mode: JournalMode::Wal,
            ..Self::default()
        }
    }

    /// Sets [`StoreOptions::dedup_edges`].
    pub fn dedup_edges(mut self, enabled: bool) -> Self {
        self.dedup_edges = enabled;
        self
    }

    /// Sets [`StoreOptions::defer_indexes`].
    pub fn defer_indexes(mut self, enabled: bool) -> Self {
        self.defer_indexes = enabled;
        self
    }
}
