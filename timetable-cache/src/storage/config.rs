//! Configuration for the storage gateway.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default time a connection waits on a locked database.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of idle read connections kept for reuse.
const DEFAULT_MAX_IDLE_READERS: usize = 4;

/// Where the physical store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// A SQLite database file.
    File(PathBuf),

    /// A named shared in-memory database, alive while the gateway is.
    ///
    /// Readers and the writer share one cache, so a read issued during an
    /// open write transaction fails instead of waiting. Meant for tests.
    Memory(String),
}

impl StoreLocation {
    /// The string handed to SQLite when opening a connection.
    pub(crate) fn uri(&self) -> String {
        match self {
            StoreLocation::File(path) => path.display().to_string(),
            StoreLocation::Memory(name) => format!("file:{name}?mode=memory&cache=shared"),
        }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::File(path) => write!(f, "{}", path.display()),
            StoreLocation::Memory(name) => write!(f, "memory:{name}"),
        }
    }
}

/// Configuration for a [`StorageGateway`](super::StorageGateway).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Location of the database.
    pub location: StoreLocation,

    /// How long a statement waits for a lock held by another connection.
    pub busy_timeout: Duration,

    /// Maximum number of idle read connections kept open.
    pub max_idle_readers: usize,
}

impl GatewayConfig {
    /// Create a config for a database file with default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            max_idle_readers: DEFAULT_MAX_IDLE_READERS,
        }
    }

    /// Create a config for a named shared in-memory database.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            location: StoreLocation::Memory(name.into()),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            max_idle_readers: DEFAULT_MAX_IDLE_READERS,
        }
    }

    /// Set a custom busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Set how many idle read connections are kept.
    pub fn with_max_idle_readers(mut self, max: usize) -> Self {
        self.max_idle_readers = max;
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        // Default to a database in the current directory
        Self::new("timetable_cache.db")
    }
}
