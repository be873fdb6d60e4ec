//! Shared handle to the physical timetable store.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info};

use super::config::{GatewayConfig, StoreLocation};
use super::error::StorageError;
use super::schema::{self, SchemaVersion, TABLE_NAME};

/// Owner of one physical SQLite store.
///
/// Cloning is cheap and every clone refers to the same database: create one
/// gateway per cache location at startup and hand clones to each
/// [`TimetableCache`](crate::cache::TimetableCache).
///
/// All writes go through a single writer connection behind a mutex. Reads use
/// separate pooled connections, so readers don't wait for each other or,
/// for file stores in WAL mode, for the writer.
#[derive(Debug, Clone)]
pub struct StorageGateway {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: GatewayConfig,
    writer: Mutex<Connection>,
    idle_readers: Mutex<Vec<Connection>>,
    /// Highest schema version already ensured through this gateway.
    ensured: Mutex<Option<SchemaVersion>>,
}

impl StorageGateway {
    /// Open the store described by `config`.
    ///
    /// Creates parent directories of a database file if they don't exist.
    /// No table is created until [`open`](Self::open) is called.
    pub fn connect(config: GatewayConfig) -> Result<Self, StorageError> {
        if let StoreLocation::File(path) = &config.location
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Unavailable {
                location: config.location.to_string(),
                message: format!("failed to create cache directory: {}", e),
            })?;
        }

        let writer = open_connection(&config).map_err(|e| StorageError::Unavailable {
            location: config.location.to_string(),
            message: e.to_string(),
        })?;

        if let StoreLocation::File(_) = &config.location {
            writer
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })
                .map_err(|e| StorageError::Unavailable {
                    location: config.location.to_string(),
                    message: format!("failed to enable WAL: {}", e),
                })?;
        }

        info!(location = %config.location, "connected timetable store");

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                writer: Mutex::new(writer),
                idle_readers: Mutex::new(Vec::new()),
                ensured: Mutex::new(None),
            }),
        })
    }

    /// Make sure the physical table can serve `version`, and return a handle.
    ///
    /// Idempotent, and safe to call from many threads at once: the first call
    /// for a version creates or migrates the table, later calls return at once.
    /// The returned handle shares the same physical store as `self`.
    pub fn open(&self, version: SchemaVersion) -> Result<Self, StorageError> {
        let mut ensured = self
            .inner
            .ensured
            .lock()
            .map_err(|_| StorageError::Poisoned)?;

        if ensured.is_some_and(|v| v >= version) {
            return Ok(self.clone());
        }

        let physical = {
            let mut writer = self.writable_handle()?;
            schema::ensure_schema(&mut writer, version)?
        };
        debug!(requested = %version, %physical, "timetable schema ready");
        *ensured = Some(physical);

        Ok(self.clone())
    }

    /// A connection for queries.
    ///
    /// Taken from the idle pool if one is available, otherwise newly opened.
    /// It returns to the pool when the handle is dropped.
    pub fn readable_handle(&self) -> Result<ReadHandle<'_>, StorageError> {
        let pooled = self
            .inner
            .idle_readers
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .pop();

        let conn = match pooled {
            Some(conn) => conn,
            None => {
                let conn = open_connection(&self.inner.config)?;
                conn.pragma_update(None, "query_only", true)?;
                conn
            }
        };

        Ok(ReadHandle {
            conn: Some(conn),
            inner: &self.inner,
        })
    }

    /// Exclusive access to the writer connection.
    ///
    /// Blocks while another thread holds it.
    pub fn writable_handle(&self) -> Result<WriteHandle<'_>, StorageError> {
        let guard = self
            .inner
            .writer
            .lock()
            .map_err(|_| StorageError::Poisoned)?;
        Ok(WriteHandle { guard })
    }

    /// Ordered column names for `version`.
    pub fn column_list(version: SchemaVersion) -> &'static [&'static str] {
        schema::column_list(version)
    }

    /// The schema version the physical table currently has.
    pub fn schema_version(&self) -> Result<Option<SchemaVersion>, StorageError> {
        let conn = self.readable_handle()?;
        schema::stored_version(&conn)
    }

    /// Number of timetable rows stored, for monitoring.
    pub fn row_count(&self) -> Result<u64, StorageError> {
        let conn = self.readable_handle()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE_NAME}"), [], |row| {
                row.get(0)
            })?;
        Ok(count.max(0) as u64)
    }

    /// The configuration this gateway was opened with.
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same physical store.
    pub fn same_store(&self, other: &StorageGateway) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn open_connection(config: &GatewayConfig) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(config.location.uri())?;
    conn.busy_timeout(config.busy_timeout)?;
    Ok(conn)
}

/// A pooled read connection. Dereferences to [`Connection`].
pub struct ReadHandle<'a> {
    conn: Option<Connection>,
    inner: &'a Inner,
}

impl Deref for ReadHandle<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `drop` takes the connection out
        self.conn.as_ref().unwrap()
    }
}

impl Drop for ReadHandle<'_> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if let Ok(mut idle) = self.inner.idle_readers.lock()
            && idle.len() < self.inner.config.max_idle_readers
        {
            idle.push(conn);
        }
    }
}

/// Exclusive access to the writer connection. Dereferences to [`Connection`].
pub struct WriteHandle<'a> {
    guard: MutexGuard<'a, Connection>,
}

impl Deref for WriteHandle<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.guard
    }
}

impl DerefMut for WriteHandle<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn open_creates_table_on_first_use() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::connect(GatewayConfig::new(dir.path().join("t.db"))).unwrap();
        assert_eq!(gateway.schema_version().unwrap(), None);

        gateway.open(SchemaVersion::V2).unwrap();
        assert_eq!(gateway.schema_version().unwrap(), Some(SchemaVersion::V2));
        assert_eq!(gateway.row_count().unwrap(), 0);
    }

    #[test]
    fn open_is_idempotent_and_shares_store() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::connect(GatewayConfig::new(dir.path().join("t.db"))).unwrap();

        let a = gateway.open(SchemaVersion::V1).unwrap();
        let b = gateway.open(SchemaVersion::V1).unwrap();
        assert!(a.same_store(&b));
        assert!(a.same_store(&gateway));
        assert_eq!(gateway.schema_version().unwrap(), Some(SchemaVersion::V1));
    }

    #[test]
    fn concurrent_open_migrates_once() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::connect(GatewayConfig::new(dir.path().join("t.db"))).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let gateway = gateway.clone();
                let version = if i % 2 == 0 {
                    SchemaVersion::V1
                } else {
                    SchemaVersion::V2
                };
                thread::spawn(move || gateway.open(version).map(|g| g.same_store(&gateway)))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().unwrap());
        }
        assert_eq!(gateway.schema_version().unwrap(), Some(SchemaVersion::V2));
    }

    #[test]
    fn schema_persists_across_gateways() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.db");

        {
            let gateway = StorageGateway::connect(GatewayConfig::new(&path)).unwrap();
            gateway.open(SchemaVersion::V1).unwrap();
        }

        let gateway = StorageGateway::connect(GatewayConfig::new(&path)).unwrap();
        assert_eq!(gateway.schema_version().unwrap(), Some(SchemaVersion::V1));
        gateway.open(SchemaVersion::V2).unwrap();
        assert_eq!(gateway.schema_version().unwrap(), Some(SchemaVersion::V2));
    }

    #[test]
    fn readers_return_to_pool() {
        let gateway = StorageGateway::connect(
            GatewayConfig::in_memory("gateway_pool").with_max_idle_readers(1),
        )
        .unwrap();

        {
            let _a = gateway.readable_handle().unwrap();
            let _b = gateway.readable_handle().unwrap();
        }
        assert_eq!(gateway.inner.idle_readers.lock().unwrap().len(), 1);
    }

    #[test]
    fn read_handles_are_query_only() {
        let gateway = StorageGateway::connect(GatewayConfig::in_memory("gateway_ro")).unwrap();
        gateway.open(SchemaVersion::V1).unwrap();

        let reader = gateway.readable_handle().unwrap();
        assert!(reader.execute("DELETE FROM timetable", []).is_err());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("t.db");
        StorageGateway::connect(GatewayConfig::new(&path)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unreachable_location_is_unavailable() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();

        let err = StorageGateway::connect(GatewayConfig::new(file.join("t.db"))).unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }
}
