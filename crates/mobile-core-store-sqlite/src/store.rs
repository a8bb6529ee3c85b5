// crates/mobile-core-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Object Store
// Description: Durable ObjectStore backed by SQLite WAL.
// Purpose: Persist named records with labels and optimistic versions.
// Dependencies: mobile-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Records are stored as JSON blobs keyed by `(kind, name)`. Resource versions
//! come from a single database-wide counter, so a record that is deleted and
//! recreated never reuses a version a stale writer might still hold. Every
//! write runs in an immediate transaction that re-checks the stored version.
//! Database contents are untrusted: payloads are size-checked and decoded
//! fail-closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::marker::PhantomData;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use mobile_core::LabelSelector;
use mobile_core::ObjectStore;
use mobile_core::StoreError;
use mobile_core::StoredRecord;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized record size accepted by the store.
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` object store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Record payload exceeded the size limit.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
    /// Record does not exist.
    #[error("sqlite store record not found: {0}")]
    NotFound(String),
    /// Record already exists.
    #[error("sqlite store record already exists: {0}")]
    AlreadyExists(String),
    /// Write carried a stale resource version.
    #[error("sqlite store version conflict: {0}")]
    Conflict(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Store(message)
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "record exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
            SqliteStoreError::NotFound(name) => Self::NotFound(name),
            SqliteStoreError::AlreadyExists(name) => Self::AlreadyExists(name),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
        }
    }
}

/// Maps a rusqlite error into a store error.
#[allow(clippy::needless_pass_by_value, reason = "Used directly as a map_err adapter.")]
fn db_err(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Database
// ============================================================================

/// Open `SQLite` database shared by every typed store handle.
#[derive(Clone)]
pub struct SqliteDatabase {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    /// Opens (and initializes) the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns a typed store handle for record kind `R`.
    #[must_use]
    pub fn store<R>(&self) -> SqliteObjectStore<R> {
        SqliteObjectStore {
            connection: Arc::clone(&self.connection),
            kind: PhantomData,
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed object store for one record kind.
pub struct SqliteObjectStore<R> {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Record kind marker.
    kind: PhantomData<fn() -> R>,
}

impl<R> Clone for SqliteObjectStore<R> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            kind: PhantomData,
        }
    }
}

impl<R> SqliteObjectStore<R>
where
    R: StoredRecord + Serialize + DeserializeOwned,
{
    /// Runs a closure inside an immediate transaction.
    fn with_tx<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_err)?;
        let value = f(&tx)?;
        tx.commit().map_err(db_err)?;
        drop(guard);
        Ok(value)
    }

    /// Loads a record by name.
    fn get_record(&self, name: &str) -> Result<R, SqliteStoreError> {
        self.with_tx(|tx| {
            let row: Option<(i64, Vec<u8>)> = tx
                .query_row(
                    "SELECT resource_version, record_json FROM records WHERE kind = ?1 AND name \
                     = ?2",
                    params![R::KIND, name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(db_err)?;
            let Some((version, bytes)) = row else {
                return Err(SqliteStoreError::NotFound(name.to_string()));
            };
            decode_record(name, version, &bytes)
        })
    }

    /// Inserts a new record.
    fn create_record(&self, mut record: R) -> Result<R, SqliteStoreError> {
        let name = record.meta().name.clone();
        validate_record_name(&name)?;
        self.with_tx(|tx| {
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM records WHERE kind = ?1 AND name = ?2",
                    params![R::KIND, &name],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            if exists.is_some() {
                return Err(SqliteStoreError::AlreadyExists(name.clone()));
            }
            let version = next_version(tx)?;
            record.meta_mut().resource_version = to_u64(version)?;
            let bytes = encode_record(&record)?;
            tx.execute(
                "INSERT INTO records (kind, name, resource_version, record_json, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![R::KIND, &name, version, bytes, unix_millis()],
            )
            .map_err(db_err)?;
            Ok(())
        })?;
        Ok(record)
    }

    /// Replaces a record when its supplied version is current.
    fn update_record(&self, mut record: R) -> Result<R, SqliteStoreError> {
        let name = record.meta().name.clone();
        validate_record_name(&name)?;
        let supplied = to_i64(record.meta().resource_version)?;
        self.with_tx(|tx| {
            let current: Option<i64> = tx
                .query_row(
                    "SELECT resource_version FROM records WHERE kind = ?1 AND name = ?2",
                    params![R::KIND, &name],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            let Some(current) = current else {
                return Err(SqliteStoreError::NotFound(name.clone()));
            };
            if current != supplied {
                return Err(SqliteStoreError::Conflict(format!(
                    "{name}: supplied version {supplied}, stored version {current}"
                )));
            }
            let version = next_version(tx)?;
            record.meta_mut().resource_version = to_u64(version)?;
            let bytes = encode_record(&record)?;
            tx.execute(
                "UPDATE records SET resource_version = ?3, record_json = ?4, updated_at = ?5 \
                 WHERE kind = ?1 AND name = ?2 AND resource_version = ?6",
                params![R::KIND, &name, version, bytes, unix_millis(), current],
            )
            .map_err(db_err)?;
            Ok(())
        })?;
        Ok(record)
    }

    /// Deletes a record by name.
    fn delete_record(&self, name: &str) -> Result<(), SqliteStoreError> {
        self.with_tx(|tx| {
            let removed = tx
                .execute("DELETE FROM records WHERE kind = ?1 AND name = ?2", params![
                    R::KIND,
                    name
                ])
                .map_err(db_err)?;
            if removed == 0 {
                return Err(SqliteStoreError::NotFound(name.to_string()));
            }
            Ok(())
        })
    }

    /// Lists records of this kind matching the selector, ordered by name.
    fn list_records(&self, selector: &LabelSelector) -> Result<Vec<R>, SqliteStoreError> {
        self.with_tx(|tx| {
            let mut statement = tx
                .prepare(
                    "SELECT name, resource_version, record_json FROM records WHERE kind = ?1 \
                     ORDER BY name",
                )
                .map_err(db_err)?;
            let rows = statement
                .query_map(params![R::KIND], |row| {
                    let name: String = row.get(0)?;
                    let version: i64 = row.get(1)?;
                    let bytes: Vec<u8> = row.get(2)?;
                    Ok((name, version, bytes))
                })
                .map_err(db_err)?;
            let mut records = Vec::new();
            for row in rows {
                let (name, version, bytes) = row.map_err(db_err)?;
                let record: R = decode_record(&name, version, &bytes)?;
                if selector.matches(&record.meta().labels) {
                    records.push(record);
                }
            }
            Ok(records)
        })
    }
}

impl<R> ObjectStore<R> for SqliteObjectStore<R>
where
    R: StoredRecord + Serialize + DeserializeOwned,
{
    fn get(&self, name: &str) -> Result<R, StoreError> {
        self.get_record(name).map_err(StoreError::from)
    }

    fn create(&self, record: R) -> Result<R, StoreError> {
        self.create_record(record).map_err(StoreError::from)
    }

    fn update(&self, record: R) -> Result<R, StoreError> {
        self.update_record(record).map_err(StoreError::from)
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.delete_record(name).map_err(StoreError::from)
    }

    fn list(&self, selector: &LabelSelector) -> Result<Vec<R>, StoreError> {
        self.list_records(selector).map_err(StoreError::from)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| StoreError::Store("mutex poisoned".to_string()))?;
        guard
            .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| {
                row.get::<_, i64>(0)
            })
            .map(|_| ())
            .map_err(|err| StoreError::Store(err.to_string()))
    }
}

// ============================================================================
// SECTION: Record Codec
// ============================================================================

/// Serializes a record, enforcing the size limit.
fn encode_record<R: Serialize>(record: &R) -> Result<Vec<u8>, SqliteStoreError> {
    let bytes =
        serde_json::to_vec(record).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_RECORD_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Decodes a stored record and checks it against its row key.
fn decode_record<R>(name: &str, version: i64, bytes: &[u8]) -> Result<R, SqliteStoreError>
where
    R: StoredRecord + DeserializeOwned,
{
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_RECORD_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    let mut record: R =
        serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if record.meta().name != name {
        return Err(SqliteStoreError::Invalid(format!(
            "record name mismatch between key {name} and payload"
        )));
    }
    record.meta_mut().resource_version = to_u64(version)?;
    Ok(record)
}

/// Rejects records without a usable name.
fn validate_record_name(name: &str) -> Result<(), SqliteStoreError> {
    if name.trim().is_empty() {
        return Err(SqliteStoreError::Invalid("record name must be non-empty".to_string()));
    }
    Ok(())
}

/// Converts a stored version to the record representation.
fn to_u64(version: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(version)
        .map_err(|_| SqliteStoreError::Invalid(format!("negative resource version {version}")))
}

/// Converts a record version to the stored representation.
fn to_i64(version: u64) -> Result<i64, SqliteStoreError> {
    i64::try_from(version)
        .map_err(|_| SqliteStoreError::Invalid(format!("resource version {version} out of range")))
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store path length limits and file type.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens a connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_err)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_err)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_err)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_err)?;
    Ok(connection)
}

/// Creates tables on first open and checks the schema version afterwards.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_err)?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS store_meta (
            version INTEGER NOT NULL,
            last_resource_version INTEGER NOT NULL
        );",
    )
    .map_err(db_err)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_err)?;
    match version {
        None => {
            tx.execute(
                "INSERT INTO store_meta (version, last_resource_version) VALUES (?1, 0)",
                params![SCHEMA_VERSION],
            )
            .map_err(db_err)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS records (
                    kind TEXT NOT NULL,
                    name TEXT NOT NULL,
                    resource_version INTEGER NOT NULL,
                    record_json BLOB NOT NULL,
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (kind, name)
                );",
            )
            .map_err(db_err)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_err)?;
    Ok(())
}

/// Allocates the next database-wide resource version.
fn next_version(tx: &Transaction<'_>) -> Result<i64, SqliteStoreError> {
    tx.query_row(
        "UPDATE store_meta SET last_resource_version = last_resource_version + 1 RETURNING \
         last_resource_version",
        params![],
        |row| row.get(0),
    )
    .map_err(db_err)
}

/// Returns the current unix time in milliseconds.
fn unix_millis() -> i64 {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis());
    i64::try_from(millis).unwrap_or(i64::MAX)
}
