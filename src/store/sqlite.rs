// src/store/sqlite.rs
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{error, info};

use super::SeenStore;
use crate::error::RelayError;

/// SQLite-backed seen-set: one table, one unique text column.
///
/// A failed `connect` leaves the store disconnected; every call then
/// reports `StoreUnavailable`.
#[derive(Clone)]
pub struct SqliteSeenStore {
    conn: Arc<Mutex<Option<Connection>>>,
    path: PathBuf,
}

fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS seen_posts (
            id TEXT PRIMARY KEY
        );
        "#,
    )
}

fn open(path: &Path) -> Result<Connection, RelayError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            RelayError::StoreUnavailable(format!("create {}: {e}", parent.display()))
        })?;
    }
    let conn = Connection::open(path)
        .map_err(|e| RelayError::StoreUnavailable(format!("open {}: {e}", path.display())))?;
    init_db(&conn)
        .map_err(|e| RelayError::StoreUnavailable(format!("init {}: {e}", path.display())))?;
    Ok(conn)
}

impl SqliteSeenStore {
    /// Opens (creating if needed) the database at `path`. Never fails: on
    /// error the store comes back disconnected and the error is logged.
    pub async fn connect(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let p = path.clone();
        let opened = tokio::task::spawn_blocking(move || open(&p))
            .await
            .unwrap_or_else(|e| Err(RelayError::StoreUnavailable(format!("open task: {e}"))));

        let conn = match opened {
            Ok(c) => {
                info!(path = %path.display(), "seen store connected");
                Some(c)
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "seen store connection failed; running degraded");
                None
            }
        };

        Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        }
    }

    /// Like `connect`, but surfaces the error instead of degrading.
    pub async fn connect_strict(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let store = Self::connect(path).await;
        if store.is_connected() {
            Ok(store)
        } else {
            Err(RelayError::StoreUnavailable(format!(
                "could not open {}",
                store.path.display()
            )))
        }
    }

    /// A store with no backing connection.
    pub fn disconnected(path: impl AsRef<Path>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.lock().expect("sqlite mutex poisoned").is_some()
    }

    /// Releases the connection. Later calls report `StoreUnavailable`.
    pub fn close(&self) {
        let taken = self.conn.lock().expect("sqlite mutex poisoned").take();
        if let Some(conn) = taken {
            if let Err((_, e)) = conn.close() {
                error!(error = %e, "seen store close failed");
            } else {
                info!(path = %self.path.display(), "seen store closed");
            }
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, RelayError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, RelayError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("sqlite mutex poisoned");
            match guard.as_ref() {
                Some(c) => f(c),
                None => Err(RelayError::StoreUnavailable(
                    "database connection not established".to_string(),
                )),
            }
        })
        .await
        .map_err(|e| RelayError::StoreUnavailable(format!("store task: {e}")))?
    }
}

fn is_duplicate_key(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation)
}

#[async_trait::async_trait]
impl SeenStore for SqliteSeenStore {
    async fn has(&self, id: &str) -> Result<bool, RelayError> {
        let id = id.to_string();
        self.with_conn(move |c| {
            c.query_row(
                "SELECT id FROM seen_posts WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map(|row| row.is_some())
            .map_err(|e| RelayError::StoreUnavailable(format!("query: {e}")))
        })
        .await
    }

    async fn mark_seen(&self, id: &str) -> Result<(), RelayError> {
        let id = id.to_string();
        self.with_conn(move |c| {
            match c.execute("INSERT INTO seen_posts (id) VALUES (?1)", params![id]) {
                Ok(_) => Ok(()),
                // Already recorded: the end state we wanted holds.
                Err(e) if is_duplicate_key(&e) => Ok(()),
                Err(e) => Err(RelayError::StoreUnavailable(format!("insert: {e}"))),
            }
        })
        .await
    }
}
