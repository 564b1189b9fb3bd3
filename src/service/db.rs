use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use quickboard_common::Board;
use rusqlite::{Connection, OptionalExtension, params};

use super::auth::PasswordHash;
use super::models::{User, UserRecord};
use crate::errors::ServiceError;

/// Shared handle to the board database for async handlers.
///
/// Closures passed to [`DbHandle::call`] run on the blocking pool with the
/// mutex held, so the statements inside one closure never interleave with
/// another request's.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&BoardDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| ServiceError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. For start-up and tests only.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, BoardDb>> {
        self.inner
            .lock()
            .map_err(|_| ServiceError::LockPoisoned.into())
    }
}

pub struct BoardDb {
    conn: Connection,
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and create tables.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    salt TEXT NOT NULL,
                    iterations INTEGER NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                -- One opaque JSON document per user.
                CREATE TABLE IF NOT EXISTS boards (
                    user_id TEXT PRIMARY KEY,
                    document TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────────────

    pub fn create_user(&self, username: &str, password: &PasswordHash) -> Result<User> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO users (id, username, password_hash, salt, iterations)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, username, password.hash, password.salt, password.iterations],
            )
            .context("Failed to insert user")?;
        self.find_user(username)?
            .map(|record| record.user)
            .context("User not found after insert")
    }

    pub fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        self.conn
            .query_row(
                "SELECT id, username, created_at, password_hash, salt, iterations
                 FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserRecord {
                        user: User {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            created_at: row.get(2)?,
                        },
                        password: PasswordHash {
                            hash: row.get(3)?,
                            salt: row.get(4)?,
                            iterations: row.get(5)?,
                        },
                    })
                },
            )
            .optional()
            .context("Failed to query user")
    }

    // ── Boards ────────────────────────────────────────────────────────

    /// Return the user's board, inserting the seed board first if none is
    /// stored. The insert is a no-op when a row already exists, so a second
    /// first-load can never replace an earlier seed.
    pub fn load_or_seed_board(&self, user_id: &str) -> Result<Board> {
        let seed = serde_json::to_string(&Board::seed()).context("Failed to encode seed board")?;
        let inserted = self
            .conn
            .execute(
                "INSERT INTO boards (user_id, document) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO NOTHING",
                params![user_id, seed],
            )
            .context("Failed to seed board")?;
        if inserted > 0 {
            tracing::info!(user_id, "seeded default board");
        }
        self.get_board(user_id)?
            .context("Board not found after seeding")
    }

    pub fn get_board(&self, user_id: &str) -> Result<Option<Board>> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM boards WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query board")?;
        document
            .map(|doc| serde_json::from_str(&doc).context("Stored board is not valid JSON"))
            .transpose()
    }

    /// Unconditionally replace the user's board (last write wins).
    pub fn save_board(&self, user_id: &str, board: &Board) -> Result<()> {
        let document = serde_json::to_string(board).context("Failed to encode board")?;
        self.conn
            .execute(
                "INSERT INTO boards (user_id, document) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET
                    document = excluded.document,
                    updated_at = datetime('now')",
                params![user_id, document],
            )
            .context("Failed to save board")?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
