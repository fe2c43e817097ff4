//! Login session state.
//!
//! The bearer token lives in two places: a [`SessionToken`] handle shared with
//! the HTTP client, and a single-row SQLite table so a restart skips the login
//! screen. [`Session`] keeps the two in step: `begin` on login, `end` on logout.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS session (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    username TEXT NOT NULL,
    token TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

/// Shared, swappable bearer token read by every outgoing request.
#[derive(Debug, Clone, Default)]
pub struct SessionToken(Arc<RwLock<Option<String>>>);

impl SessionToken {
    pub fn get(&self) -> Option<String> {
        self.0.read().ok().and_then(|guard| guard.clone())
    }

    pub fn set(&self, token: String) {
        if let Ok(mut guard) = self.0.write() {
            *guard = Some(token);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.0.write() {
            *guard = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub username: String,
    pub token: String,
}

/// SQLite-backed persistence for the current session.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    /// Opens (or creates) the session database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open session database {}", path.display()))?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create session table")?;
        Ok(Self { conn })
    }

    pub fn load(&self) -> Result<Option<StoredSession>> {
        let mut stmt = self
            .conn
            .prepare("SELECT username, token FROM session WHERE id = 1")?;
        let session = stmt
            .query_row([], |row| {
                Ok(StoredSession {
                    username: row.get(0)?,
                    token: row.get(1)?,
                })
            })
            .optional()?;
        Ok(session)
    }

    pub fn save(&self, username: &str, token: &str) -> Result<()> {
        let created_at = crate::models::format_rfc3339(OffsetDateTime::now_utc());
        self.conn
            .execute(
                "INSERT INTO session (id, username, token, created_at) VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET username = ?1, token = ?2, created_at = ?3",
                params![username, token, created_at],
            )
            .context("Failed to save session")?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM session", [])
            .context("Failed to clear session")?;
        Ok(())
    }
}

/// The signed-in admin, if any.
pub struct Session {
    store: SessionStore,
    token: SessionToken,
    username: Option<String>,
}

impl Session {
    pub fn new(store: SessionStore, token: SessionToken) -> Self {
        Self {
            store,
            token,
            username: None,
        }
    }

    /// Loads a persisted session into the token handle. Returns true if one existed.
    pub fn restore(&mut self) -> Result<bool> {
        match self.store.load()? {
            Some(stored) => {
                tracing::info!(username = %stored.username, "restored saved session");
                self.token.set(stored.token);
                self.username = Some(stored.username);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn begin(&mut self, username: String, token: String) -> Result<()> {
        self.store.save(&username, &token)?;
        self.token.set(token);
        tracing::info!(%username, "session started");
        self.username = Some(username);
        Ok(())
    }

    pub fn end(&mut self) -> Result<()> {
        self.token.clear();
        if let Some(username) = self.username.take() {
            tracing::info!(%username, "session ended");
        }
        self.store.clear()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.token.get().is_some()
    }

    #[cfg(test)]
    pub fn token(&self) -> &SessionToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_round_trip_and_overwrite() {
        let store = SessionStore::open_in_memory().unwrap();
        assert_eq!(store.load().unwrap(), None);

        store.save("admin", "t1").unwrap();
        store.save("nurse", "t2").unwrap();
        assert_eq!(
            store.load().unwrap(),
            Some(StoredSession {
                username: "nurse".to_string(),
                token: "t2".to_string()
            })
        );

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn begin_and_end_drive_the_shared_token() {
        let token = SessionToken::default();
        let mut session = Session::new(SessionStore::open_in_memory().unwrap(), token.clone());
        assert!(!session.is_active());

        session.begin("admin".to_string(), "abc".to_string()).unwrap();
        assert_eq!(token.get().as_deref(), Some("abc"));
        assert_eq!(session.username(), Some("admin"));

        session.end().unwrap();
        assert_eq!(token.get(), None);
        assert_eq!(session.username(), None);
        assert!(!session.restore().unwrap());
    }

    #[test]
    fn restore_loads_persisted_token() {
        let store = SessionStore::open_in_memory().unwrap();
        store.save("admin", "persisted").unwrap();

        let token = SessionToken::default();
        let mut session = Session::new(store, token.clone());
        assert!(session.restore().unwrap());
        assert_eq!(token.get().as_deref(), Some("persisted"));
        assert!(session.is_active());
    }
}
