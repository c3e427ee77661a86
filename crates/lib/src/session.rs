//! Conversation sessions and their on-disk history.
//!
//! One JSON file per session (`<dir>/<session-id>.json`), loaded entirely
//! into memory when the store opens. The store is constructed explicitly by
//! the application root and passed by reference to the views that need it;
//! there is no process-wide registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique session identifier (opaque string).
pub type SessionId = String;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session name already in use: {0}")]
    NameTaken(String),

    #[error("session storage I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing session file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single message in a session (role + content).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: String,
    pub content: String,
}

impl SessionMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A session: id, display name, last-update timestamp, ordered history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
}

impl Session {
    /// Timestamp label for history rows.
    pub fn last_update_label(&self) -> String {
        self.last_update.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// File-backed session store (create, load, append, rename, remove).
pub struct SessionStore {
    dir: PathBuf,
    sessions: HashMap<SessionId, Session>,
}

impl SessionStore {
    /// Open the store, creating the directory if needed and loading every
    /// `*.json` session file. Unreadable files are skipped with a warning so
    /// one corrupt session does not take the history down.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let mut sessions = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_session(&path) {
                Ok(session) => {
                    sessions.insert(session.id.clone(), session);
                }
                Err(e) => log::warn!("skipping session file {}: {}", path.display(), e),
            }
        }
        log::debug!("loaded {} session(s) from {}", sessions.len(), dir.display());
        Ok(Self { dir, sessions })
    }

    fn read_session(path: &Path) -> Result<Session, SessionError> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&s)?)
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn persist(&self, session: &Session) -> Result<(), SessionError> {
        let s = serde_json::to_string(session)?;
        std::fs::write(self.session_path(&session.id), s)?;
        Ok(())
    }

    /// Create and persist a new session. `name` defaults to "New chat N".
    pub fn create(&mut self, name: Option<String>) -> Result<SessionId, SessionError> {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("New chat {}", self.sessions.len() + 1));
        let session = Session {
            id: format!("sess-{}", uuid::Uuid::new_v4()),
            name,
            last_update: Utc::now(),
            messages: Vec::new(),
        };
        self.persist(&session)?;
        let id = session.id.clone();
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Append a message, bump the timestamp, and persist.
    pub fn append_message(
        &mut self,
        id: &str,
        message: SessionMessage,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.messages.push(message);
        session.last_update = Utc::now();
        let session = session.clone();
        self.persist(&session)
    }

    /// Rename a session. Fails if another session already has the name.
    pub fn rename(&mut self, id: &str, new_name: impl Into<String>) -> Result<(), SessionError> {
        let new_name = new_name.into();
        if self
            .sessions
            .values()
            .any(|s| s.id != id && s.name == new_name)
        {
            return Err(SessionError::NameTaken(new_name));
        }
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.name = new_name;
        let session = session.clone();
        self.persist(&session)
    }

    /// Remove a session and delete its file.
    pub fn remove(&mut self, id: &str) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let path = self.session_path(id);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(session)
    }

    /// Sessions whose name contains the query (trimmed, case-insensitive).
    pub fn find_by_name_contains(&self, query: &str) -> Vec<&Session> {
        let q = query.trim().to_lowercase();
        let mut found: Vec<&Session> = self
            .sessions
            .values()
            .filter(|s| s.name.to_lowercase().contains(&q))
            .collect();
        found.sort_by(|a, b| b.last_update.cmp(&a.last_update));
        found
    }

    /// All sessions, newest first.
    pub fn by_recency(&self) -> Vec<&Session> {
        let mut all: Vec<&Session> = self.sessions.values().collect();
        all.sort_by(|a, b| b.last_update.cmp(&a.last_update));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (PathBuf, SessionStore) {
        let dir = std::env::temp_dir().join(format!("mira-session-test-{}", uuid::Uuid::new_v4()));
        let store = SessionStore::open(&dir).expect("open store");
        (dir, store)
    }

    #[test]
    fn create_assigns_default_name_and_persists() {
        let (dir, mut store) = temp_store();
        let id = store.create(None).expect("create");
        assert_eq!(store.get(&id).map(|s| s.name.as_str()), Some("New chat 1"));
        assert!(dir.join(format!("{id}.json")).exists());
    }

    #[test]
    fn append_bumps_timestamp_and_survives_reopen() {
        let (dir, mut store) = temp_store();
        let id = store.create(Some("greeting".to_string())).expect("create");
        store
            .append_message(&id, SessionMessage::user("hi"))
            .expect("append");
        store
            .append_message(&id, SessionMessage::assistant("hello"))
            .expect("append");

        let reopened = SessionStore::open(&dir).expect("reopen");
        let session = reopened.get(&id).expect("loaded");
        assert_eq!(session.name, "greeting");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, "user");
    }

    #[test]
    fn rename_rejects_taken_name() {
        let (_dir, mut store) = temp_store();
        let a = store.create(Some("a".to_string())).expect("create a");
        let _b = store.create(Some("b".to_string())).expect("create b");
        match store.rename(&a, "b") {
            Err(SessionError::NameTaken(name)) => assert_eq!(name, "b"),
            other => panic!("expected NameTaken, got {other:?}"),
        }
        store.rename(&a, "c").expect("rename to free name");
        assert_eq!(store.get(&a).map(|s| s.name.as_str()), Some("c"));
    }

    #[test]
    fn remove_deletes_file() {
        let (dir, mut store) = temp_store();
        let id = store.create(None).expect("create");
        let path = dir.join(format!("{id}.json"));
        assert!(path.exists());
        store.remove(&id).expect("remove");
        assert!(!path.exists());
        assert!(matches!(
            store.remove(&id),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn find_by_name_is_case_insensitive() {
        let (_dir, mut store) = temp_store();
        store.create(Some("Rust notes".to_string())).expect("create");
        store.create(Some("shopping".to_string())).expect("create");
        let hits = store.find_by_name_contains("  RUST ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Rust notes");
    }

    #[test]
    fn corrupt_file_is_skipped_on_open() {
        let (dir, mut store) = temp_store();
        store.create(Some("ok".to_string())).expect("create");
        std::fs::write(dir.join("bad.json"), b"{ not json").expect("write corrupt");
        let reopened = SessionStore::open(&dir).expect("reopen");
        assert_eq!(reopened.len(), 1);
    }
}
