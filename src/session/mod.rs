// Per-session document state
// Each browser session owns its upload path and the index built from it

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::pipeline::IndexedDocument;
use crate::{AppError, Result};

pub type SessionId = Uuid;

type SessionMap = HashMap<SessionId, SessionDocument>;

/// Longest pause between two idle sweeps
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The document currently loaded for one session
#[derive(Debug, Clone)]
pub struct SessionDocument {
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    /// Last upload or question; idle expiry is measured from here
    pub last_seen: DateTime<Utc>,
    pub document: Arc<IndexedDocument>,
}

/// Display-ready facts about a session's document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub file_name: String,
    pub page_count: usize,
    pub chunk_count: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Session registry. A new upload for a session replaces its previous document.
#[derive(Debug)]
pub struct SessionStore {
    upload_dir: PathBuf,
    sessions: RwLock<SessionMap>,
}

impl SessionStore {
    #[inline]
    pub fn new(upload_dir: PathBuf) -> Self {
        Self {
            upload_dir,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Fixed per-session location of the uploaded PDF
    #[inline]
    pub fn upload_path(&self, id: SessionId) -> PathBuf {
        self.upload_dir.join(format!("{id}.pdf"))
    }

    /// Persist an upload that has already been indexed and make it the session's document.
    ///
    /// The file write and the map update happen under one lock, so concurrent uploads for the
    /// same session always leave the file on disk matching the installed document.
    #[inline]
    pub fn store_upload(
        &self,
        id: SessionId,
        file_name: &str,
        bytes: &[u8],
        document: Arc<IndexedDocument>,
    ) -> Result<PathBuf> {
        let mut sessions = self.write()?;

        fs::create_dir_all(&self.upload_dir)?;
        let path = self.upload_path(id);
        fs::write(&path, bytes)?;
        debug!("Stored {} bytes for session {} at {}", bytes.len(), id, path.display());

        let now = Utc::now();
        let entry = SessionDocument {
            file_name: file_name.to_string(),
            uploaded_at: now,
            last_seen: now,
            document,
        };
        match sessions.insert(id, entry) {
            Some(previous) => info!(
                "Session {} replaced {} with {}",
                id, previous.file_name, file_name
            ),
            None => info!("Session {} loaded {}", id, file_name),
        }
        Ok(path)
    }

    /// Look up the session's document and mark the session as active
    #[inline]
    pub fn document(&self, id: SessionId) -> Result<Option<SessionDocument>> {
        Ok(self.write()?.get_mut(&id).map(|entry| {
            entry.last_seen = Utc::now();
            entry.clone()
        }))
    }

    #[inline]
    pub fn summary(&self, id: SessionId) -> Result<Option<DocumentSummary>> {
        Ok(self.read()?.get(&id).map(|entry| DocumentSummary {
            file_name: entry.file_name.clone(),
            page_count: entry.document.page_count,
            chunk_count: entry.document.chunk_count(),
            uploaded_at: entry.uploaded_at,
        }))
    }

    /// Forget the session and delete its upload from disk
    #[inline]
    pub fn remove(&self, id: SessionId) -> Result<bool> {
        let mut sessions = self.write()?;
        let existed = sessions.remove(&id).is_some();
        self.delete_upload(id);
        Ok(existed)
    }

    /// Remove every session not seen within `max_idle` of `now`. Returns how many were removed.
    ///
    /// Selection and deletion share one write lock so a session touched mid-sweep is kept.
    #[inline]
    pub fn expire_idle_at(&self, now: DateTime<Utc>, max_idle: Duration) -> Result<usize> {
        let max_idle = TimeDelta::from_std(max_idle).unwrap_or(TimeDelta::MAX);
        let mut sessions = self.write()?;
        let before = sessions.len();

        sessions.retain(|id, entry| {
            let idle = now.signed_duration_since(entry.last_seen) > max_idle;
            if idle {
                debug!("Session {} idle since {}", id, entry.last_seen);
                self.delete_upload(*id);
            }
            !idle
        });

        let expired = before - sessions.len();
        if expired > 0 {
            info!("Expired {} idle sessions", expired);
        }
        Ok(expired)
    }

    #[inline]
    pub fn expire_idle(&self, max_idle: Duration) -> Result<usize> {
        self.expire_idle_at(Utc::now(), max_idle)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or_default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn delete_upload(&self, id: SessionId) {
        let path = self.upload_path(id);
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed upload {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove upload {}: {}", path.display(), e),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SessionMap>> {
        self.sessions
            .read()
            .map_err(|_| AppError::Index("Session store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SessionMap>> {
        self.sessions
            .write()
            .map_err(|_| AppError::Index("Session store lock poisoned".to_string()))
    }
}

/// Periodically drop sessions idle for longer than `max_idle` along with their uploads.
/// Stops once the sweeper holds the last reference to the store.
#[inline]
pub fn spawn_idle_sweeper(store: Arc<SessionStore>, max_idle: Duration) -> JoinHandle<()> {
    let period = max_idle.clamp(Duration::from_millis(1), MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        while Arc::strong_count(&store) > 1 {
            ticker.tick().await;
            let store = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || store.expire_idle(max_idle)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Idle session sweep failed: {}", e),
                Err(e) => warn!("Idle session sweep panicked: {}", e),
            }
        }
    })
}
