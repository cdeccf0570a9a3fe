//! Persistence collaborators for the activity trail.
//!
//! Stores receive the scope predicate as a `Filter` and must apply it while
//! selecting rows. Results come back newest-first, truncated to `limit`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;

use super::model::ActivityRecord;
use crate::identity::Filter;

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert(&self, record: &ActivityRecord) -> Result<()>;
    async fn find(&self, filter: &Filter, limit: usize) -> Result<Vec<ActivityRecord>>;
}

fn select(records: impl Iterator<Item = ActivityRecord>, filter: &Filter, limit: usize) -> Result<Vec<ActivityRecord>> {
    let mut out = Vec::new();
    for rec in records {
        let row = serde_json::to_value(&rec)?;
        if filter.matches(&row) {
            out.push(rec);
        }
    }
    // Stable sort over reversed insertion order: same-instant ties come out latest-written first
    out.reverse();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out.truncate(limit);
    Ok(out)
}

/// Process-local store; the default when no log file is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryActivityStore {
    rows: Arc<RwLock<Vec<ActivityRecord>>>,
}

impl MemoryActivityStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.rows.read().len() }

    pub fn is_empty(&self) -> bool { self.rows.read().is_empty() }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn insert(&self, record: &ActivityRecord) -> Result<()> {
        self.rows.write().push(record.clone());
        Ok(())
    }

    async fn find(&self, filter: &Filter, limit: usize) -> Result<Vec<ActivityRecord>> {
        let snapshot = self.rows.read().clone();
        select(snapshot.into_iter(), filter, limit)
    }
}

/// Append-only JSON-lines file, one record per line.
#[derive(Debug, Clone)]
pub struct JsonlActivityStore {
    path: PathBuf,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl JsonlActivityStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), write_lock: Arc::new(tokio::sync::Mutex::new(())) }
    }
}

#[async_trait]
impl ActivityStore for JsonlActivityStore {
    async fn insert(&self, record: &ActivityRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let _guard = self.write_lock.lock().await;
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await.with_context(|| format!("creating {}", dir.display()))?;
            }
        }
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening activity log {}", self.path.display()))?;
        f.write_all(line.as_bytes()).await?;
        f.flush().await?;
        Ok(())
    }

    async fn find(&self, filter: &Filter, limit: usize) -> Result<Vec<ActivityRecord>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("reading activity log {}", self.path.display())),
        };
        let mut records = Vec::new();
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() { continue; }
            match serde_json::from_str::<ActivityRecord>(line) {
                Ok(r) => records.push(r),
                Err(e) => tracing::warn!(target: "audit", line = n + 1, "skipping unreadable activity line: {}", e),
            }
        }
        select(records.into_iter(), filter, limit)
    }
}
