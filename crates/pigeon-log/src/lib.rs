//! Append-only chat message log stored as a single JSON array on disk.
//!
//! Every write rewrites the whole file and drops records older than the
//! retention window. Reads never fail: a missing or unreadable file is
//! treated as an empty log.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use pigeon_types::models::{ChatMessage, NewMessage};

/// Messages older than this are pruned on the next write.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

pub struct MessageLog {
    path: PathBuf,
    retention: Duration,
    /// Serializes the load-modify-rewrite cycle of `append`.
    write_lock: Mutex<()>,
}

impl MessageLog {
    /// The retention window must be positive, otherwise `append` would prune
    /// the record it just wrote.
    pub fn new(path: impl Into<PathBuf>, retention: Duration) -> Result<Self> {
        if retention <= Duration::zero() {
            bail!("Message retention must be positive, got {}", retention);
        }
        Ok(Self {
            path: path.into(),
            retention,
            write_lock: Mutex::new(()),
        })
    }

    pub fn with_default_retention(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retention: Duration::hours(DEFAULT_RETENTION_HOURS),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole log. Missing or malformed files yield an empty log.
    pub async fn load(&self) -> Vec<ChatMessage> {
        match read_messages(&self.path).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Discarding message log {}: {:#}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Stamp `draft` with the current time and append it.
    pub async fn append(&self, draft: NewMessage) -> Result<ChatMessage> {
        self.append_at(draft, Utc::now()).await
    }

    /// Append `draft` as if written at `now`, pruning everything that falls
    /// outside the retention window relative to `now`.
    pub async fn append_at(&self, draft: NewMessage, now: DateTime<Utc>) -> Result<ChatMessage> {
        let message = ChatMessage {
            sender_id: draft.sender_id,
            recipient_id: draft.recipient_id,
            text: draft.text,
            file_path: draft.file_path,
            timestamp: now,
            time: now.with_timezone(&Local).format("%H:%M").to_string(),
        };

        let _guard = self.write_lock.lock().await;

        let mut messages = self.load().await;
        messages.push(message.clone());

        let before = messages.len();
        if let Some(cutoff) = now.checked_sub_signed(self.retention) {
            messages.retain(|m| m.timestamp > cutoff);
        }
        let pruned = before - messages.len();
        if pruned > 0 {
            debug!("Pruned {} expired messages", pruned);
        }

        self.write_all(&messages).await?;
        Ok(message)
    }

    /// All messages exchanged between `a` and `b`, in either direction,
    /// in insertion order.
    pub async fn conversation(&self, a: i64, b: i64) -> Vec<ChatMessage> {
        self.load()
            .await
            .into_iter()
            .filter(|m| m.is_between(a, b))
            .collect()
    }

    async fn write_all(&self, messages: &[ChatMessage]) -> Result<()> {
        // Four-space indent.
        let mut json = Vec::new();
        let mut ser = Serializer::with_formatter(&mut json, PrettyFormatter::with_indent(b"    "));
        messages.serialize(&mut ser)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file, then swap it in.
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }
}

async fn read_messages(path: &Path) -> Result<Vec<ChatMessage>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let messages = serde_json::from_str(&content).context("Malformed message log")?;
    Ok(messages)
}
