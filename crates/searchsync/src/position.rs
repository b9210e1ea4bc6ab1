//! Replication positions and the durable position store
//!
//! A [`Position`] is the binlog coordinate the engine resumes from after a
//! restart. The store contract is a single durable [`PositionStore::save`];
//! the engine never persists a position before the documents that preceded it
//! in the stream have been flushed to the sink.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

/// A binlog coordinate: log file name plus byte offset.
///
/// Monotonic within one log file; rotation moves to the next file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Binlog file name, e.g. `mysql-bin.000003`
    pub name: String,
    /// Byte offset within the file
    pub pos: u64,
}

impl Position {
    pub fn new(name: impl Into<String>, pos: u64) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.pos)
    }
}

/// Durable position storage.
///
/// A successful return means the position is durable; the engine treats any
/// failure as fatal.
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn save(&self, pos: &Position) -> Result<()>;
}

/// File-backed position store with atomic writes.
///
/// The position is stored as JSON and replaced via temp-file + rename so a
/// crash mid-write never leaves a torn checkpoint.
pub struct FilePositionStore {
    path: PathBuf,
    fsync: bool,
}

impl FilePositionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            fsync: true,
        }
    }

    /// Disable fsync after writes (faster, weaker durability)
    pub fn without_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    /// Load the last saved position, if any.
    pub async fn load(&self) -> Result<Option<Position>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PositionStore for FilePositionStore {
    async fn save(&self, pos: &Position) -> Result<()> {
        let temp_path = self.path.with_extension("tmp");
        let json = serde_json::to_string_pretty(pos)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await?;
        file.write_all(json.as_bytes()).await?;

        if self.fsync {
            file.sync_all().await?;
        }

        fs::rename(&temp_path, &self.path).await?;

        debug!("Saved position {}", pos);
        Ok(())
    }
}

/// In-memory position store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    saved: RwLock<Vec<Position>>,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All positions saved so far, oldest first.
    pub async fn saved(&self) -> Vec<Position> {
        self.saved.read().await.clone()
    }

    /// The most recently saved position.
    pub async fn last(&self) -> Option<Position> {
        self.saved.read().await.last().cloned()
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    async fn save(&self, pos: &Position) -> Result<()> {
        self.saved.write().await.push(pos.clone());
        Ok(())
    }
}
