//! Metadata Store Module
//!
//! Per-file metadata and completion records keyed by file identifier.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::datastore::validate_file_id;
use crate::error::{Error, Result};

// == File Meta ==
/// Descriptive metadata for a stored data object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub file_id: String,
    /// Where the data was originally retrieved from
    pub source_uri: String,
    /// Total size in bytes, when known
    pub size: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

impl FileMeta {
    pub fn new(file_id: impl Into<String>, source_uri: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            file_id: file_id.into(),
            source_uri: source_uri.into(),
            size,
            updated_at: Utc::now(),
        }
    }
}

// == File Completion Data ==
/// How much of a data object has been written locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCompletionData {
    pub file_id: String,
    pub bytes_written: u64,
    pub complete: bool,
    pub updated_at: DateTime<Utc>,
}

impl FileCompletionData {
    pub fn new(file_id: impl Into<String>, bytes_written: u64, complete: bool) -> Self {
        Self {
            file_id: file_id.into(),
            bytes_written,
            complete,
            updated_at: Utc::now(),
        }
    }
}

// == Metadata Store Trait ==
/// Record store for file metadata.
///
/// Lookups fail with [`Error::InvalidFileId`] for blank identifiers and
/// [`Error::FileNotFound`] for unknown ones.
#[async_trait]
pub trait MetaDataStore: Send + Sync {
    async fn get_file_meta(&self, file_id: &str) -> Result<FileMeta>;

    async fn save_file_meta(&self, meta: &FileMeta) -> Result<()>;

    async fn get_file_completion_data(&self, file_id: &str) -> Result<FileCompletionData>;

    async fn save_file_completion_data(&self, data: &FileCompletionData) -> Result<()>;
}

// == Memory Metadata Store ==
/// In-memory [`MetaDataStore`]. Records are stored and returned as copies.
#[derive(Debug, Default)]
pub struct MemoryMetaDataStore {
    file_meta: RwLock<HashMap<String, FileMeta>>,
    completion: RwLock<HashMap<String, FileCompletionData>>,
}

impl MemoryMetaDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetaDataStore for MemoryMetaDataStore {
    async fn get_file_meta(&self, file_id: &str) -> Result<FileMeta> {
        validate_file_id(file_id)?;
        self.file_meta
            .read()
            .await
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::FileNotFound(file_id.to_string()))
    }

    async fn save_file_meta(&self, meta: &FileMeta) -> Result<()> {
        validate_file_id(&meta.file_id)?;
        self.file_meta
            .write()
            .await
            .insert(meta.file_id.clone(), meta.clone());
        Ok(())
    }

    async fn get_file_completion_data(&self, file_id: &str) -> Result<FileCompletionData> {
        validate_file_id(file_id)?;
        self.completion
            .read()
            .await
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::FileNotFound(file_id.to_string()))
    }

    async fn save_file_completion_data(&self, data: &FileCompletionData) -> Result<()> {
        validate_file_id(&data.file_id)?;
        self.completion
            .write()
            .await
            .insert(data.file_id.clone(), data.clone());
        Ok(())
    }
}
