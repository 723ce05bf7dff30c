//! Data Store Module
//!
//! Byte-range read/write providers and file metadata records.
//!
//! # Providers
//! - [`MemoryIoProvider`]: growable in-memory buffers, one per identifier
//! - [`FileIoProvider`]: one file per identifier under a root directory

mod file;
mod memory;
mod meta;

use std::fmt;

use async_trait::async_trait;

use crate::error::{Error, Result};

// Re-export public types
pub use file::{FileIoProvider, FileReader, FileWriter};
pub use memory::{MemoryIoProvider, MemoryReader, MemoryWriter};
pub use meta::{FileCompletionData, FileMeta, MemoryMetaDataStore, MetaDataStore};

// == Reader Trait ==
/// Position-tracking reader over one data object.
#[async_trait]
pub trait DataReader: Send + fmt::Debug {
    /// Offset of the next byte to read.
    fn position(&self) -> u64;

    /// Reads into `buf`, advancing the position. Returns 0 at end of data.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    async fn close(&mut self) -> Result<()>;
}

// == Writer Trait ==
/// Position-tracking writer over one data object.
#[async_trait]
pub trait DataWriter: Send + fmt::Debug {
    /// Offset the next write lands at.
    fn position(&self) -> u64;

    /// Writes all of `buf` at the current position and advances it.
    async fn write(&mut self, buf: &[u8]) -> Result<usize>;

    async fn close(&mut self) -> Result<()>;
}

// == IO Provider Trait ==
/// Hands out readers and writers positioned at a byte offset.
#[async_trait]
pub trait DataIoProvider: Send + Sync {
    async fn get_reader_at(&self, id: &str, offset: u64) -> Result<Box<dyn DataReader>>;

    async fn get_writer_at(&self, id: &str, offset: u64) -> Result<Box<dyn DataWriter>>;
}

/// Rejects empty and whitespace-only file identifiers.
pub(crate) fn validate_file_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidFileId);
    }
    Ok(())
}
