//! File IO Provider Module
//!
//! Data objects stored as files under one root directory.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::datastore::{validate_file_id, DataIoProvider, DataReader, DataWriter};
use crate::error::{Error, Result};

// == File IO Provider ==
/// Maps each identifier to a file directly under `root`.
#[derive(Debug, Clone)]
pub struct FileIoProvider {
    root: PathBuf,
}

impl FileIoProvider {
    // == Constructor ==
    /// Creates a provider rooted at an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(Error::InvalidOption("file io provider: missing path".to_string()));
        }
        match std::fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => Ok(Self { root }),
            Ok(_) => Err(Error::InvalidOption(
                "file io provider: path is not a directory".to_string(),
            )),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::InvalidOption(
                "file io provider: path does not exist".to_string(),
            )),
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `id` to a path, refusing anything but a plain file name.
    fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_file_id(id)?;
        let mut components = Path::new(id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(id)),
            _ => Err(Error::InvalidFileId),
        }
    }

    // == Reader ==
    /// Opens an existing file for reading at `offset`.
    pub async fn reader_at(&self, id: &str, offset: u64) -> Result<FileReader> {
        let path = self.path_for(id)?;
        let mut file = File::open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FileNotFound(id.to_string()),
            _ => Error::Io(e),
        })?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }
        Ok(FileReader {
            file: Some(file),
            position: offset,
        })
    }

    // == Writer ==
    /// Opens (creating if needed) a file for writing at `offset`.
    pub async fn writer_at(&self, id: &str, offset: u64) -> Result<FileWriter> {
        let path = self.path_for(id)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }
        Ok(FileWriter {
            file: Some(file),
            position: offset,
        })
    }
}

#[async_trait]
impl DataIoProvider for FileIoProvider {
    async fn get_reader_at(&self, id: &str, offset: u64) -> Result<Box<dyn DataReader>> {
        Ok(Box::new(self.reader_at(id, offset).await?))
    }

    async fn get_writer_at(&self, id: &str, offset: u64) -> Result<Box<dyn DataWriter>> {
        Ok(Box::new(self.writer_at(id, offset).await?))
    }
}

// == File Reader ==
#[derive(Debug)]
pub struct FileReader {
    file: Option<File>,
    position: u64,
}

#[async_trait]
impl DataReader for FileReader {
    fn position(&self) -> u64 {
        self.position
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Internal("file reader is closed".to_string()))?;
        let n = file.read(buf).await?;
        self.position += n as u64;
        Ok(n)
    }

    /// Closing twice is allowed.
    async fn close(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }
}

// == File Writer ==
#[derive(Debug)]
pub struct FileWriter {
    file: Option<File>,
    position: u64,
}

#[async_trait]
impl DataWriter for FileWriter {
    fn position(&self) -> u64 {
        self.position
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Internal("file writer is closed".to_string()))?;
        file.write_all(buf).await?;
        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    /// Flushes pending writes. Closing twice is allowed.
    async fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        Ok(())
    }
}
