//! Memory IO Provider Module
//!
//! In-memory byte buffers addressed by identifier.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::datastore::{validate_file_id, DataIoProvider, DataReader, DataWriter};
use crate::error::{Error, Result};

type Buffer = Arc<RwLock<Vec<u8>>>;

// == Memory IO Provider ==
/// Keeps every data object as a shared growable buffer.
///
/// Buffers are created on first access, so reading an unknown identifier
/// yields an empty object.
#[derive(Debug, Clone, Default)]
pub struct MemoryIoProvider {
    data: Arc<RwLock<HashMap<String, Buffer>>>,
}

impl MemoryIoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    async fn buffer(&self, id: &str) -> Buffer {
        if let Some(buffer) = self.data.read().await.get(id) {
            return Arc::clone(buffer);
        }
        let mut data = self.data.write().await;
        Arc::clone(data.entry(id.to_string()).or_default())
    }

    // == Reader ==
    /// Opens a reader positioned at `offset`.
    pub async fn reader_at(&self, id: &str, offset: u64) -> Result<MemoryReader> {
        validate_file_id(id)?;
        Ok(MemoryReader {
            buffer: Some(self.buffer(id).await),
            position: offset,
        })
    }

    // == Writer ==
    /// Opens a writer positioned at `offset`.
    pub async fn writer_at(&self, id: &str, offset: u64) -> Result<MemoryWriter> {
        validate_file_id(id)?;
        Ok(MemoryWriter {
            buffer: Some(self.buffer(id).await),
            position: offset,
        })
    }
}

#[async_trait]
impl DataIoProvider for MemoryIoProvider {
    async fn get_reader_at(&self, id: &str, offset: u64) -> Result<Box<dyn DataReader>> {
        Ok(Box::new(self.reader_at(id, offset).await?))
    }

    async fn get_writer_at(&self, id: &str, offset: u64) -> Result<Box<dyn DataWriter>> {
        Ok(Box::new(self.writer_at(id, offset).await?))
    }
}

// == Memory Reader ==
#[derive(Debug)]
pub struct MemoryReader {
    buffer: Option<Buffer>,
    position: u64,
}

#[async_trait]
impl DataReader for MemoryReader {
    fn position(&self) -> u64 {
        self.position
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let buffer = self
            .buffer
            .as_ref()
            .ok_or_else(|| Error::Internal("memory reader is closed".to_string()))?;
        let data = buffer.read().await;
        let start = match usize::try_from(self.position) {
            Ok(start) if start < data.len() => start,
            _ => return Ok(0),
        };
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.position += n as u64;
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        if self.buffer.take().is_none() {
            return Err(Error::Internal("memory reader is already closed".to_string()));
        }
        self.position = 0;
        Ok(())
    }
}

// == Memory Writer ==
#[derive(Debug)]
pub struct MemoryWriter {
    buffer: Option<Buffer>,
    position: u64,
}

#[async_trait]
impl DataWriter for MemoryWriter {
    fn position(&self) -> u64 {
        self.position
    }

    /// Writing past the end zero-fills the gap.
    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let buffer = self
            .buffer
            .as_ref()
            .ok_or_else(|| Error::Internal("memory writer is closed".to_string()))?;
        if buf.is_empty() {
            return Ok(0);
        }
        let start = usize::try_from(self.position)
            .map_err(|_| Error::Internal("write offset out of range".to_string()))?;
        let end = start + buf.len();

        let mut data = buffer.write().await;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    async fn close(&mut self) -> Result<()> {
        if self.buffer.take().is_none() {
            return Err(Error::Internal("memory writer is already closed".to_string()));
        }
        self.position = 0;
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_id_rejected() {
        let provider = MemoryIoProvider::new();

        assert!(matches!(
            provider.get_reader_at("", 0).await,
            Err(Error::InvalidFileId)
        ));
        assert!(matches!(
            provider.get_writer_at(" ", 0).await,
            Err(Error::InvalidFileId)
        ));
    }

    #[tokio::test]
    async fn test_write_then_read_back() {
        let provider = MemoryIoProvider::new();

        let mut writer = provider.get_writer_at("file", 0).await.unwrap();
        assert_eq!(writer.write(b"hello world").await.unwrap(), 11);
        assert_eq!(writer.position(), 11);
        writer.close().await.unwrap();

        let mut reader = provider.get_reader_at("file", 6).await.unwrap();
        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"world");
        assert_eq!(reader.position(), 11);
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_past_end_zero_fills() {
        let provider = MemoryIoProvider::new();

        let mut writer = provider.writer_at("sparse", 4).await.unwrap();
        writer.write(b"ab").await.unwrap();

        let mut reader = provider.reader_at("sparse", 0).await.unwrap();
        let mut buf = [0xffu8; 8];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0, 0, 0, 0, b'a', b'b']);
    }

    #[tokio::test]
    async fn test_overwrite_in_middle() {
        let provider = MemoryIoProvider::new();
        let mut writer = provider.writer_at("f", 0).await.unwrap();
        writer.write(b"abcdef").await.unwrap();

        let mut patch = provider.writer_at("f", 2).await.unwrap();
        patch.write(b"XY").await.unwrap();

        let mut reader = provider.reader_at("f", 0).await.unwrap();
        let mut buf = [0u8; 6];
        reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf, b"abXYef");
    }

    #[tokio::test]
    async fn test_read_unknown_id_is_empty() {
        let provider = MemoryIoProvider::new();
        let mut reader = provider.reader_at("missing", 0).await.unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_handles_error() {
        let provider = MemoryIoProvider::new();

        let mut writer = provider.writer_at("f", 0).await.unwrap();
        writer.close().await.unwrap();
        assert!(writer.write(b"x").await.is_err());
        assert!(writer.close().await.is_err());

        let mut reader = provider.reader_at("f", 0).await.unwrap();
        reader.close().await.unwrap();
        let mut buf = [0u8; 1];
        assert!(reader.read(&mut buf).await.is_err());
        assert!(reader.close().await.is_err());
    }
}
