//! Content stream capability
//!
//! Turning a track identifier into audio bytes (session handling, key
//! exchange, decryption) belongs to the embedding application. The pipeline
//! only needs an opened stream that reports its size and yields chunks.

use crate::config::Quality;
use crate::error::Result;
use crate::types::TrackId;
use async_trait::async_trait;

/// An opened audio stream for one track
#[async_trait]
pub trait ContentStream: Send {
    /// Declared size of the stream in bytes
    fn size(&self) -> u64;

    /// Read up to `max` bytes; an empty chunk means no data was available
    ///
    /// Callers treat two consecutive empty reads as end of stream.
    async fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>>;
}

/// Opens content streams for tracks
#[async_trait]
pub trait ContentStreamProvider: Send + Sync {
    /// Open the stream for `id` at the given (already resolved) quality tier
    async fn open(&self, id: &TrackId, quality: Quality) -> Result<Box<dyn ContentStream>>;

    /// Whether the account may request the highest tier
    fn is_elevated(&self) -> bool;
}

/// Stream over bytes already held in memory
///
/// Handy for embedding applications that fetch whole files at once.
#[derive(Clone, Debug)]
pub struct MemoryStream {
    data: Vec<u8>,
    position: usize,
}

impl MemoryStream {
    /// Wrap a buffer
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }
}

#[async_trait]
impl ContentStream for MemoryStream {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>> {
        let end = self.position.saturating_add(max).min(self.data.len());
        let chunk = self.data[self.position..end].to_vec();
        self.position = end;
        Ok(chunk)
    }
}
