//! Temporary per-chunk storage
//!
//! Each chunk is written to its own scratch file next to the destination. The
//! file is removed when the sink is closed or dropped, so a sink never
//! outlives the download that created it.

use std::path::Path;

use tempfile::NamedTempFile;

use crate::core::error::Result;

/// Exclusively owned scratch file holding one chunk's bytes
#[derive(Debug)]
pub struct ChunkSink {
    index: u32,
    file: NamedTempFile,
}

impl ChunkSink {
    /// Creates an empty scratch file for chunk `index` inside `dir`
    pub fn create(dir: &Path, index: u32) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(".rangefetch-")
            .suffix(&format!(".part{index}"))
            .tempfile_in(dir)?;
        Ok(Self { index, file })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Async handle for writing the chunk body
    pub fn writer(&self) -> Result<tokio::fs::File> {
        let handle = self.file.as_file().try_clone()?;
        Ok(tokio::fs::File::from_std(handle))
    }

    /// Fresh async handle positioned at the start of the chunk
    pub async fn reader(&self) -> std::io::Result<tokio::fs::File> {
        tokio::fs::File::open(self.file.path()).await
    }

    /// Deletes the scratch file, reporting failures instead of swallowing them
    pub fn close(self) -> std::io::Result<()> {
        self.file.close()
    }
}
