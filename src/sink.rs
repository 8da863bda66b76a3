// ABOUTME: Append-only output sinks for dump artifacts
// ABOUTME: Buffered file sink plus an in-memory sink for tests and pipelines

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Append-only byte destination for a dump
#[allow(async_fn_in_trait)]
pub trait Sink {
    /// Append `bytes`, returning how many bytes were written
    async fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Flush buffered output once the dump is complete
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Sink for Vec<u8> {
    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        self.extend_from_slice(bytes);
        Ok(bytes.len())
    }
}

/// Writes a dump to a file on disk, truncating any existing content
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .await
            .with_context(|| format!("Failed to open dump file {}", path.display()))?;

        tracing::debug!("Opened dump file {}", path.display());

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        self.writer
            .write_all(bytes)
            .await
            .with_context(|| format!("Failed to write to dump file {}", self.path.display()))?;
        Ok(bytes.len())
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .await
            .with_context(|| format!("Failed to flush dump file {}", self.path.display()))
    }
}
