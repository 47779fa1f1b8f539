//! Result sink boundary: ordered emission of discovery results, one per job.

use std::path::Path;

use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::model::DiscoveryResult;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Downstream persistence boundary for discovery results.
pub trait ResultSink {
    async fn emit(&mut self, result: &DiscoveryResult) -> Result<(), SinkError>;
}

/// Appends one JSON object per line to a file, flushing after every record so
/// a partial run still leaves every emitted result on disk.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = File::create(path).await?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl ResultSink for JsonlSink {
    async fn emit(&mut self, result: &DiscoveryResult) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(result)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Collects results in memory; used by the demo command and tests.
#[derive(Default)]
pub struct MemorySink {
    pub results: Vec<DiscoveryResult>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    async fn emit(&mut self, result: &DiscoveryResult) -> Result<(), SinkError> {
        self.results.push(result.clone());
        Ok(())
    }
}
