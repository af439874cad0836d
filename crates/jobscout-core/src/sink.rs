use std::path::{Path, PathBuf};

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::OutputRecord;
use crate::traits::Sink;

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Dataset sink writing one JSON object per line.
///
/// Files are opened in append mode, so re-running against the same path
/// extends the dataset instead of truncating it. Every record is flushed
/// before `append` returns.
pub struct JsonLinesSink {
    writer: Mutex<Writer>,
    path: Option<PathBuf>,
}

impl JsonLinesSink {
    /// Open (or create) `path` for appending.
    pub async fn open(path: &Path) -> Result<Self, AppError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| AppError::SinkError(format!("cannot open {}: {e}", path.display())))?;

        Ok(Self {
            writer: Mutex::new(Box::new(BufWriter::new(file))),
            path: Some(path.to_path_buf()),
        })
    }

    /// Write records to standard output.
    pub fn stdout() -> Self {
        Self {
            writer: Mutex::new(Box::new(BufWriter::new(tokio::io::stdout()))),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Sink for JsonLinesSink {
    async fn append(&self, record: &OutputRecord) -> Result<(), AppError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}
