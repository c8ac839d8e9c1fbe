use std::io::SeekFrom;
use std::path::Path;

use log::info;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncSeekExt, BufReader};

use crate::error_handling::types::LogSourceError;

/// Opens the auth log positioned at its current end, so that only lines
/// appended from now on are read.
pub async fn open_at_end(path: &Path) -> Result<BufReader<File>, LogSourceError> {
    let display = path.display().to_string();
    let mut file = File::open(path)
        .await
        .map_err(|e| LogSourceError::OpenFailed(display.clone(), e))?;
    let offset = file
        .seek(SeekFrom::End(0))
        .await
        .map_err(|e| LogSourceError::SeekFailed(display.clone(), e))?;
    info!("following {} from offset {}", display, offset);
    Ok(BufReader::new(file))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, without its terminator.
    Line(String),
    /// Nothing complete to read for now.
    EndOfStream,
}

/// Line reader over a growing text stream.
///
/// A trailing fragment without a newline is kept and completed by later reads
/// rather than handed out half-written.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    /// Cancel safe: bytes read before cancellation stay buffered.
    pub async fn next_line(&mut self) -> std::io::Result<ReadOutcome> {
        self.inner.read_until(b'\n', &mut self.pending).await?;
        if !self.pending.ends_with(b"\n") {
            return Ok(ReadOutcome::EndOfStream);
        }
        let raw = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&raw)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        Ok(ReadOutcome::Line(line))
    }

    pub fn has_partial_line(&self) -> bool {
        !self.pending.is_empty()
    }
}
