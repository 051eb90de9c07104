// src/process/output.rs

//! Captured output of one process.
//!
//! Each stream keeps its bytes in emission order. The combined view records
//! chunks in the order the drain tasks appended them; stdout and stderr are
//! separate pipes, so their relative order in that view is best-effort only.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Which standard stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Default)]
struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    combined: Vec<u8>,
}

/// Append-only capture buffers shared between the drain tasks and readers.
#[derive(Debug, Default)]
pub struct OutputBuffers {
    inner: Mutex<Captured>,
}

impl OutputBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, stream: Stream, chunk: &[u8]) {
        let mut captured = self.lock();
        match stream {
            Stream::Stdout => captured.stdout.extend_from_slice(chunk),
            Stream::Stderr => captured.stderr.extend_from_slice(chunk),
        }
        captured.combined.extend_from_slice(chunk);
    }

    pub fn stdout(&self) -> Vec<u8> {
        self.lock().stdout.clone()
    }

    pub fn stderr(&self) -> Vec<u8> {
        self.lock().stderr.clone()
    }

    pub fn combined(&self) -> Vec<u8> {
        self.lock().combined.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Captured> {
        // A panicking appender leaves whole chunks behind; keep serving them.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Spawn a task that copies `reader` into `buffers` until end-of-stream.
///
/// A read error ends the drain quietly: whatever was captured so far is the
/// final output for that stream.
pub(crate) fn spawn_drain<R>(
    reader: R,
    stream: Stream,
    buffers: Arc<OutputBuffers>,
    command: String,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = reader;
        let mut chunk = vec![0u8; 8 * 1024];

        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => buffers.append(stream, &chunk[..n]),
                Err(e) => {
                    warn!(
                        command = %command,
                        stream = ?stream,
                        error = %e,
                        "output stream failed; keeping partial capture"
                    );
                    break;
                }
            }
        }

        debug!(command = %command, stream = ?stream, "output drain ended");
    })
}
