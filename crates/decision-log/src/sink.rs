use std::path::Path;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::entry::DecisionEntry;
use crate::writer::{DecisionWriteError, DecisionWriter};

/// Channel buffer size used between producers and the background writer task.
const CHANNEL_BUFFER: usize = 1024;

/// Flush the writer at most every this many seconds when the channel is idle.
const FLUSH_INTERVAL_SECS: u64 = 1;

/// Cloneable handle for submitting [`DecisionEntry`] values to the
/// background writer.
#[derive(Clone)]
pub struct DecisionSink {
    tx: mpsc::Sender<DecisionEntry>,
}

impl DecisionSink {
    /// Open the log at `path` and spawn the background writer task.
    ///
    /// The task writes each entry as a JSON line, flushes after a second of
    /// inactivity, and flushes one final time once every `DecisionSink`
    /// clone has been dropped.  Await the returned handle to make sure the
    /// final flush happened.  I/O errors are logged and the entry skipped.
    pub async fn start(
        path: impl AsRef<Path>,
    ) -> Result<(Self, JoinHandle<()>), DecisionWriteError> {
        let (tx, rx) = mpsc::channel::<DecisionEntry>(CHANNEL_BUFFER);

        let mut writer = DecisionWriter::new(path).await?;

        let handle = tokio::spawn(async move {
            run_writer_loop(&mut writer, rx).await;
        });

        Ok((Self { tx }, handle))
    }

    /// Queue an entry, waiting for channel capacity if necessary.  Entries
    /// sent after the writer task exited are dropped with a warning.
    pub async fn log(&self, entry: DecisionEntry) {
        if let Err(err) = self.tx.send(entry).await {
            tracing::warn!(
                level = %err.0.level,
                "decision sink channel closed; entry dropped"
            );
        }
    }
}

async fn run_writer_loop(writer: &mut DecisionWriter, mut rx: mpsc::Receiver<DecisionEntry>) {
    let flush_interval = tokio::time::Duration::from_secs(FLUSH_INTERVAL_SECS);
    let mut dirty = false;

    loop {
        match tokio::time::timeout(flush_interval, rx.recv()).await {
            Ok(Some(entry)) => {
                if let Err(err) = writer.write(&entry).await {
                    tracing::error!(%err, "failed to write decision entry");
                } else {
                    dirty = true;
                }
            }
            // All senders gone.
            Ok(None) => {
                if dirty {
                    if let Err(err) = writer.flush().await {
                        tracing::error!(%err, "failed to flush decision log on shutdown");
                    }
                }
                tracing::debug!("decision writer task shutting down");
                return;
            }
            // Idle.
            Err(_) => {
                if dirty {
                    match writer.flush().await {
                        Ok(()) => dirty = false,
                        Err(err) => tracing::error!(%err, "periodic decision log flush failed"),
                    }
                }
            }
        }
    }
}
