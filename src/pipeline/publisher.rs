//! Version-checked diagnostic publishing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;

use rustc_hash::FxHashMap;

use crate::hir::Diagnostic;

/// Diagnostics for one document version. Replaces any earlier batch for
/// the same path wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticBatch {
    pub path: PathBuf,
    pub version: u64,
    pub diagnostics: Vec<Diagnostic>,
}

/// Where published batches go (an editor connection, a test channel).
pub trait DiagnosticSink: Send + Sync {
    fn publish(&self, batch: DiagnosticBatch);
}

impl<F> DiagnosticSink for F
where
    F: Fn(DiagnosticBatch) + Send + Sync,
{
    fn publish(&self, batch: DiagnosticBatch) {
        self(batch)
    }
}

/// Sink forwarding batches into a channel.
pub struct ChannelSink(Sender<DiagnosticBatch>);

impl ChannelSink {
    pub fn new(sender: Sender<DiagnosticBatch>) -> Self {
        Self(sender)
    }
}

impl DiagnosticSink for ChannelSink {
    fn publish(&self, batch: DiagnosticBatch) {
        if self.0.send(batch).is_err() {
            tracing::debug!("diagnostic receiver dropped");
        }
    }
}

/// Forwards batches to a sink, refusing any batch older than one already
/// published for the same path.
pub struct DiagnosticsPublisher {
    sink: Arc<dyn DiagnosticSink>,
    published: FxHashMap<PathBuf, u64>,
}

impl DiagnosticsPublisher {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            published: FxHashMap::default(),
        }
    }

    /// Publish `batch` unless it is stale. Returns whether it was sent.
    pub fn publish(&mut self, batch: DiagnosticBatch) -> bool {
        match self.published.get(&batch.path) {
            Some(&last) if last > batch.version => {
                tracing::debug!(
                    path = %batch.path.display(),
                    version = batch.version,
                    published = last,
                    "stale diagnostics rejected"
                );
                return false;
            }
            _ => {}
        }
        self.published.insert(batch.path.clone(), batch.version);
        tracing::debug!(
            path = %batch.path.display(),
            version = batch.version,
            count = batch.diagnostics.len(),
            "publishing diagnostics"
        );
        self.sink.publish(batch);
        true
    }

    /// Publish an empty batch for a closed document and forget it.
    pub fn clear(&mut self, path: &Path) {
        let version = self.published.remove(path).unwrap_or_default();
        self.sink.publish(DiagnosticBatch {
            path: path.to_path_buf(),
            version,
            diagnostics: Vec::new(),
        });
    }

    pub fn last_published(&self, path: &Path) -> Option<u64> {
        self.published.get(path).copied()
    }
}
