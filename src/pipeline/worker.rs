//! The analysis worker thread.
//!
//! Requests carry an immutable index snapshot and the document version they
//! were made for. The worker debounces them per path, runs one pass at a
//! time, and before publishing checks whether a newer version for the same
//! path arrived while the pass was running; if so the result is dropped.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;

use super::publisher::{DiagnosticBatch, DiagnosticSink, DiagnosticsPublisher};
use crate::hir::{Diagnostic, DiagnosticCollector, IndexSnapshot, check_document};

/// How often an idle worker checks for shutdown.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// One validation request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub path: PathBuf,
    pub version: u64,
    pub snapshot: Arc<IndexSnapshot>,
}

/// The checks a pass runs. Returning `None` means the pass gave up
/// (usually because `cancel` fired) and has nothing to publish.
pub trait DocumentAnalyzer: Send + Sync {
    fn analyze(&self, request: &AnalysisRequest, cancel: &CancellationToken) -> Option<Vec<Diagnostic>>;
}

/// Unresolved keywords, bad imports, duplicate definitions, ambiguity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemanticAnalyzer;

impl DocumentAnalyzer for SemanticAnalyzer {
    fn analyze(&self, request: &AnalysisRequest, cancel: &CancellationToken) -> Option<Vec<Diagnostic>> {
        if cancel.is_cancelled() {
            return None;
        }
        let diagnostics = check_document(&request.snapshot, &request.path);
        (!cancel.is_cancelled()).then_some(diagnostics)
    }
}

enum Message {
    Changed(AnalysisRequest),
    Removed(PathBuf),
    Shutdown,
}

struct InFlight {
    path: PathBuf,
    version: u64,
    cancel: CancellationToken,
}

/// Handle to the analysis worker.
///
/// `notify` never blocks on analysis. If the worker thread has died it is
/// respawned on the next notification.
pub struct AnalysisPipeline {
    sender: Mutex<Sender<Message>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    sink: Arc<dyn DiagnosticSink>,
    debounce: Duration,
    shutdown: CancellationToken,
    inflight: Arc<Mutex<Option<InFlight>>>,
    spawns: AtomicUsize,
}

impl std::fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("debounce", &self.debounce)
            .field("spawns", &self.spawns.load(Ordering::Relaxed))
            .finish()
    }
}

impl AnalysisPipeline {
    pub fn new(analyzer: Arc<dyn DocumentAnalyzer>, sink: Arc<dyn DiagnosticSink>, debounce: Duration) -> Self {
        let shutdown = CancellationToken::new();
        let inflight = Arc::new(Mutex::new(None));
        let (sender, handle) = spawn_worker(
            analyzer.clone(),
            sink.clone(),
            debounce,
            shutdown.clone(),
            inflight.clone(),
        );
        Self {
            sender: Mutex::new(sender),
            handle: Mutex::new(handle),
            analyzer,
            sink,
            debounce,
            shutdown,
            inflight,
            spawns: AtomicUsize::new(1),
        }
    }

    /// A pipeline running the standard semantic checks.
    pub fn semantic(sink: Arc<dyn DiagnosticSink>, debounce: Duration) -> Self {
        Self::new(Arc::new(SemanticAnalyzer), sink, debounce)
    }

    /// Schedule a pass for `path` at `version`. An in-flight pass for an
    /// older version of the same path is cancelled.
    pub fn notify(&self, path: &Path, version: u64, snapshot: Arc<IndexSnapshot>) {
        if let Some(inflight) = self.inflight.lock().as_ref() {
            if inflight.path == path && inflight.version < version {
                tracing::debug!(
                    path = %path.display(),
                    superseded = inflight.version,
                    version,
                    "cancelling in-flight analysis"
                );
                inflight.cancel.cancel();
            }
        }
        self.send(Message::Changed(AnalysisRequest {
            path: path.to_path_buf(),
            version,
            snapshot,
        }));
    }

    /// Drop pending work for `path` and publish an empty batch for it.
    pub fn document_removed(&self, path: &Path) {
        self.send(Message::Removed(path.to_path_buf()));
    }

    /// Number of times a worker thread was started, including the first.
    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::Relaxed)
    }

    fn send(&self, message: Message) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let mut sender = self.sender.lock();
        let Err(mpsc::SendError(message)) = sender.send(message) else {
            return;
        };
        tracing::warn!("analysis worker is gone, restarting it");
        let (new_sender, handle) = spawn_worker(
            self.analyzer.clone(),
            self.sink.clone(),
            self.debounce,
            self.shutdown.clone(),
            self.inflight.clone(),
        );
        self.spawns.fetch_add(1, Ordering::Relaxed);
        if new_sender.send(message).is_err() {
            tracing::error!("restarted analysis worker refused work");
        }
        *sender = new_sender;
        if let Some(old) = std::mem::replace(&mut *self.handle.lock(), handle) {
            let _ = old.join();
        }
    }

    /// Stop the worker and wait for it. Pending passes are dropped.
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        let _ = self.sender.lock().send(Message::Shutdown);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
        tracing::debug!("analysis pipeline stopped");
    }
}

impl Drop for AnalysisPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(
    analyzer: Arc<dyn DocumentAnalyzer>,
    sink: Arc<dyn DiagnosticSink>,
    debounce: Duration,
    shutdown: CancellationToken,
    inflight: Arc<Mutex<Option<InFlight>>>,
) -> (Sender<Message>, Option<JoinHandle<()>>) {
    let (sender, receiver) = mpsc::channel();
    let worker = Worker {
        receiver,
        analyzer,
        publisher: DiagnosticsPublisher::new(sink),
        debounce,
        shutdown,
        inflight,
        pending: IndexMap::new(),
        latest: FxHashMap::default(),
        stopping: false,
    };
    let handle = thread::Builder::new()
        .name("robotls-analysis".to_string())
        .spawn(move || worker.run());
    match handle {
        Ok(handle) => (sender, Some(handle)),
        Err(err) => {
            // The receiver was moved into the failed closure, so the next
            // send fails and triggers another spawn attempt.
            tracing::error!(error = %err, "failed to spawn analysis worker");
            (sender, None)
        }
    }
}

struct Pending {
    request: AnalysisRequest,
    due: Instant,
}

struct Worker {
    receiver: Receiver<Message>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    publisher: DiagnosticsPublisher,
    debounce: Duration,
    shutdown: CancellationToken,
    inflight: Arc<Mutex<Option<InFlight>>>,
    pending: IndexMap<PathBuf, Pending>,
    /// Newest version seen per path.
    latest: FxHashMap<PathBuf, u64>,
    stopping: bool,
}

impl Worker {
    fn run(mut self) {
        tracing::debug!("analysis worker started");
        while !self.stopping && !self.shutdown.is_cancelled() {
            let timeout = self
                .pending
                .values()
                .map(|p| p.due.saturating_duration_since(Instant::now()))
                .min()
                .unwrap_or(IDLE_POLL)
                .min(IDLE_POLL);
            match self.receiver.recv_timeout(timeout) {
                Ok(message) => self.accept(message),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.run_due();
        }
        tracing::debug!("analysis worker exiting");
    }

    fn accept(&mut self, message: Message) {
        match message {
            Message::Changed(request) => {
                let newest = self.latest.get(&request.path).copied().unwrap_or(0);
                if request.version < newest {
                    return;
                }
                self.latest.insert(request.path.clone(), request.version);
                let due = Instant::now() + self.debounce;
                self.pending
                    .insert(request.path.clone(), Pending { request, due });
            }
            Message::Removed(path) => {
                self.pending.shift_remove(&path);
                self.latest.remove(&path);
                self.publisher.clear(&path);
            }
            Message::Shutdown => self.stopping = true,
        }
    }

    fn run_due(&mut self) {
        loop {
            if self.stopping || self.shutdown.is_cancelled() {
                return;
            }
            let now = Instant::now();
            let Some(path) = self
                .pending
                .iter()
                .find(|(_, p)| p.due <= now)
                .map(|(path, _)| path.clone())
            else {
                return;
            };
            if let Some(pending) = self.pending.shift_remove(&path) {
                self.run_pass(pending.request);
            }
        }
    }

    fn run_pass(&mut self, request: AnalysisRequest) {
        let cancel = self.shutdown.child_token();
        *self.inflight.lock() = Some(InFlight {
            path: request.path.clone(),
            version: request.version,
            cancel: cancel.clone(),
        });
        tracing::debug!(path = %request.path.display(), version = request.version, "analysis pass started");

        let analyzer = self.analyzer.clone();
        let outcome = catch_unwind(AssertUnwindSafe(|| analyzer.analyze(&request, &cancel)));
        *self.inflight.lock() = None;

        // Anything that arrived during the pass may supersede it.
        while let Ok(message) = self.receiver.try_recv() {
            self.accept(message);
        }
        let superseded = self
            .latest
            .get(&request.path)
            .is_none_or(|&newest| newest > request.version);
        if superseded || cancel.is_cancelled() {
            tracing::debug!(
                path = %request.path.display(),
                version = request.version,
                "analysis result discarded as stale"
            );
            return;
        }

        let diagnostics = match outcome {
            Ok(Some(diagnostics)) => diagnostics,
            Ok(None) => return,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::warn!(path = %request.path.display(), %reason, "analysis pass panicked");
                vec![DiagnosticCollector::analysis_unavailable(&request.path, &reason)]
            }
        };
        tracing::debug!(
            path = %request.path.display(),
            version = request.version,
            count = diagnostics.len(),
            "analysis pass finished"
        );
        self.publisher.publish(DiagnosticBatch {
            path: request.path,
            version: request.version,
            diagnostics,
        });
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "analysis worker panicked".to_string()
    }
}
