//! Published diagnostics always belong to the latest version.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use robotls::hir::{Diagnostic, IndexSnapshot, codes};
use robotls::pipeline::{AnalysisPipeline, AnalysisRequest, ChannelSink, DiagnosticBatch, DocumentAnalyzer};

use crate::helpers::source_fixtures::{GREET_RESOURCE, GREET_SUITE};
use crate::helpers::workspace::{TestWorkspace, offline_config};

const WAIT: Duration = Duration::from_secs(5);

/// Collect batches for `path` until one reaches `version`.
fn batches_until(rx: &Receiver<DiagnosticBatch>, path: &std::path::Path, version: u64) -> Vec<DiagnosticBatch> {
    let deadline = Instant::now() + WAIT;
    let mut out = Vec::new();
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        let Ok(batch) = rx.recv_timeout(left) else { break };
        if batch.path != path {
            continue;
        }
        let done = batch.version >= version;
        out.push(batch);
        if done {
            return out;
        }
    }
    panic!("no batch for version {version} of {}", path.display());
}

#[test]
fn test_rapid_edits_end_on_latest_version() {
    let mut config = offline_config();
    config.analysis_debounce_ms = 30;
    let mut ws = TestWorkspace::with_config(&[("suite.robot", "*** Test Cases ***\nT\n    Log    x\n")], config);
    let (tx, rx) = mpsc::channel();
    ws.host.attach_pipeline(Arc::new(ChannelSink::new(tx)));

    for n in 0..10 {
        ws.edit("suite.robot", &format!("*** Test Cases ***\nT\n    Missing {n}\n"));
    }
    let last = ws.edit("suite.robot", "*** Test Cases ***\nT\n    Log    done\n");

    let batches = batches_until(&rx, &ws.path("suite.robot"), last);
    let versions: Vec<u64> = batches.iter().map(|b| b.version).collect();
    assert!(versions.windows(2).all(|w| w[0] <= w[1]), "{versions:?}");
    let final_batch = batches.last().unwrap();
    assert_eq!(final_batch.version, last);
    assert!(final_batch.diagnostics.is_empty(), "{:?}", final_batch.diagnostics);
    ws.host.teardown();
}

#[test]
fn test_importers_are_revalidated() {
    let mut ws = TestWorkspace::new(&[
        ("greet.resource", GREET_RESOURCE),
        ("suite.robot", GREET_SUITE),
    ]);
    let (tx, rx) = mpsc::channel();
    ws.host.attach_pipeline(Arc::new(ChannelSink::new(tx)));

    ws.edit("greet.resource", "*** Keywords ***\nSay Goodbye\n    No Operation\n");
    let suite = ws.path("suite.robot");
    let suite_version = ws.host.documents().version(&suite).unwrap();
    let batches = batches_until(&rx, &suite, suite_version);
    let diagnostics = &batches.last().unwrap().diagnostics;

    assert_eq!(diagnostics.len(), 2, "{diagnostics:?}");
    assert!(
        diagnostics
            .iter()
            .all(|d| d.code.as_deref() == Some(codes::UNDEFINED_KEYWORD))
    );
    ws.host.teardown();
}

#[test]
fn test_importer_diagnostics_clear_when_resource_gains_keyword() {
    let mut ws = TestWorkspace::new(&[
        ("greet.resource", GREET_RESOURCE),
        ("suite.robot", "*** Settings ***\nResource    greet.resource\n"),
    ]);
    let (tx, rx) = mpsc::channel();
    ws.host.attach_pipeline(Arc::new(ChannelSink::new(tx)));
    let suite = ws.path("suite.robot");

    let version = ws.edit(
        "suite.robot",
        "*** Settings ***\nResource    greet.resource\n\n*** Test Cases ***\nT\n    Say Goodbye\n",
    );
    let batches = batches_until(&rx, &suite, version);
    assert_eq!(batches.last().unwrap().diagnostics.len(), 1);

    ws.edit(
        "greet.resource",
        "*** Keywords ***\nSay Hello\n    No Operation\n\nSay Goodbye\n    No Operation\n",
    );
    let batches = batches_until(&rx, &suite, version);
    assert!(batches.last().unwrap().diagnostics.is_empty());
    ws.host.teardown();
}

/// Blocks on version 1 until cancelled; answers later versions at once.
struct Cooperative {
    started: Mutex<Option<Sender<()>>>,
    cancelled: AtomicBool,
}

impl DocumentAnalyzer for Cooperative {
    fn analyze(&self, request: &AnalysisRequest, cancel: &CancellationToken) -> Option<Vec<Diagnostic>> {
        if request.version > 1 {
            return Some(Vec::new());
        }
        if let Some(started) = self.started.lock().take() {
            let _ = started.send(());
        }
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                self.cancelled.store(true, Ordering::SeqCst);
                return None;
            }
            thread::sleep(Duration::from_millis(5));
        }
        Some(Vec::new())
    }
}

#[test]
fn test_newer_version_cancels_running_pass() {
    let (started_tx, started_rx) = mpsc::channel();
    let analyzer = Arc::new(Cooperative {
        started: Mutex::new(Some(started_tx)),
        cancelled: AtomicBool::new(false),
    });
    let (tx, rx) = mpsc::channel();
    let pipeline = AnalysisPipeline::new(analyzer.clone(), Arc::new(ChannelSink::new(tx)), Duration::ZERO);
    let path = std::path::Path::new("/virtual/slow.robot");
    let snapshot = Arc::new(IndexSnapshot::default());

    pipeline.notify(path, 1, snapshot.clone());
    started_rx.recv_timeout(WAIT).unwrap();
    pipeline.notify(path, 2, snapshot);

    let batch = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(batch.version, 2);
    assert!(analyzer.cancelled.load(Ordering::SeqCst));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    pipeline.shutdown();
}
