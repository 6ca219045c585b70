//! On-disk workspaces backed by a temp directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use robotls::ide::AnalysisHost;
use robotls::project::WorkspaceConfig;
use tempfile::TempDir;

static TRACING: Once = Once::new();

/// Install a test subscriber once; filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Configuration that never starts an interpreter: bundled specs and the
/// static Python scan only.
pub fn offline_config() -> WorkspaceConfig {
    WorkspaceConfig {
        interpreter: Some(PathBuf::from("/nonexistent/python")),
        analysis_debounce_ms: 0,
        ..WorkspaceConfig::default()
    }
}

/// A temp directory plus an initialised host.
pub struct TestWorkspace {
    pub dir: TempDir,
    pub host: AnalysisHost,
}

impl TestWorkspace {
    /// Write `files` (relative path, content) and index the directory.
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self::with_config(files, offline_config())
    }

    pub fn with_config(files: &[(&str, &str)], config: WorkspaceConfig) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            write_file(dir.path(), name, content);
        }
        let mut host = AnalysisHost::new();
        host.init(Some(dir.path()), config);
        Self { dir, host }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Change a file on disk and in the host.
    pub fn edit(&mut self, name: &str, content: &str) -> u64 {
        let path = write_file(self.dir.path(), name, content);
        self.host.set_file_content(&path, content)
    }
}

pub fn write_file(root: &Path, name: &str, content: &str) -> PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
