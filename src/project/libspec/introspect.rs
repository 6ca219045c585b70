//! Producing specs for libraries that are not cached yet.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{ChildStderr, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wait_timeout::ChildExt;

use super::builtin::bundled_spec;
use super::libdoc::parse_libdoc_json;
use super::python_scan::scan_python_source;
use super::{LibrarySpec, LibspecError, SpecOrigin};
use crate::base::Fingerprint;

/// What a library import points at once file lookup is done.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LibraryTarget {
    /// A library source file: a path import, or a module found under a
    /// search root.
    File(PathBuf),
    /// A module name that only the interpreter (or the bundled specs) know.
    Module(String),
}

impl LibraryTarget {
    /// Stable identity used in cache keys and persisted file names.
    pub fn identity(&self) -> String {
        match self {
            LibraryTarget::File(path) => path.to_string_lossy().into_owned(),
            LibraryTarget::Module(name) => name.clone(),
        }
    }

    /// Argument handed to libdoc.
    fn libdoc_name(&self) -> String {
        self.identity()
    }

    /// Name shown to users: module name or file stem.
    pub fn display_name(&self) -> String {
        match self {
            LibraryTarget::File(path) => {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                if stem == "__init__" {
                    path.parent()
                        .and_then(|p| p.file_name())
                        .and_then(|n| n.to_str())
                        .unwrap_or(stem)
                        .to_string()
                } else {
                    stem.to_string()
                }
            }
            LibraryTarget::Module(name) => name.clone(),
        }
    }
}

/// Everything an introspector may use.
#[derive(Debug, Clone, Copy)]
pub struct IntrospectRequest<'a> {
    pub target: &'a LibraryTarget,
    pub args: &'a [String],
    pub interpreter: Option<&'a Path>,
    pub search_paths: &'a [PathBuf],
    /// Fingerprint the resulting spec is stamped with.
    pub fingerprint: Fingerprint,
}

/// Produces a spec for one library. Implementations may block (process
/// spawns, file reads); they only run while the index is being patched.
pub trait LibraryIntrospector: Send + Sync {
    fn introspect(&self, request: &IntrospectRequest<'_>) -> Result<LibrarySpec, LibspecError>;
}

/// Libdoc through the interpreter when one is configured, with static
/// scanning and bundled specs as fallbacks.
#[derive(Debug, Clone)]
pub struct DefaultIntrospector {
    timeout: Duration,
}

impl Default for DefaultIntrospector {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl DefaultIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run_libdoc(
        &self,
        interpreter: &Path,
        request: &IntrospectRequest<'_>,
    ) -> Result<LibrarySpec, LibspecError> {
        let name = request.target.libdoc_name();
        let mut target_arg = name.clone();
        for arg in request.args {
            target_arg.push_str("::");
            target_arg.push_str(arg);
        }

        let scratch = tempfile::tempdir()?;
        let out = scratch.path().join("spec.json");

        let mut cmd = Command::new(interpreter);
        cmd.args(["-m", "robot.libdoc", "--format", "JSON"]);
        for root in request.search_paths {
            cmd.arg("--pythonpath").arg(root);
        }
        cmd.arg(&target_arg)
            .arg(&out)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        tracing::debug!(library = %name, interpreter = %interpreter.display(), "running libdoc");
        let mut child = cmd.spawn()?;
        let stderr = match child.stderr.take().map(drain_stderr).transpose() {
            Ok(stderr) => stderr,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        };
        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            waited => {
                let _ = child.kill();
                let _ = child.wait();
                waited?;
                return Err(LibspecError::Timeout(name));
            }
        };
        let stderr = stderr
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(LibspecError::Libdoc {
                name,
                message: stderr.trim().to_string(),
            });
        }
        let json = fs::read_to_string(&out)?;
        parse_libdoc_json(&json, request.fingerprint, SpecOrigin::Libdoc)
    }

    fn static_scan(&self, path: &Path, fingerprint: Fingerprint) -> Result<LibrarySpec, LibspecError> {
        let is_python = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("py"));
        if !is_python {
            return Err(LibspecError::NotFound(path.display().to_string()));
        }
        let source = fs::read_to_string(path)?;
        Ok(scan_python_source(path, &source, fingerprint))
    }

    fn bundled(&self, name: &str, fingerprint: Fingerprint) -> Result<LibrarySpec, LibspecError> {
        let spec = bundled_spec(name).ok_or_else(|| LibspecError::NotFound(name.to_string()))?;
        let mut spec = (*spec).clone();
        spec.fingerprint = fingerprint;
        Ok(spec)
    }
}

/// Collects stderr while the child runs so a chatty libdoc cannot fill the pipe.
fn drain_stderr(mut pipe: ChildStderr) -> std::io::Result<JoinHandle<String>> {
    thread::Builder::new()
        .name("libdoc-stderr".to_string())
        .spawn(move || {
            let mut text = String::new();
            let _ = pipe.read_to_string(&mut text);
            text
        })
}

impl LibraryIntrospector for DefaultIntrospector {
    fn introspect(&self, request: &IntrospectRequest<'_>) -> Result<LibrarySpec, LibspecError> {
        match request.target {
            LibraryTarget::File(path) => match request.interpreter {
                Some(interpreter) => self.run_libdoc(interpreter, request).or_else(|e| {
                    tracing::warn!(path = %path.display(), "libdoc failed, scanning source: {e}");
                    self.static_scan(path, request.fingerprint)
                }),
                None => self.static_scan(path, request.fingerprint),
            },
            LibraryTarget::Module(name) => {
                if name == crate::base::constants::BUILTIN_LIBRARY {
                    return self.bundled(name, request.fingerprint);
                }
                match request.interpreter {
                    Some(interpreter) => self.run_libdoc(interpreter, request).or_else(|e| {
                        tracing::warn!(library = %name, "libdoc failed: {e}");
                        self.bundled(name, request.fingerprint).map_err(|_| e)
                    }),
                    None => self.bundled(name, request.fingerprint),
                }
            }
        }
    }
}
