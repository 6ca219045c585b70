//! Debug session state machine.
//!
//! ```text
//! Idle ──launch──► Launching ──► Running ◄──continue/step── Paused
//!   ▲                  │            │  ──stopped event──►      │
//!   └── launch error ──┘            └──────► Terminated ◄──────┘
//! ```
//!
//! Frame ids and variable references carry the stop generation they were
//! issued in. Resuming execution bumps the generation, so every handle from
//! an earlier stop is rejected afterwards.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use super::breakpoints::{Breakpoint, validate_breakpoints};
use super::launch::{self, LaunchConfig};
use super::protocol::{Command, Event, FrameInfo, StopReason, VariableValue};
use super::transport::DebugTransport;
use crate::base::paths;
use crate::hir::{IndexSnapshot, normalize_variable};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum DebugError {
    #[error("launch failed: {0}")]
    Launch(String),
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: DebugState,
    },
    #[error("invalid or expired handle {0}")]
    InvalidHandle(u64),
    #[error("debuggee connection failed: {0}")]
    Transport(String),
    #[error("cannot evaluate '{0}'")]
    Evaluate(String),
}

// ============================================================================
// CLIENT-FACING TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugState {
    Idle,
    Launching,
    Running,
    Paused,
    Terminated,
}

/// Events for the client, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    Stopped { reason: StopReason, frames: usize },
    Continued,
    Output { category: String, output: String },
    Terminated { exit_code: Option<i32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub id: u64,
    pub name: String,
    pub kind: String,
    pub path: PathBuf,
    /// 0-based.
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub name: &'static str,
    pub variables_reference: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

const SCOPE_NAMES: [&str; 2] = ["Variables", "Arguments"];

// ============================================================================
// ADAPTER
// ============================================================================

/// One debug session: at most one debuggee, its breakpoints, and the frames
/// of the current stop.
pub struct DebugAdapter {
    id: Uuid,
    state: DebugState,
    transport: Option<Box<dyn DebugTransport>>,
    breakpoints: IndexMap<PathBuf, Vec<Breakpoint>>,
    next_breakpoint_id: u64,
    generation: u32,
    frames: Vec<FrameInfo>,
    events: VecDeque<DebugEvent>,
    exit_code: Option<i32>,
    grace: Duration,
}

impl Default for DebugAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DebugAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugAdapter")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("frames", &self.frames.len())
            .finish()
    }
}

impl DebugAdapter {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: DebugState::Idle,
            transport: None,
            breakpoints: IndexMap::new(),
            next_breakpoint_id: 0,
            generation: 0,
            frames: Vec::new(),
            events: VecDeque::new(),
            exit_code: None,
            grace: Duration::from_millis(300),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> DebugState {
        self.state
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Spawn the debuggee described by `config` and start it.
    ///
    /// On failure the session is back in `Idle` and nothing is left running.
    pub fn launch(&mut self, config: &LaunchConfig) -> Result<(), DebugError> {
        self.require(&[DebugState::Idle], "launch")?;
        self.transition(DebugState::Launching);
        self.grace = Duration::from_millis(config.grace_ms);
        match launch::spawn(config) {
            Ok(transport) => self.attach(Box::new(transport)),
            Err(err) => {
                tracing::warn!(session = %self.id, error = %err, "launch failed");
                self.transition(DebugState::Idle);
                Err(err)
            }
        }
    }

    /// Start a session over an already connected transport. Armed
    /// breakpoints are sent before execution continues.
    pub fn attach(&mut self, mut transport: Box<dyn DebugTransport>) -> Result<(), DebugError> {
        self.require(&[DebugState::Idle, DebugState::Launching], "attach")?;
        self.transition(DebugState::Launching);
        let commands: Vec<Command> = self
            .breakpoints
            .iter()
            .map(|(path, breakpoints)| armed_command(path, breakpoints))
            .chain(std::iter::once(Command::Continue))
            .collect();
        for command in &commands {
            if let Err(err) = transport.send(command) {
                transport.terminate(Duration::ZERO);
                self.transition(DebugState::Idle);
                return Err(DebugError::Launch(err.to_string()));
            }
        }
        self.transport = Some(transport);
        self.exit_code = None;
        self.transition(DebugState::Running);
        Ok(())
    }

    /// Replace the breakpoints of `path`. Each line is checked against the
    /// indexed document; lines outside executable statements are returned
    /// unverified and not armed.
    pub fn set_breakpoints(
        &mut self,
        snapshot: &IndexSnapshot,
        path: &Path,
        lines: &[u32],
    ) -> Result<Vec<Breakpoint>, DebugError> {
        self.require(
            &[DebugState::Idle, DebugState::Launching, DebugState::Running, DebugState::Paused],
            "set breakpoints",
        )?;
        let path = paths::normalize(path);
        let tree = snapshot.document(&path).map(|entry| entry.document.tree.as_ref());
        let breakpoints = validate_breakpoints(&path, tree, lines, &mut self.next_breakpoint_id);
        tracing::debug!(
            session = %self.id,
            path = %path.display(),
            armed = breakpoints.iter().filter(|b| b.verified).count(),
            requested = lines.len(),
            "breakpoints set"
        );
        if let Some(transport) = self.transport.as_mut() {
            transport.send(&armed_command(&path, &breakpoints))?;
        }
        self.breakpoints.insert(path, breakpoints.clone());
        Ok(breakpoints)
    }

    pub fn breakpoints(&self, path: &Path) -> &[Breakpoint] {
        self.breakpoints
            .get(&paths::normalize(path))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn continue_(&mut self) -> Result<(), DebugError> {
        self.resume(Command::Continue, "continue")
    }

    pub fn step_in(&mut self) -> Result<(), DebugError> {
        self.resume(Command::StepIn, "step in")
    }

    pub fn step_over(&mut self) -> Result<(), DebugError> {
        self.resume(Command::StepOver, "step over")
    }

    pub fn step_out(&mut self) -> Result<(), DebugError> {
        self.resume(Command::StepOut, "step out")
    }

    /// Ask a running debuggee to stop. The stop itself arrives later as an
    /// event.
    pub fn pause(&mut self) -> Result<(), DebugError> {
        self.require(&[DebugState::Running], "pause")?;
        self.send(&Command::Pause)
    }

    /// End the session. The debuggee is terminated and all frame state is
    /// dropped. Stopping an already terminated session is a no-op.
    pub fn stop(&mut self) {
        if self.state == DebugState::Terminated {
            return;
        }
        if let Some(mut transport) = self.transport.take() {
            let code = transport.terminate(self.grace);
            self.exit_code = self.exit_code.or(code);
        }
        self.terminated();
    }

    /// Frames of the current stop, innermost first.
    pub fn stack_trace(&self) -> Result<Vec<StackFrame>, DebugError> {
        self.require(&[DebugState::Paused], "get stack trace")?;
        Ok(self
            .frames
            .iter()
            .enumerate()
            .map(|(index, frame)| StackFrame {
                id: self.handle(index as u32),
                name: frame.name.clone(),
                kind: frame.kind.clone(),
                path: frame.path.clone(),
                line: frame.line.saturating_sub(1),
            })
            .collect())
    }

    pub fn scopes(&self, frame_id: u64) -> Result<Vec<Scope>, DebugError> {
        let index = self.frame_index(frame_id)?;
        Ok(SCOPE_NAMES
            .iter()
            .enumerate()
            .map(|(scope, name)| Scope {
                name: *name,
                variables_reference: self.handle((index * 2 + scope) as u32),
            })
            .collect())
    }

    /// Snapshot values of one scope.
    pub fn variables(&self, reference: u64) -> Result<Vec<Variable>, DebugError> {
        let slot = self.decode(reference)? as usize;
        let frame = self
            .frames
            .get(slot / 2)
            .ok_or(DebugError::InvalidHandle(reference))?;
        let values = if slot % 2 == 0 {
            &frame.variables
        } else {
            &frame.arguments
        };
        Ok(values.iter().map(to_variable).collect())
    }

    /// Evaluate a variable reference (`${name}`, `@{name}`, `&{name}`)
    /// against a frame of the current stop; the innermost frame when
    /// `frame_id` is `None`.
    pub fn evaluate(&self, expression: &str, frame_id: Option<u64>) -> Result<String, DebugError> {
        self.require(&[DebugState::Paused], "evaluate")?;
        let index = match frame_id {
            Some(id) => self.frame_index(id)?,
            None => 0,
        };
        let frame = self
            .frames
            .get(index)
            .ok_or_else(|| DebugError::Evaluate(expression.to_string()))?;
        let wanted =
            normalize_variable(expression).ok_or_else(|| DebugError::Evaluate(expression.to_string()))?;
        frame
            .variables
            .iter()
            .chain(&frame.arguments)
            .find(|v| normalize_variable(&v.name).is_some_and(|n| n == wanted))
            .map(|v| v.value.clone())
            .ok_or_else(|| DebugError::Evaluate(expression.to_string()))
    }

    /// Apply every queued interpreter event and return the resulting client
    /// events. Never blocks.
    pub fn poll_events(&mut self) -> Vec<DebugEvent> {
        while let Some(event) = self.transport.as_mut().and_then(|t| t.try_recv()) {
            self.apply(event);
        }
        self.events.drain(..).collect()
    }

    /// Wait up to `timeout` for the next client event.
    pub fn wait_event(&mut self, timeout: Duration) -> Option<DebugEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.events.pop_front() {
                return Some(event);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            let transport = self.transport.as_mut()?;
            let event = transport.recv_timeout(remaining)?;
            self.apply(event);
        }
    }

    // ------------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------------

    fn require(&self, allowed: &[DebugState], operation: &'static str) -> Result<(), DebugError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(DebugError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, next: DebugState) {
        if self.state != next {
            tracing::debug!(session = %self.id, from = ?self.state, to = ?next, "debug state");
            self.state = next;
        }
    }

    fn send(&mut self, command: &Command) -> Result<(), DebugError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| DebugError::Transport("no debuggee attached".to_string()))?;
        transport.send(command)
    }

    fn resume(&mut self, command: Command, operation: &'static str) -> Result<(), DebugError> {
        self.require(&[DebugState::Paused], operation)?;
        self.send(&command)?;
        self.invalidate_frames();
        self.transition(DebugState::Running);
        self.events.push_back(DebugEvent::Continued);
        Ok(())
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::Started => tracing::debug!(session = %self.id, "debuggee started"),
            Event::Stopped { reason, frames } => {
                if self.state != DebugState::Running {
                    tracing::debug!(session = %self.id, state = ?self.state, "ignoring stop");
                    return;
                }
                self.invalidate_frames();
                let count = frames.len();
                self.frames = frames;
                self.transition(DebugState::Paused);
                self.events.push_back(DebugEvent::Stopped {
                    reason,
                    frames: count,
                });
            }
            Event::Output { category, output } => {
                self.events.push_back(DebugEvent::Output { category, output });
            }
            Event::Terminated { exit_code } => {
                self.exit_code = exit_code;
                if let Some(mut transport) = self.transport.take() {
                    let code = transport.terminate(Duration::ZERO);
                    self.exit_code = self.exit_code.or(code);
                }
                self.terminated();
            }
        }
    }

    fn terminated(&mut self) {
        self.invalidate_frames();
        self.transition(DebugState::Terminated);
        tracing::info!(session = %self.id, exit_code = ?self.exit_code, "debug session terminated");
        self.events.push_back(DebugEvent::Terminated {
            exit_code: self.exit_code,
        });
    }

    fn invalidate_frames(&mut self) {
        self.frames.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    fn handle(&self, slot: u32) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(slot + 1)
    }

    fn decode(&self, handle: u64) -> Result<u32, DebugError> {
        let generation = (handle >> 32) as u32;
        let slot = (handle & u64::from(u32::MAX)) as u32;
        if self.state != DebugState::Paused || generation != self.generation || slot == 0 {
            return Err(DebugError::InvalidHandle(handle));
        }
        Ok(slot - 1)
    }

    fn frame_index(&self, frame_id: u64) -> Result<usize, DebugError> {
        let index = self.decode(frame_id)? as usize;
        if index < self.frames.len() {
            Ok(index)
        } else {
            Err(DebugError::InvalidHandle(frame_id))
        }
    }
}

impl Drop for DebugAdapter {
    fn drop(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.terminate(Duration::ZERO);
        }
    }
}

fn armed_command(path: &Path, breakpoints: &[Breakpoint]) -> Command {
    Command::SetBreakpoints {
        path: path.to_path_buf(),
        lines: breakpoints
            .iter()
            .filter(|b| b.verified)
            .map(|b| b.line + 1)
            .collect(),
    }
}

fn to_variable(value: &VariableValue) -> Variable {
    Variable {
        name: value.name.clone(),
        value: value.value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::WorkspaceIndex;
    use crate::project::{DocumentStore, LibrarySpecCache, WorkspaceConfig};
    use parking_lot::Mutex;
    use rustc_hash::FxHashMap;
    use std::sync::Arc;

    const SUITE: &str = "\
*** Test Cases ***
Login
    Open Browser    url

    # comment
    Log    done
";

    #[derive(Default)]
    struct FakeState {
        sent: Vec<Command>,
        queue: VecDeque<Event>,
        armed: FxHashMap<PathBuf, Vec<u32>>,
        terminated: bool,
    }

    /// Records commands and stops when the test "executes" an armed line.
    #[derive(Clone, Default)]
    struct FakeInterpreter(Arc<Mutex<FakeState>>);

    impl FakeInterpreter {
        fn execute(&self, path: &Path, line: u32, variables: &[(&str, &str)]) {
            let mut state = self.0.lock();
            let armed = state.armed.get(path).is_some_and(|lines| lines.contains(&line));
            if armed {
                let frame = FrameInfo {
                    name: "Open Browser".to_string(),
                    kind: "keyword".to_string(),
                    path: path.to_path_buf(),
                    line,
                    variables: variables
                        .iter()
                        .map(|(name, value)| VariableValue {
                            name: name.to_string(),
                            value: value.to_string(),
                        })
                        .collect(),
                    arguments: vec![VariableValue {
                        name: "${url}".to_string(),
                        value: "url".to_string(),
                    }],
                };
                state.queue.push_back(Event::Stopped {
                    reason: StopReason::Breakpoint,
                    frames: vec![frame],
                });
            }
        }

        fn emit(&self, event: Event) {
            self.0.lock().queue.push_back(event);
        }

        fn sent(&self) -> Vec<Command> {
            self.0.lock().sent.clone()
        }
    }

    impl DebugTransport for FakeInterpreter {
        fn send(&mut self, command: &Command) -> Result<(), DebugError> {
            let mut state = self.0.lock();
            if let Command::SetBreakpoints { path, lines } = command {
                state.armed.insert(path.clone(), lines.clone());
            }
            state.sent.push(command.clone());
            Ok(())
        }

        fn try_recv(&mut self) -> Option<Event> {
            self.0.lock().queue.pop_front()
        }

        fn recv_timeout(&mut self, _timeout: Duration) -> Option<Event> {
            self.try_recv()
        }

        fn terminate(&mut self, _grace: Duration) -> Option<i32> {
            self.0.lock().terminated = true;
            Some(0)
        }
    }

    fn snapshot() -> (PathBuf, Arc<IndexSnapshot>) {
        let index = WorkspaceIndex::new(Arc::new(LibrarySpecCache::default()));
        index.init(
            None,
            WorkspaceConfig {
                interpreter: Some(PathBuf::from("/nonexistent/python")),
                ..WorkspaceConfig::default()
            },
        );
        let mut store = DocumentStore::new();
        let path = PathBuf::from("/w/suite.robot");
        store.upsert(&path, SUITE);
        let snapshot = index.on_document_changed(store.get(&path).unwrap());
        (path, snapshot)
    }

    /// Adapter with breakpoints on lines 2 and 3, stopped at line 2.
    fn paused() -> (DebugAdapter, FakeInterpreter, PathBuf) {
        let (path, snapshot) = snapshot();
        let fake = FakeInterpreter::default();
        let mut adapter = DebugAdapter::new();
        adapter.set_breakpoints(&snapshot, &path, &[2, 3]).unwrap();
        adapter.attach(Box::new(fake.clone())).unwrap();
        fake.execute(&path, 3, &[("${x}", "42")]);
        adapter.poll_events();
        (adapter, fake, path)
    }

    #[test]
    fn test_step_while_running_is_rejected() {
        let mut adapter = DebugAdapter::new();
        adapter.attach(Box::new(FakeInterpreter::default())).unwrap();
        assert_eq!(adapter.state(), DebugState::Running);

        let err = adapter.step_over().unwrap_err();
        assert!(matches!(
            err,
            DebugError::InvalidState {
                state: DebugState::Running,
                ..
            }
        ));
        assert_eq!(adapter.state(), DebugState::Running);
        assert!(adapter.continue_().is_err());
        assert!(adapter.stack_trace().is_err());
    }

    #[test]
    fn test_breakpoint_on_call_line_pauses() {
        let (path, snapshot) = snapshot();
        let fake = FakeInterpreter::default();
        let mut adapter = DebugAdapter::new();

        let bps = adapter.set_breakpoints(&snapshot, &path, &[3, 2]).unwrap();
        assert!(!bps[0].verified);
        assert!(bps[0].message.is_some());
        assert!(bps[1].verified);

        adapter.attach(Box::new(fake.clone())).unwrap();
        assert_eq!(
            fake.sent(),
            vec![
                Command::SetBreakpoints {
                    path: path.clone(),
                    lines: vec![3],
                },
                Command::Continue,
            ]
        );

        // The blank line is never armed.
        fake.execute(&path, 4, &[]);
        assert!(adapter.poll_events().is_empty());

        fake.execute(&path, 3, &[]);
        let events = adapter.poll_events();
        assert_eq!(
            events,
            vec![DebugEvent::Stopped {
                reason: StopReason::Breakpoint,
                frames: 1,
            }]
        );
        assert_eq!(adapter.state(), DebugState::Paused);
        let frames = adapter.stack_trace().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].line, 2);
    }

    #[test]
    fn test_handles_expire_on_continue() {
        let (mut adapter, _fake, _path) = paused();
        let frame = adapter.stack_trace().unwrap()[0].id;
        let scopes = adapter.scopes(frame).unwrap();
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].name, "Variables");

        let vars = adapter.variables(scopes[0].variables_reference).unwrap();
        assert_eq!(vars[0].value, "42");
        let args = adapter.variables(scopes[1].variables_reference).unwrap();
        assert_eq!(args[0].name, "${url}");

        adapter.continue_().unwrap();
        assert_eq!(adapter.poll_events(), vec![DebugEvent::Continued]);
        assert!(matches!(
            adapter.variables(scopes[0].variables_reference),
            Err(DebugError::InvalidHandle(_))
        ));
        assert!(adapter.scopes(frame).is_err());
    }

    #[test]
    fn test_evaluate_variables() {
        let (adapter, _fake, _path) = paused();
        assert_eq!(adapter.evaluate("${x}", None).unwrap(), "42");
        assert_eq!(adapter.evaluate("${ URL }", None).unwrap(), "url");
        assert!(matches!(
            adapter.evaluate("${missing}", None),
            Err(DebugError::Evaluate(_))
        ));
        assert!(adapter.evaluate("1 + 1", None).is_err());
    }

    #[test]
    fn test_pause_only_while_running() {
        let (mut adapter, fake, _path) = paused();
        assert!(adapter.pause().is_err());
        adapter.step_in().unwrap();
        adapter.pause().unwrap();
        assert_eq!(fake.sent().last(), Some(&Command::Pause));
    }

    #[test]
    fn test_stop_discards_frames() {
        let (mut adapter, fake, _path) = paused();
        adapter.stop();
        assert_eq!(adapter.state(), DebugState::Terminated);
        assert!(fake.0.lock().terminated);
        assert_eq!(
            adapter.poll_events(),
            vec![DebugEvent::Terminated { exit_code: Some(0) }]
        );
        assert!(adapter.stack_trace().is_err());
        assert!(adapter.step_over().is_err());
        adapter.stop();
        assert!(adapter.poll_events().is_empty());
    }

    #[test]
    fn test_debuggee_exit_and_output() {
        let mut adapter = DebugAdapter::new();
        let fake = FakeInterpreter::default();
        adapter.attach(Box::new(fake.clone())).unwrap();
        fake.emit(Event::Output {
            category: "stdout".to_string(),
            output: "PASS\n".to_string(),
        });
        fake.emit(Event::Terminated { exit_code: Some(3) });

        let events = adapter.poll_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], DebugEvent::Terminated { exit_code: Some(3) });
        assert_eq!(adapter.exit_code(), Some(3));
        assert_eq!(adapter.state(), DebugState::Terminated);
    }

    #[test]
    fn test_failed_launch_returns_to_idle() {
        let mut adapter = DebugAdapter::new();
        let mut config = LaunchConfig::new("/w/suite.robot");
        config.interpreter = Some(PathBuf::from("/nonexistent/python"));
        assert!(matches!(adapter.launch(&config), Err(DebugError::Launch(_))));
        assert_eq!(adapter.state(), DebugState::Idle);
    }
}
