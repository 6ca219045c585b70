//! An in-process interpreter that answers commands from a script.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use robotls::DebugError;
use robotls::debug::DebugTransport;
use robotls::debug::protocol::{Command, Event, FrameInfo, StopReason, VariableValue};

#[derive(Default)]
pub struct ScriptState {
    pub sent: Vec<Command>,
    /// 1-based lines armed per the last `setBreakpoints`.
    pub armed: Vec<u32>,
    /// Lines executed in order; each resume runs to the next stop.
    pub program: VecDeque<u32>,
    pub queue: VecDeque<Event>,
    pub terminated: bool,
}

/// Runs a flat list of lines in `path`: `continue` stops at the next armed
/// line, any step stops at the next line, running off the end terminates.
#[derive(Clone)]
pub struct ScriptedInterpreter {
    pub path: PathBuf,
    pub state: Arc<Mutex<ScriptState>>,
}

impl ScriptedInterpreter {
    pub fn new(path: PathBuf, program: &[u32]) -> Self {
        let state = ScriptState {
            program: program.iter().copied().collect(),
            ..ScriptState::default()
        };
        Self {
            path,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn sent(&self) -> Vec<Command> {
        self.state.lock().sent.clone()
    }

    fn stop_at(&self, state: &mut ScriptState, line: u32, reason: StopReason) {
        state.queue.push_back(Event::Stopped {
            reason,
            frames: vec![FrameInfo {
                name: "Greets".to_string(),
                kind: "test".to_string(),
                path: self.path.clone(),
                line,
                variables: vec![VariableValue {
                    name: "${LINE}".to_string(),
                    value: line.to_string(),
                }],
                arguments: Vec::new(),
            }],
        });
    }

    fn run(&self, state: &mut ScriptState, step: bool) {
        while let Some(line) = state.program.pop_front() {
            if step {
                self.stop_at(state, line, StopReason::Step);
                return;
            }
            if state.armed.contains(&line) {
                self.stop_at(state, line, StopReason::Breakpoint);
                return;
            }
            state.queue.push_back(Event::Output {
                category: "stdout".to_string(),
                output: format!("ran line {line}\n"),
            });
        }
        state.queue.push_back(Event::Terminated { exit_code: Some(0) });
    }
}

impl DebugTransport for ScriptedInterpreter {
    fn send(&mut self, command: &Command) -> Result<(), DebugError> {
        let mut state = self.state.lock();
        if state.terminated {
            return Err(DebugError::Transport("debuggee input is closed".to_string()));
        }
        state.sent.push(command.clone());
        match command {
            Command::SetBreakpoints { lines, .. } => state.armed = lines.clone(),
            Command::Continue => self.run(&mut state, false),
            Command::StepIn | Command::StepOver | Command::StepOut => self.run(&mut state, true),
            Command::Pause => {
                if let Some(&line) = state.program.front() {
                    self.stop_at(&mut state, line, StopReason::Pause);
                }
            }
            Command::Terminate => state.terminated = true,
        }
        Ok(())
    }

    fn try_recv(&mut self) -> Option<Event> {
        self.state.lock().queue.pop_front()
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> Option<Event> {
        self.try_recv()
    }

    fn terminate(&mut self, _grace: Duration) -> Option<i32> {
        self.state.lock().terminated = true;
        Some(0)
    }
}
