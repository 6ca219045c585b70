//! Channel to the debuggee.
//!
//! Commands are written in order on the caller's thread. Events are read by
//! background threads and queued, so sending a step never waits for the
//! resulting stop.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ExitStatus};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use super::DebugError;
use super::protocol::{Command, Event};

/// How long to wait for an exit status once stdout has closed.
const EXIT_STATUS_WAIT: Duration = Duration::from_millis(500);

const EXIT_POLL: Duration = Duration::from_millis(10);

/// Ordered command sink plus queued event source.
pub trait DebugTransport: Send {
    fn send(&mut self, command: &Command) -> Result<(), DebugError>;

    /// Next queued event, without waiting.
    fn try_recv(&mut self) -> Option<Event>;

    /// Next event, waiting at most `timeout`.
    fn recv_timeout(&mut self, timeout: Duration) -> Option<Event>;

    /// Stop the debuggee, killing it if it outlives `grace`. Returns its
    /// exit code when known.
    fn terminate(&mut self, grace: Duration) -> Option<i32>;
}

/// Transport over a child process's stdin/stdout.
pub struct ChildProcessTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    events: Receiver<Event>,
    exited: bool,
}

impl std::fmt::Debug for ChildProcessTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcessTransport")
            .field("pid", &self.child.id())
            .field("exited", &self.exited)
            .finish()
    }
}

impl ChildProcessTransport {
    /// Take over the pipes of a spawned child and start the reader threads.
    /// The child is killed when any of that fails.
    pub fn new(mut child: Child) -> Result<Self, DebugError> {
        match Self::attach_pipes(&mut child) {
            Ok((stdin, events)) => Ok(Self {
                child,
                stdin: Some(stdin),
                events,
                exited: false,
            }),
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(err)
            }
        }
    }

    fn attach_pipes(child: &mut Child) -> Result<(ChildStdin, Receiver<Event>), DebugError> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DebugError::Transport("failed to capture stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DebugError::Transport("failed to capture stdout".to_string()))?;
        let (sender, events) = mpsc::channel();

        // Readers end on their own when the pipes close.
        let out = sender.clone();
        spawn_reader("robotls-debug-stdout", move || read_events(stdout, out))?;
        if let Some(stderr) = child.stderr.take() {
            spawn_reader("robotls-debug-stderr", move || read_stderr(stderr, sender))?;
        }
        Ok((stdin, events))
    }

    /// Poll the process for up to `window`. `None` while it is still running.
    pub fn exit_within(&mut self, window: Duration) -> io::Result<Option<ExitStatus>> {
        let deadline = Instant::now() + window;
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.exited = true;
                return Ok(Some(status));
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Ok(None);
            }
            thread::sleep(EXIT_POLL.min(left));
        }
    }

    /// Everything the process wrote to stderr, once it has exited.
    pub fn collect_stderr(&mut self) -> String {
        let deadline = Instant::now() + EXIT_STATUS_WAIT;
        let mut stderr = String::new();
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(left) {
                Ok(Event::Output { category, output }) if category == "stderr" => {
                    stderr.push_str(&output);
                }
                Ok(_) => {}
                Err(_) => return stderr,
            }
        }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Stdout EOF is reported without a code; fill it in from the process.
    fn complete(&mut self, event: Event) -> Event {
        match event {
            Event::Terminated { exit_code: None } => {
                self.exited = true;
                let exit_code = match self.child.wait_timeout(EXIT_STATUS_WAIT) {
                    Ok(Some(status)) => status.code(),
                    _ => None,
                };
                Event::Terminated { exit_code }
            }
            Event::Terminated { exit_code } => {
                self.exited = true;
                Event::Terminated { exit_code }
            }
            other => other,
        }
    }
}

fn spawn_reader(name: &str, body: impl FnOnce() + Send + 'static) -> Result<(), DebugError> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map(drop)
        .map_err(|e| DebugError::Transport(format!("failed to start reader thread: {e}")))
}

fn read_events(stdout: impl Read, sender: Sender<Event>) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        let event = Event::from_line(&line);
        let last = matches!(event, Event::Terminated { .. });
        if sender.send(event).is_err() || last {
            return;
        }
    }
    tracing::debug!("debuggee stdout closed");
    let _ = sender.send(Event::Terminated { exit_code: None });
}

fn read_stderr(stderr: impl Read, sender: Sender<Event>) {
    let reader = BufReader::new(stderr);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        let event = Event::Output {
            category: "stderr".to_string(),
            output: format!("{line}\n"),
        };
        if sender.send(event).is_err() {
            return;
        }
    }
}

impl DebugTransport for ChildProcessTransport {
    fn send(&mut self, command: &Command) -> Result<(), DebugError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DebugError::Transport("debuggee input is closed".to_string()))?;
        let line = command
            .to_line()
            .map_err(|e| DebugError::Transport(e.to_string()))?;
        stdin
            .write_all(line.as_bytes())
            .and_then(|()| stdin.flush())
            .map_err(|e| DebugError::Transport(format!("failed to write to debuggee: {e}")))
    }

    fn try_recv(&mut self) -> Option<Event> {
        let event = self.events.try_recv().ok()?;
        Some(self.complete(event))
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Option<Event> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(self.complete(event)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    fn terminate(&mut self, grace: Duration) -> Option<i32> {
        if let Some(mut stdin) = self.stdin.take() {
            if let Ok(line) = Command::Terminate.to_line() {
                let _ = stdin.write_all(line.as_bytes());
                let _ = stdin.flush();
            }
        }
        let status = match self.child.wait_timeout(grace) {
            Ok(Some(status)) => Some(status),
            _ => {
                tracing::debug!(pid = self.child.id(), "debuggee did not exit, killing it");
                let _ = self.child.kill();
                self.child.wait().ok()
            }
        };
        self.exited = true;
        status.and_then(|s| s.code())
    }
}

impl Drop for ChildProcessTransport {
    fn drop(&mut self) {
        if !self.exited {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
