//! Debug adapter: drives one debuggee interpreter per session.
//!
//! ## Key Types
//!
//! - [`DebugAdapter`] - Session state machine (`Idle` → `Launching` →
//!   `Running` ⇄ `Paused` → `Terminated`)
//! - [`DebugTransport`] - Ordered commands out, queued events in
//! - [`ChildProcessTransport`] - The transport over a spawned interpreter
//! - [`LaunchConfig`] - Interpreter, arguments and the child's environment
//!
//! Step and continue requests return as soon as the command is written;
//! the next stop is picked up later by [`DebugAdapter::poll_events`] or
//! [`DebugAdapter::wait_event`].

mod breakpoints;
mod launch;
pub mod protocol;
mod session;
mod transport;

pub use breakpoints::{Breakpoint, validate_breakpoints};
pub use launch::{LaunchConfig, spawn};
pub use session::{DebugAdapter, DebugError, DebugEvent, DebugState, Scope, StackFrame, Variable};
pub use transport::{ChildProcessTransport, DebugTransport};
