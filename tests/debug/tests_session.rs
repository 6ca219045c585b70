//! Debug sessions driven end to end against an indexed workspace.

use std::path::PathBuf;
use std::time::Duration;

use robotls::debug::protocol::{Command, StopReason};
use robotls::debug::{DebugAdapter, DebugError, DebugEvent, DebugState, LaunchConfig};

use super::scripted::ScriptedInterpreter;
use crate::helpers::source_fixtures::{GREET_RESOURCE, GREET_SUITE};
use crate::helpers::workspace::TestWorkspace;

const WAIT: Duration = Duration::from_millis(100);

fn workspace() -> TestWorkspace {
    TestWorkspace::new(&[
        ("greet.resource", GREET_RESOURCE),
        ("suite.robot", GREET_SUITE),
    ])
}

/// Adapter attached to a script running both calls of the suite, with a
/// breakpoint on the first call.
fn paused_at_first_call(ws: &TestWorkspace) -> (DebugAdapter, ScriptedInterpreter) {
    let suite = ws.path("suite.robot");
    let interpreter = ScriptedInterpreter::new(suite.clone(), &[6, 7]);
    let mut adapter = DebugAdapter::new();
    adapter
        .set_breakpoints(ws.host.analysis().snapshot(), &suite, &[5])
        .unwrap();
    adapter.attach(Box::new(interpreter.clone())).unwrap();
    assert_eq!(
        adapter.wait_event(WAIT),
        Some(DebugEvent::Stopped {
            reason: StopReason::Breakpoint,
            frames: 1
        })
    );
    (adapter, interpreter)
}

#[test]
fn test_breakpoints_on_blank_lines_are_not_armed() {
    let ws = workspace();
    let suite = ws.path("suite.robot");
    let interpreter = ScriptedInterpreter::new(suite.clone(), &[6, 7]);
    let mut adapter = DebugAdapter::new();

    let breakpoints = adapter
        .set_breakpoints(ws.host.analysis().snapshot(), &suite, &[2, 5])
        .unwrap();
    let verified: Vec<bool> = breakpoints.iter().map(|b| b.verified).collect();
    assert_eq!(verified, vec![false, true]);
    assert!(breakpoints[0].message.is_some());

    adapter.attach(Box::new(interpreter.clone())).unwrap();
    assert_eq!(
        interpreter.sent(),
        vec![
            Command::SetBreakpoints {
                path: suite,
                lines: vec![6],
            },
            Command::Continue,
        ]
    );
}

#[test]
fn test_breakpoint_stop_exposes_frames() {
    let ws = workspace();
    let (adapter, _interpreter) = paused_at_first_call(&ws);
    assert_eq!(adapter.state(), DebugState::Paused);

    let frames = adapter.stack_trace().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].line, 5);
    assert_eq!(frames[0].path, ws.path("suite.robot"));

    let scopes = adapter.scopes(frames[0].id).unwrap();
    let names: Vec<&str> = scopes.iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["Variables", "Arguments"]);
    let variables = adapter.variables(scopes[0].variables_reference).unwrap();
    assert_eq!(variables[0].name, "${LINE}");
    assert_eq!(adapter.evaluate("${line}", None).unwrap(), "6");
}

#[test]
fn test_step_while_running_is_rejected() {
    let ws = workspace();
    let (mut adapter, interpreter) = paused_at_first_call(&ws);
    let stale_frame = adapter.stack_trace().unwrap()[0].id;

    adapter.step_over().unwrap();
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
    let steps = interpreter
        .sent()
        .iter()
        .filter(|c| **c == Command::StepOver)
        .count();
    assert_eq!(steps, 1);

    assert_eq!(adapter.wait_event(WAIT), Some(DebugEvent::Continued));
    assert_eq!(
        adapter.wait_event(WAIT),
        Some(DebugEvent::Stopped {
            reason: StopReason::Step,
            frames: 1
        })
    );
    assert_eq!(adapter.stack_trace().unwrap()[0].line, 6);
    assert!(matches!(
        adapter.scopes(stale_frame),
        Err(DebugError::InvalidHandle(_))
    ));
}

#[test]
fn test_run_to_completion() {
    let ws = workspace();
    let (mut adapter, _interpreter) = paused_at_first_call(&ws);
    adapter.continue_().unwrap();

    let events = adapter.poll_events();
    assert_eq!(
        events,
        vec![
            DebugEvent::Continued,
            DebugEvent::Output {
                category: "stdout".to_string(),
                output: "ran line 7\n".to_string(),
            },
            DebugEvent::Terminated { exit_code: Some(0) },
        ]
    );
    assert_eq!(adapter.state(), DebugState::Terminated);
    assert_eq!(adapter.exit_code(), Some(0));
    assert!(matches!(
        adapter.stack_trace(),
        Err(DebugError::InvalidState { .. })
    ));
}

#[test]
fn test_stop_while_paused() {
    let ws = workspace();
    let (mut adapter, interpreter) = paused_at_first_call(&ws);
    adapter.stop();

    assert_eq!(adapter.state(), DebugState::Terminated);
    assert!(interpreter.state.lock().terminated);
    assert_eq!(
        adapter.poll_events(),
        vec![DebugEvent::Terminated { exit_code: Some(0) }]
    );
    adapter.stop();
    assert!(adapter.poll_events().is_empty());
}

#[test]
fn test_launch_failure_leaves_session_idle() {
    let mut adapter = DebugAdapter::new();
    let mut config = LaunchConfig::new(PathBuf::from("suite.robot"));
    config.interpreter = Some(PathBuf::from("/nonexistent/python"));

    assert!(matches!(
        adapter.launch(&config),
        Err(DebugError::Launch(_))
    ));
    assert_eq!(adapter.state(), DebugState::Idle);
    assert!(matches!(
        adapter.continue_(),
        Err(DebugError::InvalidState {
            state: DebugState::Idle,
            ..
        })
    ));
}

#[test]
fn test_launched_debuggee_runs_until_stopped() {
    let sh = std::path::Path::new("/bin/sh");
    if !sh.exists() {
        return;
    }
    let mut config = LaunchConfig::new(PathBuf::from("suite.robot"));
    config.interpreter = Some(sh.to_path_buf());
    config.runner = vec!["-c".to_string(), "sleep 5".to_string()];
    config.env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
    config.grace_ms = 100;

    let mut adapter = DebugAdapter::new();
    adapter.launch(&config).unwrap();
    assert_eq!(adapter.state(), DebugState::Running);

    adapter.stop();
    assert_eq!(adapter.state(), DebugState::Terminated);
    assert!(matches!(
        adapter.poll_events().last(),
        Some(DebugEvent::Terminated { .. })
    ));
}
