//! Line protocol spoken with the debuggee interpreter.
//!
//! One JSON object per line in each direction. Commands go to the
//! interpreter's stdin; events come back on its stdout. A stdout line that is
//! not a recognised event is program output and is forwarded as such.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// COMMANDS (adapter → interpreter)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    SetBreakpoints { path: PathBuf, lines: Vec<u32> },
    Continue,
    StepIn,
    StepOver,
    StepOut,
    Pause,
    Terminate,
}

impl Command {
    /// Serialised form including the trailing newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

// ============================================================================
// EVENTS (interpreter → adapter)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    Breakpoint,
    Step,
    Pause,
}

/// A name/value pair captured when execution stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableValue {
    pub name: String,
    pub value: String,
}

/// One call stack entry as reported by the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub name: String,
    /// `suite`, `test` or `keyword`.
    #[serde(default)]
    pub kind: String,
    pub path: PathBuf,
    /// 1-based, as interpreters report it.
    pub line: u32,
    #[serde(default)]
    pub variables: Vec<VariableValue>,
    #[serde(default)]
    pub arguments: Vec<VariableValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    Started,
    Stopped {
        reason: StopReason,
        /// Innermost first.
        frames: Vec<FrameInfo>,
    },
    Output {
        #[serde(default = "default_category")]
        category: String,
        output: String,
    },
    #[serde(rename_all = "camelCase")]
    Terminated {
        #[serde(default)]
        exit_code: Option<i32>,
    },
}

fn default_category() -> String {
    "stdout".to_string()
}

impl Event {
    /// Decode one stdout line. Never fails: anything that is not an event
    /// becomes `Output`.
    pub fn from_line(line: &str) -> Event {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(_) => Event::Output {
                category: default_category(),
                output: format!("{trimmed}\n"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Command::Continue, r#"{"command":"continue"}"#)]
    #[case(Command::StepOut, r#"{"command":"stepOut"}"#)]
    #[case(
        Command::SetBreakpoints { path: PathBuf::from("/w/a.robot"), lines: vec![3, 7] },
        r#"{"command":"setBreakpoints","path":"/w/a.robot","lines":[3,7]}"#
    )]
    fn test_command_wire_format(#[case] command: Command, #[case] expected: &str) {
        assert_eq!(command.to_line().unwrap(), format!("{expected}\n"));
    }

    #[test]
    fn test_stopped_event() {
        let line = r#"{"event":"stopped","reason":"breakpoint","frames":[{"name":"Log","kind":"keyword","path":"/w/a.robot","line":3,"variables":[{"name":"${x}","value":"1"}]}]}"#;
        let Event::Stopped { reason, frames } = Event::from_line(line) else {
            panic!("expected stopped event");
        };
        assert_eq!(reason, StopReason::Breakpoint);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].variables[0].value, "1");
        assert!(frames[0].arguments.is_empty());
    }

    #[test]
    fn test_terminated_and_garbage() {
        assert_eq!(
            Event::from_line("{\"event\":\"terminated\",\"exitCode\":2}\n"),
            Event::Terminated { exit_code: Some(2) }
        );
        assert_eq!(
            Event::from_line("==== Suite ===="),
            Event::Output {
                category: "stdout".to_string(),
                output: "==== Suite ====\n".to_string(),
            }
        );
    }
}
