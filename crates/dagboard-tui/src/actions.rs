//! Start/stop/suspend pass-through to an external scheduler.

use std::fmt;
use std::process::Command;

use dagboard_core::model::DagLeaf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Start,
    Stop,
    Suspend,
    Resume,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Suspend => "suspend",
            Self::Resume => "resume",
        }
    }

    /// Live toggle for `leaf`: suspend a live DAG, resume a suspended one.
    pub fn live_toggle(leaf: &DagLeaf) -> Self {
        if leaf.suspended {
            Self::Resume
        } else {
            Self::Suspend
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("actions are disabled (set actions.command)")]
    Disabled,
    #[error("spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{action} {dag} failed ({status}): {stderr}")]
    Failed {
        action: ActionKind,
        dag: String,
        status: String,
        stderr: String,
    },
}

pub trait ActionBackend {
    /// Run `action` against `dag`; returns a short message for the status line.
    fn run(&self, action: ActionKind, dag: &DagLeaf) -> Result<String, ActionError>;
}

/// Runs `<program> <args..> <action> <dag>` and waits for it.
#[derive(Debug, Clone)]
pub struct CommandActionBackend {
    program: String,
    args: Vec<String>,
}

impl CommandActionBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn target(dag: &DagLeaf) -> &str {
        if dag.file.trim().is_empty() {
            &dag.name
        } else {
            &dag.file
        }
    }
}

impl ActionBackend for CommandActionBackend {
    fn run(&self, action: ActionKind, dag: &DagLeaf) -> Result<String, ActionError> {
        let target = Self::target(dag);
        tracing::info!(program = %self.program, %action, dag = %target, "running action");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(action.as_str())
            .arg(target)
            .output()
            .map_err(|source| ActionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(%action, dag = %target, status = %output.status, "action failed");
            return Err(ActionError::Failed {
                action,
                dag: dag.name.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            Ok(format!("{action} {}", dag.name))
        } else {
            Ok(stdout)
        }
    }
}

/// Backend used when no command is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledActionBackend;

impl ActionBackend for DisabledActionBackend {
    fn run(&self, _action: ActionKind, _dag: &DagLeaf) -> Result<String, ActionError> {
        Err(ActionError::Disabled)
    }
}
