use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to start command '{command}'")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error while running command '{command}' ({status}). Process output: {output}")]
    Failed {
        command: String,
        status: ExitStatus,
        output: String,
    },

    #[error("I/O error while reading output of command '{command}'")]
    OutputIo {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for command '{command}' to exit")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' was cancelled")]
    Cancelled { command: String },

    #[error("Command '{command}' timed out after {after:?}")]
    TimedOut { command: String, after: Duration },
}

impl CommandError {
    /// The combined stdout/stderr text, if the command ran to completion.
    pub fn output(&self) -> Option<&str> {
        match self {
            CommandError::Failed { output, .. } => Some(output),
            _ => None,
        }
    }

    pub fn command(&self) -> &str {
        match self {
            CommandError::Launch { command, .. }
            | CommandError::Failed { command, .. }
            | CommandError::OutputIo { command, .. }
            | CommandError::Wait { command, .. }
            | CommandError::Cancelled { command }
            | CommandError::TimedOut { command, .. } => command,
        }
    }
}
