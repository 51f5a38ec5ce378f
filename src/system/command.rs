//! External process execution.

use std::io;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no command configured")]
    Empty,

    /// The binary is missing or may not be executed by this user.
    #[error("`{program}` is not available: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with {status}: {diagnostic}")]
    Failed {
        program: String,
        status: String,
        diagnostic: String,
    },

    #[error("failed to run `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `argv` without a shell and wait for it.
///
/// The child is killed if the returned future is dropped, so callers can
/// bound it with `tokio::time::timeout`.
pub async fn run(argv: &[String]) -> Result<CommandOutput, CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;

    tracing::debug!(program = %program, args = ?args, "Running external command");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => CommandError::Unavailable {
                program: program.clone(),
                source,
            },
            _ => CommandError::Io {
                program: program.clone(),
                source,
            },
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let status = output
            .status
            .code()
            .map(|c| format!("status {c}"))
            .unwrap_or_else(|| "a signal".to_string());
        return Err(CommandError::Failed {
            program: program.clone(),
            status,
            diagnostic: diagnostic(&stderr, &stdout),
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

/// Prefer stderr, fall back to stdout, keep the tail of long output.
fn diagnostic(stderr: &str, stdout: &str) -> String {
    const MAX: usize = 2048;
    let text = if stderr.trim().is_empty() { stdout } else { stderr };
    let text = text.trim();
    if text.len() <= MAX {
        return text.to_string();
    }
    let mut start = text.len() - MAX;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}
