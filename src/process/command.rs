//! Child process execution with concurrent output capture.
//!
//! [`ToolCommand`] is used for every external program the crate drives (`git`, `pip` and
//! the BestiaPop script itself). Standard output and standard error are drained line by
//! line *while* the child runs, so a chatty child can never block on a full pipe, and the
//! two streams end up interleaved in a single text in the order lines arrived.

use crate::process::error::CommandError;
use log::{debug, warn};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

/// A program invocation: program, arguments and the directory it runs from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
    working_dir: PathBuf,
}

/// Result of a command that exited successfully.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// Standard output and standard error, interleaved per line.
    pub output: String,
}

enum Interrupt {
    Cancelled,
    TimedOut(Duration),
}

impl ToolCommand {
    pub fn new(program: impl Into<OsString>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Runs the command to completion.
    ///
    /// The child is killed if `cancel` fires or `timeout` elapses before it exits. A
    /// non-zero exit status is an error that carries everything the child printed.
    ///
    /// # Errors
    ///
    /// * [`CommandError::Launch`] if the program cannot be started (e.g. not on `PATH`).
    /// * [`CommandError::Failed`] if it exits unsuccessfully.
    /// * [`CommandError::Cancelled`] / [`CommandError::TimedOut`] if it was interrupted.
    /// * [`CommandError::OutputIo`] / [`CommandError::Wait`] for pipe or wait failures.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, CommandError> {
        let command = self.to_string();
        debug!(
            "Running '{}' from directory '{}'",
            command,
            self.working_dir.display()
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Launch {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = {
            let completion = async {
                let output = drain_output(stdout, stderr)
                    .await
                    .map_err(|source| CommandError::OutputIo {
                        command: command.clone(),
                        source,
                    })?;
                let status = child.wait().await.map_err(|source| CommandError::Wait {
                    command: command.clone(),
                    source,
                })?;
                Ok::<_, CommandError>((status, output))
            };

            tokio::select! {
                result = completion => Ok(result),
                _ = cancel.cancelled() => Err(Interrupt::Cancelled),
                elapsed = deadline(timeout) => Err(Interrupt::TimedOut(elapsed)),
            }
        };

        let (status, output) = match outcome {
            Ok(result) => result?,
            Err(interrupt) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill interrupted command '{}': {}", command, e);
                }
                return Err(match interrupt {
                    Interrupt::Cancelled => CommandError::Cancelled { command },
                    Interrupt::TimedOut(after) => CommandError::TimedOut { command, after },
                });
            }
        };

        if !status.success() {
            return Err(CommandError::Failed {
                command,
                status,
                output,
            });
        }

        Ok(CommandOutput { status, output })
    }
}

/// Formats the command as it would be typed, quoting arguments that contain whitespace.
impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(after) => {
            tokio::time::sleep(after).await;
            after
        }
        None => std::future::pending().await,
    }
}

/// Next line without its terminator, decoded lossily so stray non-UTF-8 bytes never fail a run.
///
/// Bytes of a line interrupted by `select!` stay in `buf` and are completed on the next call.
async fn next_line<R>(reader: &mut Option<R>, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(None);
    };
    reader.read_until(b'\n', buf).await?;
    if buf.is_empty() {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf.as_slice())
        .trim_end_matches(['\n', '\r'])
        .to_string();
    buf.clear();
    Ok(Some(line))
}

/// Reads both pipes until EOF, appending lines in arrival order.
async fn drain_output(
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
) -> std::io::Result<String> {
    let mut stdout = stdout.map(BufReader::new);
    let mut stderr = stderr.map(BufReader::new);
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let mut stdout_done = stdout.is_none();
    let mut stderr_done = stderr.is_none();
    let mut output = String::new();

    while !(stdout_done && stderr_done) {
        tokio::select! {
            line = next_line(&mut stdout, &mut stdout_buf), if !stdout_done => match line? {
                Some(line) => {
                    output.push_str(&line);
                    output.push('\n');
                }
                None => stdout_done = true,
            },
            line = next_line(&mut stderr, &mut stderr_buf), if !stderr_done => match line? {
                Some(line) => {
                    output.push_str(&line);
                    output.push('\n');
                }
                None => stderr_done = true,
            },
        }
    }

    Ok(output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh", std::env::temp_dir()).args(["-c", script])
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let cmd = ToolCommand::new("python", "/tmp")
            .args(["bestiapop.py", "-c", "daily_rain max_temp", "-m"]);
        assert_eq!(
            cmd.to_string(),
            "python bestiapop.py -c \"daily_rain max_temp\" -m"
        );
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr() -> Result<(), CommandError> {
        let result = sh("echo out-line; echo err-line 1>&2")
            .run(&CancellationToken::new(), None)
            .await?;
        assert!(result.status.success());
        assert!(result.output.contains("out-line"));
        assert!(result.output.contains("err-line"));
        Ok(())
    }

    #[tokio::test]
    async fn test_non_utf8_output_is_decoded_lossily() -> Result<(), CommandError> {
        let result = sh("printf 'Temperature 25\\260C\\n'; printf 'no newline \\377' 1>&2")
            .run(&CancellationToken::new(), None)
            .await?;
        assert!(result.status.success());
        assert!(result.output.contains("Temperature 25\u{FFFD}C\n"), "{:?}", result.output);
        assert!(result.output.contains("no newline \u{FFFD}\n"), "{:?}", result.output);
        Ok(())
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        ToolCommand::new("sh", dir.path())
            .args(["-c", "touch marker"])
            .run(&CancellationToken::new(), None)
            .await?;
        assert!(dir.path().join("marker").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_output() {
        let err = sh("echo 'bad latitude' 1>&2; exit 3")
            .run(&CancellationToken::new(), None)
            .await
            .unwrap_err();
        match &err {
            CommandError::Failed { status, output, .. } => {
                assert_eq!(status.code(), Some(3));
                assert!(output.contains("bad latitude"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("bad latitude"));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let err = ToolCommand::new("definitely-not-a-real-program-4711", std::env::temp_dir())
            .run(&CancellationToken::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Launch { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_large_output_does_not_deadlock() -> Result<(), CommandError> {
        // Well beyond a typical 64 KiB pipe buffer, on both streams.
        let result = sh("i=0; while [ $i -lt 5000 ]; do echo line-$i-xxxxxxxxxxxxxxxxxxxxxxxx; echo err-$i-yyyyyyyyyyyyyyyyyyyyyyyy 1>&2; i=$((i+1)); done")
            .run(&CancellationToken::new(), Some(Duration::from_secs(60)))
            .await?;
        assert_eq!(result.output.lines().count(), 10_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let started = Instant::now();
        let err = sh("sleep 30")
            .run(&CancellationToken::new(), Some(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::TimedOut { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancellation_kills_child() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let started = Instant::now();
        let err = sh("sleep 30").run(&token, None).await.unwrap_err();
        assert!(matches!(err, CommandError::Cancelled { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
