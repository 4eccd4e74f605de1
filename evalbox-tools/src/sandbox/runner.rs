//! Runs one submission in a fresh interpreter process.
//!
//! The child's stdout is the capture channel. The driver reports its progress
//! on a private copy of stderr, one `<nonce><json>` line per state change, and
//! sends everything else the submission writes to stderr to /dev/null.
//!
//! The interpreter leads its own process group. The group is killed as soon as
//! the interpreter exits or the deadline fires, so nothing the submission
//! spawned outlives the call.

use crate::config::EvalConfig;
use crate::error::ToolError;
use crate::execution_context::{Binding, ExecutionContext};
use crate::outcome::{CapturedOutput, ExecutionOutcome};
use crate::sandbox::deadline::{DeadlineController, DeadlineResult};
use crate::sandbox::limits::ResourceLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, error, warn};

const DRIVER: &str = include_str!("driver.py");
const STATUS_CHANNEL_LIMIT: usize = 64 * 1024;
const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

#[derive(Serialize)]
struct DriverRequest<'a> {
    code: &'a str,
    nonce: &'a str,
    bindings: &'a [Binding],
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
enum DriverStatus {
    Started,
    Completed,
    Raised { kind: String, message: String },
    ContextError { kind: String, message: String },
}

struct Exchange {
    stdout: Vec<u8>,
    stdout_truncated: bool,
    channel: Vec<u8>,
    status: ExitStatus,
}

#[derive(Debug, Clone)]
pub struct IsolatedRunner {
    interpreter: String,
    data_dir: PathBuf,
    max_output_bytes: usize,
    memory_limit_mb: Option<u64>,
}

impl IsolatedRunner {
    pub fn new(config: &EvalConfig, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            data_dir: data_dir.into(),
            max_output_bytes: config.max_output_bytes,
            memory_limit_mb: config.memory_limit_mb,
        }
    }

    /// Executes `code` against `context` under `deadline`.
    ///
    /// Failures of the submission come back as `Ok(Raised)` or `Ok(TimedOut)`.
    /// `Err` is reserved for host faults: the interpreter could not be started,
    /// the pipes broke, or the context could not be materialized.
    pub async fn run(
        &self,
        code: &str,
        context: ExecutionContext,
        deadline: &DeadlineController,
    ) -> Result<ExecutionOutcome, ToolError> {
        let nonce = format!("@@evalbox:{}@@", uuid::Uuid::new_v4().simple());
        let payload = serde_json::to_vec(&DriverRequest {
            code,
            nonce: &nonce,
            bindings: context.bindings(),
        })
        .map_err(|e| ToolError::HostFault(format!("failed to encode request: {}", e)))?;
        drop(context);

        let mut cmd = self.command(deadline);
        let mut child = cmd.spawn().map_err(|e| {
            ToolError::HostFault(format!(
                "failed to start interpreter {}: {}",
                self.interpreter, e
            ))
        })?;
        let pid = child.id();
        debug!("Spawned interpreter pid={:?}", pid);

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::HostFault("no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::HostFault("no stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ToolError::HostFault("no stderr".into()))?;

        let feed = async move {
            // A child that dies before reading everything shows up in the
            // status channel, so a broken pipe here is not a fault.
            if let Err(e) = stdin.write_all(&payload).await {
                debug!("Request write ended early: {}", e);
            }
            let _ = stdin.shutdown().await;
        };

        let max_output = self.max_output_bytes;
        let waiter = &mut child;
        let exchange = async move {
            let exited = async {
                let status = waiter.wait().await;
                // Leftover children would hold the pipes open past the interpreter
                terminate_group(pid);
                status
            };
            let ((), out, channel, status) = tokio::join!(
                feed,
                read_capped(stdout, max_output),
                read_capped(stderr, STATUS_CHANNEL_LIMIT),
                exited
            );
            let (stdout, stdout_truncated) = out?;
            let (channel, _) = channel?;
            Ok::<_, std::io::Error>(Exchange {
                stdout,
                stdout_truncated,
                channel,
                status: status?,
            })
        };

        let result = deadline.race(exchange).await;
        match result {
            DeadlineResult::Expired => {
                terminate_group(pid);
                if let Err(e) = child.start_kill() {
                    debug!("Interpreter already gone: {}", e);
                }
                warn!(
                    "Submission exceeded {:?} deadline, interpreter killed",
                    deadline.limit()
                );
                Ok(ExecutionOutcome::TimedOut {
                    limit: deadline.limit(),
                })
            }
            DeadlineResult::Finished(Err(e)) => {
                terminate_group(pid);
                error!("Interpreter pipe failure: {}", e);
                Err(ToolError::HostFault(format!("interpreter I/O failed: {}", e)))
            }
            DeadlineResult::Finished(Ok(exchange)) => self.interpret(exchange, &nonce),
        }
    }

    fn command(&self, deadline: &DeadlineController) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-u")
            .arg("-c")
            .arg(DRIVER)
            .env_clear()
            .env(
                "PATH",
                std::env::var_os("PATH").unwrap_or_else(|| FALLBACK_PATH.into()),
            )
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .env("OPENBLAS_NUM_THREADS", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.data_dir.is_dir() {
            cmd.current_dir(&self.data_dir);
        }

        #[cfg(unix)]
        {
            let limits = ResourceLimits::for_deadline(deadline.limit(), self.memory_limit_mb);
            unsafe {
                cmd.pre_exec(move || {
                    // New session so the whole tree can be killed as a group
                    if libc::setsid() == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    limits.apply()
                });
            }
        }
        #[cfg(not(unix))]
        let _ = deadline;

        cmd
    }

    fn interpret(&self, exchange: Exchange, nonce: &str) -> Result<ExecutionOutcome, ToolError> {
        let statuses = parse_channel(&exchange.channel, nonce)?;

        match statuses.last() {
            None => {
                let stderr = String::from_utf8_lossy(&exchange.channel);
                error!(
                    "Interpreter exited ({}) without starting the driver: {}",
                    exchange.status,
                    stderr.lines().last().unwrap_or("")
                );
                Err(ToolError::HostFault(
                    "interpreter did not start the execution driver".into(),
                ))
            }
            Some(DriverStatus::ContextError { kind, message }) => {
                error!("Execution context could not be built: {}: {}", kind, message);
                Err(ToolError::HostFault(format!(
                    "execution context could not be built: {}",
                    kind
                )))
            }
            Some(DriverStatus::Completed) => Ok(ExecutionOutcome::Completed(CapturedOutput {
                text: String::from_utf8_lossy(&exchange.stdout).into_owned(),
                truncated_at: exchange.stdout_truncated.then_some(self.max_output_bytes),
            })),
            Some(DriverStatus::Raised { kind, message }) => {
                Ok(ExecutionOutcome::raised(kind, message, &self.data_dir))
            }
            Some(DriverStatus::Started) => Ok(abrupt_exit(exchange.status, &self.data_dir)),
        }
    }
}

/// The submission took the interpreter down before the driver could report.
fn abrupt_exit(status: ExitStatus, data_dir: &Path) -> ExecutionOutcome {
    if let Some(code) = status.code() {
        return ExecutionOutcome::raised(
            "InterpreterExit",
            &format!("interpreter exited with status {} before finishing", code),
            data_dir,
        );
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExecutionOutcome::raised(
                "InterpreterTerminated",
                &format!("interpreter terminated by signal {}", signal),
                data_dir,
            );
        }
    }

    ExecutionOutcome::raised("InterpreterTerminated", "interpreter terminated", data_dir)
}

fn parse_channel(channel: &[u8], nonce: &str) -> Result<Vec<DriverStatus>, ToolError> {
    String::from_utf8_lossy(channel)
        .lines()
        .filter_map(|line| line.strip_prefix(nonce))
        .map(|json| {
            serde_json::from_str(json)
                .map_err(|e| ToolError::HostFault(format!("malformed driver status: {}", e)))
        })
        .collect()
}

async fn read_capped<R>(mut reader: R, limit: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut buf).await?;
    let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((buf, dropped > 0))
}

#[cfg(unix)]
fn terminate_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // The child is its own session leader, so its pid is the group id.
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn terminate_group(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    const NONCE: &str = "@@evalbox:test@@";

    #[test]
    fn test_parse_channel_ignores_foreign_lines() {
        let channel = format!(
            "Traceback noise\n{}{{\"status\":\"started\"}}\n{}{{\"status\":\"completed\"}}\n",
            NONCE, NONCE
        );
        let statuses = parse_channel(channel.as_bytes(), NONCE).unwrap();
        assert_eq!(statuses, vec![DriverStatus::Started, DriverStatus::Completed]);
    }

    #[test]
    fn test_parse_channel_raised() {
        let channel = format!(
            "{}{{\"status\":\"raised\",\"kind\":\"ValueError\",\"message\":\"bad\"}}\n",
            NONCE
        );
        let statuses = parse_channel(channel.as_bytes(), NONCE).unwrap();
        assert_eq!(
            statuses,
            vec![DriverStatus::Raised {
                kind: "ValueError".into(),
                message: "bad".into()
            }]
        );
    }

    #[test]
    fn test_parse_channel_malformed_is_host_fault() {
        let channel = format!("{}not json\n", NONCE);
        let result = parse_channel(channel.as_bytes(), NONCE);
        assert!(matches!(result, Err(ToolError::HostFault(_))));
    }

    #[tokio::test]
    async fn test_read_capped_truncates() {
        let data = vec![b'a'; 100];
        let (buf, truncated) = read_capped(&data[..], 10).await.unwrap();
        assert_eq!(buf.len(), 10);
        assert!(truncated);

        let (buf, truncated) = read_capped(&data[..], 100).await.unwrap();
        assert_eq!(buf.len(), 100);
        assert!(!truncated);
    }
}
