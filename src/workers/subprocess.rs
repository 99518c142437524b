//! Output of external programs the client launches (URL openers and the
//! like).
//!
//! Programs are run with [`spawn_logged_program`]; their captured output is
//! sent to the [`SubprocessLogger`], which traces it and, on failure,
//! appends it to a log file and reports the failure through the request
//! queue.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::AppEvent;
use crate::queue::RequestSender;

/// File name of the failure log inside the cache directory.
pub const SUBPROCESS_LOG_FILE: &str = "subprocess.log";

/// Captured result of one program run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOutput {
    /// Program that was run.
    pub program: String,
    /// Arguments it was given.
    pub args: Vec<String>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Exit code; `None` when terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProgramOutput {
    /// Whether the program exited with status zero.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Creates the channel programs report their output on.
pub fn program_log_channel() -> (ProgramLogSender, mpsc::UnboundedReceiver<ProgramOutput>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgramLogSender { tx }, rx)
}

/// Producer side of the program log channel.
#[derive(Debug, Clone)]
pub struct ProgramLogSender {
    tx: mpsc::UnboundedSender<ProgramOutput>,
}

impl ProgramLogSender {
    /// Hands a finished run to the logger. Returns `false` if it is gone.
    pub fn send(&self, output: ProgramOutput) -> bool {
        self.tx.send(output).is_ok()
    }
}

/// Runs `program` with `args` in the background and reports its output.
///
/// Must be called from within the runtime. Spawn failures (program not
/// found) are reported like a failed run with no exit code.
pub fn spawn_logged_program(log: &ProgramLogSender, program: &str, args: &[String]) {
    let log = log.clone();
    let program = program.to_string();
    let args = args.to_vec();
    tokio::spawn(async move {
        let output = run_program(&program, &args).await;
        if !log.send(output) {
            debug!(program = %program, "subprocess logger gone, output dropped");
        }
    });
}

async fn run_program(program: &str, args: &[String]) -> ProgramOutput {
    debug!(program, ?args, "running external program");
    let result = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await;
    match result {
        Ok(out) => ProgramOutput {
            program: program.to_string(),
            args: args.to_vec(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            exit_code: out.status.code(),
        },
        Err(e) => ProgramOutput {
            program: program.to_string(),
            args: args.to_vec(),
            stdout: String::new(),
            stderr: format!("failed to start: {e}"),
            exit_code: None,
        },
    }
}

/// Drains program output until every sender is gone.
pub struct SubprocessLogger {
    outputs: mpsc::UnboundedReceiver<ProgramOutput>,
    requests: RequestSender,
    log_path: PathBuf,
}

impl SubprocessLogger {
    /// Creates the logger; failures are appended to `log_path`.
    pub fn new(
        outputs: mpsc::UnboundedReceiver<ProgramOutput>,
        requests: RequestSender,
        log_path: PathBuf,
    ) -> Self {
        Self {
            outputs,
            requests,
            log_path,
        }
    }

    /// Runs until the channel closes.
    pub async fn run(mut self) {
        while let Some(output) = self.outputs.recv().await {
            for line in output.stdout.lines() {
                debug!(program = %output.program, stream = "stdout", "{line}");
            }
            for line in output.stderr.lines() {
                debug!(program = %output.program, stream = "stderr", "{line}");
            }
            if output.succeeded() {
                info!(program = %output.program, "external program finished");
                continue;
            }

            warn!(program = %output.program, code = ?output.exit_code, "external program failed");
            if let Err(e) = append_failure(&self.log_path, &output).await {
                warn!(error = %e, path = %self.log_path.display(), "could not write subprocess log");
            }
            let event = AppEvent::SubprocessFailed {
                program: output.program.clone(),
                code: output.exit_code,
                log_path: self.log_path.display().to_string(),
            };
            if self.requests.post(event).is_err() {
                debug!("request queue closed, stopping subprocess logger");
                return;
            }
        }
        info!("program log channel closed, stopping subprocess logger");
    }
}

async fn append_failure(path: &Path, output: &ProgramOutput) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    let code = output
        .exit_code
        .map_or_else(|| "signal".to_string(), |c| c.to_string());
    let mut record = format!(
        "Program: {}\nArguments: {:?}\nExit code: {}\n",
        output.program, output.args, code
    );
    record.push_str("Stdout:\n");
    record.push_str(&output.stdout);
    record.push_str("\nStderr:\n");
    record.push_str(&output.stderr);
    record.push_str("\n\n");
    file.write_all(record.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::request_queue;

    fn failed_output() -> ProgramOutput {
        ProgramOutput {
            program: "xdg-open".to_string(),
            args: vec!["https://example.com".to_string()],
            stdout: String::new(),
            stderr: "no handler".to_string(),
            exit_code: Some(3),
        }
    }

    #[tokio::test]
    async fn failures_are_logged_and_reported() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let log_path = dir.path().join(SUBPROCESS_LOG_FILE);
        let (log, outputs) = program_log_channel();
        let (requests, mut jobs) = request_queue();
        let worker = tokio::spawn(SubprocessLogger::new(outputs, requests, log_path.clone()).run());

        let mut ok = failed_output();
        ok.exit_code = Some(0);
        assert!(log.send(ok));
        assert!(log.send(failed_output()));
        drop(log);
        worker.await.expect("logger task panicked");

        let content = std::fs::read_to_string(&log_path).expect("log should exist");
        assert!(content.contains("Exit code: 3"));
        assert!(content.contains("no handler"));
        assert_eq!(content.matches("Program:").count(), 1, "only failures logged");

        assert!(jobs.recv().await.is_some(), "one failure job queued");
        assert!(jobs.recv().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawned_program_output_reaches_logger() {
        let (log, mut outputs) = program_log_channel();
        spawn_logged_program(&log, "sh", &["-c".to_string(), "echo hi; exit 2".to_string()]);
        let output = outputs.recv().await.expect("output should arrive");
        assert_eq!(output.stdout.trim(), "hi");
        assert_eq!(output.exit_code, Some(2));
        assert!(!output.succeeded());
    }

    #[tokio::test]
    async fn missing_program_is_reported_without_exit_code() {
        let output = run_program("mmterm-no-such-program", &[]).await;
        assert_eq!(output.exit_code, None);
        assert!(output.stderr.starts_with("failed to start"));
    }
}
