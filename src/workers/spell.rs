//! Spell checking of the input line through `aspell -a`.
//!
//! The interactive loop calls [`SpellChecker::request_check`] on every edit.
//! Requests are debounced: the check runs once input has been quiet for the
//! configured delay, and only the latest text is checked.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::events::{AppEvent, EventSender};

/// A word aspell did not recognise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Misspelling {
    /// The word as typed.
    pub word: String,
    /// Replacement candidates, best first. May be empty.
    pub suggestions: Vec<String>,
}

/// Parses one line of `aspell -a` output.
///
/// `& word count offset: s1, s2` and `# word offset` are misspellings;
/// everything else (`*`, `-`, `+ root`, blank) is not.
pub fn parse_aspell_line(line: &str) -> Option<Misspelling> {
    let mut parts = line.splitn(2, ' ');
    let tag = parts.next()?;
    let rest = parts.next()?;
    match tag {
        "&" => {
            let (head, list) = rest.split_once(':')?;
            let word = head.split_whitespace().next()?;
            let suggestions = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            Some(Misspelling {
                word: word.to_string(),
                suggestions,
            })
        }
        "#" => {
            let word = rest.split_whitespace().next()?;
            Some(Misspelling {
                word: word.to_string(),
                suggestions: Vec::new(),
            })
        }
        _ => None,
    }
}

/// Handle the interactive loop uses to ask for checks.
#[derive(Debug, Clone)]
pub struct SpellChecker {
    requests: mpsc::UnboundedSender<String>,
}

impl SpellChecker {
    /// Queues `text` for checking. Returns `false` if the checker stopped.
    pub fn request_check(&self, text: impl Into<String>) -> bool {
        self.requests.send(text.into()).is_ok()
    }
}

/// Executable used when none is configured.
pub const DEFAULT_ASPELL_COMMAND: &str = "aspell";

/// Starts `<program> -a`, optionally with a dictionary.
///
/// Must be called within the runtime. Fails when the program cannot be run.
pub fn spawn_aspell(program: &str, dictionary: Option<&str>) -> std::io::Result<Child> {
    let mut command = Command::new(program);
    command.arg("-a");
    if let Some(lang) = dictionary {
        command.arg(format!("--lang={lang}"));
    }
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
}

/// The background half: owns the aspell pipes.
pub struct SpellWorker<W, R> {
    stdin: W,
    stdout: R,
    requests: mpsc::UnboundedReceiver<String>,
    events: EventSender,
    delay: Duration,
    _child: Option<Child>,
}

/// Creates the handle and worker around a running aspell.
///
/// Returns `None` when the child's pipes are unavailable.
pub fn from_child(
    mut child: Child,
    events: EventSender,
    delay: Duration,
) -> Option<(
    SpellChecker,
    SpellWorker<tokio::process::ChildStdin, BufReader<tokio::process::ChildStdout>>,
)> {
    let stdin = child.stdin.take()?;
    let stdout = BufReader::new(child.stdout.take()?);
    let (checker, mut worker) = with_pipes(stdin, stdout, events, delay);
    worker._child = Some(child);
    Some((checker, worker))
}

/// Creates the handle and worker around arbitrary pipes.
pub fn with_pipes<W, R>(
    stdin: W,
    stdout: R,
    events: EventSender,
    delay: Duration,
) -> (SpellChecker, SpellWorker<W, R>)
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    let (tx, rx) = mpsc::unbounded_channel();
    (
        SpellChecker { requests: tx },
        SpellWorker {
            stdin,
            stdout,
            requests: rx,
            events,
            delay,
            _child: None,
        },
    )
}

impl<W, R> SpellWorker<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    /// Runs until the handle is dropped, aspell exits, or the event queue
    /// closes.
    pub async fn run(mut self) {
        let mut banner = String::new();
        match self.stdout.read_line(&mut banner).await {
            Ok(n) if n > 0 => debug!(banner = banner.trim(), "aspell started"),
            Ok(_) => {
                warn!("aspell exited before printing its banner");
                return;
            }
            Err(e) => {
                warn!(error = %e, "could not read from aspell");
                return;
            }
        }

        while let Some(mut text) = self.requests.recv().await {
            // Keep taking newer text until input is quiet for `delay`.
            loop {
                tokio::select! {
                    newer = self.requests.recv() => match newer {
                        Some(newer) => text = newer,
                        None => return,
                    },
                    _ = tokio::time::sleep(self.delay) => break,
                }
            }

            let misspellings = match self.check(&text).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(error = %e, "spell check failed, stopping spell checker");
                    return;
                }
            };
            if self
                .events
                .send(AppEvent::SpellCheckResult(misspellings))
                .await
                .is_err()
            {
                return;
            }
        }
    }

    async fn check(&mut self, text: &str) -> std::io::Result<Vec<Misspelling>> {
        let mut found = Vec::new();
        for line in text.lines() {
            // `^` keeps aspell from treating the line as a command.
            self.stdin.write_all(format!("^{line}\n").as_bytes()).await?;
            self.stdin.flush().await?;
            loop {
                let mut reply = String::new();
                if self.stdout.read_line(&mut reply).await? == 0 {
                    return Err(std::io::ErrorKind::UnexpectedEof.into());
                }
                let reply = reply.trim_end();
                if reply.is_empty() {
                    break;
                }
                found.extend(parse_aspell_line(reply));
            }
        }
        Ok(found)
    }
}
