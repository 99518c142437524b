//! Line-oriented terminal implementations of the interactive collaborators.
//!
//! Prompts are written to stderr so that stdout stays free for diagnostics.
//! The secret is read with echo disabled when stdin is a terminal.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use mm_client::Team;

use crate::credentials::{CredentialDraft, CredentialPrompt, Credentials, PromptAborted};
use crate::login::LoginFailure;
use crate::team::TeamChooser;

/// Port offered when the draft has none.
pub const DEFAULT_PORT: u16 = 443;

/// Where a prompt reads its answers from.
///
/// Process stdin is locked per line, so several terminal prompts can live
/// on one thread and share its buffer.
enum LineInput<R> {
    Stdin(io::Stdin),
    Reader(R),
}

/// Prompts on a pair of line streams.
pub struct LinePrompt<R, W> {
    input: LineInput<R>,
    output: W,
    mask_secret: bool,
}

impl LinePrompt<io::Empty, io::Stderr> {
    /// Prompt on stdin/stderr, masking the secret when stdin is a terminal.
    pub fn terminal() -> Self {
        let stdin = io::stdin();
        let mask_secret = stdin.is_terminal();
        Self {
            input: LineInput::Stdin(stdin),
            output: io::stderr(),
            mask_secret,
        }
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    /// Prompt on arbitrary streams; the secret is read as a plain line.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: LineInput::Reader(input),
            output,
            mask_secret: false,
        }
    }

    /// Consumes the prompt, returning the output stream.
    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self) -> Result<String, PromptAborted> {
        let mut line = String::new();
        let read = match &mut self.input {
            LineInput::Stdin(stdin) => stdin.read_line(&mut line),
            LineInput::Reader(reader) => reader.read_line(&mut line),
        };
        match read {
            Ok(0) | Err(_) => Err(PromptAborted),
            Ok(_) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    fn ask(&mut self, label: &str, current: &str) -> Result<String, PromptAborted> {
        if current.is_empty() {
            write!(self.output, "{label}: ").map_err(|_| PromptAborted)?;
        } else {
            write!(self.output, "{label} [{current}]: ").map_err(|_| PromptAborted)?;
        }
        self.output.flush().map_err(|_| PromptAborted)?;
        let answer = self.read_line()?;
        Ok(if answer.is_empty() {
            current.to_string()
        } else {
            answer
        })
    }

    fn ask_secret(&mut self, current: &str) -> Result<String, PromptAborted> {
        let label = if current.is_empty() {
            "Password: "
        } else {
            "Password [unchanged]: "
        };
        write!(self.output, "{label}").map_err(|_| PromptAborted)?;
        self.output.flush().map_err(|_| PromptAborted)?;
        let answer = if self.mask_secret {
            let secret = read_masked()?;
            writeln!(self.output).map_err(|_| PromptAborted)?;
            secret
        } else {
            self.read_line()?
        };
        Ok(if answer.is_empty() {
            current.to_string()
        } else {
            answer
        })
    }

    fn say(&mut self, message: &str) -> Result<(), PromptAborted> {
        writeln!(self.output, "{message}").map_err(|_| PromptAborted)
    }
}

impl<R: BufRead, W: Write> CredentialPrompt for LinePrompt<R, W> {
    fn prompt(
        &mut self,
        draft: CredentialDraft,
        failure: Option<&LoginFailure>,
    ) -> Result<Credentials, PromptAborted> {
        if let Some(failure) = failure {
            self.say(&failure.to_string())?;
        }
        let mut draft = draft;
        if draft.port.is_empty() {
            draft.port = DEFAULT_PORT.to_string();
        }
        loop {
            draft.hostname = self.ask("Server hostname", &draft.hostname)?;
            draft.port = self.ask("Port", &draft.port)?;
            draft.username = self.ask("Username", &draft.username)?;
            draft.password = self.ask_secret(&draft.password)?;

            let port = match draft.port.parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => {
                    self.say(&format!("Invalid port '{}'", draft.port))?;
                    continue;
                }
            };
            if draft.hostname.is_empty() || draft.username.is_empty() || draft.password.is_empty() {
                self.say("Hostname, username and password are all required")?;
                continue;
            }
            return Ok(Credentials {
                hostname: draft.hostname,
                port,
                username: draft.username,
                password: draft.password,
            });
        }
    }
}

impl<R: BufRead, W: Write> TeamChooser for LinePrompt<R, W> {
    fn choose(&mut self, candidates: &[Team]) -> Result<Team, PromptAborted> {
        loop {
            self.say("Select a team:")?;
            for (i, team) in candidates.iter().enumerate() {
                self.say(&format!("  {}) {} ({})", i + 1, team.display_name, team.name))?;
            }
            write!(self.output, "Team number, or q to quit: ").map_err(|_| PromptAborted)?;
            self.output.flush().map_err(|_| PromptAborted)?;

            let answer = self.read_line()?;
            let answer = answer.trim();
            if answer.eq_ignore_ascii_case("q") {
                return Err(PromptAborted);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=candidates.len()).contains(&n) => return Ok(candidates[n - 1].clone()),
                _ => self.say(&format!("'{answer}' is not one of the listed teams"))?,
            }
        }
    }
}

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Reads a line from the terminal without echoing it.
fn read_masked() -> Result<String, PromptAborted> {
    let _raw = RawModeGuard::enable().map_err(|_| PromptAborted)?;
    let mut secret = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read().map_err(|_| PromptAborted)?
        else {
            continue;
        };
        if kind == KeyEventKind::Release {
            continue;
        }
        match code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Esc => return Err(PromptAborted),
            KeyCode::Char('c') | KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(PromptAborted)
            }
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char(c) => secret.push(c),
            _ => {}
        }
    }
}
