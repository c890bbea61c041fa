//! Line-oriented inspection shell over the check table.

use checks::{Check, CheckId, CheckMap, CheckStore};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

const HELP: &str = "--help\tShow this list of commands\n\
                    check\tGet info about the checks";

const CHECK_HELP: &str = "--all\t\tShow all the checks\n\
                          -n=<num>\tShow the first <num> checks\n\
                          -id=<id>\tShow the check with the given id\n\
                          --err-code\tShow only the checks with err_code set";

/// Parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Blank line
    Empty,
    Help,
    CheckHelp,
    /// One check by id
    Show(String),
    /// A prefix of the table, optionally only failing checks
    List {
        limit: Option<usize>,
        err_code_only: bool,
    },
}

/// Parse one input line. The error is the message shown to the user.
pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.to_lowercase();
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.as_slice() {
        [] => Ok(ShellCommand::Empty),
        ["--help", ..] => Ok(ShellCommand::Help),
        ["check"] => Err("No option provided. Type \"check --help\" for available options.".into()),
        ["check", options @ ..] => parse_check_options(options),
        _ => Err("Invalid command. Type --help for available commands.".into()),
    }
}

fn parse_check_options(options: &[&str]) -> Result<ShellCommand, String> {
    let first = options[0];
    let second = options.get(1).copied();

    if first == "--help" {
        return Ok(ShellCommand::CheckHelp);
    }
    if first == "--all" {
        return Ok(ShellCommand::List {
            limit: None,
            err_code_only: false,
        });
    }
    if let Some(id) = first.strip_prefix("-id=") {
        return Ok(ShellCommand::Show(id.to_string()));
    }
    if let Some(n) = first.strip_prefix("-n=") {
        return Ok(ShellCommand::List {
            limit: Some(parse_limit(n)?),
            err_code_only: second == Some("--err-code"),
        });
    }
    if first == "--err-code" {
        let limit = match second.and_then(|s| s.strip_prefix("-n=")) {
            Some(n) => Some(parse_limit(n)?),
            None => None,
        };
        return Ok(ShellCommand::List {
            limit,
            err_code_only: true,
        });
    }

    Err("Invalid option. Type \"check --help\" for available options.".into())
}

fn parse_limit(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err("Invalid quantity specified.".into()),
    }
}

/// Render the output of `cmd` against a copy of the table.
pub fn render(cmd: &ShellCommand, checks: &CheckMap) -> String {
    match cmd {
        ShellCommand::Empty => String::new(),
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::CheckHelp => CHECK_HELP.to_string(),
        ShellCommand::Show(raw) => {
            let found = CheckId::parse(raw)
                .ok()
                .and_then(|id| checks.get(&id).map(|check| (id, check)));
            match found {
                Some((id, check)) => render_entry(&id, check),
                None => "No check with the specified id.".to_string(),
            }
        }
        ShellCommand::List {
            limit,
            err_code_only,
        } => {
            let mut out = String::new();
            checks
                .iter()
                .filter(|(_, check)| !err_code_only || check.has_error())
                .take(limit.unwrap_or(usize::MAX))
                .for_each(|(id, check)| {
                    let _ = writeln!(out, "{}", render_entry(id, check));
                });
            out.trim_end().to_string()
        }
    }
}

fn render_entry(id: &CheckId, check: &Check) -> String {
    let body = serde_json::to_string_pretty(check).unwrap_or_else(|e| format!("<{}>", e));
    format!("\"{}\": {}", id, body)
}

/// Inspection shell bound to a store
pub struct Shell {
    store: Arc<CheckStore>,
}

impl Shell {
    pub fn new(store: Arc<CheckStore>) -> Self {
        Self { store }
    }

    /// Serve commands from stdin until it is closed.
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        self.run(stdin, &mut stdout).await
    }

    /// Serve commands from `input`, writing answers to `output`.
    pub async fn run<R, W>(&self, input: R, output: &mut W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Shell started");
        output
            .write_all(b"Shell started. Type --help for available commands.\n")
            .await?;

        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let text = match parse_command(&line) {
                Ok(cmd) => {
                    debug!(command = ?cmd, "Shell command");
                    render(&cmd, &self.store.list())
                }
                Err(message) => message,
            };
            if !text.is_empty() {
                output.write_all(text.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
        }

        info!("Shell input closed");
        Ok(())
    }
}
