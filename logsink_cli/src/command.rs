//! Parsing of interactive commands

use liblogsink::{ParseSeverityError, Severity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank input
    Empty,
    Exit,
    Help,
    GetLevel,
    SetLevel(Severity),
    /// `severity` is `None` when the text did not start with a level name
    Message {
        severity: Option<Severity>,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("no log level given")]
    MissingLevel,

    #[error(transparent)]
    InvalidLevel(#[from] ParseSeverityError),

    #[error("unknown command '{0}', type 'help' for a list of commands")]
    Unknown(String),
}

pub const HELP: &str = "\
Commands:
  message [LEVEL] TEXT  - queue TEXT at LEVEL (DEBUG, INFO, WARNING, ERROR),
                          or at the current level when LEVEL is omitted
  getlevel              - show the current log level
  setlevel LEVEL        - change the log level
  help                  - show this help
  exit                  - quit";

// `rest` after a keyword must be empty or start with whitespace
fn after_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = input.strip_prefix(keyword)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

pub fn parse(input: &str) -> Result<Command, CommandError> {
    let input = input.trim();

    match input {
        "" => return Ok(Command::Empty),
        "exit" => return Ok(Command::Exit),
        "help" => return Ok(Command::Help),
        "getlevel" => return Ok(Command::GetLevel),
        _ => {}
    }

    if let Some(rest) = after_keyword(input, "setlevel") {
        let level = rest.trim();
        if level.is_empty() {
            return Err(CommandError::MissingLevel);
        }
        return Ok(Command::SetLevel(level.parse()?));
    }

    if let Some(rest) = after_keyword(input, "message") {
        let rest = rest.replace('\t', " ");
        let rest = rest.trim_start();

        if let Some((first, tail)) = rest.split_once(' ') {
            if let Ok(severity) = first.parse::<Severity>() {
                return Ok(Command::Message {
                    severity: Some(severity),
                    text: tail.trim_start().to_string(),
                });
            }
        }

        return Ok(Command::Message {
            severity: None,
            text: rest.to_string(),
        });
    }

    let word = input.split_whitespace().next().unwrap_or(input);
    Err(CommandError::Unknown(word.to_string()))
}
