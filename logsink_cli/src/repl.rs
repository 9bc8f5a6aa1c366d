//! The interactive loop that turns commands into logger calls

use std::io::{self, BufRead, Write};

use liblogsink::{AsyncLogger, SEVERITY_NAMES};

use crate::command::{self, Command, CommandError, HELP};

/// Reads commands from `input` until `exit` or end of input.
///
/// Replies go to `out`, command errors to `err`. The logger is left running;
/// the caller shuts it down.
pub fn run<R, W, E>(logger: &AsyncLogger, input: R, mut out: W, mut err: E) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut lines = input.lines();

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            return Ok(());
        };

        match command::parse(&line?) {
            Ok(Command::Empty) => {}
            Ok(Command::Exit) => return Ok(()),
            Ok(Command::Help) => writeln!(out, "{HELP}")?,
            Ok(Command::GetLevel) => writeln!(out, "log level: {}", logger.level_name())?,
            Ok(Command::SetLevel(level)) => {
                logger.set_level(level);
                writeln!(out, "log level set to {level}")?;
            }
            Ok(Command::Message { severity, text }) => {
                let current = logger.level();
                let severity = severity.unwrap_or(current);

                if !logger.submit(text, severity) {
                    writeln!(err, "error: logger has stopped, message discarded")?;
                } else if severity < current {
                    writeln!(
                        out,
                        "message submitted (level = {severity}), below current level {current}"
                    )?;
                } else {
                    writeln!(out, "message queued (level = {severity})")?;
                }
            }
            Err(e @ (CommandError::MissingLevel | CommandError::InvalidLevel(_))) => {
                writeln!(err, "error: {e}")?;
                writeln!(err, "valid levels: {}", SEVERITY_NAMES.join(", "))?;
            }
            Err(e @ CommandError::Unknown(_)) => writeln!(out, "{e}")?,
        }
    }
}
