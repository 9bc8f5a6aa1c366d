use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use liblogsink::{AsyncLogger, LogConfig, Severity, SEVERITY_NAMES};

mod command;
mod repl;

/// Interactive front end for the file log sink
#[derive(Debug, Parser)]
#[command(name = "logsink", version, about)]
struct Args {
    /// Log file to append to
    #[arg(required_unless_present = "config")]
    file: Option<PathBuf>,

    /// Initial log level (DEBUG, INFO, WARNING, ERROR)
    #[arg(required_unless_present = "config")]
    level: Option<Severity>,

    /// TOML configuration file; FILE and LEVEL override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Parses `argv`, writing any usage error and the valid level names to `err`.
///
/// `Err` carries the exit status: 0 after `--help` or `--version`, 1 for
/// anything else clap rejects.
fn parse_args<I, T>(argv: I, err: &mut impl Write) -> Result<Args, u8>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Args::try_parse_from(argv) {
        Ok(args) => Ok(args),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            Err(0)
        }
        Err(e) => {
            let _ = write!(err, "{e}");
            let _ = writeln!(err, "valid levels: {}", SEVERITY_NAMES.join(", "));
            Err(1)
        }
    }
}

fn main() -> ExitCode {
    // Diagnostics from the logger itself go to stderr, never to the log file
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = match parse_args(std::env::args_os(), &mut io::stderr()) {
        Ok(args) => args,
        Err(code) => return ExitCode::from(code),
    };

    let mut config = match &args.config {
        Some(path) => match LogConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => LogConfig::default(),
    };
    if let Some(file) = args.file {
        config.file_path = file;
        config.log_folder = None;
    }
    if let Some(level) = args.level {
        config.threshold = level;
    }

    let logger = match AsyncLogger::from_config(&config) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("valid levels: {}", SEVERITY_NAMES.join(", "));
            return ExitCode::FAILURE;
        }
    };

    println!(
        "logging to {} at level {}. Type 'help' for a list of commands.",
        config.resolved_path().display(),
        logger.level_name()
    );

    let session = repl::run(&logger, io::stdin().lock(), io::stdout(), io::stderr());

    // Drain before exiting, even if the terminal went away
    let stopped = logger.shutdown();

    if let Err(e) = session {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    if let Err(e) = stopped {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    let stats = logger.stats();
    tracing::debug!(
        written = stats.written,
        filtered = stats.filtered,
        failed = stats.failed,
        "session finished"
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> (Result<Args, u8>, String) {
        let mut err = Vec::new();
        let parsed = parse_args(argv.iter().copied(), &mut err);
        (parsed, String::from_utf8(err).unwrap())
    }

    #[test]
    fn invalid_level_exits_with_failure_and_lists_levels() {
        let (parsed, err) = parse(&["logsink", "x.log", "LOUD"]);
        assert_eq!(parsed.unwrap_err(), 1);
        assert!(err.contains("LOUD"), "{err}");
        assert!(err.contains("valid levels: DEBUG, INFO, WARNING, ERROR"));
    }

    #[test]
    fn missing_level_exits_with_failure() {
        let (parsed, err) = parse(&["logsink", "x.log"]);
        assert_eq!(parsed.unwrap_err(), 1);
        assert!(err.contains("valid levels"));
    }

    #[test]
    fn accepts_file_and_level() {
        let (parsed, err) = parse(&["logsink", "x.log", "warn"]);
        let args = parsed.unwrap();
        assert_eq!(args.file, Some(PathBuf::from("x.log")));
        assert_eq!(args.level, Some(Severity::Warning));
        assert!(err.is_empty());
    }

    #[test]
    fn config_alone_is_enough() {
        let (parsed, _) = parse(&["logsink", "--config", "app_config.toml"]);
        let args = parsed.unwrap();
        assert_eq!(args.config, Some(PathBuf::from("app_config.toml")));
        assert_eq!(args.level, None);
    }

    #[test]
    fn help_exits_successfully() {
        let (parsed, err) = parse(&["logsink", "--help"]);
        assert_eq!(parsed.unwrap_err(), 0);
        assert!(err.is_empty());
    }
}
