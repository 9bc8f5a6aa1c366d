//! End-to-end tests for the logger facade against real files

use chrono::NaiveDateTime;
use liblogsink::*;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

// Split "[ts] [LEVEL] message" into its parts, checking the timestamp shape
fn parse_line(line: &str) -> (String, String) {
    assert!(line.starts_with('['), "malformed line: {line}");
    let ts = &line[1..20];
    NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).expect("timestamp should parse");

    let rest = &line[22..];
    let close = rest.find("] ").expect("level should be bracketed");
    (rest[1..close].to_string(), rest[close + 2..].to_string())
}

// Wait until the writer has dealt with `count` entries one way or another
fn wait_for_processed(logger: &AsyncLogger, count: u64) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let stats = logger.stats();
        if stats.written + stats.filtered + stats.failed >= count {
            return;
        }
        assert!(Instant::now() < deadline, "writer stalled: {stats:?}");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_round_trip_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x.log");
    let logger = AsyncLogger::open(&path, Severity::Info).unwrap();

    assert!(logger.submit("hello", Severity::Debug));
    assert!(logger.submit("world", Severity::Error));
    wait_for_processed(&logger, 2);

    logger.set_level(Severity::Debug);
    assert!(logger.submit("again", Severity::Debug));
    logger.shutdown().unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2, "unexpected file contents: {lines:?}");
    assert_eq!(parse_line(&lines[0]), ("ERROR".into(), "world".into()));
    assert_eq!(parse_line(&lines[1]), ("DEBUG".into(), "again".into()));
}

#[test]
fn test_set_level_then_get_level() {
    let dir = tempfile::tempdir().unwrap();
    let logger = AsyncLogger::open(dir.path().join("levels.log"), Severity::Info).unwrap();

    for level in Severity::ALL {
        logger.set_level(level);
        assert_eq!(logger.level(), level);
        assert_eq!(logger.level_name(), level.as_str());
    }
}

#[test]
fn test_entries_below_new_level_are_never_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filtered.log");
    let logger = AsyncLogger::open(&path, Severity::Debug).unwrap();

    logger.set_level(Severity::Warning);
    logger.debug("noise");
    logger.info("chatter");
    logger.warning("kept");
    logger.shutdown().unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1);
    assert_eq!(parse_line(&lines[0]), ("WARNING".into(), "kept".into()));
    assert_eq!(logger.stats().filtered, 2);
}

#[test]
fn test_shutdown_drains_everything_submitted_before_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drain.log");
    let logger = AsyncLogger::open(&path, Severity::Debug).unwrap();

    for i in 0..1000 {
        logger.info(format!("entry {i}"));
    }
    logger.shutdown().unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1000);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(parse_line(line).1, format!("entry {i}"));
    }
    assert_eq!(logger.worker_state(), WorkerState::Stopped);
}

#[test]
fn test_shutdown_is_idempotent_and_later_submits_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stopped.log");
    let logger = AsyncLogger::open(&path, Severity::Debug).unwrap();

    logger.error("last words");
    logger.shutdown().unwrap();
    logger.shutdown().unwrap();

    assert!(!logger.error("after the end"));
    assert_eq!(read_lines(&path).len(), 1);
    assert_eq!(logger.stats().rejected, 1);
}

#[test]
fn test_open_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("app.log");

    match AsyncLogger::open(&path, Severity::Info) {
        Err(Error::Open { path: failed, .. }) => assert_eq!(failed, path),
        Err(other) => panic!("expected open error, got {other}"),
        Ok(_) => panic!("open should fail for a missing directory"),
    }
}

#[test]
fn test_drop_flushes_pending_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dropped.log");

    {
        let logger = AsyncLogger::open(&path, Severity::Info).unwrap();
        for i in 0..20 {
            logger.info(format!("scoped {i}"));
        }
    }

    assert_eq!(read_lines(&path).len(), 20);
}

#[test]
fn test_from_config_creates_directories() {
    let dir = tempfile::tempdir().unwrap();
    let config = LogConfig::from_toml_str(&format!(
        "[logging]\nlog_folder = {:?}\nfile_path = \"svc.log\"\nthreshold = \"warn\"\ncreate_dirs = true\n",
        dir.path().join("logs").to_string_lossy()
    ))
    .unwrap();

    let logger = AsyncLogger::from_config(&config).unwrap();
    assert_eq!(logger.path(), Some(config.resolved_path().as_path()));
    assert_eq!(logger.level(), Severity::Warning);

    logger.info("skipped");
    logger.error("recorded");
    logger.shutdown().unwrap();

    let lines = read_lines(&config.resolved_path());
    assert_eq!(lines.len(), 1);
    assert_eq!(parse_line(&lines[0]).1, "recorded");
}

#[test]
fn test_macros_format_and_submit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macros.log");
    let logger = AsyncLogger::open(&path, Severity::Debug).unwrap();

    let answer = 42;
    log_debug!(logger, "debug {}", answer);
    log_info!(logger, "info {answer}");
    log_warning!(logger, "warning {}", "text");
    log_error!(logger, "error {}", answer + 1);
    logger.shutdown().unwrap();

    let parsed: Vec<(String, String)> = read_lines(&path).iter().map(|l| parse_line(l)).collect();
    assert_eq!(
        parsed,
        vec![
            ("DEBUG".into(), "debug 42".into()),
            ("INFO".into(), "info 42".into()),
            ("WARNING".into(), "warning text".into()),
            ("ERROR".into(), "error 43".into()),
        ]
    );
}

#[tokio::test]
async fn test_shutdown_from_async_task_drains_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("async.log");
    let logger = AsyncLogger::open(&path, Severity::Info).unwrap();

    for i in 0..2000 {
        logger.info(format!("async {i}"));
    }
    logger.shutdown().unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2000);
    assert_eq!(parse_line(&lines[1999]).1, "async 1999");
    assert_eq!(logger.worker_state(), WorkerState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_from_blocking_task() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocking.log");
    let logger = std::sync::Arc::new(AsyncLogger::open(&path, Severity::Debug).unwrap());

    for i in 0..500 {
        logger.debug(format!("blocking {i}"));
    }

    let stopping = std::sync::Arc::clone(&logger);
    let result = tokio::task::spawn_blocking(move || stopping.shutdown())
        .await
        .unwrap();

    result.unwrap();
    assert_eq!(read_lines(&path).len(), 500);
}

#[tokio::test]
async fn test_drop_inside_runtime_flushes_pending_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("async_drop.log");

    {
        let logger = AsyncLogger::open(&path, Severity::Info).unwrap();
        for i in 0..2000 {
            logger.warning(format!("scoped {i}"));
        }
    }

    assert_eq!(read_lines(&path).len(), 2000);
}

// Sleeps on every line so the queue outlives a short shutdown timeout
struct SlowOutput(Duration);

impl LogOutput for SlowOutput {
    fn write_line(&mut self, _line: &str) -> std::io::Result<()> {
        thread::sleep(self.0);
        Ok(())
    }
}

#[test]
fn test_timed_out_shutdown_stops_worker_and_closes_sink() {
    let sink = Sink::with_output(Box::new(SlowOutput(Duration::from_millis(50))), Severity::Info);
    let logger = AsyncLogger::with_sink(sink, Some(Duration::from_millis(20))).unwrap();

    for i in 0..40 {
        logger.info(format!("slow {i}"));
    }

    assert!(matches!(logger.shutdown(), Err(Error::ShutdownTimeout)));
    assert_eq!(logger.worker_state(), WorkerState::Stopped);
    assert!(!logger.info("after timeout"));

    logger.shutdown().unwrap();
    assert!(logger.stats().written < 40);
}
