// Integration tests for logging setup
// Installs the global subscriber, so everything lives in one test function.

use std::fs;
use std::time::Duration;

use medscribe::infrastructure::logging::{LogConfig, LogFormat, LoggerImpl, RotationPolicy};
use tempfile::TempDir;
use tracing::{info, instrument, warn};

#[instrument]
fn scored_iteration(iteration: u32) -> u32 {
    info!(confidence = 72.5, "iteration scored");
    iteration + 1
}

#[test]
fn test_file_logging_writes_json_lines() {
    let temp_dir = TempDir::new().unwrap();

    let config = LogConfig {
        level: "info".to_string(),
        format: LogFormat::Json,
        log_dir: Some(temp_dir.path().to_path_buf()),
        enable_stdout: false,
        rotation: RotationPolicy::Never,
        retention_days: 7,
    };

    let logger = LoggerImpl::init(&config).unwrap();

    info!(run_id = "r-1", "run started");
    assert_eq!(scored_iteration(0), 1);
    warn!(agent = "reviewer", attempt = 1, "attempt failed, retrying");

    // A second global init must fail instead of replacing the first.
    assert!(LoggerImpl::init(&config).is_err());

    // Dropping the guard flushes the non-blocking writer.
    drop(logger);
    std::thread::sleep(Duration::from_millis(100));

    let log_files: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("medscribe.log"))
        .collect();
    assert_eq!(log_files.len(), 1, "expected exactly one log file");

    let content = fs::read_to_string(log_files[0].path()).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is JSON"))
        .collect();

    assert!(lines.iter().any(|l| l["fields"]["message"] == "run started"));
    assert!(lines
        .iter()
        .any(|l| l["fields"]["message"] == "iteration scored" && l["span"]["name"] == "scored_iteration"));
    assert!(lines.iter().any(|l| l["level"] == "WARN" && l["fields"]["agent"] == "reviewer"));
}
