use hooklift_logger::{LevelFilter, Logger};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn json_file_sink_writes_records() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let logger = Logger::builder()
        .name("integration-file")
        .console(false)
        .directory(&log_dir)
        .json(true)
        .level(LevelFilter::INFO)
        .init()?;
    assert!(logger.writes_files());

    tracing::info!(hook = "session", "hook ready");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(log_file)?;
    assert!(contents.contains("\"hook\":\"session\""), "record should be JSON: {contents}");
    Ok(())
}
