use hooklift_logger::{LevelFilter, Logger};

#[test]
fn console_logger_has_no_file_worker() {
    let logger = Logger::builder()
        .name("integration-console")
        .level(LevelFilter::INFO)
        .init()
        .expect("logger should initialize");

    assert!(!logger.writes_files());
}
