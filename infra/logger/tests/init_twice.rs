use hooklift_logger::{LevelFilter, Logger, LoggerError};

#[test]
fn second_init_reports_subscriber_error() {
    let _logger = Logger::builder()
        .name("integration-twice")
        .level(LevelFilter::INFO)
        .init()
        .expect("first init should succeed");

    let err = Logger::builder()
        .name("integration-twice-again")
        .init()
        .expect_err("second init should fail");

    assert!(matches!(err, LoggerError::Subscriber { .. }));
}
