use super::error::{MultiplexError, TransportError};
use super::logging;
use std::time::Duration;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn test_parse_level_falls_back_to_info() {
    assert_eq!(logging::parse_level("WARNING"), tracing::Level::WARN);
    assert_eq!(logging::parse_level(" trace "), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("verbose"), tracing::Level::INFO);
}

#[test]
fn test_error_labels_and_retryability() {
    let failed = MultiplexError::CreationFailed {
        topic: "events:global".to_string(),
        source: TransportError::Unavailable("down".to_string()),
    };
    assert_eq!(failed.as_label(), "creation_failed");
    assert!(failed.is_retryable());

    let timed_out = MultiplexError::OpenTimedOut {
        topic: "events:global".to_string(),
        timeout: Duration::from_millis(50),
    };
    assert!(timed_out.is_retryable());

    let invalid = MultiplexError::InvalidTopic { reason: "empty" };
    assert_eq!(invalid.as_label(), "invalid_topic");
    assert!(!invalid.is_retryable());
    assert!(!MultiplexError::ShutDown.is_retryable());
}

#[test]
fn test_error_messages_name_the_topic() {
    let err = MultiplexError::TeardownFailed {
        topic: "notifications:42".to_string(),
        source: TransportError::ChannelNotFound("abc".to_string()),
    };
    let text = err.to_string();
    assert!(text.contains("notifications:42"));
    assert!(text.contains("channel abc not found"));

    let summary = MultiplexError::CleanupIncomplete {
        failed: vec!["a".to_string(), "b".to_string()],
    };
    assert!(summary.to_string().starts_with("cleanup finished with 2 failed"));
}
