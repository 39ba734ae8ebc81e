// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use gem2claude_core::error::ProxyError;
use std::time::Duration;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        ProxyError::Config("bad prefix".to_string()),
        ProxyError::Store("connection refused".to_string()),
        ProxyError::StoreTimeout(Duration::from_millis(500)),
        ProxyError::WrongType("sig:tool:x".to_string()),
        ProxyError::InvalidFamily("mistral".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_error_kinds() {
    assert_eq!(ProxyError::Config("x".to_string()).kind(), "config");
    assert_eq!(ProxyError::Store("x".to_string()).kind(), "backend");
    assert_eq!(
        ProxyError::StoreTimeout(Duration::from_millis(1)).kind(),
        "timeout"
    );
    assert_eq!(ProxyError::WrongType("k".to_string()).kind(), "wrong_type");
    assert_eq!(
        ProxyError::InvalidFamily("x".to_string()).kind(),
        "invalid_family"
    );
}

#[test]
fn test_timeout_error_mentions_deadline() {
    let error = ProxyError::StoreTimeout(Duration::from_millis(500));
    assert!(format!("{}", error).contains("500ms"));
}

#[test]
fn test_json_error_conversion() {
    let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
    let error: ProxyError = err.into();
    assert_eq!(error.kind(), "json");
    assert!(format!("{}", error).starts_with("JSON error"));
}

#[test]
fn test_invalid_family_error() {
    let error = "mistral".parse::<gem2claude_core::ModelFamily>().unwrap_err();
    assert!(format!("{}", error).contains("mistral"));
}
