//! Unit tests for plugin error types.

use rstest::rstest;

use super::*;

#[test]
fn not_found_error_message_includes_id() {
    let error = PluginError::NotFound { id: "abc-123".into() };
    let message = error.to_string();
    assert!(
        message.contains("abc-123"),
        "expected id in message: {message}"
    );
    assert!(
        message.contains("not found"),
        "expected 'not found' in message: {message}"
    );
}

#[test]
fn execution_error_message_includes_detail() {
    let error = PluginError::Execution {
        plugin: "resize".into(),
        message: "attempt to index a nil value".into(),
        trace: Some("stack traceback: ...".into()),
    };
    let message = error.to_string();
    assert!(
        message.contains("resize"),
        "expected plugin name in message: {message}"
    );
    assert!(
        message.contains("nil value"),
        "expected detail in message: {message}"
    );
}

#[rstest]
#[case::timeout(
    PluginError::Timeout {
        plugin: "slow".into(),
        budget_ms: 1500,
    },
    "1500"
)]
#[case::missing_module(
    PluginError::MissingModule {
        plugin: "resize".into(),
        module: "main".into(),
    },
    "main.lua"
)]
fn error_message_includes_field(#[case] error: PluginError, #[case] expected_value: &str) {
    let message = error.to_string();
    assert!(
        message.contains(expected_value),
        "expected {expected_value} in message: {message}"
    );
}

#[test]
fn io_error_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    // PluginError wraps Arc<io::Error> to keep it Send+Sync.
    let error = PluginError::io("/tmp/pkg", std::io::Error::other("boom"));
    assert_send_sync::<PluginError>();
    let message = error.to_string();
    assert!(
        message.contains("/tmp/pkg"),
        "expected path in message: {message}"
    );
}

#[rstest]
#[case::validation(PluginError::validation("bad"), ErrorKind::Validation)]
#[case::duplicate(PluginError::DuplicateName { name: "x".into() }, ErrorKind::Validation)]
#[case::entry_point(
    PluginError::EntryPoint { entry_point: "mainrun".into() },
    ErrorKind::Validation
)]
#[case::not_found(PluginError::NotFound { id: "x".into() }, ErrorKind::NotFound)]
#[case::missing_function(
    PluginError::MissingFunction {
        plugin: "p".into(),
        module: "main".into(),
        function: "run".into(),
    },
    ErrorKind::NotFound
)]
#[case::disabled(PluginError::Disabled { name: "x".into() }, ErrorKind::Disabled)]
#[case::load(PluginError::Load { plugin: "p".into(), message: "syntax".into() }, ErrorKind::Load)]
#[case::timeout(PluginError::Timeout { plugin: "p".into(), budget_ms: 1 }, ErrorKind::Execution)]
#[case::registry(PluginError::Registry { message: "corrupt".into() }, ErrorKind::System)]
fn kind_classification(#[case] error: PluginError, #[case] expected: ErrorKind) {
    assert_eq!(error.kind(), expected);
}

#[rstest]
#[case::validation(ErrorKind::Validation, "validation")]
#[case::disabled(ErrorKind::Disabled, "disabled")]
#[case::system(ErrorKind::System, "system")]
fn kind_display(#[case] kind: ErrorKind, #[case] expected: &str) {
    assert_eq!(kind.to_string(), expected);
}
