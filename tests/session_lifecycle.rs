mod common;

use common::{stack_with_hosts, VM1_HOSTS};
use serde_json::Value;
use sshgate::errors::ToolErrorKind;

#[tokio::test]
async fn connect_reports_alias_and_description() {
    let stack = stack_with_hosts(VM1_HOSTS);

    let result = stack
        .manager
        .handle_tool("ssh_connect", serde_json::json!({"host": "vm1"}))
        .await
        .expect("connect vm1");
    assert_eq!(
        result.get("message").and_then(Value::as_str),
        Some("Successfully connected to vm1 (primary test VM)")
    );

    let status = stack
        .manager
        .handle_tool("ssh_status", serde_json::json!({}))
        .await
        .expect("status");
    assert_eq!(status.get("connected").and_then(Value::as_bool), Some(true));
    assert_eq!(status.get("alias").and_then(Value::as_str), Some("vm1"));
    assert_eq!(
        status.get("hostname").and_then(Value::as_str),
        Some("10.0.0.5")
    );
}

#[tokio::test]
async fn literal_hostname_has_no_credential_and_fails_before_dialing() {
    let stack = stack_with_hosts(VM1_HOSTS);

    let err = stack
        .manager
        .handle_tool("ssh_connect", serde_json::json!({"host": "10.1.2.3"}))
        .await
        .expect_err("no stored credential");
    assert_eq!(err.kind, ToolErrorKind::Config);
    assert_eq!(stack.dialer.dial_count(), 0);
    assert!(!stack.sessions.is_connected());
}

#[tokio::test]
async fn profile_without_password_fails_with_config_error() {
    let stack = stack_with_hosts(VM1_HOSTS);

    let err = stack
        .manager
        .handle_tool("ssh_connect", serde_json::json!({"host": "vm2"}))
        .await
        .expect_err("vm2 has no password");
    assert_eq!(err.kind, ToolErrorKind::Config);
    assert!(err.message.contains("vm2"));
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let stack = stack_with_hosts(VM1_HOSTS);
    stack
        .manager
        .handle_tool("ssh_connect", serde_json::json!({"host": "vm1"}))
        .await
        .expect("connect vm1");

    let first = stack
        .manager
        .handle_tool("ssh_disconnect", serde_json::json!({}))
        .await
        .expect("first disconnect");
    assert_eq!(
        first.get("message").and_then(Value::as_str),
        Some("Disconnected from vm1")
    );
    assert!(stack.dialer.handle(0).is_closed());

    let second = stack
        .manager
        .handle_tool("ssh_disconnect", serde_json::json!({}))
        .await
        .expect("second disconnect");
    assert_eq!(
        second.get("message").and_then(Value::as_str),
        Some("No active connection")
    );
}

#[tokio::test]
async fn reconnect_closes_the_previous_connection() {
    let stack = stack_with_hosts(VM1_HOSTS);
    stack
        .manager
        .handle_tool("ssh_connect", serde_json::json!({"host": "vm1"}))
        .await
        .expect("first connect");
    stack
        .manager
        .handle_tool("ssh_connect", serde_json::json!({"host": "vm1"}))
        .await
        .expect("second connect");

    assert_eq!(stack.dialer.dial_count(), 2);
    assert!(
        stack.dialer.handle(0).is_closed(),
        "replaced connection must be closed, not leaked"
    );
    assert!(!stack.dialer.handle(1).is_closed());
    assert!(stack.sessions.is_connected());
}

#[tokio::test]
async fn status_when_disconnected_carries_no_host_fields() {
    let stack = stack_with_hosts(VM1_HOSTS);

    let status = stack
        .manager
        .handle_tool("ssh_status", serde_json::json!({}))
        .await
        .expect("status");
    assert_eq!(
        status.get("connected").and_then(Value::as_bool),
        Some(false)
    );
    assert!(status.get("alias").is_none());
    assert!(status.get("hostname").is_none());
}

#[tokio::test]
async fn list_hosts_exposes_profiles_without_secrets() {
    let stack = stack_with_hosts(VM1_HOSTS);

    let listing = stack
        .manager
        .handle_tool("ssh_list_hosts", serde_json::json!({}))
        .await
        .expect("list hosts");
    assert_eq!(listing.get("count").and_then(Value::as_u64), Some(2));
    let rendered = serde_json::to_string(&listing).expect("serialize listing");
    assert!(!rendered.contains("s3cret"));
    assert!(!rendered.contains("password"));

    let hosts = listing
        .get("hosts")
        .and_then(Value::as_array)
        .expect("hosts array");
    assert_eq!(
        hosts[0].get("alias").and_then(Value::as_str),
        Some("vm1")
    );
    assert_eq!(
        hosts[0].get("username").and_then(Value::as_str),
        Some("admin")
    );
    assert_eq!(hosts[1].get("port").and_then(Value::as_u64), Some(22));
    assert_eq!(
        hosts[1].get("username").and_then(Value::as_str),
        Some("root")
    );
}
