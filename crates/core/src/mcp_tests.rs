// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn stamp_overwrites_inherited_run_id() {
    let mut server = McpServerConfig::stdio("npx", vec!["server".into()]);
    server.stamp_run_id(&RunId::new("parent-run"));
    server.stamp_run_id(&RunId::new("child-run"));
    let env = server.env().unwrap();
    assert_eq!(env.get(RUN_ID_ENV).map(String::as_str), Some("child-run"));
    assert_eq!(env.len(), 1);
}

#[test]
fn stamp_leaves_http_servers_alone() {
    let mut server = McpServerConfig::http("http://localhost:9000/mcp");
    server.stamp_run_id(&RunId::new("r"));
    assert_eq!(server, McpServerConfig::http("http://localhost:9000/mcp"));
}

#[test]
fn deserializes_both_shapes() {
    let stdio: McpServerConfig =
        serde_json::from_str(r#"{"command":"hlyr","args":["mcp"],"env":{"A":"1"}}"#).unwrap();
    assert!(matches!(stdio, McpServerConfig::Stdio { ref command, .. } if command == "hlyr"));

    let http: McpServerConfig =
        serde_json::from_str(r#"{"type":"http","url":"http://x","headers":{"Auth":"t"}}"#).unwrap();
    match http {
        McpServerConfig::Http { url, headers, .. } => {
            assert_eq!(url, "http://x");
            assert_eq!(headers.get("Auth").map(String::as_str), Some("t"));
        }
        other => panic!("expected http server, got {other:?}"),
    }
}

#[test]
fn http_serializes_with_type_tag() {
    let json = serde_json::to_value(McpServerConfig::http("http://x")).unwrap();
    assert_eq!(json, serde_json::json!({"type": "http", "url": "http://x"}));
}
