// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hl_core::test_support::{epoch, session_with_status};
use hl_core::{SessionStatus, RUN_ID_ENV};

fn parent() -> Session {
    let mut parent = session_with_status("p1", SessionStatus::Completed);
    parent.assistant_session_id = AssistantSessionId::new("A-parent");
    parent.model = "opus".into();
    parent.system_prompt = "S".into();
    parent.allowed_tools = vec!["r".into(), "w".into()];
    parent.max_turns = Some(12);
    parent.title = "parent title".into();
    parent
}

fn mcp(name: &str, command: &str) -> McpServer {
    McpServer {
        id: 0,
        session_id: SessionId::new("p1"),
        name: name.into(),
        config: McpServerConfig::stdio(command, vec![]),
    }
}

#[test]
fn continue_inherits_settings_but_not_max_turns() {
    let request = ContinueConfig {
        max_turns: Some(5),
        ..ContinueConfig::new("p1", "next")
    };
    let child = merge_continue(&parent(), &[], &request, epoch());

    assert_eq!(child.model, "opus");
    assert_eq!(child.allowed_tools, vec!["r", "w"]);
    assert_eq!(child.system_prompt, "S");
    assert_eq!(child.max_turns, Some(5));
    assert_eq!(child.query, "next");
    assert_eq!(child.working_dir, Some(PathBuf::from("/tmp")));
    assert_eq!(child.title, "");
    assert_eq!(child.parent_session_id, Some(SessionId::new("p1")));
    assert_eq!(child.resume_session_id, AssistantSessionId::new("A-parent"));
}

#[test]
fn parent_max_turns_is_dropped_when_request_has_none() {
    let child = merge_continue(&parent(), &[], &ContinueConfig::new("p1", "next"), epoch());
    assert_eq!(child.max_turns, None);
}

#[test]
fn explicit_fields_override_inherited_ones() {
    let request = ContinueConfig {
        model: "sonnet".into(),
        system_prompt: "T".into(),
        disallowed_tools: vec!["Bash".into()],
        allowed_tools: vec!["Read".into()],
        working_dir: Some(PathBuf::from("/work")),
        fork_session: true,
        ..ContinueConfig::new("p1", "next")
    };
    let child = merge_continue(&parent(), &[], &request, epoch());

    assert_eq!(child.model, "sonnet");
    assert_eq!(child.system_prompt, "T");
    assert_eq!(child.allowed_tools, vec!["Read"]);
    assert_eq!(child.disallowed_tools, vec!["Bash"]);
    assert_eq!(child.working_dir, Some(PathBuf::from("/work")));
    assert!(child.fork_session);
}

#[test]
fn provider_tag_is_inherited() {
    let mut parent = parent();
    parent.provider = ProviderKind::OpenCode;
    let child = merge_continue(&parent, &[], &ContinueConfig::new("p1", "next"), epoch());
    assert_eq!(child.provider, ProviderKind::OpenCode);
}

#[test]
fn mcp_servers_are_inherited_or_replaced() {
    let inherited = [mcp("alpha", "a"), mcp("beta", "b")];

    let child = merge_continue(&parent(), &inherited, &ContinueConfig::new("p1", "q"), epoch());
    assert_eq!(
        child.mcp_servers.keys().collect::<Vec<_>>(),
        vec!["alpha", "beta"]
    );

    let mut replacement = IndexMap::new();
    replacement.insert("gamma".to_string(), McpServerConfig::http("http://x"));
    let request = ContinueConfig {
        mcp_servers: Some(replacement),
        ..ContinueConfig::new("p1", "q")
    };
    let child = merge_continue(&parent(), &inherited, &request, epoch());
    assert_eq!(child.mcp_servers.keys().collect::<Vec<_>>(), vec!["gamma"]);
}

#[yare::parameterized(
    unexpired_is_inherited = { Some(60),  None,        true  },
    expired_is_dropped     = { Some(-60), None,        false },
    no_expiry_is_dropped   = { None,      None,        false },
    request_turns_it_off   = { Some(60),  Some(false), false },
)]
fn dangerous_skip_inheritance(expires_in: Option<i64>, requested: Option<bool>, expected: bool) {
    let now = epoch();
    let mut parent = parent();
    parent.dangerously_skip_permissions = true;
    parent.dangerously_skip_permissions_expires_at =
        expires_in.map(|s| now + chrono::Duration::seconds(s));
    let request = ContinueConfig {
        dangerously_skip_permissions: requested,
        ..ContinueConfig::new("p1", "q")
    };

    let child = merge_continue(&parent, &[], &request, now);
    assert_eq!(child.dangerously_skip_permissions, expected);
    if expected {
        assert_eq!(
            child.dangerously_skip_permissions_expires_at,
            parent.dangerously_skip_permissions_expires_at
        );
    } else {
        assert_eq!(child.dangerously_skip_permissions_expires_at, None);
    }
}

#[test]
fn requested_skip_gets_fresh_expiry() {
    let request = ContinueConfig {
        dangerously_skip_permissions: Some(true),
        dangerously_skip_permissions_timeout: Some(Duration::from_secs(300)),
        ..ContinueConfig::new("p1", "q")
    };
    let child = merge_continue(&parent(), &[], &request, epoch());
    assert!(child.dangerously_skip_permissions);
    assert_eq!(
        child.dangerously_skip_permissions_expires_at,
        Some(epoch() + chrono::Duration::seconds(300))
    );
}

#[test]
fn auto_accept_edits_is_inherited_unless_overridden() {
    let mut parent = parent();
    parent.auto_accept_edits = true;
    let child = merge_continue(&parent, &[], &ContinueConfig::new("p1", "q"), epoch());
    assert!(child.auto_accept_edits);

    let request = ContinueConfig {
        auto_accept_edits: Some(false),
        ..ContinueConfig::new("p1", "q")
    };
    assert!(!merge_continue(&parent, &[], &request, epoch()).auto_accept_edits);
}

#[test]
fn launch_config_carries_run_id_everywhere() {
    let mut config = SessionConfig::new("hello");
    config
        .mcp_servers
        .insert("tools".into(), McpServerConfig::stdio("tool-server", vec![]));
    config
        .mcp_servers
        .insert("remote".into(), McpServerConfig::http("http://remote"));
    config.resume_session_id = AssistantSessionId::new("A1");

    let launch = config.to_launch_config(&RunId::new("run-9"));
    assert_eq!(launch.env.get(RUN_ID_ENV).map(String::as_str), Some("run-9"));
    let tools_env = launch.mcp_servers["tools"].env().unwrap();
    assert_eq!(tools_env.get(RUN_ID_ENV).map(String::as_str), Some("run-9"));
    assert!(launch.mcp_servers["remote"].env().is_none());
    assert!(launch.is_resume());
}

#[test]
fn stamping_resets_inherited_run_id() {
    let mut server = McpServerConfig::stdio("tool-server", vec![]);
    server.stamp_run_id(&RunId::new("run-parent"));
    let mut config = SessionConfig::new("q");
    config.mcp_servers.insert("tools".into(), server);

    config.stamp_run_id(&RunId::new("run-child"));
    let env = config.mcp_servers["tools"].env().unwrap();
    assert_eq!(env.get(RUN_ID_ENV).map(String::as_str), Some("run-child"));
}

#[test]
fn session_row_starts_with_summary() {
    let config = SessionConfig {
        working_dir: Some(PathBuf::from("/w")),
        dangerously_skip_permissions_expires_at: Some(epoch()),
        ..SessionConfig::new("Fix   the\nbug")
    };
    let row = config.to_session(SessionId::new("s1"), RunId::new("r1"), epoch());
    assert_eq!(row.summary, "Fix the bug");
    assert_eq!(row.working_dir, "/w");
    assert_eq!(row.status, SessionStatus::Starting);
    assert_eq!(row.dangerously_skip_permissions_expires_at, None);
}

#[test]
fn draft_round_trips_into_a_request() {
    let mut draft = parent();
    draft.status = SessionStatus::Draft;
    let config = SessionConfig::from_draft(&draft, &[mcp("alpha", "a")]);
    assert_eq!(config.model, "opus");
    assert_eq!(config.max_turns, Some(12));
    assert_eq!(config.title, "parent title");
    assert!(config.mcp_servers.contains_key("alpha"));
    assert!(config.resume_session_id.is_empty());
}
