// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hl-core: Shared data model for the HumanLayer session daemon

pub mod approval;
pub mod bus_event;
pub mod clock;
pub mod conversation;
pub mod id;
pub mod mcp;
pub mod records;
pub mod session;
pub mod stream;
pub mod summary;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use approval::{Approval, ApprovalDecision, ApprovalStatus};
pub use bus_event::{BusEvent, BusEventType, EventFilter};
pub use clock::{Clock, FakeClock, SystemClock};
pub use conversation::{ConversationEvent, ConversationEventType, Role, ToolApprovalStatus};
pub use id::{
    ApprovalId, AssistantSessionId, IdGen, RunId, SequentialIdGen, SessionId, UuidIdGen,
};
pub use mcp::{McpServer, McpServerConfig, RUN_ID_ENV};
pub use records::{FileSnapshot, RawEvent};
pub use session::{ProviderKind, Session, SessionStatus, SessionUpdate, UnknownVariant};
pub use stream::{
    ContentBlock, InitInfo, MessageEvent, ResultEvent, StepFinish, StreamEvent, StreamEventKind,
    SystemEvent, TokenUsage, ToolResultContent,
};
pub use summary::{calculate_summary, model_label};
pub use time_fmt::format_duration;
