// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced provider wrapper for consistent observability

use crate::config::LaunchConfig;
use crate::error::ProviderError;
use crate::provider::{LaunchedSession, ProcessHandle, Provider, RunOutcome};
use async_trait::async_trait;
use hl_core::{AssistantSessionId, ProviderKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Wrapper that adds tracing to any Provider
#[derive(Clone)]
pub struct TracedProvider<P> {
    inner: P,
}

impl<P> TracedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: Provider> Provider for TracedProvider<P> {
    fn kind(&self) -> ProviderKind {
        self.inner.kind()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn path(&self) -> Option<PathBuf> {
        self.inner.path()
    }

    async fn version(&self) -> Result<String, ProviderError> {
        let result = self.inner.version().await;
        tracing::debug!(provider = self.name(), version = ?result.as_ref().ok(), "probed");
        result
    }

    async fn launch(
        &self,
        cancel: CancellationToken,
        config: LaunchConfig,
    ) -> Result<LaunchedSession, ProviderError> {
        let provider = self.name();
        let span = tracing::info_span!(
            "provider.launch",
            provider,
            resume = config.is_resume(),
            model = %config.model,
        );
        async {
            tracing::info!(
                query_len = config.query.len(),
                mcp_servers = config.mcp_servers.len(),
                "starting"
            );
            let start = Instant::now();
            let result = self.inner.launch(cancel, config).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match result {
                Ok(session) => {
                    tracing::info!(elapsed_ms, "process spawned");
                    Ok(LaunchedSession {
                        handle: Arc::new(TracedHandle {
                            inner: session.handle,
                            provider,
                            started: start,
                        }),
                        events: session.events,
                    })
                }
                Err(e) => {
                    tracing::error!(elapsed_ms, error = %e, "launch failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Handle wrapper that logs signals and the final outcome
struct TracedHandle {
    inner: Arc<dyn ProcessHandle>,
    provider: &'static str,
    started: Instant,
}

#[async_trait]
impl ProcessHandle for TracedHandle {
    fn id(&self) -> AssistantSessionId {
        self.inner.id()
    }

    async fn wait(&self) -> RunOutcome {
        let result = self.inner.wait().await;
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let id = self.inner.id();
        tracing::info_span!("provider.wait", provider = self.provider, assistant_session_id = %id)
            .in_scope(|| match &result {
                Ok(r) if r.is_error => {
                    tracing::warn!(elapsed_ms, subtype = %r.subtype, "run reported an error")
                }
                Ok(r) => tracing::debug!(elapsed_ms, cost_usd = ?r.cost_usd, "run finished"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "run failed"),
            });
        result
    }

    async fn interrupt(&self) -> Result<(), ProviderError> {
        let result = self.inner.interrupt().await;
        let id = self.inner.id();
        tracing::info_span!("provider.interrupt", provider = self.provider, assistant_session_id = %id)
            .in_scope(|| match &result {
                Ok(()) => tracing::info!("interrupt sent"),
                Err(e) => tracing::warn!(error = %e, "interrupt failed"),
            });
        result
    }

    async fn kill(&self) -> Result<(), ProviderError> {
        let result = self.inner.kill().await;
        let id = self.inner.id();
        tracing::info_span!("provider.kill", provider = self.provider, assistant_session_id = %id)
            .in_scope(|| match &result {
                Ok(()) => tracing::info!("killed"),
                Err(e) => tracing::warn!(error = %e, "kill failed (may be expected)"),
            });
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
