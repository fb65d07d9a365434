// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake provider for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::config::LaunchConfig;
use crate::error::ProviderError;
use crate::provider::{
    LaunchedSession, ProcessHandle, Provider, RunOutcome, EVENT_CHANNEL_CAPACITY,
};
use async_trait::async_trait;
use hl_core::{AssistantSessionId, ProviderKind, ResultEvent, StreamEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Recorded call to FakeProvider. `launch` indexes into the launch order.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Launch { config: LaunchConfig },
    Interrupt { launch: usize },
    Kill { launch: usize },
}

/// What one fake launch plays back
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    pub events: Vec<StreamEvent>,
    /// Keep the stream open after the events until interrupted, killed or cancelled
    pub hold_open: bool,
    /// Ignore interrupts; only kill or cancellation close the stream
    pub stubborn: bool,
    /// Delay before each event
    pub pace: Option<Duration>,
    /// Outcome override; by default the last scripted result wins
    pub outcome: Option<RunOutcome>,
}

impl FakeScript {
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn stubborn(mut self) -> Self {
        self.hold_open = true;
        self.stubborn = true;
        self
    }

    pub fn paced(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn with_outcome(mut self, outcome: RunOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }
}

struct FakeState {
    scripts: VecDeque<FakeScript>,
    default_script: FakeScript,
    launch_error: Option<ProviderError>,
    available: bool,
    handles: Vec<Arc<FakeHandle>>,
}

/// Fake provider for testing
///
/// Plays back queued [`FakeScript`]s and records all calls.
#[derive(Clone)]
pub struct FakeProvider {
    kind: ProviderKind,
    inner: Arc<Mutex<FakeState>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::with_kind(ProviderKind::Claude)
    }

    pub fn with_kind(kind: ProviderKind) -> Self {
        Self {
            kind,
            inner: Arc::new(Mutex::new(FakeState {
                scripts: VecDeque::new(),
                default_script: FakeScript::new(vec![StreamEvent::result(
                    "",
                    ResultEvent {
                        subtype: "success".to_string(),
                        ..ResultEvent::default()
                    },
                )]),
                launch_error: None,
                available: true,
                handles: Vec::new(),
            })),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a script for the next launch
    pub fn push_script(&self, script: FakeScript) {
        self.inner.lock().scripts.push_back(script);
    }

    /// Script used once the queue is empty
    pub fn set_default_script(&self, script: FakeScript) {
        self.inner.lock().default_script = script;
    }

    /// Set error to return on next launch
    pub fn set_launch_error(&self, error: ProviderError) {
        self.inner.lock().launch_error = Some(error);
    }

    pub fn set_available(&self, available: bool) {
        self.inner.lock().available = available;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    /// Configs of every launch, in order
    pub fn launches(&self) -> Vec<LaunchConfig> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ProviderCall::Launch { config } => Some(config.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn interrupt_count(&self) -> usize {
        self.count(|c| matches!(c, ProviderCall::Interrupt { .. }))
    }

    pub fn kill_count(&self) -> usize {
        self.count(|c| matches!(c, ProviderCall::Kill { .. }))
    }

    fn count(&self, pred: impl Fn(&ProviderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Handle of the `index`th launch
    pub fn handle(&self, index: usize) -> Option<Arc<dyn ProcessHandle>> {
        self.inner
            .lock()
            .handles
            .get(index)
            .map(|h| Arc::clone(h) as Arc<dyn ProcessHandle>)
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.inner.lock().available
    }

    fn path(&self) -> Option<PathBuf> {
        self.is_available()
            .then(|| PathBuf::from(format!("/fake/{}", self.kind)))
    }

    async fn version(&self) -> Result<String, ProviderError> {
        Ok("fake 0.0.0".to_string())
    }

    async fn launch(
        &self,
        cancel: CancellationToken,
        config: LaunchConfig,
    ) -> Result<LaunchedSession, ProviderError> {
        self.calls.lock().push(ProviderCall::Launch {
            config: config.clone(),
        });
        let mut inner = self.inner.lock();
        if !inner.available {
            return Err(ProviderError::Unavailable(self.kind.as_str()));
        }
        if let Some(error) = inner.launch_error.take() {
            return Err(error);
        }
        config.validate()?;

        let script = inner
            .scripts
            .pop_front()
            .unwrap_or_else(|| inner.default_script.clone());
        let (done_tx, done_rx) = watch::channel(None);
        let handle = Arc::new(FakeHandle {
            launch: inner.handles.len(),
            id: Mutex::new(AssistantSessionId::default()),
            stubborn: script.stubborn,
            close: CancellationToken::new(),
            stop: Mutex::new(None),
            done: done_rx,
            calls: Arc::clone(&self.calls),
        });
        inner.handles.push(Arc::clone(&handle));
        drop(inner);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(play(script, tx, Arc::clone(&handle), cancel, done_tx));
        Ok(LaunchedSession {
            handle,
            events: rx,
        })
    }
}

async fn play(
    script: FakeScript,
    tx: mpsc::Sender<StreamEvent>,
    handle: Arc<FakeHandle>,
    cancel: CancellationToken,
    done: watch::Sender<Option<RunOutcome>>,
) {
    let mut last_result = None;
    for event in script.events {
        if let Some(pace) = script.pace {
            tokio::select! {
                _ = tokio::time::sleep(pace) => {}
                _ = handle.close.cancelled() => break,
                _ = cancel.cancelled() => break,
            }
        }
        if handle.close.is_cancelled() || cancel.is_cancelled() {
            break;
        }
        if event.has_session_id() {
            let mut id = handle.id.lock();
            if id.is_empty() {
                *id = event.assistant_session_id.clone();
            }
        }
        if let Some(result) = event.as_result() {
            last_result = Some(result.clone());
        }
        let _ = tx.send(event).await;
    }
    if script.hold_open {
        tokio::select! {
            _ = handle.close.cancelled() => {}
            _ = cancel.cancelled() => {}
        }
    }
    drop(tx);

    let stopped = handle.stop.lock().take();
    let outcome = match stopped {
        Some(reason) => Err(reason),
        None if cancel.is_cancelled() => {
            Err(ProviderError::Cancelled("cancellation requested".to_string()))
        }
        None => script
            .outcome
            .unwrap_or_else(|| last_result.ok_or(ProviderError::NoResult)),
    };
    done.send_replace(Some(outcome));
}

struct FakeHandle {
    launch: usize,
    id: Mutex<AssistantSessionId>,
    stubborn: bool,
    close: CancellationToken,
    stop: Mutex<Option<ProviderError>>,
    done: watch::Receiver<Option<RunOutcome>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

#[async_trait]
impl ProcessHandle for FakeHandle {
    fn id(&self) -> AssistantSessionId {
        self.id.lock().clone()
    }

    async fn wait(&self) -> RunOutcome {
        let mut rx = self.done.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Err(ProviderError::NoResult)),
            Err(_) => Err(ProviderError::Reader("fake session dropped".to_string())),
        };
        outcome
    }

    async fn interrupt(&self) -> Result<(), ProviderError> {
        self.calls.lock().push(ProviderCall::Interrupt {
            launch: self.launch,
        });
        if !self.stubborn && !self.close.is_cancelled() {
            self.stop
                .lock()
                .get_or_insert(ProviderError::Exited("signal: 2 (SIGINT)".to_string()));
            self.close.cancel();
        }
        Ok(())
    }

    async fn kill(&self) -> Result<(), ProviderError> {
        self.calls.lock().push(ProviderCall::Kill {
            launch: self.launch,
        });
        if !self.close.is_cancelled() {
            *self.stop.lock() = Some(ProviderError::Killed);
            self.close.cancel();
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
