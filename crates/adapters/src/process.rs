// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess-backed sessions shared by the CLI providers.
//!
//! Each launch spawns three tasks:
//!
//! ```text
//! parser  ── stdout lines ─▶ Dialect ─▶ events channel (dropped at EOF)
//! stderr  ── bounded capture
//! driver  ── child.wait / cancel / timeout / kill ─▶ waits parser + stderr ─▶ outcome
//! ```

use crate::config::OutputFormat;
use crate::env;
use crate::error::ProviderError;
use crate::provider::{LaunchedSession, ProcessHandle, RunOutcome, EVENT_CHANNEL_CAPACITY};
use crate::subprocess::send_signal;
use async_trait::async_trait;
use hl_core::{AssistantSessionId, ResultEvent, StreamEvent};
use parking_lot::Mutex;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Translates one provider's stdout dialect into normalized events
pub(crate) trait Dialect: Send + 'static {
    /// Parse one non-empty stdout line
    fn parse_line(&mut self, line: &str) -> Result<Vec<StreamEvent>, ProviderError>;

    /// Events to emit after EOF
    fn finish(&mut self) -> Vec<StreamEvent> {
        Vec::new()
    }
}

/// Everything needed to start one subprocess
pub(crate) struct SpawnSpec {
    pub provider: &'static str,
    pub command: Command,
    pub output_format: OutputFormat,
    pub timeout: Option<Duration>,
    /// Files that must exist until the subprocess exits
    pub keep_alive: Vec<NamedTempFile>,
}

#[derive(Default)]
struct Shared {
    id: Mutex<AssistantSessionId>,
    result: Mutex<Option<ResultEvent>>,
}

impl Shared {
    fn observe(&self, event: &StreamEvent) {
        if event.has_session_id() {
            let mut id = self.id.lock();
            if id.is_empty() {
                *id = event.assistant_session_id.clone();
            }
        }
        if let Some(result) = event.as_result() {
            *self.result.lock() = Some(result.clone());
        }
    }
}

/// Spawn the subprocess and its reader tasks.
pub(crate) fn spawn_session<D: Dialect>(
    mut spec: SpawnSpec,
    dialect: D,
    cancel: CancellationToken,
) -> Result<LaunchedSession, ProviderError> {
    let provider = spec.provider;
    spec.command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = spec
        .command
        .spawn()
        .map_err(|e| ProviderError::LaunchFailed(format!("{provider}: {e}")))?;
    let pid = child.id();
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ProviderError::LaunchFailed(format!("{provider}: stdout not captured")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ProviderError::LaunchFailed(format!("{provider}: stderr not captured")))?;
    tracing::debug!(provider, pid, "subprocess spawned");

    let shared = Arc::new(Shared::default());
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let parser = tokio::spawn(parse_stdout(
        provider,
        stdout,
        spec.output_format,
        dialect,
        tx,
        Arc::clone(&shared),
    ));
    let stderr_task = tokio::spawn(drain_stderr(stderr, env::stderr_limit_bytes()));

    let (done_tx, done_rx) = watch::channel(None);
    let kill = CancellationToken::new();
    let driver = Driver {
        provider,
        pid,
        timeout: spec.timeout,
        cancel,
        kill: kill.clone(),
        keep_alive: spec.keep_alive,
    };
    tokio::spawn(driver.run(child, parser, stderr_task, Arc::clone(&shared), done_tx));

    Ok(LaunchedSession {
        handle: Arc::new(ChildHandle {
            provider,
            pid,
            shared,
            done: done_rx,
            kill,
        }),
        events: rx,
    })
}

async fn parse_stdout<R, D>(
    provider: &'static str,
    stdout: R,
    format: OutputFormat,
    mut dialect: D,
    tx: mpsc::Sender<StreamEvent>,
    shared: Arc<Shared>,
) where
    R: AsyncRead + Unpin,
    D: Dialect,
{
    match format {
        OutputFormat::StreamJson => {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(provider, error = %e, "stdout read failed");
                        break;
                    }
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match dialect.parse_line(line) {
                    Ok(events) => {
                        for (i, event) in events.into_iter().enumerate() {
                            let event = if i == 0 { event.with_raw(line) } else { event };
                            forward(&tx, &shared, event).await;
                        }
                    }
                    Err(e) => tracing::warn!(provider, error = %e, "skipping stream line"),
                }
            }
            for event in dialect.finish() {
                forward(&tx, &shared, event).await;
            }
        }
        OutputFormat::Json | OutputFormat::Text => {
            let mut body = String::new();
            let mut reader = BufReader::new(stdout);
            if let Err(e) = reader.read_to_string(&mut body).await {
                tracing::warn!(provider, error = %e, "stdout read failed");
            }
            match single_result(format, &body) {
                Ok(event) => forward(&tx, &shared, event).await,
                Err(e) => tracing::warn!(provider, error = %e, "unparseable result body"),
            }
        }
    }
    // Dropping `tx` here closes the events channel exactly once
}

/// Result event for the one-shot output formats
pub(crate) fn single_result(format: OutputFormat, body: &str) -> Result<StreamEvent, ProviderError> {
    let result = match format {
        OutputFormat::Json => serde_json::from_str::<ResultEvent>(body.trim())
            .map_err(|e| ProviderError::ParseFailed(e.to_string()))?,
        _ => ResultEvent {
            subtype: "success".to_string(),
            result: Some(body.trim().to_string()),
            ..ResultEvent::default()
        },
    };
    let id = result.session_id.clone().unwrap_or_default();
    Ok(StreamEvent::result(&id, result))
}

async fn forward(tx: &mpsc::Sender<StreamEvent>, shared: &Shared, event: StreamEvent) {
    shared.observe(&event);
    // A dropped receiver must not stop the drain, or the child blocks on a full pipe
    let _ = tx.send(event).await;
}

async fn drain_stderr<R: AsyncRead + Unpin>(mut stderr: R, limit: usize) -> String {
    let mut captured = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = limit.saturating_sub(captured.len());
                captured.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
    String::from_utf8_lossy(&captured).into_owned()
}

struct Driver {
    provider: &'static str,
    pid: Option<u32>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
    kill: CancellationToken,
    keep_alive: Vec<NamedTempFile>,
}

async fn sleep_until_opt(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl Driver {
    async fn run(
        self,
        mut child: Child,
        parser: JoinHandle<()>,
        stderr: JoinHandle<String>,
        shared: Arc<Shared>,
        done: watch::Sender<Option<RunOutcome>>,
    ) {
        let grace = env::interrupt_grace();
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut stop: Option<ProviderError> = None;
        let mut escalate_at: Option<Instant> = None;
        let mut killed = false;

        let exit = loop {
            tokio::select! {
                status = child.wait() => break status.map_err(|e| e.to_string()),
                _ = self.kill.cancelled(), if !killed => {
                    killed = true;
                    if let Err(e) = child.start_kill() {
                        tracing::warn!(provider = self.provider, error = %e, "kill failed");
                    }
                }
                _ = self.cancel.cancelled(), if stop.is_none() => {
                    stop = Some(ProviderError::Cancelled("cancellation requested".to_string()));
                    self.interrupt().await;
                    escalate_at = Some(Instant::now() + grace);
                }
                _ = sleep_until_opt(deadline), if stop.is_none() && deadline.is_some() => {
                    let timeout = self.timeout.unwrap_or_default();
                    tracing::warn!(provider = self.provider, ?timeout, "session timed out");
                    stop = Some(ProviderError::Timeout(timeout));
                    self.interrupt().await;
                    escalate_at = Some(Instant::now() + grace);
                }
                _ = sleep_until_opt(escalate_at), if escalate_at.is_some() && !killed => {
                    killed = true;
                    if let Err(e) = child.start_kill() {
                        tracing::warn!(provider = self.provider, error = %e, "kill failed");
                    }
                }
            }
        };

        let reader_error = parser.await.err().map(|e| e.to_string());
        let stderr = stderr.await.unwrap_or_default();
        drop(self.keep_alive);

        let result = shared.result.lock().take();
        let outcome = settle(RunReport {
            stop,
            reader_error,
            result,
            exit,
            stderr,
            killed,
        });
        match &outcome {
            Ok(r) => tracing::debug!(provider = self.provider, is_error = r.is_error, "run finished"),
            Err(e) => tracing::debug!(provider = self.provider, error = %e, "run failed"),
        }
        done.send_replace(Some(outcome));
    }

    async fn interrupt(&self) {
        if let Some(pid) = self.pid {
            if let Err(e) = send_signal(pid, "INT").await {
                tracing::warn!(provider = self.provider, pid, error = %e, "interrupt failed");
            }
        }
    }
}

/// Raw facts collected when a run ends
pub(crate) struct RunReport {
    /// Set when the run was stopped by cancellation or timeout
    pub stop: Option<ProviderError>,
    pub reader_error: Option<String>,
    pub result: Option<ResultEvent>,
    pub exit: Result<ExitStatus, String>,
    pub stderr: String,
    pub killed: bool,
}

/// Reduce a finished run to its outcome.
///
/// Stderr only becomes the error when no successful result was parsed.
pub(crate) fn settle(report: RunReport) -> RunOutcome {
    if let Some(err) = report.stop {
        return Err(err);
    }
    if let Some(err) = report.reader_error {
        return Err(ProviderError::Reader(err));
    }
    let stderr = report.stderr.trim();
    match report.result {
        Some(result) if !result.is_error => {
            if !stderr.is_empty() {
                tracing::warn!(stderr, "stderr output alongside a successful result");
            }
            Ok(result)
        }
        Some(mut result) => {
            if result.error.as_deref().unwrap_or("").is_empty() && !stderr.is_empty() {
                result.error = Some(stderr.to_string());
            }
            Ok(result)
        }
        None if report.killed => Err(ProviderError::Killed),
        None if !stderr.is_empty() => Err(ProviderError::Stderr(stderr.to_string())),
        None => match report.exit {
            Ok(status) if status.success() => Err(ProviderError::NoResult),
            Ok(status) => Err(ProviderError::Exited(status.to_string())),
            Err(e) => Err(ProviderError::Exited(e)),
        },
    }
}

struct ChildHandle {
    provider: &'static str,
    pid: Option<u32>,
    shared: Arc<Shared>,
    done: watch::Receiver<Option<RunOutcome>>,
    kill: CancellationToken,
}

impl ChildHandle {
    fn is_done(&self) -> bool {
        self.done.borrow().is_some()
    }
}

#[async_trait]
impl ProcessHandle for ChildHandle {
    fn id(&self) -> AssistantSessionId {
        self.shared.id.lock().clone()
    }

    async fn wait(&self) -> RunOutcome {
        let mut rx = self.done.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome
                .clone()
                .unwrap_or_else(|| Err(ProviderError::Reader("missing outcome".to_string()))),
            Err(_) => Err(ProviderError::Reader(
                "session driver exited without an outcome".to_string(),
            )),
        };
        outcome
    }

    async fn interrupt(&self) -> Result<(), ProviderError> {
        if self.is_done() {
            return Ok(());
        }
        let pid = self
            .pid
            .ok_or_else(|| ProviderError::Signal(format!("{}: no pid", self.provider)))?;
        send_signal(pid, "INT").await.map_err(ProviderError::Signal)
    }

    async fn kill(&self) -> Result<(), ProviderError> {
        self.kill.cancel();
        Ok(())
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
