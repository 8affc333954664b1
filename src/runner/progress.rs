//! Progress events, phase state machine, and cooperative cancellation.
//! The caller's callback is untrusted: invocations are serialized and
//! panics are isolated so a broken observer can never take the pipeline
//! down with it.

use crate::error::PipelineError;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Idle,
    Researching,
    Directing,
    Tagging,
    GeneratingLogos,
    GeneratingAssets,
    CompositingMockups,
    ComposingSocial,
    Done,
    DonePartial,
    Failed,
    Cancelled,
}

impl PhaseState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Done | Self::DonePartial | Self::Failed | Self::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Started,
    Done,
    Failed,
    Skipped,
}

/// One progress event: a stage boundary or a parallel item completing.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: PhaseState,
    pub item: Option<String>,
    pub status: ItemStatus,
    pub elapsed_ms: u64,
    pub detail: Option<String>,
}

pub type ProgressFn = dyn Fn(ProgressEvent) + Send + Sync;

/// Serializes callback invocations so the caller observes one event at a
/// time, and swallows callback panics.
#[derive(Clone)]
pub struct ProgressSink {
    callback: Option<Arc<ProgressFn>>,
    guard: Arc<Mutex<()>>,
    started: Instant,
    terminal_emitted: Arc<AtomicBool>,
}

impl ProgressSink {
    pub fn new(callback: Option<Arc<ProgressFn>>) -> Self {
        Self {
            callback,
            guard: Arc::new(Mutex::new(())),
            started: Instant::now(),
            terminal_emitted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn stage(&self, stage: PhaseState) {
        self.emit(ProgressEvent {
            stage,
            item: None,
            status: ItemStatus::Started,
            elapsed_ms: self.elapsed_ms(),
            detail: None,
        });
    }

    pub fn item(&self, stage: PhaseState, item: &str, status: ItemStatus, detail: Option<String>) {
        self.emit(ProgressEvent {
            stage,
            item: Some(item.to_string()),
            status,
            elapsed_ms: self.elapsed_ms(),
            detail,
        });
    }

    /// Terminal events are emitted at most once per phase; after the first
    /// one the sink goes silent.
    pub fn terminal(&self, stage: PhaseState, detail: Option<String>) {
        debug_assert!(stage.is_terminal());
        if self.terminal_emitted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.emit_unchecked(ProgressEvent {
            stage,
            item: None,
            status: if stage == PhaseState::Failed {
                ItemStatus::Failed
            } else {
                ItemStatus::Done
            },
            elapsed_ms: self.elapsed_ms(),
            detail,
        });
    }

    fn emit(&self, event: ProgressEvent) {
        if self.terminal_emitted.load(Ordering::SeqCst) {
            return;
        }
        self.emit_unchecked(event);
    }

    fn emit_unchecked(&self, event: ProgressEvent) {
        let Some(callback) = &self.callback else {
            return;
        };
        let _serialized = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        let result = catch_unwind(AssertUnwindSafe(|| (callback.as_ref())(event)));
        if result.is_err() {
            tracing::warn!("progress callback panicked; event dropped");
        }
    }
}

/// Shared cooperative-cancellation flag, checked at suspension points.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Checkpoint: error out of the current stage when cancellation has been
    /// requested. Partial files already written stay on disk.
    pub fn checkpoint(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
