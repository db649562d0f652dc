//! Simulated synthesis progress.
//!
//! The backend reports nothing until every chapter is done, so the bar is a
//! time estimate: one fixed delay per chapter, then a short finalize pause.
//! The result is already known when the animation starts.

use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// One update of the progress indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStep {
    pub kind: StepKind,
    /// 0.0 ..= 100.0
    pub percent: f32,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Shown before the synthesize request goes out.
    Starting,
    /// A chapter-delay step; `index` is 1-based.
    Chapter { index: usize, total: usize },
    Finalizing,
}

impl ProgressStep {
    pub fn starting() -> Self {
        Self {
            kind: StepKind::Starting,
            percent: 0.0,
            message: "Starting audio generation...".to_string(),
        }
    }

    fn chapter(index: usize, total: usize) -> Self {
        Self {
            kind: StepKind::Chapter { index, total },
            percent: index as f32 * 100.0 / total as f32,
            message: format!("Processing chapter {} of {}...", index, total),
        }
    }

    fn finalizing() -> Self {
        Self {
            kind: StepKind::Finalizing,
            percent: 100.0,
            message: "Finalizing audio files...".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// Stops a running (or future) animation. Cancellation is permanent.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called (immediately if it already was).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so the channel cannot close here
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Cancellable timer that fakes per-chapter progress.
#[derive(Debug)]
pub struct ProgressSimulator {
    per_chapter: Duration,
    finalize: Duration,
    cancel: CancelHandle,
}

impl ProgressSimulator {
    pub fn new(per_chapter: Duration, finalize: Duration) -> Self {
        Self {
            per_chapter,
            finalize,
            cancel: CancelHandle::new(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Emit one step per chapter, each after `per_chapter`, then a
    /// finalizing step followed by `finalize`.
    pub async fn run<F>(&self, total: usize, mut on_step: F) -> Outcome
    where
        F: FnMut(&ProgressStep),
    {
        let mut rx = self.cancel.tx.subscribe();

        for index in 1..=total {
            if !wait(&mut rx, self.per_chapter).await {
                debug!("Progress cancelled at chapter {} of {}", index, total);
                return Outcome::Cancelled;
            }
            on_step(&ProgressStep::chapter(index, total));
        }

        if *rx.borrow() {
            return Outcome::Cancelled;
        }
        on_step(&ProgressStep::finalizing());
        if !wait(&mut rx, self.finalize).await {
            return Outcome::Cancelled;
        }

        Outcome::Completed
    }
}

/// Sleep for `delay` unless cancelled first. Returns false on cancellation.
async fn wait(rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    if *rx.borrow_and_update() {
        return false;
    }

    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = rx.wait_for(|cancelled| *cancelled) => false,
    }
}
