//! The workflow controller.
//!
//! Owns everything one reader session accumulates (chapters, session id,
//! rendered file list) and sequences the two backend calls. All output goes
//! through a [`WorkflowView`].

use log::{debug, info, warn};
use reader_client::{Chapter, ClientError, GenerateRequest, ReaderBackend, SessionId};
use std::sync::Arc;

use super::state::WorkflowState;
use crate::config::ReaderConfig;
use crate::input::{InputSelection, Submission};
use crate::progress::{CancelHandle, Outcome, ProgressSimulator, ProgressStep};
use crate::render::{FileListView, chapter_previews};
use crate::view::{ControlState, WorkflowView};

const NO_CHAPTERS: &str = "No chapters to process.";
const BUSY: &str = "A request is already in progress.";

/// How a successful generate request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// The file list was rendered.
    Rendered,
    /// The controller was torn down during the progress animation; the
    /// session id is kept but nothing was rendered.
    TornDown,
}

pub struct WorkflowController {
    backend: Arc<dyn ReaderBackend>,
    input: InputSelection,
    chapters: Vec<Chapter>,
    session: Option<SessionId>,
    files: Option<FileListView>,
    state: WorkflowState,
    progress: ProgressSimulator,
    max_upload_bytes: u64,
}

impl WorkflowController {
    pub fn new(
        backend: Arc<dyn ReaderBackend>,
        progress: ProgressSimulator,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            backend,
            input: InputSelection::new(),
            chapters: Vec::new(),
            session: None,
            files: None,
            state: WorkflowState::Idle,
            progress,
            max_upload_bytes,
        }
    }

    pub fn from_config(backend: Arc<dyn ReaderBackend>, config: &ReaderConfig) -> Self {
        Self::new(
            backend,
            ProgressSimulator::new(config.chapter_delay(), config.finalize_delay()),
            config.max_upload_bytes(),
        )
    }

    pub fn input_mut(&mut self) -> &mut InputSelection {
        &mut self.input
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    pub fn files(&self) -> Option<&FileListView> {
        self.files.as_ref()
    }

    pub fn files_mut(&mut self) -> Option<&mut FileListView> {
        self.files.as_mut()
    }

    /// Handle that tears the controller down from elsewhere (e.g. Ctrl-C).
    pub fn teardown_handle(&self) -> CancelHandle {
        self.progress.cancel_handle()
    }

    /// Stop the progress timer. An animation in progress ends immediately.
    pub fn teardown(&self) {
        self.progress.cancel();
    }

    /// Send the current input to the backend and keep the returned chapters.
    ///
    /// A failed ingest drops the chapters but keeps the previous session and
    /// file list; only a successful upload resets them.
    pub async fn ingest(&mut self, view: &mut dyn WorkflowView) -> reader_client::Result<()> {
        if !self.state.can_ingest() {
            return Err(ClientError::Validation(BUSY.to_string()));
        }

        let submission = match self.input.submission() {
            Ok(submission) => submission,
            Err(e) => {
                view.alert(&e.to_string());
                return Err(e);
            }
        };

        self.transition(WorkflowState::Processing, view);
        view.submit_control(ControlState::submit_busy());

        let flight = InFlight {
            controller: self,
            view,
        };
        let this = &mut *flight.controller;
        let view = &mut *flight.view;

        let result = this.upload(submission).await;

        view.submit_control(ControlState::submit_idle());

        match result {
            Ok(chapters) => {
                info!("Document split into {} chapters", chapters.len());
                this.chapters = chapters;
                this.session = None;
                if this.files.take().is_some() {
                    view.hide_files();
                }
                view.show_chapters(&chapter_previews(&this.chapters));
                view.generate_control_visible(true);
                this.transition(WorkflowState::Ready, view);
                Ok(())
            }
            Err(e) => {
                warn!("Processing failed: {}", e);
                this.chapters.clear();
                view.alert(&format!("Error processing document: {}", e));
                view.generate_control_visible(false);
                this.transition(WorkflowState::Error, view);
                this.transition(WorkflowState::Idle, view);
                Err(e)
            }
        }
    }

    async fn upload(&self, submission: Submission) -> reader_client::Result<Vec<Chapter>> {
        let request = submission.into_request(self.max_upload_bytes).await?;
        debug!("Sending upload to {} backend", self.backend.name());

        let chapters = self.backend.upload(request).await?;
        if chapters.is_empty() {
            return Err(ClientError::Declined(
                "No content found to process".to_string(),
            ));
        }
        Ok(chapters)
    }

    /// Synthesize the held chapters, animate the estimate, render the files.
    ///
    /// Starting a generation discards the previous session and file list,
    /// whether or not the new request succeeds.
    pub async fn generate_audio(
        &mut self,
        voice: &str,
        view: &mut dyn WorkflowView,
    ) -> reader_client::Result<GenerateOutcome> {
        if self.chapters.is_empty() {
            view.alert(NO_CHAPTERS);
            return Err(ClientError::Validation(NO_CHAPTERS.to_string()));
        }
        if !self.state.can_generate() {
            return Err(ClientError::Validation(BUSY.to_string()));
        }

        self.transition(WorkflowState::GeneratingAudio, view);
        self.session = None;
        if self.files.take().is_some() {
            view.hide_files();
        }
        view.generate_control_visible(false);
        view.progress(&ProgressStep::starting());

        let flight = InFlight {
            controller: self,
            view,
        };
        let this = &mut *flight.controller;
        let view = &mut *flight.view;

        let request = GenerateRequest {
            chapters: this.chapters.clone(),
            voice: voice.to_string(),
        };

        let batch = match this.backend.generate_audio(request).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Audio generation failed: {}", e);
                view.alert(&format!("Error generating audio: {}", e));
                view.hide_progress();
                view.generate_control_visible(true);
                this.transition(WorkflowState::Error, view);
                this.transition(WorkflowState::Ready, view);
                return Err(e);
            }
        };

        info!(
            "Session {} returned {} files",
            batch.session_id,
            batch.files.len()
        );
        this.session = Some(batch.session_id.clone());

        let total = this.chapters.len();
        let outcome = this.progress.run(total, |step| view.progress(step)).await;

        view.hide_progress();
        if outcome == Outcome::Cancelled {
            info!("Torn down before rendering session {}", batch.session_id);
            this.transition(WorkflowState::Ready, view);
            return Ok(GenerateOutcome::TornDown);
        }

        let list = FileListView::render(this.backend.endpoints(), &batch.session_id, &batch.files);
        view.show_files(&list);
        this.files = Some(list);
        this.transition(WorkflowState::Done, view);

        Ok(GenerateOutcome::Rendered)
    }

    fn transition(&mut self, next: WorkflowState, view: &mut dyn WorkflowView) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
        view.state_changed(next);
    }
}

impl Drop for WorkflowController {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Held across a request's awaits. If the operation's future is dropped
/// before it settles (a `select!` or timeout elsewhere), the controller
/// leaves its busy state and the view gets its controls back.
struct InFlight<'c, 'v> {
    controller: &'c mut WorkflowController,
    view: &'v mut dyn WorkflowView,
}

impl Drop for InFlight<'_, '_> {
    fn drop(&mut self) {
        let abandoned = self.controller.state;
        if !abandoned.is_busy() {
            return;
        }

        warn!("{:?} abandoned before the request finished", abandoned);
        match abandoned {
            WorkflowState::Processing => self.view.submit_control(ControlState::submit_idle()),
            WorkflowState::GeneratingAudio => {
                self.view.hide_progress();
                self.view.generate_control_visible(true);
            }
            _ => {}
        }

        let settled = if self.controller.chapters.is_empty() {
            WorkflowState::Idle
        } else {
            WorkflowState::Ready
        };
        self.controller.transition(settled, &mut *self.view);
    }
}
