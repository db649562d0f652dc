//! Presentation surface driven by the workflow controller.

use indicatif::{ProgressBar, ProgressStyle};

use crate::progress::ProgressStep;
use crate::render::{ChapterPreview, EntryControl, FileListView};
use crate::workflow::WorkflowState;

pub const SUBMIT_LABEL: &str = "Process Document";
pub const SUBMIT_BUSY_LABEL: &str = "Processing...";
pub const SPEAK_LABEL: &str = "Generate Speech";
pub const SPEAK_BUSY_LABEL: &str = "Generating...";

/// Enabled flag and label of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub enabled: bool,
    pub label: &'static str,
}

impl ControlState {
    pub fn submit_idle() -> Self {
        Self {
            enabled: true,
            label: SUBMIT_LABEL,
        }
    }

    pub fn submit_busy() -> Self {
        Self {
            enabled: false,
            label: SUBMIT_BUSY_LABEL,
        }
    }

    pub fn speak_idle() -> Self {
        Self {
            enabled: true,
            label: SPEAK_LABEL,
        }
    }

    pub fn speak_busy() -> Self {
        Self {
            enabled: false,
            label: SPEAK_BUSY_LABEL,
        }
    }
}

/// Everything the controller shows the user goes through this trait.
pub trait WorkflowView {
    fn state_changed(&mut self, _state: WorkflowState) {}

    /// A blocking, user-visible message.
    fn alert(&mut self, message: &str);

    fn submit_control(&mut self, control: ControlState);

    fn show_chapters(&mut self, previews: &[ChapterPreview]);

    fn generate_control_visible(&mut self, visible: bool);

    fn progress(&mut self, step: &ProgressStep);

    fn hide_progress(&mut self);

    fn show_files(&mut self, files: &FileListView);

    /// The previously shown file list is no longer current.
    fn hide_files(&mut self) {}
}

/// Terminal rendering: alerts on stderr, results on stdout, an indicatif
/// bar for the progress estimate.
#[derive(Default)]
pub struct TerminalView {
    bar: Option<ProgressBar>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar(&mut self) -> &ProgressBar {
        self.bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(100);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        })
    }
}

impl WorkflowView for TerminalView {
    fn state_changed(&mut self, state: WorkflowState) {
        log::debug!("Workflow state: {:?} (busy: {})", state, state.is_busy());
    }

    fn alert(&mut self, message: &str) {
        if let Some(pb) = &self.bar {
            pb.suspend(|| eprintln!("{}", message));
        } else {
            eprintln!("{}", message);
        }
    }

    fn submit_control(&mut self, control: ControlState) {
        if !control.enabled {
            eprintln!("{}", control.label);
        }
    }

    fn show_chapters(&mut self, previews: &[ChapterPreview]) {
        println!("Chapters: {}", previews.len());
        for preview in previews {
            println!();
            println!("{}", preview.heading);
            println!("   {}", preview.preview.replace('\n', " "));
        }
        println!();
    }

    fn generate_control_visible(&mut self, _visible: bool) {}

    fn progress(&mut self, step: &ProgressStep) {
        let pb = self.bar();
        pb.set_position(step.percent.round().clamp(0.0, 100.0) as u64);
        pb.set_message(step.message.clone());
    }

    fn hide_progress(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }

    fn show_files(&mut self, files: &FileListView) {
        self.hide_progress();
        println!("Session: {}", files.session);
        println!("Download all: {}", files.archive);
        println!();
        for entry in files.entries() {
            let detail = match &entry.control {
                EntryControl::Player(player) => {
                    format!("[{}] {}", player.button_label(), player.source)
                }
                EntryControl::Unavailable(reason) => reason.clone(),
            };
            println!("  [{:>7}] {}  {}", entry.badge.label(), entry.filename, detail);
        }
    }
}
