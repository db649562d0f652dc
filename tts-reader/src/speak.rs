//! One-shot synthesis: a whole document or text in, one WAV file out.
//!
//! No chapters, no session. The audio arrives as the response body and is
//! written to `tts_output.wav`.

use log::info;
use reader_client::{ClientError, ReaderBackend};
use std::path::{Path, PathBuf};

use crate::input::InputSelection;
use crate::view::{ControlState, WorkflowView};

pub const SPEECH_FILENAME: &str = "tts_output.wav";

/// Request cap of the one-shot endpoint.
pub const SPEAK_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

pub const NO_SPEECH_INPUT: &str = "Please enter some text or upload a file.";

/// Send the input to `/process` and save the returned audio in `dir`.
pub async fn speak(
    backend: &dyn ReaderBackend,
    input: &InputSelection,
    dir: &Path,
    view: &mut dyn WorkflowView,
) -> reader_client::Result<PathBuf> {
    let Ok(submission) = input.submission() else {
        view.alert(NO_SPEECH_INPUT);
        return Err(ClientError::Validation(NO_SPEECH_INPUT.to_string()));
    };

    view.submit_control(ControlState::speak_busy());
    let result = synthesize(backend, submission, dir).await;
    view.submit_control(ControlState::speak_idle());

    match result {
        Ok(path) => {
            info!("Speech saved to {}", path.display());
            Ok(path)
        }
        Err(e) => {
            view.alert(&format!("Error: {}", e));
            Err(e)
        }
    }
}

async fn synthesize(
    backend: &dyn ReaderBackend,
    submission: crate::input::Submission,
    dir: &Path,
) -> reader_client::Result<PathBuf> {
    let request = submission.into_request(SPEAK_MAX_UPLOAD_BYTES).await?;
    let audio = backend.synthesize_once(request).await?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(SPEECH_FILENAME);
    tokio::fs::write(&path, &audio).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressStep;
    use crate::render::{ChapterPreview, FileListView};
    use reader_client::{IngestRequest, MockBackend};

    #[derive(Default)]
    struct Recorder {
        alerts: Vec<String>,
        controls: Vec<ControlState>,
    }

    impl WorkflowView for Recorder {
        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }
        fn submit_control(&mut self, control: ControlState) {
            self.controls.push(control);
        }
        fn show_chapters(&mut self, _previews: &[ChapterPreview]) {}
        fn generate_control_visible(&mut self, _visible: bool) {}
        fn progress(&mut self, _step: &ProgressStep) {}
        fn hide_progress(&mut self) {}
        fn show_files(&mut self, _files: &FileListView) {}
    }

    #[tokio::test]
    async fn test_speak_saves_wav() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::with_chapters(vec![]).with_audio(b"RIFFwav".to_vec());
        let mut input = InputSelection::new();
        input.set_text("  Hello there  ");
        let mut view = Recorder::default();

        let path = speak(&backend, &input, dir.path(), &mut view).await.unwrap();

        assert_eq!(path, dir.path().join("tts_output.wav"));
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFFwav");
        assert_eq!(
            backend.last_synthesize(),
            Some(IngestRequest::Text("Hello there".to_string()))
        );
        assert_eq!(
            view.controls,
            vec![ControlState::speak_busy(), ControlState::speak_idle()]
        );
    }

    #[tokio::test]
    async fn test_speak_without_input_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::with_chapters(vec![]);
        let mut view = Recorder::default();

        let err = speak(&backend, &InputSelection::new(), dir.path(), &mut view)
            .await
            .unwrap_err();

        assert!(err.is_local());
        assert_eq!(backend.request_count(), 0);
        assert_eq!(view.alerts, vec![NO_SPEECH_INPUT]);
        assert!(view.controls.is_empty());
    }

    #[tokio::test]
    async fn test_speak_failure_restores_button() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::with_chapters(vec![]).failing_synthesize(
            ClientError::Declined("No text provided from input or file.".to_string()),
        );
        let mut input = InputSelection::new();
        input.set_text("hello");
        let mut view = Recorder::default();

        assert!(speak(&backend, &input, dir.path(), &mut view).await.is_err());

        assert_eq!(view.alerts, vec!["Error: No text provided from input or file."]);
        assert_eq!(view.controls.last(), Some(&ControlState::speak_idle()));
        assert!(!dir.path().join(SPEECH_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_speak_rejects_files_over_cap() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("big.txt");
        std::fs::write(&doc, vec![b'a'; (SPEAK_MAX_UPLOAD_BYTES + 1) as usize]).unwrap();
        let backend = MockBackend::with_chapters(vec![]);
        let mut input = InputSelection::new();
        input.select_file(Some(doc));
        let mut view = Recorder::default();

        let err = speak(&backend, &input, dir.path(), &mut view).await.unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(backend.request_count(), 0);
    }
}
