//! File/text input selection.
//!
//! The reader takes either a document or pasted text, never both: choosing
//! one clears the other.

use log::debug;
use reader_client::{ClientError, IngestRequest, SUPPORTED_EXTENSIONS, is_supported_document};
use std::path::{Path, PathBuf};

pub const NO_INPUT_PROMPT: &str = "Please select a file or enter text to process.";

/// What the user has chosen to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    File(PathBuf),
    Text(String),
}

/// Current state of the two inputs.
#[derive(Debug, Clone, Default)]
pub struct InputSelection {
    file: Option<PathBuf>,
    text: String,
}

impl InputSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose a file (clearing any typed text), or clear the file with None.
    pub fn select_file(&mut self, file: Option<PathBuf>) {
        if file.is_some() && !self.text.is_empty() {
            debug!("File selected; clearing typed text");
            self.text.clear();
        }
        self.file = file;
    }

    /// Replace the typed text. Non-blank text clears the selected file.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        if !self.text.trim().is_empty() && self.file.take().is_some() {
            debug!("Text entered; clearing selected file");
        }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Validate the inputs into a submission. Nothing is sent on error.
    pub fn submission(&self) -> Result<Submission, ClientError> {
        if let Some(file) = &self.file {
            return Ok(Submission::File(file.clone()));
        }

        let text = self.text.trim();
        if text.is_empty() {
            return Err(ClientError::Validation(NO_INPUT_PROMPT.to_string()));
        }
        Ok(Submission::Text(text.to_string()))
    }
}

impl Submission {
    /// Turn the submission into an upload payload, reading the file if any.
    pub async fn into_request(self, max_bytes: u64) -> Result<IngestRequest, ClientError> {
        match self {
            Submission::Text(text) => Ok(IngestRequest::Text(text)),
            Submission::File(path) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        ClientError::Validation(format!("Not a file: {}", path.display()))
                    })?;

                if !is_supported_document(&file_name) {
                    return Err(ClientError::Validation(format!(
                        "Unsupported file type: {} (expected one of: {})",
                        file_name,
                        SUPPORTED_EXTENSIONS.join(", ")
                    )));
                }

                let size = tokio::fs::metadata(&path).await?.len();
                if size > max_bytes {
                    return Err(ClientError::Validation(format!(
                        "{} is {} bytes; the limit is {} bytes",
                        file_name, size, max_bytes
                    )));
                }

                let bytes = tokio::fs::read(&path).await?;
                debug!("Read {} ({} bytes)", file_name, bytes.len());
                Ok(IngestRequest::File { file_name, bytes })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    #[test]
    fn test_empty_inputs_are_rejected() {
        let selection = InputSelection::new();
        let err = selection.submission().unwrap_err();
        assert!(err.is_local());
        assert_eq!(err.to_string(), NO_INPUT_PROMPT);
    }

    #[test]
    fn test_blank_text_is_rejected() {
        let mut selection = InputSelection::new();
        selection.set_text("   \n\t");
        assert!(selection.submission().is_err());
    }

    #[test]
    fn test_selecting_file_clears_text() {
        let mut selection = InputSelection::new();
        selection.set_text("some words");
        selection.select_file(Some(PathBuf::from("book.epub")));
        assert_eq!(selection.text(), "");
        assert_eq!(
            selection.submission().unwrap(),
            Submission::File(PathBuf::from("book.epub"))
        );
    }

    #[test]
    fn test_typing_clears_file() {
        let mut selection = InputSelection::new();
        selection.select_file(Some(PathBuf::from("book.epub")));
        selection.set_text("  hello  ");
        assert!(selection.file().is_none());
        assert_eq!(
            selection.submission().unwrap(),
            Submission::Text("hello".to_string())
        );
    }

    #[test]
    fn test_blank_text_keeps_file() {
        let mut selection = InputSelection::new();
        selection.select_file(Some(PathBuf::from("book.epub")));
        selection.set_text("  ");
        assert!(selection.file().is_some());
    }

    #[test]
    fn test_clearing_file_keeps_text() {
        let mut selection = InputSelection::new();
        selection.set_text("hello");
        selection.select_file(None);
        assert_eq!(selection.text(), "hello");
    }

    #[derive(Debug, Clone)]
    enum Action {
        File(Option<String>),
        Text(String),
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            proptest::option::of("[a-z]{1,8}\\.txt").prop_map(Action::File),
            "[ a-z]{0,6}".prop_map(Action::Text),
        ]
    }

    proptest! {
        #[test]
        fn at_most_one_input_is_live(actions in proptest::collection::vec(action(), 0..20)) {
            let mut selection = InputSelection::new();
            for action in &actions {
                match action {
                    Action::File(f) => selection.select_file(f.as_ref().map(PathBuf::from)),
                    Action::Text(t) => selection.set_text(t.clone()),
                }
                let has_file = selection.file().is_some();
                let has_text = !selection.text().trim().is_empty();
                prop_assert!(!(has_file && has_text));
            }

            // A non-blank final choice is what gets submitted
            match (actions.last(), selection.submission()) {
                (Some(Action::File(Some(f))), result) => {
                    prop_assert_eq!(result.unwrap(), Submission::File(PathBuf::from(f)));
                }
                (Some(Action::Text(t)), result) if !t.trim().is_empty() => {
                    prop_assert_eq!(result.unwrap(), Submission::Text(t.trim().to_string()));
                }
                _ => {}
            }
        }

        #[test]
        fn empty_inputs_never_submit(texts in proptest::collection::vec("[ \t\n]{0,4}", 0..5)) {
            let mut selection = InputSelection::new();
            for t in texts {
                selection.set_text(t);
            }
            prop_assert!(selection.submission().is_err());
        }
    }

    #[tokio::test]
    async fn test_file_submission_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"Chapter 1\nIt begins.").unwrap();

        let request = Submission::File(path).into_request(1024).await.unwrap();
        assert_eq!(
            request,
            IngestRequest::File {
                file_name: "story.txt".to_string(),
                bytes: b"Chapter 1\nIt begins.".to_vec(),
            }
        );
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"ID3").unwrap();

        let err = Submission::File(path).into_request(1024).await.unwrap_err();
        assert!(err.is_local());
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, vec![b'a'; 2048]).unwrap();

        let err = Submission::File(path).into_request(1024).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = Submission::File(PathBuf::from("/nonexistent/dir/book.txt"))
            .into_request(1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }
}
