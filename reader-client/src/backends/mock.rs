//! Mock reader backend for testing
//!
//! Answers from canned chapters and files, can be told to fail either call,
//! and records what it was asked.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::{Endpoints, ReaderBackend};
use crate::error::{ClientError, Result};
use crate::types::{
    AudioBatch, Chapter, FileStatus, GenerateRequest, GeneratedFile, IngestRequest, SessionId,
};

const MOCK_BASE_URL: &str = "http://reader.test";

/// A mock backend for testing the workflow without a server
pub struct MockBackend {
    endpoints: Endpoints,
    /// Chapters returned by `upload`
    chapters: Vec<Chapter>,
    /// Files returned by `generate_audio` (None = one success per chapter)
    files: Option<Vec<GeneratedFile>>,
    session_id: String,
    /// Body returned by `synthesize_once`
    audio: Vec<u8>,
    upload_error: Mutex<Option<ClientError>>,
    generate_error: Mutex<Option<ClientError>>,
    synthesize_error: Mutex<Option<ClientError>>,
    upload_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    synthesize_calls: AtomicUsize,
    last_upload: Mutex<Option<IngestRequest>>,
    last_generate: Mutex<Option<GenerateRequest>>,
    last_synthesize: Mutex<Option<IngestRequest>>,
}

impl MockBackend {
    /// Create a backend whose upload returns the given chapters
    pub fn with_chapters(chapters: Vec<Chapter>) -> Self {
        Self {
            endpoints: Endpoints::new(MOCK_BASE_URL).expect("mock base URL is valid"),
            chapters,
            files: None,
            session_id: "mock-session".to_string(),
            audio: b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec(),
            upload_error: Mutex::new(None),
            generate_error: Mutex::new(None),
            synthesize_error: Mutex::new(None),
            upload_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            synthesize_calls: AtomicUsize::new(0),
            last_upload: Mutex::new(None),
            last_generate: Mutex::new(None),
            last_synthesize: Mutex::new(None),
        }
    }

    /// Use a fixed file list for `generate_audio`
    pub fn with_files(mut self, files: Vec<GeneratedFile>) -> Self {
        self.files = Some(files);
        self
    }

    /// Set the session id handed out by `generate_audio`
    pub fn with_session_id(mut self, session_id: &str) -> Self {
        self.session_id = session_id.to_string();
        self
    }

    /// Use a fixed body for `synthesize_once`
    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = audio;
        self
    }

    /// Make every `upload` call fail with the given error
    pub fn failing_upload(self, error: ClientError) -> Self {
        self.set_upload_error(Some(error));
        self
    }

    /// Make every `generate_audio` call fail with the given error
    pub fn failing_generate(self, error: ClientError) -> Self {
        self.set_generate_error(Some(error));
        self
    }

    /// Make every `synthesize_once` call fail with the given error
    pub fn failing_synthesize(self, error: ClientError) -> Self {
        *self.synthesize_error.lock().unwrap() = Some(error);
        self
    }

    /// Change the `upload` failure of a backend already in use (None = succeed)
    pub fn set_upload_error(&self, error: Option<ClientError>) {
        *self.upload_error.lock().unwrap() = error;
    }

    /// Change the `generate_audio` failure of a backend already in use
    pub fn set_generate_error(&self, error: Option<ClientError>) {
        *self.generate_error.lock().unwrap() = error;
    }

    /// Get the number of times upload() was called
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Get the number of times generate_audio() was called
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Get the number of times synthesize_once() was called
    pub fn synthesize_calls(&self) -> usize {
        self.synthesize_calls.load(Ordering::SeqCst)
    }

    /// Total number of requests "sent"
    pub fn request_count(&self) -> usize {
        self.upload_calls() + self.generate_calls() + self.synthesize_calls()
    }

    pub fn last_upload(&self) -> Option<IngestRequest> {
        self.last_upload.lock().unwrap().clone()
    }

    pub fn last_generate(&self) -> Option<GenerateRequest> {
        self.last_generate.lock().unwrap().clone()
    }

    pub fn last_synthesize(&self) -> Option<IngestRequest> {
        self.last_synthesize.lock().unwrap().clone()
    }

    /// Filename the backend gives a chapter's audio
    pub fn audio_filename(index: usize, title: &str) -> String {
        format!("chapter_{:02}_{}.wav", index + 1, title.replace(' ', "_"))
    }
}

#[async_trait]
impl ReaderBackend for MockBackend {
    async fn upload(&self, request: IngestRequest) -> Result<Vec<Chapter>> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_upload.lock().unwrap() = Some(request);

        if let Some(err) = self.upload_error.lock().unwrap().as_ref() {
            return Err(clone_error(err));
        }

        Ok(self.chapters.clone())
    }

    async fn generate_audio(&self, request: GenerateRequest) -> Result<AudioBatch> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);

        let files = self.files.clone().unwrap_or_else(|| {
            request
                .chapters
                .iter()
                .enumerate()
                .map(|(i, chapter)| {
                    let mut file = GeneratedFile::new(
                        Self::audio_filename(i, &chapter.title),
                        FileStatus::Success,
                    );
                    file.title = Some(chapter.title.clone());
                    file
                })
                .collect()
        });
        *self.last_generate.lock().unwrap() = Some(request);

        if let Some(err) = self.generate_error.lock().unwrap().as_ref() {
            return Err(clone_error(err));
        }

        Ok(AudioBatch {
            session_id: SessionId::new(self.session_id.clone()),
            files,
        })
    }

    async fn synthesize_once(&self, request: IngestRequest) -> Result<Vec<u8>> {
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_synthesize.lock().unwrap() = Some(request);

        if let Some(err) = self.synthesize_error.lock().unwrap().as_ref() {
            return Err(clone_error(err));
        }

        Ok(self.audio.clone())
    }

    fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Clone a ClientError (needed because ClientError doesn't implement Clone)
fn clone_error(err: &ClientError) -> ClientError {
    match err {
        ClientError::Validation(s) => ClientError::Validation(s.clone()),
        ClientError::Transport(s) => ClientError::Transport(s.clone()),
        ClientError::Server { status, body } => ClientError::Server {
            status: *status,
            body: body.clone(),
        },
        ClientError::NotJson { content_type, body } => ClientError::NotJson {
            content_type: content_type.clone(),
            body: body.clone(),
        },
        ClientError::Decode(s) => ClientError::Decode(s.clone()),
        ClientError::Declined(s) => ClientError::Declined(s.clone()),
        ClientError::ConfigError(s) => ClientError::ConfigError(s.clone()),
        // IO errors can't be cloned; keep kind and message
        ClientError::Io(e) => ClientError::Io(std::io::Error::new(e.kind(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapters() -> Vec<Chapter> {
        vec![Chapter::new("Chapter 1", "one"), Chapter::new("Chapter 2", "two")]
    }

    #[tokio::test]
    async fn test_upload_returns_chapters() {
        let backend = MockBackend::with_chapters(chapters());
        let result = backend
            .upload(IngestRequest::Text("hello".to_string()))
            .await
            .unwrap();
        assert_eq!(result, chapters());
        assert_eq!(backend.upload_calls(), 1);
        assert_eq!(
            backend.last_upload(),
            Some(IngestRequest::Text("hello".to_string()))
        );
    }

    #[tokio::test]
    async fn test_generate_derives_files_from_chapters() {
        let backend = MockBackend::with_chapters(chapters()).with_session_id("42");
        let batch = backend
            .generate_audio(GenerateRequest {
                chapters: chapters(),
                voice: "af_bella".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(batch.session_id.as_str(), "42");
        assert_eq!(batch.files.len(), 2);
        assert_eq!(batch.files[0].filename, "chapter_01_Chapter_1.wav");
        assert!(batch.files.iter().all(GeneratedFile::is_playable));
        assert_eq!(backend.last_generate().unwrap().voice, "af_bella");
    }

    #[tokio::test]
    async fn test_failures_repeat() {
        let backend = MockBackend::with_chapters(chapters()).failing_upload(ClientError::Server {
            status: 500,
            body: "boom".to_string(),
        });

        for _ in 0..3 {
            let result = backend.upload(IngestRequest::Text("x".to_string())).await;
            assert!(matches!(result, Err(ClientError::Server { status: 500, .. })));
        }
        assert_eq!(backend.upload_calls(), 3);
        assert_eq!(backend.generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_can_be_cleared() {
        let backend = MockBackend::with_chapters(chapters())
            .failing_upload(ClientError::Declined("nope".to_string()));
        assert!(backend.upload(IngestRequest::Text("x".to_string())).await.is_err());

        backend.set_upload_error(None);
        assert!(backend.upload(IngestRequest::Text("x".to_string())).await.is_ok());
    }

    #[tokio::test]
    async fn test_synthesize_returns_audio() {
        let backend = MockBackend::with_chapters(vec![]).with_audio(b"RIFFdata".to_vec());
        let audio = backend
            .synthesize_once(IngestRequest::Text("hi".to_string()))
            .await
            .unwrap();
        assert_eq!(audio, b"RIFFdata");
        assert_eq!(backend.request_count(), 1);
        assert_eq!(
            backend.last_synthesize(),
            Some(IngestRequest::Text("hi".to_string()))
        );
    }
}
