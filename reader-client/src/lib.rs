//! Client library for the TTS reader backend
//!
//! Covers the backend's HTTP contract:
//! - `POST /upload` turns a document or pasted text into chapters
//! - `POST /generate_audio` synthesizes one audio file per chapter
//! - `GET /download/:session` and `GET /audio/:session/:file` serve the results

pub mod backend;
pub mod backends;
pub mod error;
pub mod types;

pub use backend::{Endpoints, ReaderBackend};
pub use backends::{HttpBackend, MockBackend};
pub use error::{ClientError, ErrorClass, Result};
pub use types::{
    AudioBatch, Chapter, FileStatus, GenerateRequest, GeneratedFile, IngestRequest, SessionId,
    SUPPORTED_EXTENSIONS, is_supported_document,
};
