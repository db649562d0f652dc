//! Wire types for the reader backend.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// File extensions the backend knows how to split into chapters.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "pdf", "epub"];

static AUDIO_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(wav|mp3)$").expect("audio extension pattern is valid"));

/// A titled segment of input text, synthesized independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
}

impl Chapter {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Outcome of synthesizing one chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Failed,
    Error,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a synthesize response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub filename: String,
    pub status: FileStatus,
    /// Chapter title, when the backend echoes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl GeneratedFile {
    pub fn new(filename: impl Into<String>, status: FileStatus) -> Self {
        Self {
            filename: filename.into(),
            status,
            title: None,
        }
    }

    /// Whether the filename carries an audio extension (.wav / .mp3).
    pub fn has_audio_extension(&self) -> bool {
        AUDIO_FILE.is_match(&self.filename)
    }

    /// Whether this file can be offered as a player.
    pub fn is_playable(&self) -> bool {
        self.status == FileStatus::Success && self.has_audio_extension()
    }
}

/// Backend-assigned identifier grouping the files of one synthesize request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload for `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestRequest {
    /// Sent as a multipart form with a `file` part.
    File { file_name: String, bytes: Vec<u8> },
    /// Sent as JSON `{"text_content": ...}`.
    Text(String),
}

impl IngestRequest {
    /// MIME type for the `file` part, derived from the extension.
    pub fn mime_type(file_name: &str) -> &'static str {
        match extension_of(file_name).as_deref() {
            Some("txt") => "text/plain",
            Some("pdf") => "application/pdf",
            Some("epub") => "application/epub+zip",
            _ => "application/octet-stream",
        }
    }
}

/// Lower-cased extension of a file name, if any.
pub fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether the backend accepts a file with this name.
pub fn is_supported_document(file_name: &str) -> bool {
    extension_of(file_name)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Payload for `POST /generate_audio`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub chapters: Vec<Chapter>,
    pub voice: String,
}

/// A successful synthesize response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBatch {
    pub session_id: SessionId,
    pub files: Vec<GeneratedFile>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextUpload<'a> {
    pub text_content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub files: Vec<GeneratedFile>,
    #[serde(default)]
    pub error: Option<String>,
}

/// JSON body of a failed `POST /process`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
