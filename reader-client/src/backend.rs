use async_trait::async_trait;
use reqwest::Url;

use crate::error::{ClientError, Result};
use crate::types::{AudioBatch, Chapter, GenerateRequest, IngestRequest, SessionId};

/// Trait for reader backends
#[async_trait]
pub trait ReaderBackend: Send + Sync {
    /// Turn an uploaded document or pasted text into chapters (`POST /upload`)
    async fn upload(&self, request: IngestRequest) -> Result<Vec<Chapter>>;

    /// Synthesize one audio file per chapter (`POST /generate_audio`)
    async fn generate_audio(&self, request: GenerateRequest) -> Result<AudioBatch>;

    /// Synthesize a whole document or text into a single WAV body (`POST /process`)
    async fn synthesize_once(&self, request: IngestRequest) -> Result<Vec<u8>>;

    /// URL layout of the backend
    fn endpoints(&self) -> &Endpoints;

    /// Get the backend name for display
    fn name(&self) -> &'static str;
}

/// URL builder for the backend's routes.
///
/// The base URL may carry a path prefix (`http://host/reader/`); every route
/// is appended below it with each segment percent-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            ClientError::ConfigError(format!("Invalid server URL '{}': {}", base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::ConfigError(format!(
                "Server URL cannot carry paths: {}",
                base_url
            )));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn upload(&self) -> Url {
        self.route(&["upload"])
    }

    pub fn generate_audio(&self) -> Url {
        self.route(&["generate_audio"])
    }

    /// One-shot text-to-speech returning a single WAV.
    pub fn process(&self) -> Url {
        self.route(&["process"])
    }

    /// Archive of every file in a session.
    pub fn archive(&self, session: &SessionId) -> Url {
        self.route(&["download", session.as_str()])
    }

    /// Stream of one generated audio file.
    pub fn audio(&self, session: &SessionId, filename: &str) -> Url {
        self.route(&["audio", session.as_str(), filename])
    }

    fn route(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        // Checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_on_bare_host() {
        let endpoints = Endpoints::new("http://localhost:2022").unwrap();
        assert_eq!(endpoints.upload().as_str(), "http://localhost:2022/upload");
        assert_eq!(
            endpoints.generate_audio().as_str(),
            "http://localhost:2022/generate_audio"
        );
        assert_eq!(endpoints.process().as_str(), "http://localhost:2022/process");
        let session = SessionId::new("1718000000");
        assert_eq!(
            endpoints.archive(&session).as_str(),
            "http://localhost:2022/download/1718000000"
        );
        assert_eq!(
            endpoints.audio(&session, "chapter_01_Intro.wav").as_str(),
            "http://localhost:2022/audio/1718000000/chapter_01_Intro.wav"
        );
    }

    #[test]
    fn test_routes_keep_path_prefix() {
        let endpoints = Endpoints::new("https://example.com/reader/").unwrap();
        assert_eq!(endpoints.upload().as_str(), "https://example.com/reader/upload");

        let endpoints = Endpoints::new("https://example.com/reader").unwrap();
        assert_eq!(endpoints.upload().as_str(), "https://example.com/reader/upload");
    }

    #[test]
    fn test_segments_are_encoded() {
        let endpoints = Endpoints::new("http://localhost:2022").unwrap();
        let url = endpoints.audio(&SessionId::new("s1"), "chapter 01/part?.wav");
        assert_eq!(
            url.as_str(),
            "http://localhost:2022/audio/s1/chapter%2001%2Fpart%3F.wav"
        );
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            Endpoints::new("not a url"),
            Err(ClientError::ConfigError(_))
        ));
        assert!(matches!(
            Endpoints::new("mailto:someone@example.com"),
            Err(ClientError::ConfigError(_))
        ));
    }
}
