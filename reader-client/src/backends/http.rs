//! HTTP backend
//!
//! Talks to the reader service over its JSON/multipart contract.

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, multipart};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::backend::{Endpoints, ReaderBackend};
use crate::error::{ClientError, Result};
use crate::types::{
    AudioBatch, Chapter, ErrorBody, GenerateRequest, GenerateResponse, IngestRequest, SessionId,
    TextUpload, UploadResponse,
};

/// How much of an unexpected body is echoed back in errors.
const BODY_EXCERPT_CHARS: usize = 200;

const PROCESS_FAILED: &str = "An unknown error occurred.";

/// Backend reached over HTTP
pub struct HttpBackend {
    endpoints: Endpoints,
    client: Client,
}

impl HttpBackend {
    /// Create a new HTTP backend
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let endpoints = Endpoints::new(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { endpoints, client })
    }

    fn upload_request(&self, request: IngestRequest) -> Result<RequestBuilder> {
        let url = self.endpoints.upload();

        match request {
            IngestRequest::File { file_name, bytes } => {
                debug!("Uploading {} ({} bytes) as multipart", file_name, bytes.len());
                let form = multipart::Form::new().part("file", file_part(file_name, bytes)?);
                Ok(self.client.post(url).multipart(form))
            }
            IngestRequest::Text(text) => {
                debug!("Uploading {} characters of text as JSON", text.chars().count());
                Ok(self.client.post(url).json(&TextUpload {
                    text_content: &text,
                }))
            }
        }
    }
}

#[async_trait]
impl ReaderBackend for HttpBackend {
    async fn upload(&self, request: IngestRequest) -> Result<Vec<Chapter>> {
        let builder = self.upload_request(request)?;
        let response: UploadResponse = send_json(builder).await?;

        if !response.success {
            return Err(ClientError::Declined(
                response
                    .error
                    .unwrap_or_else(|| "Failed to process document".to_string()),
            ));
        }

        debug!("Upload returned {} chapters", response.chapters.len());
        Ok(response.chapters)
    }

    async fn generate_audio(&self, request: GenerateRequest) -> Result<AudioBatch> {
        debug!(
            "Requesting audio for {} chapters with voice {}",
            request.chapters.len(),
            request.voice
        );
        let builder = self.client.post(self.endpoints.generate_audio()).json(&request);
        let response: GenerateResponse = send_json(builder).await?;

        if !response.success {
            return Err(ClientError::Declined(
                response
                    .error
                    .unwrap_or_else(|| "Failed to generate audio".to_string()),
            ));
        }

        let session_id = response
            .session_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::Decode("response is missing session_id".to_string()))?;

        Ok(AudioBatch {
            session_id: SessionId::new(session_id),
            files: response.files,
        })
    }

    async fn synthesize_once(&self, request: IngestRequest) -> Result<Vec<u8>> {
        let form = match request {
            IngestRequest::File { file_name, bytes } => {
                debug!("Synthesizing {} ({} bytes) in one request", file_name, bytes.len());
                multipart::Form::new()
                    .text("text_input", "")
                    .part("file_input", file_part(file_name, bytes)?)
            }
            IngestRequest::Text(text) => {
                debug!("Synthesizing {} characters in one request", text.chars().count());
                multipart::Form::new().text("text_input", text)
            }
        };

        let response = self
            .client
            .post(self.endpoints.process())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorBody>(&body) {
                Ok(parsed) => ClientError::Declined(
                    parsed.error.unwrap_or_else(|| PROCESS_FAILED.to_string()),
                ),
                Err(_) => ClientError::Server {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(format!("Error reading response: {}", e)))?;
        Ok(audio.to_vec())
    }

    fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn file_part(file_name: String, bytes: Vec<u8>) -> Result<multipart::Part> {
    let mime = IngestRequest::mime_type(&file_name);
    multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|e| ClientError::Validation(format!("MIME error: {}", e)))
}

/// Send a request and decode a JSON body, rejecting non-2xx and non-JSON answers.
async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
    let response = builder
        .send()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    let status = response.status();
    debug!("Response status: {}", status);

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Server {
            status: status.as_u16(),
            body,
        });
    }

    let is_json = content_type
        .as_deref()
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    let body = response
        .text()
        .await
        .map_err(|e| ClientError::Transport(format!("Error reading response: {}", e)))?;

    if !is_json {
        return Err(ClientError::NotJson {
            content_type,
            body: excerpt(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}
