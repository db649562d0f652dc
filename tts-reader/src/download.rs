//! Streaming downloads of the session archive and single audio files.
//!
//! One attempt per request; a failure is reported and nothing is retried.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use reader_client::SessionId;
use reqwest::Url;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::progress::CancelHandle;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error: {status} for {url}")]
    HttpError { status: u16, url: String },
}

/// File name the archive of a session is saved under.
pub fn archive_filename(session: &SessionId) -> String {
    format!("tts_output_{}.zip", session)
}

/// Where a download of `url` lands inside `dir`, given a preferred name.
pub fn destination(dir: &Path, file_name: &str) -> PathBuf {
    let name = Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "download".to_string());
    dir.join(name)
}

/// A download being written. Removed on drop unless finished.
struct PartialFile<'a> {
    path: &'a Path,
    file: Option<std::fs::File>,
    keep: bool,
}

impl<'a> PartialFile<'a> {
    fn create(path: &'a Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self {
            path,
            file: Some(file),
            keep: false,
        })
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(buf),
            None => Ok(()),
        }
    }

    /// Flush and keep the file.
    fn finish(mut self) -> std::io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        self.keep = true;
        Ok(())
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        // Close before removing
        self.file.take();
        if !self.keep {
            debug!("Removing partial download {}", self.path.display());
            let _ = std::fs::remove_file(self.path);
        }
    }
}

/// Like [`download_to`], but gives up as soon as `cancel` fires.
/// Returns `None` when cancelled; no partial file is left behind.
pub async fn download_or_cancel(
    client: &reqwest::Client,
    url: &Url,
    destination: &Path,
    description: &str,
    cancel: &CancelHandle,
) -> Result<Option<u64>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(None),
        result = download_to(client, url, destination, description) => result.map(Some),
    }
}

/// Stream `url` into `destination`. Returns the number of bytes written.
pub async fn download_to(
    client: &reqwest::Client,
    url: &Url,
    destination: &Path,
    description: &str,
) -> Result<u64> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }

    debug!("GET {}", url);
    let response = client
        .get(url.clone())
        .send()
        .await
        .context("Failed to connect")?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpError {
            status: status.as_u16(),
            url: url.to_string(),
        }
        .into());
    }

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(concat!(
                        "  {msg}\n",
                        "  {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                    ))
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {msg} {bytes} ({bytes_per_sec})")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    };
    pb.set_message(description.to_string());

    let mut file =
        PartialFile::create(destination).context("Failed to create destination file")?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                pb.abandon();
                return Err(e).context("Error reading response");
            }
        };
        if let Err(e) = file.write_all(&chunk) {
            pb.abandon();
            return Err(e).context("Failed to write to file");
        }
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.finish().context("Failed to write to file")?;
    pb.finish_and_clear();
    info!(
        "Saved {} ({})",
        destination.display(),
        format_bytes(downloaded)
    );

    Ok(downloaded)
}

/// Format bytes for human-readable display.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.0 GB");
        assert_eq!(format_bytes(1536 * 1024), "1.5 MB");
    }

    #[test]
    fn test_archive_filename() {
        assert_eq!(
            archive_filename(&SessionId::new("1718000000")),
            "tts_output_1718000000.zip"
        );
    }

    #[test]
    fn test_destination_strips_directories() {
        let dir = Path::new("/out");
        assert_eq!(destination(dir, "ch1.wav"), PathBuf::from("/out/ch1.wav"));
        assert_eq!(
            destination(dir, "../../etc/passwd"),
            PathBuf::from("/out/passwd")
        );
        assert_eq!(destination(dir, ".."), PathBuf::from("/out/download"));
    }

    #[tokio::test]
    async fn test_download_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/s1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04zipdata".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("out.zip");
        let url = Url::parse(&format!("{}/download/s1", server.uri())).unwrap();

        let written = download_to(&reqwest::Client::new(), &url, &dest, "archive")
            .await
            .unwrap();

        assert_eq!(written, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"PK\x03\x04zipdata");
    }

    #[tokio::test]
    async fn test_download_http_error_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Session not found"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.zip");
        let url = Url::parse(&format!("{}/download/missing", server.uri())).unwrap();

        let err = download_to(&reqwest::Client::new(), &url, &dest, "archive")
            .await
            .unwrap_err();

        match err.downcast_ref::<DownloadError>() {
            Some(DownloadError::HttpError { status, .. }) => assert_eq!(*status, 404),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_cancel_abandons_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"RIFF".to_vec())
                    .set_delay(Duration::from_secs(20)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("ch1.wav");
        let url = Url::parse(&format!("{}/audio/s1/ch1.wav", server.uri())).unwrap();
        let cancel = CancelHandle::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            }
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            download_or_cancel(&reqwest::Client::new(), &url, &dest, "ch1.wav", &cancel),
        )
        .await
        .expect("cancel did not interrupt the download");

        assert_eq!(result.unwrap(), None);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_uncancelled_download_completes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("ch1.wav");
        let url = Url::parse(&format!("{}/audio/s1/ch1.wav", server.uri())).unwrap();

        let written = download_or_cancel(
            &reqwest::Client::new(),
            &url,
            &dest,
            "ch1.wav",
            &CancelHandle::new(),
        )
        .await
        .unwrap();

        assert_eq!(written, Some(4));
        assert_eq!(std::fs::read(&dest).unwrap(), b"RIFF");
    }

    #[test]
    fn test_partial_file_removed_unless_done() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("half.wav");

        let mut abandoned = PartialFile::create(&dest).unwrap();
        abandoned.write_all(b"RI").unwrap();
        drop(abandoned);
        assert!(!dest.exists());

        let mut kept = PartialFile::create(&dest).unwrap();
        kept.write_all(b"RIFF").unwrap();
        kept.finish().unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"RIFF");
    }
}
