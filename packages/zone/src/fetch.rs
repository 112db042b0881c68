//! Zone source fetching.
//!
//! A source is either an `http(s)://` URL, a `file://` URL, or a plain
//! filesystem path. Every fetch is bounded by the caller's timeout.

use std::path::PathBuf;

use crate::{LoadOptions, ZoneError, retry};

/// Where a zone source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Remote table fetched over HTTP(S).
    Http(String),
    /// Local file.
    File(PathBuf),
}

impl SourceLocation {
    /// Classifies a source string.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Http(trimmed.to_owned())
        } else if let Some(path) = trimmed.strip_prefix("file://") {
            Self::File(PathBuf::from(path))
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }
}

/// Reads the raw zone table text from `source`.
///
/// `options.timeout` bounds each attempt; an HTTP source may make up to
/// `options.max_retries + 1` attempts with backoff in between.
///
/// # Errors
///
/// Returns [`ZoneError::SourceUnavailable`] if the source cannot be read
/// within `options.timeout`, and [`ZoneError::MalformedZone`] (row 0) if the
/// body is not UTF-8.
pub async fn fetch_source(source: &str, options: &LoadOptions) -> Result<String, ZoneError> {
    let body = match SourceLocation::parse(source) {
        SourceLocation::Http(url) => {
            let client = reqwest::Client::builder()
                .timeout(options.timeout)
                .build()
                .map_err(|e| unavailable(source, &format!("failed to build HTTP client: {e}")))?;

            let body = retry::send_bytes(&url, options.max_retries, || client.get(&url)).await?;
            log::debug!("Downloaded {} bytes from {url}", body.len());
            body
        }
        SourceLocation::File(path) => {
            let body = tokio::time::timeout(options.timeout, tokio::fs::read(&path))
                .await
                .map_err(|_| {
                    unavailable(
                        source,
                        &format!("timed out after {:?}", options.timeout),
                    )
                })?
                .map_err(|e| unavailable(source, &e.to_string()))?;
            log::debug!("Read {} bytes from {}", body.len(), path.display());
            body
        }
    };

    decode(body)
}

fn decode(body: Vec<u8>) -> Result<String, ZoneError> {
    String::from_utf8(body).map_err(|e| ZoneError::MalformedZone {
        row: 0,
        column: "<source>".to_owned(),
        message: format!("zone table is not valid UTF-8: {}", e.utf8_error()),
    })
}

fn unavailable(source: &str, message: &str) -> ZoneError {
    ZoneError::SourceUnavailable {
        url: source.to_owned(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_server::{Reply, TestServer};

    #[test]
    fn classifies_sources() {
        assert_eq!(
            SourceLocation::parse("https://example.com/zones.csv"),
            SourceLocation::Http("https://example.com/zones.csv".to_string())
        );
        assert_eq!(
            SourceLocation::parse("file:///tmp/zones.csv"),
            SourceLocation::File(PathBuf::from("/tmp/zones.csv"))
        );
        assert_eq!(
            SourceLocation::parse(" zones.csv "),
            SourceLocation::File(PathBuf::from("zones.csv"))
        );
    }

    #[tokio::test]
    async fn reads_file_url() {
        let path = std::env::temp_dir().join("geowatch_fetch_file_url.csv");
        std::fs::write(&path, "id\n").unwrap();

        let body = fetch_source(
            &format!("file://{}", path.display()),
            &LoadOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(body, "id\n");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn invalid_utf8_file_is_malformed() {
        let path = std::env::temp_dir().join("geowatch_fetch_invalid_utf8.csv");
        std::fs::write(&path, b"id\n\xff\xfe\n").unwrap();

        let err = fetch_source(path.to_str().unwrap(), &LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ZoneError::MalformedZone { row: 0, .. }));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn invalid_utf8_http_body_is_malformed() {
        let server = TestServer::start(vec![Reply::new(200, b"id\n\xff\n".to_vec())]).await;

        let err = fetch_source(&server.url, &LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ZoneError::MalformedZone { row: 0, .. }));
    }

    #[tokio::test]
    async fn reads_http_source() {
        let server = TestServer::start(vec![Reply::new(200, "id\n")]).await;

        let body = fetch_source(&server.url, &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(body, "id\n");
    }

    #[tokio::test]
    async fn stalled_server_times_out_per_attempt() {
        let server = TestServer::stalled().await;
        let options = LoadOptions {
            timeout: Duration::from_millis(200),
            max_retries: 0,
        };

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            fetch_source(&server.url, &options),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, ZoneError::SourceUnavailable { .. }));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        let options = LoadOptions {
            timeout: Duration::from_secs(5),
            max_retries: 0,
        };
        let err = fetch_source("http://127.0.0.1:9/zones.csv", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, ZoneError::SourceUnavailable { .. }));
    }
}
