//! HTTP retry helper for transient errors.
//!
//! Zone sources are usually published spreadsheets behind a CDN, which
//! occasionally time out or answer with a 5xx/429. [`send_bytes`] retries
//! those with exponential backoff and gives up immediately on any other
//! client error.
//!
//! # Usage
//!
//! ```ignore
//! let csv = retry::send_bytes(url, 3, || client.get(url)).await?;
//! ```

use std::time::Duration;

use crate::ZoneError;

/// Sends an HTTP request and returns the raw response body.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (since builders are consumed by
/// `.send()`).
///
/// # Errors
///
/// Returns [`ZoneError::SourceUnavailable`] if the request fails after all
/// retries, the server returns a non-retryable status code, or the body
/// cannot be read.
pub async fn send_bytes<F>(
    url: &str,
    max_retries: u32,
    build_request: F,
) -> Result<Vec<u8>, ZoneError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(url, &build_request, max_retries).await?;
    let status = response.status();

    let body = response.bytes().await.map_err(|e| {
        log::error!("Body read failed for {url} (status {status}): {e}");
        unavailable(url, &format!("failed to read response body: {e}"))
    })?;

    Ok(body.to_vec())
}

/// Core retry loop.
///
/// Sends the request built by `build_request`, retrying on transient
/// errors up to `max_retries` times with exponential backoff. Returns
/// the successful [`reqwest::Response`] (status 2xx or 3xx).
async fn send_inner<F>(
    url: &str,
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, ZoneError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<ZoneError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt.min(6)); // 2s, 4s, 8s
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(unavailable(url, &e.to_string()));
                    continue;
                }
                return Err(unavailable(url, &e.to_string()));
            }
            Ok(response) => {
                let status = response.status();

                // 429 Too Many Requests and 5xx: retry
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}");
                        last_error = Some(unavailable(url, &format!("HTTP {status}")));
                        continue;
                    }
                    return Err(unavailable(
                        url,
                        &format!("HTTP {status} after {max_retries} retries"),
                    ));
                }

                // 4xx Client Error (not 429): permanent
                if status.is_client_error() {
                    return Err(unavailable(url, &format!("HTTP {status}")));
                }

                return Ok(response);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| unavailable(url, "request failed after all retries")))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn unavailable(url: &str, message: &str) -> ZoneError {
    ZoneError::SourceUnavailable {
        url: url.to_owned(),
        message: message.to_owned(),
    }
}
