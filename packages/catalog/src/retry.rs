//! HTTP retry helper for the live feed.
//!
//! The feed is best-effort, so the retry budget is small: a couple of
//! attempts with exponential backoff for transient failures (timeouts,
//! connection resets, HTTP 429, HTTP 5xx). Anything else fails fast and
//! the caller falls back to the existing catalog.

use std::time::Duration;

use crate::FeedError;

/// Maximum number of retry attempts after the first request.
const MAX_RETRIES: u32 = 2;

/// Delay before the first retry; doubles on each further attempt.
const BASE_DELAY: Duration = Duration::from_secs(2);

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// Returns [`FeedError`] if the request fails after all retries, the
/// server returns a non-retryable status, or the body is not valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, FeedError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, MAX_RETRIES, BASE_DELAY).await?;
    parse_json(response).await
}

async fn parse_json(response: reqwest::Response) -> Result<serde_json::Value, FeedError> {
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::warn!(
            "JSON parse failed\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {preview}",
            text.len()
        );
        FeedError::Json(e)
    })
}

/// Retry loop: returns the first successful (2xx/3xx) response.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<reqwest::Response, FeedError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<FeedError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = base_delay * (1 << (attempt - 1));
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(FeedError::Http(e));
                    continue;
                }
                return Err(FeedError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}");
                        last_error = Some(FeedError::Response {
                            message: format!("HTTP {status}"),
                        });
                        continue;
                    }
                    return Err(FeedError::Response {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                if status.is_client_error() {
                    return Err(FeedError::Response {
                        message: format!("HTTP {status}"),
                    });
                }

                return Ok(response);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| FeedError::Response {
        message: "request failed after all retries".to_string(),
    }))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
