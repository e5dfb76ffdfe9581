//! HTTP client for the Grain public API.
//!
//! Direct reqwest with two layers of resilience:
//! - `send_with_retry`: exponential backoff + jitter for transient faults
//!   (429, 408, 5xx, transport timeouts). 401/403 are never retried; an
//!   invalid credential does not get better by waiting.
//! - auth-scheme fallback: providers are inconsistent about whether a given
//!   credential wants `Authorization: Bearer` or an `x-api-key` header, so a
//!   401 on the first scheme triggers exactly one attempt with the next.

use std::time::Duration;

use async_trait::async_trait;

use super::types::{FetchWindow, GrainActionItem, GrainRecording, RecordingsPage};
use super::{GrainError, RecordingSource};

pub const DEFAULT_BASE_URL: &str = "https://api.grain.com/_/public-api";

/// Page size requested from the list endpoint.
const PAGE_SIZE: usize = 100;

/// Per-request timeout. Bounds each network call, never the whole run.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retryable,
    NonRetryable,
}

pub(crate) fn retry_decision_for_status(status: reqwest::StatusCode) -> RetryDecision {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        RetryDecision::Retryable
    } else {
        RetryDecision::NonRetryable
    }
}

fn retry_delay(
    attempt: u32,
    policy: &RetryPolicy,
    retry_after: Option<&reqwest::header::HeaderValue>,
) -> Duration {
    if let Some(value) = retry_after.and_then(|v| v.to_str().ok()) {
        if let Ok(secs) = value.parse::<u64>() {
            return Duration::from_secs(secs.min(30));
        }
    }

    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    let jitter = rand::random_range(0..150u64);
    Duration::from_millis(base.saturating_add(jitter))
}

/// Send a request, retrying transient failures with backoff.
///
/// Non-retryable statuses (including 401/403) are returned to the caller on
/// the first occurrence so credential problems abort immediately.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, GrainError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request.send().await.map_err(GrainError::Http);
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                let decision = retry_decision_for_status(status);
                if decision == RetryDecision::Retryable && attempt < attempts {
                    let delay = retry_delay(
                        attempt,
                        policy,
                        response.headers().get(reqwest::header::RETRY_AFTER),
                    );
                    log::warn!(
                        "grain retry {}/{} after status {} (sleep {:?})",
                        attempt,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                let retryable_transport = err.is_timeout() || err.is_connect();
                if retryable_transport && attempt < attempts {
                    let delay = retry_delay(attempt, policy, None);
                    log::warn!(
                        "grain retry {}/{} after transport error: {} (sleep {:?})",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(GrainError::Http(err));
            }
        }
    }

    Err(GrainError::RetriesExhausted)
}

// ---------------------------------------------------------------------------
// Auth schemes
// ---------------------------------------------------------------------------

/// Header schemes tried in order; the first 2xx wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    ApiKey,
}

const AUTH_SCHEMES: &[AuthScheme] = &[AuthScheme::Bearer, AuthScheme::ApiKey];

impl AuthScheme {
    fn apply(self, request: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
        match self {
            AuthScheme::Bearer => request.bearer_auth(token),
            AuthScheme::ApiKey => request.header("x-api-key", token),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct GrainClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    policy: RetryPolicy,
}

impl GrainClient {
    /// Build a client for the given credential. `base_url` overrides the
    /// production endpoint (used by tests and self-hosted relays).
    pub fn new(token: &str, base_url: Option<&str>) -> Result<Self, GrainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(GrainError::Http)?;
        Ok(Self {
            http,
            token: token.to_string(),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
        })
    }

    /// GET an API path, walking the auth-scheme list.
    ///
    /// Returns the first 2xx response. A 401 moves to the next scheme; a 403,
    /// or a 401 on the last scheme, surfaces `AuthRejected`. Anything else is
    /// an `ApiError` carried back as a per-call failure.
    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, GrainError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_status = 0u16;
        let mut last_body = String::new();

        for (i, scheme) in AUTH_SCHEMES.iter().enumerate() {
            let request = scheme.apply(self.http.get(&url).query(query), &self.token);
            let response = send_with_retry(request, &self.policy).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();

            if status == reqwest::StatusCode::UNAUTHORIZED {
                last_status = status.as_u16();
                last_body = body;
                if i + 1 < AUTH_SCHEMES.len() {
                    log::warn!("grain auth scheme {:?} rejected (401), trying next", scheme);
                    continue;
                }
                break;
            }

            if status == reqwest::StatusCode::FORBIDDEN {
                return Err(GrainError::AuthRejected {
                    status: status.as_u16(),
                    message: body,
                });
            }

            return Err(GrainError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Err(GrainError::AuthRejected {
            status: last_status,
            message: last_body,
        })
    }
}

#[async_trait]
impl RecordingSource for GrainClient {
    /// Fetch recordings, following the cursor until the page stream ends or
    /// `limit` records have been accumulated.
    async fn list_recordings(
        &self,
        window: Option<&FetchWindow>,
        limit: usize,
    ) -> Result<Vec<GrainRecording>, GrainError> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("page_size", PAGE_SIZE.min(limit.max(1)).to_string()),
                ("include_participants", "true".to_string()),
            ];
            if let Some(w) = window {
                query.push(("start_datetime", w.start.to_rfc3339()));
                query.push(("end_datetime", w.end.to_rfc3339()));
            }
            if let Some(ref c) = cursor {
                query.push(("cursor", c.clone()));
            }

            let response = self.get("/recordings", &query).await?;
            let page: RecordingsPage = response.json().await.map_err(GrainError::Http)?;

            let fetched = page.recordings.len();
            all.extend(page.recordings);

            if all.len() >= limit {
                all.truncate(limit);
                break;
            }
            // An empty page means the stream is done even if a cursor came
            // back; following it risks looping on a stuck cursor.
            if fetched == 0 {
                break;
            }

            cursor = page.cursor;
            if cursor.is_none() {
                break;
            }
        }

        Ok(all)
    }

    async fn fetch_recording(&self, recording_id: &str) -> Result<GrainRecording, GrainError> {
        let path = format!("/recordings/{}", recording_id);
        let query = [("include_participants", "true".to_string())];
        let response = match self.get(&path, &query).await {
            Ok(r) => r,
            Err(GrainError::ApiError { status: 404, .. }) => {
                return Err(GrainError::RecordingNotFound(recording_id.to_string()))
            }
            Err(e) => return Err(e),
        };
        response.json().await.map_err(GrainError::Http)
    }

    async fn fetch_action_items(
        &self,
        recording_id: &str,
    ) -> Result<Vec<GrainActionItem>, GrainError> {
        #[derive(serde::Deserialize, Default)]
        #[serde(rename_all = "camelCase")]
        struct ActionItemsResponse {
            #[serde(default)]
            action_items: Vec<GrainActionItem>,
        }

        let path = format!("/recordings/{}/action-items", recording_id);
        let response = match self.get(&path, &[]).await {
            Ok(r) => r,
            // No action items is a no-op, not an error
            Err(GrainError::ApiError { status: 404, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let body: ActionItemsResponse = response.json().await.map_err(GrainError::Http)?;
        Ok(body.action_items)
    }

    async fn fetch_summary(&self, recording_id: &str) -> Result<Option<String>, GrainError> {
        #[derive(serde::Deserialize, Default)]
        struct SummaryResponse {
            #[serde(default)]
            summary: Option<String>,
        }

        let path = format!("/recordings/{}/summary", recording_id);
        let response = match self.get(&path, &[]).await {
            Ok(r) => r,
            // Summary not generated yet; skip silently
            Err(GrainError::ApiError { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let body: SummaryResponse = response.json().await.map_err(GrainError::Http)?;
        Ok(body.summary.filter(|s| !s.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_decision_transient_statuses() {
        for code in [500u16, 502, 503, 429, 408] {
            let status = reqwest::StatusCode::from_u16(code).unwrap();
            assert_eq!(
                retry_decision_for_status(status),
                RetryDecision::Retryable,
                "{} should be retryable",
                code
            );
        }
    }

    #[test]
    fn test_retry_decision_auth_and_client_errors() {
        for code in [400u16, 401, 403, 404, 422] {
            let status = reqwest::StatusCode::from_u16(code).unwrap();
            assert_eq!(
                retry_decision_for_status(status),
                RetryDecision::NonRetryable,
                "{} must not be retried",
                code
            );
        }
    }

    #[test]
    fn test_retry_delay_honors_retry_after() {
        let policy = RetryPolicy::default();
        let header = reqwest::header::HeaderValue::from_static("3");
        assert_eq!(
            retry_delay(1, &policy, Some(&header)),
            Duration::from_secs(3)
        );
        // Absurd Retry-After values are capped
        let header = reqwest::header::HeaderValue::from_static("86400");
        assert_eq!(
            retry_delay(1, &policy, Some(&header)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_retry_delay_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        let d1 = retry_delay(1, &policy, None);
        let d2 = retry_delay(2, &policy, None);
        let d4 = retry_delay(4, &policy, None);
        assert!(d1 >= Duration::from_millis(250));
        assert!(d2 >= Duration::from_millis(500));
        // Capped at max_backoff_ms plus jitter
        assert!(d4 <= Duration::from_millis(2_150));
    }
}
