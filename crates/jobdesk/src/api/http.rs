//! reqwest-backed [`JobsApi`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use super::JobsApi;
use crate::config::ApiConfig;
use crate::error::{ApiError, ConfigError, ValidationError};
use crate::models::{CreateJobRequest, Job, JobPage, ProjectPage};
use crate::query::JobQueryParams;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Maximum length of an error body echoed into logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

pub struct HttpJobsApi {
    client: Client,
    base_url: Url,
    token: Option<SecretString>,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpJobsApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| ConfigError::Validation {
            message: format!("Invalid api.base_url '{}': {}", config.base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Validation {
                message: format!("api.base_url '{}' cannot be a base URL", config.base_url),
            });
        }
        // Endpoint segments are appended, so the base must name a directory.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::Validation {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            token: config.resolve_token()?,
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds an endpoint URL, escaping each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::Validation(ValidationError::InvalidUrl {
                    url: self.base_url.to_string(),
                    reason: "cannot be a base URL".to_string(),
                })
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a request, retrying retryable failures when `idempotent`.
    ///
    /// Every attempt carries a fresh `X-Request-ID`.
    async fn send<F>(&self, build: F, idempotent: bool) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let max_retries = if idempotent { self.retry_attempts } else { 0 };
        let mut attempt = 0;

        loop {
            let request_id = Uuid::new_v4().to_string();
            let mut request = build(&self.client).header(REQUEST_ID_HEADER, &request_id);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token.expose_secret());
            }

            let error = match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => error_from_response(response, &request_id).await,
                Err(e) => map_transport_error(&e),
            };

            if attempt < max_retries && error.is_retryable() {
                let delay = backoff_delay(self.retry_delay, attempt);
                attempt += 1;
                warn!(
                    "Request {} failed ({}), retrying in {:?} (attempt {}/{})",
                    request_id, error, delay, attempt, max_retries
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(error);
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self
            .send(|client| client.request(Method::GET, url.clone()), true)
            .await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// POSTs to a job action endpoint and decodes the optional job body.
    async fn job_action(&self, id: &str, action: &str) -> Result<Option<Job>, ApiError> {
        let url = self.endpoint(&["v1", "jobs", id, action])?;
        let response = self
            .send(|client| client.request(Method::POST, url.clone()), false)
            .await?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(job_from_ack(&body))
    }
}

#[async_trait]
impl JobsApi for HttpJobsApi {
    async fn list_jobs(&self, params: &JobQueryParams) -> Result<JobPage, ApiError> {
        let span = tracing::info_span!("api.list_jobs", page = params.page, limit = params.limit);
        async {
            let url = self.endpoint(&["v1", "jobs"])?;
            debug!("GET {} {:?}", url, params);
            let response = self
                .send(|client| client.get(url.clone()).query(params), true)
                .await?;
            response
                .json::<JobPage>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))
        }
        .instrument(span)
        .await
    }

    async fn get_job(&self, id: &str) -> Result<Job, ApiError> {
        let span = tracing::info_span!("api.get_job", job_id = id);
        async {
            let url = self.endpoint(&["v1", "jobs", id])?;
            self.get_json::<Job>(url).await
        }
        .instrument(span)
        .await
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<Job, ApiError> {
        let span = tracing::info_span!("api.create_job", job_type = %request.job_type());
        async {
            let url = self.endpoint(&["v1", "jobs"])?;
            let response = self
                .send(|client| client.post(url.clone()).json(request), false)
                .await?;
            let body = response
                .text()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))?;
            job_from_ack(&body)
                .ok_or_else(|| ApiError::Decode("create response did not contain a job".into()))
        }
        .instrument(span)
        .await
    }

    async fn start_job(&self, id: &str) -> Result<Option<Job>, ApiError> {
        let span = tracing::info_span!("api.start_job", job_id = id);
        self.job_action(id, "start").instrument(span).await
    }

    async fn cancel_job(&self, id: &str) -> Result<Option<Job>, ApiError> {
        let span = tracing::info_span!("api.cancel_job", job_id = id);
        self.job_action(id, "cancel").instrument(span).await
    }

    async fn retry_job(&self, id: &str) -> Result<Option<Job>, ApiError> {
        let span = tracing::info_span!("api.retry_job", job_id = id);
        self.job_action(id, "retry").instrument(span).await
    }

    async fn delete_job(&self, id: &str) -> Result<(), ApiError> {
        let span = tracing::info_span!("api.delete_job", job_id = id);
        async {
            let url = self.endpoint(&["v1", "jobs", id])?;
            self.send(|client| client.delete(url.clone()), false).await?;
            Ok::<(), ApiError>(())
        }
        .instrument(span)
        .await
    }

    async fn list_projects(&self, limit: u32) -> Result<ProjectPage, ApiError> {
        let span = tracing::info_span!("api.list_projects", limit);
        async {
            let mut url = self.endpoint(&["v1", "projects"])?;
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
            self.get_json::<ProjectPage>(url).await
        }
        .instrument(span)
        .await
    }
}

/// `base * 2^attempt`, capped at 8 seconds.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Error code used when the body does not name one.
pub fn default_error_code(status: u16) -> &'static str {
    match status {
        400 | 422 => "VALIDATION_ERROR",
        401 => "UNAUTHORIZED",
        403 => "FORBIDDEN",
        404 => "NOT_FOUND",
        408 => "TIMEOUT",
        409 => "CONFLICT",
        429 => "RATE_LIMIT_EXCEEDED",
        500..=599 => "SERVER_ERROR",
        _ => "HTTP_ERROR",
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
    #[serde(default)]
    request_id: Option<String>,
}

/// Decodes an error response into [`ApiError::Status`].
///
/// The request id comes from the body, then the response header.
pub fn decode_error_body(status: u16, body: &str, header_request_id: Option<&str>) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    if let Some(details) = &parsed.details {
        debug!("Error details for HTTP {}: {}", status, details);
    }

    let code = parsed
        .error
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| default_error_code(status).to_string());
    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Request failed")
                .to_string()
        });

    ApiError::Status {
        status,
        code,
        message,
        request_id: parsed
            .request_id
            .or_else(|| header_request_id.map(str::to_string)),
    }
}

async fn error_from_response(response: Response, sent_request_id: &str) -> ApiError {
    let status = response.status().as_u16();
    let header_request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    debug!(
        "HTTP {} for request {}: {}",
        status,
        sent_request_id,
        truncate(&body, MAX_ERROR_BODY_LENGTH)
    );

    decode_error_body(
        status,
        &body,
        Some(header_request_id.as_deref().unwrap_or(sent_request_id)),
    )
}

fn map_transport_error(error: &reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else if error.is_decode() {
        ApiError::Decode(error.to_string())
    } else {
        ApiError::Network(error.to_string())
    }
}

/// Extracts a job from an action response; anything else is a plain acknowledgement.
pub fn job_from_ack(body: &str) -> Option<Job> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let candidate = match value.get("data") {
        Some(data) if data.is_object() => data.clone(),
        _ => value,
    };
    serde_json::from_value(candidate).ok()
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}... (truncated)", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base_url: &str) -> HttpJobsApi {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        HttpJobsApi::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_appends_escaped_segments() {
        let api = api("https://jobs.example.com/api");
        let url = api.endpoint(&["v1", "jobs", "a b/c", "start"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://jobs.example.com/api/v1/jobs/a%20b%2Fc/start"
        );

        let root = self::api("http://localhost:8080");
        assert_eq!(
            root.endpoint(&["v1", "projects"]).unwrap().as_str(),
            "http://localhost:8080/v1/projects"
        );
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpJobsApi::new(&config),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_backoff_schedule_is_capped() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(8));
        assert_eq!(backoff_delay(base, 10), Duration::from_secs(8));
    }

    #[test]
    fn test_decode_error_body() {
        let err = decode_error_body(
            409,
            r#"{"error": "JOB_NOT_PENDING", "message": "Job is already running", "requestId": "req-9"}"#,
            Some("header-id"),
        );
        assert_eq!(
            err,
            ApiError::Status {
                status: 409,
                code: "JOB_NOT_PENDING".to_string(),
                message: "Job is already running".to_string(),
                request_id: Some("req-9".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_error_body_falls_back_to_status() {
        let err = decode_error_body(503, "<html>bad gateway</html>", Some("header-id"));
        assert_eq!(err.code(), "SERVER_ERROR");
        assert_eq!(err.request_id(), Some("header-id"));
        assert!(err.is_retryable());
        match err {
            ApiError::Status { message, .. } => assert_eq!(message, "Service Unavailable"),
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(decode_error_body(401, "", None).code(), "UNAUTHORIZED");
        assert_eq!(decode_error_body(418, "", None).code(), "HTTP_ERROR");
    }

    #[test]
    fn test_job_from_ack() {
        let job = r#"{"id": "j-1", "type": "parse", "status": "running", "created_at": "2026-03-01T09:30:00Z"}"#;
        assert_eq!(job_from_ack(job).map(|j| j.id), Some("j-1".to_string()));

        let wrapped = format!(r#"{{"data": {}}}"#, job);
        assert!(job_from_ack(&wrapped).is_some());

        assert!(job_from_ack(r#"{"ok": true}"#).is_none());
        assert!(job_from_ack("").is_none());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc... (truncated)");
    }
}
