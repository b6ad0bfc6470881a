//! Detection request pipeline: upload one crop photo to the gateway and
//! normalise whatever comes back into an `AnalysisResult`.

use std::sync::atomic::{AtomicBool, Ordering};

use agrolens_core::{AnalysisRequest, AnalysisResult, UNANALYZED_PREDICTION};
use agrolens_logging::token_hint;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Message used when the gateway rejects a request without saying why.
pub const DETECTION_FAILED: &str = "Detection failed";

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Couldn't connect to the detection service. Please make sure it is running.")]
    Connection(String),

    #[error("{0}")]
    Rejected(String),

    #[error("A detection is already in progress")]
    Busy,
}

/// Bearer credential for the gateway: the session token when signed in,
/// otherwise the public key.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub session_token: Option<String>,
    pub public_key: String,
}

impl Credentials {
    pub fn new(session_token: Option<String>, public_key: impl Into<String>) -> Self {
        Self {
            session_token,
            public_key: public_key.into(),
        }
    }

    pub fn bearer(&self) -> &str {
        match self.session_token.as_deref() {
            Some(token) if !token.is_empty() => token,
            _ => &self.public_key,
        }
    }
}

/// At most one submission in flight per client.
#[derive(Debug, Default)]
pub struct SubmitGuard {
    busy: AtomicBool,
}

/// Held for the duration of a submission; releases the guard on drop.
#[derive(Debug)]
pub struct SubmitPermit<'a> {
    guard: &'a SubmitGuard,
}

impl SubmitGuard {
    pub fn try_begin(&self) -> Option<SubmitPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitPermit { guard: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for SubmitPermit<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

pub struct DetectionClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
    guard: SubmitGuard,
}

impl DetectionClient {
    pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            credentials,
            guard: SubmitGuard::default(),
        }
    }

    pub fn guard(&self) -> &SubmitGuard {
        &self.guard
    }

    /// Upload one image and return the gateway's analysis.
    pub async fn detect(&self, request: &AnalysisRequest) -> Result<AnalysisResult, DetectError> {
        let _permit = self.guard.try_begin().ok_or(DetectError::Busy)?;

        debug!(
            endpoint = %self.endpoint,
            credential = %token_hint(self.credentials.bearer()),
            "Submitting crop image"
        );
        let form = Form::new().part("file", file_part(request));

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.credentials.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Detection request failed");
                DetectError::Connection(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| DetectError::Connection(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!(status = status.as_u16(), %message, "Gateway rejected detection");
            return Err(DetectError::Rejected(message));
        }

        let result = normalize_success(&body, &request.filename);
        info!(file = %result.filename, "Detection complete");
        Ok(result)
    }
}

fn file_part(request: &AnalysisRequest) -> Part {
    let part = || {
        Part::stream_with_length(request.image_bytes.clone(), request.image_bytes.len() as u64)
            .file_name(request.filename.clone())
    };
    match request.mime_type.as_deref() {
        Some(mime) => part().mime_str(mime).unwrap_or_else(|e| {
            warn!(mime, error = %e, "Ignoring invalid content type");
            part()
        }),
        None => part(),
    }
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Server-provided message from a JSON error body, else the generic one.
pub fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|json| {
            non_empty_str(&json, "error")
                .or_else(|| non_empty_str(&json, "message"))
                .map(str::to_string)
        })
        .unwrap_or_else(|| DETECTION_FAILED.to_string())
}

/// Field-level defaults for a 2xx body. Never fails.
pub fn normalize_success(body: &[u8], uploaded_filename: &str) -> AnalysisResult {
    let json = serde_json::from_slice::<Value>(body).unwrap_or(Value::Null);
    AnalysisResult {
        filename: non_empty_str(&json, "filename")
            .unwrap_or(uploaded_filename)
            .to_string(),
        prediction: non_empty_str(&json, "prediction")
            .unwrap_or(UNANALYZED_PREDICTION)
            .to_string(),
        success: json.get("success").and_then(Value::as_bool).unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrolens_understanding::parse_report;
    use axum::extract::Multipart;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    async fn spawn_gateway(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/crop-detect")
    }

    fn leaf() -> AnalysisRequest {
        AnalysisRequest::new(vec![1u8, 2, 3], "leaf.jpg").with_mime_type("image/jpeg")
    }

    #[test]
    fn session_token_takes_precedence() {
        let creds = Credentials::new(Some("session-abc".into()), "public-key");
        assert_eq!(creds.bearer(), "session-abc");
    }

    #[test]
    fn falls_back_to_public_key() {
        assert_eq!(Credentials::new(None, "public-key").bearer(), "public-key");
        assert_eq!(Credentials::new(Some(String::new()), "public-key").bearer(), "public-key");
    }

    #[test]
    fn guard_rejects_second_submission_until_released() {
        let guard = SubmitGuard::default();
        let permit = guard.try_begin().expect("first submission");
        assert!(guard.is_busy());
        assert!(guard.try_begin().is_none());
        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_begin().is_some());
    }

    #[test]
    fn error_message_reads_error_field() {
        assert_eq!(error_message(br#"{"error":"No file provided"}"#), "No file provided");
        assert_eq!(error_message(br#"{"message":"quota exceeded"}"#), "quota exceeded");
    }

    #[test]
    fn error_message_defaults_when_body_unusable() {
        assert_eq!(error_message(b""), DETECTION_FAILED);
        assert_eq!(error_message(b"<html>502</html>"), DETECTION_FAILED);
        assert_eq!(error_message(br#"{"error":""}"#), DETECTION_FAILED);
    }

    #[test]
    fn success_body_defaults() {
        let result = normalize_success(b"{}", "leaf.jpg");
        assert_eq!(result.filename, "leaf.jpg");
        assert_eq!(result.prediction, UNANALYZED_PREDICTION);
        assert!(result.success);

        let result = normalize_success(b"not json", "leaf.jpg");
        assert_eq!(result.prediction, UNANALYZED_PREDICTION);
    }

    #[tokio::test]
    async fn uploads_file_part_with_bearer_credential() {
        let router = Router::new().route(
            "/crop-detect",
            post(|headers: HeaderMap, mut multipart: Multipart| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let field = multipart.next_field().await.unwrap().unwrap();
                let name = field.name().unwrap_or_default().to_string();
                let filename = field.file_name().unwrap_or_default().to_string();
                let mime = field.content_type().unwrap_or_default().to_string();
                let len = field.bytes().await.unwrap().len();
                Json(serde_json::json!({
                    "filename": filename,
                    "prediction": format!("{auth}|{name}|{mime}|{len}"),
                    "success": true
                }))
            }),
        );
        let endpoint = spawn_gateway(router).await;

        let client = DetectionClient::new(endpoint, Credentials::new(Some("session-abc".into()), "pk"));
        let result = client.detect(&leaf()).await.unwrap();

        assert_eq!(result.filename, "leaf.jpg");
        assert_eq!(result.prediction, "Bearer session-abc|file|image/jpeg|3");
        assert!(!client.guard().is_busy());
    }

    #[tokio::test]
    async fn healthy_response_parses_into_report() {
        let router = Router::new().route(
            "/crop-detect",
            post(|| async {
                Json(serde_json::json!({
                    "filename": "leaf.jpg",
                    "prediction": "**Disease/Condition**: Healthy\n**Confidence**: High\n"
                }))
            }),
        );
        let endpoint = spawn_gateway(router).await;

        let client = DetectionClient::new(endpoint, Credentials::new(None, "pk"));
        let result = client.detect(&leaf()).await.unwrap();
        let report = parse_report(&result.prediction);

        assert!(result.success);
        assert!(report.is_healthy());
        assert_eq!(report.confidence_display(), "95%");
        assert!(report.symptoms.is_empty());
        assert!(report.treatment.is_empty());
        assert!(report.prevention.is_empty());
    }

    #[tokio::test]
    async fn missing_fields_fall_back_to_upload_name() {
        let router = Router::new().route("/crop-detect", post(|| async { Json(serde_json::json!({})) }));
        let endpoint = spawn_gateway(router).await;

        let client = DetectionClient::new(endpoint, Credentials::new(None, "pk"));
        let result = client.detect(&leaf()).await.unwrap();

        assert_eq!(result.filename, "leaf.jpg");
        assert_eq!(result.prediction, UNANALYZED_PREDICTION);
    }

    #[tokio::test]
    async fn rejection_surfaces_server_message() {
        let router = Router::new().route(
            "/crop-detect",
            post(|| async {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "No file provided" })))
                    .into_response()
            }),
        );
        let endpoint = spawn_gateway(router).await;

        let client = DetectionClient::new(endpoint, Credentials::new(None, "pk"));
        let err = client.detect(&leaf()).await.unwrap_err();

        assert!(matches!(&err, DetectError::Rejected(msg) if msg == "No file provided"));
        assert!(!client.guard().is_busy());
    }

    #[tokio::test]
    async fn rejection_without_json_uses_generic_message() {
        let router = Router::new().route(
            "/crop-detect",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down").into_response() }),
        );
        let endpoint = spawn_gateway(router).await;

        let client = DetectionClient::new(endpoint, Credentials::new(None, "pk"));
        let err = client.detect(&leaf()).await.unwrap_err();

        assert_eq!(err.to_string(), DETECTION_FAILED);
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = DetectionClient::new(format!("http://{addr}/crop-detect"), Credentials::default());
        let err = client.detect(&leaf()).await.unwrap_err();

        assert!(matches!(err, DetectError::Connection(_)));
        assert!(!client.guard().is_busy());
    }

    #[tokio::test]
    async fn concurrent_submission_is_busy() {
        let client = DetectionClient::new("http://127.0.0.1:9/crop-detect", Credentials::default());
        let _held = client.guard().try_begin().unwrap();

        let err = client.detect(&leaf()).await.unwrap_err();
        assert!(matches!(err, DetectError::Busy));
    }
}
