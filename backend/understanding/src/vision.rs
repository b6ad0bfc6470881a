/// Crop vision: ask a multimodal chat-completions gateway to diagnose a plant photo.
///
/// One request in, one answer out. No retries, no streaming.
use agrolens_core::{AgroError, AnalysisRequest, ImageAnalyzer, Result, UNANALYZED_PREDICTION};
use agrolens_logging::redact_sensitive_data;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::Value;
use tracing::{error, info};

pub const DEFAULT_ENDPOINT: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
pub const MAX_TOKENS: u32 = 1000;

/// Name of the setting that carries the gateway key, used in error messages.
pub const API_KEY_SETTING: &str = "AI_GATEWAY_API_KEY";

/// Instruction sent with every image. The section labels must stay in sync
/// with `report::parse_report`.
pub const CROP_PATHOLOGIST_PROMPT: &str = r#"You are an expert agricultural plant pathologist. Analyze this crop/plant image and identify any diseases or health issues.

Provide your response in this exact format:
1. **Disease/Condition**: [Name of the disease or "Healthy" if no disease detected]
2. **Confidence**: [High/Medium/Low]
3. **Symptoms Observed**: [Brief description of visible symptoms]
4. **Recommended Treatment**: [Practical treatment recommendations]
5. **Prevention Tips**: [How to prevent this in the future]

Be specific and practical in your recommendations. If you cannot identify the plant or disease clearly, state that and provide general advice."#;

/// Client for an OpenAI-compatible multimodal completion endpoint.
#[derive(Clone)]
pub struct VisionGateway {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
}

impl VisionGateway {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            max_tokens: MAX_TOKENS,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Chat-completions body: one user turn with the prompt and the inline image.
    pub fn build_body(&self, b64: &str, mime_type: &str) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": CROP_PATHOLOGIST_PROMPT },
                    { "type": "image_url",
                      "image_url": { "url": format!("data:{};base64,{}", mime_type, b64) } }
                ]
            }],
            "max_tokens": self.max_tokens
        })
    }

    /// Send the image upstream and return the model's text untouched.
    pub async fn describe(&self, request: &AnalysisRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AgroError::MissingCredential(API_KEY_SETTING.to_string()))?;

        let mime_type = request.effective_mime_type();
        info!(
            "[Vision] Analyzing {} ({} bytes, {}) via {}",
            request.filename,
            request.image_bytes.len(),
            mime_type,
            self.model
        );

        let b64 = STANDARD.encode(&request.image_bytes);
        let body = self.build_body(&b64, mime_type);

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgroError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %redact_sensitive_data(&text), "AI gateway error");
            return Err(AgroError::Upstream {
                status: status.as_u16(),
                message: text,
            });
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("invalid AI gateway response: {e}"))?;
        Ok(extract_content(&json))
    }
}

/// `choices[0].message.content`, or the generic fallback when absent or empty.
pub fn extract_content(json: &Value) -> String {
    json["choices"][0]["message"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .unwrap_or(UNANALYZED_PREDICTION)
        .to_string()
}

#[async_trait]
impl ImageAnalyzer for VisionGateway {
    fn name(&self) -> &str {
        "ai-gateway"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String> {
        self.describe(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    async fn spawn_upstream(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1/chat/completions")
    }

    fn leaf_request() -> AnalysisRequest {
        AnalysisRequest::new(vec![0xFFu8, 0xD8, 0xFF], "leaf.jpg")
    }

    #[test]
    fn body_embeds_prompt_and_data_url() {
        let gateway = VisionGateway::new(Some("key".into()));
        let body = gateway.build_body("AAAA", "image/png");

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0]["text"], CROP_PATHOLOGIST_PROMPT);
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn prompt_names_every_parsed_section() {
        for label in [
            "**Disease/Condition**:",
            "**Confidence**:",
            "**Symptoms Observed**:",
            "**Recommended Treatment**:",
            "**Prevention Tips**:",
        ] {
            assert!(CROP_PATHOLOGIST_PROMPT.contains(label), "missing {label}");
        }
    }

    #[test]
    fn missing_content_uses_fallback() {
        assert_eq!(extract_content(&serde_json::json!({})), UNANALYZED_PREDICTION);
        assert_eq!(
            extract_content(&serde_json::json!({ "choices": [{ "message": { "content": "" } }] })),
            UNANALYZED_PREDICTION
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let gateway = VisionGateway::new(None).with_endpoint("http://127.0.0.1:1/unused");
        let err = gateway.describe(&leaf_request()).await.unwrap_err();
        assert!(matches!(err, AgroError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn forwards_model_text_unmodified() {
        let seen_auth = Arc::new(Mutex::new(None::<String>));
        let seen = Arc::clone(&seen_auth);
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = Arc::clone(&seen);
                async move {
                    *seen.lock().unwrap() = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let url = body["messages"][0]["content"][1]["image_url"]["url"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string();
                    Json(serde_json::json!({
                        "choices": [{ "message": { "content": format!("**Disease/Condition**: Healthy\n{url}") } }]
                    }))
                }
            }),
        );
        let endpoint = spawn_upstream(router).await;

        let gateway = VisionGateway::new(Some("test-key".into())).with_endpoint(endpoint);
        let text = gateway.describe(&leaf_request()).await.unwrap();

        assert_eq!(text, "**Disease/Condition**: Healthy\ndata:image/jpeg;base64,/9j/");
        assert_eq!(seen_auth.lock().unwrap().as_deref(), Some("Bearer test-key"));
    }

    #[tokio::test]
    async fn upstream_failure_status_is_reported() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
        );
        let endpoint = spawn_upstream(router).await;

        let gateway = VisionGateway::new(Some("test-key".into())).with_endpoint(endpoint);
        let err = gateway.describe(&leaf_request()).await.unwrap_err();

        assert!(matches!(err, AgroError::Upstream { status: 429, .. }));
        assert_eq!(err.to_string(), "AI analysis failed: 429");
    }
}
