//! Gemini REST client (API-key based).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use contenize_shared::{ContenizeError, GenAiSettings, InlineImage, Result};

use crate::wire::{self, GenerateContentResponse};
use crate::{GenerativeModel, ImageRequest, StructuredRequest, StructuredResponse, UpstreamError};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("Contenize/", env!("CARGO_PKG_VERSION"));

/// Longest error body we keep from a failed response.
const MAX_ERROR_BODY: usize = 500;

/// [`GenerativeModel`] backed by the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    settings: GenAiSettings,
    client: Client,
}

impl GeminiClient {
    /// Build a client from resolved settings.
    pub fn new(settings: GenAiSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ContenizeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &GenAiSettings {
        &self.settings
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.settings.base_url
        )
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &Value,
    ) -> std::result::Result<GenerateContentResponse, UpstreamError> {
        let url = self.endpoint(model);
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(format!("{model}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message: String = text.chars().take(MAX_ERROR_BODY).collect();
            warn!(model, status = status.as_u16(), "generateContent failed");
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Transport(format!("{model}: unreadable response: {e}")))?;

        debug!(
            model,
            latency_ms = start.elapsed().as_millis() as u64,
            candidates = parsed.candidates.len(),
            "generateContent returned"
        );

        Ok(parsed)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    #[instrument(skip_all, fields(model = %self.settings.text_model))]
    async fn generate_structured(
        &self,
        request: StructuredRequest,
    ) -> std::result::Result<StructuredResponse, UpstreamError> {
        let body = wire::structured_body(
            &request.prompt,
            &request.schema,
            &request.attachments,
            request.grounded && self.settings.search_grounding,
        );
        let response = self
            .generate_content(&self.settings.text_model, &body)
            .await?;

        let text = response.text();
        if text.trim().is_empty() {
            if let Some(reason) = response.block_reason() {
                warn!(reason, "prompt blocked upstream");
            }
            return Err(UpstreamError::EmptyResponse);
        }

        Ok(StructuredResponse {
            text,
            finish_reason: response.finish_reason(),
        })
    }

    #[instrument(skip_all, fields(model = %self.settings.image_model, aspect = %request.aspect_ratio))]
    async fn generate_image(
        &self,
        request: ImageRequest,
    ) -> std::result::Result<InlineImage, UpstreamError> {
        let body = wire::image_body(&request.prompt, &request.aspect_ratio);
        let response = self
            .generate_content(&self.settings.image_model, &body)
            .await?;

        response.image().ok_or(UpstreamError::NoImage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contenize_shared::AppConfig;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let mut config = AppConfig::default();
        config.gemini.base_url = server.uri();
        config.gemini.text_model = "text-model".into();
        config.gemini.image_model = "image-model".into();
        GeminiClient::new(GenAiSettings::with_api_key(&config, "test-key")).unwrap()
    }

    fn structured_request() -> StructuredRequest {
        StructuredRequest {
            prompt: "Slice this".into(),
            schema: json!({ "type": "OBJECT" }),
            attachments: vec![],
            grounded: true,
        }
    }

    #[tokio::test]
    async fn structured_call_returns_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/text-model:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseMimeType": "application/json" },
                "tools": [{ "googleSearch": {} }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "{\"strategyName\":\"X\"}" }] },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client
            .generate_structured(structured_request())
            .await
            .unwrap();

        assert_eq!(response.text, "{\"strategyName\":\"X\"}");
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    }

    #[tokio::test]
    async fn structured_call_without_text_is_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/text-model:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_structured(structured_request())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::EmptyResponse));
    }

    #[tokio::test]
    async fn http_error_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_structured(structured_request())
            .await
            .unwrap_err();
        match err {
            UpstreamError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn image_call_sends_aspect_ratio() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/image-model:generateContent"))
            .and(body_partial_json(json!({
                "generationConfig": { "imageConfig": { "aspectRatio": "9:16" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [
                        { "inlineData": { "mimeType": "image/png", "data": "aGVsbG8=" } }
                    ]}
                }]
            })))
            .mount(&server)
            .await;

        let image = client_for(&server)
            .generate_image(ImageRequest {
                prompt: "A tall poster".into(),
                aspect_ratio: "9:16".into(),
            })
            .await
            .unwrap();

        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.decode().unwrap(), b"hello");
    }

    #[tokio::test]
    async fn image_call_without_image_part_fails() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/image-model:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "I cannot draw that" }] } }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_image(ImageRequest {
                prompt: "x".into(),
                aspect_ratio: "16:9".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::NoImage));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let mut config = AppConfig::default();
        config.gemini.base_url = "http://127.0.0.1:9".into();
        config.gemini.timeout_secs = 2;
        let client = GeminiClient::new(GenAiSettings::with_api_key(&config, "k")).unwrap();

        let err = client
            .generate_structured(structured_request())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }
}
