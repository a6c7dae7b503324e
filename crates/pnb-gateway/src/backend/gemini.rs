//! Google Generative Language API client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use pnb_core::config::BackendConfig;
use pnb_core::BackendError;

use super::prompts::{analysis_prompt, random_category, validation_prompt, VALIDATION_INSTRUCTION};
use super::{Challenge, SceneBackend};

/// Scene backend backed by Imagen (drawing) and Gemini (questions, grading)
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    image_model: String,
    text_model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChallengePayload {
    challenge: String,
    solution: String,
}

impl GeminiBackend {
    /// Build a client from configuration and an API key
    pub fn new(config: &BackendConfig, api_key: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            image_model: config.image_model.clone(),
            text_model: config.text_model.clone(),
            api_key: api_key.into(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        model: &str,
        method: &str,
        payload: &Value,
    ) -> Result<T, BackendError> {
        let url = format!("{}/models/{}:{}", self.base_url, model, method);
        tracing::debug!("POST {} ({})", url, method);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!("{} {} failed: {} {}", model, method, status, body);
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl SceneBackend for GeminiBackend {
    async fn generate_scene(&self, prompt: &str) -> Result<String, BackendError> {
        let payload = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1 }
        });
        let resp: PredictResponse = self.call(&self.image_model, "predict", &payload).await?;
        parse_scene_image(resp)
    }

    async fn analyze_scene(&self, scene_data: &str) -> Result<Challenge, BackendError> {
        let category = random_category();
        tracing::debug!("Analyzing scene for a question about {}", category);

        let payload = json!({
            "contents": [{
                "parts": [
                    { "text": analysis_prompt(category) },
                    { "inlineData": { "mimeType": "image/png", "data": scene_data } }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "challenge": { "type": "STRING" },
                        "solution": { "type": "STRING" }
                    },
                    "required": ["challenge", "solution"]
                }
            }
        });
        let resp: GenerateContentResponse =
            self.call(&self.text_model, "generateContent", &payload).await?;
        parse_challenge(resp)
    }

    async fn validate_challenge(
        &self,
        challenge: &str,
        solution: &str,
        player_response: &str,
    ) -> Result<bool, BackendError> {
        let payload = json!({
            "contents": [{
                "parts": [{ "text": validation_prompt(challenge, solution, player_response) }]
            }],
            "systemInstruction": { "parts": [{ "text": VALIDATION_INSTRUCTION }] }
        });
        let resp: GenerateContentResponse =
            self.call(&self.text_model, "generateContent", &payload).await?;
        parse_verdict(resp)
    }
}

fn parse_scene_image(resp: PredictResponse) -> Result<String, BackendError> {
    resp.predictions
        .into_iter()
        .next()
        .and_then(|p| p.bytes_base64_encoded)
        .filter(|image| !image.is_empty())
        .ok_or(BackendError::MissingField("predictions[0].bytesBase64Encoded"))
}

fn first_text(resp: GenerateContentResponse) -> Result<String, BackendError> {
    resp.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or(BackendError::MissingField("candidates[0].content.parts[0].text"))
}

fn parse_challenge(resp: GenerateContentResponse) -> Result<Challenge, BackendError> {
    let text = first_text(resp)?;
    let payload: ChallengePayload = serde_json::from_str(&text)
        .map_err(|e| BackendError::InvalidResponse(format!("challenge JSON: {}", e)))?;
    Ok(Challenge {
        challenge: payload.challenge,
        solution: payload.solution,
    })
}

fn parse_verdict(resp: GenerateContentResponse) -> Result<bool, BackendError> {
    let text = first_text(resp)?;
    Ok(text.trim().to_lowercase() == "si")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::time::Duration;

    fn content(text: &str) -> GenerateContentResponse {
        serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_scene_image() {
        let resp: PredictResponse = serde_json::from_value(json!({
            "predictions": [{ "bytesBase64Encoded": "iVBORw0KGgo=", "mimeType": "image/png" }]
        }))
        .unwrap();
        assert_eq!(parse_scene_image(resp).unwrap(), "iVBORw0KGgo=");

        let empty: PredictResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            parse_scene_image(empty),
            Err(BackendError::MissingField(_))
        ));
    }

    #[test]
    fn test_parse_challenge() {
        let resp = content(r#"{"challenge": "¿De qué color es el gato?", "solution": "negro"}"#);
        assert_eq!(
            parse_challenge(resp).unwrap(),
            Challenge {
                challenge: "¿De qué color es el gato?".to_string(),
                solution: "negro".to_string(),
            }
        );

        assert!(matches!(
            parse_challenge(content("not json")),
            Err(BackendError::InvalidResponse(_))
        ));

        let no_candidates: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            parse_challenge(no_candidates),
            Err(BackendError::MissingField(_))
        ));
    }

    #[test]
    fn test_parse_verdict() {
        assert!(parse_verdict(content("si")).unwrap());
        assert!(parse_verdict(content(" Si\n")).unwrap());
        assert!(!parse_verdict(content("no")).unwrap());
        assert!(!parse_verdict(content("sí, correcto")).unwrap());
    }

    async fn mock_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn backend(base_url: String) -> GeminiBackend {
        let config = BackendConfig {
            base_url,
            request_timeout: Duration::from_secs(5),
            ..BackendConfig::default()
        };
        GeminiBackend::new(&config, "test-key").unwrap()
    }

    #[tokio::test]
    async fn test_generate_scene_against_mock() {
        let router = Router::new().route(
            "/models/:action",
            post(|Path(action): Path<String>, Json(body): Json<Value>| async move {
                assert_eq!(action, "imagen-3.0-generate-002:predict");
                assert_eq!(body["instances"][0]["prompt"], "un gato en la playa");
                Json(json!({ "predictions": [{ "bytesBase64Encoded": "abc" }] }))
            }),
        );
        let backend = backend(mock_upstream(router).await);

        let image = backend.generate_scene("un gato en la playa").await.unwrap();
        assert_eq!(image, "abc");
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let router = Router::new().route(
            "/models/:action",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
        );
        let backend = backend(mock_upstream(router).await);

        let err = backend
            .validate_challenge("q", "a", "a")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503 }));
    }
}
