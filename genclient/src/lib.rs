//! Minimal client for the local text/image generation server.
//!
//! The storyteller runs against a sidecar process exposing two endpoints
//! on a fixed local address:
//! - `POST /generate/text` with `{"prompt": ...}`, answering
//!   `{"response": ...}` on success or `{"error": ...}` on failure
//! - `POST /generate/image` with `{"prompt": ..., "kind": ...}`,
//!   answering `{"image_data_url": ...}` or `{"error": ...}`
//!
//! An `error` field in the body and a non-success HTTP status are treated
//! alike: both surface as [`Error`] variants that the engine maps to a
//! failed turn (text) or a dropped image (images). All requests carry
//! bounded timeouts so a hung server can never wedge the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Errors that can occur when talking to the generation server.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Generation failed: {0}")]
    Backend(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Image response contained no image reference")]
    MissingImage,
}

/// Which kind of image the server should generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// An illustration of the current narrative moment.
    Scene,
    /// A portrait bound to the player character.
    Portrait,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Scene => "scene",
            ImageKind::Portrait => "portrait",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generation server client.
#[derive(Clone)]
pub struct GenClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for GenClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GenClient {
    /// Create a client pointed at the default local endpoint.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different server address.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The address this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request narrative text for a prompt.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, Error> {
        let body = self
            .post("/generate/text", &TextRequest { prompt })
            .await?;
        parse_text_response(&body)
    }

    /// Request an image and return its opaque reference (a data URL or
    /// similar handle, depending on the server).
    pub async fn generate_image(&self, prompt: &str, kind: ImageKind) -> Result<String, Error> {
        let body = self
            .post(
                "/generate/image",
                &ImageRequest {
                    prompt,
                    kind: kind.as_str(),
                },
            )
            .await?;
        parse_image_response(&body)
    }

    async fn post<R: Serialize>(&self, path: &str, request: &R) -> Result<String, Error> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            // Error bodies are usually {"error": ...}; fall back to the
            // raw body when they are not.
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

fn parse_text_response(body: &str) -> Result<String, Error> {
    let parsed: TextResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(Error::Backend(error));
    }
    parsed
        .response
        .ok_or_else(|| Error::Parse("response field missing".to_string()))
}

fn parse_image_response(body: &str) -> Result<String, Error> {
    let parsed: ImageResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(Error::Backend(error));
    }
    match parsed.image_data_url {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(Error::MissingImage),
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    image_data_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GenClient::new();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = GenClient::new().with_base_url("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_image_kind_names() {
        assert_eq!(ImageKind::Scene.as_str(), "scene");
        assert_eq!(ImageKind::Portrait.as_str(), "portrait");
        assert_eq!(
            serde_json::to_string(&ImageKind::Portrait).unwrap(),
            "\"portrait\""
        );
    }

    #[test]
    fn test_parse_text_success() {
        let body = r#"{"response": "You find a shard."}"#;
        assert_eq!(parse_text_response(body).unwrap(), "You find a shard.");
    }

    #[test]
    fn test_parse_text_backend_error() {
        let body = r#"{"error": "Text model is not available."}"#;
        match parse_text_response(body) {
            Err(Error::Backend(message)) => {
                assert_eq!(message, "Text model is not available.")
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_text_malformed() {
        assert!(matches!(parse_text_response("not json"), Err(Error::Parse(_))));
        assert!(matches!(parse_text_response("{}"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_image_success() {
        let body = r#"{"image_data_url": "data:image/jpeg;base64,abc"}"#;
        assert_eq!(
            parse_image_response(body).unwrap(),
            "data:image/jpeg;base64,abc"
        );
    }

    #[test]
    fn test_parse_image_missing_reference() {
        assert!(matches!(
            parse_image_response("{}"),
            Err(Error::MissingImage)
        ));
        assert!(matches!(
            parse_image_response(r#"{"image_data_url": ""}"#),
            Err(Error::MissingImage)
        ));
    }

    #[test]
    fn test_request_serialization() {
        let text = serde_json::to_value(TextRequest { prompt: "hi" }).unwrap();
        assert_eq!(text["prompt"], "hi");

        let image = serde_json::to_value(ImageRequest {
            prompt: "a shard",
            kind: "scene",
        })
        .unwrap();
        assert_eq!(image["kind"], "scene");
    }
}
