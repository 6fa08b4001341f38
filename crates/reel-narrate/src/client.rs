//! HTTP synthesis provider client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{SynthesisError, SynthesisResult};
use crate::provider::{validate_script, NarrationProvider};
use crate::types::{Narration, VoiceSettings};

/// Response header carrying the synthesized audio duration.
const DURATION_HEADER: &str = "x-duration-seconds";

/// Configuration for the HTTP provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the synthesis service.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl ProviderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("NARRATION_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8002".to_string()),
            timeout: Duration::from_secs(
                std::env::var("NARRATION_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    speaking_rate: f64,
    pitch: f64,
}

/// Provider speaking the synthesis service's HTTP contract: POST the
/// script, receive audio bytes with the duration in a response header.
pub struct HttpNarrationProvider {
    http: Client,
    config: ProviderConfig,
}

impl HttpNarrationProvider {
    pub fn new(config: ProviderConfig) -> SynthesisResult<Self> {
        Url::parse(&config.base_url)
            .map_err(|e| SynthesisError::InvalidResponse(format!("bad base URL: {e}")))?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SynthesisError::Network)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> SynthesisResult<Self> {
        Self::new(ProviderConfig::from_env())
    }
}

#[async_trait]
impl NarrationProvider for HttpNarrationProvider {
    async fn synthesize(&self, text: &str, voice: &VoiceSettings) -> SynthesisResult<Narration> {
        validate_script(text)?;

        let url = format!("{}/v1/synthesize", self.config.base_url);
        debug!(chars = text.len(), voice = %voice.voice_id, "Requesting narration synthesis");

        let response = self
            .http
            .post(&url)
            .json(&SynthesizeRequest {
                text,
                voice_id: &voice.voice_id,
                speaking_rate: voice.speaking_rate,
                pitch: voice.pitch,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, "Synthesis request failed");
            return Err(SynthesisError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        let duration_secs = response
            .headers()
            .get(DURATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| {
                SynthesisError::InvalidResponse(format!("missing {DURATION_HEADER} header"))
            })?;

        let audio = response.bytes().await?.to_vec();
        if audio.is_empty() {
            return Err(SynthesisError::InvalidResponse(
                "provider returned no audio".to_string(),
            ));
        }

        debug!(bytes = audio.len(), duration_s = duration_secs, "Synthesis complete");
        Ok(Narration {
            audio,
            duration_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider_for(server: &MockServer) -> HttpNarrationProvider {
        HttpNarrationProvider::new(ProviderConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn synthesize_returns_audio_and_duration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/synthesize"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(DURATION_HEADER, "12.5")
                    .set_body_bytes(vec![0u8; 64]),
            )
            .mount(&server)
            .await;

        let narration = provider_for(&server)
            .await
            .synthesize("A short story.", &VoiceSettings::default())
            .await
            .unwrap();

        assert_eq!(narration.audio.len(), 64);
        assert!((narration.duration_secs - 12.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn server_error_surfaces_as_request_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/synthesize"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .await
            .synthesize("A short story.", &VoiceSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SynthesisError::RequestFailed { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn missing_duration_header_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/synthesize"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 8]))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .await
            .synthesize("A short story.", &VoiceSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SynthesisError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn empty_script_never_reaches_the_wire() {
        let server = MockServer::start().await;
        let err = provider_for(&server)
            .await
            .synthesize("   ", &VoiceSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyScript));
    }
}
