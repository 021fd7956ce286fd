use std::time::Duration;

use reqwest::blocking::Client;
use shellmate_core::config::ModelConfig;
use shellmate_core::profile::InstructionProfile;
use shellmate_core::state::FailureKind;
use shellmate_core::state::GatewayFailure;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::contracts::GenerateContentRequest;
use crate::contracts::GenerateContentResponse;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("service returned {status}: {body}")]
    Service { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Parse(String),
    /// The request could not be formed; never reaches the wire.
    #[error("prompt is empty")]
    EmptyPrompt,
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::Service { .. } => FailureKind::Service,
            Self::Parse(_) | Self::EmptyPrompt => FailureKind::Parse,
        }
    }
}

impl From<GatewayError> for GatewayFailure {
    fn from(err: GatewayError) -> Self {
        GatewayFailure::new(err.kind(), err.to_string())
    }
}

/// Sends one prompt to the remote model and returns its text.
///
/// Implementations perform a single attempt; retry policy belongs to callers.
pub trait TextGenerator: Send + Sync {
    fn send(&self, prompt: &str, profile: &InstructionProfile) -> Result<String, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl GatewaySettings {
    pub fn from_config(model: &ModelConfig, api_key: Option<String>) -> Self {
        Self {
            endpoint: model.endpoint.clone(),
            model: model.name.clone(),
            api_key,
            timeout: Duration::from_secs(model.timeout_secs),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Clone)]
pub struct GeminiGateway {
    client: Client,
    settings: GatewaySettings,
}

impl GeminiGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| GatewayError::Network(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, settings })
    }
}

impl TextGenerator for GeminiGateway {
    fn send(&self, prompt: &str, profile: &InstructionProfile) -> Result<String, GatewayError> {
        if prompt.trim().is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }

        let request = GenerateContentRequest::single_turn(prompt, profile.instruction());
        debug!(
            model = %self.settings.model,
            profile = profile.label(),
            "sending request to generation service"
        );

        let mut builder = self.client.post(self.settings.url()).json(&request);
        if let Some(key) = &self.settings.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder.send().map_err(|err| {
            if err.is_timeout() {
                warn!(timeout = ?self.settings.timeout, "generation request timed out");
                GatewayError::Network(format!("timed out after {:?}", self.settings.timeout))
            } else {
                GatewayError::Network(err.to_string())
            }
        })?;

        let status = response.status();
        info!(status = status.as_u16(), "received response from generation service");
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .map_err(|err| GatewayError::Network(format!("failed to read response body: {err}")))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|err| GatewayError::Parse(format!("invalid JSON body: {err}")))?;
        parsed
            .first_text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| GatewayError::Parse("response carried no candidate text".to_string()))
    }
}
