//! AI troubleshooting assistant.
//!
//! A narrow collaborator around a generative-text service. It produces
//! markdown troubleshooting guides and a "device info" record per address.
//! The device info is synthetic (plausible-looking text from a language
//! model, decorative rather than diagnostic) and nothing in the polling
//! core depends on anything this module returns. Every call is a fallible
//! network request with no retry; a missing API key fails fast without
//! affecting monitoring.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::ServerConfig;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Assistant error types.
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("assistant is not configured: set the GEMINI_API_KEY environment variable")]
    Unconfigured,
    #[error("assistant request failed: {0}")]
    Request(String),
    #[error("assistant returned an unusable reply: {0}")]
    Malformed(String),
}

/// Fabricated device details, shaped like a scan result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub ip_address: String,
    pub device_type: String,
    pub vendor: String,
    pub model: String,
    pub os_version: String,
    pub uptime: String,
    #[serde(default)]
    pub open_ports: Vec<u16>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

/// Client for the text-generation service.
pub struct Assistant {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl Assistant {
    pub fn new(config: &ServerConfig) -> Self {
        if config.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; AI features will return errors");
        }
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Step-by-step troubleshooting guide, as markdown.
    pub async fn troubleshooting_steps(&self, address: &str) -> Result<String, AssistantError> {
        let prompt = format!(
            "You are a senior network engineering consultant. A monitored host at IP address {} \
             is unresponsive to reachability probes.\n\
             Provide a concise, step-by-step troubleshooting guide for a network administrator.\n\
             Use markdown for formatting. Focus on clarity and actionable steps.\n\
             Start with the most common and simplest checks first.",
            address
        );
        self.generate(&prompt).await
    }

    /// Fabricated device record for an address. Synthetic data only.
    pub async fn device_info(&self, address: &str) -> Result<DeviceInfo, AssistantError> {
        let prompt = format!(
            "Invent a plausible network device that could be running at IP address {}.\n\
             Respond with ONLY a JSON object, no prose and no code fences, with exactly these \
             keys: \"ipAddress\" (string), \"deviceType\" (string), \"vendor\" (string), \
             \"model\" (string), \"osVersion\" (string), \"uptime\" (human-readable string), \
             \"openPorts\" (array of port numbers).",
            address
        );
        let text = self.generate(&prompt).await?;
        parse_device_info(&text)
    }

    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        let api_key = self.api_key.as_ref().ok_or(AssistantError::Unconfigured)?;
        let url = format!("{}/models/{}:generateContent", API_BASE, self.model);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("assistant error {}: {}", status, body);
            return Err(AssistantError::Request(format!("service returned {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Malformed(e.to_string()))?;
        collect_text(&body)
    }
}

/// Pull the generated text out of a generateContent response body.
fn collect_text(body: &Value) -> Result<String, AssistantError> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| AssistantError::Malformed("no candidates in reply".to_string()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(AssistantError::Malformed("empty reply".to_string()));
    }
    Ok(text)
}

/// Parse a device-info reply, tolerating prose or code fences around the
/// JSON object.
fn parse_device_info(text: &str) -> Result<DeviceInfo, AssistantError> {
    if let Ok(info) = serde_json::from_str::<DeviceInfo>(text) {
        return Ok(info);
    }
    let extracted = extract_json(text);
    serde_json::from_str::<DeviceInfo>(&extracted)
        .map_err(|e| AssistantError::Malformed(e.to_string()))
}

/// Extract the outermost JSON object from text that may wrap it in prose.
fn extract_json(text: &str) -> String {
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> Assistant {
        let config = ServerConfig {
            gemini_api_key: None,
            ..ServerConfig::default()
        };
        Assistant::new(&config)
    }

    #[tokio::test]
    async fn missing_key_fails_fast() {
        let assistant = unconfigured();
        assert!(!assistant.is_configured());
        let err = assistant.troubleshooting_steps("10.0.0.5").await.unwrap_err();
        assert!(matches!(err, AssistantError::Unconfigured));

        let err = assistant.device_info("10.0.0.5").await.unwrap_err();
        assert!(matches!(err, AssistantError::Unconfigured));
    }

    #[test]
    fn collect_text_joins_parts() {
        let body: Value = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Check the "},{"text":"cable."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(collect_text(&body).unwrap(), "Check the cable.");
    }

    #[test]
    fn collect_text_rejects_empty_reply() {
        let body: Value = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(collect_text(&body).is_err());
    }

    #[test]
    fn parse_device_info_accepts_bare_json() {
        let reply = r#"{"ipAddress":"10.0.0.5","deviceType":"Router","vendor":"Cisco",
            "model":"ISR 4331","osVersion":"IOS XE 17.9","uptime":"42 days","openPorts":[22,443]}"#;
        let info = parse_device_info(reply).unwrap();
        assert_eq!(info.vendor, "Cisco");
        assert_eq!(info.open_ports, vec![22, 443]);
    }

    #[test]
    fn parse_device_info_tolerates_fences_and_prose() {
        let reply = "Sure! Here you go:\n```json\n{\"ipAddress\":\"10.0.0.5\",\
            \"deviceType\":\"Switch\",\"vendor\":\"Juniper\",\"model\":\"EX2300\",\
            \"osVersion\":\"Junos 21.4\",\"uptime\":\"7 days\",\"openPorts\":[22]}\n```";
        let info = parse_device_info(reply).unwrap();
        assert_eq!(info.device_type, "Switch");
    }

    #[test]
    fn parse_device_info_defaults_missing_ports() {
        let reply = r#"{"ipAddress":"10.0.0.5","deviceType":"Firewall","vendor":"Palo Alto",
            "model":"PA-220","osVersion":"PAN-OS 10.2","uptime":"3 days"}"#;
        let info = parse_device_info(reply).unwrap();
        assert!(info.open_ports.is_empty());
    }

    #[test]
    fn parse_device_info_rejects_garbage() {
        assert!(parse_device_info("I cannot help with that.").is_err());
    }
}
