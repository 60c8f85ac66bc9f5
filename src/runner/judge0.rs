//! Judge0 runner implementation
//!
//! Submits programs synchronously (`wait=true`) with base64-encoded payloads.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ExecutionError, RunOutcome, RunRequest, RunStatus, Runner};
use crate::config::EngineConfig;

/// Judge0 status ids
/// Reference: https://ce.judge0.com/#statuses-and-languages-status-get
mod judge0_status {
    pub const IN_QUEUE: u32 = 1;
    pub const PROCESSING: u32 = 2;
    pub const ACCEPTED: u32 = 3;
    pub const WRONG_ANSWER: u32 = 4;
    pub const TIME_LIMIT_EXCEEDED: u32 = 5;
    pub const COMPILATION_ERROR: u32 = 6;
    pub const RUNTIME_ERROR_FIRST: u32 = 7; // SIGSEGV
    pub const RUNTIME_ERROR_LAST: u32 = 12; // Other
}

/// Convert a Judge0 status id to a run status
fn status_from_id(id: u32) -> RunStatus {
    match id {
        // No expected_output is sent, so "wrong answer" still means the program finished
        judge0_status::ACCEPTED | judge0_status::WRONG_ANSWER => RunStatus::Accepted,
        judge0_status::TIME_LIMIT_EXCEEDED => RunStatus::TimeLimitExceeded,
        judge0_status::COMPILATION_ERROR => RunStatus::CompileError,
        judge0_status::RUNTIME_ERROR_FIRST..=judge0_status::RUNTIME_ERROR_LAST => {
            RunStatus::RuntimeError
        }
        judge0_status::IN_QUEUE | judge0_status::PROCESSING => {
            warn!("Judge0 returned a pending status ({}) for a synchronous submission", id);
            RunStatus::SystemError
        }
        _ => RunStatus::SystemError,
    }
}

/// Runner that executes code on a Judge0 instance
pub struct Judge0Runner {
    client: Client,
    url: Option<String>,
    api_key: Option<String>,
    api_host: String,
}

impl Judge0Runner {
    pub fn new(config: &EngineConfig) -> Result<Self, ExecutionError> {
        let client = Client::builder()
            .timeout(config.execution_timeout)
            .build()
            .map_err(|e| ExecutionError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: config.judge0_url.clone(),
            api_key: config.judge0_key.clone(),
            api_host: config.judge0_host.clone(),
        })
    }

    fn endpoint(&self) -> Result<(reqwest::Url, &str), ExecutionError> {
        let (Some(url), Some(key)) = (self.url.as_deref(), self.api_key.as_deref()) else {
            return Err(ExecutionError::Configuration(
                "Missing API Key/URL".to_string(),
            ));
        };
        let mut url = reqwest::Url::parse(url)
            .map_err(|e| ExecutionError::Configuration(format!("Invalid API URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("base64_encoded", "true")
            .append_pair("wait", "true");
        Ok((url, key))
    }
}

#[async_trait]
impl Runner for Judge0Runner {
    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, ExecutionError> {
        let (url, api_key) = self.endpoint()?;

        let body = SubmissionRequest {
            source_code: general_purpose::STANDARD.encode(&request.source),
            language_id: request.language_id,
            stdin: general_purpose::STANDARD.encode(&request.stdin),
        };

        let resp = self
            .client
            .post(url)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", &self.api_host)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExecutionError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ExecutionError::Service { status, body });
        }

        let parsed: SubmissionResponse = resp
            .json()
            .await
            .map_err(|e| ExecutionError::Malformed(e.to_string()))?;

        let outcome = parsed.into_outcome();
        debug!(
            "Judge0 result: status={:?}, stdout={}, stderr={}",
            outcome.status,
            outcome.stdout.chars().take(200).collect::<String>(),
            outcome.stderr.chars().take(200).collect::<String>()
        );
        Ok(outcome)
    }
}

#[derive(Debug, Serialize)]
struct SubmissionRequest {
    source_code: String,
    language_id: u32,
    stdin: String,
}

#[derive(Debug, Default, Deserialize)]
struct SubmissionResponse {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    message: Option<String>,
    status: Option<SubmissionStatus>,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatus {
    id: u32,
    #[allow(dead_code)]
    description: Option<String>,
}

impl SubmissionResponse {
    fn into_outcome(self) -> RunOutcome {
        let stdout = decode_field(self.stdout.as_deref());
        let stderr = [
            decode_field(self.stderr.as_deref()),
            decode_field(self.compile_output.as_deref()),
            decode_field(self.message.as_deref()),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

        let status = self
            .status
            .map(|s| status_from_id(s.id))
            .unwrap_or(RunStatus::SystemError);

        RunOutcome {
            stdout,
            stderr,
            status,
        }
    }
}

/// Decode a base64 response field; Judge0 wraps encoded output at 60 columns.
/// Undecodable content is passed through unchanged.
fn decode_field(field: Option<&str>) -> String {
    let Some(raw) = field else {
        return String::new();
    };
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    match general_purpose::STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("Failed to decode base64 field: {}", e);
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_id() {
        assert_eq!(status_from_id(3), RunStatus::Accepted);
        assert_eq!(status_from_id(5), RunStatus::TimeLimitExceeded);
        assert_eq!(status_from_id(6), RunStatus::CompileError);
        assert_eq!(status_from_id(11), RunStatus::RuntimeError);
        assert_eq!(status_from_id(13), RunStatus::SystemError);
        assert_eq!(status_from_id(2), RunStatus::SystemError);
    }

    #[test]
    fn test_decode_field_handles_wrapped_base64() {
        let encoded = general_purpose::STANDARD.encode("Enter the radius: 523.60\n");
        let wrapped = format!("{}\n{}\n", &encoded[..10], &encoded[10..]);
        assert_eq!(decode_field(Some(&wrapped)), "Enter the radius: 523.60\n");
        assert_eq!(decode_field(None), "");
        assert_eq!(decode_field(Some("not base64!")), "not base64!");
    }

    #[test]
    fn test_response_joins_error_streams() {
        let enc = |s: &str| Some(general_purpose::STANDARD.encode(s));
        let response = SubmissionResponse {
            stdout: None,
            stderr: enc("Unhandled Exception"),
            compile_output: enc("Main.cs(3,1): error CS1002: ; expected"),
            message: None,
            status: Some(SubmissionStatus {
                id: 6,
                description: Some("Compilation Error".into()),
            }),
        };
        let outcome = response.into_outcome();
        assert_eq!(outcome.status, RunStatus::CompileError);
        assert_eq!(
            outcome.stderr,
            "Unhandled Exception\nMain.cs(3,1): error CS1002: ; expected"
        );
        assert!(outcome.stdout.is_empty());
    }

    #[test]
    fn test_missing_configuration_is_reported_without_network() {
        let runner = Judge0Runner::new(&EngineConfig::default()).unwrap();
        let request = RunRequest::new(51, "class P {}");
        let err = tokio_test::block_on(runner.run(&request)).unwrap_err();
        assert!(matches!(err, ExecutionError::Configuration(_)));
        assert_eq!(err.to_string(), "Configuration Error: Missing API Key/URL");
    }
}
