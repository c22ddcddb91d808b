//! Analyzer workflow engine client
//!
//! Submits a mapped analysis request to the external AI workflow engine and
//! returns the result, either as one blocking call or with streamed
//! progress callbacks. Calls take minutes; the client enforces an explicit
//! timeout and never leaves a call hanging.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::mapping::AnalysisRequest;

const DEFAULT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_MAX_INPUT_CHARS: usize = 50_000;
/// Intermediate progress never reaches the finalizing band
const PROGRESS_CAP: i64 = 85;

/// Analyzer client errors
///
/// The orchestrator reacts to each kind distinctly: timeouts and gateway
/// errors are safe to retry manually, bad requests are not, and
/// misconfiguration is an operator problem.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Analyzer call timed out")]
    Timeout,

    #[error("Analyzer rejected request: {0}")]
    BadRequest(String),

    #[error("Analyzer gateway error: {0}")]
    Gateway(String),

    #[error("Analyzer not configured: {0}")]
    NotConfigured(String),
}

impl AnalyzerError {
    /// Stable kind string stored in the job's error detail
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::BadRequest(_) => "bad_request",
            Self::Gateway(_) => "gateway",
            Self::NotConfigured(_) => "not_configured",
        }
    }
}

/// Successful analysis result
#[derive(Debug, Clone)]
pub struct AnalyzerOutput {
    /// Result body (markdown)
    pub text: String,
    /// Short summary when the engine provides one
    pub summary: Option<String>,
    pub workflow_run_id: Option<String>,
    pub elapsed_time: Option<f64>,
    pub total_tokens: Option<i64>,
}

/// One progress callback payload from a streaming run
#[derive(Debug, Clone)]
pub struct AnalyzerProgress {
    pub stage: String,
    pub progress: i64,
    pub message: String,
}

/// Progress callback sink; invoked from the streaming read loop
pub type ProgressSink = Box<dyn Fn(AnalyzerProgress) + Send + Sync>;

/// Analyzer interface
///
/// The orchestrator depends on this trait only; tests substitute a scripted
/// implementation.
#[async_trait]
pub trait AnalyzerApi: Send + Sync {
    /// Run analysis, blocking until the workflow finishes
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzerOutput, AnalyzerError>;

    /// Run analysis with streamed intermediate progress
    async fn analyze_with_progress(
        &self,
        request: &AnalysisRequest,
        on_progress: ProgressSink,
    ) -> Result<AnalyzerOutput, AnalyzerError>;
}

/// Analyzer endpoint configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub base_url: String,
    pub api_key: String,
    pub workflow_id: String,
    pub timeout: Duration,
    pub max_input_chars: usize,
}

impl AnalyzerConfig {
    pub fn new(base_url: String, api_key: String, workflow_id: String) -> Self {
        Self {
            base_url,
            api_key,
            workflow_id,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client for the workflow engine
pub struct HttpAnalyzerClient {
    http_client: reqwest::Client,
    config: AnalyzerConfig,
}

impl HttpAnalyzerClient {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        if config.api_key.trim().is_empty() {
            return Err(AnalyzerError::NotConfigured(
                "Analyzer API key is not set".to_string(),
            ));
        }
        if config.base_url.trim().is_empty() {
            return Err(AnalyzerError::NotConfigured(
                "Analyzer base URL is not set".to_string(),
            ));
        }
        if config.workflow_id.trim().is_empty() {
            return Err(AnalyzerError::NotConfigured(
                "Analyzer workflow id is not set".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalyzerError::Gateway(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn run_url(&self) -> String {
        format!("{}/workflows/run", self.config.base_url.trim_end_matches('/'))
    }

    /// Build the workflow-run payload
    ///
    /// Nested structures are serialized to JSON strings as the engine's
    /// input contract requires; the response payload is capped to keep the
    /// request within the engine's input limits.
    fn build_payload(
        &self,
        request: &AnalysisRequest,
        response_mode: &str,
    ) -> Result<Value, AnalyzerError> {
        let responses = serde_json::to_string(&request.responses)
            .map_err(|e| AnalyzerError::BadRequest(format!("Unserializable responses: {}", e)))?;
        let responses = truncate_chars(&responses, self.config.max_input_chars);

        let profile = serde_json::to_string(&request.profile)
            .map_err(|e| AnalyzerError::BadRequest(format!("Unserializable profile: {}", e)))?;
        let options = serde_json::to_string(&request.options)
            .map_err(|e| AnalyzerError::BadRequest(format!("Unserializable options: {}", e)))?;

        Ok(json!({
            "workflow_id": self.config.workflow_id,
            "inputs": {
                "user_id": request.user_id.to_string(),
                "session_id": request.session_id.to_string(),
                "responses": responses,
                "user_profile": profile,
                "analysis_type": request.analysis_type.as_str(),
                "options": options,
                "focus_areas": request.focus_areas.join(","),
                "response_count": request.responses.len().to_string(),
            },
            "response_mode": response_mode,
            "user": format!("user_{}", request.user_id),
        }))
    }

    async fn send(
        &self,
        payload: &Value,
    ) -> Result<reqwest::Response, AnalyzerError> {
        let response = self
            .http_client
            .post(self.run_url())
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_status_error(status.as_u16(), &body))
    }
}

#[async_trait]
impl AnalyzerApi for HttpAnalyzerClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzerOutput, AnalyzerError> {
        let payload = self.build_payload(request, "blocking")?;

        tracing::debug!(
            session_id = %request.session_id,
            analysis_type = request.analysis_type.as_str(),
            response_count = request.responses.len(),
            "Submitting blocking analysis run"
        );

        let response = self.send(&payload).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| AnalyzerError::Gateway(format!("Unreadable response body: {}", e)))?;

        parse_run_result(&body)
    }

    async fn analyze_with_progress(
        &self,
        request: &AnalysisRequest,
        on_progress: ProgressSink,
    ) -> Result<AnalyzerOutput, AnalyzerError> {
        let payload = self.build_payload(request, "streaming")?;

        tracing::debug!(
            session_id = %request.session_id,
            analysis_type = request.analysis_type.as_str(),
            "Submitting streaming analysis run"
        );

        let response = self.send(&payload).await?;

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut reader = StreamEventReader::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_transport_error)?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Consume complete lines; an incomplete tail stays in the buffer
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].to_string();
                buffer.drain(..=newline);

                if let Some(output) = reader.consume_line(&line, &on_progress)? {
                    return Ok(output);
                }
            }
        }

        Err(AnalyzerError::Gateway(
            "Stream ended without a final result".to_string(),
        ))
    }
}

/// Incremental reader over the engine's SSE-style event lines
struct StreamEventReader {
    workflow_run_id: Option<String>,
    current_progress: i64,
}

impl StreamEventReader {
    fn new() -> Self {
        Self {
            workflow_run_id: None,
            current_progress: 30,
        }
    }

    /// Consume one line; returns the final output when the workflow finishes
    fn consume_line(
        &mut self,
        line: &str,
        on_progress: &ProgressSink,
    ) -> Result<Option<AnalyzerOutput>, AnalyzerError> {
        let Some(data) = line.strip_prefix("data: ") else {
            return Ok(None);
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(None);
        }

        // Unparseable events are skipped, not fatal; the engine interleaves
        // housekeeping lines
        let event: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(len = data.len(), "Skipping unparseable stream event");
                return Ok(None);
            }
        };

        if let Some(run_id) = event.get("workflow_run_id").and_then(|v| v.as_str()) {
            self.workflow_run_id = Some(run_id.to_string());
        }

        match event.get("event").and_then(|v| v.as_str()) {
            Some("workflow_started") => {
                self.current_progress = self.current_progress.max(35);
                on_progress(AnalyzerProgress {
                    stage: "processing".to_string(),
                    progress: self.current_progress,
                    message: "Workflow started, processing your responses...".to_string(),
                });
                Ok(None)
            }
            Some("node_started") => {
                self.current_progress = (self.current_progress + 5).min(PROGRESS_CAP);
                let title = node_title(&event);
                on_progress(AnalyzerProgress {
                    stage: stage_for_progress(self.current_progress).to_string(),
                    progress: self.current_progress,
                    message: format!("Processing node: {}", title),
                });
                Ok(None)
            }
            Some("node_finished") => {
                self.current_progress = (self.current_progress + 10).min(PROGRESS_CAP);
                let title = node_title(&event);
                on_progress(AnalyzerProgress {
                    stage: stage_for_progress(self.current_progress).to_string(),
                    progress: self.current_progress,
                    message: format!("Completed: {}", title),
                });
                Ok(None)
            }
            Some("workflow_finished") => {
                let mut output = parse_run_result(&event)?;
                if output.workflow_run_id.is_none() {
                    output.workflow_run_id = self.workflow_run_id.clone();
                }
                Ok(Some(output))
            }
            Some("error") | Some("workflow_failed") => {
                let message = event
                    .pointer("/data/error")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown workflow error");
                Err(AnalyzerError::Gateway(format!("Workflow error: {}", message)))
            }
            _ => Ok(None),
        }
    }
}

fn node_title(event: &Value) -> &str {
    event
        .pointer("/data/title")
        .and_then(|v| v.as_str())
        .unwrap_or("Processing step")
}

fn stage_for_progress(progress: i64) -> &'static str {
    if progress < 45 {
        "processing"
    } else if progress < 65 {
        "analyzing"
    } else {
        "generating"
    }
}

/// Parse a workflow-run body (blocking response or finished stream event)
fn parse_run_result(body: &Value) -> Result<AnalyzerOutput, AnalyzerError> {
    let data = body
        .get("data")
        .ok_or_else(|| AnalyzerError::Gateway("Response missing data envelope".to_string()))?;

    if let Some("failed") = data.get("status").and_then(|v| v.as_str()) {
        let message = data
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("Workflow reported failure");
        return Err(AnalyzerError::Gateway(message.to_string()));
    }

    let outputs = data.get("outputs").cloned().unwrap_or(Value::Null);
    let text = extract_output_text(&outputs).ok_or_else(|| {
        AnalyzerError::Gateway("Workflow finished without a result output".to_string())
    })?;

    Ok(AnalyzerOutput {
        text,
        summary: outputs
            .get("summary")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        workflow_run_id: body
            .get("workflow_run_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        elapsed_time: data.get("elapsed_time").and_then(|v| v.as_f64()),
        total_tokens: data.get("total_tokens").and_then(|v| v.as_i64()),
    })
}

/// The engine's outputs carry the result under one of several keys
fn extract_output_text(outputs: &Value) -> Option<String> {
    for key in ["text", "output", "result"] {
        if let Some(text) = outputs.get(key).and_then(|v| v.as_str()) {
            if !text.trim().is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

fn map_transport_error(error: reqwest::Error) -> AnalyzerError {
    if error.is_timeout() {
        AnalyzerError::Timeout
    } else {
        AnalyzerError::Gateway(error.to_string())
    }
}

fn map_status_error(status: u16, body: &str) -> AnalyzerError {
    let detail = if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body.trim())
    };

    match status {
        400 => AnalyzerError::BadRequest(detail),
        401 | 403 | 404 => AnalyzerError::NotConfigured(detail),
        _ => AnalyzerError::Gateway(detail),
    }
}

/// Truncate to a character budget without splitting a code point
fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}
