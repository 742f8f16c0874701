//! Web fetch tool: GET a URL and return its body as text.
//!
//! Bodies are capped at a byte limit and read chunk by chunk, so a huge
//! response never lands in memory in full.

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{ToolExecutor, ToolOutput};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_BYTES: usize = 100_000;

pub struct WebFetchTool {
    client: reqwest::Client,
    max_bytes: usize,
}

impl WebFetchTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("clawloop/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

impl Default for WebFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Fetch a URL with HTTP GET and return the response body as text. \
         Long bodies are truncated."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "http:// or https:// URL to fetch"
                },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Request timeout in seconds (default 30)",
                    "default": DEFAULT_TIMEOUT_SECS
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidArguments(
                "URL must start with http:// or https://".into(),
            ));
        }

        let timeout_secs = arguments["timeout_secs"]
            .as_u64()
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, MAX_TIMEOUT_SECS);

        debug!(url, timeout_secs, "Fetching URL");
        let send = self
            .client
            .get(url)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await;

        let mut response = match send {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(ToolError::Timeout {
                    tool_name: "web_fetch".into(),
                    timeout_secs,
                });
            }
            Err(e) => {
                warn!(url, error = %e, "Fetch failed");
                return Ok(ToolOutput::failed(format!("Failed to fetch {url}: {e}")));
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let mut body = Vec::new();
        let mut truncated = false;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) if e.is_timeout() => {
                    return Err(ToolError::Timeout {
                        tool_name: "web_fetch".into(),
                        timeout_secs,
                    });
                }
                Err(e) => return Ok(ToolOutput::failed(format!("Failed to read body of {url}: {e}"))),
            };
            let room = self.max_bytes - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }
        let text = String::from_utf8_lossy(&body).into_owned();

        let summary = format!(
            "GET {url} -> {}{} ({} bytes{})",
            status.as_u16(),
            status.canonical_reason().map(|r| format!(" {r}")).unwrap_or_default(),
            body.len(),
            if truncated { ", truncated" } else { "" }
        );
        let payload = json!({
            "url": url,
            "status": status.as_u16(),
            "content_type": content_type,
            "truncated": truncated,
            "body": text,
        });

        let output = if status.is_success() {
            ToolOutput::ok(summary)
        } else {
            ToolOutput::failed(summary)
        };
        Ok(output.with_payload(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on localhost and return its URL.
    async fn serve_once(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/page")
    }

    #[test]
    fn tool_definition() {
        let tool = WebFetchTool::new();
        assert_eq!(tool.name(), "web_fetch");
        assert_eq!(tool.parameters_schema()["required"], json!(["url"]));
    }

    #[tokio::test]
    async fn fetches_body_as_text() {
        let url = serve_once("200 OK", "hello from the server".into()).await;
        let output = WebFetchTool::new().execute(json!({ "url": url })).await.unwrap();

        assert!(output.success);
        assert!(output.summary.contains("200"));
        let payload = output.payload.unwrap();
        assert_eq!(payload["body"], "hello from the server");
        assert_eq!(payload["content_type"], "text/plain");
        assert_eq!(payload["truncated"], false);
    }

    #[tokio::test]
    async fn long_body_is_truncated_at_the_cap() {
        let url = serve_once("200 OK", "x".repeat(500)).await;
        let tool = WebFetchTool::new().with_max_bytes(100);
        let output = tool.execute(json!({ "url": url })).await.unwrap();

        assert!(output.success);
        assert!(output.summary.contains("truncated"));
        let payload = output.payload.unwrap();
        assert_eq!(payload["body"].as_str().unwrap().len(), 100);
        assert_eq!(payload["truncated"], true);
    }

    #[tokio::test]
    async fn error_status_is_a_failed_output() {
        let url = serve_once("404 Not Found", "missing".into()).await;
        let output = WebFetchTool::new().execute(json!({ "url": url })).await.unwrap();

        assert!(!output.success);
        assert!(output.summary.contains("404"));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_failed_output() {
        // Bind then drop so nothing listens on the port.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let output = WebFetchTool::new()
            .execute(json!({ "url": format!("http://127.0.0.1:{port}/") }))
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.summary.starts_with("Failed to fetch"));
    }

    #[tokio::test]
    async fn rejects_bad_arguments() {
        let tool = WebFetchTool::new();
        assert!(tool.execute(json!({})).await.is_err());
        assert!(tool.execute(json!({ "url": "ftp://files.example.com" })).await.is_err());
    }
}
