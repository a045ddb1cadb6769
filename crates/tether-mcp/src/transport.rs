//! Transports for talking to an MCP server.
//!
//! Local servers are spawned as child processes and spoken to over stdio with
//! Content-Length framing:
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! {"jsonrpc": "2.0", ...}
//! ```
//!
//! Remote servers accept the same JSON-RPC bodies as HTTP POST requests.

use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use serde_json::Value;

use crate::error::{Result, ServiceError};

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Endpoint URL of the MCP server.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Number of retries for failed requests.
    pub retries: u32,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: Duration::from_secs(30),
            retries: 3,
            headers: Vec::new(),
        }
    }
}

impl HttpConfig {
    /// Create a config pointing at the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of retries.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// A spawned child process with framed stdin/stdout.
pub struct StdioPipe {
    child: Child,
    writer: BufWriter<ChildStdin>,
    reader: BufReader<ChildStdout>,
}

impl StdioPipe {
    /// Spawn a server process with piped stdio. Stderr passes through for
    /// debugging.
    pub fn spawn(program: &str, args: &[String], env: &[(String, String)]) -> Result<Self> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ServiceError::spawn(format!("failed to spawn '{}': {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ServiceError::spawn("failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ServiceError::spawn("failed to capture stdout"))?;

        Ok(Self {
            child,
            writer: BufWriter::new(stdin),
            reader: BufReader::new(stdout),
        })
    }

    /// Write one framed message.
    fn write_frame(&mut self, message: &Value) -> Result<()> {
        let body = serde_json::to_string(message)?;
        write!(self.writer, "Content-Length: {}\r\n\r\n{}", body.len(), body)?;
        self.writer.flush()?;
        tracing::trace!(content_length = body.len(), json = %body, "sent framed message");
        Ok(())
    }

    /// Read one framed message. Blocks until a full frame arrives.
    fn read_frame(&mut self) -> Result<Value> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(ServiceError::Closed);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some(rest) = trimmed.strip_prefix("Content-Length:") {
                content_length = Some(rest.trim().parse().map_err(|e| {
                    ServiceError::protocol(format!("invalid Content-Length: {}", e))
                })?);
            }
        }

        let content_length =
            content_length.ok_or_else(|| ServiceError::protocol("missing Content-Length header"))?;

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body)?;
        let text = String::from_utf8(body)
            .map_err(|e| ServiceError::protocol(format!("invalid UTF-8 in message: {}", e)))?;
        tracing::trace!(content_length, json = %text, "received framed message");
        Ok(serde_json::from_str(&text)?)
    }

    /// Check whether the child process is still running.
    fn alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Kill the child process and reap it.
    fn close(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// An HTTP endpoint with a pooled blocking client.
pub struct HttpEndpoint {
    client: reqwest::blocking::Client,
    config: HttpConfig,
}

impl HttpEndpoint {
    /// Validate the URL and build the pooled client.
    pub fn build(config: HttpConfig) -> Result<Self> {
        url::Url::parse(&config.url)
            .map_err(|e| ServiceError::transport(format!("invalid URL '{}': {}", config.url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(5)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn request(&self, message: &Value) -> reqwest::blocking::RequestBuilder {
        let mut req = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .body(message.to_string());
        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }
        req
    }

    /// POST one JSON-RPC body and return the parsed response body, retrying
    /// transport-level failures with a short backoff.
    fn roundtrip(&self, message: &Value) -> Result<Value> {
        let mut remaining = self.config.retries;
        loop {
            match self.request(message).send() {
                Ok(resp) => {
                    if !resp.status().is_success() {
                        let status = resp.status();
                        let body = resp.text().unwrap_or_default();
                        return Err(ServiceError::transport(format!(
                            "HTTP error {}: {}",
                            status, body
                        )));
                    }
                    let text = resp.text().map_err(|e| {
                        ServiceError::transport(format!("failed to read response body: {}", e))
                    })?;
                    return Ok(serde_json::from_str(&text)?);
                }
                Err(e) => {
                    if remaining == 0 {
                        return Err(ServiceError::transport(format!(
                            "HTTP request failed: {}",
                            e
                        )));
                    }
                    remaining -= 1;
                    tracing::warn!(
                        error = %e,
                        retries_remaining = remaining,
                        "HTTP request failed, retrying"
                    );
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }

    /// POST a notification body, ignoring whatever comes back.
    fn fire(&self, message: &Value) {
        let _ = self.request(message).send();
    }
}

/// Transport for one MCP server connection.
pub enum Transport {
    /// Child process spoken to over framed stdio.
    Stdio(StdioPipe),
    /// Remote server spoken to over HTTP POST.
    Http(HttpEndpoint),
}

impl Transport {
    /// Spawn a stdio transport.
    pub fn spawn_stdio(program: &str, args: &[String], env: &[(String, String)]) -> Result<Self> {
        Ok(Self::Stdio(StdioPipe::spawn(program, args, env)?))
    }

    /// Build an HTTP transport.
    pub fn connect_http(config: HttpConfig) -> Result<Self> {
        Ok(Self::Http(HttpEndpoint::build(config)?))
    }

    /// Send a request body. For HTTP this is a full round-trip and the
    /// response body is returned; for stdio the frame is written and the
    /// response must be pulled with [`next_message`](Self::next_message).
    pub fn post(&mut self, message: &Value) -> Result<Option<Value>> {
        match self {
            Self::Stdio(pipe) => {
                pipe.write_frame(message)?;
                Ok(None)
            }
            Self::Http(endpoint) => endpoint.roundtrip(message).map(Some),
        }
    }

    /// Send a notification body; no response is expected on either transport.
    pub fn post_oneway(&mut self, message: &Value) -> Result<()> {
        match self {
            Self::Stdio(pipe) => pipe.write_frame(message),
            Self::Http(endpoint) => {
                endpoint.fire(message);
                Ok(())
            }
        }
    }

    /// Read the next incoming message (stdio only).
    pub fn next_message(&mut self) -> Result<Value> {
        match self {
            Self::Stdio(pipe) => pipe.read_frame(),
            Self::Http(_) => Err(ServiceError::protocol(
                "next_message is not supported on the HTTP transport",
            )),
        }
    }

    /// Check whether the transport can still carry messages.
    pub fn alive(&mut self) -> bool {
        match self {
            Self::Stdio(pipe) => pipe.alive(),
            // HTTP is stateless; liveness is only known per request.
            Self::Http(_) => true,
        }
    }

    /// Tear the transport down.
    pub fn close(&mut self) {
        if let Self::Stdio(pipe) = self {
            pipe.close();
        }
    }

    /// Check if this is a stdio transport.
    pub fn is_stdio(&self) -> bool {
        matches!(self, Self::Stdio(_))
    }

    /// Check if this is an HTTP transport.
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_nonexistent_program() {
        let result = Transport::spawn_stdio("tether-no-such-server-417", &[], &[]);
        assert!(matches!(result, Err(ServiceError::Spawn(_))));
    }

    #[test]
    fn test_spawn_and_close() {
        // `cat` is enough to verify spawn/liveness/teardown on unix.
        if !cfg!(unix) {
            return;
        }
        let mut transport = Transport::spawn_stdio("cat", &[], &[]).unwrap();
        assert!(transport.is_stdio());
        assert!(transport.alive());
        transport.close();
        assert!(!transport.alive());
    }

    #[test]
    fn test_http_config_builder() {
        let config = HttpConfig::new("http://localhost:9090/mcp")
            .with_timeout(Duration::from_secs(5))
            .with_retries(1)
            .with_header("Authorization", "Bearer abc");
        assert_eq!(config.url, "http://localhost:9090/mcp");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retries, 1);
        assert_eq!(config.headers.len(), 1);
    }

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retries, 3);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_http_transport_creation() {
        let transport =
            Transport::connect_http(HttpConfig::new("http://localhost:9090/mcp")).unwrap();
        assert!(transport.is_http());
        assert!(!transport.is_stdio());
    }

    #[test]
    fn test_http_transport_invalid_url() {
        let result = Transport::connect_http(HttpConfig::new("not a url"));
        match result {
            Err(ServiceError::Transport(msg)) => assert!(msg.contains("invalid URL")),
            other => panic!("expected transport error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_http_transport_always_alive() {
        let mut transport =
            Transport::connect_http(HttpConfig::new("http://localhost:9090/mcp")).unwrap();
        assert!(transport.alive());
        transport.close();
        assert!(transport.alive());
    }

    #[test]
    fn test_next_message_rejected_on_http() {
        let mut transport =
            Transport::connect_http(HttpConfig::new("http://localhost:9090/mcp")).unwrap();
        assert!(matches!(
            transport.next_message(),
            Err(ServiceError::Protocol(_))
        ));
    }
}
