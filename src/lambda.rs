//! AWS Lambda Runtime API loop
//!
//! Polls `invocation/next`, hands each event to the orchestrator and posts the
//! lifecycle response back. A `SUCCESS` response goes to
//! `invocation/{id}/response`; a `FAILED` one, or an event that does not
//! parse, goes to `invocation/{id}/error` so the invoking framework sees the
//! failure and its reason.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use kbprov_orchestrator::{LifecycleEvent, LifecycleResponse, Orchestrator};

/// Host and port of the runtime API, set by the Lambda environment
pub const RUNTIME_API_ENV_VAR: &str = "AWS_LAMBDA_RUNTIME_API";

const RUNTIME_API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";

/// One event handed out by `invocation/next`
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    pub body: Vec<u8>,
}

/// Error document accepted by the `/error` endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeErrorBody {
    pub error_type: String,
    pub error_message: String,
}

/// Client for the runtime API
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    http: reqwest::Client,
    base_url: String,
}

impl RuntimeClient {
    /// `api_host` is the `host:port` from `AWS_LAMBDA_RUNTIME_API`
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(api_host: &str) -> Result<Self> {
        // No request timeout: `invocation/next` blocks until an event arrives.
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build the runtime API HTTP client")?;
        Ok(Self {
            http,
            base_url: format!("http://{api_host}/{RUNTIME_API_VERSION}/runtime"),
        })
    }

    /// # Errors
    ///
    /// Fails outside Lambda, where `AWS_LAMBDA_RUNTIME_API` is unset.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var(RUNTIME_API_ENV_VAR)
            .with_context(|| format!("{RUNTIME_API_ENV_VAR} is not set; not running in Lambda"))?;
        Self::new(&host)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Block until the next event arrives
    ///
    /// # Errors
    ///
    /// Fails on a transport error, a non-2xx status or a missing request id.
    pub async fn next_invocation(&self) -> Result<Invocation> {
        let response = self
            .http
            .get(self.url("invocation/next"))
            .send()
            .await
            .context("Failed to fetch the next invocation")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Runtime API returned {status} for invocation/next");
        }

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .with_context(|| format!("invocation/next response has no {REQUEST_ID_HEADER}"))?;

        let body = response
            .bytes()
            .await
            .context("Failed to read the invocation body")?
            .to_vec();

        Ok(Invocation { request_id, body })
    }

    /// # Errors
    ///
    /// Fails on a transport error or a non-2xx status.
    pub async fn respond(&self, request_id: &str, response: &LifecycleResponse) -> Result<()> {
        let path = format!("invocation/{request_id}/response");
        self.post(&path, response).await
    }

    /// # Errors
    ///
    /// Fails on a transport error or a non-2xx status.
    pub async fn report_error(
        &self,
        request_id: &str,
        error_type: &str,
        message: &str,
    ) -> Result<()> {
        let path = format!("invocation/{request_id}/error");
        self.post(&path, &error_body(error_type, message)).await
    }

    /// Report a failure that happened before the first invocation
    ///
    /// # Errors
    ///
    /// Fails on a transport error or a non-2xx status.
    pub async fn report_init_error(&self, error_type: &str, message: &str) -> Result<()> {
        self.post("init/error", &error_body(error_type, message)).await
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to post {path}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("Runtime API returned {status} for {path}");
        }
        Ok(())
    }
}

#[must_use]
pub fn error_body(error_type: &str, message: &str) -> RuntimeErrorBody {
    RuntimeErrorBody {
        error_type: error_type.to_string(),
        error_message: message.to_string(),
    }
}

/// Process one invocation and post its result
///
/// # Errors
///
/// Fails only when the result cannot be delivered to the runtime API.
pub async fn handle_invocation(
    orchestrator: &Orchestrator,
    runtime: &RuntimeClient,
    invocation: Invocation,
) -> Result<()> {
    let request_id = invocation.request_id;
    debug!(%request_id, bytes = invocation.body.len(), "Invocation received");

    let event: LifecycleEvent = match serde_json::from_slice(&invocation.body) {
        Ok(event) => event,
        Err(err) => {
            warn!(%request_id, error = %err, "Invocation is not a lifecycle event");
            return runtime
                .report_error(&request_id, "InvalidEvent", &err.to_string())
                .await;
        }
    };

    let response = orchestrator.handle(&event).await;
    if response.is_success() {
        runtime.respond(&request_id, &response).await
    } else {
        runtime
            .report_error(&request_id, "ProvisioningFailed", &response.reason)
            .await
    }
}

/// Serve invocations until the runtime API becomes unreachable
///
/// # Errors
///
/// Returns the first delivery failure.
pub async fn serve(orchestrator: &Orchestrator, runtime: &RuntimeClient) -> Result<()> {
    info!("Lambda runtime loop started");
    loop {
        let invocation = runtime.next_invocation().await?;
        if let Err(err) = handle_invocation(orchestrator, runtime, invocation).await {
            error!(error = %err, "Failed to deliver invocation result");
            return Err(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the raw request head
    async fn one_shot_server(response: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&received).into_owned()
        });
        (host, handle)
    }

    #[test]
    fn urls_follow_runtime_api_layout() {
        let client = RuntimeClient::new("127.0.0.1:9001").unwrap();
        assert_eq!(
            client.url("invocation/next"),
            "http://127.0.0.1:9001/2018-06-01/runtime/invocation/next"
        );
    }

    #[test]
    fn error_body_uses_runtime_field_names() {
        let body = serde_json::to_value(error_body("ProvisioningFailed", "boom")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"errorType": "ProvisioningFailed", "errorMessage": "boom"})
        );
    }

    #[tokio::test]
    async fn next_invocation_reads_request_id_and_body() {
        let payload = r#"{"RequestType":"Update"}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\n{REQUEST_ID_HEADER}: req-42\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
            payload.len()
        );
        let (host, server) = one_shot_server(response).await;

        let client = RuntimeClient::new(&host).unwrap();
        let invocation = client.next_invocation().await.unwrap();
        assert_eq!(invocation.request_id, "req-42");
        assert_eq!(invocation.body, payload.as_bytes());

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /2018-06-01/runtime/invocation/next"));
    }

    #[tokio::test]
    async fn missing_request_id_is_an_error() {
        let response =
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}".to_string();
        let (host, _server) = one_shot_server(response).await;

        let client = RuntimeClient::new(&host).unwrap();
        let err = client.next_invocation().await.unwrap_err();
        assert!(err.to_string().contains(REQUEST_ID_HEADER));
    }
}
