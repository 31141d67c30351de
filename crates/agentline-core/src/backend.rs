//! External collaborators: session CRUD, file transfer, and the chat stream.

use crate::{AgentlineError, Result};
use agentline_types::{
    ChatRequest, ErrorBody, MessageRecord, MessagesResponse, NewSessionResponse,
    SessionIdsResponse, UploadResponse,
};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::{Response, StatusCode, header};
use std::time::Duration;
use tracing::debug;

/// Raw response body of a chat stream, in receipt order.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Everything the controller needs from the outside world.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Create a session and return its id.
    async fn create_session(&self) -> Result<String>;

    /// Ids of all stored sessions.
    async fn list_sessions(&self) -> Result<Vec<String>>;

    /// Stored history of a session, oldest first.
    async fn fetch_messages(&self, session_id: &str) -> Result<Vec<MessageRecord>>;

    /// Delete a session. Unknown ids may fail with a not-found error.
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Upload a file and return the reference the agent can use for it.
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String>;

    /// Download a file by the reference the agent produced.
    async fn download_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Open the chat stream for one user turn.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream>;
}

/// Configuration for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    /// Applies to establishing connections only; streams are never timed out.
    pub connect_timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// [`SessionBackend`] over the agent server's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turn a non-success answer into `AgentlineError::Backend`.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);

    Err(AgentlineError::Backend {
        status: status.as_u16(),
        message,
    })
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

#[async_trait]
impl SessionBackend for HttpBackend {
    async fn create_session(&self) -> Result<String> {
        let response = self.client.post(self.url("/new_chat")).send().await?;
        let body: NewSessionResponse = check_status(response).await?.json().await?;
        debug!(target: "agentline::backend", "Created session {}", body.session_id);
        Ok(body.session_id)
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let response = self.client.get(self.url("/session_id")).send().await?;
        let body: SessionIdsResponse = check_status(response).await?.json().await?;
        Ok(body.session_ids)
    }

    async fn fetch_messages(&self, session_id: &str) -> Result<Vec<MessageRecord>> {
        let response = self
            .client
            .get(self.url("/messages_by_session_id"))
            .query(&[("session_id", session_id)])
            .send()
            .await?;
        let body: MessagesResponse = check_status(response).await?.json().await?;
        debug!(
            target: "agentline::backend",
            "Fetched {} messages for session {}",
            body.message.len(),
            session_id
        );
        Ok(body.message)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url("/delete_by_session_id"))
            .query(&[("session_id", session_id)])
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        // The agent server only ingests CSV files.
        if !file_name.to_lowercase().ends_with(".csv") {
            return Err(AgentlineError::InvalidUpload(format!(
                "{} is not a CSV file",
                file_name
            )));
        }

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = check_status(response).await?.json().await?;
        Ok(body.path)
    }

    async fn download_file(&self, path: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.url("/download"))
            .query(&[("path", path)])
            .send()
            .await?;
        let response = check_status(response).await?;

        // A missing file is reported as a JSON error body with a 200 status.
        let json = is_json(&response);
        let bytes = response.bytes().await?;
        if json {
            if let Ok(body) = serde_json::from_slice::<ErrorBody>(&bytes) {
                return Err(AgentlineError::Backend {
                    status: StatusCode::NOT_FOUND.as_u16(),
                    message: body.error,
                });
            }
        }
        Ok(bytes.to_vec())
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        let response = self
            .client
            .post(self.url("/chat"))
            .header(header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        debug!(
            target: "agentline::backend",
            "Stream opened for session {}",
            request.session_id
        );

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(AgentlineError::from))
            .boxed())
    }
}
