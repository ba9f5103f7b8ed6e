//! REST client for the tool-provider manager backend.
//!
//! The backend owns every tool-provider subprocess and is the sole source of
//! truth for the live registry; this client is a thin, unauthenticated wrapper
//! over its five endpoints. Network failures are surfaced as plain strings so
//! callers can drop them straight into the event timeline.

use async_trait::async_trait;

use crate::api::{ChatRequest, ChatResponse, ServerSpec, ToolDescriptor};

/// Normalize a base URL by removing trailing slashes, so endpoint joins never
/// produce double slashes.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// The backend surface the client consumes. The trait exists so the
/// reconciler, session manager, and controller loop can be exercised against
/// a scripted backend in tests.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /servers`: the live registry of currently running server names.
    async fn list_servers(&self) -> Result<Vec<String>, String>;

    /// `POST /servers`: register and launch a tool-provider.
    async fn add_server(&self, spec: &ServerSpec) -> Result<(), String>;

    /// `DELETE /servers/{name}`: stop and deregister a tool-provider.
    async fn delete_server(&self, name: &str) -> Result<(), String>;

    /// `GET /tools?server={name}`; `None` asks for the aggregate view.
    async fn list_tools(&self, server: Option<&str>) -> Result<Vec<ToolDescriptor>, String>;

    /// `POST /chat`: one assistant round trip, threading the session token.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, String>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        construct_api_url(&self.base_url, endpoint)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, String> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(format!("Request failed with status {status}: {error_text}"))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_servers(&self) -> Result<Vec<String>, String> {
        let response = self
            .client
            .get(self.url("servers"))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        check_status(response)
            .await?
            .json::<Vec<String>>()
            .await
            .map_err(|e| e.to_string())
    }

    async fn add_server(&self, spec: &ServerSpec) -> Result<(), String> {
        let response = self
            .client
            .post(self.url("servers"))
            .json(spec)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        check_status(response).await?;
        Ok(())
    }

    async fn delete_server(&self, name: &str) -> Result<(), String> {
        let response = self
            .client
            .delete(self.url(&format!("servers/{name}")))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        check_status(response).await?;
        Ok(())
    }

    async fn list_tools(&self, server: Option<&str>) -> Result<Vec<ToolDescriptor>, String> {
        let mut request = self.client.get(self.url("tools"));
        if let Some(name) = server {
            request = request.query(&[("server", name)]);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        check_status(response)
            .await?
            .json::<Vec<ToolDescriptor>>()
            .await
            .map_err(|e| e.to_string())
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, String> {
        let response = self
            .client
            .post(self.url("chat"))
            .json(request)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        check_status(response)
            .await?
            .json::<ChatResponse>()
            .await
            .map_err(|e| e.to_string())
    }
}
