//! Common utilities for the Gitea API client
//!
//! Provides the authenticated HTTP wrapper shared by all repository operations.

use crate::error::GiteaError;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

/// HTTP client wrapper with authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from an API path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("token {}", self.token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GiteaError> {
        request
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(GiteaError::Http)
    }

    async fn check(response: Response, context: &str) -> Result<Response, GiteaError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GiteaError::from_status(status.as_u16(), context, &body))
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, GiteaError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self.send(self.client.get(&url)).await?;
        let response = Self::check(response, &format!("GET {path}")).await?;
        response.json().await.map_err(GiteaError::Http)
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, GiteaError> {
        let url = self.build_url(path);
        debug!("POST {} with body: {}", url, body);

        let response = self.send(self.client.post(&url).json(body)).await?;
        let response = Self::check(response, &format!("POST {path}")).await?;
        response.json().await.map_err(GiteaError::Http)
    }

    /// Make a POST request without a body, discarding the response
    pub async fn post_empty(&self, path: &str) -> Result<(), GiteaError> {
        let url = self.build_url(path);
        debug!("POST {}", url);

        let response = self.send(self.client.post(&url)).await?;
        Self::check(response, &format!("POST {path}")).await?;
        Ok(())
    }

    /// Make a PATCH request with a JSON body
    pub async fn patch<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, GiteaError> {
        let url = self.build_url(path);
        debug!("PATCH {} with body: {}", url, body);

        let response = self.send(self.client.patch(&url).json(body)).await?;
        let response = Self::check(response, &format!("PATCH {path}")).await?;
        response.json().await.map_err(GiteaError::Http)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), GiteaError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self.send(self.client.delete(&url)).await?;
        Self::check(response, &format!("DELETE {path}")).await?;
        Ok(())
    }
}

/// Build `/api/v1/repos/{owner}/{name}` with both segments percent-encoded
pub fn repo_path(owner: &str, name: &str) -> String {
    format!(
        "/api/v1/repos/{}/{}",
        urlencoding::encode(owner),
        urlencoding::encode(name)
    )
}
