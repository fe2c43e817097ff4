//! HTTP client for the hospital REST API.
//!
//! Every call attaches the bearer token from the injected [`SessionToken`]
//! and normalizes failures into a [`ClientError`] whose text is ready to show
//! in a notification.

pub mod dispatch;
pub mod wire;

use crate::cache::Listing;
use crate::config::Config;
use crate::error::{ClientError, ClientResult, DEFAULT_API_ERROR_MESSAGE};
use crate::models::{NewRecord, Patch, RecordId, Resource};
use crate::session::SessionToken;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::Value;
use std::time::Duration;

const QUEUE_DELETE_MESSAGE: &str = "Queue entries cannot be deleted";

/// Thin REST client. Cheap to clone; clones share the connection pool and token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    token: SessionToken,
}

impl ApiClient {
    pub fn new(config: &Config, token: SessionToken) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: Url::parse(&config.api_url).map_err(|e| ClientError::Config(e.to_string()))?,
            token,
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Config(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self.http.request(method, url);
        if let Some(token) = self.token.get() {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Sends a request and returns the JSON body (`Null` when the body is empty).
    async fn send(&self, method: Method, segments: &[&str], body: Option<Value>) -> ClientResult<Value> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        let mut request = self.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%method, %path, error = %err, "request failed without a response");
                return Err(ClientError::Network(err.to_string()));
            }
        };

        let status = response.status();
        tracing::debug!(%method, %path, status = status.as_u16(), "response received");
        let text = response.text().await?;

        if !status.is_success() {
            let message = wire::error_message(&text).unwrap_or_else(|| DEFAULT_API_ERROR_MESSAGE.to_string());
            tracing::warn!(%method, %path, status = status.as_u16(), %message, "request rejected");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// `POST /login`, returning the bearer token.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<String> {
        let body = serde_json::json!({ "username": username, "password": password });
        let response = self.send(Method::POST, &["login"], Some(body)).await?;
        wire::decode_token(response)
    }

    /// `GET /{resource}`.
    pub async fn list(&self, resource: Resource) -> ClientResult<Listing> {
        let body = self.send(Method::GET, &[resource.path()], None).await?;
        wire::decode_listing(resource, body)
    }

    /// `POST /{resource}`.
    pub async fn create(&self, record: &NewRecord) -> ClientResult<Value> {
        let body = record.to_json()?;
        self.send(Method::POST, &[record.resource().path()], Some(body)).await
    }

    /// `PATCH /{resource}/{id}` with only the fields being changed.
    pub async fn update(&self, id: &RecordId, patch: &Patch) -> ClientResult<Value> {
        let segments = [patch.resource().path(), id.as_str()];
        self.send(Method::PATCH, &segments, Some(patch.to_json()?)).await
    }

    /// `DELETE /{resource}/{id}`.
    pub async fn remove(&self, resource: Resource, id: &RecordId) -> ClientResult<()> {
        if resource == Resource::Queue {
            return Err(ClientError::Unsupported(QUEUE_DELETE_MESSAGE));
        }
        let segments = [resource.path(), id.as_str()];
        self.send(Method::DELETE, &segments, None).await.map(|_| ())
    }
}
