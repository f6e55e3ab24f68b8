//! ApiClient: the console's single entry point to the support backend.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::types::{
    Conversation, Created, DashboardMetrics, LoginRequest, LoginResponse, Message, NewUser,
    Profile, TimeseriesPoint, UserPatch, UserRecord,
};
use crate::error::ApiError;
use crate::storage::ApiConfig;

/// Client for the support REST backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http_client: Client,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            http_client: Client::new(),
            token: None,
        })
    }

    /// Build from config, honouring `SETRA_API_URL` and the request timeout.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let http_client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            base_url: Url::parse(&config.effective_base_url())?,
            http_client,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Auth ─────────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_expect(Method::POST, "/auth/login", Some(&body)).await
    }

    /// Profile for an explicit token, used while restoring a session.
    pub async fn me_with(&self, token: &str) -> Result<Profile, ApiError> {
        let req = self.request(Method::GET, "/users/me")?.bearer_auth(token);
        let body = self.execute("/users/me", req).await?;
        decode_required("/users/me", body)
    }

    // ── Conversations ────────────────────────────────────────────────

    pub async fn conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.get_or_default("/conversations").await
    }

    pub async fn conversation(&self, id: &str) -> Result<Conversation, ApiError> {
        self.send_expect::<(), _>(Method::GET, &format!("/conversations/{id}"), None)
            .await
    }

    pub async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        self.get_or_default(&format!("/conversations/{conversation_id}/messages"))
            .await
    }

    // ── Dashboard ────────────────────────────────────────────────────

    pub async fn dashboard_metrics(&self) -> Result<DashboardMetrics, ApiError> {
        self.get_or_default("/dashboard/metrics").await
    }

    pub async fn dashboard_timeseries(
        &self,
        period: &str,
    ) -> Result<Vec<TimeseriesPoint>, ApiError> {
        let mut url = self.endpoint_url("/dashboard/timeseries")?;
        url.query_pairs_mut().append_pair("period", period);
        let req = self.authorized(self.http_client.get(url));
        let body = self.execute("/dashboard/timeseries", req).await?;
        decode_or_default("/dashboard/timeseries", body)
    }

    pub async fn dashboard_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.get_or_default("/dashboard/conversations").await
    }

    // ── Users ────────────────────────────────────────────────────────

    pub async fn users(&self) -> Result<Vec<UserRecord>, ApiError> {
        self.get_or_default("/users").await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<Created, ApiError> {
        self.send_expect(Method::POST, "/users", Some(user)).await
    }

    pub async fn update_user(&self, id: &str, patch: &UserPatch) -> Result<(), ApiError> {
        self.send(Method::PATCH, &format!("/users/{id}"), Some(patch))
            .await
            .map(|_| ())
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, &format!("/users/{id}"), None)
            .await
            .map(|_| ())
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Endpoints are appended to the base URL, keeping any path prefix it has.
    fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{endpoint}"))?)
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint_url(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let mut req = self.authorized(self.request(method, endpoint)?);
        if let Some(body) = body {
            req = req.json(body);
        }
        self.execute(endpoint, req).await
    }

    async fn send_expect<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let value = self.send(method, endpoint, body).await?;
        decode_required(endpoint, value)
    }

    async fn get_or_default<T: DeserializeOwned + Default>(
        &self,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        let value = self.send::<()>(Method::GET, endpoint, None).await?;
        decode_or_default(endpoint, value)
    }

    /// Run the request and normalise the body.
    ///
    /// Non-2xx becomes `ApiError::Status` with the body's `message` when
    /// present. 204, non-JSON and blank bodies come back as `None`.
    async fn execute(
        &self,
        endpoint: &str,
        req: RequestBuilder,
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        debug!(endpoint, status = status.as_u16(), "api response");

        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Erro {}", status.as_u16()));
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        if !is_json {
            return Ok(None);
        }

        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(endpoint, error = %e, "response claimed JSON but did not parse");
                Ok(None)
            }
        }
    }
}

fn decode_required<T: DeserializeOwned>(
    endpoint: &str,
    value: Option<serde_json::Value>,
) -> Result<T, ApiError> {
    let value = value.ok_or_else(|| ApiError::EmptyResponse(endpoint.to_string()))?;
    serde_json::from_value(value).map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn decode_or_default<T: DeserializeOwned + Default>(
    endpoint: &str,
    value: Option<serde_json::Value>,
) -> Result<T, ApiError> {
    match value {
        None => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        }),
    }
}
