use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{info, warn};
use reqwest::{multipart, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::session::{Identity, SessionStore};

use super::{
    error::server_message, password_problem, ApiError, EmergencyEvent, EmergencyReport,
    EmergencySubmitter, EventHistory, Registration,
};

const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Serialize)]
struct LoginRequest<'a> {
    user_id: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// HTTP client for the ADES backend. Every request carries the stored
/// bearer token when one exists.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|e| ApiError::Invalid(format!("invalid API base URL '{base_url}': {e}")))?;

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Invalid(format!("invalid API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Invalid("API base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = server_message(&body);
        warn!("request failed with {status}: {}", message.as_deref().unwrap_or(""));
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `POST /login`; stores the returned token on success.
    pub async fn login(&self, user_id: &str, password: &str) -> Result<Identity, ApiError> {
        let url = self.endpoint(&["login"])?;
        let response = self
            .send(self.http.post(url).json(&LoginRequest { user_id, password }))
            .await?;
        let LoginResponse { access_token } = Self::decode(response).await?;

        self.session
            .set_credentials(user_id, &access_token)
            .map_err(|e| ApiError::Invalid(format!("failed to store credentials: {e}")))?;
        info!("logged in as {user_id}");

        Ok(Identity {
            user_id: user_id.to_string(),
            token: access_token,
        })
    }

    /// `POST /register` as a multipart form. The password policy is checked
    /// before anything is sent.
    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        if let Some(problem) = password_problem(&registration.password) {
            return Err(ApiError::Invalid(problem.to_string()));
        }

        let url = self.endpoint(&["register"])?;
        let form = multipart::Form::new()
            .text("name", registration.name.clone())
            .text("user_id", registration.user_id.clone())
            .text("password", registration.password.clone());
        self.send(self.http.post(url).multipart(form)).await?;
        info!("registered user {}", registration.user_id);
        Ok(())
    }

    pub fn logout(&self) -> anyhow::Result<()> {
        self.session.logout()
    }
}

#[async_trait]
impl EmergencySubmitter for ApiClient {
    async fn submit(&self, report: &EmergencyReport) -> Result<(), ApiError> {
        let url = self.endpoint(&["emergency"])?;
        self.send(self.http.post(url).json(report)).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHistory for ApiClient {
    async fn list_events(&self, user_id: &str) -> Result<Vec<EmergencyEvent>, ApiError> {
        let url = self.endpoint(&["events", user_id])?;
        let response = self.send(self.http.get(url)).await?;
        Self::decode(response).await
    }
}
