use std::env;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::repository::{AuthRepository, CourseRepository, ProgressRepository, Storage, StorageError};
use crate::token::TokenStore;

mod auth_repo;
mod course_repo;
mod progress_repo;
mod wire;

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Read `LEARN_API_BASE_URL` and `LEARN_API_TIMEOUT_SECS`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("LEARN_API_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let timeout = env::var("LEARN_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);
        Self { base_url, timeout }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HttpInitError {
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// REST backend for course structure, lesson progress and login.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
    tokens: Arc<dyn TokenStore>,
}

impl HttpBackend {
    /// Build a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `HttpInitError` if the HTTP client cannot be constructed.
    pub fn new(config: BackendConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, HttpInitError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        let url = self.config.url(path);
        debug!(%url, "GET");
        self.authorize(self.client.get(url))
    }

    pub(crate) fn put(&self, path: &str) -> RequestBuilder {
        let url = self.config.url(path);
        debug!(%url, "PUT");
        self.authorize(self.client.put(url))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        let url = self.config.url(path);
        debug!(%url, "POST");
        self.authorize(self.client.post(url))
    }
}

pub(crate) async fn send(request: RequestBuilder) -> Result<Response, StorageError> {
    let response = request.send().await.map_err(connection)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(status_error(status))
}

pub(crate) fn status_error(status: StatusCode) -> StorageError {
    match status {
        StatusCode::NOT_FOUND => StorageError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::Unauthorized,
        other => StorageError::HttpStatus(other.as_u16()),
    }
}

pub(crate) fn connection(e: reqwest::Error) -> StorageError {
    if e.is_decode() {
        StorageError::Serialization(e.to_string())
    } else {
        StorageError::Connection(e.to_string())
    }
}

impl Storage {
    /// Build a `Storage` backed by the REST API.
    ///
    /// # Errors
    ///
    /// Returns `HttpInitError` if the HTTP client cannot be constructed.
    pub fn http(config: BackendConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, HttpInitError> {
        let backend = HttpBackend::new(config, tokens)?;
        let courses: Arc<dyn CourseRepository> = Arc::new(backend.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(backend.clone());
        let auth: Arc<dyn AuthRepository> = Arc::new(backend);
        Ok(Self {
            courses,
            progress,
            auth,
        })
    }
}
