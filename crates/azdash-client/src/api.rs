//! Typed calls to the azdash data endpoints.

use std::sync::Arc;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::Pipeline;

/// A row from `GET {apiRoot}/v1/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

/// A row from `GET {apiRoot}/v1/audit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// As sent by the backend; not reparsed.
    pub timestamp: String,
    pub method: String,
    pub path: String,
    pub user: String,
    pub status: u16,
}

/// Body of `GET {healthRoot}/actuator/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

/// `api_root` with one trailing `/api` segment removed.
///
/// The actuator lives beside the API, not under it.
pub fn health_root(api_root: &str) -> &str {
    let trimmed = api_root.trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed)
}

/// Client for the data endpoints; every call goes through the pipeline.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pipeline: Arc<Pipeline>,
    api_root: String,
}

impl ApiClient {
    pub fn new(pipeline: Pipeline, api_root: &str) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            api_root: api_root.trim_end_matches('/').to_string(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        self.get_json(&format!("{}/v1/users", self.api_root)).await
    }

    pub async fn audit(&self) -> Result<Vec<AuditEvent>> {
        self.get_json(&format!("{}/v1/audit", self.api_root)).await
    }

    pub async fn health(&self) -> Result<Health> {
        self.get_json(&format!("{}/actuator/health", health_root(&self.api_root)))
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        let mut request = Request::new(Method::GET, parsed);
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));

        log::debug!("GET {url}");
        let response = self.pipeline.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}
