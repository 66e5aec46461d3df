//! HTTP client for the admin backend's question endpoints.
//!
//! `GET /questions` lists everything, `POST /questions` creates,
//! `PUT /questions/{id}` applies a partial update and
//! `DELETE /questions/{id}` removes.

use assessment_engine::{NewQuestion, PendingChanges, Persistence, PersistenceError, Record, RecordId};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Body returned by a successful create.
#[derive(Debug, Deserialize)]
struct Created {
    id: RecordId,
}

/// Failure to set up the backend client.
#[derive(Debug, Error)]
pub enum BackendSetupError {
    #[error("invalid backend url '{0}'")]
    InvalidUrl(String),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// [`Persistence`] over the admin backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    token: Option<String>,
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a client for `base_url`, e.g. `https://admin.example.com/api`.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, BackendSetupError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| BackendSetupError::InvalidUrl(base_url.to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("assessment-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url,
            token,
            http_client,
        })
    }

    /// Base url with `segments` appended, each one percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, PersistenceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                PersistenceError::Transport(format!("{} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn questions_url(&self) -> Result<Url, PersistenceError> {
        self.url(&["questions"])
    }

    fn question_url(&self, id: &str) -> Result<Url, PersistenceError> {
        self.url(&["questions", id])
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PersistenceError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| PersistenceError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            let url = response.url().path().to_string();
            return Err(PersistenceError::NotFound(url));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Persistence for HttpBackend {
    async fn list_all(&self) -> Result<Vec<Record>, PersistenceError> {
        let response = self.send(self.http_client.get(self.questions_url()?)).await?;
        let records: Vec<Record> = response
            .json()
            .await
            .map_err(|e| PersistenceError::Decode(e.to_string()))?;

        tracing::debug!(count = records.len(), "fetched questions");
        Ok(records)
    }

    async fn create(
        &self,
        category: &str,
        fields: &NewQuestion,
    ) -> Result<RecordId, PersistenceError> {
        tracing::debug!(category, index = fields.index, "creating question");
        let response = self
            .send(self.http_client.post(self.questions_url()?).json(fields))
            .await?;
        let created: Created = response
            .json()
            .await
            .map_err(|e| PersistenceError::Decode(e.to_string()))?;
        Ok(created.id)
    }

    async fn update(&self, id: &str, changes: &PendingChanges) -> Result<(), PersistenceError> {
        tracing::debug!(id, fields = changes.len(), "updating question");
        self.send(self.http_client.put(self.question_url(id)?).json(changes))
            .await
            .map_err(|e| match e {
                PersistenceError::NotFound(_) => PersistenceError::NotFound(id.to_string()),
                other => other,
            })?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        tracing::debug!(id, "deleting question");
        self.send(self.http_client.delete(self.question_url(id)?))
            .await
            .map_err(|e| match e {
                PersistenceError::NotFound(_) => PersistenceError::NotFound(id.to_string()),
                other => other,
            })?;
        Ok(())
    }
}
