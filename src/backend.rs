// backend.rs
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// What the answer service returned for one query.
///
/// A `None` summary is a valid, successful answer; the caller decides what to
/// show in that case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendAnswer {
    pub summary: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },
    #[error("Parse error: {0}")]
    Decode(String),
}

/// Produces the rendered answer for a user query.
///
/// Implementations must return `Err` for transport failures and non-success
/// responses so that the caller can tell them apart from an empty answer.
#[async_trait(?Send)]
pub trait AnswerBackend {
    async fn answer(&self, text: &str) -> Result<BackendAnswer, BackendError>;
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    summary: Option<String>,
    sql: Option<String>,
    result: Option<Vec<serde_json::Value>>,
    error: Option<String>,
}

/// Client for the ocean data service's `POST /query` endpoint.
#[derive(Debug, Clone)]
pub struct HttpAnswerBackend {
    client: Client,
    query_url: String,
}

impl HttpAnswerBackend {
    pub fn new(query_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            query_url: query_url.into(),
        }
    }

    pub fn query_url(&self) -> &str {
        &self.query_url
    }
}

#[async_trait(?Send)]
impl AnswerBackend for HttpAnswerBackend {
    async fn answer(&self, text: &str) -> Result<BackendAnswer, BackendError> {
        let resp = self
            .client
            .post(&self.query_url)
            .header("Content-Type", "application/json")
            .json(&QueryRequest { query: text })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, message });
        }

        let body = resp.text().await?;
        let data: QueryResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))?;

        if let Some(error) = &data.error {
            info!("backend reported a pipeline error: {}", error);
        }
        if let Some(sql) = &data.sql {
            debug!("backend sql: {}", sql);
        }
        if let Some(rows) = &data.result {
            debug!("backend returned {} rows", rows.len());
        }

        Ok(BackendAnswer {
            summary: data.summary.filter(|s| !s.is_empty()),
        })
    }
}
