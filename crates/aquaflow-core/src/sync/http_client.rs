//! HTTP client for the AquaFlow record server.
//!
//! The server holds the database; this client carries no credentials.
//!
//! ```text
//! POST /v1/schema                     ensure table
//! GET  /v1/days/{user_key}/{date}     200 record | 404
//! PUT  /v1/days/{user_key}/{date}     upsert, full overwrite
//! ```

use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use url::Url;

use super::remote::RemoteStore;
use super::types::{RemoteRecord, SyncError};

/// Remote store backed by `aquaflow serve`.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    base: Url,
    http_client: Client,
}

impl HttpRemoteStore {
    /// Create a client for the server at `endpoint` (e.g. `http://127.0.0.1:8787`).
    pub fn new(endpoint: &str) -> Result<Self, SyncError> {
        let base = Url::parse(endpoint)
            .map_err(|e| SyncError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(SyncError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self {
            base,
            http_client: Client::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SyncError::InvalidEndpoint(self.base.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn day_url(&self, user_key: &str, date: NaiveDate) -> Result<Url, SyncError> {
        let date = date.format("%Y-%m-%d").to_string();
        self.url(&["v1", "days", user_key, &date])
    }
}

/// Turn a non-success response into `SyncError::Status`.
async fn check_status(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SyncError::Status {
        status: status.as_u16(),
        message,
    })
}

impl RemoteStore for HttpRemoteStore {
    async fn ensure_schema(&self) -> Result<(), SyncError> {
        let url = self.url(&["v1", "schema"])?;
        let response = self.http_client.post(url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn fetch(
        &self,
        user_key: &str,
        date: NaiveDate,
    ) -> Result<Option<RemoteRecord>, SyncError> {
        let url = self.day_url(user_key, date)?;
        let response = self.http_client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record = check_status(response).await?.json().await?;
        Ok(Some(record))
    }

    async fn upsert(
        &self,
        user_key: &str,
        date: NaiveDate,
        record: &RemoteRecord,
    ) -> Result<(), SyncError> {
        let url = self.day_url(user_key, date)?;
        let response = self.http_client.put(url).json(record).send().await?;
        check_status(response).await?;
        Ok(())
    }
}
