//! Blocking HTTP client for the Airtable REST API.
//!
//! ```text
//! GET    /v0/{base}/{table}?offset=…   list, paginated
//! POST   /v0/{base}/{table}            {"fields": {…}}  -> {"id": …}
//! PATCH  /v0/{base}/{table}/{id}       {"fields": {…}}
//! DELETE /v0/{base}/{table}/{id}
//! ```
//!
//! Every request waits on the shared [`RateLimiter`]. HTTP 429, 5xx and
//! transport failures are retried with linear backoff; anything else fails
//! immediately. `POST` is not idempotent, so a create is only retried when
//! the server cannot have stored it: 429, DNS or a refused connection.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use depsync_core::{AirtableConfig, ConfigError, RemoteId};

use crate::error::StoreError;
use crate::limiter::RateLimiter;
use crate::record::{RecordFields, RemoteRecord};
use crate::store::RemoteStore;

pub const API_BASE: &str = "https://api.airtable.com/v0";

const RETRY_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<RemoteRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Deserialize)]
struct CreatedRecord {
    id: RemoteId,
}

pub struct AirtableStore {
    agent: ureq::Agent,
    api_base: String,
    base_id: String,
    authorization: String,
    limiter: RateLimiter,
    max_retries: u32,
    retry_backoff: Duration,
}

impl std::fmt::Debug for AirtableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableStore")
            .field("api_base", &self.api_base)
            .field("base_id", &self.base_id)
            .field("limiter", &self.limiter)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl AirtableStore {
    /// Fails with [`ConfigError::MissingCredentials`] before any request is made.
    pub fn new(config: &AirtableConfig) -> Result<Self, ConfigError> {
        if config.base_id.trim().is_empty() {
            return Err(ConfigError::MissingCredentials("base id"));
        }
        if config.token.trim().is_empty() {
            return Err(ConfigError::MissingCredentials("token"));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Ok(Self {
            agent,
            api_base: API_BASE.to_string(),
            base_id: config.base_id.clone(),
            authorization: format!("Bearer {}", config.token),
            limiter: RateLimiter::per_second(config.requests_per_second),
            max_retries: config.max_retries,
            retry_backoff: RETRY_BACKOFF,
        })
    }

    /// Point at another API root (proxies, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_base,
            urlencoding::encode(&self.base_id),
            urlencoding::encode(table)
        )
    }

    fn record_url(&self, table: &str, id: &RemoteId) -> String {
        format!("{}/{}", self.table_url(table), urlencoding::encode(&id.0))
    }

    /// Send one request, retrying throttling, server errors and transport failures.
    fn execute(
        &self,
        method: &str,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<ureq::Response, StoreError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.limiter.acquire();

            let mut request = self
                .agent
                .request(method, url)
                .set("Authorization", &self.authorization);
            for (key, value) in query {
                request = request.query(key, value);
            }
            let result = match body {
                Some(body) => request.send_json(body.clone()),
                None => request.call(),
            };

            let (error, retry) = match result {
                Ok(response) => return Ok(response),
                Err(ureq::Error::Status(status, response)) => {
                    let body = response.into_string().unwrap_or_default();
                    (
                        StoreError::Status { status, body },
                        retries_status(method, status),
                    )
                }
                Err(ureq::Error::Transport(transport)) => {
                    let retry = retries_transport(method, transport.kind());
                    (StoreError::Transport(transport.to_string()), retry)
                }
            };

            if !retry {
                return Err(error);
            }
            if attempt > self.max_retries {
                if attempt == 1 {
                    return Err(error);
                }
                return Err(StoreError::RetriesExhausted {
                    attempts: attempt,
                    last: error.to_string(),
                });
            }
            tracing::debug!("{method} {url} failed (attempt {attempt}): {error}; retrying");
            std::thread::sleep(self.retry_backoff * attempt);
        }
    }
}

fn retries_status(method: &str, status: u16) -> bool {
    status == 429 || (method != "POST" && (500..600).contains(&status))
}

/// Only failures before the request left the client are safe to repeat for `POST`.
fn retries_transport(method: &str, kind: ureq::ErrorKind) -> bool {
    method != "POST" || matches!(kind, ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed)
}

impl RemoteStore for AirtableStore {
    fn list(&self, table: &str) -> Result<Vec<RemoteRecord>, StoreError> {
        let url = self.table_url(table);
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let query: Vec<(&str, &str)> = offset
                .as_deref()
                .map(|o| vec![("offset", o)])
                .unwrap_or_default();
            let page: ListResponse = self
                .execute("GET", &url, &query, None)?
                .into_json()
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            records.extend(page.records);
            match page.offset {
                Some(next) if !next.is_empty() => offset = Some(next),
                _ => break,
            }
        }
        Ok(records)
    }

    fn create(&self, table: &str, fields: &RecordFields) -> Result<RemoteId, StoreError> {
        let body = json!({ "fields": fields });
        let created: CreatedRecord = self
            .execute("POST", &self.table_url(table), &[], Some(&body))?
            .into_json()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(created.id)
    }

    fn update(&self, table: &str, id: &RemoteId, fields: &RecordFields) -> Result<(), StoreError> {
        let body = json!({ "fields": fields });
        self.execute("PATCH", &self.record_url(table, id), &[], Some(&body))?;
        Ok(())
    }

    fn delete(&self, table: &str, id: &RemoteId) -> Result<(), StoreError> {
        self.execute("DELETE", &self.record_url(table, id), &[], None)?;
        Ok(())
    }
}
