// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use nazif_app::{ArchiveRecord, QuoteId};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use url::Url;

const TABLE_PATH: &str = "rest/v1/quotes_archive";

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// What went wrong talking to the archive, mapped from the transport error
/// or the response status. Messages are safe to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    #[error("archive is not configured: {0}")]
    ConfigurationMissing(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("not authorized; check the archive api key")]
    Unauthorized,
    #[error("operation not allowed; check archive permissions")]
    Forbidden,
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("the archive rejected the data: {0}")]
    InvalidData(String),
    #[error("usage quota exceeded; try again later")]
    QuotaExceeded,
    #[error("archive server error ({status}); try again later")]
    ServerError { status: u16 },
    #[error("unexpected archive response ({status}): {message}")]
    Unexpected { status: u16, message: String },
    #[error("could not decode archive response: {0}")]
    BadResponse(String),
}

impl ArchiveError {
    /// Transient failures are worth retrying; everything else fails fast.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::ServerError { .. }
        )
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Connection settings for the remote archive. Every value is explicit;
/// nothing is read from process globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    pub base_url: String,
    pub api_key: String,
    pub tenant: String,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl ArchiveConfig {
    pub fn new(base_url: &str, api_key: &str, tenant: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            api_key: api_key.to_owned(),
            tenant: tenant.to_owned(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Filters pushed down to the archive query. `month` expands to a half-open
/// date range server-side; `text` becomes a case-insensitive OR over the
/// client, place and unit type columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListFilters {
    pub eq_date: Option<String>,
    pub eq_month: Option<String>,
    pub like_text: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub struct Client {
    config: ArchiveConfig,
    http: HttpClient,
}

impl Client {
    pub fn new(config: ArchiveConfig) -> ArchiveResult<Self> {
        let mut config = config;
        config.base_url = config.base_url.trim_end_matches('/').to_owned();
        if config.base_url.is_empty() {
            return Err(ArchiveError::ConfigurationMissing(
                "archive.url must not be empty".to_owned(),
            ));
        }
        if config.api_key.trim().is_empty() {
            return Err(ArchiveError::ConfigurationMissing(
                "archive.api_key must not be empty".to_owned(),
            ));
        }
        if config.tenant.trim().is_empty() {
            return Err(ArchiveError::ConfigurationMissing(
                "archive.tenant must not be empty".to_owned(),
            ));
        }

        let http = HttpClient::builder()
            .build()
            .map_err(|error| ArchiveError::Network(error.to_string()))?;

        Ok(Self { config, http })
    }

    pub fn tenant(&self) -> &str {
        &self.config.tenant
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Lists archive rows for this tenant, newest first.
    pub fn list(&self, filters: &ListFilters) -> ArchiveResult<Vec<ArchiveRecord>> {
        let mut url = self.table_url()?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("tenant", &format!("eq.{}", self.config.tenant));
            params.append_pair("order", "id.desc");

            if let Some(date) = filters.eq_date.as_deref().map(str::trim)
                && !date.is_empty()
            {
                params.append_pair("date", &format!("eq.{date}"));
            }
            if let Some(text) = filters.like_text.as_deref().map(str::trim)
                && !text.is_empty()
            {
                params.append_pair(
                    "or",
                    &format!(
                        "(client.ilike.*{text}*,place.ilike.*{text}*,unit_type.ilike.*{text}*)"
                    ),
                );
            }
            if let Some(month) = filters.eq_month.as_deref().map(str::trim)
                && !month.is_empty()
            {
                params.append_pair("date", &format!("gte.{month}-01"));
                params.append_pair("date", &format!("lt.{}-01", next_month(month)?));
            }
            if let Some(limit) = filters.limit {
                params.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = filters.offset {
                params.append_pair("offset", &offset.to_string());
            }
        }

        self.with_retry("list archive", || {
            let response = self
                .send(self.http.get(url.clone()), self.config.read_timeout)?;
            decode_rows(response)
        })
    }

    /// Fetches one row by id; a row outside this tenant comes back as `None`.
    pub fn get_by_id(&self, id: QuoteId) -> ArchiveResult<Option<ArchiveRecord>> {
        let url = self.row_url(id, &[("limit", "1")])?;
        self.with_retry("fetch record", || {
            let response = self
                .send(self.http.get(url.clone()), self.config.read_timeout)?;
            let rows = decode_rows(response)?;
            Ok(rows.into_iter().next())
        })
    }

    /// Inserts a new row and returns it with the id and created_at the
    /// server assigned. The tenant is stamped here; callers never set it.
    pub fn insert(&self, record: &ArchiveRecord) -> ArchiveResult<ArchiveRecord> {
        let mut record = record.clone();
        record.tenant = self.config.tenant.clone();
        let url = self.table_url()?;

        self.with_retry("insert record", || {
            let response = self.send(
                self.http.post(url.clone()).json(&record),
                self.config.write_timeout,
            )?;
            let rows = decode_rows(response)?;
            rows.into_iter().next().ok_or_else(|| {
                ArchiveError::BadResponse("insert returned no rows".to_owned())
            })
        })
    }

    /// Overwrites an existing row in place. Updating an id that does not
    /// exist for this tenant is an error, not an upsert.
    pub fn update(&self, id: QuoteId, record: &ArchiveRecord) -> ArchiveResult<ArchiveRecord> {
        let mut record = record.clone();
        record.tenant = self.config.tenant.clone();
        record.id = None;
        record.created_at = None;
        let url = self.row_url(id, &[])?;

        self.with_retry("update record", || {
            let response = self.send(
                self.http.patch(url.clone()).json(&record),
                self.config.write_timeout,
            )?;
            let rows = decode_rows(response)?;
            rows.into_iter().next().ok_or_else(|| {
                ArchiveError::NotFound(format!("no archived quote with id {}", id.get()))
            })
        })
    }

    pub fn delete(&self, id: QuoteId) -> ArchiveResult<()> {
        let url = self.row_url(id, &[])?;
        self.with_retry("delete record", || {
            let response = self
                .send(self.http.delete(url.clone()), self.config.read_timeout)?;
            let rows = decode_rows(response)?;
            if rows.is_empty() {
                return Err(ArchiveError::NotFound(format!(
                    "no archived quote with id {}",
                    id.get()
                )));
            }
            Ok(())
        })
    }

    fn table_url(&self) -> ArchiveResult<Url> {
        Url::parse(&format!("{}/{TABLE_PATH}", self.config.base_url)).map_err(|error| {
            ArchiveError::ConfigurationMissing(format!(
                "archive.url {:?} is not a valid URL: {error}",
                self.config.base_url
            ))
        })
    }

    fn row_url(&self, id: QuoteId, extra: &[(&str, &str)]) -> ArchiveResult<Url> {
        let mut url = self.table_url()?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("id", &format!("eq.{}", id.get()));
            params.append_pair("tenant", &format!("eq.{}", self.config.tenant));
            for (key, value) in extra {
                params.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn send(&self, request: RequestBuilder, timeout: Duration) -> ArchiveResult<Response> {
        let response = request
            .timeout(timeout)
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(classify_status(status, &body))
    }

    fn with_retry<T>(
        &self,
        operation: &str,
        mut attempt_fn: impl FnMut() -> ArchiveResult<T>,
    ) -> ArchiveResult<T> {
        let attempts = self.config.max_retries.max(1);
        for attempt in 1..=attempts {
            match attempt_fn() {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < attempts => {
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(%error, operation, attempt, "archive request failed; retrying");
                    thread::sleep(delay);
                }
                Err(error) => return Err(error),
            }
        }
        unreachable!("retry loop always returns");
    }
}

/// Delay before the retry after `attempt` failures: base, 2x base, 4x base.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2_u32.saturating_pow(attempt.saturating_sub(1))
}

/// Advances a `YYYY-MM` month string, rolling the year over after December.
fn next_month(yyyy_mm: &str) -> ArchiveResult<String> {
    let invalid = || {
        ArchiveError::InvalidData(format!("month filter {yyyy_mm:?} is not in YYYY-MM form"))
    };
    let (year, month) = yyyy_mm.split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    if month == 12 {
        Ok(format!("{}-01", year + 1))
    } else {
        Ok(format!("{year}-{:02}", month + 1))
    }
}

fn decode_rows(response: Response) -> ArchiveResult<Vec<ArchiveRecord>> {
    response
        .json()
        .map_err(|error| ArchiveError::BadResponse(error.to_string()))
}

fn classify_transport_error(error: reqwest::Error) -> ArchiveError {
    if error.is_timeout() {
        ArchiveError::Timeout(error.to_string())
    } else {
        ArchiveError::Network(error.to_string())
    }
}

fn classify_status(status: StatusCode, body: &str) -> ArchiveError {
    match status.as_u16() {
        401 => ArchiveError::Unauthorized,
        403 => ArchiveError::Forbidden,
        404 => ArchiveError::NotFound(trim_body(body)),
        408 => ArchiveError::Timeout("server reported a request timeout".to_owned()),
        422 => ArchiveError::InvalidData(trim_body(body)),
        429 => ArchiveError::QuotaExceeded,
        500..=599 => ArchiveError::ServerError {
            status: status.as_u16(),
        },
        other => ArchiveError::Unexpected {
            status: other,
            message: trim_body(body),
        },
    }
}

fn trim_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((index, _)) => format!("{}...", &trimmed[..index]),
        None => trimmed.to_owned(),
    }
}
