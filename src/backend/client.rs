//! REST client for the reporting views.
//!
//! Views are read through the backend's PostgREST endpoint:
//! `GET {url}/rest/v1/{view}?select=...&column=op.value`.

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::models::DateRange;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

use super::Session;

/// A read-only filter against one reporting view.
///
/// Queries compare equal when they target the same view with the same
/// columns and filters, which makes them usable as request keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewQuery {
    view: String,
    select: String,
    filters: Vec<(String, String)>,
}

impl ViewQuery {
    /// Select every column of `view`.
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            select: "*".to_string(),
            filters: Vec::new(),
        }
    }

    /// Restrict the returned columns.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.select = columns.join(",");
        self
    }

    pub fn eq(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, format!("eq.{}", value))
    }

    pub fn gte(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, format!("gte.{}", value))
    }

    pub fn lte(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, format!("lte.{}", value))
    }

    /// Inclusive filter on a date column.
    pub fn between(self, column: &str, range: &DateRange) -> Self {
        self.gte(column, range.start).lte(column, range.end)
    }

    /// Membership filter; values are double-quoted so names with spaces
    /// or commas survive.
    pub fn in_list<I, S>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let quoted: Vec<String> = values
            .into_iter()
            .map(|v| format!("\"{}\"", v.as_ref().replace('\\', "\\\\").replace('"', "\\\"")))
            .collect();
        self.filter(column, format!("in.({})", quoted.join(",")))
    }

    fn filter(mut self, column: &str, expr: String) -> Self {
        self.filters.push((column.to_string(), expr));
        self
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    /// Query-string pairs, `select` first.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 1);
        pairs.push(("select".to_string(), self.select.clone()));
        pairs.extend(self.filters.iter().cloned());
        pairs
    }
}

impl fmt::Display for ViewQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?select={}", self.view, self.select)?;
        for (column, expr) in &self.filters {
            write!(f, "&{}={}", column, expr)?;
        }
        Ok(())
    }
}

/// Client for the REST query interface.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    timeout_seconds: u64,
}

impl RestClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self {
            http: super::http_client(config.timeout_seconds)?,
            base_url: super::normalize_base_url(&config.url),
            anon_key: config.anon_key.clone(),
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Endpoint URL for a view.
    pub fn view_url(&self, view: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, view)
    }

    /// Run a query and decode the returned rows.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        query: &ViewQuery,
        session: &Session,
    ) -> Result<Vec<T>, BackendError> {
        debug!("Querying {}", query);

        let response = self
            .http
            .get(self.view_url(query.view()))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .query(&query.query_pairs())
            .send()
            .await
            .map_err(|e| BackendError::from_transport(e, &self.base_url, self.timeout_seconds))?;

        let rows: Vec<T> = super::read_json(response).await?;
        debug!("{} returned {} rows", query.view(), rows.len());
        Ok(rows)
    }
}
