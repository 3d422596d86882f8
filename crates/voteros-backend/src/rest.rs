// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the backend's REST table surface.
//!
//! Rows are exchanged as JSON. Writes ask for `return=representation` so the
//! stored row (with backend-assigned id and timestamps) comes back.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, Response, Url};
use tracing::debug;

use voteros_config::model::BackendConfig;
use voteros_core::{FetchQuery, Record, SortOrder, VoterosError};

/// REST client bound to one project and schema.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// Builds a client from the backend section of the configuration.
    ///
    /// Fails when `url` or `api_key` is missing or malformed.
    pub fn new(config: &BackendConfig) -> Result<Self, VoterosError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| VoterosError::Config("backend.url is not set".into()))?;
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| VoterosError::Config("backend.api_key is not set".into()))?;

        let header = |value: &str, what: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| VoterosError::Config(format!("invalid {what} header value: {e}")))
        };

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header(api_key, "apikey")?);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            header(&format!("Bearer {api_key}"), "authorization")?,
        );
        headers.insert("accept-profile", header(&config.schema, "accept-profile")?);
        headers.insert("content-profile", header(&config.schema, "content-profile")?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| VoterosError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: rest_base_url(url)?,
        })
    }

    /// `GET /rest/v1/{table}?select=*` with the query's ordering and limit.
    pub async fn select(&self, query: &FetchQuery) -> Result<Vec<Record>, VoterosError> {
        let mut url = self.table_url(&query.table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            if let Some((column, order)) = &query.order_by {
                let direction = match order {
                    SortOrder::Ascending => "asc",
                    SortOrder::Descending => "desc",
                };
                pairs.append_pair("order", &format!("{column}.{direction}"));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }

        let response = self.send(Method::GET, url, None).await?;
        let rows = check(response, "GET", &query.table)
            .await?
            .json::<Vec<Record>>()
            .await
            .map_err(|e| decode_error(&query.table, e))?;
        debug!(table = %query.table, rows = rows.len(), "fetched table");
        Ok(rows)
    }

    /// `POST /rest/v1/{table}` returning the stored row.
    pub async fn insert(&self, table: &str, record: Record) -> Result<Record, VoterosError> {
        let url = self.table_url(table)?;
        let response = self.send(Method::POST, url, Some(record)).await?;
        let mut rows = check(response, "POST", table)
            .await?
            .json::<Vec<Record>>()
            .await
            .map_err(|e| decode_error(table, e))?;
        if rows.is_empty() {
            return Err(VoterosError::Decode {
                table: table.to_string(),
                reason: "insert returned no rows".into(),
            });
        }
        Ok(rows.swap_remove(0))
    }

    /// `PATCH /rest/v1/{table}?id=eq.{id}` returning the stored row.
    pub async fn update(
        &self,
        table: &str,
        id: &str,
        patch: Record,
    ) -> Result<Record, VoterosError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        let response = self.send(Method::PATCH, url, Some(patch)).await?;
        let mut rows = check(response, "PATCH", table)
            .await?
            .json::<Vec<Record>>()
            .await
            .map_err(|e| decode_error(table, e))?;
        if rows.is_empty() {
            return Err(VoterosError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        Ok(rows.swap_remove(0))
    }

    /// `DELETE /rest/v1/{table}?id=eq.{id}`. Deleting a missing row is not
    /// an error on the backend, so it is not one here either.
    pub async fn delete(&self, table: &str, id: &str) -> Result<(), VoterosError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        let response = self.send(Method::DELETE, url, None).await?;
        check(response, "DELETE", table).await?;
        debug!(table, id, "deleted row");
        Ok(())
    }

    fn table_url(&self, table: &str) -> Result<Url, VoterosError> {
        self.base_url
            .join(table)
            .map_err(|e| VoterosError::Config(format!("invalid table name `{table}`: {e}")))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Record>,
    ) -> Result<Response, VoterosError> {
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request
                .header("prefer", "return=representation")
                .json(&body);
        }
        request.send().await.map_err(|e| VoterosError::Gateway {
            message: format!("{method} request failed: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

/// `{url}/rest/v1/` with a trailing slash so table names join beneath it.
fn rest_base_url(url: &str) -> Result<Url, VoterosError> {
    let mut base = Url::parse(url)
        .map_err(|e| VoterosError::Config(format!("invalid backend.url `{url}`: {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("rest/v1/")
        .map_err(|e| VoterosError::Config(format!("invalid backend.url `{url}`: {e}")))
}

/// Turns a non-2xx response into a gateway error carrying the body text.
async fn check(response: Response, method: &str, table: &str) -> Result<Response, VoterosError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(VoterosError::gateway(format!(
        "{method} {table} returned {status}: {body}"
    )))
}

fn decode_error(table: &str, e: reqwest::Error) -> VoterosError {
    VoterosError::Decode {
        table: table.to_string(),
        reason: e.to_string(),
    }
}
