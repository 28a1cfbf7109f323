//! Airtable-compatible REST record store.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list | `GET {base_url}/{base_id}/{table}`, repeated with `?offset=` until the response has no `offset` |
//! | create | `POST {base_url}/{base_id}/{table}` with `{"fields": ...}` |
//! | update | `PATCH {base_url}/{base_id}/{table}/{id}` with `{"fields": ...}` |
//! | delete | `DELETE {base_url}/{base_id}/{table}/{id}` |
//!
//! Every request carries `Authorization: Bearer <token>`, read from the
//! environment variable named by `store.api_key_env`.
//!
//! Rate limits (429) and server errors (5xx) are retried with exponential
//! backoff (1s, 2s, 4s, ... capped at 32s) up to `store.max_retries` times.
//! Any other client error fails immediately.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

use sensemaker_core::store::{Record, RecordStore};

use crate::config::StoreConfig;

pub struct RestStore {
    client: Client,
    base: Url,
    base_id: String,
    api_key: String,
    max_retries: u32,
}

#[derive(Deserialize)]
struct ListPage {
    #[serde(default)]
    records: Vec<Record>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    deleted: bool,
}

impl RestStore {
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let base_id = config
            .base_id
            .clone()
            .ok_or_else(|| anyhow!("store.base_id required"))?;
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} not set", config.api_key_env))?;
        let base = Url::parse(&config.base_url)
            .map_err(|e| anyhow!("invalid store.base_url '{}': {}", config.base_url, e))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base,
            base_id,
            api_key,
            max_retries: config.max_retries,
        })
    }

    fn table_url(&self, table: &str, id: Option<&str>) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("store.base_url cannot be a base"))?;
            segments.pop_if_empty().push(&self.base_id).push(table);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Value> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .header("Authorization", format!("Bearer {}", self.api_key));
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        warn!(%method, %url, %status, attempt, "store request failed, retrying");
                        last_err = Some(anyhow!("store API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("store API error {}: {}", status, body_text);
                }
                Err(e) => {
                    warn!(%method, %url, error = %e, attempt, "store request failed, retrying");
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("store request failed after retries")))
    }
}

fn fields_body(fields: Map<String, Value>) -> Value {
    serde_json::json!({ "fields": fields })
}

#[async_trait]
impl RecordStore for RestStore {
    async fn list_records(&self, table: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let mut url = self.table_url(table, None)?;
            if let Some(o) = &offset {
                url.query_pairs_mut().append_pair("offset", o);
            }
            let page: ListPage = serde_json::from_value(self.send(Method::GET, url, None).await?)?;
            debug!(table, page = page.records.len(), "fetched page");
            records.extend(page.records);
            match page.offset {
                Some(next) if !next.is_empty() => offset = Some(next),
                _ => break,
            }
        }
        Ok(records)
    }

    async fn create_record(&self, table: &str, fields: Map<String, Value>) -> Result<Record> {
        let url = self.table_url(table, None)?;
        let value = self
            .send(Method::POST, url, Some(&fields_body(fields)))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn update_record(
        &self,
        table: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record> {
        let url = self.table_url(table, Some(id))?;
        let value = self
            .send(Method::PATCH, url, Some(&fields_body(fields)))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn delete_record(&self, table: &str, id: &str) -> Result<()> {
        let url = self.table_url(table, Some(id))?;
        let value = self.send(Method::DELETE, url, None).await?;
        let response: DeleteResponse = serde_json::from_value(value)?;
        if !response.deleted {
            bail!("store did not delete {} from {}", id, table);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base_url: &str) -> RestStore {
        RestStore {
            client: Client::new(),
            base: Url::parse(base_url).unwrap(),
            base_id: "appTest".into(),
            api_key: "k".into(),
            max_retries: 0,
        }
    }

    #[test]
    fn table_urls_are_escaped() {
        let s = store("https://api.airtable.com/v0");
        let url = s.table_url("Survey Responses", None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.airtable.com/v0/appTest/Survey%20Responses"
        );
        let url = s.table_url("Comments", Some("rec1")).unwrap();
        assert_eq!(url.as_str(), "https://api.airtable.com/v0/appTest/Comments/rec1");
    }

    #[test]
    fn trailing_slash_in_base_url() {
        let s = store("http://localhost:8080/v0/");
        let url = s.table_url("Tags", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v0/appTest/Tags");
    }

    #[test]
    fn list_page_parses_offset() {
        let page: ListPage = serde_json::from_value(serde_json::json!({
            "records": [{"id": "rec1", "createdTime": "2024-01-01", "fields": {"Name": "x"}}],
            "offset": "itr1/rec1"
        }))
        .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.offset.as_deref(), Some("itr1/rec1"));
    }
}
