//! Cloudflare D1 over the REST API.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::Client;
use crate::error::{Error, Result};

const API_BASE: &str = "https://api.cloudflare.com/client/v4";

struct D1Client {
    rt: tokio::runtime::Runtime,
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Vec<StatementResult>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    results: Vec<Map<String, Value>>,
}

pub(super) fn open(account_id: &str, database_id: &str, token: &str) -> Result<Box<dyn Client>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Connection(format!("Failed to create async runtime: {}", e)))?;

    Ok(Box::new(D1Client {
        rt,
        http: reqwest::Client::new(),
        endpoint: format!("{API_BASE}/accounts/{account_id}/d1/database/{database_id}/query"),
        token: token.to_string(),
    }))
}

impl D1Client {
    fn send(&self, sql: &str) -> Result<Vec<StatementResult>> {
        self.rt.block_on(async {
            let response = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.token)
                .json(&json!({ "sql": sql }))
                .send()
                .await
                .map_err(|e| Error::Connection(format!("D1 request failed: {}", e)))?;

            let status = response.status();
            let body: Envelope = response
                .json()
                .await
                .map_err(|e| Error::query(sql, format!("HTTP {status}: {e}")))?;

            if !body.success {
                let message = body
                    .errors
                    .into_iter()
                    .map(|m| m.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(Error::query(sql, message));
            }
            Ok(body.result)
        })
    }
}

impl Client for D1Client {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.send(sql).map(drop)
    }

    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        let results = self.send(sql)?;
        Ok(results
            .into_iter()
            .next()
            .map(|r| r.results)
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().next().map(|(_, v)| text(v)).unwrap_or_default())
            .collect())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

fn text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}
