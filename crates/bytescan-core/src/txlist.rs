//! Client for an Etherscan-compatible transaction history API.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum TxListError {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("upstream reported no data: {0}")]
    NoData(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Response envelope used by Etherscan-style APIs. `status` is "1" on
/// success; anything else carries a human-readable reason in `message`.
#[derive(Debug, Deserialize)]
struct TxListEnvelope {
    status: String,
    message: String,
    result: serde_json::Value,
}

#[derive(Debug)]
pub struct TxHistoryClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl TxHistoryClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, TxListError> {
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(base_url)?,
            api_key: api_key.to_string(),
        })
    }

    /// Number of transactions recorded for `address`: the length of the
    /// returned transaction list.
    pub async fn transaction_count(&self, address: &str) -> Result<u64, TxListError> {
        let response = self
            .client
            .get(self.base_url.clone())
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", "asc"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TxListError::InvalidResponse(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let envelope: TxListEnvelope = response.json().await?;
        if envelope.status != "1" {
            return Err(TxListError::NoData(envelope.message));
        }

        match envelope.result {
            serde_json::Value::Array(transactions) => Ok(transactions.len() as u64),
            other => Err(TxListError::InvalidResponse(format!(
                "expected a transaction array, got: {other}"
            ))),
        }
    }
}
