//! JSON-RPC client used to fetch deployed bytecode (`eth_getCode`).

use std::sync::atomic::{
    AtomicU64,
    Ordering,
};

use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("JSON-RPC error code {code}: {message}")]
    JsonRpc { code: i32, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: String,
    method: String,
    params: T,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    jsonrpc: String,
    result: Option<T>,
    error: Option<JsonRpcErrorBody>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i32,
    message: String,
}

/// Thin JSON-RPC 2.0 client over HTTP.
#[derive(Debug)]
pub struct EthRpcClient {
    client: Client,
    base_url: Url,
    request_id: AtomicU64,
}

impl EthRpcClient {
    pub fn new(rpc_url: &str) -> Result<Self, RpcError> {
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(rpc_url)?,
            request_id: AtomicU64::new(1),
        })
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn make_request<P, R>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let request_id = self.next_request_id();
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: request_id,
        };

        let response = self
            .client
            .post(self.base_url.clone())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RpcError::InvalidResponse(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let response_body: JsonRpcResponse<R> = response.json().await?;

        if response_body.jsonrpc != "2.0" {
            return Err(RpcError::InvalidResponse(format!(
                "invalid JSON-RPC version: expected '2.0', got '{}'",
                response_body.jsonrpc
            )));
        }

        if response_body.id != request_id {
            return Err(RpcError::InvalidResponse(format!(
                "request/response ID mismatch: expected {request_id}, got {}",
                response_body.id
            )));
        }

        if let Some(error) = response_body.error {
            return Err(RpcError::JsonRpc {
                code: error.code,
                message: error.message,
            });
        }

        response_body.result.ok_or_else(|| {
            RpcError::InvalidResponse("missing result in successful response".to_string())
        })
    }

    /// Fetch the deployed bytecode at `address` as a hex string ("0x…").
    /// An address with no code yields "0x".
    pub async fn get_code(&self, address: &str) -> Result<String, RpcError> {
        let params = vec![address.to_string(), "latest".to_string()];
        self.make_request("eth_getCode", params).await
    }
}
