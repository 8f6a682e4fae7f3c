//! RPC Client Module
//!
//! `ChainClient` is the seam between the data layer and the network:
//! read-only `eth_call` plus `eth_getLogs`. `RpcChainClient` is the
//! JSON-RPC implementation used in production:
//! 1. Gzip compression and a fixed User-Agent on every request
//! 2. Failure classification (HTTP 429 / provider throttling, 5xx and
//!    timeouts, reverts and malformed responses)
//! 3. Request accounting for observability
//!
//! Retries are not done here; the data client wraps calls in `with_retry`.

use alloy_primitives::{Bytes, U64};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::config::{ContractAddresses, FarmConfig};
use crate::models::errors::{ChainError, ChainResult, ErrorClass};
use crate::models::query::{LogQuery, RawLog, ReadCall};
use crate::utils::constants::USER_AGENT as USER_AGENT_CONST;
use crate::utils::decoder::FarmDecoder;

/// Read-only access to the game contracts
pub trait ChainClient: Send + Sync + 'static {
    /// `eth_call` returning raw ABI-encoded return data
    fn call<'a>(&'a self, call: &'a ReadCall) -> BoxFuture<'a, ChainResult<Bytes>>;

    /// `eth_getLogs` for one event over an inclusive block range, in chain order
    fn get_logs<'a>(&'a self, query: &'a LogQuery) -> BoxFuture<'a, ChainResult<Vec<RawLog>>>;

    /// Current head block, used as the upper bound of event scans
    fn block_number(&self) -> BoxFuture<'_, ChainResult<u64>>;
}

impl<T: ChainClient> ChainClient for Arc<T> {
    fn call<'a>(&'a self, call: &'a ReadCall) -> BoxFuture<'a, ChainResult<Bytes>> {
        (**self).call(call)
    }

    fn get_logs<'a>(&'a self, query: &'a LogQuery) -> BoxFuture<'a, ChainResult<Vec<RawLog>>> {
        (**self).get_logs(query)
    }

    fn block_number(&self) -> BoxFuture<'_, ChainResult<u64>> {
        (**self).block_number()
    }
}

// ============================================
// REQUEST ACCOUNTING
// ============================================

/// Per-client request counters
#[derive(Debug, Default)]
pub struct RequestStats {
    calls: AtomicU64,
    log_queries: AtomicU64,
    rate_limited: AtomicU64,
    transient: AtomicU64,
    fatal: AtomicU64,
}

/// Point-in-time copy of `RequestStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestCounts {
    pub calls: u64,
    pub log_queries: u64,
    pub rate_limited: u64,
    pub transient: u64,
    pub fatal: u64,
}

impl RequestStats {
    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn record_log_query(&self) {
        self.log_queries.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, err: &ChainError) {
        let counter = match err.class() {
            ErrorClass::RateLimited => &self.rate_limited,
            ErrorClass::Transient => &self.transient,
            ErrorClass::Fatal => &self.fatal,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RequestCounts {
        RequestCounts {
            calls: self.calls.load(Ordering::Relaxed),
            log_queries: self.log_queries.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            transient: self.transient.load(Ordering::Relaxed),
            fatal: self.fatal.load(Ordering::Relaxed),
        }
    }
}

// ============================================
// JSON-RPC CLIENT
// ============================================

/// JSON-RPC chain client over a single endpoint
#[derive(Clone)]
pub struct RpcChainClient {
    /// RPC endpoint
    url: String,
    /// HTTP client with custom headers (gzip enabled)
    client: reqwest::Client,
    addresses: ContractAddresses,
    stats: Arc<RequestStats>,
}

impl RpcChainClient {
    pub fn new(config: &FarmConfig) -> eyre::Result<Self> {
        let client = Self::build_client(config.rpc_timeout)?;

        Ok(Self {
            url: config.rpc_url.clone(),
            client,
            addresses: config.addresses.clone(),
            stats: Arc::new(RequestStats::default()),
        })
    }

    /// Build the client and check that the endpoint serves `config.chain_id`
    pub async fn connect(config: &FarmConfig) -> eyre::Result<Self> {
        let client = Self::new(config)?;
        let actual: U64 = client
            .request("eth_chainId", serde_json::json!([]))
            .await
            .map_err(|e| eyre::eyre!("eth_chainId failed on {}: {}", client.url, e))?;
        check_chain_id(config.chain_id, actual.to::<u64>())?;

        info!("🔗 Connected to {} (chain {})", client.url, config.chain_id);
        Ok(client)
    }

    /// Build HTTP client with custom headers
    fn build_client(timeout: Duration) -> eyre::Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| eyre::eyre!("Failed to build HTTP client: {}", e))
    }

    pub fn stats(&self) -> RequestCounts {
        self.stats.snapshot()
    }

    /// Execute a single JSON-RPC request and classify any failure
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> ChainResult<T> {
        let result = self.execute::<T>(method, params).await;
        if let Err(ref e) = result {
            self.stats.record_failure(e);
            debug!("RPC {} failed ({}): {}", method, e.class().as_str(), e);
        }
        result
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> ChainResult<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            warn!("⏳ Rate limited (HTTP 429) on {}", method);
            return Err(ChainError::rate_limited("Rate limited (HTTP 429)"));
        }
        if status.is_server_error() {
            return Err(ChainError::unavailable(format!("HTTP error: {}", status)));
        }
        if !status.is_success() {
            return Err(ChainError::rpc(format!("HTTP error: {}", status)));
        }

        let body: RpcResponse<T> = response.json().await?;

        if let Some(error) = body.error {
            return Err(error.into_chain_error());
        }

        body.result
            .ok_or_else(|| ChainError::invalid_response(format!("No result in {} response", method)))
    }

    async fn eth_call(&self, call: &ReadCall) -> ChainResult<Bytes> {
        self.stats.record_call();
        let to = self.addresses.address_of(call.contract());
        let data = FarmDecoder::encode_call(call);
        debug!("📞 eth_call {}.{} data=0x{}", call.contract(), call.method(), hex::encode(&data));

        let params = serde_json::json!([{ "to": to, "data": data }, "latest"]);
        self.request::<Bytes>("eth_call", params).await
    }

    async fn eth_get_logs(&self, query: &LogQuery) -> ChainResult<Vec<RawLog>> {
        self.stats.record_log_query();
        let address = self.addresses.address_of(query.contract);
        let filter = serde_json::json!([{
            "address": address,
            "topics": [query.topic0()],
            "fromBlock": format!("{:#x}", query.from_block),
            "toBlock": format!("{:#x}", query.to_block),
        }]);

        let logs: Vec<alloy_rpc_types::Log> = self.request("eth_getLogs", filter).await?;
        let mut raw: Vec<RawLog> = logs.into_iter().map(raw_log).collect();
        raw.sort_by_key(|l| (l.block_number, l.log_index));

        debug!(
            "📜 {} {} logs in blocks {}..={}",
            raw.len(),
            query.event.name(),
            query.from_block,
            query.to_block
        );
        Ok(raw)
    }
}

impl ChainClient for RpcChainClient {
    fn call<'a>(&'a self, call: &'a ReadCall) -> BoxFuture<'a, ChainResult<Bytes>> {
        self.eth_call(call).boxed()
    }

    fn get_logs<'a>(&'a self, query: &'a LogQuery) -> BoxFuture<'a, ChainResult<Vec<RawLog>>> {
        self.eth_get_logs(query).boxed()
    }

    fn block_number(&self) -> BoxFuture<'_, ChainResult<u64>> {
        async move {
            let head: U64 = self.request("eth_blockNumber", serde_json::json!([])).await?;
            Ok(head.to::<u64>())
        }
        .boxed()
    }
}

fn check_chain_id(expected: u64, actual: u64) -> eyre::Result<()> {
    if expected != actual {
        eyre::bail!("RPC endpoint is on chain {}, expected {}", actual, expected);
    }
    Ok(())
}

fn raw_log(log: alloy_rpc_types::Log) -> RawLog {
    let topics = log.inner.data.topics().to_vec();
    RawLog {
        address: log.inner.address,
        topics,
        data: log.inner.data.data,
        block_number: log.block_number,
        log_index: log.log_index,
    }
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Provider throttling: code -32005 or a rate-limit message
    pub fn is_rate_limit(&self) -> bool {
        let msg = self.message.to_lowercase();
        self.code == -32005 || msg.contains("rate limit") || msg.contains("too many requests")
    }

    pub fn is_revert(&self) -> bool {
        self.code == 3 || self.message.to_lowercase().contains("execution reverted")
    }

    /// Revert payload carried in `data`, either a hex string or `{ "data": hex }`
    fn revert_data(&self) -> Option<Vec<u8>> {
        let hex_str = match self.data.as_ref()? {
            serde_json::Value::String(s) => s.as_str(),
            serde_json::Value::Object(map) => map.get("data")?.as_str()?,
            _ => return None,
        };
        let bytes = hex::decode(hex_str.trim_start_matches("0x")).ok()?;
        (!bytes.is_empty()).then_some(bytes)
    }

    pub fn into_chain_error(self) -> ChainError {
        if self.is_rate_limit() {
            return ChainError::rate_limited(format!("{} (code: {})", self.message, self.code));
        }

        if self.is_revert() {
            if let Some(data) = self.revert_data() {
                return FarmDecoder::decode_revert(&data);
            }
            let reason = match self.message.split_once("execution reverted:") {
                Some((_, reason)) if !reason.trim().is_empty() => reason.trim(),
                _ => self.message.as_str(),
            };
            return ChainError::reverted(reason);
        }

        if (-32099..=-32000).contains(&self.code) {
            return ChainError::unavailable(format!("{} (code: {})", self.message, self.code));
        }

        ChainError::rpc(format!("{} (code: {})", self.message, self.code))
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("url", &self.url)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;
    use alloy_sol_types::{Revert, SolError};

    fn rpc_error(code: i64, message: &str, data: Option<serde_json::Value>) -> RpcError {
        RpcError {
            code,
            message: message.to_string(),
            data,
        }
    }

    #[test]
    fn test_rate_limit_detection() {
        assert_eq!(
            rpc_error(-32005, "limit exceeded", None).into_chain_error().class(),
            ErrorClass::RateLimited
        );
        assert_eq!(
            rpc_error(-32000, "Too Many Requests", None).into_chain_error().class(),
            ErrorClass::RateLimited
        );
    }

    #[test]
    fn test_revert_with_data_is_decoded() {
        let payload = Revert { reason: "Seed not owned".into() }.abi_encode();
        let err = rpc_error(
            3,
            "execution reverted: Seed not owned",
            Some(serde_json::Value::String(format!("0x{}", hex::encode(payload)))),
        )
        .into_chain_error();
        assert_eq!(err.code, ErrorCode::ContractReverted);
        assert_eq!(err.message, "You do not own this seed");
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[test]
    fn test_revert_reason_from_message() {
        let err = rpc_error(-32000, "execution reverted: Land not available", None).into_chain_error();
        assert_eq!(err.code, ErrorCode::ContractReverted);
        assert_eq!(err.message, "This land is not available to claim");
    }

    #[test]
    fn test_server_family_is_transient() {
        let err = rpc_error(-32000, "header not found", None).into_chain_error();
        assert_eq!(err.class(), ErrorClass::Transient);
    }

    #[test]
    fn test_invalid_params_is_fatal() {
        let err = rpc_error(-32602, "invalid argument 0", None).into_chain_error();
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[test]
    fn test_response_parsing() {
        let ok: RpcResponse<Bytes> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"0x0102"}"#).unwrap();
        assert_eq!(ok.result.unwrap().as_ref(), &[1u8, 2]);

        let err: RpcResponse<Bytes> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32005,"message":"rate limited"}}"#,
        )
        .unwrap();
        assert!(err.error.unwrap().is_rate_limit());
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = RequestStats::default();
        stats.record_call();
        stats.record_log_query();
        stats.record_failure(&ChainError::rate_limited("429"));
        stats.record_failure(&ChainError::timeout("slow"));
        let counts = stats.snapshot();
        assert_eq!(counts.calls, 1);
        assert_eq!(counts.log_queries, 1);
        assert_eq!(counts.rate_limited, 1);
        assert_eq!(counts.transient, 1);
        assert_eq!(counts.fatal, 0);
    }

    #[test]
    fn test_chain_id_must_match() {
        assert!(check_chain_id(10143, 10143).is_ok());
        let err = check_chain_id(10143, 1).unwrap_err();
        assert!(err.to_string().contains("chain 1, expected 10143"));
    }
}
