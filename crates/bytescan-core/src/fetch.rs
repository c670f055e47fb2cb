//! The two cache-first, rate-limited, retrying fetchers.
//!
//! Both fetchers degrade instead of failing: an upstream that stays down for
//! one address must never abort the whole batch. Only cache I/O errors
//! propagate, a broken local store is not something to retry around.

use std::time::Duration;

use tracing::{
    debug,
    warn,
};

use crate::{
    MIN_CODE_LEN,
    cache::{
        CacheError,
        CodeCache,
    },
    limiter::RateLimiter,
    rpc::EthRpcClient,
    txlist::TxHistoryClient,
};

/// Attempts per fetch before giving up on an address.
pub const MAX_ATTEMPTS: usize = 3;

/// A resolved transaction count, tagged with how it was obtained so callers
/// can tell "genuinely zero" apart from "upstream unreachable, defaulted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxCount {
    Resolved(u64),
    Degraded(u64),
}

impl TxCount {
    pub fn value(self) -> u64 {
        match self {
            Self::Resolved(count) | Self::Degraded(count) => count,
        }
    }

    pub fn is_degraded(self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Bytecode paired with the transaction count it was committed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub bytecode: String,
    pub transaction_count: u64,
}

/// Owns the cache, the two upstream clients and their independent limiters.
#[derive(Debug)]
pub struct Scanner {
    cache: CodeCache,
    tx_api: TxHistoryClient,
    rpc: EthRpcClient,
    tx_limiter: RateLimiter,
    rpc_limiter: RateLimiter,
    tx_eval_count: u64,
}

impl Scanner {
    pub fn new(
        cache: CodeCache,
        tx_api: TxHistoryClient,
        rpc: EthRpcClient,
        tx_api_interval: Duration,
        rpc_interval: Duration,
        tx_eval_count: u64,
    ) -> Self {
        Self {
            cache,
            tx_api,
            rpc,
            tx_limiter: RateLimiter::new(tx_api_interval),
            rpc_limiter: RateLimiter::new(rpc_interval),
            tx_eval_count,
        }
    }

    /// Addresses with at most this many transactions are not worth a code
    /// fetch.
    pub fn activity_threshold(&self) -> u64 {
        self.tx_eval_count
    }

    pub fn cache(&self) -> &CodeCache {
        &self.cache
    }

    /// Resolve the transaction count for `address`, cache first.
    ///
    /// After `MAX_ATTEMPTS` failed upstream queries the address is treated as
    /// inactive and `Degraded(0)` is returned; downstream this keeps it out
    /// of the code-fetch stage.
    pub async fn resolve_count(&self, address: &str) -> Result<TxCount, CacheError> {
        if let Some(record) = self.cache.get(address)? {
            if let Some(count) = record.transaction_count {
                debug!(address, count, "transaction count served from cache");
                return Ok(TxCount::Resolved(count));
            }
        }

        for attempt in 1..=MAX_ATTEMPTS {
            self.tx_limiter.acquire().await;
            match self.tx_api.transaction_count(address).await {
                Ok(count) => {
                    self.cache.put_count(address, count)?;
                    return Ok(TxCount::Resolved(count));
                }
                Err(err) => {
                    warn!(address, attempt, error = %err, "failed to fetch transaction list, retrying");
                }
            }
        }

        warn!(
            address,
            attempts = MAX_ATTEMPTS,
            "transaction list unavailable, treating address as inactive"
        );
        Ok(TxCount::Degraded(0))
    }

    /// Resolve the deployed bytecode for `address`, cache first.
    ///
    /// `known_count` is the stage-1 count and only gates whether a fetch is
    /// attempted at all; the count persisted alongside the code is re-read
    /// from the cache (and re-resolved if missing) so the committed pair is
    /// always consistent. `None` means "no data available", never an error.
    pub async fn resolve_code(
        &self,
        address: &str,
        known_count: u64,
    ) -> Result<Option<CodeEntry>, CacheError> {
        let cached = self.cache.get(address)?;
        if let Some(record) = &cached {
            if let Some(code) = record.valid_bytecode() {
                debug!(address, "bytecode served from cache");
                return Ok(Some(CodeEntry {
                    bytecode: code.to_string(),
                    transaction_count: record.transaction_count.unwrap_or(known_count),
                }));
            }
        }

        if known_count < self.tx_eval_count {
            debug!(address, known_count, "below activity threshold, skipping code fetch");
            return Ok(None);
        }

        let mut count = cached.and_then(|record| record.transaction_count).unwrap_or(0);

        for attempt in 1..=MAX_ATTEMPTS {
            if count == 0 {
                count = self.resolve_count(address).await?.value();
            }
            self.rpc_limiter.acquire().await;
            match self.rpc.get_code(address).await {
                Ok(bytecode) if bytecode.len() > MIN_CODE_LEN => {
                    self.cache.put_code(address, &bytecode, count)?;
                    return Ok(Some(CodeEntry {
                        bytecode,
                        transaction_count: count,
                    }));
                }
                Ok(_) => {
                    warn!(address, attempt, "implausibly short bytecode, retrying");
                }
                Err(err) => {
                    warn!(address, attempt, error = %err, "failed to fetch bytecode, retrying");
                }
            }
        }

        warn!(
            address,
            attempts = MAX_ATTEMPTS,
            "no valid bytecode after retries"
        );
        Ok(None)
    }
}
