//! Two-stage fan-out over the address list.
//!
//! Stage 1 resolves every transaction count; a full barrier follows because
//! stage 2's gating needs every count. Stage 2 fetches bytecode for the
//! addresses that cleared the activity threshold. Concurrency is unbounded,
//! real throughput is set by the two rate limiters alone.

use std::{
    collections::HashMap,
    sync::atomic::{
        AtomicUsize,
        Ordering,
    },
};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{
    error,
    info,
};

use crate::fetch::{
    CodeEntry,
    Scanner,
    TxCount,
};

/// One pipeline output per input line, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub address: String,
    pub transaction_count: u64,
    /// True when the count fell back to zero after retry exhaustion.
    pub degraded: bool,
    pub bytecode: Option<String>,
}

/// Run both stages over `addresses` and return one record per input line.
///
/// Each distinct address is fetched at most once per run; duplicate input
/// lines share the result. Cache failures are logged and degrade the affected
/// address only. On cancellation the in-flight stage is dropped (no further
/// limiter admissions) and whatever completed so far is returned.
pub async fn enrich(
    scanner: &Scanner,
    addresses: &[String],
    cancel: &CancellationToken,
) -> Vec<EnrichedRecord> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut distinct: Vec<&str> = Vec::new();
    for address in addresses {
        if !index.contains_key(address.as_str()) {
            index.insert(address.as_str(), distinct.len());
            distinct.push(address.as_str());
        }
    }

    let total = distinct.len();
    info!(total, "starting transaction count stage");
    let completed = AtomicUsize::new(0);
    let counts_fut = join_all(distinct.iter().copied().map(|address| {
        let completed = &completed;
        async move {
            let result = scanner.resolve_count(address).await;
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            info!(done, total, "count stage progress");
            result
        }
    }));

    let count_results = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            info!("interrupted during count stage, abandoning in-flight fetches");
            return Vec::new();
        }
        results = counts_fut => results,
    };

    let counts: Vec<TxCount> = count_results
        .into_iter()
        .zip(distinct.iter().copied())
        .map(|(result, address)| match result {
            Ok(count) => count,
            Err(err) => {
                error!(address, error = %err, "cache failure while resolving count");
                TxCount::Degraded(0)
            }
        })
        .collect();

    info!(total, "starting bytecode stage");
    let completed = AtomicUsize::new(0);
    let codes_fut = join_all(
        distinct
            .iter()
            .copied()
            .zip(counts.iter().copied())
            .map(|(address, count)| {
                let completed = &completed;
                async move {
                    let entry = if count.value() > scanner.activity_threshold() {
                        match scanner.resolve_code(address, count.value()).await {
                            Ok(entry) => entry,
                            Err(err) => {
                                error!(address, error = %err, "cache failure while resolving bytecode");
                                None
                            }
                        }
                    } else {
                        None
                    };
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(done, total, "code stage progress");
                    entry
                }
            }),
    );

    let codes = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            info!("interrupted during code stage, abandoning in-flight fetches");
            return assemble(addresses, &index, &counts, &[]);
        }
        codes = codes_fut => codes,
    };

    assemble(addresses, &index, &counts, &codes)
}

fn assemble(
    addresses: &[String],
    index: &HashMap<&str, usize>,
    counts: &[TxCount],
    codes: &[Option<CodeEntry>],
) -> Vec<EnrichedRecord> {
    addresses
        .iter()
        .map(|address| {
            let idx = index[address.as_str()];
            match codes.get(idx).and_then(|entry| entry.as_ref()) {
                Some(entry) => EnrichedRecord {
                    address: address.clone(),
                    transaction_count: entry.transaction_count,
                    degraded: counts[idx].is_degraded(),
                    bytecode: Some(entry.bytecode.clone()),
                },
                None => EnrichedRecord {
                    address: address.clone(),
                    transaction_count: counts[idx].value(),
                    degraded: counts[idx].is_degraded(),
                    bytecode: None,
                },
            }
        })
        .collect()
}
