#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod cache;
pub mod fetch;
pub mod limiter;
pub mod pipeline;
pub mod rpc;
pub mod txlist;

pub use cache::{
    CacheError,
    CacheRecord,
    CodeCache,
};
pub use fetch::{
    CodeEntry,
    Scanner,
    TxCount,
};
pub use limiter::RateLimiter;
pub use pipeline::{
    EnrichedRecord,
    enrich,
};

/// Leaf fanout for sled.
pub const LEAF_FANOUT: usize = 1024;

/// Bytecode at or below this length is a placeholder ("0x" or a short stub),
/// never real deployed code.
pub const MIN_CODE_LEN: usize = 100;
