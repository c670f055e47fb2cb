//! Command-line configuration for the scanner.

use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Newline-delimited list of contract addresses to scan
    #[arg(long, env = "BYTESCAN_ADDRESS_FILE", default_value = "addresses.txt")]
    pub address_file: PathBuf,

    /// Path of the bytecode cache, defaults to the platform data directory
    #[arg(long, env = "BYTESCAN_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Cache size in bytes
    #[arg(long, env = "BYTESCAN_CACHE_SIZE", default_value = "1000000")]
    pub cache_size: usize,

    /// Etherscan-compatible transaction history endpoint
    #[arg(
        long,
        env = "BYTESCAN_TX_API_URL",
        default_value = "https://api.etherscan.io/api"
    )]
    pub tx_api_url: String,

    /// API key for the transaction history endpoint
    #[arg(long, env = "BYTESCAN_TX_API_KEY")]
    pub tx_api_key: String,

    /// JSON-RPC endpoint used for eth_getCode
    #[arg(long, env = "BYTESCAN_RPC_URL")]
    pub rpc_url: String,

    /// Minimum spacing between transaction API requests, in milliseconds
    #[arg(long, env = "BYTESCAN_TX_API_INTERVAL_MS", default_value = "250")]
    pub tx_api_interval_ms: u64,

    /// Minimum spacing between RPC requests, in milliseconds
    #[arg(long, env = "BYTESCAN_RPC_INTERVAL_MS", default_value = "50")]
    pub rpc_interval_ms: u64,

    /// Addresses with at most this many transactions skip the code fetch
    #[arg(long, env = "BYTESCAN_TX_EVAL_COUNT", default_value = "10")]
    pub tx_eval_count: u64,

    /// Optional JSON file with named and excluded addresses
    #[arg(long, env = "BYTESCAN_ADDRESS_BOOK")]
    pub address_book: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "BYTESCAN_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_args() -> Vec<&'static str> {
        vec![
            "bytescan",
            "--tx-api-key",
            "test-key",
            "--rpc-url",
            "http://localhost:8545",
        ]
    }

    #[test]
    fn defaults_match_reference_budgets() {
        let args = Args::try_parse_from(required_args()).unwrap();

        assert_eq!(args.tx_api_interval_ms, 250);
        assert_eq!(args.rpc_interval_ms, 50);
        assert_eq!(args.tx_eval_count, 10);
        assert_eq!(args.cache_size, 1000000);
        assert_eq!(args.address_file, PathBuf::from("addresses.txt"));
        assert_eq!(args.log_level, LevelFilter::INFO);
        assert!(args.db_path.is_none());
        assert!(args.address_book.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut argv = required_args();
        argv.extend([
            "--tx-api-interval-ms",
            "100",
            "--rpc-interval-ms",
            "10",
            "--db-path",
            "/tmp/bytescan-db",
            "--log-level",
            "debug",
        ]);
        let args = Args::try_parse_from(argv).unwrap();

        assert_eq!(args.tx_api_interval_ms, 100);
        assert_eq!(args.rpc_interval_ms, 10);
        assert_eq!(args.db_path, Some(PathBuf::from("/tmp/bytescan-db")));
        assert_eq!(args.log_level, LevelFilter::DEBUG);
    }
}
