//! Constants Module - Single Source of Truth
//!
//! Every default used by the data layer (endpoint, contract addresses,
//! cache windows, retry schedule, scoring weights) is defined here.
//! Other modules read these through `FarmConfig` instead of hardcoding.

use alloy_primitives::{address, Address};

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "FarmData";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = concat!("FarmData/", env!("CARGO_PKG_VERSION"));

// ============================================
// CHAIN
// ============================================

/// Monad testnet chain id
pub const CHAIN_ID_MONAD_TESTNET: u64 = 10143;

/// Public Monad testnet RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://testnet-rpc.monad.xyz";

/// Default timeout for RPC requests (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

// ============================================
// CONTRACT ADDRESSES (Monad testnet deployment)
// ============================================

pub const FARM_GAME_ADDRESS: Address = address!("F6121A319b094c44f1B1D8A24BAd116D37C66E33");
pub const SEED_NFT_ADDRESS: Address = address!("574a7B2b86d2957F1266A3F7F6eD586885512a05");
pub const LAND_NFT_ADDRESS: Address = address!("6D2145b588aD0ED722077C54Fa04c0fceEEf6643");
pub const KIND_TOKEN_ADDRESS: Address = address!("8411b1120a1ADBd0f7270d70eCb55cfEa01984c1");
pub const SHOP_ADDRESS: Address = address!("C7433bA91a619E7F028d1514bf1Acd3B709ea450");

/// KIND token decimals (ERC20 default)
pub const KIND_DECIMALS: u8 = 18;

// ============================================
// CACHE WINDOWS
// ============================================

/// Entries older than this are served stale and refreshed in the background
pub const DEFAULT_STALE_AFTER_SECS: u64 = 5 * 60;

/// Entries older than this are discarded and refetched synchronously
pub const DEFAULT_EVICT_AFTER_SECS: u64 = 10 * 60;

/// How often expired entries are swept from the cache
pub const DEFAULT_CACHE_CLEANUP_SECS: u64 = 60;

// ============================================
// RETRY SCHEDULE
// ============================================

/// First backoff delay in milliseconds (doubles per retry)
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Backoff ceiling in milliseconds
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Retries allowed after an HTTP 429 / provider rate-limit response
pub const RATE_LIMIT_MAX_RETRIES: u32 = 5;

/// Retries allowed after a network or timeout failure
pub const TRANSIENT_MAX_RETRIES: u32 = 3;

// ============================================
// LEADERBOARD
// ============================================

/// Points per harvested crop
pub const DEFAULT_HARVEST_WEIGHT: u64 = 10;

/// Points per stolen crop
pub const DEFAULT_STEAL_WEIGHT: u64 = 5;

// ============================================
// LOG SCANNING
// ============================================

/// First block scanned for game events
pub const DEFAULT_LOG_FROM_BLOCK: u64 = 0;

/// Block span of a single eth_getLogs request (provider range limit)
pub const DEFAULT_LOG_CHUNK_SIZE: u64 = 10_000;

/// Concurrent per-player reads while building leaderboards
pub const DEFAULT_READ_CONCURRENCY: usize = 8;
