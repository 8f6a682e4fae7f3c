//! Farm Data Library
//!
//! Client-side data layer for an on-chain farming game:
//! - Contract reads and event logs over JSON-RPC
//! - Error classification with bounded exponential backoff
//! - Deduplicating stale-while-revalidate request cache
//! - Typed view models decoded from contract ABIs
//! - Crop and kindness leaderboards

pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::farm_data::FarmDataClient;
pub use crate::core::leaderboard::{
    Leaderboard, LeaderboardEntry, LeaderboardKind, LeaderboardRow, LeaderboardStats, ScoringWeights,
};
pub use models::config::{CacheConfig, ContractAddresses, FarmConfig, LogScanConfig};
pub use models::errors::{ChainError, ChainResult, ErrorClass, ErrorCode};
pub use models::query::{ContractId, EventKind, LogQuery, QueryArg, QueryKey, RawLog, ReadCall};
pub use models::types::*;
pub use providers::retry::{with_retry, RetryDecision, RetryPolicy};
pub use providers::rpc::{ChainClient, RequestCounts, RpcChainClient};
pub use utils::cache::{CacheStats, EntryState, RequestCache};
pub use utils::decoder::FarmDecoder;
pub use utils::logging::init_tracing;
