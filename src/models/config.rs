//! Configuration module for the farm data layer
//!
//! Defaults come from utils/constants.rs; `from_env()` overrides them.
//! No hardcoded addresses or chain IDs in this file.

use alloy_primitives::Address;
use eyre::{eyre, Result, WrapErr};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::core::leaderboard::ScoringWeights;
use crate::models::query::ContractId;
use crate::providers::retry::RetryPolicy;
use crate::utils::constants::{
    CHAIN_ID_MONAD_TESTNET, DEFAULT_CACHE_CLEANUP_SECS, DEFAULT_EVICT_AFTER_SECS, DEFAULT_LOG_CHUNK_SIZE,
    DEFAULT_LOG_FROM_BLOCK, DEFAULT_READ_CONCURRENCY, DEFAULT_RPC_TIMEOUT_SECS, DEFAULT_RPC_URL,
    DEFAULT_STALE_AFTER_SECS, FARM_GAME_ADDRESS, KIND_TOKEN_ADDRESS, LAND_NFT_ADDRESS,
    SEED_NFT_ADDRESS, SHOP_ADDRESS,
};

/// Deployed addresses of the five game contracts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractAddresses {
    pub farm_game: Address,
    pub land_nft: Address,
    pub seed_nft: Address,
    pub kind_token: Address,
    pub shop: Address,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            farm_game: FARM_GAME_ADDRESS,
            land_nft: LAND_NFT_ADDRESS,
            seed_nft: SEED_NFT_ADDRESS,
            kind_token: KIND_TOKEN_ADDRESS,
            shop: SHOP_ADDRESS,
        }
    }
}

impl ContractAddresses {
    pub fn address_of(&self, contract: ContractId) -> Address {
        match contract {
            ContractId::FarmGame => self.farm_game,
            ContractId::LandNft => self.land_nft,
            ContractId::SeedNft => self.seed_nft,
            ContractId::KindToken => self.kind_token,
            ContractId::Shop => self.shop,
        }
    }
}

/// Freshness windows, measured from fetch time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub stale_after: Duration,
    pub evict_after: Duration,
    /// Period of the background sweep that drops expired keys
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
            evict_after: Duration::from_secs(DEFAULT_EVICT_AFTER_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CACHE_CLEANUP_SECS),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.evict_after < self.stale_after {
            return Err(eyre!(
                "evict_after ({}s) must not be shorter than stale_after ({}s)",
                self.evict_after.as_secs(),
                self.stale_after.as_secs()
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(eyre!("cache cleanup interval must be positive"));
        }
        Ok(())
    }
}

/// Event log scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogScanConfig {
    pub from_block: u64,
    /// Blocks per eth_getLogs request
    pub chunk_size: u64,
    /// Concurrent per-player reads
    pub max_concurrency: usize,
}

impl Default for LogScanConfig {
    fn default() -> Self {
        Self {
            from_block: DEFAULT_LOG_FROM_BLOCK,
            chunk_size: DEFAULT_LOG_CHUNK_SIZE,
            max_concurrency: DEFAULT_READ_CONCURRENCY,
        }
    }
}

/// Full data layer configuration
#[derive(Debug, Clone)]
pub struct FarmConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub rpc_timeout: Duration,
    pub addresses: ContractAddresses,
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub weights: ScoringWeights,
    pub logs: LogScanConfig,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: CHAIN_ID_MONAD_TESTNET,
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
            addresses: ContractAddresses::default(),
            cache: CacheConfig::default(),
            retry: RetryPolicy::default(),
            weights: ScoringWeights::default(),
            logs: LogScanConfig::default(),
        }
    }
}

impl FarmConfig {
    /// Defaults overridden by `FARM_*` / `*_ADDRESS` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env` with an injectable variable source
    pub fn from_lookup<L>(lookup: L) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("FARM_RPC_URL").filter(|u| !u.trim().is_empty()) {
            info!("🔌 Using FARM_RPC_URL override");
            config.rpc_url = url.trim().to_string();
        }
        if let Some(id) = parse_var::<u64, _>(&lookup, "FARM_CHAIN_ID")? {
            config.chain_id = id;
        }

        if let Some(a) = parse_var::<Address, _>(&lookup, "FARM_GAME_ADDRESS")? {
            config.addresses.farm_game = a;
        }
        if let Some(a) = parse_var::<Address, _>(&lookup, "SEED_NFT_ADDRESS")? {
            config.addresses.seed_nft = a;
        }
        if let Some(a) = parse_var::<Address, _>(&lookup, "LAND_NFT_ADDRESS")? {
            config.addresses.land_nft = a;
        }
        if let Some(a) = parse_var::<Address, _>(&lookup, "KIND_TOKEN_ADDRESS")? {
            config.addresses.kind_token = a;
        }
        if let Some(a) = parse_var::<Address, _>(&lookup, "SHOP_ADDRESS")? {
            config.addresses.shop = a;
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "FARM_CACHE_STALE_SECS")? {
            config.cache.stale_after = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "FARM_CACHE_EVICT_SECS")? {
            config.cache.evict_after = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "FARM_CACHE_CLEANUP_SECS")? {
            config.cache.cleanup_interval = Duration::from_secs(secs);
        }

        if let Some(w) = parse_var::<u64, _>(&lookup, "FARM_SCORE_HARVEST_WEIGHT")? {
            config.weights.harvest = w;
        }
        if let Some(w) = parse_var::<u64, _>(&lookup, "FARM_SCORE_STEAL_WEIGHT")? {
            config.weights.steal = w;
        }

        if let Some(b) = parse_var::<u64, _>(&lookup, "FARM_LOG_FROM_BLOCK")? {
            config.logs.from_block = b;
        }
        if let Some(n) = parse_var::<u64, _>(&lookup, "FARM_LOG_CHUNK_SIZE")? {
            config.logs.chunk_size = n;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        if self.logs.chunk_size == 0 {
            return Err(eyre!("log chunk size must be positive"));
        }
        if self.logs.max_concurrency == 0 {
            return Err(eyre!("read concurrency must be positive"));
        }
        Ok(())
    }
}

fn parse_var<T, L>(lookup: &L, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    L: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| eyre!("{}", e))
        .wrap_err_with(|| format!("invalid value for {}: {:?}", name, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = FarmConfig::default();
        assert_eq!(config.chain_id, 10143);
        assert_eq!(config.cache.stale_after, Duration::from_secs(300));
        assert_eq!(config.cache.evict_after, Duration::from_secs(600));
        assert_eq!(config.addresses.address_of(ContractId::Shop), SHOP_ADDRESS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = FarmConfig::from_lookup(lookup(&[
            ("FARM_RPC_URL", "http://localhost:8545"),
            ("FARM_CACHE_STALE_SECS", "30"),
            ("FARM_CACHE_EVICT_SECS", "60"),
            ("FARM_SCORE_STEAL_WEIGHT", "0"),
            ("SHOP_ADDRESS", "0x0000000000000000000000000000000000000001"),
        ]))
        .unwrap();
        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.cache.stale_after, Duration::from_secs(30));
        assert_eq!(config.weights.steal, 0);
        assert_eq!(config.addresses.shop, Address::with_last_byte(1));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(FarmConfig::from_lookup(lookup(&[("FARM_CHAIN_ID", "monad")])).is_err());
        assert!(FarmConfig::from_lookup(lookup(&[("LAND_NFT_ADDRESS", "0x1234")])).is_err());
        assert!(FarmConfig::from_lookup(lookup(&[("FARM_LOG_CHUNK_SIZE", "0")])).is_err());
        assert!(FarmConfig::from_lookup(lookup(&[("FARM_CACHE_CLEANUP_SECS", "0")])).is_err());
    }

    #[test]
    fn test_evict_before_stale_rejected() {
        let err = FarmConfig::from_lookup(lookup(&[
            ("FARM_CACHE_STALE_SECS", "600"),
            ("FARM_CACHE_EVICT_SECS", "300"),
        ]));
        assert!(err.is_err());
    }
}
