//! Farm Data Client
//!
//! Consumer-facing query API. Every read goes through the request cache,
//! every network call through the retry policy, every result through the
//! decoder. Leaderboards are assembled from cached per-player reads.

use alloy_primitives::{Address, U256};
use futures_util::future::{try_join, FutureExt};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::core::leaderboard::{Leaderboard, LeaderboardKind, LeaderboardStats, ScoringWeights};
use crate::models::config::{FarmConfig, LogScanConfig};
use crate::models::errors::{ChainError, ChainResult};
use crate::models::query::{ContractId, EventKind, LogQuery, QueryArg, QueryKey, ReadCall};
use crate::models::types::{
    BoosterType, CropType, EventRecord, LandInfo, PlayerStatRecord, PlayerStats, PriceQuote,
    SeedInfo, ViewValue, WeatherSlot,
};
use crate::providers::retry::{with_retry, RetryPolicy};
use crate::providers::rpc::ChainClient;
use crate::utils::cache::{CacheStats, RequestCache};
use crate::utils::decoder::FarmDecoder;

/// Events whose participants count as farmers
const PLAYER_EVENTS: [EventKind; 4] = [
    EventKind::LandClaimed,
    EventKind::CropHarvested,
    EventKind::CropStolen,
    EventKind::HelpProvided,
];

pub struct FarmDataClient<C: ChainClient> {
    chain: Arc<C>,
    cache: RequestCache<ViewValue>,
    retry: RetryPolicy,
    weights: ScoringWeights,
    logs: LogScanConfig,
}

impl<C: ChainClient> Clone for FarmDataClient<C> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
            cache: self.cache.clone(),
            retry: self.retry,
            weights: self.weights,
            logs: self.logs,
        }
    }
}

impl<C: ChainClient> FarmDataClient<C> {
    pub fn new(chain: C, config: &FarmConfig) -> Self {
        Self::with_shared(Arc::new(chain), config)
    }

    /// Inside a tokio runtime this also starts the cache sweep, which stops
    /// once every clone of the client is dropped.
    pub fn with_shared(chain: Arc<C>, config: &FarmConfig) -> Self {
        let cache = RequestCache::new(&config.cache);
        if Handle::try_current().is_ok() {
            cache.spawn_cleanup(config.cache.cleanup_interval);
        } else {
            debug!("no tokio runtime, cache sweep not started");
        }

        Self {
            chain,
            cache,
            retry: config.retry,
            weights: config.weights,
            logs: config.logs,
        }
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub fn cache(&self) -> &RequestCache<ViewValue> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ============================================
    // GENERIC QUERIES
    // ============================================

    /// Cached read by key: a contract method or an event-log window
    pub async fn query(&self, key: &QueryKey) -> ChainResult<ViewValue> {
        match ReadCall::from_key(key) {
            Ok(call) => self.read(&call).await,
            Err(read_err) => match LogQuery::from_key(key) {
                Ok(window) => self.log_window(&window).await,
                Err(_) => Err(read_err),
            },
        }
    }

    /// Cached, deduplicated, retried contract read
    pub async fn read(&self, call: &ReadCall) -> ChainResult<ViewValue> {
        let key = call.key();
        let chain = Arc::clone(&self.chain);
        let retry = self.retry;
        let call = call.clone();

        self.cache
            .get(&key, move || {
                async move {
                    let label = format!("{}.{}", call.contract(), call.method());
                    let raw = with_retry(&retry, &label, || chain.call(&call)).await?;
                    FarmDecoder::decode_return(&call, &raw)
                }
                .boxed()
            })
            .await
    }

    /// Cached logs for one block window
    pub async fn log_window(&self, window: &LogQuery) -> ChainResult<ViewValue> {
        let key = window.key();
        let chain = Arc::clone(&self.chain);
        let retry = self.retry;
        let window = window.clone();

        self.cache
            .get(&key, move || {
                async move {
                    let label = format!("{}.{} logs", window.contract, window.event.name());
                    let logs = with_retry(&retry, &label, || chain.get_logs(&window)).await?;
                    let records: Vec<EventRecord> =
                        logs.iter().filter_map(FarmDecoder::decode_event).collect();
                    if records.len() < logs.len() {
                        debug!("skipped {} undecodable {} logs", logs.len() - records.len(), label);
                    }
                    Ok(ViewValue::Events(records))
                }
                .boxed()
            })
            .await
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.cache.invalidate(key);
    }

    /// Drop every cached read that takes `player` as an argument
    pub fn invalidate_player(&self, player: Address) -> usize {
        let arg = QueryArg::Address(player);
        self.cache.invalidate_where(|key| key.args.contains(&arg))
    }

    // ============================================
    // TYPED GETTERS
    // ============================================

    pub async fn land_info(&self, land_id: U256) -> ChainResult<LandInfo> {
        match self.read(&ReadCall::LandInfo { land_id }).await? {
            ViewValue::Land(land) => Ok(land),
            other => Err(unexpected("land", &other)),
        }
    }

    pub async fn seed_info(&self, token_id: U256) -> ChainResult<SeedInfo> {
        match self.read(&ReadCall::SeedInfo { token_id }).await? {
            ViewValue::Seed(seed) => Ok(seed),
            other => Err(unexpected("seed", &other)),
        }
    }

    pub async fn player_stats(&self, player: Address) -> ChainResult<PlayerStats> {
        match self.read(&ReadCall::PlayerStats { player }).await? {
            ViewValue::PlayerStats(stats) => Ok(stats),
            other => Err(unexpected("player_stats", &other)),
        }
    }

    pub async fn kind_balance(&self, owner: Address) -> ChainResult<U256> {
        self.read_uint(ReadCall::KindBalance { owner }).await
    }

    /// Shop price for a crop
    pub async fn seed_price(&self, crop: CropType) -> ChainResult<PriceQuote> {
        match self.read(&ReadCall::ShopSeedPrice { crop }).await? {
            ViewValue::Price(price) => Ok(price),
            other => Err(unexpected("price", &other)),
        }
    }

    pub async fn booster_price(&self, booster: BoosterType) -> ChainResult<PriceQuote> {
        match self.read(&ReadCall::BoosterPrice { booster }).await? {
            ViewValue::Price(price) => Ok(price),
            other => Err(unexpected("price", &other)),
        }
    }

    pub async fn available_seeds(&self, pay_with_kind: bool) -> ChainResult<Vec<CropType>> {
        let call = if pay_with_kind {
            ReadCall::ShopSeedsForKind
        } else {
            ReadCall::ShopSeedsForNative
        };
        match self.read(&call).await? {
            ViewValue::Crops(crops) => Ok(crops),
            other => Err(unexpected("crops", &other)),
        }
    }

    pub async fn remaining_daily_helps(&self, helper: Address) -> ChainResult<U256> {
        self.read_uint(ReadCall::RemainingDailyHelps { helper }).await
    }

    pub async fn available_lands(&self) -> ChainResult<Vec<U256>> {
        match self.read(&ReadCall::AvailableLands).await? {
            ViewValue::Uints(ids) => Ok(ids),
            other => Err(unexpected("uints", &other)),
        }
    }

    pub async fn total_lands(&self) -> ChainResult<U256> {
        self.read_uint(ReadCall::TotalLands).await
    }

    pub async fn weather_forecast(&self, land_id: U256) -> ChainResult<Vec<WeatherSlot>> {
        match self.read(&ReadCall::WeatherForecast { land_id }).await? {
            ViewValue::Weather(slots) => Ok(slots),
            other => Err(unexpected("weather", &other)),
        }
    }

    async fn read_uint(&self, call: ReadCall) -> ChainResult<U256> {
        match self.read(&call).await? {
            ViewValue::Uint(v) => Ok(v),
            other => Err(unexpected("uint", &other)),
        }
    }

    // ============================================
    // EVENT SCANNING
    // ============================================

    /// All `event` logs of `contract` from the configured start block to head
    pub async fn scan_events(
        &self,
        contract: ContractId,
        event: EventKind,
    ) -> ChainResult<Vec<EventRecord>> {
        let head = with_retry(&self.retry, "eth_blockNumber", || self.chain.block_number()).await?;
        self.scan_events_range(contract, event, self.logs.from_block, head)
            .await
    }

    /// Inclusive block range, split into `chunk_size` windows
    pub async fn scan_events_range(
        &self,
        contract: ContractId,
        event: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> ChainResult<Vec<EventRecord>> {
        if !event.emitted_by(contract) {
            return Err(ChainError::unknown_method(format!(
                "{} does not emit {}",
                contract,
                event.name()
            )));
        }

        let mut records = Vec::new();
        let span = self.logs.chunk_size.max(1);
        let mut start = from_block;

        while start <= to_block {
            let end = start.saturating_add(span - 1).min(to_block);
            let window = LogQuery {
                contract,
                event,
                from_block: start,
                to_block: end,
            };
            match self.log_window(&window).await? {
                ViewValue::Events(events) => records.extend(events),
                other => return Err(unexpected("events", &other)),
            }
            if end == u64::MAX {
                break;
            }
            start = end + 1;
        }

        debug!(
            "📜 {} {} events in blocks {}..={}",
            records.len(),
            event.name(),
            from_block,
            to_block
        );
        Ok(records)
    }

    /// Distinct addresses that ever claimed, harvested, stole or helped
    pub async fn discover_players(&self) -> ChainResult<Vec<Address>> {
        let head = with_retry(&self.retry, "eth_blockNumber", || self.chain.block_number()).await?;

        let mut players = BTreeSet::new();
        for event in PLAYER_EVENTS {
            let records = self
                .scan_events_range(ContractId::FarmGame, event, self.logs.from_block, head)
                .await?;
            for record in records {
                players.extend(record.event.participants());
            }
        }
        players.remove(&Address::ZERO);

        info!("👥 Discovered {} players up to block {}", players.len(), head);
        Ok(players.into_iter().collect())
    }

    /// Stats and KIND balance for each address, read with bounded concurrency
    pub async fn player_records(&self, players: &[Address]) -> ChainResult<Vec<PlayerStatRecord>> {
        let mut records: Vec<PlayerStatRecord> = stream::iter(players.iter().copied())
            .map(|player| async move {
                let (stats, kind) = try_join(self.player_stats(player), self.kind_balance(player)).await?;
                Ok::<_, ChainError>(PlayerStatRecord::new(player, &stats, kind))
            })
            .buffer_unordered(self.logs.max_concurrency.max(1))
            .try_collect()
            .await?;

        records.sort_by_key(|r| r.address);
        Ok(records)
    }

    // ============================================
    // LEADERBOARDS
    // ============================================

    pub async fn crop_leaderboard(&self, mine: Option<&str>) -> ChainResult<Leaderboard> {
        self.leaderboard(LeaderboardKind::Crops, mine).await
    }

    pub async fn kindness_leaderboard(&self, mine: Option<&str>) -> ChainResult<Leaderboard> {
        self.leaderboard(LeaderboardKind::Kindness, mine).await
    }

    async fn leaderboard(&self, kind: LeaderboardKind, mine: Option<&str>) -> ChainResult<Leaderboard> {
        let players = self.discover_players().await?;
        let records = self.player_records(&players).await?;
        let board = Leaderboard::build(&records, kind, &self.weights, mine);

        info!("🏆 {}: {} players", kind.title(), board.len());
        Ok(board)
    }

    pub async fn leaderboard_stats(&self) -> ChainResult<LeaderboardStats> {
        let players = self.discover_players().await?;
        let records = self.player_records(&players).await?;
        Ok(LeaderboardStats::from_records(&records))
    }
}

fn unexpected(expected: &str, got: &ViewValue) -> ChainError {
    ChainError::decode(format!("expected {} value, got {}", expected, got.kind()))
}
