//! Type definitions for decoded contract state
//!
//! Contract enums arrive as raw `uint8` codes. Each one is modelled as a
//! closed set of named variants plus `Unknown(code)`, so a contract upgrade
//! that adds a code degrades to "unknown" instead of failing the decode.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

// ============================================
// CONTRACT ENUMS
// ============================================

/// `LandNFT.LandState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LandState {
    /// Free to claim
    Idle,
    /// A seed is planted and growing
    Growing,
    /// Crop is mature and can be harvested (or stolen)
    Ripe,
    /// Cooling down after a harvest until `lock_end_time`
    LockedIdle,
    Unknown(u8),
}

impl LandState {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Idle,
            1 => Self::Growing,
            2 => Self::Ripe,
            3 => Self::LockedIdle,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Growing => 1,
            Self::Ripe => 2,
            Self::LockedIdle => 3,
            Self::Unknown(code) => *code,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Growing => "growing",
            Self::Ripe => "ripe",
            Self::LockedIdle => "locked",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// `SeedNFT.CropType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropType {
    Wheat,
    Corn,
    Pumpkin,
    Strawberry,
    Grape,
    Watermelon,
    Unknown(u8),
}

impl CropType {
    /// Every defined crop, in code order
    pub const ALL: [CropType; 6] = [
        Self::Wheat,
        Self::Corn,
        Self::Pumpkin,
        Self::Strawberry,
        Self::Grape,
        Self::Watermelon,
    ];

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Wheat,
            1 => Self::Corn,
            2 => Self::Pumpkin,
            3 => Self::Strawberry,
            4 => Self::Grape,
            5 => Self::Watermelon,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Wheat => 0,
            Self::Corn => 1,
            Self::Pumpkin => 2,
            Self::Strawberry => 3,
            Self::Grape => 4,
            Self::Watermelon => 5,
            Self::Unknown(code) => *code,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wheat => "wheat",
            Self::Corn => "corn",
            Self::Pumpkin => "pumpkin",
            Self::Strawberry => "strawberry",
            Self::Grape => "grape",
            Self::Watermelon => "watermelon",
            Self::Unknown(_) => "unknown",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Wheat => "🌾",
            Self::Corn => "🌽",
            Self::Pumpkin => "🎃",
            Self::Strawberry => "🍓",
            Self::Grape => "🍇",
            Self::Watermelon => "🍉",
            Self::Unknown(_) => "❓",
        }
    }
}

/// `SeedNFT.Rarity`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
    Unknown(u8),
}

impl Rarity {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Common,
            1 => Self::Rare,
            2 => Self::Legendary,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Common => 0,
            Self::Rare => 1,
            Self::Legendary => 2,
            Self::Unknown(code) => *code,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Legendary => "legendary",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// `SeedNFT.GrowthStage`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrowthStage {
    Seed,
    Growing,
    Mature,
    Unknown(u8),
}

impl GrowthStage {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Seed,
            1 => Self::Growing,
            2 => Self::Mature,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Seed => 0,
            Self::Growing => 1,
            Self::Mature => 2,
            Self::Unknown(code) => *code,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Growing => "growing",
            Self::Mature => "mature",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// `LandNFT.WeatherType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherType {
    Sunny,
    Rainy,
    Cloudy,
    Stormy,
    Unknown(u8),
}

impl WeatherType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Sunny,
            1 => Self::Rainy,
            2 => Self::Cloudy,
            3 => Self::Stormy,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Sunny => 0,
            Self::Rainy => 1,
            Self::Cloudy => 2,
            Self::Stormy => 3,
            Self::Unknown(code) => *code,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Sunny => "☀️",
            Self::Rainy => "🌧️",
            Self::Cloudy => "☁️",
            Self::Stormy => "⛈️",
            Self::Unknown(_) => "❓",
        }
    }
}

/// `FarmGame.BoosterType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoosterType {
    Watering,
    Fertilizing,
    Unknown(u8),
}

impl BoosterType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Watering,
            1 => Self::Fertilizing,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Watering => 0,
            Self::Fertilizing => 1,
            Self::Unknown(code) => *code,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Watering => "watering",
            Self::Fertilizing => "fertilizing",
            Self::Unknown(_) => "unknown",
        }
    }
}

// ============================================
// DECODED RECORDS
// ============================================

/// Snapshot of `LandNFT.getLandInfo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandInfo {
    pub state: LandState,
    pub seed_token_id: U256,
    pub claim_time: U256,
    pub lock_end_time: U256,
    pub weather_seed: U256,
    pub last_weather_update_time: U256,
    pub accumulated_growth: U256,
    pub current_farmer: Address,
}

impl LandInfo {
    pub fn is_ripe(&self) -> bool {
        self.state == LandState::Ripe
    }

    /// Claimable now: idle, or locked with the cooldown already over
    pub fn is_claimable(&self, now_secs: u64) -> bool {
        match self.state {
            LandState::Idle => true,
            LandState::LockedIdle => self.lock_end_time <= U256::from(now_secs),
            _ => false,
        }
    }

    /// Seconds left on the post-harvest lock (zero when unlocked)
    pub fn lock_remaining_secs(&self, now_secs: u64) -> U256 {
        self.lock_end_time.saturating_sub(U256::from(now_secs))
    }
}

/// Snapshot of `SeedNFT.getSeedInfo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedInfo {
    pub crop_type: CropType,
    pub rarity: Rarity,
    pub growth_stage: GrowthStage,
    pub growth_start_time: U256,
    pub base_growth_time: U256,
    pub matured_at: U256,
    pub boosters_applied: u8,
}

impl SeedInfo {
    pub fn is_mature(&self) -> bool {
        self.growth_stage == GrowthStage::Mature
    }
}

/// `FarmGame.getPlayerStats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub total_crops_harvested: U256,
    pub total_crops_stolen: U256,
    pub total_help_provided: U256,
}

/// Seed or booster price as quoted by the shop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub native_price: U256,
    pub kind_price: U256,
    pub available_for_native: bool,
    pub available_for_kind: bool,
}

/// One segment of `LandNFT.simulateWeatherForLand`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSlot {
    pub weather: WeatherType,
    pub starts_at: U256,
}

// ============================================
// EVENTS
// ============================================

/// Decoded game event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FarmEvent {
    LandClaimed {
        player: Address,
        land_id: U256,
        token_id: U256,
    },
    CropHarvested {
        player: Address,
        land_id: U256,
        seed_token_id: U256,
    },
    CropStolen {
        thief: Address,
        victim: Address,
        land_id: U256,
        seed_token_id: U256,
    },
    HelpProvided {
        helper: Address,
        helped: Address,
        land_id: U256,
        booster: BoosterType,
    },
    SeedPurchased {
        buyer: Address,
        crop: CropType,
        /// Only the Shop's event reports rarity
        rarity: Option<Rarity>,
        token_id: U256,
        paid_with_kind: bool,
        price: U256,
    },
    WeatherUpdated {
        land_id: U256,
        weather_seed: U256,
    },
    BoosterApplied {
        player: Address,
        land_id: U256,
        booster: BoosterType,
    },
    GrowthStageUpdated {
        token_id: U256,
        stage: GrowthStage,
    },
    /// ERC721 token id or ERC20 amount, depending on the emitting contract
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    Approval {
        owner: Address,
        spender: Address,
        value: U256,
    },
}

impl FarmEvent {
    /// Player addresses that took part in this event
    pub fn participants(&self) -> Vec<Address> {
        match self {
            Self::LandClaimed { player, .. }
            | Self::CropHarvested { player, .. }
            | Self::BoosterApplied { player, .. } => vec![*player],
            Self::CropStolen { thief, victim, .. } => vec![*thief, *victim],
            Self::HelpProvided { helper, helped, .. } => vec![*helper, *helped],
            Self::SeedPurchased { buyer, .. } => vec![*buyer],
            Self::Transfer { from, to, .. } => vec![*from, *to],
            Self::Approval { owner, .. } => vec![*owner],
            Self::WeatherUpdated { .. } | Self::GrowthStageUpdated { .. } => Vec::new(),
        }
    }
}

/// Event plus its position in the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
    pub event: FarmEvent,
}

/// Decoded value of any cached query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewValue {
    Land(LandInfo),
    Seed(SeedInfo),
    PlayerStats(PlayerStats),
    Price(PriceQuote),
    Uint(U256),
    Address(Address),
    Text(String),
    Uints(Vec<U256>),
    Crops(Vec<CropType>),
    Weather(Vec<WeatherSlot>),
    Events(Vec<EventRecord>),
}

impl ViewValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Land(_) => "land",
            Self::Seed(_) => "seed",
            Self::PlayerStats(_) => "player_stats",
            Self::Price(_) => "price",
            Self::Uint(_) => "uint",
            Self::Address(_) => "address",
            Self::Text(_) => "text",
            Self::Uints(_) => "uints",
            Self::Crops(_) => "crops",
            Self::Weather(_) => "weather",
            Self::Events(_) => "events",
        }
    }
}

// ============================================
// LEADERBOARD RECORDS
// ============================================

/// Per-player inputs to the leaderboards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatRecord {
    pub address: Address,
    pub crops_harvested: U256,
    pub crops_stolen: U256,
    pub help_provided: U256,
    pub kind_balance: U256,
}

impl PlayerStatRecord {
    pub fn new(address: Address, stats: &PlayerStats, kind_balance: U256) -> Self {
        Self {
            address,
            crops_harvested: stats.total_crops_harvested,
            crops_stolen: stats.total_crops_stolen,
            help_provided: stats.total_help_provided,
            kind_balance,
        }
    }

    /// Field-wise maximum of two snapshots of the same player
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            address: self.address,
            crops_harvested: self.crops_harvested.max(other.crops_harvested),
            crops_stolen: self.crops_stolen.max(other.crops_stolen),
            help_provided: self.help_provided.max(other.help_provided),
            kind_balance: self.kind_balance.max(other.kind_balance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defined_codes_round_trip() {
        for code in 0..=3u8 {
            assert_eq!(LandState::from_code(code).code(), code);
            assert!(!matches!(LandState::from_code(code), LandState::Unknown(_)));
            assert!(!matches!(WeatherType::from_code(code), WeatherType::Unknown(_)));
        }
        for crop in CropType::ALL {
            assert_eq!(CropType::from_code(crop.code()), crop);
        }
        for code in 0..=2u8 {
            assert!(!matches!(Rarity::from_code(code), Rarity::Unknown(_)));
            assert!(!matches!(GrowthStage::from_code(code), GrowthStage::Unknown(_)));
        }
        assert_eq!(BoosterType::from_code(0), BoosterType::Watering);
        assert_eq!(BoosterType::from_code(1), BoosterType::Fertilizing);
    }

    #[test]
    fn test_undefined_codes_are_unknown() {
        assert_eq!(LandState::from_code(4), LandState::Unknown(4));
        assert_eq!(CropType::from_code(6), CropType::Unknown(6));
        assert_eq!(CropType::from_code(255), CropType::Unknown(255));
        assert_eq!(Rarity::from_code(3), Rarity::Unknown(3));
        assert_eq!(GrowthStage::from_code(9), GrowthStage::Unknown(9));
        assert_eq!(WeatherType::from_code(4), WeatherType::Unknown(4));
        assert_eq!(BoosterType::from_code(2), BoosterType::Unknown(2));
        // Unknown keeps the raw code
        assert_eq!(CropType::Unknown(42).code(), 42);
    }

    #[test]
    fn test_land_lock() {
        let land = LandInfo {
            state: LandState::LockedIdle,
            seed_token_id: U256::ZERO,
            claim_time: U256::ZERO,
            lock_end_time: U256::from(1_000u64),
            weather_seed: U256::ZERO,
            last_weather_update_time: U256::ZERO,
            accumulated_growth: U256::ZERO,
            current_farmer: Address::ZERO,
        };
        assert!(!land.is_claimable(999));
        assert!(land.is_claimable(1_000));
        assert_eq!(land.lock_remaining_secs(400), U256::from(600u64));
        assert_eq!(land.lock_remaining_secs(5_000), U256::ZERO);
    }

    #[test]
    fn test_record_merge_is_symmetric() {
        let a = PlayerStatRecord {
            address: Address::repeat_byte(1),
            crops_harvested: U256::from(3u64),
            crops_stolen: U256::from(9u64),
            help_provided: U256::ZERO,
            kind_balance: U256::from(5u64),
        };
        let b = PlayerStatRecord {
            crops_harvested: U256::from(7u64),
            crops_stolen: U256::from(1u64),
            ..a.clone()
        };
        assert_eq!(a.merge(&b), b.merge(&a));
        assert_eq!(a.merge(&b).crops_harvested, U256::from(7u64));
        assert_eq!(a.merge(&b).crops_stolen, U256::from(9u64));
    }
}
