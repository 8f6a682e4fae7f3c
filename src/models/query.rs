//! Query identity
//!
//! A `QueryKey` names one read: contract, method and ordered arguments.
//! `ReadCall` is the typed form of the same thing; both convert into each
//! other so generic `query(key)` calls and typed getters share cache slots.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::errors::{ChainError, ChainResult};
use crate::models::types::{BoosterType, CropType};
use crate::utils::decoder::{FarmGame, KindnessToken, SeedNFT, Shop};

/// The five game contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractId {
    FarmGame,
    LandNft,
    SeedNft,
    KindToken,
    Shop,
}

impl ContractId {
    pub const ALL: [ContractId; 5] = [
        Self::FarmGame,
        Self::LandNft,
        Self::SeedNft,
        Self::KindToken,
        Self::Shop,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FarmGame => "FarmGame",
            Self::LandNft => "LandNFT",
            Self::SeedNft => "SeedNFT",
            Self::KindToken => "KindnessToken",
            Self::Shop => "Shop",
        }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One positional argument of a read
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryArg {
    Uint(U256),
    Address(Address),
    Uint8(u8),
    Block(u64),
}

impl fmt::Display for QueryArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(v) => write!(f, "{}", v),
            Self::Address(a) => write!(f, "{:#x}", a),
            Self::Uint8(v) => write!(f, "{}", v),
            Self::Block(b) => write!(f, "#{}", b),
        }
    }
}

/// Cache and dedup key. Equal iff contract, method and args are all equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub contract: ContractId,
    pub method: String,
    pub args: Vec<QueryArg>,
}

impl QueryKey {
    pub fn new(contract: ContractId, method: impl Into<String>, args: Vec<QueryArg>) -> Self {
        Self {
            contract,
            method: method.into(),
            args,
        }
    }

    fn arg(&self, index: usize) -> ChainResult<&QueryArg> {
        self.args.get(index).ok_or_else(|| {
            ChainError::unknown_method(format!("{}: missing argument {}", self, index))
        })
    }

    fn uint_arg(&self, index: usize) -> ChainResult<U256> {
        match self.arg(index)? {
            QueryArg::Uint(v) => Ok(*v),
            QueryArg::Uint8(v) => Ok(U256::from(*v)),
            QueryArg::Block(v) => Ok(U256::from(*v)),
            other => Err(ChainError::unknown_method(format!(
                "{}: argument {} should be a uint, got {}",
                self, index, other
            ))),
        }
    }

    fn u8_arg(&self, index: usize) -> ChainResult<u8> {
        match self.arg(index)? {
            QueryArg::Uint8(v) => Ok(*v),
            QueryArg::Uint(v) => u8::try_from(*v).map_err(|_| {
                ChainError::unknown_method(format!("{}: argument {} exceeds uint8", self, index))
            }),
            other => Err(ChainError::unknown_method(format!(
                "{}: argument {} should be a uint8, got {}",
                self, index, other
            ))),
        }
    }

    fn address_arg(&self, index: usize) -> ChainResult<Address> {
        match self.arg(index)? {
            QueryArg::Address(a) => Ok(*a),
            other => Err(ChainError::unknown_method(format!(
                "{}: argument {} should be an address, got {}",
                self, index, other
            ))),
        }
    }

    fn block_arg(&self, index: usize) -> ChainResult<u64> {
        match self.arg(index)? {
            QueryArg::Block(b) => Ok(*b),
            other => Err(ChainError::unknown_method(format!(
                "{}: argument {} should be a block number, got {}",
                self, index, other
            ))),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.contract, self.method)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

// ============================================
// TYPED READS
// ============================================

/// Every read method the data layer knows how to encode and decode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadCall {
    // FarmGame
    PlayerStats { player: Address },
    RemainingDailyHelps { helper: Address },
    GameSeedPrice { crop: CropType },
    BoosterPrice { booster: BoosterType },
    GameSeedsForNative,
    GameSeedsForKind,
    DailyHelpLimit,
    MaxBoostersPerCrop,

    // LandNFT
    LandInfo { land_id: U256 },
    TotalLands,
    AvailableLands,
    WeatherForecast { land_id: U256 },
    LandBalance { owner: Address },
    LandOwner { land_id: U256 },
    CooldownPeriod,
    WeatherSegmentDuration,

    // SeedNFT
    SeedInfo { token_id: U256 },
    SeedBalance { owner: Address },
    SeedOwner { token_id: U256 },
    SeedSupply,

    // KindnessToken
    KindBalance { owner: Address },
    KindSupply,
    KindDecimals,

    // Shop
    ShopSeedPrice { crop: CropType },
    ShopSeedsForNative,
    ShopSeedsForKind,
    PurchaseCount { user: Address },
}

impl ReadCall {
    pub fn contract(&self) -> ContractId {
        match self {
            Self::PlayerStats { .. }
            | Self::RemainingDailyHelps { .. }
            | Self::GameSeedPrice { .. }
            | Self::BoosterPrice { .. }
            | Self::GameSeedsForNative
            | Self::GameSeedsForKind
            | Self::DailyHelpLimit
            | Self::MaxBoostersPerCrop => ContractId::FarmGame,
            Self::LandInfo { .. }
            | Self::TotalLands
            | Self::AvailableLands
            | Self::WeatherForecast { .. }
            | Self::LandBalance { .. }
            | Self::LandOwner { .. }
            | Self::CooldownPeriod
            | Self::WeatherSegmentDuration => ContractId::LandNft,
            Self::SeedInfo { .. }
            | Self::SeedBalance { .. }
            | Self::SeedOwner { .. }
            | Self::SeedSupply => ContractId::SeedNft,
            Self::KindBalance { .. } | Self::KindSupply | Self::KindDecimals => {
                ContractId::KindToken
            }
            Self::ShopSeedPrice { .. }
            | Self::ShopSeedsForNative
            | Self::ShopSeedsForKind
            | Self::PurchaseCount { .. } => ContractId::Shop,
        }
    }

    /// Solidity method name
    pub fn method(&self) -> &'static str {
        match self {
            Self::PlayerStats { .. } => "getPlayerStats",
            Self::RemainingDailyHelps { .. } => "getRemainingDailyHelps",
            Self::GameSeedPrice { .. } | Self::ShopSeedPrice { .. } => "getSeedPrice",
            Self::BoosterPrice { .. } => "getBoosterPrice",
            Self::GameSeedsForNative | Self::ShopSeedsForNative => "getAvailableSeedsForNative",
            Self::GameSeedsForKind | Self::ShopSeedsForKind => "getAvailableSeedsForKind",
            Self::DailyHelpLimit => "DAILY_HELP_LIMIT",
            Self::MaxBoostersPerCrop => "MAX_BOOSTERS_PER_CROP",
            Self::LandInfo { .. } => "getLandInfo",
            Self::TotalLands => "getTotalLands",
            Self::AvailableLands => "getAvailableLands",
            Self::WeatherForecast { .. } => "simulateWeatherForLand",
            Self::LandBalance { .. } | Self::SeedBalance { .. } | Self::KindBalance { .. } => {
                "balanceOf"
            }
            Self::LandOwner { .. } | Self::SeedOwner { .. } => "ownerOf",
            Self::CooldownPeriod => "COOLDOWN_PERIOD",
            Self::WeatherSegmentDuration => "WEATHER_SEGMENT_DURATION",
            Self::SeedInfo { .. } => "getSeedInfo",
            Self::SeedSupply | Self::KindSupply => "totalSupply",
            Self::KindDecimals => "decimals",
            Self::PurchaseCount { .. } => "getUserPurchaseCount",
        }
    }

    fn args(&self) -> Vec<QueryArg> {
        match self {
            Self::PlayerStats { player } => vec![QueryArg::Address(*player)],
            Self::RemainingDailyHelps { helper } => vec![QueryArg::Address(*helper)],
            Self::GameSeedPrice { crop } | Self::ShopSeedPrice { crop } => {
                vec![QueryArg::Uint8(crop.code())]
            }
            Self::BoosterPrice { booster } => vec![QueryArg::Uint8(booster.code())],
            Self::LandInfo { land_id }
            | Self::WeatherForecast { land_id }
            | Self::LandOwner { land_id } => vec![QueryArg::Uint(*land_id)],
            Self::SeedInfo { token_id } | Self::SeedOwner { token_id } => {
                vec![QueryArg::Uint(*token_id)]
            }
            Self::LandBalance { owner } | Self::SeedBalance { owner } | Self::KindBalance { owner } => {
                vec![QueryArg::Address(*owner)]
            }
            Self::PurchaseCount { user } => vec![QueryArg::Address(*user)],
            Self::GameSeedsForNative
            | Self::GameSeedsForKind
            | Self::DailyHelpLimit
            | Self::MaxBoostersPerCrop
            | Self::TotalLands
            | Self::AvailableLands
            | Self::CooldownPeriod
            | Self::WeatherSegmentDuration
            | Self::SeedSupply
            | Self::KindSupply
            | Self::KindDecimals
            | Self::ShopSeedsForNative
            | Self::ShopSeedsForKind => Vec::new(),
        }
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::new(self.contract(), self.method(), self.args())
    }

    /// Resolve a generic key back to a typed read
    pub fn from_key(key: &QueryKey) -> ChainResult<Self> {
        use ContractId::*;

        let call = match (key.contract, key.method.as_str()) {
            (FarmGame, "getPlayerStats") => Self::PlayerStats { player: key.address_arg(0)? },
            (FarmGame, "getRemainingDailyHelps") => Self::RemainingDailyHelps {
                helper: key.address_arg(0)?,
            },
            (FarmGame, "getSeedPrice") => Self::GameSeedPrice {
                crop: CropType::from_code(key.u8_arg(0)?),
            },
            (FarmGame, "getBoosterPrice") => Self::BoosterPrice {
                booster: BoosterType::from_code(key.u8_arg(0)?),
            },
            (FarmGame, "getAvailableSeedsForNative") => Self::GameSeedsForNative,
            (FarmGame, "getAvailableSeedsForKind") => Self::GameSeedsForKind,
            (FarmGame, "DAILY_HELP_LIMIT") => Self::DailyHelpLimit,
            (FarmGame, "MAX_BOOSTERS_PER_CROP") => Self::MaxBoostersPerCrop,

            (LandNft, "getLandInfo") => Self::LandInfo { land_id: key.uint_arg(0)? },
            (LandNft, "getTotalLands") => Self::TotalLands,
            (LandNft, "getAvailableLands") => Self::AvailableLands,
            (LandNft, "simulateWeatherForLand") => Self::WeatherForecast {
                land_id: key.uint_arg(0)?,
            },
            (LandNft, "balanceOf") => Self::LandBalance { owner: key.address_arg(0)? },
            (LandNft, "ownerOf") => Self::LandOwner { land_id: key.uint_arg(0)? },
            (LandNft, "COOLDOWN_PERIOD") => Self::CooldownPeriod,
            (LandNft, "WEATHER_SEGMENT_DURATION") => Self::WeatherSegmentDuration,

            (SeedNft, "getSeedInfo") => Self::SeedInfo { token_id: key.uint_arg(0)? },
            (SeedNft, "balanceOf") => Self::SeedBalance { owner: key.address_arg(0)? },
            (SeedNft, "ownerOf") => Self::SeedOwner { token_id: key.uint_arg(0)? },
            (SeedNft, "totalSupply") => Self::SeedSupply,

            (KindToken, "balanceOf") => Self::KindBalance { owner: key.address_arg(0)? },
            (KindToken, "totalSupply") => Self::KindSupply,
            (KindToken, "decimals") => Self::KindDecimals,

            (Shop, "getSeedPrice") => Self::ShopSeedPrice {
                crop: CropType::from_code(key.u8_arg(0)?),
            },
            (Shop, "getAvailableSeedsForNative") => Self::ShopSeedsForNative,
            (Shop, "getAvailableSeedsForKind") => Self::ShopSeedsForKind,
            (Shop, "getUserPurchaseCount") => Self::PurchaseCount { user: key.address_arg(0)? },

            _ => return Err(ChainError::unknown_method(format!("no read method {}", key))),
        };

        Ok(call)
    }
}

// ============================================
// EVENTS
// ============================================

/// Event shapes the layer can scan for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    LandClaimed,
    CropHarvested,
    CropStolen,
    HelpProvided,
    SeedPurchased,
    WeatherUpdated,
    BoosterApplied,
    GrowthStageUpdated,
    Transfer,
    Approval,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LandClaimed => "LandClaimed",
            Self::CropHarvested => "CropHarvested",
            Self::CropStolen => "CropStolen",
            Self::HelpProvided => "HelpProvided",
            Self::SeedPurchased => "SeedPurchased",
            Self::WeatherUpdated => "WeatherUpdated",
            Self::BoosterApplied => "BoosterApplied",
            Self::GrowthStageUpdated => "GrowthStageUpdated",
            Self::Transfer => "Transfer",
            Self::Approval => "Approval",
        }
    }

    /// Topic-0 hash as emitted by `contract`. The Shop's `SeedPurchased`
    /// also carries rarity, so its signature differs from the game's.
    /// ERC721 and ERC20 share the Transfer/Approval signatures.
    pub fn topic0(&self, contract: ContractId) -> B256 {
        match self {
            Self::LandClaimed => FarmGame::LandClaimed::SIGNATURE_HASH,
            Self::CropHarvested => FarmGame::CropHarvested::SIGNATURE_HASH,
            Self::CropStolen => FarmGame::CropStolen::SIGNATURE_HASH,
            Self::HelpProvided => FarmGame::HelpProvided::SIGNATURE_HASH,
            Self::SeedPurchased if contract == ContractId::Shop => Shop::SeedPurchased::SIGNATURE_HASH,
            Self::SeedPurchased => FarmGame::SeedPurchased::SIGNATURE_HASH,
            Self::WeatherUpdated => FarmGame::WeatherUpdated::SIGNATURE_HASH,
            Self::BoosterApplied => FarmGame::BoosterApplied::SIGNATURE_HASH,
            Self::GrowthStageUpdated => SeedNFT::GrowthStageUpdated::SIGNATURE_HASH,
            Self::Transfer => KindnessToken::Transfer::SIGNATURE_HASH,
            Self::Approval => KindnessToken::Approval::SIGNATURE_HASH,
        }
    }

    /// Whether `contract` emits this event
    pub fn emitted_by(&self, contract: ContractId) -> bool {
        match self {
            Self::LandClaimed
            | Self::CropHarvested
            | Self::CropStolen
            | Self::HelpProvided
            | Self::WeatherUpdated
            | Self::BoosterApplied => contract == ContractId::FarmGame,
            Self::SeedPurchased => matches!(contract, ContractId::FarmGame | ContractId::Shop),
            Self::GrowthStageUpdated => contract == ContractId::SeedNft,
            Self::Transfer | Self::Approval => matches!(
                contract,
                ContractId::LandNft | ContractId::SeedNft | ContractId::KindToken
            ),
        }
    }
}

/// One `eth_getLogs` window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogQuery {
    pub contract: ContractId,
    pub event: EventKind,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogQuery {
    /// Topic filter for this window
    pub fn topic0(&self) -> B256 {
        self.event.topic0(self.contract)
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::new(
            self.contract,
            self.event.name(),
            vec![QueryArg::Block(self.from_block), QueryArg::Block(self.to_block)],
        )
    }

    pub fn from_key(key: &QueryKey) -> ChainResult<Self> {
        let event = [
            EventKind::LandClaimed,
            EventKind::CropHarvested,
            EventKind::CropStolen,
            EventKind::HelpProvided,
            EventKind::SeedPurchased,
            EventKind::WeatherUpdated,
            EventKind::BoosterApplied,
            EventKind::GrowthStageUpdated,
            EventKind::Transfer,
            EventKind::Approval,
        ]
        .into_iter()
        .find(|e| e.name() == key.method && e.emitted_by(key.contract))
        .ok_or_else(|| ChainError::unknown_method(format!("no event {}", key)))?;

        Ok(Self {
            contract: key.contract,
            event,
            from_block: key.block_arg(0)?,
            to_block: key.block_arg(1)?,
        })
    }
}

/// Raw log entry as returned by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: alloy_primitives::Bytes,
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
}
