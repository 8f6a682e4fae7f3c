//! ABI codec module
//! Encodes typed reads into calldata and decodes return data, logs and
//! revert payloads into view models.
//!
//! Contract enums are declared as `uint8` so codes added by a contract
//! upgrade still decode (they map to `Unknown(code)`).

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{decode_revert_reason, sol, SolCall, SolEvent};

use crate::models::errors::{ChainError, ChainResult};
use crate::models::query::{ReadCall, RawLog};
use crate::models::types::{
    BoosterType, CropType, EventRecord, FarmEvent, GrowthStage, LandInfo, LandState, PlayerStats,
    PriceQuote, Rarity, SeedInfo, ViewValue, WeatherSlot, WeatherType,
};

sol! {
    interface FarmGame {
        struct PlayerStats {
            uint256 totalCropsHarvested;
            uint256 totalCropsStolen;
            uint256 totalHelpProvided;
        }

        struct SeedPrice {
            uint256 nativePrice;
            uint256 kindPrice;
            bool availableForNative;
            bool availableForKind;
        }

        struct BoosterPrice {
            uint256 nativePrice;
            uint256 kindPrice;
            bool availableForNative;
            bool availableForKind;
        }

        function DAILY_HELP_LIMIT() external view returns (uint256);
        function MAX_BOOSTERS_PER_CROP() external view returns (uint256);
        function getPlayerStats(address player) external view returns (PlayerStats memory);
        function getRemainingDailyHelps(address helper) external view returns (uint256);
        function getSeedPrice(uint8 cropType) external view returns (SeedPrice memory);
        function getBoosterPrice(uint8 boosterType) external view returns (BoosterPrice memory);
        function getAvailableSeedsForNative() external view returns (uint8[] memory);
        function getAvailableSeedsForKind() external view returns (uint8[] memory);

        event LandClaimed(address indexed player, uint256 indexed landId, uint256 indexed tokenId);
        event CropHarvested(address indexed player, uint256 indexed landId, uint256 indexed seedTokenId);
        event CropStolen(address indexed thief, address indexed victim, uint256 indexed landId, uint256 seedTokenId);
        event HelpProvided(address indexed helper, address indexed helped, uint256 indexed landId, uint8 boosterType);
        event SeedPurchased(address indexed buyer, uint8 cropType, uint256 tokenId, bool paidWithKind, uint256 price);
        event WeatherUpdated(uint256 indexed landId, uint256 weatherSeed);
        event BoosterApplied(address indexed player, uint256 indexed landId, uint8 boosterType);
    }

    interface LandNFT {
        struct LandInfo {
            uint8 state;
            uint256 seedTokenId;
            uint256 claimTime;
            uint256 lockEndTime;
            uint256 weatherSeed;
            uint256 lastWeatherUpdateTime;
            uint256 accumulatedGrowth;
            address currentFarmer;
        }

        function getLandInfo(uint256 landId) external view returns (LandInfo memory);
        function getTotalLands() external view returns (uint256);
        function getAvailableLands() external view returns (uint256[] memory);
        function simulateWeatherForLand(uint256 landId) external view returns (uint8[] memory, uint256[] memory);
        function balanceOf(address owner) external view returns (uint256);
        function ownerOf(uint256 tokenId) external view returns (address);
        function COOLDOWN_PERIOD() external view returns (uint256);
        function WEATHER_SEGMENT_DURATION() external view returns (uint256);
    }

    interface SeedNFT {
        struct SeedInfo {
            uint8 cropType;
            uint8 rarity;
            uint8 growthStage;
            uint256 growthStartTime;
            uint256 baseGrowthTime;
            uint256 maturedAt;
            uint8 boostersApplied;
        }

        function getSeedInfo(uint256 tokenId) external view returns (SeedInfo memory);
        function balanceOf(address owner) external view returns (uint256);
        function ownerOf(uint256 tokenId) external view returns (address);
        function totalSupply() external view returns (uint256);

        event GrowthStageUpdated(uint256 indexed tokenId, uint8 newStage);
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
        event Approval(address indexed owner, address indexed approved, uint256 indexed tokenId);
    }

    interface KindnessToken {
        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function decimals() external view returns (uint8);

        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);
    }

    interface Shop {
        struct SeedPrice {
            uint256 nativePrice;
            uint256 kindPrice;
            bool availableForNative;
            bool availableForKind;
        }

        function getSeedPrice(uint8 cropType) external view returns (SeedPrice memory);
        function getAvailableSeedsForNative() external view returns (uint8[] memory);
        function getAvailableSeedsForKind() external view returns (uint8[] memory);
        function getUserPurchaseCount(address user) external view returns (uint256);

        event SeedPurchased(address indexed buyer, uint8 cropType, uint8 rarity, uint256 tokenId, bool paidWithKind, uint256 price);
    }
}

/// Codec between typed reads and raw contract data
pub struct FarmDecoder;

impl FarmDecoder {
    /// Calldata for a read
    pub fn encode_call(call: &ReadCall) -> Bytes {
        let data = match call {
            ReadCall::PlayerStats { player } => {
                FarmGame::getPlayerStatsCall { player: *player }.abi_encode()
            }
            ReadCall::RemainingDailyHelps { helper } => {
                FarmGame::getRemainingDailyHelpsCall { helper: *helper }.abi_encode()
            }
            ReadCall::GameSeedPrice { crop } => {
                FarmGame::getSeedPriceCall { cropType: crop.code() }.abi_encode()
            }
            ReadCall::BoosterPrice { booster } => {
                FarmGame::getBoosterPriceCall { boosterType: booster.code() }.abi_encode()
            }
            ReadCall::GameSeedsForNative => FarmGame::getAvailableSeedsForNativeCall {}.abi_encode(),
            ReadCall::GameSeedsForKind => FarmGame::getAvailableSeedsForKindCall {}.abi_encode(),
            ReadCall::DailyHelpLimit => FarmGame::DAILY_HELP_LIMITCall {}.abi_encode(),
            ReadCall::MaxBoostersPerCrop => FarmGame::MAX_BOOSTERS_PER_CROPCall {}.abi_encode(),

            ReadCall::LandInfo { land_id } => {
                LandNFT::getLandInfoCall { landId: *land_id }.abi_encode()
            }
            ReadCall::TotalLands => LandNFT::getTotalLandsCall {}.abi_encode(),
            ReadCall::AvailableLands => LandNFT::getAvailableLandsCall {}.abi_encode(),
            ReadCall::WeatherForecast { land_id } => {
                LandNFT::simulateWeatherForLandCall { landId: *land_id }.abi_encode()
            }
            ReadCall::LandBalance { owner } => LandNFT::balanceOfCall { owner: *owner }.abi_encode(),
            ReadCall::LandOwner { land_id } => {
                LandNFT::ownerOfCall { tokenId: *land_id }.abi_encode()
            }
            ReadCall::CooldownPeriod => LandNFT::COOLDOWN_PERIODCall {}.abi_encode(),
            ReadCall::WeatherSegmentDuration => {
                LandNFT::WEATHER_SEGMENT_DURATIONCall {}.abi_encode()
            }

            ReadCall::SeedInfo { token_id } => {
                SeedNFT::getSeedInfoCall { tokenId: *token_id }.abi_encode()
            }
            ReadCall::SeedBalance { owner } => SeedNFT::balanceOfCall { owner: *owner }.abi_encode(),
            ReadCall::SeedOwner { token_id } => {
                SeedNFT::ownerOfCall { tokenId: *token_id }.abi_encode()
            }
            ReadCall::SeedSupply => SeedNFT::totalSupplyCall {}.abi_encode(),

            ReadCall::KindBalance { owner } => {
                KindnessToken::balanceOfCall { account: *owner }.abi_encode()
            }
            ReadCall::KindSupply => KindnessToken::totalSupplyCall {}.abi_encode(),
            ReadCall::KindDecimals => KindnessToken::decimalsCall {}.abi_encode(),

            ReadCall::ShopSeedPrice { crop } => {
                Shop::getSeedPriceCall { cropType: crop.code() }.abi_encode()
            }
            ReadCall::ShopSeedsForNative => Shop::getAvailableSeedsForNativeCall {}.abi_encode(),
            ReadCall::ShopSeedsForKind => Shop::getAvailableSeedsForKindCall {}.abi_encode(),
            ReadCall::PurchaseCount { user } => {
                Shop::getUserPurchaseCountCall { user: *user }.abi_encode()
            }
        };

        Bytes::from(data)
    }

    /// Decode `eth_call` return data into a view model
    pub fn decode_return(call: &ReadCall, data: &[u8]) -> ChainResult<ViewValue> {
        let fail = |e: alloy_sol_types::Error| {
            ChainError::decode(format!("{}.{}: {}", call.contract(), call.method(), e))
        };

        let value = match call {
            ReadCall::PlayerStats { .. } => {
                let ret = FarmGame::getPlayerStatsCall::abi_decode_returns(data, true).map_err(fail)?;
                ViewValue::PlayerStats(PlayerStats {
                    total_crops_harvested: ret._0.totalCropsHarvested,
                    total_crops_stolen: ret._0.totalCropsStolen,
                    total_help_provided: ret._0.totalHelpProvided,
                })
            }
            ReadCall::RemainingDailyHelps { .. } => ViewValue::Uint(
                FarmGame::getRemainingDailyHelpsCall::abi_decode_returns(data, true)
                    .map_err(fail)?
                    ._0,
            ),
            ReadCall::GameSeedPrice { .. } => {
                let p = FarmGame::getSeedPriceCall::abi_decode_returns(data, true).map_err(fail)?._0;
                ViewValue::Price(PriceQuote {
                    native_price: p.nativePrice,
                    kind_price: p.kindPrice,
                    available_for_native: p.availableForNative,
                    available_for_kind: p.availableForKind,
                })
            }
            ReadCall::BoosterPrice { .. } => {
                let p = FarmGame::getBoosterPriceCall::abi_decode_returns(data, true).map_err(fail)?._0;
                ViewValue::Price(PriceQuote {
                    native_price: p.nativePrice,
                    kind_price: p.kindPrice,
                    available_for_native: p.availableForNative,
                    available_for_kind: p.availableForKind,
                })
            }
            ReadCall::GameSeedsForNative => crops(
                FarmGame::getAvailableSeedsForNativeCall::abi_decode_returns(data, true)
                    .map_err(fail)?
                    ._0,
            ),
            ReadCall::GameSeedsForKind => crops(
                FarmGame::getAvailableSeedsForKindCall::abi_decode_returns(data, true)
                    .map_err(fail)?
                    ._0,
            ),
            ReadCall::DailyHelpLimit => ViewValue::Uint(
                FarmGame::DAILY_HELP_LIMITCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
            ReadCall::MaxBoostersPerCrop => ViewValue::Uint(
                FarmGame::MAX_BOOSTERS_PER_CROPCall::abi_decode_returns(data, true)
                    .map_err(fail)?
                    ._0,
            ),

            ReadCall::LandInfo { .. } => {
                let l = LandNFT::getLandInfoCall::abi_decode_returns(data, true).map_err(fail)?._0;
                ViewValue::Land(LandInfo {
                    state: LandState::from_code(l.state),
                    seed_token_id: l.seedTokenId,
                    claim_time: l.claimTime,
                    lock_end_time: l.lockEndTime,
                    weather_seed: l.weatherSeed,
                    last_weather_update_time: l.lastWeatherUpdateTime,
                    accumulated_growth: l.accumulatedGrowth,
                    current_farmer: l.currentFarmer,
                })
            }
            ReadCall::TotalLands => ViewValue::Uint(
                LandNFT::getTotalLandsCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
            ReadCall::AvailableLands => ViewValue::Uints(
                LandNFT::getAvailableLandsCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
            ReadCall::WeatherForecast { .. } => {
                let ret = LandNFT::simulateWeatherForLandCall::abi_decode_returns(data, true)
                    .map_err(fail)?;
                if ret._0.len() != ret._1.len() {
                    return Err(ChainError::decode(format!(
                        "weather forecast has {} types but {} timestamps",
                        ret._0.len(),
                        ret._1.len()
                    )));
                }
                ViewValue::Weather(
                    ret._0
                        .into_iter()
                        .zip(ret._1)
                        .map(|(code, starts_at)| WeatherSlot {
                            weather: WeatherType::from_code(code),
                            starts_at,
                        })
                        .collect(),
                )
            }
            ReadCall::LandBalance { .. } => ViewValue::Uint(
                LandNFT::balanceOfCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
            ReadCall::LandOwner { .. } => ViewValue::Address(
                LandNFT::ownerOfCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
            ReadCall::CooldownPeriod => ViewValue::Uint(
                LandNFT::COOLDOWN_PERIODCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
            ReadCall::WeatherSegmentDuration => ViewValue::Uint(
                LandNFT::WEATHER_SEGMENT_DURATIONCall::abi_decode_returns(data, true)
                    .map_err(fail)?
                    ._0,
            ),

            ReadCall::SeedInfo { .. } => {
                let s = SeedNFT::getSeedInfoCall::abi_decode_returns(data, true).map_err(fail)?._0;
                ViewValue::Seed(SeedInfo {
                    crop_type: CropType::from_code(s.cropType),
                    rarity: Rarity::from_code(s.rarity),
                    growth_stage: GrowthStage::from_code(s.growthStage),
                    growth_start_time: s.growthStartTime,
                    base_growth_time: s.baseGrowthTime,
                    matured_at: s.maturedAt,
                    boosters_applied: s.boostersApplied,
                })
            }
            ReadCall::SeedBalance { .. } => ViewValue::Uint(
                SeedNFT::balanceOfCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
            ReadCall::SeedOwner { .. } => ViewValue::Address(
                SeedNFT::ownerOfCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
            ReadCall::SeedSupply => ViewValue::Uint(
                SeedNFT::totalSupplyCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),

            ReadCall::KindBalance { .. } => ViewValue::Uint(
                KindnessToken::balanceOfCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
            ReadCall::KindSupply => ViewValue::Uint(
                KindnessToken::totalSupplyCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
            ReadCall::KindDecimals => ViewValue::Uint(U256::from(
                KindnessToken::decimalsCall::abi_decode_returns(data, true).map_err(fail)?._0,
            )),

            ReadCall::ShopSeedPrice { .. } => {
                let p = Shop::getSeedPriceCall::abi_decode_returns(data, true).map_err(fail)?._0;
                ViewValue::Price(PriceQuote {
                    native_price: p.nativePrice,
                    kind_price: p.kindPrice,
                    available_for_native: p.availableForNative,
                    available_for_kind: p.availableForKind,
                })
            }
            ReadCall::ShopSeedsForNative => crops(
                Shop::getAvailableSeedsForNativeCall::abi_decode_returns(data, true)
                    .map_err(fail)?
                    ._0,
            ),
            ReadCall::ShopSeedsForKind => crops(
                Shop::getAvailableSeedsForKindCall::abi_decode_returns(data, true)
                    .map_err(fail)?
                    ._0,
            ),
            ReadCall::PurchaseCount { .. } => ViewValue::Uint(
                Shop::getUserPurchaseCountCall::abi_decode_returns(data, true).map_err(fail)?._0,
            ),
        };

        Ok(value)
    }

    /// Decode a raw log. Returns None for logs this layer does not model.
    pub fn decode_event(log: &RawLog) -> Option<EventRecord> {
        let topic0 = *log.topics.first()?;
        let topics = log.topics.iter().copied();
        let data = log.data.as_ref();

        let event = if topic0 == FarmGame::LandClaimed::SIGNATURE_HASH {
            let e = FarmGame::LandClaimed::decode_raw_log(topics, data, true).ok()?;
            FarmEvent::LandClaimed {
                player: e.player,
                land_id: e.landId,
                token_id: e.tokenId,
            }
        } else if topic0 == FarmGame::CropHarvested::SIGNATURE_HASH {
            let e = FarmGame::CropHarvested::decode_raw_log(topics, data, true).ok()?;
            FarmEvent::CropHarvested {
                player: e.player,
                land_id: e.landId,
                seed_token_id: e.seedTokenId,
            }
        } else if topic0 == FarmGame::CropStolen::SIGNATURE_HASH {
            let e = FarmGame::CropStolen::decode_raw_log(topics, data, true).ok()?;
            FarmEvent::CropStolen {
                thief: e.thief,
                victim: e.victim,
                land_id: e.landId,
                seed_token_id: e.seedTokenId,
            }
        } else if topic0 == FarmGame::HelpProvided::SIGNATURE_HASH {
            let e = FarmGame::HelpProvided::decode_raw_log(topics, data, true).ok()?;
            FarmEvent::HelpProvided {
                helper: e.helper,
                helped: e.helped,
                land_id: e.landId,
                booster: BoosterType::from_code(e.boosterType),
            }
        } else if topic0 == FarmGame::SeedPurchased::SIGNATURE_HASH {
            let e = FarmGame::SeedPurchased::decode_raw_log(topics, data, true).ok()?;
            FarmEvent::SeedPurchased {
                buyer: e.buyer,
                crop: CropType::from_code(e.cropType),
                rarity: None,
                token_id: e.tokenId,
                paid_with_kind: e.paidWithKind,
                price: e.price,
            }
        } else if topic0 == Shop::SeedPurchased::SIGNATURE_HASH {
            let e = Shop::SeedPurchased::decode_raw_log(topics, data, true).ok()?;
            FarmEvent::SeedPurchased {
                buyer: e.buyer,
                crop: CropType::from_code(e.cropType),
                rarity: Some(Rarity::from_code(e.rarity)),
                token_id: e.tokenId,
                paid_with_kind: e.paidWithKind,
                price: e.price,
            }
        } else if topic0 == FarmGame::WeatherUpdated::SIGNATURE_HASH {
            let e = FarmGame::WeatherUpdated::decode_raw_log(topics, data, true).ok()?;
            FarmEvent::WeatherUpdated {
                land_id: e.landId,
                weather_seed: e.weatherSeed,
            }
        } else if topic0 == FarmGame::BoosterApplied::SIGNATURE_HASH {
            let e = FarmGame::BoosterApplied::decode_raw_log(topics, data, true).ok()?;
            FarmEvent::BoosterApplied {
                player: e.player,
                land_id: e.landId,
                booster: BoosterType::from_code(e.boosterType),
            }
        } else if topic0 == SeedNFT::GrowthStageUpdated::SIGNATURE_HASH {
            let e = SeedNFT::GrowthStageUpdated::decode_raw_log(topics, data, true).ok()?;
            FarmEvent::GrowthStageUpdated {
                token_id: e.tokenId,
                stage: GrowthStage::from_code(e.newStage),
            }
        } else if topic0 == KindnessToken::Transfer::SIGNATURE_HASH {
            // ERC721 indexes the token id (4 topics), ERC20 puts the amount in data
            if log.topics.len() == 4 {
                let e = SeedNFT::Transfer::decode_raw_log(topics, data, true).ok()?;
                FarmEvent::Transfer { from: e.from, to: e.to, value: e.tokenId }
            } else {
                let e = KindnessToken::Transfer::decode_raw_log(topics, data, true).ok()?;
                FarmEvent::Transfer { from: e.from, to: e.to, value: e.value }
            }
        } else if topic0 == KindnessToken::Approval::SIGNATURE_HASH {
            if log.topics.len() == 4 {
                let e = SeedNFT::Approval::decode_raw_log(topics, data, true).ok()?;
                FarmEvent::Approval { owner: e.owner, spender: e.approved, value: e.tokenId }
            } else {
                let e = KindnessToken::Approval::decode_raw_log(topics, data, true).ok()?;
                FarmEvent::Approval { owner: e.owner, spender: e.spender, value: e.value }
            }
        } else {
            return None;
        };

        Some(EventRecord {
            block_number: log.block_number,
            log_index: log.log_index,
            event,
        })
    }

    /// Turn revert data into a (translated) revert error
    pub fn decode_revert(data: &[u8]) -> ChainError {
        match decode_revert_reason(data) {
            Some(reason) => ChainError::reverted(&reason),
            None if data.is_empty() => ChainError::reverted("execution reverted"),
            None => ChainError::reverted(&format!("execution reverted: 0x{}", hex::encode(data))),
        }
    }
}

fn crops(codes: Vec<u8>) -> ViewValue {
    ViewValue::Crops(codes.into_iter().map(CropType::from_code).collect())
}
