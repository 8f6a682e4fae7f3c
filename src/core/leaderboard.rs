//! Leaderboard Module
//! Scores and ranks per-player records into crop and kindness leaderboards.
//!
//! Ranking is a total order: score descending, then address ascending.
//! Ranks are positions 1..N; tied scores never share a rank.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::types::PlayerStatRecord;
use crate::utils::constants::{DEFAULT_HARVEST_WEIGHT, DEFAULT_STEAL_WEIGHT, KIND_DECIMALS};
use crate::utils::format::{format_count, format_token_amount, rank_badge, short_address};

/// Crop score weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Points per harvested crop
    pub harvest: u64,
    /// Points per stolen crop
    pub steal: u64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            harvest: DEFAULT_HARVEST_WEIGHT,
            steal: DEFAULT_STEAL_WEIGHT,
        }
    }
}

impl ScoringWeights {
    /// `harvested * harvest + stolen * steal`, saturating at U256::MAX
    pub fn crop_score(&self, record: &PlayerStatRecord) -> U256 {
        record
            .crops_harvested
            .saturating_mul(U256::from(self.harvest))
            .saturating_add(record.crops_stolen.saturating_mul(U256::from(self.steal)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaderboardKind {
    /// Harvest and steal activity
    Crops,
    /// KIND token balance
    Kindness,
}

impl LeaderboardKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Crops => "🌾 Crop Leaderboard",
            Self::Kindness => "💖 Kindness Leaderboard",
        }
    }

    pub fn score(&self, record: &PlayerStatRecord, weights: &ScoringWeights) -> U256 {
        match self {
            Self::Crops => weights.crop_score(record),
            // helpProvided is informational only
            Self::Kindness => record.kind_balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub address: Address,
    pub score: U256,
    pub stats: PlayerStatRecord,
    pub is_mine: bool,
}

/// Display-ready leaderboard line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub badge: String,
    pub address: String,
    pub score: String,
    pub detail: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub kind: LeaderboardKind,
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Score, sort and rank `records`.
    ///
    /// Duplicate records for one address are merged first, so the result
    /// does not depend on input order. `mine` is matched against each
    /// address as a whole, ignoring case.
    pub fn build(
        records: &[PlayerStatRecord],
        kind: LeaderboardKind,
        weights: &ScoringWeights,
        mine: Option<&str>,
    ) -> Self {
        let mut entries: Vec<LeaderboardEntry> = merge_records(records)
            .into_values()
            .map(|stats| LeaderboardEntry {
                rank: 0,
                address: stats.address,
                score: kind.score(&stats, weights),
                is_mine: mine.is_some_and(|m| is_same_address(&stats.address, m)),
                stats,
            })
            .collect();

        entries.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.address.cmp(&b.address)));
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }

        Self { kind, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self, n: usize) -> &[LeaderboardEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn mine(&self) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| e.is_mine)
    }

    pub fn find(&self, address: &Address) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| &e.address == address)
    }

    pub fn rows(&self) -> Vec<LeaderboardRow> {
        self.entries
            .iter()
            .map(|e| LeaderboardRow {
                badge: rank_badge(e.rank),
                address: short_address(&e.address),
                score: match self.kind {
                    LeaderboardKind::Crops => format_count(e.score),
                    LeaderboardKind::Kindness => format_token_amount(e.score, KIND_DECIMALS),
                },
                detail: match self.kind {
                    LeaderboardKind::Crops => format!(
                        "harvested: {} | stolen: {}",
                        e.stats.crops_harvested, e.stats.crops_stolen
                    ),
                    LeaderboardKind::Kindness => format!("helped: {}", e.stats.help_provided),
                },
                highlighted: e.is_mine,
            })
            .collect()
    }
}

/// Whole-address, case-insensitive comparison against a user-supplied string
pub fn is_same_address(address: &Address, candidate: &str) -> bool {
    let candidate = candidate.trim();
    let ours = format!("{:#x}", address);
    ours.len() == candidate.len() && ours.eq_ignore_ascii_case(candidate)
}

fn merge_records(records: &[PlayerStatRecord]) -> BTreeMap<Address, PlayerStatRecord> {
    let mut merged: BTreeMap<Address, PlayerStatRecord> = BTreeMap::new();
    for record in records {
        merged
            .entry(record.address)
            .and_modify(|existing| *existing = existing.merge(record))
            .or_insert_with(|| record.clone());
    }
    merged
}

/// Headline numbers shown above the leaderboards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardStats {
    pub active_farmers: usize,
    pub total_crops_harvested: U256,
    pub total_help_provided: U256,
}

impl LeaderboardStats {
    pub fn from_records(records: &[PlayerStatRecord]) -> Self {
        let merged = merge_records(records);
        Self {
            active_farmers: merged.len(),
            total_crops_harvested: merged
                .values()
                .fold(U256::ZERO, |acc, r| acc.saturating_add(r.crops_harvested)),
            total_help_provided: merged
                .values()
                .fold(U256::ZERO, |acc, r| acc.saturating_add(r.help_provided)),
        }
    }
}
