//! Shop catalog and purchases paid with points.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::{
    SKIP_TOKEN_PRICE, SURPRISE_BOOST_MS, SURPRISE_POINTS, SURPRISE_PRICE, SURPRISE_SKIP_TOKENS,
    SURPRISE_XP, THEME_COSMETIC_ID, THEME_PRICE, XP_BOOST_DURATION_MS, XP_BOOST_PRICE,
};
use crate::state::PlayerStats;

/// Item id shared by the shop and quest rewards for skip tokens.
pub const SKIP_TOKEN_ITEM_ID: &str = "skip";

/// What an item does once paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemEffect {
    Cosmetic { cosmetic_id: String },
    XpBoost { duration_ms: i64 },
    SkipTokens { quantity: u32 },
    Surprise,
}

/// A single item available in the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: u64,
    pub effect: ItemEffect,
}

/// Randomized outcome of the surprise box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurpriseReward {
    Experience(u64),
    Points(u64),
    SkipTokens(u32),
    XpBoost { duration_ms: i64 },
}

impl SurpriseReward {
    pub const ALL: [Self; 4] = [
        Self::Experience(SURPRISE_XP),
        Self::Points(SURPRISE_POINTS),
        Self::SkipTokens(SURPRISE_SKIP_TOKENS),
        Self::XpBoost {
            duration_ms: SURPRISE_BOOST_MS,
        },
    ];

    /// Roll one of the outcomes uniformly.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    fn apply(self, stats: &mut PlayerStats, now_ms: i64) {
        match self {
            Self::Experience(xp) => stats.gain_experience(xp),
            Self::Points(points) => stats.points = stats.points.saturating_add(points),
            Self::SkipTokens(quantity) => {
                stats.skip_tokens = stats.skip_tokens.saturating_add(quantity);
            }
            Self::XpBoost { duration_ms } => {
                stats.xp_boost_end_time = Some(now_ms.saturating_add(duration_ms));
            }
        }
    }
}

impl fmt::Display for SurpriseReward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Experience(xp) => write!(f, "+{xp} XP"),
            Self::Points(points) => write!(f, "+{points} points"),
            Self::SkipTokens(quantity) => write!(f, "+{quantity} skip"),
            Self::XpBoost { duration_ms } => {
                write!(f, "{} minutes of double XP", duration_ms / 60_000)
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    #[error("no shop item with id \"{0}\"")]
    UnknownItem(String),
    #[error("not enough points for {item_id}: costs {price}, have {balance}")]
    InsufficientFunds {
        item_id: String,
        price: u64,
        balance: u64,
    },
}

/// Stats after a purchase, plus the transient surprise message if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub stats: PlayerStats,
    pub surprise: Option<SurpriseReward>,
}

/// Buy `item`, deducting its price and applying its effect to a copy of `stats`.
///
/// # Errors
///
/// Returns [`PurchaseError::InsufficientFunds`] when the balance is below the
/// price; `stats` is not touched in that case.
pub fn purchase<R: Rng + ?Sized>(
    stats: &PlayerStats,
    item: &ShopItem,
    now_ms: i64,
    rng: &mut R,
) -> Result<Purchase, PurchaseError> {
    if stats.points < item.price {
        return Err(PurchaseError::InsufficientFunds {
            item_id: item.id.clone(),
            price: item.price,
            balance: stats.points,
        });
    }

    let mut next = stats.clone();
    next.points -= item.price;
    let mut surprise = None;
    match &item.effect {
        ItemEffect::Cosmetic { cosmetic_id } => {
            next.cosmetics.insert(cosmetic_id.clone());
        }
        ItemEffect::XpBoost { duration_ms } => {
            next.xp_boost_end_time = Some(now_ms.saturating_add(*duration_ms));
        }
        ItemEffect::SkipTokens { quantity } => {
            next.skip_tokens = next.skip_tokens.saturating_add(*quantity);
        }
        ItemEffect::Surprise => {
            let reward = SurpriseReward::roll(rng);
            reward.apply(&mut next, now_ms);
            surprise = Some(reward);
        }
    }
    log::debug!("purchased {} for {} points", item.id, item.price);
    Ok(Purchase {
        stats: next,
        surprise,
    })
}

/// The shop's items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopCatalog {
    pub items: Vec<ShopItem>,
}

impl Default for ShopCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ShopCatalog {
    #[must_use]
    pub fn standard() -> Self {
        let item = |id: &str, name: &str, description: &str, price: u64, effect| ShopItem {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            effect,
        };
        Self {
            items: vec![
                item(
                    "theme",
                    "New theme",
                    "Change how the game looks",
                    THEME_PRICE,
                    ItemEffect::Cosmetic {
                        cosmetic_id: THEME_COSMETIC_ID.to_string(),
                    },
                ),
                item(
                    "xp_boost",
                    "XP boost",
                    "Double XP for one hour",
                    XP_BOOST_PRICE,
                    ItemEffect::XpBoost {
                        duration_ms: XP_BOOST_DURATION_MS,
                    },
                ),
                item(
                    SKIP_TOKEN_ITEM_ID,
                    "Skip",
                    "Skip a task without breaking your streak",
                    SKIP_TOKEN_PRICE,
                    ItemEffect::SkipTokens { quantity: 1 },
                ),
                item(
                    "surprise",
                    "Surprise",
                    "A random bonus",
                    SURPRISE_PRICE,
                    ItemEffect::Surprise,
                ),
            ],
        }
    }

    #[must_use]
    pub fn find_item(&self, item_id: &str) -> Option<&ShopItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Items the player can currently afford.
    pub fn affordable<'a>(&'a self, stats: &'a PlayerStats) -> impl Iterator<Item = &'a ShopItem> {
        self.items.iter().filter(|item| item.price <= stats.points)
    }
}
