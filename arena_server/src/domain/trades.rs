// Static shop table.

use super::items::{ItemKind, ItemStack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cost {
    Gold(u32),
    /// Barter costs exist in the table but are not honoured by the shop.
    Item(ItemStack),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trade {
    pub id: &'static str,
    pub cost: Cost,
    pub reward: ItemStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeError {
    UnknownTrade,
    UnsupportedCost,
    InsufficientGold,
    InventoryFull,
    NoActiveCharacter,
}

impl TradeError {
    pub fn message(self) -> &'static str {
        match self {
            TradeError::UnknownTrade => "Unknown trade",
            TradeError::UnsupportedCost => "That trade is not available",
            TradeError::InsufficientGold => "Not enough gold",
            TradeError::InventoryFull => "Inventory full",
            TradeError::NoActiveCharacter => "No character can trade right now",
        }
    }
}

pub const TRADES: &[Trade] = &[
    Trade {
        id: "arrows",
        cost: Cost::Gold(5),
        reward: ItemStack {
            item: ItemKind::Arrow,
            count: 8,
        },
    },
    Trade {
        id: "wood",
        cost: Cost::Gold(4),
        reward: ItemStack {
            item: ItemKind::Wood,
            count: 16,
        },
    },
    Trade {
        id: "stone",
        cost: Cost::Gold(12),
        reward: ItemStack {
            item: ItemKind::Stone,
            count: 16,
        },
    },
    Trade {
        id: "tnt",
        cost: Cost::Gold(20),
        reward: ItemStack {
            item: ItemKind::Tnt,
            count: 1,
        },
    },
    Trade {
        id: "pearl",
        cost: Cost::Gold(25),
        reward: ItemStack {
            item: ItemKind::Pearl,
            count: 1,
        },
    },
    Trade {
        id: "bow",
        cost: Cost::Gold(10),
        reward: ItemStack {
            item: ItemKind::Bow,
            count: 1,
        },
    },
    Trade {
        id: "pearl_swap",
        cost: Cost::Item(ItemStack {
            item: ItemKind::Arrow,
            count: 16,
        }),
        reward: ItemStack {
            item: ItemKind::Pearl,
            count: 1,
        },
    },
];

pub fn find_trade(id: &str) -> Option<&'static Trade> {
    TRADES.iter().find(|trade| trade.id == id)
}
