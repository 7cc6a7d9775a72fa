// Item catalog: what exists, how it stacks, and what it does when used.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Bow,
    Arrow,
    Pearl,
    Wood,
    Stone,
    Tnt,
    /// Currency. Picked up straight into the gold counter, never into a slot.
    Gold,
}

/// Weapon tag carried by a bullet; selects its flight and damage profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weapon {
    Bow,
    Pearl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Wood,
    Stone,
    Tnt,
}

impl ItemKind {
    pub const ALL: [ItemKind; 7] = [
        ItemKind::Bow,
        ItemKind::Arrow,
        ItemKind::Pearl,
        ItemKind::Wood,
        ItemKind::Stone,
        ItemKind::Tnt,
        ItemKind::Gold,
    ];

    pub fn max_stack(self) -> u32 {
        match self {
            ItemKind::Bow => 1,
            ItemKind::Arrow => 64,
            ItemKind::Pearl => 16,
            ItemKind::Wood | ItemKind::Stone => 64,
            ItemKind::Tnt => 16,
            ItemKind::Gold => 0,
        }
    }

    /// The starter bow can be swapped around but never thrown away.
    pub fn is_droppable(self) -> bool {
        !matches!(self, ItemKind::Bow | ItemKind::Gold)
    }

    pub fn is_currency(self) -> bool {
        self == ItemKind::Gold
    }

    /// Weapon fired when this item is selected and the player shoots.
    pub fn weapon(self) -> Option<Weapon> {
        match self {
            ItemKind::Bow => Some(Weapon::Bow),
            ItemKind::Pearl => Some(Weapon::Pearl),
            _ => None,
        }
    }

    /// Block placed when this item is selected in build mode.
    pub fn block(self) -> Option<BlockType> {
        match self {
            ItemKind::Wood => Some(BlockType::Wood),
            ItemKind::Stone => Some(BlockType::Stone),
            ItemKind::Tnt => Some(BlockType::Tnt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ItemKind::Bow => "bow",
            ItemKind::Arrow => "arrow",
            ItemKind::Pearl => "pearl",
            ItemKind::Wood => "wood",
            ItemKind::Stone => "stone",
            ItemKind::Tnt => "tnt",
            ItemKind::Gold => "gold",
        }
    }

    pub fn parse(name: &str) -> Option<ItemKind> {
        let name = name.trim().to_ascii_lowercase();
        ItemKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl Weapon {
    /// Inventory item consumed per shot.
    pub fn ammo(self) -> ItemKind {
        match self {
            Weapon::Bow => ItemKind::Arrow,
            Weapon::Pearl => ItemKind::Pearl,
        }
    }
}

impl BlockType {
    pub fn max_hp(self) -> i32 {
        match self {
            BlockType::Wood => 60,
            BlockType::Stone => 150,
            BlockType::Tnt => 20,
        }
    }
}

/// One occupied inventory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemKind,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: ItemKind, count: u32) -> Self {
        Self { item, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_item_name_is_mixed_case_then_parse_finds_it() {
        assert_eq!(ItemKind::parse(" TNT "), Some(ItemKind::Tnt));
        assert_eq!(ItemKind::parse("sword"), None);
    }

    #[test]
    fn when_weapon_is_selected_then_its_ammo_is_known() {
        assert_eq!(ItemKind::Bow.weapon().map(Weapon::ammo), Some(ItemKind::Arrow));
        assert_eq!(ItemKind::Pearl.weapon().map(Weapon::ammo), Some(ItemKind::Pearl));
        assert_eq!(ItemKind::Wood.weapon(), None);
    }
}
