// Fixed-size slot inventory carried by every player character.

use super::items::{ItemKind, ItemStack};

pub const INVENTORY_SLOTS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryError {
    InvalidSlot,
    EmptySlot,
    /// The slot holds an item that may not leave the inventory.
    Protected,
}

/// How much of a slot a drop takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeAmount {
    One,
    Stack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    slots: [Option<ItemStack>; INVENTORY_SLOTS],
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            slots: [None; INVENTORY_SLOTS],
        }
    }
}

impl Inventory {
    /// Loadout every character spawns with.
    pub fn starter() -> Self {
        let mut inventory = Self::default();
        inventory.slots[0] = Some(ItemStack::new(ItemKind::Bow, 1));
        inventory.slots[1] = Some(ItemStack::new(ItemKind::Arrow, 16));
        inventory.slots[2] = Some(ItemStack::new(ItemKind::Wood, 16));
        inventory
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<ItemStack> {
        self.slots.get(index).copied().flatten()
    }

    pub fn count(&self, item: ItemKind) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|stack| stack.item == item)
            .map(|stack| stack.count)
            .sum()
    }

    /// Units of `item` that would still fit, counting partial stacks and empty slots.
    pub fn capacity_for(&self, item: ItemKind) -> u32 {
        let cap = item.max_stack();
        self.slots
            .iter()
            .map(|slot| match slot {
                None => cap,
                Some(stack) if stack.item == item => cap.saturating_sub(stack.count),
                Some(_) => 0,
            })
            .sum()
    }

    /// Adds up to `count` units and returns the remainder that did not fit.
    ///
    /// Existing under-cap stacks of the same item fill first, in slot order, then empty slots.
    /// Currency never occupies a slot, so it is returned untouched.
    pub fn add(&mut self, item: ItemKind, count: u32) -> u32 {
        let cap = item.max_stack();
        if cap == 0 {
            return count;
        }

        let mut remaining = count;
        for stack in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if stack.item == item && stack.count < cap {
                let moved = remaining.min(cap - stack.count);
                stack.count += moved;
                remaining -= moved;
            }
        }

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let moved = remaining.min(cap);
                *slot = Some(ItemStack::new(item, moved));
                remaining -= moved;
            }
        }

        remaining
    }

    /// Removes exactly `count` units of `item` (last slots first) or nothing at all.
    pub fn remove(&mut self, item: ItemKind, count: u32) -> bool {
        if self.count(item) < count {
            return false;
        }

        let mut remaining = count;
        for slot in self.slots.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            let Some(stack) = slot else { continue };
            if stack.item != item {
                continue;
            }
            let taken = remaining.min(stack.count);
            stack.count -= taken;
            remaining -= taken;
            if stack.count == 0 {
                *slot = None;
            }
        }
        true
    }

    /// Takes one unit or the whole stack out of a slot, clearing it when it empties.
    pub fn take_from_slot(
        &mut self,
        index: usize,
        amount: TakeAmount,
    ) -> Result<ItemStack, InventoryError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(InventoryError::InvalidSlot)?;
        let stack = slot.as_mut().ok_or(InventoryError::EmptySlot)?;
        if !stack.item.is_droppable() {
            return Err(InventoryError::Protected);
        }

        let taken = match amount {
            TakeAmount::One => 1,
            TakeAmount::Stack => stack.count,
        };
        stack.count -= taken;
        let item = stack.item;
        if stack.count == 0 {
            *slot = None;
        }
        Ok(ItemStack::new(item, taken))
    }

    pub fn swap(&mut self, from: usize, to: usize) -> Result<(), InventoryError> {
        if from >= INVENTORY_SLOTS || to >= INVENTORY_SLOTS {
            return Err(InventoryError::InvalidSlot);
        }
        self.slots.swap(from, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_adding_then_partial_stacks_fill_before_empty_slots() {
        let mut inventory = Inventory::default();
        inventory.slots[3] = Some(ItemStack::new(ItemKind::Arrow, 60));
        inventory.slots[5] = Some(ItemStack::new(ItemKind::Arrow, 10));

        let remainder = inventory.add(ItemKind::Arrow, 60);

        assert_eq!(remainder, 0);
        assert_eq!(inventory.get(3), Some(ItemStack::new(ItemKind::Arrow, 64)));
        assert_eq!(inventory.get(5), Some(ItemStack::new(ItemKind::Arrow, 64)));
        assert_eq!(inventory.get(0), Some(ItemStack::new(ItemKind::Arrow, 2)));
    }

    #[test]
    fn when_inventory_is_nearly_full_then_absorbed_plus_remainder_equals_request() {
        let mut inventory = Inventory::default();
        for index in 0..INVENTORY_SLOTS - 1 {
            inventory.slots[index] = Some(ItemStack::new(ItemKind::Stone, 64));
        }
        inventory.slots[INVENTORY_SLOTS - 1] = Some(ItemStack::new(ItemKind::Pearl, 10));

        for requested in [1, 6, 7, 40] {
            let mut copy = inventory.clone();
            let before = copy.count(ItemKind::Pearl);
            let remainder = copy.add(ItemKind::Pearl, requested);
            let absorbed = copy.count(ItemKind::Pearl) - before;
            assert_eq!(absorbed + remainder, requested);
            assert_eq!(absorbed, requested.min(6));
        }
    }

    #[test]
    fn when_currency_is_added_then_nothing_is_absorbed() {
        let mut inventory = Inventory::default();
        assert_eq!(inventory.add(ItemKind::Gold, 7), 7);
        assert_eq!(inventory.count(ItemKind::Gold), 0);
    }

    #[test]
    fn when_last_unit_is_taken_then_slot_becomes_empty() {
        let mut inventory = Inventory::default();
        inventory.slots[4] = Some(ItemStack::new(ItemKind::Tnt, 1));

        let taken = inventory.take_from_slot(4, TakeAmount::One);

        assert_eq!(taken, Ok(ItemStack::new(ItemKind::Tnt, 1)));
        assert_eq!(inventory.get(4), None);
    }

    #[test]
    fn when_slot_is_protected_or_empty_then_take_is_rejected() {
        let mut inventory = Inventory::starter();
        assert_eq!(
            inventory.take_from_slot(0, TakeAmount::Stack),
            Err(InventoryError::Protected)
        );
        assert_eq!(
            inventory.take_from_slot(8, TakeAmount::One),
            Err(InventoryError::EmptySlot)
        );
        assert_eq!(
            inventory.take_from_slot(9, TakeAmount::One),
            Err(InventoryError::InvalidSlot)
        );
        assert_eq!(inventory, Inventory::starter());
    }

    #[test]
    fn when_removing_more_than_held_then_inventory_is_untouched() {
        let mut inventory = Inventory::starter();
        assert!(!inventory.remove(ItemKind::Arrow, 17));
        assert!(inventory.remove(ItemKind::Arrow, 16));
        assert_eq!(inventory.count(ItemKind::Arrow), 0);
        assert_eq!(inventory.get(1), None);
    }

    #[test]
    fn when_capacity_is_queried_then_it_matches_what_add_accepts() {
        let inventory = Inventory::starter();
        let capacity = inventory.capacity_for(ItemKind::Wood);
        let mut copy = inventory.clone();
        let remainder = copy.add(ItemKind::Wood, capacity + 5);
        assert_eq!(remainder, 5);
    }
}
