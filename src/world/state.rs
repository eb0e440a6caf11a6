use crate::entities::attributes::AttributeKind;
use crate::entities::cylinder;
use crate::entities::item::{DecayState, ItemRef};
use crate::telemetry::logging;
use crate::world::housing::Houses;
use crate::world::item_types::{load_item_types, ItemTypeIndex};
use crate::world::map::Map;
use crate::world::map_definition::load_map_definition;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

/// Live world: catalog, map, houses and the bookkeeping that items loaded
/// from the store register with.
#[derive(Debug)]
pub struct WorldState {
    pub item_types: ItemTypeIndex,
    pub map: Map,
    pub houses: Houses,
    bed_sleepers: HashMap<u32, ItemRef>,
    decaying: Vec<ItemRef>,
}

impl WorldState {
    pub fn new(item_types: ItemTypeIndex, map: Map, houses: Houses) -> Self {
        Self {
            item_types,
            map,
            houses,
            bed_sleepers: HashMap::new(),
            decaying: Vec::new(),
        }
    }

    pub fn load(root: &Path) -> Result<Self, String> {
        let item_types = load_item_types(&root.join("dat").join("items.yml"))?;
        let (map, houses, report) =
            load_map_definition(&root.join("dat").join("map.yml"), &item_types)?;
        logging::log_game(&format!(
            "map '{}' loaded: tiles={}, items={}, houses={}, unknown={}",
            map.name,
            report.tiles,
            report.items,
            houses.len(),
            report.unknown_items
        ));
        Ok(Self::new(item_types, map, houses))
    }

    /// Records `guid` as sleeping in `bed`. A character sleeps in one bed at
    /// a time; a newer registration replaces the old one.
    pub fn set_bed_sleeper(&mut self, bed: &ItemRef, guid: u32) {
        if guid == 0 {
            return;
        }
        self.bed_sleepers.insert(guid, Rc::clone(bed));
    }

    pub fn remove_bed_sleeper(&mut self, guid: u32) -> Option<ItemRef> {
        self.bed_sleepers.remove(&guid)
    }

    pub fn bed_by_sleeper(&self, guid: u32) -> Option<&ItemRef> {
        self.bed_sleepers.get(&guid)
    }

    pub fn sleeper_count(&self) -> usize {
        self.bed_sleepers.len()
    }

    /// Puts `item` on the decay list when its type decays and it is not
    /// already decaying. The list holds its own reference until the item
    /// finishes decaying.
    pub fn start_decay(&mut self, item: &ItemRef) {
        let can_decay = item
            .borrow()
            .item_type(&self.item_types)
            .map_or(false, |item_type| item_type.can_decay());
        if !can_decay || item.borrow().decay_state() == DecayState::True {
            return;
        }
        if item.borrow().duration() <= 0 {
            self.finish_decay(item);
            return;
        }
        item.borrow_mut().set_decay_state(DecayState::True);
        self.decaying.push(Rc::clone(item));
    }

    pub fn decaying_count(&self) -> usize {
        self.decaying.len()
    }

    /// Advances every decaying item by `elapsed_ms` and transforms the ones
    /// that ran out. Returns how many finished.
    pub fn process_decay(&mut self, elapsed_ms: i64) -> usize {
        let pending = std::mem::take(&mut self.decaying);
        let mut finished = 0;
        for item in pending {
            if item.borrow().decay_state() != DecayState::True {
                continue;
            }
            if item.borrow().duration() > elapsed_ms {
                item.borrow_mut()
                    .increase_int_attr(AttributeKind::Duration, -elapsed_ms);
                self.decaying.push(item);
                continue;
            }
            self.finish_decay(&item);
            finished += 1;
        }
        finished
    }

    fn finish_decay(&mut self, item: &ItemRef) {
        let target = item
            .borrow()
            .item_type(&self.item_types)
            .and_then(|item_type| item_type.decay_to);
        match target {
            Some(target) if target.0 != 0 && self.item_types.get(target).is_some() => {
                item.borrow_mut().set_type(&self.item_types, target);
                if let Some(bed) = item.borrow().bed() {
                    if bed.sleeper != 0 {
                        self.bed_sleepers.remove(&bed.sleeper);
                    }
                }
                if item.borrow().duration() > 0 {
                    self.start_decay(item);
                }
            }
            _ => {
                if let Err(err) = cylinder::detach(item) {
                    logging::log_error(&format!("decay removal failed: {}", err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::cylinder::Cylinder;
    use crate::entities::item::tests::test_catalog;
    use crate::entities::item::{create_item, ItemTypeId};
    use crate::world::position::Position;

    fn world() -> WorldState {
        WorldState::new(test_catalog(), Map::new("test"), Houses::new())
    }

    #[test]
    fn decay_transforms_after_duration() {
        let mut world = world();
        let tile = world.map.get_or_create_tile(Position::new(5, 5, 7));
        let torch = create_item(&world.item_types, ItemTypeId(70), 0).expect("torch");
        Cylinder::Tile(Rc::clone(&tile)).add_item(&torch).expect("add");

        world.start_decay(&torch);
        world.start_decay(&torch);
        assert_eq!(world.decaying_count(), 1);
        assert_eq!(torch.borrow().decay_state(), DecayState::True);

        assert_eq!(world.process_decay(60_000), 0);
        assert_eq!(torch.borrow().duration(), 60_000);
        assert_eq!(world.process_decay(60_000), 1);
        assert_eq!(torch.borrow().type_id(), ItemTypeId(71));
        assert_eq!(world.decaying_count(), 0);
        assert_eq!(tile.borrow().item_count(), 1);
    }

    #[test]
    fn non_decaying_items_are_ignored() {
        let mut world = world();
        let sword = create_item(&world.item_types, ItemTypeId(10), 0).expect("sword");
        world.start_decay(&sword);
        assert_eq!(world.decaying_count(), 0);
    }

    #[test]
    fn bed_sleepers_are_tracked_by_guid() {
        let mut world = world();
        let bed = create_item(&world.item_types, ItemTypeId(300), 0).expect("bed");
        world.set_bed_sleeper(&bed, 0);
        assert_eq!(world.sleeper_count(), 0);
        world.set_bed_sleeper(&bed, 42);
        assert!(Rc::ptr_eq(world.bed_by_sleeper(42).expect("bed"), &bed));
        assert!(world.remove_bed_sleeper(42).is_some());
        assert!(world.remove_bed_sleeper(42).is_none());
    }
}
