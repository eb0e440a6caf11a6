use crate::entities::item::ItemRef;
use crate::world::position::Position;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type TileRef = Rc<RefCell<Tile>>;

/// Root cylinder of the item graph. Items on a tile have no parent above it.
#[derive(Debug)]
pub struct Tile {
    position: Position,
    house_id: Option<u32>,
    items: Vec<ItemRef>,
}

impl Tile {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            house_id: None,
            items: Vec::new(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn house_id(&self) -> Option<u32> {
        self.house_id
    }

    pub(crate) fn set_house_id(&mut self, house_id: Option<u32>) {
        self.house_id = house_id;
    }

    pub fn items(&self) -> &[ItemRef] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn insert(&mut self, index: usize, item: ItemRef) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    pub(crate) fn remove_ref(&mut self, item: &ItemRef) -> Option<ItemRef> {
        let index = self.items.iter().position(|entry| Rc::ptr_eq(entry, item))?;
        Some(self.items.remove(index))
    }
}

#[derive(Debug, Default)]
pub struct Map {
    pub name: String,
    tiles: HashMap<Position, TileRef>,
}

impl Map {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tiles: HashMap::new(),
        }
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn has_tile(&self, position: Position) -> bool {
        self.tiles.contains_key(&position)
    }

    pub fn tile(&self, position: Position) -> Option<TileRef> {
        self.tiles.get(&position).cloned()
    }

    /// Returns the tile at `position`, creating an empty one if needed.
    pub fn get_or_create_tile(&mut self, position: Position) -> TileRef {
        Rc::clone(
            self.tiles
                .entry(position)
                .or_insert_with(|| Rc::new(RefCell::new(Tile::new(position)))),
        )
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileRef> {
        self.tiles.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_reuses_tiles() {
        let mut map = Map::new("test");
        let position = Position::new(100, 100, 7);
        assert!(!map.has_tile(position));
        let first = map.get_or_create_tile(position);
        let second = map.get_or_create_tile(position);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(map.tile_count(), 1);
        assert_eq!(first.borrow().position(), position);
        assert!(map.tile(Position::new(1, 1, 7)).is_none());
    }
}
