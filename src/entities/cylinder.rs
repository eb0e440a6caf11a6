use crate::entities::item::{ItemRef, ParentLink};
use crate::telemetry::logging;
use crate::world::map::TileRef;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphError {
    AlreadyOwned,
    NotAContainer,
    WouldCycle,
    NotFound,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::AlreadyOwned => write!(f, "item already has a parent"),
            GraphError::NotAContainer => write!(f, "target item is not a container"),
            GraphError::WouldCycle => write!(f, "container cannot hold itself"),
            GraphError::NotFound => write!(f, "item is not held by this cylinder"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Anything that holds items: a tile or a container item.
#[derive(Debug, Clone)]
pub enum Cylinder {
    Tile(TileRef),
    Container(ItemRef),
}

impl Cylinder {
    pub fn from_link(link: &ParentLink) -> Option<Cylinder> {
        match link {
            ParentLink::Tile(tile) => tile.upgrade().map(Cylinder::Tile),
            ParentLink::Container(container) => container.upgrade().map(Cylinder::Container),
        }
    }

    pub fn same_as(&self, other: &Cylinder) -> bool {
        match (self, other) {
            (Cylinder::Tile(a), Cylinder::Tile(b)) => Rc::ptr_eq(a, b),
            (Cylinder::Container(a), Cylinder::Container(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn link(&self) -> ParentLink {
        match self {
            Cylinder::Tile(tile) => ParentLink::Tile(Rc::downgrade(tile)),
            Cylinder::Container(container) => ParentLink::Container(Rc::downgrade(container)),
        }
    }

    /// Snapshot of the held items, in order.
    pub fn items(&self) -> Vec<ItemRef> {
        match self {
            Cylinder::Tile(tile) => tile.borrow().items().to_vec(),
            Cylinder::Container(container) => container
                .borrow()
                .container()
                .map(|contents| contents.items().to_vec())
                .unwrap_or_default(),
        }
    }

    pub fn item_count(&self) -> usize {
        match self {
            Cylinder::Tile(tile) => tile.borrow().item_count(),
            Cylinder::Container(container) => container
                .borrow()
                .container()
                .map_or(0, |contents| contents.len()),
        }
    }

    pub fn add_item(&self, item: &ItemRef) -> Result<(), GraphError> {
        self.insert_item(usize::MAX, item)
    }

    /// Inserts a parentless item at `index` (clamped to the end) and points
    /// its parent link here.
    pub fn insert_item(&self, index: usize, item: &ItemRef) -> Result<(), GraphError> {
        if item.borrow().parent().is_some() {
            return Err(GraphError::AlreadyOwned);
        }
        match self {
            Cylinder::Tile(tile) => {
                tile.borrow_mut().insert(index, Rc::clone(item));
            }
            Cylinder::Container(container) => {
                if !container.borrow().is_container() {
                    return Err(GraphError::NotAContainer);
                }
                if is_self_or_ancestor(item, container) {
                    return Err(GraphError::WouldCycle);
                }
                let mut target = container.borrow_mut();
                let Some(contents) = target.container_mut() else {
                    return Err(GraphError::NotAContainer);
                };
                contents.insert(index, Rc::clone(item));
            }
        }
        item.borrow_mut().set_parent(Some(self.link()));
        Ok(())
    }

    /// Removes `item` from this cylinder and clears its parent link. The
    /// returned handle is the reference the cylinder held.
    pub fn remove_item(&self, item: &ItemRef) -> Result<ItemRef, GraphError> {
        let removed = match self {
            Cylinder::Tile(tile) => tile.borrow_mut().remove_ref(item),
            Cylinder::Container(container) => container
                .borrow_mut()
                .container_mut()
                .and_then(|contents| contents.remove_ref(item)),
        };
        let removed = removed.ok_or(GraphError::NotFound)?;
        removed.borrow_mut().set_parent(None);
        Ok(removed)
    }
}

/// The cylinder directly holding `item`, if it is still alive.
pub fn parent_of(item: &ItemRef) -> Option<Cylinder> {
    let link = item.borrow().parent().cloned()?;
    Cylinder::from_link(&link)
}

/// Walks parent links up to the outermost cylinder: the tile when the chain
/// is rooted on the map, otherwise the outermost container. A detached
/// non-container item has no top parent.
pub fn top_parent(item: &ItemRef) -> Option<Cylinder> {
    let mut current = match parent_of(item) {
        Some(parent) => parent,
        None => {
            if item.borrow().is_container() {
                return Some(Cylinder::Container(Rc::clone(item)));
            }
            return None;
        }
    };
    loop {
        let next = match &current {
            Cylinder::Tile(_) => return Some(current),
            Cylinder::Container(container) => parent_of(container),
        };
        match next {
            Some(parent) => current = parent,
            None => return Some(current),
        }
    }
}

pub fn tile_of(item: &ItemRef) -> Option<TileRef> {
    match top_parent(item)? {
        Cylinder::Tile(tile) => Some(tile),
        Cylinder::Container(_) => None,
    }
}

/// Removes `item` from whatever holds it. Returns the former parent.
pub fn detach(item: &ItemRef) -> Result<Option<Cylinder>, GraphError> {
    let Some(parent) = parent_of(item) else {
        item.borrow_mut().set_parent(None);
        return Ok(None);
    };
    parent.remove_item(item)?;
    Ok(Some(parent))
}

/// Moves `item` out of its current holder into `target`. On failure the
/// item stays where it was.
pub fn move_item(item: &ItemRef, target: &Cylinder) -> Result<(), GraphError> {
    if let Cylinder::Container(container) = target {
        if !container.borrow().is_container() {
            return Err(GraphError::NotAContainer);
        }
        if is_self_or_ancestor(item, container) {
            return Err(GraphError::WouldCycle);
        }
    }
    let previous = detach(item)?;
    if let Err(err) = target.add_item(item) {
        if let Some(previous) = previous {
            if let Err(restore) = previous.add_item(item) {
                logging::log_error(&format!(
                    "move of item {} failed ({}) and it could not be put back: {}",
                    item.borrow().type_id().0,
                    err,
                    restore
                ));
            }
        }
        return Err(err);
    }
    Ok(())
}

fn is_self_or_ancestor(candidate: &ItemRef, container: &ItemRef) -> bool {
    let mut current = Rc::clone(container);
    loop {
        if Rc::ptr_eq(&current, candidate) {
            return true;
        }
        match parent_of(&current) {
            Some(Cylinder::Container(parent)) => current = parent,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::item::tests::test_catalog;
    use crate::entities::item::{create_item, ItemTypeId};
    use crate::world::map::Tile;
    use crate::world::position::Position;
    use std::cell::RefCell;

    fn tile() -> TileRef {
        Rc::new(RefCell::new(Tile::new(Position::new(10, 10, 7))))
    }

    #[test]
    fn insert_and_remove_keep_links_consistent() {
        let catalog = test_catalog();
        let tile = tile();
        let bag = create_item(&catalog, ItemTypeId(100), 0).expect("bag");
        let coin = create_item(&catalog, ItemTypeId(30), 3).expect("coin");

        Cylinder::Tile(Rc::clone(&tile)).add_item(&bag).expect("bag on tile");
        let bag_cylinder = Cylinder::Container(Rc::clone(&bag));
        bag_cylinder.add_item(&coin).expect("coin in bag");

        let parent = parent_of(&coin).expect("parent");
        assert!(parent.same_as(&bag_cylinder));
        assert_eq!(bag_cylinder.item_count(), 1);
        assert!(Rc::ptr_eq(&tile_of(&coin).expect("tile"), &tile));

        let removed = bag_cylinder.remove_item(&coin).expect("remove");
        assert!(Rc::ptr_eq(&removed, &coin));
        assert!(coin.borrow().parent().is_none());
        assert_eq!(bag_cylinder.item_count(), 0);
        assert_eq!(bag_cylinder.remove_item(&coin).unwrap_err(), GraphError::NotFound);
    }

    #[test]
    fn rejects_double_ownership_and_non_containers() {
        let catalog = test_catalog();
        let bag = create_item(&catalog, ItemTypeId(100), 0).expect("bag");
        let other = create_item(&catalog, ItemTypeId(101), 0).expect("other");
        let sword = create_item(&catalog, ItemTypeId(10), 0).expect("sword");

        Cylinder::Container(Rc::clone(&bag)).add_item(&sword).expect("add");
        let err = Cylinder::Container(Rc::clone(&other)).add_item(&sword).unwrap_err();
        assert_eq!(err, GraphError::AlreadyOwned);

        let coin = create_item(&catalog, ItemTypeId(30), 1).expect("coin");
        let err = Cylinder::Container(Rc::clone(&sword)).add_item(&coin).unwrap_err();
        assert_eq!(err, GraphError::NotAContainer);
        assert!(coin.borrow().parent().is_none());
    }

    #[test]
    fn rejects_containment_cycles() {
        let catalog = test_catalog();
        let outer = create_item(&catalog, ItemTypeId(100), 0).expect("outer");
        let inner = create_item(&catalog, ItemTypeId(101), 0).expect("inner");
        Cylinder::Container(Rc::clone(&outer)).add_item(&inner).expect("nest");

        let err = Cylinder::Container(Rc::clone(&outer)).add_item(&outer).unwrap_err();
        assert_eq!(err, GraphError::WouldCycle);

        let err = move_item(&outer, &Cylinder::Container(Rc::clone(&inner))).unwrap_err();
        assert_eq!(err, GraphError::WouldCycle);
        assert!(outer.borrow().parent().is_none());
        assert!(parent_of(&inner)
            .expect("still nested")
            .same_as(&Cylinder::Container(Rc::clone(&outer))));
    }

    #[test]
    fn move_updates_both_holders() {
        let catalog = test_catalog();
        let first = create_item(&catalog, ItemTypeId(100), 0).expect("first");
        let second = create_item(&catalog, ItemTypeId(101), 0).expect("second");
        let coin = create_item(&catalog, ItemTypeId(30), 1).expect("coin");
        let first_cylinder = Cylinder::Container(Rc::clone(&first));
        let second_cylinder = Cylinder::Container(Rc::clone(&second));
        first_cylinder.add_item(&coin).expect("add");

        move_item(&coin, &second_cylinder).expect("move");
        assert_eq!(first_cylinder.item_count(), 0);
        assert_eq!(second_cylinder.item_count(), 1);
        assert!(parent_of(&coin).expect("parent").same_as(&second_cylinder));
    }

    #[test]
    fn failed_move_keeps_item_in_its_holder() {
        let catalog = test_catalog();
        let tile = tile();
        let floor = Cylinder::Tile(Rc::clone(&tile));
        let sword = create_item(&catalog, ItemTypeId(10), 0).expect("sword");
        let coin = create_item(&catalog, ItemTypeId(30), 2).expect("coin");
        floor.add_item(&sword).expect("sword");
        floor.add_item(&coin).expect("coin");

        let err = move_item(&coin, &Cylinder::Container(Rc::clone(&sword))).unwrap_err();
        assert_eq!(err, GraphError::NotAContainer);
        assert_eq!(floor.item_count(), 2);
        assert!(Rc::ptr_eq(&floor.items()[1], &coin));
        assert!(parent_of(&coin).expect("parent").same_as(&floor));
    }

    #[test]
    fn top_parent_walks_to_the_tile() {
        let catalog = test_catalog();
        let tile = tile();
        let outer = create_item(&catalog, ItemTypeId(100), 0).expect("outer");
        let inner = create_item(&catalog, ItemTypeId(101), 0).expect("inner");
        let coin = create_item(&catalog, ItemTypeId(30), 1).expect("coin");
        Cylinder::Container(Rc::clone(&inner)).add_item(&coin).expect("coin");
        Cylinder::Container(Rc::clone(&outer)).add_item(&inner).expect("inner");

        let top = top_parent(&coin).expect("top");
        assert!(top.same_as(&Cylinder::Container(Rc::clone(&outer))));
        assert!(tile_of(&coin).is_none());

        Cylinder::Tile(Rc::clone(&tile)).add_item(&outer).expect("outer");
        let top = top_parent(&coin).expect("top");
        assert!(top.same_as(&Cylinder::Tile(Rc::clone(&tile))));

        let loose = create_item(&catalog, ItemTypeId(10), 0).expect("loose");
        assert!(top_parent(&loose).is_none());
    }

    #[test]
    fn transient_holders_keep_removed_items_alive() {
        let catalog = test_catalog();
        let tile = tile();
        let sword = create_item(&catalog, ItemTypeId(10), 0).expect("sword");
        let cylinder = Cylinder::Tile(Rc::clone(&tile));
        cylinder.add_item(&sword).expect("add");
        let weak = Rc::downgrade(&sword);
        let script_hold = Rc::clone(&sword);
        drop(sword);

        let removed = cylinder.remove_item(&script_hold).expect("remove");
        drop(removed);
        assert!(weak.upgrade().is_some());
        drop(script_hold);
        assert!(weak.upgrade().is_none());
    }
}
