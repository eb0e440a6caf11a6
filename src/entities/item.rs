use crate::entities::attributes::{AttributeKind, ItemAttributes};
use crate::world::access_list::AccessList;
use crate::world::item_types::{ItemGroup, ItemType, ItemTypeIndex};
use crate::world::map::Tile;
use crate::world::position::Position;
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ItemTypeId(pub u16);

/// Shared handle to an item. The cylinder holding the item owns one strong
/// reference; anything else holding an `ItemRef` keeps the item alive until
/// it drops its clone.
pub type ItemRef = Rc<RefCell<Item>>;
pub type WeakItemRef = Weak<RefCell<Item>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayState {
    False = 0,
    True = 1,
    Pending = 2,
}

impl DecayState {
    pub fn from_raw(value: i64) -> Self {
        match value {
            1 => DecayState::True,
            2 => DecayState::Pending,
            _ => DecayState::False,
        }
    }
}

/// Back-reference to the cylinder holding an item. Never owning.
#[derive(Debug, Clone)]
pub enum ParentLink {
    Tile(Weak<RefCell<Tile>>),
    Container(WeakItemRef),
}

#[derive(Debug, Default)]
pub struct ContainerData {
    items: Vec<ItemRef>,
    /// Children still expected while a container is being decoded.
    pub serialization_count: u32,
}

impl ContainerData {
    pub fn items(&self) -> &[ItemRef] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn push(&mut self, item: ItemRef) {
        self.items.push(item);
    }

    pub(crate) fn insert(&mut self, index: usize, item: ItemRef) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    pub(crate) fn remove_ref(&mut self, item: &ItemRef) -> Option<ItemRef> {
        let index = self.items.iter().position(|entry| Rc::ptr_eq(entry, item))?;
        Some(self.items.remove(index))
    }

    pub(crate) fn take_all(&mut self) -> Vec<ItemRef> {
        std::mem::take(&mut self.items)
    }
}

#[derive(Debug, Default)]
pub struct DoorData {
    pub house_id: Option<u32>,
    pub access_list: Option<AccessList>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BedData {
    pub house_id: Option<u32>,
    pub sleeper: u32,
    pub sleep_start: u32,
}

/// Category-specific state. The set is closed and chosen by the catalog.
#[derive(Debug)]
pub enum ItemVariant {
    Plain,
    Container(ContainerData),
    DepotLocker { contents: ContainerData, depot_id: u16 },
    Door(DoorData),
    Bed(BedData),
    Teleport { destination: Position },
    MagicField,
    Mailbox,
}

impl ItemVariant {
    pub fn for_type(item_type: &ItemType) -> Self {
        match item_type.group {
            ItemGroup::Depot => ItemVariant::DepotLocker {
                contents: ContainerData::default(),
                depot_id: 0,
            },
            ItemGroup::Container | ItemGroup::Chest => {
                ItemVariant::Container(ContainerData::default())
            }
            ItemGroup::Teleport => ItemVariant::Teleport {
                destination: Position::default(),
            },
            ItemGroup::MagicField => ItemVariant::MagicField,
            ItemGroup::Door => ItemVariant::Door(DoorData::default()),
            ItemGroup::Mailbox => ItemVariant::Mailbox,
            ItemGroup::Bed => ItemVariant::Bed(BedData::default()),
            _ => ItemVariant::Plain,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ItemVariant::Plain => "item",
            ItemVariant::Container(_) => "container",
            ItemVariant::DepotLocker { .. } => "depot locker",
            ItemVariant::Door(_) => "door",
            ItemVariant::Bed(_) => "bed",
            ItemVariant::Teleport { .. } => "teleport",
            ItemVariant::MagicField => "magic field",
            ItemVariant::Mailbox => "mailbox",
        }
    }

    fn same_kind(&self, other: &ItemVariant) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug)]
pub struct Item {
    type_id: ItemTypeId,
    count: u8,
    attributes: Option<Box<ItemAttributes>>,
    parent: Option<ParentLink>,
    variant: ItemVariant,
}

/// Builds a new item of `type_id` wrapped in a shared handle. Unknown and
/// deprecated types produce nothing.
pub fn create_item(catalog: &ItemTypeIndex, type_id: ItemTypeId, count: u16) -> Option<ItemRef> {
    Item::create(catalog, type_id, count).map(|item| Rc::new(RefCell::new(item)))
}

/// Deep copy of `item`, detached from any parent. Container contents are
/// copied recursively; sleepers and door access lists are not.
pub fn clone_item(item: &ItemRef) -> ItemRef {
    let source = item.borrow();
    let variant = match &source.variant {
        ItemVariant::Plain => ItemVariant::Plain,
        ItemVariant::Container(_) => ItemVariant::Container(ContainerData::default()),
        ItemVariant::DepotLocker { depot_id, .. } => ItemVariant::DepotLocker {
            contents: ContainerData::default(),
            depot_id: *depot_id,
        },
        ItemVariant::Door(data) => ItemVariant::Door(DoorData {
            house_id: data.house_id,
            access_list: None,
        }),
        ItemVariant::Bed(data) => ItemVariant::Bed(BedData {
            house_id: data.house_id,
            ..BedData::default()
        }),
        ItemVariant::Teleport { destination } => ItemVariant::Teleport {
            destination: *destination,
        },
        ItemVariant::MagicField => ItemVariant::MagicField,
        ItemVariant::Mailbox => ItemVariant::Mailbox,
    };
    let copy = Rc::new(RefCell::new(Item {
        type_id: source.type_id,
        count: source.count,
        attributes: source.attributes.clone(),
        parent: None,
        variant,
    }));
    if let Some(contents) = source.container() {
        for child in contents.items() {
            let child_copy = clone_item(child);
            child_copy.borrow_mut().parent = Some(ParentLink::Container(Rc::downgrade(&copy)));
            if let Some(target) = copy.borrow_mut().container_mut() {
                target.push(child_copy);
            }
        }
    }
    copy
}

impl Item {
    pub fn create(catalog: &ItemTypeIndex, type_id: ItemTypeId, count: u16) -> Option<Item> {
        let item_type = catalog.get(type_id)?;
        if item_type.is_deprecated() {
            return None;
        }
        let mut item = Item::bare(item_type);
        item.init_sub_type(item_type, count);
        let duration = item_type.default_duration_ms();
        if duration != 0 {
            item.set_duration(duration);
        }
        Some(item)
    }

    /// An instance with the catalog variant and no subtype initialization.
    pub(crate) fn bare(item_type: &ItemType) -> Item {
        Item {
            type_id: item_type.id,
            count: 1,
            attributes: None,
            parent: None,
            variant: ItemVariant::for_type(item_type),
        }
    }

    fn init_sub_type(&mut self, item_type: &ItemType, count: u16) {
        if item_type.is_fluid_container() || item_type.is_splash() {
            self.set_fluid_type(count);
        } else if item_type.stackable {
            if count != 0 {
                self.set_item_count(count);
            } else if item_type.charges != 0 {
                self.set_item_count(item_type.charges);
            }
        } else if item_type.charges != 0 {
            if count != 0 {
                self.set_charges(count);
            } else {
                self.set_charges(item_type.charges);
            }
        } else if item_type.is_key() {
            self.set_int_attr(AttributeKind::KeyNumber, i64::from(count));
        }
    }

    pub fn type_id(&self) -> ItemTypeId {
        self.type_id
    }

    pub fn item_type<'a>(&self, catalog: &'a ItemTypeIndex) -> Option<&'a ItemType> {
        catalog.get(self.type_id)
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn set_item_count(&mut self, count: u16) {
        self.count = count.min(u16::from(u8::MAX)) as u8;
    }

    pub fn variant(&self) -> &ItemVariant {
        &self.variant
    }

    pub fn variant_mut(&mut self) -> &mut ItemVariant {
        &mut self.variant
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ParentLink>) {
        self.parent = parent;
    }

    pub fn container(&self) -> Option<&ContainerData> {
        match &self.variant {
            ItemVariant::Container(data) => Some(data),
            ItemVariant::DepotLocker { contents, .. } => Some(contents),
            _ => None,
        }
    }

    pub fn container_mut(&mut self) -> Option<&mut ContainerData> {
        match &mut self.variant {
            ItemVariant::Container(data) => Some(data),
            ItemVariant::DepotLocker { contents, .. } => Some(contents),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        self.container().is_some()
    }

    pub fn door(&self) -> Option<&DoorData> {
        match &self.variant {
            ItemVariant::Door(data) => Some(data),
            _ => None,
        }
    }

    pub fn door_mut(&mut self) -> Option<&mut DoorData> {
        match &mut self.variant {
            ItemVariant::Door(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_door(&self) -> bool {
        self.door().is_some()
    }

    pub fn bed(&self) -> Option<&BedData> {
        match &self.variant {
            ItemVariant::Bed(data) => Some(data),
            _ => None,
        }
    }

    pub fn bed_mut(&mut self) -> Option<&mut BedData> {
        match &mut self.variant {
            ItemVariant::Bed(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_bed(&self) -> bool {
        self.bed().is_some()
    }

    pub fn attributes(&self) -> Option<&ItemAttributes> {
        self.attributes.as_deref()
    }

    fn attributes_mut(&mut self) -> &mut ItemAttributes {
        self.attributes.get_or_insert_with(Box::default)
    }

    pub fn has_attribute(&self, kind: AttributeKind) -> bool {
        self.attributes
            .as_ref()
            .map_or(false, |attributes| attributes.has(kind))
    }

    pub fn get_int_attr(&self, kind: AttributeKind) -> i64 {
        self.attributes
            .as_ref()
            .map_or(0, |attributes| attributes.get_int(kind))
    }

    pub fn get_str_attr(&self, kind: AttributeKind) -> &str {
        self.attributes
            .as_ref()
            .map_or("", |attributes| attributes.get_str(kind))
    }

    pub fn set_int_attr(&mut self, kind: AttributeKind, value: i64) {
        self.attributes_mut().set_int(kind, value);
    }

    pub fn set_str_attr(&mut self, kind: AttributeKind, value: &str) {
        if value.is_empty() {
            return;
        }
        self.attributes_mut().set_str(kind, value);
    }

    pub fn increase_int_attr(&mut self, kind: AttributeKind, delta: i64) {
        self.attributes_mut().increase_int(kind, delta);
    }

    pub fn remove_attribute(&mut self, kind: AttributeKind) {
        if let Some(attributes) = self.attributes.as_mut() {
            attributes.remove(kind);
        }
    }

    pub fn charges(&self) -> u16 {
        clamp_u16(self.get_int_attr(AttributeKind::Charges))
    }

    pub fn set_charges(&mut self, charges: u16) {
        self.set_int_attr(AttributeKind::Charges, i64::from(charges));
    }

    pub fn fluid_type(&self) -> u16 {
        clamp_u16(self.get_int_attr(AttributeKind::FluidType))
    }

    pub fn set_fluid_type(&mut self, fluid: u16) {
        self.set_int_attr(AttributeKind::FluidType, i64::from(fluid));
    }

    pub fn action_id(&self) -> u16 {
        clamp_u16(self.get_int_attr(AttributeKind::ActionId))
    }

    pub fn set_action_id(&mut self, action_id: u16) {
        self.set_int_attr(AttributeKind::ActionId, i64::from(action_id));
    }

    pub fn movement_id(&self) -> u16 {
        clamp_u16(self.get_int_attr(AttributeKind::MovementId))
    }

    pub fn set_movement_id(&mut self, movement_id: u16) {
        self.set_int_attr(AttributeKind::MovementId, i64::from(movement_id));
    }

    pub fn text(&self) -> &str {
        self.get_str_attr(AttributeKind::Text)
    }

    pub fn set_text(&mut self, text: &str) {
        self.set_str_attr(AttributeKind::Text, text);
    }

    pub fn writer(&self) -> &str {
        self.get_str_attr(AttributeKind::Writer)
    }

    pub fn written_date(&self) -> u32 {
        self.get_int_attr(AttributeKind::WrittenDate).clamp(0, i64::from(u32::MAX)) as u32
    }

    pub fn special_description(&self) -> &str {
        self.get_str_attr(AttributeKind::Description)
    }

    pub fn duration(&self) -> i64 {
        self.get_int_attr(AttributeKind::Duration)
    }

    pub fn set_duration(&mut self, duration: i64) {
        self.set_int_attr(AttributeKind::Duration, duration.max(0));
    }

    pub fn decay_state(&self) -> DecayState {
        DecayState::from_raw(self.get_int_attr(AttributeKind::DecayState))
    }

    pub fn set_decay_state(&mut self, state: DecayState) {
        self.set_int_attr(AttributeKind::DecayState, state as i64);
    }

    pub fn door_id(&self) -> u8 {
        self.get_int_attr(AttributeKind::DoorId).clamp(0, i64::from(u8::MAX)) as u8
    }

    pub fn set_door_id(&mut self, door_id: u8) {
        self.set_int_attr(AttributeKind::DoorId, i64::from(door_id));
    }

    pub fn sub_type(&self, catalog: &ItemTypeIndex) -> u16 {
        let Some(item_type) = catalog.get(self.type_id) else {
            return u16::from(self.count);
        };
        if item_type.is_fluid_container() || item_type.is_splash() {
            self.fluid_type()
        } else if item_type.stackable {
            u16::from(self.count)
        } else if item_type.charges != 0 {
            self.charges()
        } else {
            u16::from(self.count)
        }
    }

    pub fn set_sub_type(&mut self, catalog: &ItemTypeIndex, value: u16) {
        let Some(item_type) = catalog.get(self.type_id) else {
            self.set_item_count(value);
            return;
        };
        if item_type.is_fluid_container() || item_type.is_splash() {
            self.set_fluid_type(value);
        } else if item_type.stackable {
            self.set_item_count(value);
        } else if item_type.charges != 0 {
            self.set_charges(value);
        } else {
            self.set_item_count(value);
        }
    }

    /// Weight in the catalog's unit, including stack size and container
    /// contents.
    pub fn weight(&self, catalog: &ItemTypeIndex) -> u32 {
        let base = if self.has_attribute(AttributeKind::Weight) {
            self.get_int_attr(AttributeKind::Weight).clamp(0, i64::from(u32::MAX)) as u32
        } else {
            catalog.get(self.type_id).map_or(0, |item_type| item_type.weight)
        };
        let stackable = catalog
            .get(self.type_id)
            .map_or(false, |item_type| item_type.stackable);
        let mut weight = if stackable {
            base.saturating_mul(u32::from(self.count.max(1)))
        } else {
            base
        };
        if let Some(contents) = self.container() {
            for child in contents.items() {
                weight = weight.saturating_add(child.borrow().weight(catalog));
            }
        }
        weight
    }

    /// True when both items share a type and carry the same attribute set.
    pub fn equals(&self, other: &Item) -> bool {
        if self.type_id != other.type_id {
            return false;
        }
        let empty = ItemAttributes::default();
        let mine = self.attributes.as_deref().unwrap_or(&empty);
        let theirs = other.attributes.as_deref().unwrap_or(&empty);
        if mine.bits() != theirs.bits() {
            return false;
        }
        let same = mine.iter().all(|(kind, _)| {
            if kind.is_string() {
                mine.get_str(kind) == theirs.get_str(kind)
            } else {
                mine.get_int(kind) == theirs.get_int(kind)
            }
        });
        same
    }

    /// Changes the type of this instance in place. Decay attributes follow the
    /// new type; the variant is rebuilt when the catalog category changes.
    /// Contents of a container that stops being one are released.
    pub fn set_type(&mut self, catalog: &ItemTypeIndex, new_id: ItemTypeId) {
        let previous_stop_time = catalog
            .get(self.type_id)
            .map_or(false, |item_type| item_type.stop_time);
        self.type_id = new_id;
        let Some(item_type) = catalog.get(new_id) else {
            return;
        };

        let new_duration = item_type.default_duration_ms();
        if new_duration == 0 && !item_type.stop_time && item_type.decay_to.is_none() {
            self.remove_attribute(AttributeKind::DecayState);
            self.remove_attribute(AttributeKind::Duration);
        }
        self.remove_attribute(AttributeKind::CorpseOwner);
        if new_duration > 0
            && (!previous_stop_time || !self.has_attribute(AttributeKind::Duration))
        {
            self.set_decay_state(DecayState::False);
            self.set_duration(new_duration);
        }

        let replacement = ItemVariant::for_type(item_type);
        if self.variant.same_kind(&replacement) {
            return;
        }
        let old = std::mem::replace(&mut self.variant, replacement);
        let contents = match old {
            ItemVariant::Container(data) => Some(data),
            ItemVariant::DepotLocker { contents, .. } => Some(contents),
            _ => None,
        };
        if let Some(mut contents) = contents {
            let children = contents.take_all();
            match self.container_mut() {
                Some(target) => {
                    for child in children {
                        target.push(child);
                    }
                }
                None => {
                    for child in children {
                        child.borrow_mut().set_parent(None);
                    }
                }
            }
        }
    }
}

fn clamp_u16(value: i64) -> u16 {
    value.clamp(0, i64::from(u16::MAX)) as u16
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::world::item_types::ItemType;

    pub(crate) fn test_catalog() -> ItemTypeIndex {
        let mut catalog = ItemTypeIndex::default();
        let mut entries = Vec::new();

        let mut plain = ItemType::new(10, ItemGroup::None);
        plain.moveable = true;
        plain.weight = 100;
        entries.push(plain);

        let mut other_plain = ItemType::new(20, ItemGroup::None);
        other_plain.moveable = true;
        entries.push(other_plain);

        let mut coins = ItemType::new(30, ItemGroup::None);
        coins.moveable = true;
        coins.stackable = true;
        coins.weight = 10;
        entries.push(coins);

        let mut rune = ItemType::new(40, ItemGroup::None);
        rune.moveable = true;
        rune.charges = 5;
        entries.push(rune);

        let mut vial = ItemType::new(50, ItemGroup::Fluid);
        vial.moveable = true;
        entries.push(vial);

        let mut key = ItemType::new(60, ItemGroup::Key);
        key.moveable = true;
        entries.push(key);

        let mut torch = ItemType::new(70, ItemGroup::None);
        torch.moveable = true;
        torch.decay_time = 120;
        torch.decay_to = Some(ItemTypeId(71));
        entries.push(torch);
        entries.push(ItemType::new(71, ItemGroup::None));

        let mut letter = ItemType::new(80, ItemGroup::None);
        letter.moveable = true;
        letter.can_write_text = true;
        entries.push(letter);

        let mut bag = ItemType::new(100, ItemGroup::Container);
        bag.moveable = true;
        bag.capacity = 8;
        bag.weight = 500;
        entries.push(bag);

        let mut backpack = ItemType::new(101, ItemGroup::Container);
        backpack.moveable = true;
        backpack.capacity = 20;
        entries.push(backpack);

        let mut chest = ItemType::new(110, ItemGroup::Chest);
        chest.capacity = 10;
        entries.push(chest);

        entries.push(ItemType::new(120, ItemGroup::Depot));
        entries.push(ItemType::new(200, ItemGroup::Door));
        entries.push(ItemType::new(201, ItemGroup::Door));
        entries.push(ItemType::new(300, ItemGroup::Bed));
        entries.push(ItemType::new(301, ItemGroup::Bed));
        entries.push(ItemType::new(400, ItemGroup::Teleport));
        entries.push(ItemType::new(500, ItemGroup::None));
        entries.push(ItemType::new(600, ItemGroup::Deprecated));

        let mut blackboard = ItemType::new(700, ItemGroup::None);
        blackboard.can_write_text = true;
        entries.push(blackboard);

        for entry in entries {
            catalog.insert(entry).expect("insert");
        }
        catalog
    }

    #[test]
    fn construction_dispatches_on_category() {
        let catalog = test_catalog();
        let cases = [
            (10, "item"),
            (100, "container"),
            (110, "container"),
            (120, "depot locker"),
            (200, "door"),
            (300, "bed"),
            (400, "teleport"),
        ];
        for (id, expected) in cases {
            let item = Item::create(&catalog, ItemTypeId(id), 0).expect("create");
            assert_eq!(item.variant().name(), expected, "type {}", id);
        }
        assert!(Item::create(&catalog, ItemTypeId(600), 0).is_none());
        assert!(Item::create(&catalog, ItemTypeId(9999), 0).is_none());
    }

    #[test]
    fn construction_initializes_sub_type() {
        let catalog = test_catalog();
        let coins = Item::create(&catalog, ItemTypeId(30), 0).expect("coins");
        assert_eq!(coins.count(), 1);
        let coins = Item::create(&catalog, ItemTypeId(30), 37).expect("coins");
        assert_eq!(coins.sub_type(&catalog), 37);

        let rune = Item::create(&catalog, ItemTypeId(40), 0).expect("rune");
        assert_eq!(rune.charges(), 5);
        assert_eq!(rune.sub_type(&catalog), 5);

        let vial = Item::create(&catalog, ItemTypeId(50), 7).expect("vial");
        assert_eq!(vial.fluid_type(), 7);

        let key = Item::create(&catalog, ItemTypeId(60), 4711).expect("key");
        assert_eq!(key.get_int_attr(AttributeKind::KeyNumber), 4711);

        let torch = Item::create(&catalog, ItemTypeId(70), 0).expect("torch");
        assert_eq!(torch.duration(), 120_000);
    }

    #[test]
    fn equals_compares_type_and_attributes() {
        let catalog = test_catalog();
        let mut first = Item::create(&catalog, ItemTypeId(10), 0).expect("first");
        let mut second = Item::create(&catalog, ItemTypeId(10), 0).expect("second");
        assert!(first.equals(&second));

        first.set_text("hello");
        assert!(!first.equals(&second));
        second.set_text("hello");
        assert!(first.equals(&second));

        second.set_text("world");
        assert!(!first.equals(&second));

        let other = Item::create(&catalog, ItemTypeId(20), 0).expect("other");
        let mut plain = Item::create(&catalog, ItemTypeId(10), 0).expect("plain");
        assert!(!plain.equals(&other));

        plain.set_action_id(1000);
        plain.remove_attribute(AttributeKind::ActionId);
        let fresh = Item::create(&catalog, ItemTypeId(10), 0).expect("fresh");
        assert!(plain.equals(&fresh));
    }

    #[test]
    fn clone_is_detached_deep_copy() {
        let catalog = test_catalog();
        let bag = create_item(&catalog, ItemTypeId(100), 0).expect("bag");
        let coins = create_item(&catalog, ItemTypeId(30), 12).expect("coins");
        coins.borrow_mut().set_str_attr(AttributeKind::Name, "lucky coins");
        crate::entities::cylinder::Cylinder::Container(Rc::clone(&bag))
            .add_item(&coins)
            .expect("add");

        let copy = clone_item(&bag);
        assert!(copy.borrow().parent().is_none());
        assert!(copy.borrow().equals(&bag.borrow()));
        let copy_ref = copy.borrow();
        let children = copy_ref.container().expect("container").items();
        assert_eq!(children.len(), 1);
        assert!(!Rc::ptr_eq(&children[0], &coins));
        assert_eq!(children[0].borrow().get_str_attr(AttributeKind::Name), "lucky coins");
        assert_eq!(children[0].borrow().count(), 12);

        coins.borrow_mut().set_str_attr(AttributeKind::Name, "changed");
        assert_eq!(children[0].borrow().get_str_attr(AttributeKind::Name), "lucky coins");
    }

    #[test]
    fn set_type_switches_variant_and_decay() {
        let catalog = test_catalog();
        let mut door = Item::create(&catalog, ItemTypeId(200), 0).expect("door");
        door.set_door_id(3);
        door.set_type(&catalog, ItemTypeId(201));
        assert_eq!(door.type_id(), ItemTypeId(201));
        assert!(door.is_door());
        assert_eq!(door.door_id(), 3);

        let mut plain = Item::create(&catalog, ItemTypeId(10), 0).expect("plain");
        plain.set_int_attr(AttributeKind::CorpseOwner, 99);
        plain.set_type(&catalog, ItemTypeId(70));
        assert_eq!(plain.duration(), 120_000);
        assert_eq!(plain.decay_state(), DecayState::False);
        assert!(!plain.has_attribute(AttributeKind::CorpseOwner));

        plain.set_type(&catalog, ItemTypeId(10));
        assert!(!plain.has_attribute(AttributeKind::Duration));
        assert!(!plain.has_attribute(AttributeKind::DecayState));

        let mut locker = Item::create(&catalog, ItemTypeId(120), 0).expect("locker");
        locker.set_type(&catalog, ItemTypeId(110));
        assert_eq!(locker.variant().name(), "container");
    }

    #[test]
    fn weight_includes_stack_and_contents() {
        let catalog = test_catalog();
        let bag = create_item(&catalog, ItemTypeId(100), 0).expect("bag");
        let coins = create_item(&catalog, ItemTypeId(30), 20).expect("coins");
        let sword = create_item(&catalog, ItemTypeId(10), 0).expect("sword");
        sword.borrow_mut().set_int_attr(AttributeKind::Weight, 350);
        let cylinder = crate::entities::cylinder::Cylinder::Container(Rc::clone(&bag));
        cylinder.add_item(&coins).expect("coins");
        cylinder.add_item(&sword).expect("sword");
        assert_eq!(bag.borrow().weight(&catalog), 500 + 200 + 350);
    }
}
