use crate::entities::attributes::AttributeKind;
use crate::entities::cylinder::{Cylinder, GraphError};
use crate::entities::item::{create_item, DecayState, Item, ItemRef, ItemTypeId, ItemVariant};
use crate::persistence::prop_stream::{PropReader, PropWriter};
use crate::world::item_types::{ItemType, ItemTypeIndex};
use crate::world::position::Position;
use std::fmt;
use std::rc::Rc;

pub const ATTR_END: u8 = 0;
pub const ATTR_ACTION_ID: u8 = 4;
pub const ATTR_TEXT: u8 = 6;
pub const ATTR_DESC: u8 = 7;
pub const ATTR_TELE_DEST: u8 = 8;
pub const ATTR_DEPOT_ID: u8 = 10;
pub const ATTR_RUNE_CHARGES: u8 = 12;
pub const ATTR_HOUSEDOORID: u8 = 14;
pub const ATTR_COUNT: u8 = 15;
pub const ATTR_DURATION: u8 = 16;
pub const ATTR_DECAYING_STATE: u8 = 17;
pub const ATTR_WRITTENDATE: u8 = 18;
pub const ATTR_WRITTENBY: u8 = 19;
pub const ATTR_SLEEPERGUID: u8 = 20;
pub const ATTR_SLEEPSTART: u8 = 21;
pub const ATTR_CHARGES: u8 = 22;
pub const ATTR_CONTAINER_ITEMS: u8 = 23;
pub const ATTR_NAME: u8 = 24;
pub const ATTR_ARTICLE: u8 = 25;
pub const ATTR_PLURALNAME: u8 = 26;
pub const ATTR_WEIGHT: u8 = 27;
pub const ATTR_ATTACK: u8 = 28;
pub const ATTR_DEFENSE: u8 = 29;
pub const ATTR_ARMOR: u8 = 31;
pub const ATTR_SHOOTRANGE: u8 = 33;
pub const ATTR_KEYNUMBER: u8 = 34;
pub const ATTR_KEYHOLENUMBER: u8 = 35;
pub const ATTR_DOORLEVEL: u8 = 36;
pub const ATTR_DOORQUESTNUMBER: u8 = 37;
pub const ATTR_DOORQUESTVALUE: u8 = 38;
pub const ATTR_CHESTQUESTNUMBER: u8 = 39;
pub const ATTR_MISSILEEFFECT: u8 = 40;
pub const ATTR_MOVEMENT_ID: u8 = 41;
pub const ATTR_LIFELEECH: u8 = 42;
pub const ATTR_MANALEECH: u8 = 43;
pub const ATTR_CRITICAL: u8 = 44;
pub const ATTR_REFLECTION: u8 = 45;

/// Deepest container nesting accepted from a blob.
pub const MAX_NESTING_DEPTH: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Truncated { offset: usize },
    UnknownTag { tag: u8, offset: usize },
    StructuralMismatch { type_id: u16, reason: String },
    Graph(GraphError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { offset } => {
                write!(f, "attribute stream ends early at offset {}", offset)
            }
            DecodeError::UnknownTag { tag, offset } => {
                write!(f, "unknown attribute tag {} at offset {}", tag, offset)
            }
            DecodeError::StructuralMismatch { type_id, reason } => {
                write!(f, "item {}: {}", type_id, reason)
            }
            DecodeError::Graph(err) => write!(f, "attach failed: {}", err),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<GraphError> for DecodeError {
    fn from(err: GraphError) -> Self {
        DecodeError::Graph(err)
    }
}

/// One attribute read from the stream, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrUpdate {
    SubType(u16),
    Int(AttributeKind, i64),
    Str(AttributeKind, String),
    Duration(i64),
    DecayPending,
    DepotId(u16),
    Sleeper(u32),
    SleepStart(u32),
    Destination(Position),
}

/// Parsed form of one persisted item and its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedItem {
    pub type_id: ItemTypeId,
    /// False when the catalog has no usable type for the id; such items are
    /// read to keep the stream aligned and then dropped.
    pub known: bool,
    pub updates: Vec<AttrUpdate>,
    pub children: Option<Vec<DecodedItem>>,
}

impl DecodedItem {
    /// This item plus every nested child.
    pub fn total_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(DecodedItem::total_count)
            .sum::<usize>()
    }

    pub fn sleeper(&self) -> u32 {
        self.updates
            .iter()
            .rev()
            .find_map(|update| match update {
                AttrUpdate::Sleeper(guid) => Some(*guid),
                _ => None,
            })
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Plain,
    Container,
    Depot,
    Door,
    Bed,
    Teleport,
    Unknown,
}

impl Shape {
    fn of(item_type: Option<&ItemType>) -> Shape {
        let Some(item_type) = item_type else {
            return Shape::Unknown;
        };
        match ItemVariant::for_type(item_type) {
            ItemVariant::Container(_) => Shape::Container,
            ItemVariant::DepotLocker { .. } => Shape::Depot,
            ItemVariant::Door(_) => Shape::Door,
            ItemVariant::Bed(_) => Shape::Bed,
            ItemVariant::Teleport { .. } => Shape::Teleport,
            _ => Shape::Plain,
        }
    }

    fn accepts_children(self) -> bool {
        matches!(self, Shape::Container | Shape::Depot | Shape::Unknown)
    }
}

/// Reads one item, including nested contents, from `reader`.
pub fn decode_item(
    reader: &mut PropReader<'_>,
    catalog: &ItemTypeIndex,
) -> Result<DecodedItem, DecodeError> {
    decode_at_depth(reader, catalog, 0)
}

fn decode_at_depth(
    reader: &mut PropReader<'_>,
    catalog: &ItemTypeIndex,
    depth: usize,
) -> Result<DecodedItem, DecodeError> {
    let raw_id = read(reader, PropReader::read_u16)?;
    let type_id = ItemTypeId(raw_id);
    let item_type = catalog
        .get(type_id)
        .filter(|item_type| !item_type.is_deprecated());
    let shape = Shape::of(item_type);
    let mut decoded = DecodedItem {
        type_id,
        known: item_type.is_some(),
        updates: Vec::new(),
        children: None,
    };

    loop {
        let offset = reader.position();
        let tag = read(reader, PropReader::read_u8)?;
        let update = match tag {
            ATTR_END => break,
            ATTR_COUNT | ATTR_RUNE_CHARGES => {
                Some(AttrUpdate::SubType(u16::from(read(reader, PropReader::read_u8)?)))
            }
            ATTR_CHARGES => Some(AttrUpdate::SubType(read(reader, PropReader::read_u16)?)),
            ATTR_ACTION_ID => Some(int_u16(reader, AttributeKind::ActionId)?),
            ATTR_MOVEMENT_ID => Some(int_u16(reader, AttributeKind::MovementId)?),
            ATTR_TEXT => Some(string(reader, AttributeKind::Text)?),
            ATTR_DESC => Some(string(reader, AttributeKind::Description)?),
            ATTR_WRITTENDATE => Some(AttrUpdate::Int(
                AttributeKind::WrittenDate,
                i64::from(read(reader, PropReader::read_u32)?),
            )),
            ATTR_WRITTENBY => Some(string(reader, AttributeKind::Writer)?),
            ATTR_DURATION => {
                let duration = read(reader, PropReader::read_i32)?;
                Some(AttrUpdate::Duration(i64::from(duration.max(0))))
            }
            ATTR_DECAYING_STATE => {
                let state = read(reader, PropReader::read_u8)?;
                (state != 0).then_some(AttrUpdate::DecayPending)
            }
            ATTR_NAME => Some(string(reader, AttributeKind::Name)?),
            ATTR_ARTICLE => Some(string(reader, AttributeKind::Article)?),
            ATTR_PLURALNAME => Some(string(reader, AttributeKind::PluralName)?),
            ATTR_WEIGHT => Some(AttrUpdate::Int(
                AttributeKind::Weight,
                i64::from(read(reader, PropReader::read_u32)?),
            )),
            ATTR_ATTACK => Some(int_i32(reader, AttributeKind::Attack)?),
            ATTR_DEFENSE => Some(int_i32(reader, AttributeKind::Defense)?),
            ATTR_ARMOR => Some(int_i32(reader, AttributeKind::Armor)?),
            ATTR_SHOOTRANGE => Some(int_u8(reader, AttributeKind::ShootRange)?),
            ATTR_MISSILEEFFECT => Some(int_u8(reader, AttributeKind::MissileEffect)?),
            ATTR_KEYNUMBER => Some(int_u16(reader, AttributeKind::KeyNumber)?),
            ATTR_KEYHOLENUMBER => Some(int_u16(reader, AttributeKind::KeyholeNumber)?),
            ATTR_DOORLEVEL => Some(int_u16(reader, AttributeKind::DoorLevel)?),
            ATTR_DOORQUESTNUMBER => Some(int_u16(reader, AttributeKind::DoorQuestNumber)?),
            ATTR_DOORQUESTVALUE => Some(int_u16(reader, AttributeKind::DoorQuestValue)?),
            ATTR_CHESTQUESTNUMBER => Some(int_u16(reader, AttributeKind::ChestQuestNumber)?),
            ATTR_LIFELEECH => Some(int_u16(reader, AttributeKind::LifeLeech)?),
            ATTR_MANALEECH => Some(int_u16(reader, AttributeKind::ManaLeech)?),
            ATTR_CRITICAL => Some(int_u16(reader, AttributeKind::Critical)?),
            ATTR_REFLECTION => Some(int_u16(reader, AttributeKind::Reflection)?),
            // Variant tags on another variant: the catalog changed since the
            // save. Read the payload and drop it.
            ATTR_DEPOT_ID => {
                let depot_id = read(reader, PropReader::read_u16)?;
                (shape == Shape::Depot).then_some(AttrUpdate::DepotId(depot_id))
            }
            ATTR_HOUSEDOORID => {
                let door_id = read(reader, PropReader::read_u8)?;
                (shape == Shape::Door)
                    .then_some(AttrUpdate::Int(AttributeKind::DoorId, i64::from(door_id)))
            }
            ATTR_SLEEPERGUID => {
                let guid = read(reader, PropReader::read_u32)?;
                (shape == Shape::Bed).then_some(AttrUpdate::Sleeper(guid))
            }
            ATTR_SLEEPSTART => {
                let start = read(reader, PropReader::read_u32)?;
                (shape == Shape::Bed).then_some(AttrUpdate::SleepStart(start))
            }
            ATTR_TELE_DEST => {
                let x = read(reader, PropReader::read_u16)?;
                let y = read(reader, PropReader::read_u16)?;
                let z = read(reader, PropReader::read_u8)?;
                (shape == Shape::Teleport)
                    .then_some(AttrUpdate::Destination(Position::new(x, y, z)))
            }
            ATTR_CONTAINER_ITEMS => {
                if !shape.accepts_children() {
                    return Err(DecodeError::StructuralMismatch {
                        type_id: raw_id,
                        reason: "container contents on a non-container type".to_string(),
                    });
                }
                if depth >= MAX_NESTING_DEPTH {
                    return Err(DecodeError::StructuralMismatch {
                        type_id: raw_id,
                        reason: format!("containers nested deeper than {}", MAX_NESTING_DEPTH),
                    });
                }
                let count = read(reader, PropReader::read_u32)?;
                let mut children = Vec::new();
                for _ in 0..count {
                    children.push(decode_at_depth(reader, catalog, depth + 1)?);
                }
                let end_offset = reader.position();
                let end = read(reader, PropReader::read_u8)?;
                if end != ATTR_END {
                    return Err(DecodeError::StructuralMismatch {
                        type_id: raw_id,
                        reason: format!(
                            "expected end marker after contents at offset {}, found {}",
                            end_offset, end
                        ),
                    });
                }
                decoded.children = Some(children);
                break;
            }
            _ => return Err(DecodeError::UnknownTag { tag, offset }),
        };
        if let Some(update) = update {
            decoded.updates.push(update);
        }
    }

    Ok(decoded)
}

fn read<'a, T>(
    reader: &mut PropReader<'a>,
    op: impl FnOnce(&mut PropReader<'a>) -> Option<T>,
) -> Result<T, DecodeError> {
    let offset = reader.position();
    op(reader).ok_or(DecodeError::Truncated { offset })
}

fn int_u8(reader: &mut PropReader<'_>, kind: AttributeKind) -> Result<AttrUpdate, DecodeError> {
    Ok(AttrUpdate::Int(kind, i64::from(read(reader, PropReader::read_u8)?)))
}

fn int_u16(reader: &mut PropReader<'_>, kind: AttributeKind) -> Result<AttrUpdate, DecodeError> {
    Ok(AttrUpdate::Int(kind, i64::from(read(reader, PropReader::read_u16)?)))
}

fn int_i32(reader: &mut PropReader<'_>, kind: AttributeKind) -> Result<AttrUpdate, DecodeError> {
    Ok(AttrUpdate::Int(kind, i64::from(read(reader, PropReader::read_i32)?)))
}

fn string(reader: &mut PropReader<'_>, kind: AttributeKind) -> Result<AttrUpdate, DecodeError> {
    Ok(AttrUpdate::Str(kind, read(reader, PropReader::read_string)?))
}

/// Applies the scalar attributes of `decoded` to `item`. Updates for a
/// variant `item` does not have are ignored.
pub fn apply_attributes(item: &mut Item, decoded: &DecodedItem, catalog: &ItemTypeIndex) {
    for update in &decoded.updates {
        match update {
            AttrUpdate::SubType(value) => item.set_sub_type(catalog, *value),
            AttrUpdate::Int(kind, value) => item.set_int_attr(*kind, *value),
            AttrUpdate::Str(kind, value) => item.set_str_attr(*kind, value),
            AttrUpdate::Duration(value) => item.set_duration(*value),
            AttrUpdate::DecayPending => item.set_decay_state(DecayState::Pending),
            AttrUpdate::DepotId(value) => {
                if let ItemVariant::DepotLocker { depot_id, .. } = item.variant_mut() {
                    *depot_id = *value;
                }
            }
            AttrUpdate::Sleeper(guid) => {
                if let Some(bed) = item.bed_mut() {
                    bed.sleeper = *guid;
                }
            }
            AttrUpdate::SleepStart(start) => {
                if let Some(bed) = item.bed_mut() {
                    bed.sleep_start = *start;
                }
            }
            AttrUpdate::Destination(position) => {
                if let ItemVariant::Teleport { destination } = item.variant_mut() {
                    *destination = *position;
                }
            }
        }
    }
}

/// Counts of what happened while turning decoded records into items.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub created: usize,
    pub discarded: usize,
}

/// Builds a fresh item for `decoded`, contents included. Unknown types yield
/// `None` and are counted as discarded along with everything inside them.
pub fn instantiate(
    decoded: &DecodedItem,
    catalog: &ItemTypeIndex,
    stats: &mut BuildStats,
) -> Result<Option<ItemRef>, DecodeError> {
    if !decoded.known {
        stats.discarded += decoded.total_count();
        return Ok(None);
    }
    let Some(item) = create_item(catalog, decoded.type_id, 0) else {
        stats.discarded += decoded.total_count();
        return Ok(None);
    };
    apply_attributes(&mut item.borrow_mut(), decoded, catalog);
    stats.created += 1;
    attach_children(&item, decoded, catalog, stats)?;
    Ok(Some(item))
}

/// Appends the decoded contents of `decoded` to `container`, counting down
/// its `serialization_count` as children land.
pub fn attach_children(
    container: &ItemRef,
    decoded: &DecodedItem,
    catalog: &ItemTypeIndex,
    stats: &mut BuildStats,
) -> Result<(), DecodeError> {
    let Some(children) = &decoded.children else {
        return Ok(());
    };
    {
        let mut target = container.borrow_mut();
        let Some(contents) = target.container_mut() else {
            return Err(DecodeError::StructuralMismatch {
                type_id: decoded.type_id.0,
                reason: "contents decoded for an item that holds none".to_string(),
            });
        };
        contents.serialization_count = children.len() as u32;
    }
    let cylinder = Cylinder::Container(Rc::clone(container));
    for child in children {
        if let Some(built) = instantiate(child, catalog, stats)? {
            cylinder.add_item(&built)?;
        }
        if let Some(contents) = container.borrow_mut().container_mut() {
            contents.serialization_count = contents.serialization_count.saturating_sub(1);
        }
    }
    Ok(())
}

/// Writes `item` and its contents depth-first.
pub fn serialize_item(writer: &mut PropWriter, item: &Item, catalog: &ItemTypeIndex) {
    writer.write_u16(item.type_id().0);
    serialize_attributes(writer, item, catalog);

    if let Some(contents) = item.container() {
        writer.write_u8(ATTR_CONTAINER_ITEMS);
        writer.write_u32(contents.len() as u32);
        for child in contents.items() {
            serialize_item(writer, &child.borrow(), catalog);
        }
    }
    writer.write_u8(ATTR_END);
}

fn serialize_attributes(writer: &mut PropWriter, item: &Item, catalog: &ItemTypeIndex) {
    let item_type = catalog.get(item.type_id());
    let (counted, moveable) = item_type.map_or((false, false), |item_type| {
        (
            item_type.stackable || item_type.is_fluid_container() || item_type.is_splash(),
            item_type.moveable,
        )
    });

    if counted {
        writer.write_u8(ATTR_COUNT);
        writer.write_u8(item.sub_type(catalog).min(u16::from(u8::MAX)) as u8);
    }
    let charges = item.charges();
    if charges != 0 {
        writer.write_u8(ATTR_CHARGES);
        writer.write_u16(charges);
    }
    if moveable {
        if item.action_id() != 0 {
            writer.write_u8(ATTR_ACTION_ID);
            writer.write_u16(item.action_id());
        }
        if item.movement_id() != 0 {
            writer.write_u8(ATTR_MOVEMENT_ID);
            writer.write_u16(item.movement_id());
        }
    }

    write_str(writer, ATTR_TEXT, item.text());
    if item.written_date() != 0 {
        writer.write_u8(ATTR_WRITTENDATE);
        writer.write_u32(item.written_date());
    }
    write_str(writer, ATTR_WRITTENBY, item.writer());
    write_str(writer, ATTR_DESC, item.special_description());

    if item.has_attribute(AttributeKind::Duration) {
        writer.write_u8(ATTR_DURATION);
        writer.write_i32(item.duration().clamp(0, i64::from(i32::MAX)) as i32);
    }
    let decay_state = item.decay_state();
    if decay_state != DecayState::False {
        writer.write_u8(ATTR_DECAYING_STATE);
        writer.write_u8(decay_state as u8);
    }

    for (tag, kind) in [
        (ATTR_NAME, AttributeKind::Name),
        (ATTR_ARTICLE, AttributeKind::Article),
        (ATTR_PLURALNAME, AttributeKind::PluralName),
    ] {
        if item.has_attribute(kind) {
            write_str(writer, tag, item.get_str_attr(kind));
        }
    }
    if item.has_attribute(AttributeKind::Weight) {
        writer.write_u8(ATTR_WEIGHT);
        writer.write_u32(clamp_attr(item, AttributeKind::Weight, 0, i64::from(u32::MAX)) as u32);
    }
    for (tag, kind) in [
        (ATTR_ATTACK, AttributeKind::Attack),
        (ATTR_DEFENSE, AttributeKind::Defense),
        (ATTR_ARMOR, AttributeKind::Armor),
    ] {
        if item.has_attribute(kind) {
            writer.write_u8(tag);
            writer.write_i32(
                clamp_attr(item, kind, i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
            );
        }
    }
    for (tag, kind) in [
        (ATTR_SHOOTRANGE, AttributeKind::ShootRange),
        (ATTR_MISSILEEFFECT, AttributeKind::MissileEffect),
    ] {
        if item.has_attribute(kind) {
            writer.write_u8(tag);
            writer.write_u8(clamp_attr(item, kind, 0, i64::from(u8::MAX)) as u8);
        }
    }
    for (tag, kind) in [
        (ATTR_KEYNUMBER, AttributeKind::KeyNumber),
        (ATTR_KEYHOLENUMBER, AttributeKind::KeyholeNumber),
        (ATTR_DOORLEVEL, AttributeKind::DoorLevel),
        (ATTR_DOORQUESTNUMBER, AttributeKind::DoorQuestNumber),
        (ATTR_DOORQUESTVALUE, AttributeKind::DoorQuestValue),
        (ATTR_CHESTQUESTNUMBER, AttributeKind::ChestQuestNumber),
    ] {
        if item.has_attribute(kind) {
            writer.write_u8(tag);
            writer.write_u16(clamp_attr(item, kind, 0, i64::from(u16::MAX)) as u16);
        }
    }
    for (tag, kind) in [
        (ATTR_LIFELEECH, AttributeKind::LifeLeech),
        (ATTR_MANALEECH, AttributeKind::ManaLeech),
        (ATTR_CRITICAL, AttributeKind::Critical),
        (ATTR_REFLECTION, AttributeKind::Reflection),
    ] {
        let value = clamp_attr(item, kind, 0, i64::from(u16::MAX)) as u16;
        if value != 0 {
            writer.write_u8(tag);
            writer.write_u16(value);
        }
    }

    match item.variant() {
        ItemVariant::Door(_) => {
            let door_id = item.door_id();
            if door_id != 0 {
                writer.write_u8(ATTR_HOUSEDOORID);
                writer.write_u8(door_id);
            }
        }
        ItemVariant::Bed(bed) => {
            if bed.sleeper != 0 {
                writer.write_u8(ATTR_SLEEPERGUID);
                writer.write_u32(bed.sleeper);
                writer.write_u8(ATTR_SLEEPSTART);
                writer.write_u32(bed.sleep_start);
            }
        }
        ItemVariant::Teleport { destination } => {
            if !destination.is_zero() {
                writer.write_u8(ATTR_TELE_DEST);
                writer.write_u16(destination.x);
                writer.write_u16(destination.y);
                writer.write_u8(destination.z);
            }
        }
        _ => {}
    }
}

fn write_str(writer: &mut PropWriter, tag: u8, value: &str) {
    if value.is_empty() {
        return;
    }
    writer.write_u8(tag);
    writer.write_string(value);
}

fn clamp_attr(item: &Item, kind: AttributeKind, min: i64, max: i64) -> i64 {
    item.get_int_attr(kind).clamp(min, max)
}
