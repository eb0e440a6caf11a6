use crate::entities::cylinder::Cylinder;
use crate::entities::item::{ItemRef, ItemTypeId};
use crate::persistence::codec::{
    apply_attributes, attach_children, decode_item, instantiate, serialize_item, BuildStats,
    DecodeError, DecodedItem,
};
use crate::persistence::prop_stream::{PropReader, PropWriter};
use crate::persistence::store::{StoreError, TileRow, WorldStore};
use crate::telemetry::logging;
use crate::world::item_types::ItemTypeIndex;
use crate::world::map::{Tile, TileRef};
use crate::world::position::Position;
use crate::world::state::WorldState;
use std::rc::Rc;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub skipped_rows: usize,
    pub failed_rows: usize,
    /// Stationary fixtures that took over a persisted record.
    pub matched: usize,
    /// Persisted stationary items with no fixture left to bind to.
    pub throwaway: usize,
    pub items: BuildStats,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub tiles: usize,
    pub items: usize,
    pub bytes: usize,
}

/// Rebuilds house contents from the stored tile rows. Bad rows are logged and
/// skipped; only a failing store read is an error.
pub fn load_house_items(
    store: &dyn WorldStore,
    world: &mut WorldState,
) -> Result<LoadReport, StoreError> {
    let rows = store.tile_rows()?;
    let mut report = LoadReport::default();
    for row in &rows {
        report.rows += 1;
        load_row(world, row, &mut report);
    }
    logging::log_houses(&format!(
        "house items loaded: rows={}, skipped={}, failed={}, created={}, matched={}, discarded={}",
        report.rows,
        report.skipped_rows,
        report.failed_rows,
        report.items.created,
        report.matched,
        report.items.discarded
    ));
    Ok(report)
}

fn load_row(world: &mut WorldState, row: &TileRow, report: &mut LoadReport) {
    let mut reader = PropReader::new(&row.data);
    let Some((position, count)) = read_tile_header(&mut reader) else {
        report.failed_rows += 1;
        logging::log_error(&format!(
            "house {} tile row too short for a header ({} bytes)",
            row.house_id,
            row.data.len()
        ));
        return;
    };
    let Some(tile) = world.map.tile(position) else {
        report.skipped_rows += 1;
        logging::log_houses(&format!(
            "house {} row for missing tile {} skipped",
            row.house_id, position
        ));
        return;
    };

    let mut claimed: Vec<ItemRef> = Vec::new();
    for index in 0..count {
        let result = match decode_item(&mut reader, &world.item_types) {
            Ok(decoded) => place_item(world, &tile, &decoded, &mut claimed, report),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            report.failed_rows += 1;
            logging::log_error(&format!(
                "house {} tile {} item {}/{}: {}",
                row.house_id,
                position,
                index + 1,
                count,
                err
            ));
            return;
        }
    }
}

fn read_tile_header(reader: &mut PropReader<'_>) -> Option<(Position, u32)> {
    let x = reader.read_u16()?;
    let y = reader.read_u16()?;
    let z = reader.read_u8()?;
    let count = reader.read_u32()?;
    Some((Position::new(x, y, z), count))
}

fn place_item(
    world: &mut WorldState,
    tile: &TileRef,
    decoded: &DecodedItem,
    claimed: &mut Vec<ItemRef>,
    report: &mut LoadReport,
) -> Result<(), DecodeError> {
    let moveable = match world.item_types.get(decoded.type_id) {
        Some(item_type) if decoded.known => item_type.moveable,
        _ => {
            report.items.discarded += decoded.total_count();
            return Ok(());
        }
    };

    if moveable {
        let Some(item) = instantiate(decoded, &world.item_types, &mut report.items)? else {
            return Ok(());
        };
        Cylinder::Tile(Rc::clone(tile)).add_item(&item)?;
        register_loaded(world, &item);
        return Ok(());
    }

    match find_fixture(tile, decoded.type_id, &world.item_types, claimed) {
        Some(fixture) => {
            apply_attributes(&mut fixture.borrow_mut(), decoded, &world.item_types);
            if decoded.children.is_some() {
                replace_contents(&fixture, decoded, &world.item_types, &mut report.items)?;
            }
            if fixture.borrow().type_id() != decoded.type_id {
                fixture.borrow_mut().set_type(&world.item_types, decoded.type_id);
            }
            report.matched += 1;
            claimed.push(Rc::clone(&fixture));
            register_loaded(world, &fixture);
        }
        None => {
            report.throwaway += 1;
            let mut stats = BuildStats::default();
            let throwaway = instantiate(decoded, &world.item_types, &mut stats)?;
            report.items.discarded += stats.created + stats.discarded;
            if let Some(throwaway) = throwaway {
                release_throwaway(world, &throwaway);
            }
        }
    }
    Ok(())
}

/// First unclaimed tile item with the same type, falling back to any door
/// for a door record and any bed for a bed record.
fn find_fixture(
    tile: &TileRef,
    type_id: ItemTypeId,
    catalog: &ItemTypeIndex,
    claimed: &[ItemRef],
) -> Option<ItemRef> {
    let items: Vec<ItemRef> = tile.borrow().items().to_vec();
    let free = |item: &&ItemRef| !claimed.iter().any(|taken| Rc::ptr_eq(taken, *item));

    if let Some(found) = items
        .iter()
        .filter(free)
        .find(|item| item.borrow().type_id() == type_id)
    {
        return Some(Rc::clone(found));
    }
    let item_type = catalog.get(type_id)?;
    if item_type.is_door() {
        return items
            .iter()
            .filter(free)
            .find(|item| item.borrow().is_door())
            .cloned();
    }
    if item_type.is_bed() {
        return items
            .iter()
            .filter(free)
            .find(|item| item.borrow().is_bed())
            .cloned();
    }
    None
}

/// Persisted contents win over whatever the static map placed inside.
fn replace_contents(
    container: &ItemRef,
    decoded: &DecodedItem,
    catalog: &ItemTypeIndex,
    stats: &mut BuildStats,
) -> Result<(), DecodeError> {
    let current: Vec<ItemRef> = match container.borrow().container() {
        Some(contents) => contents.items().to_vec(),
        None => Vec::new(),
    };
    let cylinder = Cylinder::Container(Rc::clone(container));
    for child in &current {
        cylinder.remove_item(child)?;
    }
    attach_children(container, decoded, catalog, stats)
}

/// Starts decay and records bed sleepers for `item` and everything in it.
fn register_loaded(world: &mut WorldState, item: &ItemRef) {
    let sleeper = item.borrow().bed().map_or(0, |bed| bed.sleeper);
    if sleeper != 0 {
        world.set_bed_sleeper(item, sleeper);
    }
    world.start_decay(item);
    let children: Vec<ItemRef> = match item.borrow().container() {
        Some(contents) => contents.items().to_vec(),
        None => Vec::new(),
    };
    for child in &children {
        register_loaded(world, child);
    }
}

fn release_throwaway(world: &mut WorldState, item: &ItemRef) {
    let sleeper = item.borrow().bed().map_or(0, |bed| bed.sleeper);
    if sleeper != 0 && world.remove_bed_sleeper(sleeper).is_some() {
        logging::log_houses(&format!(
            "released bed of sleeper {}: bed no longer on the map",
            sleeper
        ));
    }
}

/// Whether `item` belongs in the house item store.
pub fn should_persist(item: &ItemRef, catalog: &ItemTypeIndex) -> bool {
    let item = item.borrow();
    let (moveable, writable) = item
        .item_type(catalog)
        .map_or((false, false), |item_type| {
            (item_type.moveable, item_type.can_write_text)
        });
    moveable
        || writable
        || item.is_door()
        || item.is_bed()
        || item.container().map_or(false, |contents| !contents.is_empty())
}

/// Writes the persisted items of `tile` into `writer`. Returns how many
/// top-level items were written; nothing is written when that is zero.
pub fn save_tile(writer: &mut PropWriter, tile: &Tile, catalog: &ItemTypeIndex) -> usize {
    let selected: Vec<&ItemRef> = tile
        .items()
        .iter()
        .filter(|item| should_persist(item, catalog))
        .collect();
    if selected.is_empty() {
        return 0;
    }
    let position = tile.position();
    writer.write_u16(position.x);
    writer.write_u16(position.y);
    writer.write_u8(position.z);
    writer.write_u32(selected.len() as u32);
    for item in &selected {
        serialize_item(writer, &item.borrow(), catalog);
    }
    selected.len()
}

/// Replaces every stored tile row with the current house contents in one
/// transaction. On error nothing is committed.
pub fn save_house_items(
    store: &mut dyn WorldStore,
    world: &WorldState,
) -> Result<SaveReport, StoreError> {
    let mut report = SaveReport::default();
    let mut rows = Vec::new();
    let mut writer = PropWriter::with_capacity(1024);
    for house in world.houses.iter() {
        for tile in house.tiles() {
            writer.clear();
            let written = save_tile(&mut writer, &tile.borrow(), &world.item_types);
            if written == 0 {
                continue;
            }
            report.tiles += 1;
            report.items += written;
            report.bytes += writer.len();
            rows.push(TileRow {
                house_id: house.id,
                data: writer.as_slice().to_vec(),
            });
        }
    }

    let mut tx = store.begin()?;
    tx.clear_tile_rows()?;
    tx.insert_tile_rows(&rows)?;
    tx.commit()?;
    logging::log_houses(&format!(
        "house items saved: tiles={}, items={}, bytes={}",
        report.tiles, report.items, report.bytes
    ));
    Ok(report)
}
