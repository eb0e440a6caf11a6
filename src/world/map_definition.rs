use crate::entities::cylinder::Cylinder;
use crate::entities::item::{create_item, ItemRef, ItemTypeId};
use crate::telemetry::logging;
use crate::world::housing::Houses;
use crate::world::item_types::ItemTypeIndex;
use crate::world::map::Map;
use crate::world::position::Position;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

/// Static world layout as written by the map editor export.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub houses: Vec<HouseDefinition>,
    #[serde(default)]
    pub tiles: Vec<TileDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HouseDefinition {
    pub id: u32,
    pub name: String,
    pub entry: Position,
    #[serde(default)]
    pub town_id: u32,
    #[serde(default)]
    pub rent: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TileDefinition {
    pub position: Position,
    #[serde(default)]
    pub house_id: Option<u32>,
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemDefinition {
    pub id: ItemTypeId,
    #[serde(default)]
    pub count: u16,
    #[serde(default)]
    pub action_id: u16,
    #[serde(default)]
    pub door_id: u32,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub destination: Option<Position>,
    #[serde(default)]
    pub contents: Vec<ItemDefinition>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MapBuildReport {
    pub tiles: usize,
    pub items: usize,
    pub unknown_items: usize,
    pub dropped_house_items: usize,
}

pub fn load_map_definition(
    path: &Path,
    catalog: &ItemTypeIndex,
) -> Result<(Map, Houses, MapBuildReport), String> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read map {}: {}", path.display(), err))?;
    let definition: MapDefinition = serde_yaml::from_str(&content)
        .map_err(|err| format!("map {} parse failed: {}", path.display(), err))?;
    build_map(&definition, catalog)
}

/// Builds the live map and house registry. Moveable items placed on house
/// tiles are dropped: those come from the house item store instead.
pub fn build_map(
    definition: &MapDefinition,
    catalog: &ItemTypeIndex,
) -> Result<(Map, Houses, MapBuildReport), String> {
    let mut map = Map::new(definition.name.clone());
    let mut houses = Houses::new();
    let mut report = MapBuildReport::default();

    for entry in &definition.houses {
        if houses.get(entry.id).is_some() {
            return Err(format!("map declares house {} twice", entry.id));
        }
        let house = houses.add_house(entry.id);
        house.name = entry.name.clone();
        house.entry = entry.entry;
        house.town_id = entry.town_id;
        house.rent = entry.rent;
    }

    for entry in &definition.tiles {
        if map.has_tile(entry.position) {
            return Err(format!("map declares tile {} twice", entry.position));
        }
        let tile = map.get_or_create_tile(entry.position);
        report.tiles += 1;
        if let Some(house_id) = entry.house_id {
            let house = houses.get_mut(house_id).ok_or_else(|| {
                format!("tile {} references unknown house {}", entry.position, house_id)
            })?;
            house.add_tile(&tile);
        }

        let cylinder = Cylinder::Tile(Rc::clone(&tile));
        for item_entry in &entry.items {
            let Some(item) = build_item(item_entry, catalog, &mut report)? else {
                continue;
            };
            if let Some(house_id) = entry.house_id {
                let moveable = item
                    .borrow()
                    .item_type(catalog)
                    .map_or(false, |item_type| item_type.moveable);
                if moveable {
                    report.dropped_house_items += 1;
                    logging::log_houses(&format!(
                        "dropping moveable item {} on house {} tile {}",
                        item_entry.id.0, house_id, entry.position
                    ));
                    continue;
                }
                if let Some(house) = houses.get_mut(house_id) {
                    register_house_fixture(house, &item);
                }
            }
            cylinder
                .add_item(&item)
                .map_err(|err| format!("tile {}: {}", entry.position, err))?;
        }
    }

    if report.dropped_house_items > 0 {
        eprintln!(
            "tibia: map dropped {} moveable item(s) on house tiles",
            report.dropped_house_items
        );
    }
    Ok((map, houses, report))
}

fn register_house_fixture(house: &mut crate::world::housing::House, item: &ItemRef) {
    let (is_door, is_bed) = {
        let item = item.borrow();
        (item.is_door(), item.is_bed())
    };
    if is_door {
        house.add_door(item);
    } else if is_bed {
        house.add_bed(item);
    }
}

fn build_item(
    entry: &ItemDefinition,
    catalog: &ItemTypeIndex,
    report: &mut MapBuildReport,
) -> Result<Option<ItemRef>, String> {
    let Some(item) = create_item(catalog, entry.id, entry.count) else {
        report.unknown_items += 1;
        logging::log_error(&format!("map references unknown item type {}", entry.id.0));
        return Ok(None);
    };
    {
        let mut item = item.borrow_mut();
        if entry.action_id != 0 {
            item.set_action_id(entry.action_id);
        }
        if entry.door_id != 0 {
            if !item.is_door() {
                return Err(format!("door id set on non-door item {}", entry.id.0));
            }
            let door_id = u8::try_from(entry.door_id).map_err(|_| {
                format!(
                    "door id {} on item {} is out of range (1-255)",
                    entry.door_id, entry.id.0
                )
            })?;
            item.set_door_id(door_id);
        }
        if let Some(text) = &entry.text {
            item.set_text(text);
        }
        if let Some(destination) = entry.destination {
            match item.variant_mut() {
                crate::entities::item::ItemVariant::Teleport { destination: target } => {
                    *target = destination;
                }
                _ => return Err(format!("destination set on non-teleport item {}", entry.id.0)),
            }
        }
    }
    report.items += 1;

    if !entry.contents.is_empty() {
        let cylinder = Cylinder::Container(Rc::clone(&item));
        for child_entry in &entry.contents {
            let Some(child) = build_item(child_entry, catalog, report)? else {
                continue;
            };
            cylinder
                .add_item(&child)
                .map_err(|err| format!("item {} contents: {}", entry.id.0, err))?;
        }
    }
    Ok(Some(item))
}
