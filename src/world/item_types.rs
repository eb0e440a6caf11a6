use crate::entities::item::ItemTypeId;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Catalog category. Drives which concrete item representation gets built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemGroup {
    #[default]
    None,
    Container,
    Chest,
    Depot,
    Door,
    Bed,
    Teleport,
    MagicField,
    Mailbox,
    Key,
    Fluid,
    Splash,
    Deprecated,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemType {
    pub id: ItemTypeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group: ItemGroup,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default)]
    pub moveable: bool,
    #[serde(default)]
    pub pickupable: bool,
    #[serde(default)]
    pub can_write_text: bool,
    #[serde(default)]
    pub charges: u16,
    /// Seconds until the item decays; zero means it never does.
    #[serde(default)]
    pub decay_time: u32,
    #[serde(default)]
    pub decay_to: Option<ItemTypeId>,
    #[serde(default)]
    pub stop_time: bool,
    #[serde(default)]
    pub capacity: u16,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub attack: i32,
    #[serde(default)]
    pub defense: i32,
    #[serde(default)]
    pub armor: i32,
}

impl ItemType {
    pub fn new(id: u16, group: ItemGroup) -> Self {
        Self {
            id: ItemTypeId(id),
            name: String::new(),
            group,
            stackable: false,
            moveable: false,
            pickupable: false,
            can_write_text: false,
            charges: 0,
            decay_time: 0,
            decay_to: None,
            stop_time: false,
            capacity: 0,
            weight: 0,
            attack: 0,
            defense: 0,
            armor: 0,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.group, ItemGroup::Container | ItemGroup::Chest | ItemGroup::Depot)
    }

    pub fn is_door(&self) -> bool {
        self.group == ItemGroup::Door
    }

    pub fn is_bed(&self) -> bool {
        self.group == ItemGroup::Bed
    }

    pub fn is_fluid_container(&self) -> bool {
        self.group == ItemGroup::Fluid
    }

    pub fn is_splash(&self) -> bool {
        self.group == ItemGroup::Splash
    }

    pub fn is_key(&self) -> bool {
        self.group == ItemGroup::Key
    }

    pub fn is_deprecated(&self) -> bool {
        self.group == ItemGroup::Deprecated
    }

    /// Default duration in milliseconds for freshly created instances.
    pub fn default_duration_ms(&self) -> i64 {
        i64::from(self.decay_time) * 1000
    }

    pub fn can_decay(&self) -> bool {
        self.decay_time != 0 && self.decay_to.is_some()
    }
}

#[derive(Debug, Default, Clone)]
pub struct ItemTypeIndex {
    types: HashMap<ItemTypeId, ItemType>,
}

impl ItemTypeIndex {
    pub fn get(&self, id: ItemTypeId) -> Option<&ItemType> {
        self.types.get(&id)
    }

    pub fn insert(&mut self, item: ItemType) -> Result<(), String> {
        if self.types.contains_key(&item.id) {
            return Err(format!("item type {:?} already exists", item.id));
        }
        self.types.insert(item.id, item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        let entries: Vec<ItemType> = serde_yaml::from_str(content)
            .map_err(|err| format!("item catalog parse failed: {}", err))?;
        let mut index = Self::default();
        for entry in entries {
            if entry.id.0 == 0 {
                return Err(format!("item catalog entry '{}' uses reserved id 0", entry.name));
            }
            index.insert(entry)?;
        }
        Ok(index)
    }
}

pub fn load_item_types(path: &Path) -> Result<ItemTypeIndex, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read item catalog {}: {}", path.display(), err))?;
    ItemTypeIndex::from_yaml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalog_with_defaults() {
        let catalog = ItemTypeIndex::from_yaml(
            r#"
- id: 100
  name: chest
  group: chest
  capacity: 20
- id: 3031
  name: gold coin
  stackable: true
  moveable: true
  pickupable: true
- id: 2110
  name: torch
  moveable: true
  decay_time: 60
  decay_to: 2111
"#,
        )
        .expect("catalog");
        assert_eq!(catalog.len(), 3);
        let chest = catalog.get(ItemTypeId(100)).expect("chest");
        assert!(chest.is_container());
        assert!(!chest.moveable);
        let coin = catalog.get(ItemTypeId(3031)).expect("coin");
        assert!(coin.stackable);
        assert_eq!(coin.group, ItemGroup::None);
        let torch = catalog.get(ItemTypeId(2110)).expect("torch");
        assert!(torch.can_decay());
        assert_eq!(torch.default_duration_ms(), 60_000);
    }

    #[test]
    fn rejects_duplicate_and_reserved_ids() {
        let duplicate = ItemTypeIndex::from_yaml("- id: 5\n- id: 5\n");
        assert!(duplicate.is_err());
        let reserved = ItemTypeIndex::from_yaml("- id: 0\n  name: nothing\n");
        assert!(reserved.is_err());
    }
}
