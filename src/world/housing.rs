use crate::entities::item::ItemRef;
use crate::world::access_list::{AccessList, AccessSubject, NameResolver};
use crate::world::map::TileRef;
use crate::world::position::Position;
use std::collections::BTreeMap;
use std::rc::Rc;

pub const GUEST_LIST: u32 = 0x100;
pub const SUBOWNER_LIST: u32 = 0x101;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    NotInvited,
    Guest,
    SubOwner,
    Owner,
}

#[derive(Debug)]
pub struct House {
    pub id: u32,
    pub name: String,
    pub entry: Position,
    pub town_id: u32,
    pub rent: u32,
    /// Unix timestamp up to which rent is paid.
    pub paid_until: i64,
    pub rent_warnings: u32,
    owner: u32,
    guests: AccessList,
    subowners: AccessList,
    doors: Vec<ItemRef>,
    beds: Vec<ItemRef>,
    tiles: Vec<TileRef>,
}

impl House {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: String::new(),
            entry: Position::default(),
            town_id: 0,
            rent: 0,
            paid_until: 0,
            rent_warnings: 0,
            owner: 0,
            guests: AccessList::new(),
            subowners: AccessList::new(),
            doors: Vec::new(),
            beds: Vec::new(),
            tiles: Vec::new(),
        }
    }

    pub fn owner(&self) -> u32 {
        self.owner
    }

    /// Hands the house to `owner`. A real change of hands clears every
    /// access list and the rent warnings of the previous owner.
    pub fn set_owner(&mut self, owner: u32) {
        if self.owner == owner {
            return;
        }
        if self.owner != 0 {
            self.guests = AccessList::new();
            self.subowners = AccessList::new();
            for door in &self.doors {
                if let Some(data) = door.borrow_mut().door_mut() {
                    data.access_list = None;
                }
            }
            self.rent_warnings = 0;
        }
        self.owner = owner;
    }

    pub fn add_tile(&mut self, tile: &TileRef) {
        if self.tiles.iter().any(|known| Rc::ptr_eq(known, tile)) {
            return;
        }
        tile.borrow_mut().set_house_id(Some(self.id));
        self.tiles.push(Rc::clone(tile));
    }

    pub fn tiles(&self) -> &[TileRef] {
        &self.tiles
    }

    pub fn add_door(&mut self, door: &ItemRef) {
        if self.doors.iter().any(|known| Rc::ptr_eq(known, door)) {
            return;
        }
        if let Some(data) = door.borrow_mut().door_mut() {
            data.house_id = Some(self.id);
        }
        self.doors.push(Rc::clone(door));
    }

    pub fn doors(&self) -> &[ItemRef] {
        &self.doors
    }

    pub fn door_by_number(&self, door_id: u32) -> Option<&ItemRef> {
        self.doors
            .iter()
            .find(|door| u32::from(door.borrow().door_id()) == door_id)
    }

    pub fn add_bed(&mut self, bed: &ItemRef) {
        if self.beds.iter().any(|known| Rc::ptr_eq(known, bed)) {
            return;
        }
        if let Some(data) = bed.borrow_mut().bed_mut() {
            data.house_id = Some(self.id);
        }
        self.beds.push(Rc::clone(bed));
    }

    pub fn beds(&self) -> &[ItemRef] {
        &self.beds
    }

    /// Number of beds as players count them; a bed covers two squares.
    pub fn bed_count(&self) -> u32 {
        self.beds.len().div_ceil(2) as u32
    }

    /// Replaces the guest list, the sub-owner list, or the list of the door
    /// numbered `list_id`. Unknown door numbers are ignored.
    pub fn set_access_list(&mut self, list_id: u32, text: &str, resolver: &mut dyn NameResolver) {
        match list_id {
            GUEST_LIST => self.guests.parse_list(text, resolver),
            SUBOWNER_LIST => self.subowners.parse_list(text, resolver),
            door_id => {
                if let Some(door) = self.door_by_number(door_id) {
                    if let Some(data) = door.borrow_mut().door_mut() {
                        data.access_list = Some(AccessList::from_text(text, resolver));
                    }
                }
            }
        }
    }

    pub fn access_list_text(&self, list_id: u32) -> Option<String> {
        match list_id {
            GUEST_LIST => Some(self.guests.text().to_string()),
            SUBOWNER_LIST => Some(self.subowners.text().to_string()),
            door_id => {
                let door = self.door_by_number(door_id)?;
                let door = door.borrow();
                let list = door.door()?.access_list.as_ref()?;
                Some(list.text().to_string())
            }
        }
    }

    /// Every non-empty list as `(list id, text)`: guests, sub-owners, then
    /// doors in registration order.
    pub fn access_lists(&self) -> Vec<(u32, String)> {
        let mut lists = Vec::new();
        for list_id in [GUEST_LIST, SUBOWNER_LIST] {
            if let Some(text) = self.access_list_text(list_id) {
                if !text.is_empty() {
                    lists.push((list_id, text));
                }
            }
        }
        for door in &self.doors {
            let door = door.borrow();
            let Some(list) = door.door().and_then(|data| data.access_list.as_ref()) else {
                continue;
            };
            if !list.text().is_empty() {
                lists.push((u32::from(door.door_id()), list.text().to_string()));
            }
        }
        lists
    }

    pub fn access_level(&self, subject: &AccessSubject<'_>) -> AccessLevel {
        if self.owner != 0 && subject.player_id == self.owner {
            return AccessLevel::Owner;
        }
        if self.subowners.is_in_list(subject) {
            return AccessLevel::SubOwner;
        }
        if self.guests.is_in_list(subject) {
            return AccessLevel::Guest;
        }
        AccessLevel::NotInvited
    }

    pub fn is_invited(&self, subject: &AccessSubject<'_>) -> bool {
        self.access_level(subject) != AccessLevel::NotInvited
    }

    /// Whether `subject` may open `door`. House staff always can; everyone
    /// else needs to be on the door's own list.
    pub fn can_use_door(&self, door: &ItemRef, subject: &AccessSubject<'_>) -> bool {
        if self.access_level(subject) >= AccessLevel::SubOwner {
            return true;
        }
        let door = door.borrow();
        door.door()
            .and_then(|data| data.access_list.as_ref())
            .map_or(false, |list| list.is_in_list(subject))
    }
}

#[derive(Debug, Default)]
pub struct Houses {
    houses: BTreeMap<u32, House>,
}

impl Houses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the house with `id`, creating it on first use.
    pub fn add_house(&mut self, id: u32) -> &mut House {
        self.houses.entry(id).or_insert_with(|| House::new(id))
    }

    pub fn get(&self, id: u32) -> Option<&House> {
        self.houses.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut House> {
        self.houses.get_mut(&id)
    }

    pub fn get_by_owner(&self, player_id: u32) -> Option<&House> {
        if player_id == 0 {
            return None;
        }
        self.houses.values().find(|house| house.owner == player_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &House> {
        self.houses.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut House> {
        self.houses.values_mut()
    }

    pub fn len(&self) -> usize {
        self.houses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.houses.is_empty()
    }
}
