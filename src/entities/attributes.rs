/// Every attribute an item instance can carry. Integer and string kinds are
/// disjoint; see [`AttributeKind::is_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKind {
    ActionId,
    MovementId,
    Description,
    Text,
    WrittenDate,
    Writer,
    Name,
    Article,
    PluralName,
    Weight,
    Attack,
    Defense,
    Armor,
    ShootRange,
    MissileEffect,
    Duration,
    DecayState,
    Charges,
    FluidType,
    DoorId,
    KeyNumber,
    KeyholeNumber,
    DoorLevel,
    DoorQuestNumber,
    DoorQuestValue,
    ChestQuestNumber,
    CorpseOwner,
    LifeLeech,
    ManaLeech,
    Critical,
    Reflection,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 31] = [
        AttributeKind::ActionId,
        AttributeKind::MovementId,
        AttributeKind::Description,
        AttributeKind::Text,
        AttributeKind::WrittenDate,
        AttributeKind::Writer,
        AttributeKind::Name,
        AttributeKind::Article,
        AttributeKind::PluralName,
        AttributeKind::Weight,
        AttributeKind::Attack,
        AttributeKind::Defense,
        AttributeKind::Armor,
        AttributeKind::ShootRange,
        AttributeKind::MissileEffect,
        AttributeKind::Duration,
        AttributeKind::DecayState,
        AttributeKind::Charges,
        AttributeKind::FluidType,
        AttributeKind::DoorId,
        AttributeKind::KeyNumber,
        AttributeKind::KeyholeNumber,
        AttributeKind::DoorLevel,
        AttributeKind::DoorQuestNumber,
        AttributeKind::DoorQuestValue,
        AttributeKind::ChestQuestNumber,
        AttributeKind::CorpseOwner,
        AttributeKind::LifeLeech,
        AttributeKind::ManaLeech,
        AttributeKind::Critical,
        AttributeKind::Reflection,
    ];

    pub fn bit(self) -> u64 {
        1u64 << (self as u32)
    }

    pub fn is_string(self) -> bool {
        matches!(
            self,
            AttributeKind::Description
                | AttributeKind::Text
                | AttributeKind::Writer
                | AttributeKind::Name
                | AttributeKind::Article
                | AttributeKind::PluralName
        )
    }

    pub fn is_integer(self) -> bool {
        !self.is_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Integer(i64),
    String(String),
}

/// Sparse attribute set of one item.
///
/// `bits` mirrors the kinds present in `entries`, one bit per kind, so a
/// presence check never scans the list. Entries stay in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemAttributes {
    bits: u64,
    entries: Vec<(AttributeKind, AttributeValue)>,
}

impl ItemAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, kind: AttributeKind) -> bool {
        self.bits & kind.bit() != 0
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeKind, &AttributeValue)> {
        self.entries.iter().map(|(kind, value)| (*kind, value))
    }

    pub fn get_int(&self, kind: AttributeKind) -> i64 {
        if !kind.is_integer() {
            return 0;
        }
        match self.existing(kind) {
            Some(AttributeValue::Integer(value)) => *value,
            _ => 0,
        }
    }

    pub fn get_str(&self, kind: AttributeKind) -> &str {
        if !kind.is_string() {
            return "";
        }
        match self.existing(kind) {
            Some(AttributeValue::String(value)) => value.as_str(),
            _ => "",
        }
    }

    pub fn set_int(&mut self, kind: AttributeKind, value: i64) {
        if !kind.is_integer() {
            return;
        }
        *self.slot(kind) = AttributeValue::Integer(value);
    }

    pub fn increase_int(&mut self, kind: AttributeKind, delta: i64) {
        let current = self.get_int(kind);
        self.set_int(kind, current.saturating_add(delta));
    }

    pub fn set_str(&mut self, kind: AttributeKind, value: &str) {
        if !kind.is_string() || value.is_empty() {
            return;
        }
        *self.slot(kind) = AttributeValue::String(value.to_string());
    }

    pub fn remove(&mut self, kind: AttributeKind) {
        if !self.has(kind) {
            return;
        }
        if let Some(index) = self.entries.iter().position(|(entry, _)| *entry == kind) {
            self.entries.remove(index);
        }
        self.bits &= !kind.bit();
    }

    fn existing(&self, kind: AttributeKind) -> Option<&AttributeValue> {
        if !self.has(kind) {
            return None;
        }
        self.entries
            .iter()
            .find(|(entry, _)| *entry == kind)
            .map(|(_, value)| value)
    }

    fn slot(&mut self, kind: AttributeKind) -> &mut AttributeValue {
        let index = match self.entries.iter().position(|(entry, _)| *entry == kind) {
            Some(index) => index,
            None => {
                let initial = if kind.is_string() {
                    AttributeValue::String(String::new())
                } else {
                    AttributeValue::Integer(0)
                };
                self.bits |= kind.bit();
                self.entries.push((kind, initial));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_value(kind: AttributeKind) -> AttributeValue {
        if kind.is_string() {
            AttributeValue::String(format!("{:?}", kind))
        } else {
            AttributeValue::Integer(kind as i64 + 7)
        }
    }

    #[test]
    fn set_then_remove_every_kind() {
        let mut attributes = ItemAttributes::new();
        for kind in AttributeKind::ALL {
            match sample_value(kind) {
                AttributeValue::Integer(value) => attributes.set_int(kind, value),
                AttributeValue::String(value) => attributes.set_str(kind, &value),
            }
            assert!(attributes.has(kind), "{:?} missing after set", kind);
        }
        assert_eq!(attributes.len(), AttributeKind::ALL.len());
        for kind in AttributeKind::ALL {
            attributes.remove(kind);
            assert!(!attributes.has(kind), "{:?} present after remove", kind);
        }
        assert!(attributes.is_empty());
        assert_eq!(attributes.len(), 0);
    }

    #[test]
    fn bits_fit_in_mask() {
        for kind in AttributeKind::ALL {
            assert!((kind as u32) < 64);
        }
    }

    #[test]
    fn empty_string_is_never_stored() {
        let mut attributes = ItemAttributes::new();
        attributes.set_str(AttributeKind::Text, "");
        assert!(!attributes.has(AttributeKind::Text));
        attributes.set_str(AttributeKind::Text, "hello");
        attributes.set_str(AttributeKind::Text, "");
        assert_eq!(attributes.get_str(AttributeKind::Text), "hello");
    }

    #[test]
    fn wrong_category_accessors_return_defaults() {
        let mut attributes = ItemAttributes::new();
        attributes.set_int(AttributeKind::Text, 5);
        attributes.set_str(AttributeKind::ActionId, "nope");
        assert!(attributes.is_empty());

        attributes.set_int(AttributeKind::ActionId, 1000);
        attributes.set_str(AttributeKind::Writer, "Eremo");
        assert_eq!(attributes.get_str(AttributeKind::ActionId), "");
        assert_eq!(attributes.get_int(AttributeKind::Writer), 0);
        assert_eq!(attributes.get_int(AttributeKind::ActionId), 1000);
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let mut attributes = ItemAttributes::new();
        attributes.set_int(AttributeKind::Charges, 3);
        attributes.set_int(AttributeKind::Charges, 2);
        attributes.increase_int(AttributeKind::Charges, -1);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes.get_int(AttributeKind::Charges), 1);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut attributes = ItemAttributes::new();
        attributes.set_int(AttributeKind::Weight, 1200);
        attributes.remove(AttributeKind::Attack);
        assert_eq!(attributes.len(), 1);
        assert!(attributes.has(AttributeKind::Weight));
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut attributes = ItemAttributes::new();
        attributes.set_int(AttributeKind::Weight, 1);
        attributes.set_str(AttributeKind::Name, "sword");
        attributes.set_int(AttributeKind::ActionId, 2);
        attributes.remove(AttributeKind::Name);
        let kinds: Vec<AttributeKind> = attributes.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec![AttributeKind::Weight, AttributeKind::ActionId]);
    }
}
