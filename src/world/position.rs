use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u16; 3]", into = "[u16; 3]")]
pub struct Position {
    pub x: u16,
    pub y: u16,
    pub z: u8,
}

impl Position {
    pub const fn new(x: u16, y: u16, z: u8) -> Self {
        Self { x, y, z }
    }

    /// The all-zero position doubles as "no destination" for teleports.
    pub fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0 && self.z == 0
    }
}

impl From<[u16; 3]> for Position {
    fn from(value: [u16; 3]) -> Self {
        Self {
            x: value[0],
            y: value[1],
            z: value[2].min(u16::from(u8::MAX)) as u8,
        }
    }
}

impl From<Position> for [u16; 3] {
    fn from(value: Position) -> Self {
        [value.x, value.y, u16::from(value.z)]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_triplet_roundtrip() {
        let position = Position::new(32097, 32219, 7);
        let text = serde_yaml::to_string(&position).expect("serialize");
        let parsed: Position = serde_yaml::from_str(&text).expect("parse");
        assert_eq!(parsed, position);
        let inline: Position = serde_yaml::from_str("[100, 200, 7]").expect("inline");
        assert_eq!(inline, Position::new(100, 200, 7));
    }

    #[test]
    fn zero_position_marks_no_destination() {
        assert!(Position::default().is_zero());
        assert!(!Position::new(0, 0, 7).is_zero());
        assert_eq!(Position::new(1, 2, 3).to_string(), "(1,2,3)");
    }
}
