pub mod attributes;
pub mod cylinder;
pub mod item;
