pub mod access_list;
pub mod housing;
pub mod item_types;
pub mod map;
pub mod map_definition;
pub mod position;
pub mod state;
