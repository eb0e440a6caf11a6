pub mod autosave;
pub mod codec;
pub mod house_info;
pub mod map_serialize;
pub mod prop_stream;
pub mod store;
