pub mod extent_cache;
pub mod lod;
