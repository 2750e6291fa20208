//! XML reading and writing for package documents.

pub mod asset_map;
pub mod cpl;
pub mod node;
pub mod pkl;
pub mod writer;
