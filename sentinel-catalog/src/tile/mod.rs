//! Tile descriptors and the join that produces them.
//!
//! [`TileDescriptorBuilder`] pairs the two processing levels of each tile
//! into an immutable [`TileDescriptor`]. Remote locations inside a tile's
//! products are expressed as [`ResourcePath`]s.

mod builder;
mod descriptor;
mod resource;

pub use builder::{canonical_key, BuildReport, TileDescriptorBuilder, UnmatchedCounts};
pub use descriptor::{fields, LevelProduct, TileDescriptor};
pub use resource::{ResourcePath, CONTAINER_EXTENSION, MANIFEST_FILE};

#[cfg(test)]
pub(crate) use descriptor::tests as descriptor_tests;
