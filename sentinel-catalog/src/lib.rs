//! Sentinel catalog client
//!
//! This library searches a paginated OData/OpenSearch catalog of satellite
//! tiles, joins the two processing levels of each tile into a single
//! descriptor, and resolves the remote paths of band and metadata files
//! inside the tile's products.
//!
//! # High-Level API
//!
//! For most use cases, the [`collection`] module provides a simplified facade:
//!
//! ```ignore
//! use sentinel_catalog::collection::Collection;
//! use sentinel_catalog::config::ConfigFile;
//! use sentinel_catalog::search::ProductType;
//!
//! let config = ConfigFile::load()?.catalog;
//! let mut collection = Collection::from_config(&config, ProductType::sentinel2_msi())?
//!     .filter_cloud_cover(0.0, 20.0)?
//!     .filter_bands(["B04"])?;
//!
//! let report = collection.search()?;
//! let paths = collection.band_paths(&report.tiles[0])?;
//! ```
//!
//! The lower-level pieces are usable on their own: [`search::QueryFilterSet`]
//! and [`search::SearchCursor`] for paging, [`tile::TileDescriptorBuilder`]
//! for the join, and [`navigator::ManifestNavigator`] for path resolution,
//! all talking to the catalog through [`transport::CatalogTransport`].

pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod navigator;
pub mod search;
pub mod tile;
pub mod transport;

pub use error::{CatalogError, CatalogResult, FailureCause};

/// Version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
