//! Catalog search.
//!
//! - [`ProductType`] names the platform and the two processing levels
//! - [`QueryFilterSet`] renders caller filters into a deterministic query
//! - [`SearchCursor`] pages through the results of one query

mod cursor;
mod filter;
mod product;

pub use cursor::{SearchCursor, ENTRY_PATH, NEXT_LINK_PATH, TOTAL_RESULTS_PATH};
pub use filter::{
    Bounds, FilterValue, QueryFilterSet, BEGIN_POSITION_FILTER, CLOUD_COVER_FILTER,
    END_POSITION_FILTER, FOOTPRINT_FILTER,
};
pub use product::{
    LevelSpec, ProcessingLevel, ProductType, PLATFORM_FILTER, PROCESSING_LEVEL_FILTER,
    PRODUCT_TYPE_FILTER,
};

#[cfg(test)]
pub(crate) use cursor::tests as cursor_tests;
