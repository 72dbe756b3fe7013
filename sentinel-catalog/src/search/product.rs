//! Product-type descriptors.
//!
//! A product type names the platform, the catalog product types and the two
//! processing levels a tile is published at. The primary level is the one
//! whose entries drive descriptor construction; the secondary level is
//! joined onto it.

use std::fmt;

/// Filter name for the platform.
pub const PLATFORM_FILTER: &str = "platformname";

/// Filter name for the catalog product type.
pub const PRODUCT_TYPE_FILTER: &str = "producttype";

/// Filter name for the processing level.
pub const PROCESSING_LEVEL_FILTER: &str = "processinglevel";

/// One of the two processing levels of a product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessingLevel {
    /// The level that drives the join (e.g. Level-2A).
    Primary,
    /// The level joined onto the primary one (e.g. Level-1C).
    Secondary,
}

impl ProcessingLevel {
    /// Both levels, primary first.
    pub const ALL: [ProcessingLevel; 2] = [ProcessingLevel::Primary, ProcessingLevel::Secondary];
}

impl fmt::Display for ProcessingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingLevel::Primary => write!(f, "primary level"),
            ProcessingLevel::Secondary => write!(f, "secondary level"),
        }
    }
}

/// How one processing level appears in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSpec {
    /// Text of the level-tag element, e.g. `Level-2A`.
    pub label: String,
    /// Catalog product type, e.g. `S2MSI2A`.
    pub product_type: String,
    /// Title segment naming the level, e.g. `MSIL2A`. Removed from titles
    /// when deriving canonical keys so both levels of a tile agree.
    pub title_token: String,
}

impl LevelSpec {
    pub fn new(
        label: impl Into<String>,
        product_type: impl Into<String>,
        title_token: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            product_type: product_type.into(),
            title_token: title_token.into(),
        }
    }
}

/// Platform plus the two processing levels to search for.
///
/// # Example
///
/// ```
/// use sentinel_catalog::search::{ProcessingLevel, ProductType};
///
/// let s2 = ProductType::sentinel2_msi();
/// assert_eq!(s2.platform(), "Sentinel-2");
/// assert_eq!(s2.level(ProcessingLevel::Primary).label, "Level-2A");
/// assert_eq!(s2.level_of("Level-1C"), Some(ProcessingLevel::Secondary));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductType {
    platform: String,
    primary: LevelSpec,
    secondary: LevelSpec,
}

impl ProductType {
    pub fn new(platform: impl Into<String>, primary: LevelSpec, secondary: LevelSpec) -> Self {
        Self {
            platform: platform.into(),
            primary,
            secondary,
        }
    }

    /// Sentinel-2 MSI: Level-2A (primary) joined with Level-1C (secondary).
    pub fn sentinel2_msi() -> Self {
        Self::new(
            "Sentinel-2",
            LevelSpec::new("Level-2A", "S2MSI2A", "MSIL2A"),
            LevelSpec::new("Level-1C", "S2MSI1C", "MSIL1C"),
        )
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn level(&self, level: ProcessingLevel) -> &LevelSpec {
        match level {
            ProcessingLevel::Primary => &self.primary,
            ProcessingLevel::Secondary => &self.secondary,
        }
    }

    /// Maps a level-tag label back to its processing level.
    pub fn level_of(&self, label: &str) -> Option<ProcessingLevel> {
        ProcessingLevel::ALL
            .into_iter()
            .find(|level| self.level(*level).label == label)
    }

    /// Catalog product types, primary first.
    pub fn product_types(&self) -> Vec<String> {
        vec![
            self.primary.product_type.clone(),
            self.secondary.product_type.clone(),
        ]
    }

    /// Level-tag labels, primary first.
    pub fn level_labels(&self) -> Vec<String> {
        vec![self.primary.label.clone(), self.secondary.label.clone()]
    }
}
