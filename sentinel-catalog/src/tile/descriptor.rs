//! Tile descriptors.

use chrono::{DateTime, Utc};

use crate::document::{Document, DocumentError};
use crate::search::ProcessingLevel;

use super::resource::{ResourcePath, CONTAINER_EXTENSION, MANIFEST_FILE};

/// Entry paths read when building a descriptor.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const UUID: &str = "str[@name='uuid']";
    pub const PROCESSING_LEVEL: &str = "str[@name='processinglevel']";
    pub const ILLUMINATION_AZIMUTH: &str = "double[@name='illuminationazimuthangle']";
    pub const ILLUMINATION_ZENITH: &str = "double[@name='illuminationzenithangle']";
    pub const VEGETATION: &str = "double[@name='vegetationpercentage']";
    pub const NOT_VEGETATED: &str = "double[@name='notvegetatedpercentage']";
    pub const WATER: &str = "double[@name='waterpercentage']";
    pub const CLOUD_COVER: &str = "double[@name='cloudcoverpercentage']";
    pub const ORBIT: &str = "int[@name='orbitnumber']";
    pub const RELATIVE_ORBIT: &str = "int[@name='relativeorbitnumber']";
    pub const END_POSITION: &str = "date[@name='endposition']";
}

/// One processing level's product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LevelProduct {
    uuid: String,
    title: String,
}

impl LevelProduct {
    pub fn new(uuid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            title: title.into(),
        }
    }

    fn from_entry(entry: &Document) -> Result<Self, DocumentError> {
        Ok(Self::new(
            entry.required_value(fields::UUID)?.trim(),
            entry.required_value(fields::TITLE)?.trim(),
        ))
    }

    /// Catalog identifier of the product.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Product title as listed in the catalog.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Name of the top-level container, e.g. `S2B_MSIL2A_..._20210519T163959.SAFE`.
    pub fn container(&self) -> String {
        format!("{}{}", self.title, CONTAINER_EXTENSION)
    }

    /// Root container of the product; band and metadata paths extend it.
    pub fn root(&self) -> ResourcePath {
        ResourcePath::product(&self.uuid).join(self.container())
    }
}

/// One physical tile observed at both processing levels.
///
/// Descriptors are immutable. Acquisition properties come from the
/// primary-level entry; properties the catalog omitted are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDescriptor {
    name: String,
    primary: LevelProduct,
    secondary: LevelProduct,
    illumination_azimuth_angle: Option<f64>,
    illumination_zenith_angle: Option<f64>,
    vegetation_percentage: Option<f64>,
    not_vegetated_percentage: Option<f64>,
    water_percentage: Option<f64>,
    cloud_cover_percentage: Option<f64>,
    orbit_number: Option<u32>,
    relative_orbit_number: Option<u32>,
    end_position: Option<DateTime<Utc>>,
}

impl TileDescriptor {
    /// Builds a descriptor from a matched pair of catalog entries.
    ///
    /// Fails when either entry lacks its identifier or title, or when a
    /// present property cannot be parsed.
    pub fn from_entries(
        name: impl Into<String>,
        primary: &Document,
        secondary: &Document,
    ) -> Result<Self, DocumentError> {
        Ok(Self {
            name: name.into(),
            primary: LevelProduct::from_entry(primary)?,
            secondary: LevelProduct::from_entry(secondary)?,
            illumination_azimuth_angle: primary.value_as(fields::ILLUMINATION_AZIMUTH)?,
            illumination_zenith_angle: primary.value_as(fields::ILLUMINATION_ZENITH)?,
            vegetation_percentage: primary.value_as(fields::VEGETATION)?,
            not_vegetated_percentage: primary.value_as(fields::NOT_VEGETATED)?,
            water_percentage: primary.value_as(fields::WATER)?,
            cloud_cover_percentage: primary.value_as(fields::CLOUD_COVER)?,
            orbit_number: primary.value_as(fields::ORBIT)?,
            relative_orbit_number: primary.value_as(fields::RELATIVE_ORBIT)?,
            end_position: parse_timestamp(primary, fields::END_POSITION)?,
        })
    }

    /// Canonical name shared by both levels.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn product(&self, level: ProcessingLevel) -> &LevelProduct {
        match level {
            ProcessingLevel::Primary => &self.primary,
            ProcessingLevel::Secondary => &self.secondary,
        }
    }

    /// Root container of the level's product.
    pub fn product_root(&self, level: ProcessingLevel) -> ResourcePath {
        self.product(level).root()
    }

    /// Path of the level's manifest document.
    pub fn manifest_path(&self, level: ProcessingLevel) -> ResourcePath {
        self.product_root(level).join(MANIFEST_FILE)
    }

    pub fn illumination_azimuth_angle(&self) -> Option<f64> {
        self.illumination_azimuth_angle
    }

    pub fn illumination_zenith_angle(&self) -> Option<f64> {
        self.illumination_zenith_angle
    }

    pub fn vegetation_percentage(&self) -> Option<f64> {
        self.vegetation_percentage
    }

    pub fn not_vegetated_percentage(&self) -> Option<f64> {
        self.not_vegetated_percentage
    }

    pub fn water_percentage(&self) -> Option<f64> {
        self.water_percentage
    }

    pub fn cloud_cover_percentage(&self) -> Option<f64> {
        self.cloud_cover_percentage
    }

    pub fn orbit_number(&self) -> Option<u32> {
        self.orbit_number
    }

    pub fn relative_orbit_number(&self) -> Option<u32> {
        self.relative_orbit_number
    }

    /// End of the acquisition.
    pub fn end_position(&self) -> Option<DateTime<Utc>> {
        self.end_position
    }
}

fn parse_timestamp(entry: &Document, path: &str) -> Result<Option<DateTime<Utc>>, DocumentError> {
    let Some(raw) = entry.value(path)? else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|e| DocumentError::InvalidValue {
            path: path.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}
