//! Query filter set.
//!
//! Filters accumulate by name and render into one deterministic query
//! string: clauses sorted by name in ASCII order, list values wrapped as
//! `name:(a OR b)`, clauses joined with ` AND `. The product-type filters
//! are refreshed from the configured [`ProductType`] on every render.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CatalogError, CatalogResult};

use super::product::{
    ProductType, PLATFORM_FILTER, PROCESSING_LEVEL_FILTER, PRODUCT_TYPE_FILTER,
};

/// Filter name for the footprint intersection.
pub const FOOTPRINT_FILTER: &str = "footprint";
/// Filter name for the acquisition start.
pub const BEGIN_POSITION_FILTER: &str = "beginposition";
/// Filter name for the acquisition end.
pub const END_POSITION_FILTER: &str = "endposition";
/// Filter name for the cloud-cover percentage.
pub const CLOUD_COVER_FILTER: &str = "cloudcoverpercentage";

/// Value of one named filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Scalar(String),
    /// Alternatives, rendered in the given order.
    List(Vec<String>),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Scalar(value) => write!(f, "{}", value),
            FilterValue::List(values) => write!(f, "({})", values.join(" OR ")),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Scalar(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        FilterValue::List(values)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        FilterValue::List(values.into_iter().map(str::to_string).collect())
    }
}

/// Axis-aligned rectangle in longitude/latitude degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Closed WKT ring, counter-clockwise from the lower-left corner.
    pub fn to_polygon(&self) -> String {
        format!(
            "POLYGON(({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))",
            x0 = self.min_x,
            y0 = self.min_y,
            x1 = self.max_x,
            y1 = self.max_y
        )
    }
}

/// Named search predicates plus the product type they apply to.
///
/// # Example
///
/// ```
/// use sentinel_catalog::search::{ProductType, QueryFilterSet};
///
/// let mut filters = QueryFilterSet::new().with_product_type(ProductType::sentinel2_msi());
/// filters.set("cloudcoverpercentage", "[0 TO 30]");
///
/// assert_eq!(
///     filters.render().unwrap(),
///     "cloudcoverpercentage:[0 TO 30] AND platformname:Sentinel-2 \
///      AND processinglevel:(Level-2A OR Level-1C) AND producttype:(S2MSI2A OR S2MSI1C)"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilterSet {
    filters: BTreeMap<String, FilterValue>,
    product_type: Option<ProductType>,
}

impl QueryFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product_type(mut self, product_type: ProductType) -> Self {
        self.product_type = Some(product_type);
        self
    }

    pub fn set_product_type(&mut self, product_type: ProductType) {
        self.product_type = Some(product_type);
    }

    pub fn product_type(&self) -> Option<&ProductType> {
        self.product_type.as_ref()
    }

    /// Inserts or replaces a filter.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FilterValue>) {
        self.filters.insert(name.into(), value.into());
    }

    /// Removes a filter, returning its previous value.
    pub fn clear(&mut self, name: &str) -> Option<FilterValue> {
        self.filters.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.filters.get(name)
    }

    /// Number of caller filters, excluding the product-type ones.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Restricts results to footprints intersecting `bounds`.
    pub fn set_bounds(&mut self, bounds: Bounds) -> CatalogResult<()> {
        let coords = [bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(CatalogError::invalid_filter(
                FOOTPRINT_FILTER,
                "bounds must be finite",
            ));
        }
        if bounds.min_x > bounds.max_x || bounds.min_y > bounds.max_y {
            return Err(CatalogError::invalid_filter(
                FOOTPRINT_FILTER,
                format!("inverted bounds {:?}", bounds),
            ));
        }

        self.set(
            FOOTPRINT_FILTER,
            format!("\"Intersects({})\"", bounds.to_polygon()),
        );
        Ok(())
    }

    /// Restricts acquisitions to `[begin TO end]`.
    ///
    /// Both ends are passed through verbatim, so catalog date expressions
    /// such as `NOW-7DAYS` are accepted.
    pub fn set_date_range(&mut self, begin: &str, end: &str) -> CatalogResult<()> {
        let (begin, end) = (begin.trim(), end.trim());
        if begin.is_empty() || end.is_empty() {
            return Err(CatalogError::invalid_filter(
                BEGIN_POSITION_FILTER,
                "provide a begin date and an end date",
            ));
        }

        let interval = format!("[{} TO {}]", begin, end);
        self.set(BEGIN_POSITION_FILTER, interval.clone());
        self.set(END_POSITION_FILTER, interval);
        Ok(())
    }

    /// Restricts cloud cover to `[min TO max]` percent.
    pub fn set_cloud_cover(&mut self, min: f64, max: f64) -> CatalogResult<()> {
        let valid = |p: f64| (0.0..=100.0).contains(&p);
        if !valid(min) || !valid(max) {
            return Err(CatalogError::invalid_filter(
                CLOUD_COVER_FILTER,
                format!("percentages must lie in 0..=100, got {} and {}", min, max),
            ));
        }
        if min > max {
            return Err(CatalogError::invalid_filter(
                CLOUD_COVER_FILTER,
                format!("minimum {} exceeds maximum {}", min, max),
            ));
        }

        self.set(CLOUD_COVER_FILTER, format!("[{} TO {}]", min, max));
        Ok(())
    }

    /// Renders the query string.
    ///
    /// The product-type filters are applied to a copy, so rendering leaves
    /// the set unchanged and repeated renders agree.
    pub fn render(&self) -> CatalogResult<String> {
        let product_type = self.product_type.as_ref().ok_or_else(|| {
            CatalogError::Configuration(
                "query filters rendered before a product type was configured".to_string(),
            )
        })?;

        let mut filters = self.filters.clone();
        filters.insert(
            PLATFORM_FILTER.to_string(),
            FilterValue::from(product_type.platform()),
        );
        filters.insert(
            PRODUCT_TYPE_FILTER.to_string(),
            FilterValue::List(product_type.product_types()),
        );
        filters.insert(
            PROCESSING_LEVEL_FILTER.to_string(),
            FilterValue::List(product_type.level_labels()),
        );

        Ok(filters
            .iter()
            .map(|(name, value)| format!("{}:{}", name, value))
            .collect::<Vec<_>>()
            .join(" AND "))
    }
}
