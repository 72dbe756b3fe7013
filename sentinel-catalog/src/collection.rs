//! High-level collection facade.
//!
//! [`Collection`] wires the pieces together: filters feed a
//! [`SearchCursor`], the cursor feeds a [`TileDescriptorBuilder`], and the
//! resulting descriptors are resolved through a [`ManifestNavigator`].
//!
//! ```ignore
//! use sentinel_catalog::collection::Collection;
//! use sentinel_catalog::config::ConfigFile;
//! use sentinel_catalog::search::{Bounds, ProductType};
//!
//! let config = ConfigFile::load()?.catalog;
//! let mut collection = Collection::from_config(&config, ProductType::sentinel2_msi())?
//!     .filter_bounds(Bounds::new(-70.7, -33.6, -70.5, -33.4))?
//!     .filter_date("2021-05-01T00:00:00.000Z", "NOW")?
//!     .filter_bands(["B04", "B08"])?;
//!
//! let report = collection.search()?;
//! for tile in &report.tiles {
//!     for band in collection.band_paths(tile)? {
//!         println!("{} {}: {}", band.level, band.band, band.path);
//!     }
//! }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::config::{CatalogConfig, DEFAULT_PAGE_SIZE};
use crate::error::{CatalogError, CatalogResult};
use crate::navigator::ManifestNavigator;
use crate::search::{Bounds, ProcessingLevel, ProductType, QueryFilterSet, SearchCursor};
use crate::tile::{BuildReport, ResourcePath, TileDescriptor, TileDescriptorBuilder};
use crate::transport::{CatalogTransport, ODataTransport, ReqwestClient};

/// Filter name reported when the band selection is rejected.
const BANDS_FILTER: &str = "bands";

/// Resolved location of one selected band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandPath {
    pub level: ProcessingLevel,
    pub band: String,
    pub path: ResourcePath,
}

/// Search filters, band selection and navigation for one product type.
pub struct Collection<T: CatalogTransport> {
    transport: Arc<T>,
    filters: QueryFilterSet,
    page_size: usize,
    bands: Vec<String>,
    resolution: Option<String>,
    navigator: ManifestNavigator<Arc<T>>,
}

impl Collection<ODataTransport<ReqwestClient>> {
    /// Creates a collection talking to the catalog described by `config`.
    pub fn from_config(config: &CatalogConfig, product_type: ProductType) -> CatalogResult<Self> {
        let transport = ODataTransport::from_config(config)
            .map_err(|e| CatalogError::Configuration(e.to_string()))?;
        Ok(Self::new(transport, product_type).with_page_size(config.page_size))
    }
}

impl<T: CatalogTransport> Collection<T> {
    pub fn new(transport: T, product_type: ProductType) -> Self {
        let transport = Arc::new(transport);
        Self {
            navigator: ManifestNavigator::new(Arc::clone(&transport)),
            transport,
            filters: QueryFilterSet::new().with_product_type(product_type),
            page_size: DEFAULT_PAGE_SIZE,
            bands: Vec::new(),
            resolution: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn filter_bounds(mut self, bounds: Bounds) -> CatalogResult<Self> {
        self.filters.set_bounds(bounds)?;
        Ok(self)
    }

    pub fn filter_date(mut self, begin: &str, end: &str) -> CatalogResult<Self> {
        self.filters.set_date_range(begin, end)?;
        Ok(self)
    }

    pub fn filter_cloud_cover(mut self, min: f64, max: f64) -> CatalogResult<Self> {
        self.filters.set_cloud_cover(min, max)?;
        Ok(self)
    }

    /// Selects the bands [`band_paths`](Self::band_paths) resolves.
    ///
    /// Band selection is applied to manifests, not sent to the catalog.
    pub fn filter_bands<I, S>(mut self, bands: I) -> CatalogResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bands: Vec<String> = bands
            .into_iter()
            .map(|band| {
                let band: String = band.into();
                band.trim().to_string()
            })
            .filter(|b| !b.is_empty())
            .collect();
        if bands.is_empty() {
            return Err(CatalogError::invalid_filter(
                BANDS_FILTER,
                "provide at least one band",
            ));
        }
        self.bands = bands;
        Ok(self)
    }

    /// Prefers files of this resolution (e.g. `20m`) where a level ships a
    /// band in several resolutions.
    pub fn filter_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn filters(&self) -> &QueryFilterSet {
        &self.filters
    }

    /// Mutable access for filters without a dedicated helper.
    pub fn filters_mut(&mut self) -> &mut QueryFilterSet {
        &mut self.filters
    }

    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// A fresh cursor over the current filters.
    pub fn cursor(&self) -> CatalogResult<SearchCursor<Arc<T>>> {
        SearchCursor::new(Arc::clone(&self.transport), &self.filters, self.page_size)
    }

    /// Runs the search to completion and joins the results.
    ///
    /// Entries are ingested as the cursor yields them. Fails without
    /// returning descriptors if any page cannot be fetched.
    pub fn search(&self) -> CatalogResult<BuildReport> {
        let cursor = self.cursor()?;
        let product_type = self
            .filters
            .product_type()
            .cloned()
            .ok_or_else(|| CatalogError::Configuration("no product type configured".to_string()))?;

        let mut builder = TileDescriptorBuilder::new(product_type);
        builder.ingest_results(cursor)?;

        let report = builder.report()?;
        info!(
            tiles = report.tiles.len(),
            unmatched = report.unmatched.total(),
            skipped = report.skipped,
            "Catalog search complete"
        );
        Ok(report)
    }

    pub fn navigator(&self) -> &ManifestNavigator<Arc<T>> {
        &self.navigator
    }

    /// Loads `tile` and resolves every selected band at both levels.
    pub fn band_paths(&mut self, tile: &TileDescriptor) -> CatalogResult<Vec<BandPath>> {
        if self.bands.is_empty() {
            return Err(CatalogError::invalid_filter(BANDS_FILTER, "no bands selected"));
        }
        if self.navigator.current() != Some(tile) {
            self.navigator.load(tile)?;
        }

        let mut paths = Vec::with_capacity(self.bands.len() * 2);
        for level in ProcessingLevel::ALL {
            for band in &self.bands {
                paths.push(BandPath {
                    level,
                    band: band.clone(),
                    path: self.resolve(level, band)?,
                });
            }
        }
        Ok(paths)
    }

    fn resolve(&self, level: ProcessingLevel, band: &str) -> CatalogResult<ResourcePath> {
        if let Some(resolution) = &self.resolution {
            let qualified = format!("{}_{}", band, resolution);
            match self.navigator.resolve_band_path(level, &qualified) {
                Err(CatalogError::BandNotFound { candidates: 0, .. }) => {}
                other => return other,
            }
        }
        self.navigator.resolve_band_path(level, band)
    }
}
