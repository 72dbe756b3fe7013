//! Manifest navigator.
//!
//! [`ManifestNavigator`] loads the manifests of one [`TileDescriptor`] and
//! resolves band, quality-indicator and metadata files into
//! [`ResourcePath`]s. Only one descriptor is loaded at a time; loading
//! another replaces it.

mod manifest;

use tracing::{debug, info};

use crate::document::Document;
use crate::error::{CatalogError, CatalogResult, FailureCause};
use crate::search::ProcessingLevel;
use crate::tile::{ResourcePath, TileDescriptor};
use crate::transport::CatalogTransport;

pub use manifest::{
    file_locations, find_unique, matches_code, FileLayout, ManifestIndex, FILE_LOCATION_PATH,
};

#[cfg(test)]
pub(crate) use manifest::tests as manifest_tests;

/// A descriptor together with the manifest index of each level.
#[derive(Debug, Clone)]
struct LoadedTile {
    descriptor: TileDescriptor,
    primary: ManifestIndex,
    secondary: ManifestIndex,
}

impl LoadedTile {
    fn index(&self, level: ProcessingLevel) -> &ManifestIndex {
        match level {
            ProcessingLevel::Primary => &self.primary,
            ProcessingLevel::Secondary => &self.secondary,
        }
    }
}

/// Resolves remote paths of files inside a loaded tile.
///
/// A failed [`load`](Self::load) leaves the previously loaded tile in place.
pub struct ManifestNavigator<T: CatalogTransport> {
    transport: T,
    layout: FileLayout,
    current: Option<LoadedTile>,
}

impl<T: CatalogTransport> ManifestNavigator<T> {
    pub fn new(transport: T) -> Self {
        Self::with_layout(transport, FileLayout::default())
    }

    pub fn with_layout(transport: T, layout: FileLayout) -> Self {
        Self {
            transport,
            layout,
            current: None,
        }
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    /// The loaded descriptor, if any.
    pub fn current(&self) -> Option<&TileDescriptor> {
        self.current.as_ref().map(|loaded| &loaded.descriptor)
    }

    /// Fetches and indexes both manifests of `descriptor`.
    ///
    /// Both manifests must be fetched and indexed before the previous tile
    /// is replaced. A manifest declaring no file locations is a fetch error.
    pub fn load(&mut self, descriptor: &TileDescriptor) -> CatalogResult<()> {
        let primary = self.index_manifest(descriptor, ProcessingLevel::Primary)?;
        let secondary = self.index_manifest(descriptor, ProcessingLevel::Secondary)?;

        info!(
            tile = descriptor.name(),
            primary_images = primary.image_files().len(),
            secondary_images = secondary.image_files().len(),
            "Loaded tile manifests"
        );

        self.current = Some(LoadedTile {
            descriptor: descriptor.clone(),
            primary,
            secondary,
        });
        Ok(())
    }

    fn index_manifest(
        &self,
        descriptor: &TileDescriptor,
        level: ProcessingLevel,
    ) -> CatalogResult<ManifestIndex> {
        let path = descriptor.manifest_path(level).render();
        debug!(%level, path = %path, "Fetching manifest");

        let manifest = self
            .transport
            .fetch(&path)
            .map_err(|e| CatalogError::fetch(&path, e))?;
        let hrefs = file_locations(&manifest).map_err(|e| CatalogError::fetch(&path, e))?;
        if hrefs.is_empty() {
            return Err(CatalogError::fetch(
                &path,
                FailureCause::Protocol("manifest declares no file locations".to_string()),
            ));
        }
        ManifestIndex::from_hrefs(hrefs, &self.layout)
    }

    fn loaded(&self) -> CatalogResult<&LoadedTile> {
        self.current.as_ref().ok_or(CatalogError::NotLoaded)
    }

    /// Image files declared for `level`, as manifest-relative hrefs.
    pub fn image_files(&self, level: ProcessingLevel) -> CatalogResult<&[String]> {
        Ok(self.loaded()?.index(level).image_files())
    }

    /// Quality-indicator files declared for `level`.
    pub fn quality_files(&self, level: ProcessingLevel) -> CatalogResult<&[String]> {
        Ok(self.loaded()?.index(level).quality_files())
    }

    /// Path of the single image file of `level` carrying `band`.
    ///
    /// Band codes may include a resolution suffix to disambiguate, e.g.
    /// `B04_10m` at a level that ships `B04` in several resolutions.
    pub fn resolve_band_path(&self, level: ProcessingLevel, band: &str) -> CatalogResult<ResourcePath> {
        let loaded = self.loaded()?;
        let href = find_unique(loaded.index(level).image_files(), band.trim()).map_err(|candidates| {
            CatalogError::BandNotFound {
                level,
                band: band.to_string(),
                candidates,
            }
        })?;
        Ok(loaded.descriptor.product_root(level).join_relative(href))
    }

    /// Path of the single quality-indicator file of `level` carrying `code`.
    pub fn resolve_quality_path(&self, level: ProcessingLevel, code: &str) -> CatalogResult<ResourcePath> {
        let loaded = self.loaded()?;
        let href = find_unique(loaded.index(level).quality_files(), code.trim()).map_err(|candidates| {
            CatalogError::QualityFileNotFound {
                level,
                code: code.to_string(),
                candidates,
            }
        })?;
        Ok(loaded.descriptor.product_root(level).join_relative(href))
    }

    /// Path of the tile metadata document of `level`.
    pub fn resolve_metadata_path(&self, level: ProcessingLevel) -> CatalogResult<ResourcePath> {
        let loaded = self.loaded()?;
        let href = loaded.index(level).tile_metadata().ok_or_else(|| {
            CatalogError::MetadataNotFound {
                level,
                manifest: loaded.descriptor.manifest_path(level).render(),
            }
        })?;
        Ok(loaded.descriptor.product_root(level).join_relative(href))
    }

    /// Downloads the raw content of a band file.
    pub fn fetch_band(&self, level: ProcessingLevel, band: &str) -> CatalogResult<Vec<u8>> {
        let path = self.resolve_band_path(level, band)?.render();
        let bytes = self
            .transport
            .fetch_bytes(&path)
            .map_err(|e| CatalogError::fetch(&path, e))?;
        debug!(%level, band, bytes = bytes.len(), "Fetched band");
        Ok(bytes)
    }

    /// Downloads and parses the tile metadata document of `level`.
    pub fn fetch_metadata(&self, level: ProcessingLevel) -> CatalogResult<Document> {
        let path = self.resolve_metadata_path(level)?.render();
        self.transport
            .fetch(&path)
            .map_err(|e| CatalogError::fetch(&path, e))
    }
}
