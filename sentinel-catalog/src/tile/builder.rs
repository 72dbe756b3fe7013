//! Tile descriptor builder.
//!
//! The catalog lists the two processing levels of a tile as unrelated
//! entries. The builder sorts ingested entries by level, keys each one by
//! a level-independent canonical key derived from its title, and joins the
//! two levels on that key.
//!
//! # Canonical keys
//!
//! A title such as `S2B_MSIL2A_20210519T142729_N0300_R053_T19HBD_20210519T163959`
//! loses its final segment (the processing timestamp, which differs between
//! levels) and its level token (`MSIL2A`), giving
//! `S2B_20210519T142729_N0300_R053_T19HBD`. The Level-1C title of the same
//! tile maps to the same key.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{CatalogError, CatalogResult};
use crate::search::{LevelSpec, ProcessingLevel, ProductType};

use super::descriptor::{fields, TileDescriptor};

/// Derives the level-independent key of a product title.
///
/// Drops the segment after the final `_` and any segment equal to the
/// level's title token.
///
/// ```
/// use sentinel_catalog::search::{ProcessingLevel, ProductType};
/// use sentinel_catalog::tile::canonical_key;
///
/// let s2 = ProductType::sentinel2_msi();
/// let primary = s2.level(ProcessingLevel::Primary);
/// assert_eq!(
///     canonical_key("S2B_MSIL2A_20210519T142729_N0300_R053_T19HBD_20210519T163959", primary),
///     "S2B_20210519T142729_N0300_R053_T19HBD"
/// );
/// assert_eq!(canonical_key("A_T19HBD_2A", primary), "A_T19HBD");
/// ```
pub fn canonical_key(title: &str, level: &LevelSpec) -> String {
    let stem = title.rsplit_once('_').map_or(title, |(stem, _)| stem);
    stem.split('_')
        .filter(|segment| *segment != level.title_token)
        .collect::<Vec<_>>()
        .join("_")
}

/// Insertion-ordered entries of one level, keyed by canonical key.
#[derive(Debug, Default)]
struct LevelIndex {
    positions: HashMap<String, usize>,
    entries: Vec<(String, Document)>,
}

impl LevelIndex {
    /// Inserts or replaces in place. Returns `true` when replacing.
    fn upsert(&mut self, key: String, entry: Document) -> bool {
        match self.positions.get(&key) {
            Some(&pos) => {
                self.entries[pos].1 = entry;
                true
            }
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, entry));
                false
            }
        }
    }

    fn get(&self, key: &str) -> Option<&Document> {
        self.positions.get(key).map(|&pos| &self.entries[pos].1)
    }

    fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Entries with no counterpart at the other level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnmatchedCounts {
    pub primary: usize,
    pub secondary: usize,
}

impl UnmatchedCounts {
    pub fn total(&self) -> usize {
        self.primary + self.secondary
    }
}

/// Result of a build, with diagnostics about what was left out.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    /// Joined descriptors in primary-level ingestion order.
    pub tiles: Vec<TileDescriptor>,
    /// Keys observed at one level only; dropped from `tiles`.
    pub unmatched: UnmatchedCounts,
    /// Entries without a title or with an unrecognized level tag.
    pub skipped: usize,
}

/// Two-phase accumulator joining catalog entries into tile descriptors.
///
/// Call [`ingest`](Self::ingest) for every page of entries, then
/// [`build`](Self::build). Keys seen twice at the same level keep the
/// position of their first appearance and the content of the latest.
#[derive(Debug)]
pub struct TileDescriptorBuilder {
    product_type: ProductType,
    primary: LevelIndex,
    secondary: LevelIndex,
    skipped: usize,
}

impl TileDescriptorBuilder {
    pub fn new(product_type: ProductType) -> Self {
        Self {
            product_type,
            primary: LevelIndex::default(),
            secondary: LevelIndex::default(),
            skipped: 0,
        }
    }

    pub fn product_type(&self) -> &ProductType {
        &self.product_type
    }

    fn index_mut(&mut self, level: ProcessingLevel) -> &mut LevelIndex {
        match level {
            ProcessingLevel::Primary => &mut self.primary,
            ProcessingLevel::Secondary => &mut self.secondary,
        }
    }

    /// Sorts entries by processing level. Returns how many were accepted.
    ///
    /// Entries whose level tag is missing or unknown, or which have no
    /// title, are skipped and counted.
    pub fn ingest<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = Document>,
    {
        let mut accepted = 0;
        for entry in entries {
            let label = entry.value(fields::PROCESSING_LEVEL).ok().flatten();
            let Some(level) = label.and_then(|l| self.product_type.level_of(l.trim())) else {
                warn!(label = ?label, "Skipping catalog entry with unknown processing level");
                self.skipped += 1;
                continue;
            };

            let title = match entry.value(fields::TITLE) {
                Ok(Some(title)) if !title.trim().is_empty() => title.trim(),
                _ => {
                    warn!(%level, "Skipping catalog entry without title");
                    self.skipped += 1;
                    continue;
                }
            };

            let key = canonical_key(title, self.product_type.level(level));
            debug!(%level, title, key = %key, "Ingested catalog entry");
            if self.index_mut(level).upsert(key.clone(), entry) {
                debug!(%level, key = %key, "Replaced duplicate catalog entry");
            }
            accepted += 1;
        }
        accepted
    }

    /// Ingests entries as a fallible stream yields them, stopping at the
    /// first error. Entries ingested before the error are kept.
    pub fn ingest_results<I>(&mut self, results: I) -> CatalogResult<usize>
    where
        I: IntoIterator<Item = CatalogResult<Document>>,
    {
        let mut failure = None;
        let accepted = self.ingest(
            results
                .into_iter()
                .map_while(|result| result.map_err(|e| failure = Some(e)).ok()),
        );
        match failure {
            Some(e) => Err(e),
            None => Ok(accepted),
        }
    }

    /// Number of distinct keys ingested at `level`.
    pub fn len(&self, level: ProcessingLevel) -> usize {
        match level {
            ProcessingLevel::Primary => self.primary.len(),
            ProcessingLevel::Secondary => self.secondary.len(),
        }
    }

    /// Entries skipped during ingestion.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Keys seen at one level only.
    pub fn unmatched(&self) -> UnmatchedCounts {
        UnmatchedCounts {
            primary: self
                .primary
                .keys()
                .filter(|k| !self.secondary.contains(k))
                .count(),
            secondary: self
                .secondary
                .keys()
                .filter(|k| !self.primary.contains(k))
                .count(),
        }
    }

    /// Joins the two levels into descriptors, in primary ingestion order.
    ///
    /// Keys without a counterpart are dropped. Fails without returning any
    /// descriptor if a matched pair cannot be turned into one. Calling it
    /// again without further ingestion returns an equal sequence.
    pub fn build(&self) -> CatalogResult<Vec<TileDescriptor>> {
        let mut tiles = Vec::with_capacity(self.primary.len().min(self.secondary.len()));
        for (key, primary) in &self.primary.entries {
            let Some(secondary) = self.secondary.get(key) else {
                debug!(key = %key, "No secondary-level entry, dropping tile");
                continue;
            };
            let tile = TileDescriptor::from_entries(key.as_str(), primary, secondary).map_err(
                |source| CatalogError::Descriptor {
                    key: key.clone(),
                    source,
                },
            )?;
            tiles.push(tile);
        }

        let unmatched = self.unmatched();
        if unmatched.total() > 0 {
            warn!(
                primary = unmatched.primary,
                secondary = unmatched.secondary,
                "Dropped tiles observed at one processing level only"
            );
        }
        info!(tiles = tiles.len(), "Built tile descriptors");
        Ok(tiles)
    }

    /// [`build`](Self::build) plus the diagnostics.
    pub fn report(&self) -> CatalogResult<BuildReport> {
        Ok(BuildReport {
            tiles: self.build()?,
            unmatched: self.unmatched(),
            skipped: self.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentError;
    use crate::tile::descriptor::tests::{entry, ATOM_NS};

    fn l2a(tile: &str) -> Document {
        entry(&format!("S2B_MSIL2A_20210519T142729_N0300_R053_{}_20210519T163959", tile), &format!("{}-2a", tile), "Level-2A")
    }

    fn l1c(tile: &str) -> Document {
        entry(&format!("S2B_MSIL1C_20210519T142729_N0300_R053_{}_20210519T161529", tile), &format!("{}-1c", tile), "Level-1C")
    }

    fn builder() -> TileDescriptorBuilder {
        TileDescriptorBuilder::new(ProductType::sentinel2_msi())
    }

    fn names(tiles: &[TileDescriptor]) -> Vec<String> {
        tiles.iter().map(|t| t.name().to_string()).collect()
    }

    #[test]
    fn test_canonical_key_agrees_across_levels() {
        let s2 = ProductType::sentinel2_msi();
        let a = canonical_key(
            "S2B_MSIL2A_20210519T142729_N0300_R053_T19HBD_20210519T163959",
            s2.level(ProcessingLevel::Primary),
        );
        let b = canonical_key(
            "S2B_MSIL1C_20210519T142729_N0300_R053_T19HBD_20210519T161529",
            s2.level(ProcessingLevel::Secondary),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_ingest_results_stops_at_first_error() {
        let mut pulled = 0;
        let results = vec![
            Ok(l2a("T19HBD")),
            Ok(l1c("T19HBD")),
            Err(CatalogError::NotLoaded),
            Ok(l2a("T19HCD")),
        ];
        let mut builder = builder();
        let outcome = builder.ingest_results(results.into_iter().inspect(|_| pulled += 1));

        assert_eq!(outcome, Err(CatalogError::NotLoaded));
        assert_eq!(pulled, 3);
        assert_eq!(builder.len(ProcessingLevel::Primary), 1);
        assert_eq!(builder.len(ProcessingLevel::Secondary), 1);
    }

    #[test]
    fn test_ingest_results_counts_accepted() {
        let mut builder = builder();
        let accepted = builder
            .ingest_results(vec![Ok(l2a("T19HBD")), Ok(l1c("T19HBD"))])
            .unwrap();
        assert_eq!(accepted, 2);
        assert_eq!(builder.build().unwrap().len(), 1);
    }

    #[test]
    fn test_canonical_key_without_separator() {
        let s2 = ProductType::sentinel2_msi();
        assert_eq!(canonical_key("T19HBD", s2.level(ProcessingLevel::Primary)), "T19HBD");
    }

    #[test]
    fn test_build_joins_matching_keys_in_primary_order() {
        let mut builder = builder();
        builder.ingest(vec![l2a("TA"), l1c("TB"), l2a("TB")]);
        builder.ingest(vec![l2a("TC"), l1c("TA")]);

        let tiles = builder.build().unwrap();

        assert_eq!(
            names(&tiles),
            vec![
                "S2B_20210519T142729_N0300_R053_TA",
                "S2B_20210519T142729_N0300_R053_TB"
            ]
        );
        assert_eq!(tiles[0].product(ProcessingLevel::Secondary).uuid(), "TA-1c");
        assert_eq!(builder.unmatched(), UnmatchedCounts { primary: 1, secondary: 0 });
    }

    #[test]
    fn test_build_is_idempotent() {
        let mut builder = builder();
        builder.ingest(vec![l2a("TA"), l1c("TA"), l2a("TB"), l1c("TB")]);

        assert_eq!(builder.build().unwrap(), builder.build().unwrap());
    }

    #[test]
    fn test_duplicate_replaces_in_place() {
        let mut builder = builder();
        builder.ingest(vec![l2a("TA"), l2a("TB"), l1c("TA"), l1c("TB")]);

        let title = "S2B_MSIL2A_20210519T142729_N0300_R053_TA_20210519T163959";
        builder.ingest(vec![entry(title, "TA-2a-reprocessed", "Level-2A")]);

        let tiles = builder.build().unwrap();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].product(ProcessingLevel::Primary).uuid(), "TA-2a-reprocessed");
        assert_eq!(builder.len(ProcessingLevel::Primary), 2);
    }

    #[test]
    fn test_unknown_level_is_skipped() {
        let mut builder = builder();
        let accepted = builder.ingest(vec![
            l2a("TA"),
            entry("S1A_IW_GRDH_1SDV_X_Y", "s1", "Level-1"),
        ]);

        assert_eq!(accepted, 1);
        assert_eq!(builder.skipped(), 1);
    }

    #[test]
    fn test_report_counts_unmatched() {
        let mut builder = builder();
        builder.ingest(vec![l2a("TA"), l1c("TA"), l1c("TZ")]);

        let report = builder.report().unwrap();
        assert_eq!(report.tiles.len(), 1);
        assert_eq!(report.unmatched, UnmatchedCounts { primary: 0, secondary: 1 });
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_build_fails_on_invalid_pair() {
        let xml = format!(
            r#"<feed xmlns="{}"><entry>
                 <title>S2B_MSIL1C_20210519T142729_N0300_R053_TA_20210519T161529</title>
                 <str name="processinglevel">Level-1C</str>
               </entry></feed>"#,
            ATOM_NS
        );
        let no_uuid = Document::parse(xml.as_bytes()).unwrap().node("entry").unwrap().unwrap();

        let mut builder = builder();
        builder.ingest(vec![l2a("TA"), no_uuid]);

        match builder.build() {
            Err(CatalogError::Descriptor { key, source }) => {
                assert_eq!(key, "S2B_20210519T142729_N0300_R053_TA");
                assert!(matches!(source, DocumentError::MissingElement { .. }));
            }
            other => panic!("Expected Descriptor error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_builder_builds_nothing() {
        assert!(builder().build().unwrap().is_empty());
    }
}
