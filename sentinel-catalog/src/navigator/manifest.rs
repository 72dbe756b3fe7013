//! Manifest file index.
//!
//! A product manifest declares every file of the product as a
//! `fileLocation` whose `href` is relative to the product root:
//!
//! ```text
//! <dataObjectSection>
//!   <dataObject ID="IMG_DATA_Band_B04_10m_Tile1_Data">
//!     <byteStream>
//!       <fileLocation href="./GRANULE/L2A_T19HBD_.../IMG_DATA/R10m/T19HBD_..._B04_10m.jp2"/>
//! ```
//!
//! The index keeps those hrefs, split by [`FileLayout`] patterns into image
//! data, quality indicators and the tile metadata document.

use glob::Pattern;

use crate::document::{Document, DocumentError};
use crate::error::{CatalogError, CatalogResult};

/// Path of the declared file locations inside a manifest.
pub const FILE_LOCATION_PATH: &str = "dataObjectSection/dataObject//fileLocation";

/// Glob patterns classifying manifest hrefs.
///
/// `*` also matches `/`, so `./GRANULE/*/IMG_DATA/*` covers files in
/// resolution subfolders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLayout {
    pub image_data: String,
    pub quality_data: String,
    pub tile_metadata: String,
}

impl Default for FileLayout {
    fn default() -> Self {
        Self {
            image_data: "./GRANULE/*/IMG_DATA/*".to_string(),
            quality_data: "./GRANULE/*/QI_DATA/*".to_string(),
            tile_metadata: "./GRANULE/*/MTD_TL.xml".to_string(),
        }
    }
}

impl FileLayout {
    fn compile(pattern: &str) -> CatalogResult<Pattern> {
        Pattern::new(pattern).map_err(|e| {
            CatalogError::Configuration(format!("invalid file pattern '{}': {}", pattern, e))
        })
    }

    fn compiled(&self) -> CatalogResult<[Pattern; 3]> {
        Ok([
            Self::compile(&self.image_data)?,
            Self::compile(&self.quality_data)?,
            Self::compile(&self.tile_metadata)?,
        ])
    }
}

/// File hrefs declared by one manifest, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestIndex {
    image_files: Vec<String>,
    quality_files: Vec<String>,
    tile_metadata: Option<String>,
}

impl ManifestIndex {
    /// Classifies manifest hrefs, keeping manifest order.
    ///
    /// Files matching no pattern are ignored. Only the first tile metadata
    /// document is kept.
    pub fn from_hrefs<I>(hrefs: I, layout: &FileLayout) -> CatalogResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let [image, quality, metadata] = layout.compiled()?;

        let mut index = ManifestIndex::default();
        for href in hrefs {
            if image.matches(&href) {
                index.image_files.push(href);
            } else if quality.matches(&href) {
                index.quality_files.push(href);
            } else if metadata.matches(&href) && index.tile_metadata.is_none() {
                index.tile_metadata = Some(href);
            }
        }
        Ok(index)
    }

    pub fn image_files(&self) -> &[String] {
        &self.image_files
    }

    pub fn quality_files(&self) -> &[String] {
        &self.quality_files
    }

    pub fn tile_metadata(&self) -> Option<&str> {
        self.tile_metadata.as_deref()
    }
}

/// All `href`s under the manifest's data object section. Locations
/// without an `href` are skipped.
///
/// Default namespaces declared inside metadata wrappers do not affect the
/// unqualified data object section.
pub fn file_locations(manifest: &Document) -> Result<Vec<String>, DocumentError> {
    let mut hrefs = Vec::new();
    for location in manifest.all(FILE_LOCATION_PATH)? {
        if let Some(href) = location.attribute(".", "href")? {
            hrefs.push(href.trim().to_string());
        }
    }
    Ok(hrefs)
}

/// Whether the file named by `href` carries `code`.
///
/// The file stem must equal the code, or contain it as a run of whole
/// `_`-separated segments: `B04` matches `T19HBD_20210519T142729_B04.jp2`
/// and `..._B04_10m.jp2`, but not `..._B8A.jp2` or `..._B041.jp2`.
pub fn matches_code(href: &str, code: &str) -> bool {
    if code.is_empty() {
        return false;
    }
    let name = href.rsplit('/').next().unwrap_or(href);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);

    stem == code
        || stem.starts_with(&format!("{}_", code))
        || stem.ends_with(&format!("_{}", code))
        || stem.contains(&format!("_{}_", code))
}

/// The single entry of `files` matching `code`, or the number of matches.
pub fn find_unique<'a>(files: &'a [String], code: &str) -> Result<&'a str, usize> {
    let mut matches = files.iter().filter(|href| matches_code(href, code));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(only.as_str()),
        (None, _) => Err(0),
        (Some(_), Some(_)) => Err(2 + matches.count()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const L2A_GRANULE: &str = "./GRANULE/L2A_T19HBD_A021944_20210519T143354";
    pub const L1C_GRANULE: &str = "./GRANULE/L1C_T19HBD_A021944_20210519T143354";

    pub fn l2a_files() -> Vec<String> {
        let mut files = Vec::new();
        for (res, bands) in [
            ("10m", vec!["B02", "B03", "B04", "B08", "TCI"]),
            ("20m", vec!["B02", "B04", "B8A", "SCL"]),
            ("60m", vec!["B01", "B04", "B09"]),
        ] {
            for band in bands {
                files.push(format!(
                    "{}/IMG_DATA/R{}/T19HBD_20210519T142729_{}_{}.jp2",
                    L2A_GRANULE, res, band, res
                ));
            }
        }
        files.push(format!("{}/QI_DATA/MSK_CLDPRB_20m.jp2", L2A_GRANULE));
        files.push(format!("{}/QI_DATA/MSK_CLDPRB_60m.jp2", L2A_GRANULE));
        files.push(format!("{}/QI_DATA/MSK_SNWPRB_20m.jp2", L2A_GRANULE));
        files.push(format!("{}/MTD_TL.xml", L2A_GRANULE));
        files.push("./MTD_MSIL2A.xml".to_string());
        files
    }

    pub fn l1c_files() -> Vec<String> {
        let mut files: Vec<String> = ["B01", "B02", "B03", "B04", "B08", "B8A", "TCI"]
            .iter()
            .map(|band| format!("{}/IMG_DATA/T19HBD_20210519T142729_{}.jp2", L1C_GRANULE, band))
            .collect();
        files.push(format!("{}/QI_DATA/MSK_CLOUDS_B00.gml", L1C_GRANULE));
        files.push(format!("{}/MTD_TL.xml", L1C_GRANULE));
        files
    }

    /// Builds a manifest declaring `files`. The metadata section declares
    /// its own default namespace, as real product manifests do.
    pub fn manifest_xml(files: &[String]) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<xfdu:XFDU xmlns:xfdu="urn:ccsds:schema:xfdu:1" version="esa/safe/sentinel/1.1/sentinel-2/msi/archive_l2a_user_product">
<informationPackageMap><xfdu:contentUnit/></informationPackageMap>
<metadataSection><metadataObject ID="platform"><metadataWrap mimeType="text/xml"><xmlData><platform xmlns="http://www.esa.int/safe/sentinel/1.1"><familyName>SENTINEL-2</familyName></platform></xmlData></metadataWrap></metadataObject></metadataSection>
<dataObjectSection>"#,
        );
        for (i, file) in files.iter().enumerate() {
            xml.push_str(&format!(
                r#"<dataObject ID="object_{i}"><byteStream mimeType="application/octet-stream" size="1"><fileLocation locatorType="URL" href="{file}"/><checksum checksumName="MD5">0</checksum></byteStream></dataObject>"#
            ));
        }
        xml.push_str("</dataObjectSection></xfdu:XFDU>");
        xml
    }

    fn index(files: &[String]) -> ManifestIndex {
        let doc = Document::parse(manifest_xml(files).as_bytes()).unwrap();
        ManifestIndex::from_hrefs(file_locations(&doc).unwrap(), &FileLayout::default()).unwrap()
    }

    #[test]
    fn test_partitions_by_layout() {
        let index = index(&l2a_files());

        assert_eq!(index.image_files().len(), 12);
        assert_eq!(index.quality_files().len(), 3);
        assert_eq!(
            index.tile_metadata(),
            Some("./GRANULE/L2A_T19HBD_A021944_20210519T143354/MTD_TL.xml")
        );
        assert!(index.image_files().iter().all(|f| f.contains("/IMG_DATA/")));
    }

    #[test]
    fn test_file_locations_in_manifest_order() {
        let files = l1c_files();
        let doc = Document::parse(manifest_xml(&files).as_bytes()).unwrap();
        assert_eq!(file_locations(&doc).unwrap(), files);
    }

    #[test]
    fn test_file_locations_ignore_nested_default_namespace() {
        let xml = r#"<xfdu:XFDU xmlns:xfdu="urn:ccsds:schema:xfdu:1">
<metadataSection><metadataObject><metadataWrap><xmlData><extra xmlns="urn:x"/></xmlData></metadataWrap></metadataObject></metadataSection>
<dataObjectSection><dataObject ID="b04"><byteStream><fileLocation href="./GRANULE/G/IMG_DATA/R10m/T_B04_10m.jp2"/></byteStream></dataObject></dataObjectSection>
</xfdu:XFDU>"#;
        let doc = Document::parse(xml.as_bytes()).unwrap();
        assert_eq!(
            file_locations(&doc).unwrap(),
            vec!["./GRANULE/G/IMG_DATA/R10m/T_B04_10m.jp2".to_string()]
        );
    }

    #[test]
    fn test_matches_code() {
        assert!(matches_code("./a/T19HBD_20210519T142729_B04.jp2", "B04"));
        assert!(matches_code("./a/T19HBD_20210519T142729_B04_10m.jp2", "B04"));
        assert!(matches_code("./a/T19HBD_20210519T142729_B04_10m.jp2", "B04_10m"));
        assert!(matches_code("./a/MSK_CLDPRB_20m.jp2", "MSK_CLDPRB_20m"));
        assert!(!matches_code("./a/T19HBD_20210519T142729_B8A.jp2", "B04"));
        assert!(!matches_code("./a/T19HBD_20210519T142729_B041.jp2", "B04"));
        assert!(!matches_code("./a/T19HBD_B04.jp2", ""));
    }

    #[test]
    fn test_find_unique_counts_candidates() {
        let index = index(&l2a_files());

        assert!(find_unique(index.image_files(), "B04_10m").unwrap().ends_with("_B04_10m.jp2"));
        assert_eq!(find_unique(index.image_files(), "B04"), Err(3));
        assert_eq!(find_unique(index.image_files(), "B13"), Err(0));
        assert_eq!(find_unique(index.quality_files(), "CLDPRB"), Err(2));
    }

    #[test]
    fn test_invalid_layout_is_configuration_error() {
        let layout = FileLayout {
            image_data: "./GRANULE/[".to_string(),
            ..FileLayout::default()
        };
        assert!(matches!(
            ManifestIndex::from_hrefs(l1c_files(), &layout),
            Err(CatalogError::Configuration(_))
        ));
    }
}
