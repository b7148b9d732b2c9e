//! GeoJSON files offered for download, and user-supplied files read back in.

use geojson::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};

/// Name of the file holding every drawn shape.
pub const COLLECTION_FILENAME: &str = "drawn_shapes.geojson";

/// File extensions accepted for upload.
pub const IMPORT_EXTENSIONS: [&str; 2] = ["geojson", "kml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ExportFile {
    pub filename: String,
    pub contents: String,
}

impl ExportFile {
    pub fn collection(features: Vec<Feature>) -> Self {
        let collection = FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };
        Self {
            filename: COLLECTION_FILENAME.to_string(),
            contents: pretty(&collection),
        }
    }

    /// A single feature; drafts have no id and share one name.
    pub fn feature(feature: &Feature, id: Option<&str>) -> Self {
        Self {
            filename: format!("shape_{}.geojson", id.unwrap_or("draft")),
            contents: pretty(feature),
        }
    }
}

fn pretty(value: &impl Serialize) -> String {
    // GeoJSON types only have string map keys, so this can't fail.
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unsupported file type: {0} (expected .geojson or .kml)")]
    UnsupportedExtension(String),

    #[error("file is not valid JSON")]
    Parse(#[from] serde_json::Error),
}

/// Parse an uploaded file's text as JSON. There is deliberately no GeoJSON
/// schema check: the map surface gets the value as-is.
pub fn parse_upload(filename: &str, text: &str) -> Result<serde_json::Value, ImportError> {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !IMPORT_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ImportError::UnsupportedExtension(filename.to_string()));
    }

    Ok(serde_json::from_str(text)?)
}

/// Features found in an uploaded value: a FeatureCollection's members, a lone
/// Feature, or nothing.
pub fn uploaded_features(value: &serde_json::Value) -> Vec<Feature> {
    match value.get("type").and_then(|t| t.as_str()) {
        Some("FeatureCollection") => value
            .get("features")
            .and_then(|f| f.as_array())
            .into_iter()
            .flatten()
            .filter_map(|f| {
                serde_json::from_value(f.clone())
                    .inspect_err(|e| log::warn!("Skipping unreadable feature: {e}"))
                    .ok()
            })
            .collect(),
        Some("Feature") => serde_json::from_value(value.clone())
            .inspect_err(|e| log::warn!("Skipping unreadable feature: {e}"))
            .ok()
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}
