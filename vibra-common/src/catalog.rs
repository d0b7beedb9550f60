//! Media catalog loading
//!
//! A catalog is a JSON array of media items, each carrying the timeline
//! document for its haptic track. Loading is a thin I/O wrapper; timeline
//! validation happens when a playback session builds its
//! [`Timeline`](crate::timeline::Timeline).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::timeline::TimelineDocument;
use crate::Result;

/// One media item with its attached haptic timeline document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub title: String,

    #[serde(rename = "mediaUrl")]
    pub media_url: String,

    #[serde(rename = "thumbnailUrl", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Haptic timeline for this item, still unvalidated
    pub haptics: TimelineDocument,
}

/// Loaded media catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<MediaItem>,
}

impl Catalog {
    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading media catalog from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse a catalog from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<MediaItem> = serde_json::from_str(json)?;
        debug!("Loaded catalog: {} items", items.len());
        Ok(Self { items })
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// Look up an item by exact title
    pub fn find_by_title(&self, title: &str) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.title == title)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOG_JSON: &str = r#"[
        {
            "title": "Fireworks",
            "mediaUrl": "https://media.example.com/fireworks.mp4",
            "thumbnailUrl": "https://media.example.com/fireworks.jpg",
            "haptics": {
                "version": 1,
                "events": [
                    {"t": 1000, "type": "primitive", "primitive": "CLICK"}
                ]
            }
        },
        {
            "title": "Drums",
            "mediaUrl": "https://media.example.com/drums.mp4",
            "haptics": {"version": 1, "events": []}
        }
    ]"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_json(CATALOG_JSON).unwrap();
        assert_eq!(catalog.len(), 2);

        let item = catalog.find_by_title("Fireworks").unwrap();
        assert_eq!(item.media_url, "https://media.example.com/fireworks.mp4");
        assert_eq!(item.haptics.events.len(), 1);

        // thumbnailUrl is optional
        let drums = catalog.find_by_title("Drums").unwrap();
        assert!(drums.thumbnail_url.is_none());
    }

    #[test]
    fn test_find_by_title_miss() {
        let catalog = Catalog::from_json(CATALOG_JSON).unwrap();
        assert!(catalog.find_by_title("Nope").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG_JSON.as_bytes()).unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = Catalog::load(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn test_malformed_catalog() {
        let err = Catalog::from_json("{\"not\": \"a list\"}").unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
    }
}
