//! Manifest-backed page fetcher
//!
//! Reads a JSON document shaped like a photo library list response and serves
//! it page by page. `baseUrl` holds a local path (relative paths resolve
//! against the manifest's directory); downloading copies the file.
//!
//! ```json
//! { "mediaItems": [
//!     { "id": "A1", "filename": "IMG_0001.jpg",
//!       "productUrl": "https://photos.example/A1",
//!       "baseUrl": "originals/IMG_0001.jpg",
//!       "mediaMetadata": { "photo": {} } }
//! ] }
//! ```

use super::{Page, PageFetcher, RemoteItem};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Items per page, matching the list page size used at startup
pub const MANIFEST_PAGE_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    media_items: Vec<MediaItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaItem {
    id: String,
    filename: String,
    #[serde(default)]
    product_url: String,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    media_metadata: MediaMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct MediaMetadata {
    #[serde(default)]
    photo: Option<serde_json::Value>,
}

impl From<MediaItem> for RemoteItem {
    fn from(item: MediaItem) -> Self {
        RemoteItem {
            id: item.id,
            filename: item.filename,
            product_url: item.product_url,
            is_photo: item.media_metadata.photo.is_some(),
            location: item.base_url,
        }
    }
}

/// [`PageFetcher`] over a manifest file
pub struct ManifestFetcher {
    items: Vec<RemoteItem>,
    base_dir: PathBuf,
    page_size: usize,
}

impl ManifestFetcher {
    /// Load a manifest; an unreadable or malformed file is an error
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Remote(format!("Cannot read manifest {}: {}", path.display(), e))
        })?;
        let manifest: Manifest = serde_json::from_str(&content)?;

        info!(
            "Loaded manifest {} ({} entries)",
            path.display(),
            manifest.media_items.len()
        );

        Ok(Self {
            items: manifest.media_items.into_iter().map(RemoteItem::from).collect(),
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            page_size: MANIFEST_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl PageFetcher for ManifestFetcher {
    fn fetch_page(&mut self, token: Option<&str>) -> Result<Page> {
        let start = match token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::Remote(format!("Invalid page token: {token}")))?,
            None => 0,
        };

        let end = (start + self.page_size).min(self.items.len());
        let items = self.items.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_page_token = (end < self.items.len()).then(|| end.to_string());

        Ok(Page {
            items,
            next_page_token,
        })
    }

    fn download(&mut self, item: &RemoteItem, dir: &Path) -> Result<PathBuf> {
        let location = item
            .location
            .as_deref()
            .ok_or_else(|| Error::Remote(format!("No baseUrl for {}", item.filename)))?;

        let source = {
            let path = PathBuf::from(location);
            if path.is_absolute() {
                path
            } else {
                self.base_dir.join(path)
            }
        };

        let dest = dir.join(&item.filename);
        if dest.exists() {
            debug!("{} already downloaded", item.filename);
            return Ok(dest);
        }

        fs::copy(&source, &dest).map_err(|e| {
            Error::Remote(format!("Cannot fetch {}: {}", source.display(), e))
        })?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{PagedLibrary, RemoteSource};

    fn write_manifest(dir: &Path, count: usize) -> PathBuf {
        let items: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                let metadata = if i % 3 == 2 {
                    serde_json::json!({ "video": {} })
                } else {
                    serde_json::json!({ "photo": {} })
                };
                serde_json::json!({
                    "id": format!("id{i}"),
                    "filename": format!("IMG_{i:04}.jpg"),
                    "productUrl": format!("https://photos.example/id{i}"),
                    "baseUrl": format!("src/IMG_{i:04}.jpg"),
                    "mediaMetadata": metadata,
                })
            })
            .collect();
        let path = dir.join("manifest.json");
        fs::write(&path, serde_json::json!({ "mediaItems": items }).to_string()).unwrap();
        path
    }

    #[test]
    fn test_pages_and_photo_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(dir.path(), 12);
        let mut fetcher = ManifestFetcher::open(&path).unwrap();

        let first = fetcher.fetch_page(None).unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.next_page_token.as_deref(), Some("10"));
        assert!(first.items[0].is_photo);
        assert!(!first.items[2].is_photo);

        let second = fetcher.fetch_page(Some("10")).unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.next_page_token.is_none());
    }

    #[test]
    fn test_library_over_manifest_skips_videos() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(dir.path(), 6);
        let mut lib = PagedLibrary::new(ManifestFetcher::open(&path).unwrap().with_page_size(4));

        let ids: Vec<String> = lib.get_multiple(10).unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["id0", "id1", "id3", "id4"]);
    }

    #[test]
    fn test_download_copies_relative_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(dir.path(), 1);
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src").join("IMG_0000.jpg"), b"jpeg").unwrap();
        let out = tempfile::tempdir().unwrap();

        let mut fetcher = ManifestFetcher::open(&path).unwrap();
        let item = fetcher.fetch_page(None).unwrap().items.remove(0);
        let dest = fetcher.download(&item, out.path()).unwrap();

        assert_eq!(dest, out.path().join("IMG_0000.jpg"));
        assert_eq!(fs::read(dest).unwrap(), b"jpeg");
    }

    #[test]
    fn test_malformed_manifest_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ManifestFetcher::open(&path),
            Err(Error::Serialization(_))
        ));
        assert!(matches!(
            ManifestFetcher::open(&dir.path().join("absent.json")),
            Err(Error::Remote(_))
        ));
    }
}
