//! Deletion export
//!
//! The remote library is read-only, so deletions made during a remote session
//! are written out as a list of product URLs for a separate tool to act on.

use crate::error::Result;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name for an export created at `now`
pub fn export_file_name(now: DateTime<Local>) -> String {
    format!("{}_deleted.json", now.format("%Y%m%d_%H%M%S"))
}

/// Write `product_urls` as a JSON array into `dir`
///
/// Nothing is written (and None returned) when the list is empty.
pub fn write_deleted_export(dir: &Path, product_urls: &[String]) -> Result<Option<PathBuf>> {
    if product_urls.is_empty() {
        return Ok(None);
    }

    let path = dir.join(export_file_name(Local::now()));
    fs::write(&path, serde_json::to_string(product_urls)?)?;

    info!(
        "Wrote {} deleted product URLs to {}",
        product_urls.len(),
        path.display()
    );
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_is_timestamped() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(export_file_name(at), "20240309_070501_deleted.json");
    }

    #[test]
    fn test_writes_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let urls = vec!["https://p/1".to_string(), "https://p/2".to_string()];

        let path = write_deleted_export(dir.path(), &urls).unwrap().unwrap();
        let parsed: Vec<String> =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, urls);
    }

    #[test]
    fn test_empty_list_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_deleted_export(dir.path(), &[]).unwrap().is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
