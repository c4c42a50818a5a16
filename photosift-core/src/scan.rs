//! Source directory listing (non-recursive)

use crate::error::{Error, Result};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Accepted photograph extensions (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Photograph filenames in `dir`, in display order
///
/// An unreadable directory is an error; unreadable entries are skipped.
pub fn list_images(dir: &Path) -> Result<Vec<String>> {
    let mut names = list_files(dir, is_image)?;
    sort_for_display(&mut names);
    debug!("Found {} images in {}", names.len(), dir.display());
    Ok(names)
}

/// Every regular filename in `dir`, unsorted
pub fn list_all_files(dir: &Path) -> Result<Vec<String>> {
    list_files(dir, |_| true)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn list_files(dir: &Path, accept: impl Fn(&Path) -> bool) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(Error::Io(e.into())),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !accept(entry.path()) {
            continue;
        }

        names.push(entry.file_name().to_string_lossy().to_string());
    }

    Ok(names)
}

/// Sort so that `.` orders before every other character
///
/// Keeps `IMG_1.jpg` ahead of `IMG_1_edit.jpg`.
pub fn sort_for_display(names: &mut [String]) {
    names.sort_by_cached_key(|name| name.replace('.', "\u{1}"));
}
