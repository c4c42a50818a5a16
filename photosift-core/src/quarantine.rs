//! Soft delete collaborator
//!
//! Deleting an item never destroys data: the file is moved into a sibling
//! `deleted` directory and moved back on restore.

use crate::error::{Error, Result};
use crate::item::Item;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the quarantine directory inside the source folder
pub const DELETED_DIR: &str = "deleted";

/// Reversible delete operations
pub trait Quarantine: Send {
    fn soft_delete(&self, item: &Item) -> Result<()>;
    fn restore(&self, item: &Item) -> Result<()>;
}

/// Moves files between `<source>/` and `<source>/deleted/`
#[derive(Debug, Clone)]
pub struct FsQuarantine {
    source: PathBuf,
    deleted: PathBuf,
}

impl FsQuarantine {
    /// Create the quarantine directory (if missing) under `source`
    pub fn create(source: &Path) -> Result<Self> {
        let deleted = source.join(DELETED_DIR);
        fs::create_dir_all(&deleted).map_err(|e| {
            Error::Quarantine(format!(
                "Cannot create '{}' folder: {}",
                deleted.display(),
                e
            ))
        })?;

        Ok(Self {
            source: source.to_path_buf(),
            deleted,
        })
    }

    pub fn deleted_dir(&self) -> &Path {
        &self.deleted
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| {
            Error::Quarantine(format!(
                "Cannot move {} to {}: {}",
                from.display(),
                to.display(),
                e
            ))
        })?;
        debug!("Moved {} -> {}", from.display(), to.display());
        Ok(())
    }
}

impl Quarantine for FsQuarantine {
    fn soft_delete(&self, item: &Item) -> Result<()> {
        self.move_file(&self.source.join(item.key()), &self.deleted.join(item.key()))
    }

    fn restore(&self, item: &Item) -> Result<()> {
        self.move_file(&self.deleted.join(item.key()), &self.source.join(item.key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_delete_and_restore_move_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"data").unwrap();

        let quarantine = FsQuarantine::create(dir.path()).unwrap();
        let item = Item::new("a.jpg", dir.path().join("a.jpg"));

        quarantine.soft_delete(&item).unwrap();
        assert!(!dir.path().join("a.jpg").exists());
        assert!(dir.path().join(DELETED_DIR).join("a.jpg").exists());

        quarantine.restore(&item).unwrap();
        assert!(dir.path().join("a.jpg").exists());
        assert!(!dir.path().join(DELETED_DIR).join("a.jpg").exists());
    }

    #[test]
    fn test_missing_file_is_quarantine_error() {
        let dir = tempfile::tempdir().unwrap();
        let quarantine = FsQuarantine::create(dir.path()).unwrap();
        let item = Item::new("ghost.jpg", dir.path().join("ghost.jpg"));
        assert!(matches!(
            quarantine.soft_delete(&item),
            Err(Error::Quarantine(_))
        ));
    }
}
