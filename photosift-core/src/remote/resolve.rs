//! Map local filenames to remote product URLs

use super::RemoteSource;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Walk at most `limit` remote photographs and record the product URL of
/// every one whose filename appears in `filenames`
///
/// Stops early once every filename is resolved or the source runs out.
pub fn resolve_product_urls(
    source: &mut dyn RemoteSource,
    filenames: &[String],
    limit: usize,
) -> Result<BTreeMap<String, String>> {
    let mut remaining: HashSet<&str> = filenames.iter().map(String::as_str).collect();
    let total = remaining.len();
    let mut resolved = BTreeMap::new();

    for _ in 0..limit {
        if remaining.is_empty() {
            break;
        }

        let item = match source.get_next() {
            Ok(item) => item,
            Err(Error::Exhausted) => break,
            Err(e) => return Err(e),
        };

        if remaining.remove(item.filename.as_str()) {
            debug!("[{}/{}] found {}", resolved.len() + 1, total, item.filename);
            resolved.insert(item.filename, item.product_url);
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteItem;
    use std::path::{Path, PathBuf};

    struct Listing {
        items: Vec<RemoteItem>,
        served: usize,
    }

    impl RemoteSource for Listing {
        fn get_next(&mut self) -> Result<RemoteItem> {
            let item = self.items.get(self.served).cloned().ok_or(Error::Exhausted)?;
            self.served += 1;
            Ok(item)
        }

        fn download(&mut self, _item: &RemoteItem, dir: &Path) -> Result<PathBuf> {
            Ok(dir.to_path_buf())
        }
    }

    fn listing(names: &[&str]) -> Listing {
        Listing {
            items: names
                .iter()
                .map(|name| RemoteItem {
                    id: name.to_string(),
                    filename: name.to_string(),
                    product_url: format!("https://photos.example/{name}"),
                    is_photo: true,
                    location: None,
                })
                .collect(),
            served: 0,
        }
    }

    #[test]
    fn test_resolves_and_stops_when_done() {
        let mut source = listing(&["x.jpg", "a.jpg", "b.jpg", "c.jpg"]);
        let wanted = vec!["a.jpg".to_string(), "b.jpg".to_string()];

        let resolved = resolve_product_urls(&mut source, &wanted, 100).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["a.jpg"], "https://photos.example/a.jpg");
        assert_eq!(source.served, 3);
    }

    #[test]
    fn test_limit_and_exhaustion() {
        let mut source = listing(&["x.jpg", "a.jpg"]);
        let wanted = vec!["a.jpg".to_string(), "missing.jpg".to_string()];

        assert!(resolve_product_urls(&mut source, &wanted, 1).unwrap().is_empty());

        let resolved = resolve_product_urls(&mut source, &wanted, 100).unwrap();
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["a.jpg"]);
    }
}
