//! Remote Source Adapter
//!
//! The engine only ever calls [`RemoteSource::get_next`] (and
//! `get_multiple` at startup) and expects every call to yield a distinct
//! photograph. [`PagedLibrary`] provides that contract on top of any
//! [`PageFetcher`]:
//! - pages are refetched transparently
//! - non-photo entries are skipped
//! - an entry repeating the previously returned id is skipped
//! - running out of pages yields [`Error::Exhausted`]

pub mod manifest;
pub mod resolve;

pub use manifest::ManifestFetcher;
pub use resolve::resolve_product_urls;

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Entry as listed by the remote library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub id: String,
    pub filename: String,
    pub product_url: String,
    pub is_photo: bool,
    /// Where the bytes can be fetched from
    pub location: Option<String>,
}

/// On-demand source of remote photographs
pub trait RemoteSource: Send {
    /// Next distinct photograph
    fn get_next(&mut self) -> Result<RemoteItem>;

    /// Up to `amount` photographs; fewer if the source runs out
    fn get_multiple(&mut self, amount: usize) -> Result<Vec<RemoteItem>> {
        let mut items = Vec::with_capacity(amount);
        while items.len() < amount {
            match self.get_next() {
                Ok(item) => items.push(item),
                Err(Error::Exhausted) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(items)
    }

    /// Store the item's bytes in `dir`, returning the local path
    fn download(&mut self, item: &RemoteItem, dir: &Path) -> Result<PathBuf>;
}

/// One page of a list response
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<RemoteItem>,
    pub next_page_token: Option<String>,
}

/// Raw paginated access to a remote library
pub trait PageFetcher: Send {
    /// Fetch the page for `token` (None = first page)
    fn fetch_page(&mut self, token: Option<&str>) -> Result<Page>;

    fn download(&mut self, item: &RemoteItem, dir: &Path) -> Result<PathBuf>;
}

/// [`RemoteSource`] over a [`PageFetcher`]
pub struct PagedLibrary<F> {
    fetcher: F,
    buffer: VecDeque<RemoteItem>,
    next_token: Option<String>,
    started: bool,
    last_id: Option<String>,
}

impl<F: PageFetcher> PagedLibrary<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            buffer: VecDeque::new(),
            next_token: None,
            started: false,
            last_id: None,
        }
    }

    fn refill(&mut self) -> Result<()> {
        if self.started && self.next_token.is_none() {
            return Err(Error::Exhausted);
        }

        let page = self.fetcher.fetch_page(self.next_token.as_deref())?;
        debug!(
            "Fetched page with {} items (more={})",
            page.items.len(),
            page.next_page_token.is_some()
        );

        self.started = true;
        self.next_token = page.next_page_token;
        self.buffer.extend(page.items);
        Ok(())
    }
}

impl<F: PageFetcher> RemoteSource for PagedLibrary<F> {
    fn get_next(&mut self) -> Result<RemoteItem> {
        loop {
            let Some(item) = self.buffer.pop_front() else {
                self.refill()?;
                continue;
            };

            if !item.is_photo {
                debug!("Skipping non-photo {}", item.filename);
                continue;
            }

            if self.last_id.as_deref() == Some(item.id.as_str()) {
                debug!("Skipping repeated entry {}", item.id);
                continue;
            }

            self.last_id = Some(item.id.clone());
            return Ok(item);
        }
    }

    fn download(&mut self, item: &RemoteItem, dir: &Path) -> Result<PathBuf> {
        self.fetcher.download(item, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: &str) -> RemoteItem {
        RemoteItem {
            id: id.to_string(),
            filename: format!("{id}.jpg"),
            product_url: format!("https://photos.example/{id}"),
            is_photo: true,
            location: None,
        }
    }

    fn video(id: &str) -> RemoteItem {
        RemoteItem {
            is_photo: false,
            ..photo(id)
        }
    }

    /// Serves fixed pages; token is the page index
    struct StaticPages {
        pages: Vec<Vec<RemoteItem>>,
        fetches: usize,
    }

    impl PageFetcher for StaticPages {
        fn fetch_page(&mut self, token: Option<&str>) -> Result<Page> {
            self.fetches += 1;
            let index: usize = token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let next = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
            Ok(Page {
                items: self.pages[index].clone(),
                next_page_token: next,
            })
        }

        fn download(&mut self, item: &RemoteItem, dir: &Path) -> Result<PathBuf> {
            Ok(dir.join(&item.filename))
        }
    }

    fn library(pages: Vec<Vec<RemoteItem>>) -> PagedLibrary<StaticPages> {
        PagedLibrary::new(StaticPages { pages, fetches: 0 })
    }

    #[test]
    fn test_pagination_is_transparent() {
        let mut lib = library(vec![vec![photo("a"), photo("b")], vec![photo("c")]]);
        let ids: Vec<String> = (0..3).map(|_| lib.get_next().unwrap().id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(lib.fetcher.fetches, 2);
        assert!(matches!(lib.get_next(), Err(Error::Exhausted)));
    }

    #[test]
    fn test_skips_non_photos_and_consecutive_duplicates() {
        let mut lib = library(vec![
            vec![photo("a"), video("v1"), photo("a")],
            vec![photo("a"), photo("b"), video("v2"), photo("a")],
        ]);
        let ids: Vec<String> = std::iter::from_fn(|| lib.get_next().ok())
            .map(|item| item.id)
            .collect();
        // Only consecutive repeats are dropped
        assert_eq!(ids, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_empty_pages_are_skipped() {
        let mut lib = library(vec![vec![], vec![video("v")], vec![photo("z")]]);
        assert_eq!(lib.get_next().unwrap().id, "z");
    }

    #[test]
    fn test_get_multiple_stops_at_exhaustion() {
        let mut lib = library(vec![vec![photo("a"), photo("b")]]);
        let items = lib.get_multiple(10).unwrap();
        assert_eq!(items.len(), 2);
        assert!(lib.get_multiple(3).unwrap().is_empty());
    }
}
