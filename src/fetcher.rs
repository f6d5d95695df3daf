//! Bounded pagination over a page-addressed collection.
//!
//! A [`Paginator`] walks pages `1..=max_pages` of a [`PageSource`] and stops at the
//! first empty or failing page. Stopping is never an error for the caller: the
//! reason is reported through [`Termination`] next to whatever was accumulated.

use log::{debug, warn};
use thiserror::Error;

pub const DEFAULT_MAX_PAGES: u32 = 5;
pub const DEFAULT_PAGE_SIZE: u8 = 100;
/// GitHub refuses a larger `per_page`.
pub const MAX_PAGE_SIZE: u8 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("at least one page must be allowed")]
    NoPages,
    #[error("page size must be between 1 and 100, got {0}")]
    PageSize(u8),
}

/// Why a single page could not be used.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("upstream rejected the request: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub page: u32,
    pub per_page: u8,
}

/// One page-addressed collection, e.g. the closed pull requests of a repository.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    type Item;

    /// Human readable name of the collection, used in logs.
    fn resource(&self) -> &str;

    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<Self::Item>, PageError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Page `page` came back empty.
    Exhausted { page: u32 },
    /// Page `page` failed; nothing from it was kept.
    Failed { page: u32, reason: PageError },
    /// Every allowed page was full, more items may exist upstream.
    CeilingReached { pages: u32 },
}

#[derive(Debug)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    pub requests: u32,
    pub termination: Termination,
}

impl<T> Fetched<T> {
    /// True unless the upstream collection was seen to end.
    pub fn possibly_truncated(&self) -> bool {
        !matches!(self.termination, Termination::Exhausted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    max_pages: u32,
    page_size: u8,
}

impl Default for Paginator {
    fn default() -> Self {
        Paginator {
            max_pages: DEFAULT_MAX_PAGES,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Paginator {
    pub fn new(max_pages: u32, page_size: u8) -> Result<Self, FetchError> {
        if max_pages == 0 {
            return Err(FetchError::NoPages);
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(FetchError::PageSize(page_size));
        }
        Ok(Paginator {
            max_pages,
            page_size,
        })
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn page_size(&self) -> u8 {
        self.page_size
    }

    /// Fetches pages in order until one is empty or fails, or `max_pages` requests were made.
    pub async fn fetch_all<S: PageSource>(&self, source: &S) -> Fetched<S::Item> {
        let mut items = Vec::new();
        let mut requests = 0;

        for page in 1..=self.max_pages {
            requests += 1;
            let request = PageRequest {
                page,
                per_page: self.page_size,
            };
            match source.fetch_page(request).await {
                Err(reason) => {
                    warn!("{} -- page {}: {}", source.resource(), page, reason);
                    return Fetched {
                        items,
                        requests,
                        termination: Termination::Failed { page, reason },
                    };
                }
                Ok(batch) if batch.is_empty() => {
                    debug!("{} -- page {} is empty", source.resource(), page);
                    return Fetched {
                        items,
                        requests,
                        termination: Termination::Exhausted { page },
                    };
                }
                Ok(batch) => {
                    debug!("{} -- page {}: {} items", source.resource(), page, batch.len());
                    items.extend(batch);
                }
            }
        }

        warn!(
            "{}: stopped after {} pages, results may be incomplete",
            source.resource(),
            self.max_pages
        );
        Fetched {
            items,
            requests,
            termination: Termination::CeilingReached {
                pages: self.max_pages,
            },
        }
    }
}
