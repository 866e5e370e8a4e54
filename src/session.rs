use crate::cache::PageCache;
use crate::error::{GrabError, Result};
use crate::pagination::PaginationTracker;
use crate::types::{PageFetch, RepoRecord, SearchQuery, DEFAULT_PER_PAGE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    /// `from` is the page shown before the fetch began.
    Fetching { page: u32, from: u32 },
    Failed(String),
}

/// A page fetch handed to the caller to run, then passed back to
/// [`SearchSession::complete`] with its result.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub generation: u64,
    pub query: SearchQuery,
    pub page: u32,
}

#[derive(Debug, Clone)]
pub enum Navigation {
    /// Page was already cached and is now current.
    Cached,
    Fetch(PageRequest),
    /// No page in that direction, no active search, or a fetch is in flight.
    Blocked,
}

/// One search session: the query, its cached pages, pagination, and a
/// single-flight guard so only one page fetch runs at a time.
#[derive(Debug)]
pub struct SearchSession {
    query: Option<SearchQuery>,
    cache: PageCache,
    pagination: PaginationTracker,
    state: FetchState,
    generation: u64,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    pub fn new() -> Self {
        Self {
            query: None,
            cache: PageCache::new(),
            pagination: PaginationTracker::new(DEFAULT_PER_PAGE),
            state: FetchState::Idle,
            generation: 0,
        }
    }

    pub fn query(&self) -> Option<&SearchQuery> {
        self.query.as_ref()
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut PageCache {
        &mut self.cache
    }

    pub fn pagination(&self) -> &PaginationTracker {
        &self.pagination
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.state, FetchState::Fetching { .. })
    }

    pub fn current_page(&self) -> u32 {
        self.pagination.current_page()
    }

    pub fn current_records(&self) -> &[RepoRecord] {
        self.cache
            .get(self.pagination.current_page())
            .unwrap_or_default()
    }

    /// Begin a new search, discarding every cached page and the page count of
    /// the previous one. Rejected while a fetch is in flight.
    pub fn start_search(&mut self, query: SearchQuery) -> Result<PageRequest> {
        if self.is_fetching() {
            return Err(GrabError::Busy);
        }

        tracing::info!(search = %query.describe(), per_page = query.per_page, "starting search");

        self.generation += 1;
        self.cache.invalidate_all();
        self.pagination = PaginationTracker::new(query.per_page);
        self.state = FetchState::Fetching { page: 1, from: 1 };
        self.query = Some(query.clone());

        Ok(PageRequest {
            generation: self.generation,
            query,
            page: 1,
        })
    }

    /// Forget the current search. A fetch still in flight will be ignored
    /// when it completes.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.query = None;
        self.cache.invalidate_all();
        self.pagination = PaginationTracker::new(DEFAULT_PER_PAGE);
        self.state = FetchState::Idle;
    }

    /// Move forward one page, fetching it unless it is cached.
    pub fn next(&mut self) -> Navigation {
        if !self.can_navigate() {
            return Navigation::Blocked;
        }
        let from = self.pagination.current_page();
        if !self.pagination.next() {
            return Navigation::Blocked;
        }
        self.open_current(from)
    }

    /// Move back one page, fetching it unless it is cached.
    pub fn prev(&mut self) -> Navigation {
        if !self.can_navigate() {
            return Navigation::Blocked;
        }
        let from = self.pagination.current_page();
        if !self.pagination.prev() {
            return Navigation::Blocked;
        }
        self.open_current(from)
    }

    fn can_navigate(&self) -> bool {
        !self.is_fetching() && self.query.is_some()
    }

    // The tracker has already moved; `from` is where to return if the fetch
    // fails or turns up nothing.
    fn open_current(&mut self, from: u32) -> Navigation {
        let page = self.pagination.current_page();
        if self.cache.contains(page) {
            tracing::debug!(page, "page cache hit");
            return Navigation::Cached;
        }
        let Some(query) = self.query.clone() else {
            self.pagination.set_current(from);
            return Navigation::Blocked;
        };

        self.state = FetchState::Fetching { page, from };
        Navigation::Fetch(PageRequest {
            generation: self.generation,
            query,
            page,
        })
    }

    /// Apply the result of a fetch started by [`SearchSession::start_search`]
    /// or a navigation. Returns `Ok(false)` for a result that belongs to a
    /// search that has since been replaced.
    ///
    /// An empty page past the first is cached, but the view stays on the page
    /// it came from.
    pub fn complete(&mut self, request: &PageRequest, result: Result<PageFetch>) -> Result<bool> {
        if request.generation != self.generation {
            tracing::debug!(page = request.page, "discarding stale page result");
            return Ok(false);
        }

        let from = match self.state {
            FetchState::Fetching { from, .. } => from,
            _ => self.pagination.current_page(),
        };

        match result {
            Ok(fetch) => {
                let empty = fetch.records.is_empty();
                self.pagination
                    .record_fetch(request.page, fetch.records.len(), fetch.hint);
                self.cache.put(request.page, fetch.records);
                if empty && request.page > 1 {
                    tracing::debug!(page = request.page, "empty page, staying on page {}", from);
                    self.pagination.set_current(from);
                } else {
                    self.pagination.set_current(request.page);
                }
                self.state = FetchState::Idle;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(page = request.page, error = %e, "page fetch failed");
                self.pagination.set_current(from);
                self.state = FetchState::Failed(e.to_string());
                Err(e)
            }
        }
    }
}
