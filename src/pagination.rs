use crate::types::{TotalHint, DEFAULT_PER_PAGE};

/// Current page and the running estimate of how many pages exist.
///
/// Language searches carry an exact item count. Owner listings usually do not,
/// so the page count is inferred online: a short page is the last one, a full
/// page implies at least one more. The estimate is revised after every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationTracker {
    current_page: u32,
    total_pages: u32,
    page_size: u32,
    // Set once a page is known to be the last; caps later estimates.
    last_known: Option<u32>,
}

impl PaginationTracker {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            page_size: if page_size == 0 {
                DEFAULT_PER_PAGE
            } else {
                page_size
            },
            last_known: None,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    #[cfg(test)]
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    #[cfg(test)]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Revise the page count after `page` was fetched with `fetched` records.
    pub fn record_fetch(&mut self, page: u32, fetched: usize, hint: TotalHint) {
        let page_size = self.page_size as usize;

        let estimate = if fetched == 0 {
            1
        } else {
            match hint {
                TotalHint::Items(total) => {
                    let pages = total.div_ceil(u64::from(self.page_size));
                    u32::try_from(pages).unwrap_or(u32::MAX)
                }
                TotalHint::Pages(pages) => pages,
                TotalHint::Unknown if fetched < page_size => {
                    self.last_known = Some(page);
                    page
                }
                TotalHint::Unknown => page.saturating_add(1),
            }
        };

        let estimate = match (hint, self.last_known) {
            (TotalHint::Unknown, Some(last)) => estimate.min(last),
            _ => estimate,
        };

        self.total_pages = estimate.max(1);
        tracing::debug!(page, fetched, ?hint, total_pages = self.total_pages, "pagination updated");
    }

    pub fn set_current(&mut self, page: u32) {
        self.current_page = page.max(1);
    }

    pub fn can_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn can_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Move back one page. No-op on the first page. Always possible from any
    /// later page, even one past the current estimate.
    pub fn prev(&mut self) -> bool {
        if !self.can_prev() {
            return false;
        }
        self.current_page -= 1;
        true
    }

    /// Move forward one page. No-op on the last known page.
    pub fn next(&mut self) -> bool {
        if !self.can_next() {
            return false;
        }
        self.current_page += 1;
        true
    }

    /// The count never reads lower than the page being shown, which happens
    /// when a page past the first comes back empty.
    pub fn label(&self) -> String {
        format!(
            "Page {} of {}",
            self.current_page,
            self.total_pages.max(self.current_page)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_count_gives_exact_pages() {
        for n in 1..=7u32 {
            for r in 1..=40u64 {
                let mut t = PaginationTracker::new(n);
                t.record_fetch(1, n.min(r as u32) as usize, TotalHint::Items(r));
                let expected = ((r + u64::from(n) - 1) / u64::from(n)) as u32;
                assert_eq!(t.total_pages(), expected, "r={} n={}", r, n);
            }
        }
    }

    #[test]
    fn language_scenario_five_results_two_per_page() {
        let mut t = PaginationTracker::new(2);
        t.record_fetch(1, 2, TotalHint::Items(5));
        assert_eq!(t.total_pages(), 3);
        assert!(t.can_next());
    }

    #[test]
    fn owner_full_page_assumes_another() {
        let mut t = PaginationTracker::new(2);
        t.record_fetch(1, 2, TotalHint::Unknown);
        assert_eq!(t.total_pages(), 2);
        assert!(t.can_next());
    }

    #[test]
    fn owner_scenario_short_second_page_is_last() {
        let mut t = PaginationTracker::new(2);
        t.record_fetch(1, 2, TotalHint::Unknown);
        assert!(t.next());
        t.record_fetch(2, 1, TotalHint::Unknown);
        assert_eq!(t.total_pages(), 2);
        assert!(!t.can_next());
    }

    #[test]
    fn owner_estimate_never_grows_after_short_page() {
        let mut t = PaginationTracker::new(3);
        t.record_fetch(1, 3, TotalHint::Unknown);
        t.record_fetch(2, 3, TotalHint::Unknown);
        t.record_fetch(3, 1, TotalHint::Unknown);
        assert_eq!(t.total_pages(), 3);

        // A later full page must not reopen the tail.
        t.record_fetch(3, 3, TotalHint::Unknown);
        assert_eq!(t.total_pages(), 3);
    }

    #[test]
    fn empty_page_means_single_page() {
        let mut t = PaginationTracker::new(10);
        t.record_fetch(1, 0, TotalHint::Items(0));
        assert_eq!(t.total_pages(), 1);

        let mut t = PaginationTracker::new(10);
        t.record_fetch(1, 0, TotalHint::Items(250));
        assert_eq!(t.total_pages(), 1);

        let mut t = PaginationTracker::new(10);
        t.record_fetch(1, 0, TotalHint::Unknown);
        assert_eq!(t.total_pages(), 1);
    }

    #[test]
    fn authoritative_page_count_is_adopted() {
        let mut t = PaginationTracker::new(30);
        t.record_fetch(1, 30, TotalHint::Pages(4));
        assert_eq!(t.total_pages(), 4);
    }

    #[test]
    fn zero_page_size_uses_default() {
        let t = PaginationTracker::new(0);
        assert_eq!(t.page_size(), DEFAULT_PER_PAGE);
    }

    #[test]
    fn navigation_is_bounded() {
        let mut t = PaginationTracker::new(2);
        assert!(!t.prev());
        assert!(!t.next());

        t.record_fetch(1, 2, TotalHint::Items(4));
        assert!(t.next());
        assert_eq!(t.current_page(), 2);
        assert!(!t.next());
        assert_eq!(t.current_page(), 2);
        assert!(t.prev());
        assert!(!t.prev());
        assert_eq!(t.current_page(), 1);
    }

    #[test]
    fn prev_works_past_the_estimate() {
        let mut t = PaginationTracker::new(2);
        t.record_fetch(1, 2, TotalHint::Unknown);
        assert!(t.next());
        t.record_fetch(2, 0, TotalHint::Unknown);
        assert_eq!(t.total_pages(), 1);
        assert!(!t.can_next());
        assert_eq!(t.label(), "Page 2 of 2");

        assert!(t.prev());
        assert_eq!(t.label(), "Page 1 of 1");
    }

    #[test]
    fn label_shows_position() {
        let mut t = PaginationTracker::new(2);
        t.record_fetch(1, 2, TotalHint::Items(5));
        assert_eq!(t.label(), "Page 1 of 3");
    }
}
