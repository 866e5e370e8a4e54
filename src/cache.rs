use std::collections::BTreeMap;

use crate::types::{RecordKey, RepoRecord};

/// Pages fetched for the current search, keyed by page number.
///
/// Pure storage: a hit here must short-circuit any network access in the
/// caller. Records are mutated in place by selection but a populated page is
/// only ever replaced by [`PageCache::invalidate_all`].
#[derive(Debug, Default)]
pub struct PageCache {
    pages: BTreeMap<u32, Vec<RepoRecord>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page: u32) -> Option<&[RepoRecord]> {
        self.pages.get(&page).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, page: u32) -> Option<&mut Vec<RepoRecord>> {
        self.pages.get_mut(&page)
    }

    /// Store a freshly fetched page. Returns false, leaving the cached page
    /// untouched, if `page` is already populated.
    pub fn put(&mut self, page: u32, records: Vec<RepoRecord>) -> bool {
        if self.pages.contains_key(&page) {
            tracing::debug!(page, "page already cached, keeping existing records");
            return false;
        }
        self.pages.insert(page, records);
        true
    }

    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    pub fn invalidate_all(&mut self) {
        self.pages.clear();
    }

    pub fn record(&self, key: RecordKey) -> Option<&RepoRecord> {
        self.pages.get(&key.page)?.get(key.index)
    }

    pub fn record_mut(&mut self, key: RecordKey) -> Option<&mut RepoRecord> {
        self.pages.get_mut(&key.page)?.get_mut(key.index)
    }

    /// Every cached record in page order, then position on the page.
    pub fn iter(&self) -> impl Iterator<Item = (RecordKey, &RepoRecord)> {
        self.pages.iter().flat_map(|(&page, records)| {
            records
                .iter()
                .enumerate()
                .map(move |(index, record)| (RecordKey { page, index }, record))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RepoRecord> {
        self.pages.values_mut().flatten()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemoteRepo;

    fn record(name: &str) -> RepoRecord {
        RepoRecord::new(
            RemoteRepo {
                name: name.to_string(),
                owner: "alice".to_string(),
                stars: 1,
                html_url: format!("https://github.com/alice/{}", name),
            },
            vec!["main".into()],
        )
    }

    #[test]
    fn miss_then_hit() {
        let mut cache = PageCache::new();
        assert!(cache.get(1).is_none());

        assert!(cache.put(1, vec![record("a"), record("b")]));
        assert_eq!(cache.get(1).map(|r| r.len()), Some(2));
        assert!(cache.contains(1));
        assert!(!cache.contains(2));
    }

    #[test]
    fn populated_page_is_not_replaced() {
        let mut cache = PageCache::new();
        cache.put(1, vec![record("a")]);
        cache.record_mut(RecordKey { page: 1, index: 0 }).unwrap().selected = true;

        assert!(!cache.put(1, vec![record("z")]));

        let kept = cache.record(RecordKey { page: 1, index: 0 }).unwrap();
        assert_eq!(kept.name, "a");
        assert!(kept.selected);
    }

    #[test]
    fn invalidate_drops_everything() {
        let mut cache = PageCache::new();
        cache.put(1, vec![record("a")]);
        cache.put(2, vec![record("b")]);

        cache.invalidate_all();

        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_none());
        assert_eq!(cache.iter().count(), 0);
    }

    #[test]
    fn iteration_is_ordered_by_page_then_index() {
        let mut cache = PageCache::new();
        cache.put(3, vec![record("c")]);
        cache.put(1, vec![record("a"), record("b")]);

        let names: Vec<_> = cache.iter().map(|(_, r)| r.name.clone()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let keys: Vec<_> = cache.iter().map(|(k, _)| k).collect();
        assert_eq!(keys[2], RecordKey { page: 3, index: 0 });
    }
}
