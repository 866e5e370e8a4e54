//! Selection state lives on the cached records themselves, so it survives
//! page switches without any sync step. The UI addresses records by
//! [`RecordKey`] and re-derives its view from the cache after each change.

use crate::cache::PageCache;
use crate::error::{GrabError, Result};
use crate::types::{RecordKey, RepoRecord};

impl PageCache {
    /// Flip one record's selection. Returns the new state, or `None` if the
    /// key does not address a cached record.
    pub fn toggle(&mut self, key: RecordKey) -> Option<bool> {
        let record = self.record_mut(key)?;
        record.selected = !record.selected;
        Some(record.selected)
    }

    /// Choose the branch to clone for one record. The branch must be one of
    /// the record's resolved branches. Returns `Ok(false)` for an unknown key.
    pub fn set_branch(&mut self, key: RecordKey, branch: &str) -> Result<bool> {
        let Some(record) = self.record_mut(key) else {
            return Ok(false);
        };
        if !record.branches.iter().any(|b| b == branch) {
            return Err(GrabError::InvalidBranch {
                repo: record.full_name(),
                branch: branch.to_string(),
            });
        }
        record.chosen_branch = branch.to_string();
        Ok(true)
    }

    /// Toggle the aggregate selection of one page: deselect everything if all
    /// records are selected, otherwise select everything. Returns the state
    /// applied.
    pub fn select_all_on_page(&mut self, page: u32) -> bool {
        let Some(records) = self.get_mut(page) else {
            return false;
        };
        toggle_all(records.iter_mut())
    }

    /// Same as [`PageCache::select_all_on_page`] over every cached page.
    pub fn select_all_loaded(&mut self) -> bool {
        toggle_all(self.iter_mut())
    }

    /// Every selected record across all cached pages, in page order, each
    /// carrying its chosen branch.
    pub fn collect_selected(&self) -> Vec<RepoRecord> {
        self.iter()
            .filter(|(_, record)| record.selected)
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.iter().filter(|(_, record)| record.selected).count()
    }
}

fn toggle_all<'a>(records: impl Iterator<Item = &'a mut RepoRecord>) -> bool {
    let mut records: Vec<_> = records.collect();
    if records.is_empty() {
        return false;
    }
    let target = !records.iter().all(|r| r.selected);
    for record in records.iter_mut() {
        record.selected = target;
    }
    target
}
