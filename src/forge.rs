use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RemoteRepo, SortKey, SortOrder};

/// Pagination links parsed from an owner listing's `Link` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageLinks {
    /// Whether the response carried a `Link` header at all.
    pub present: bool,
    pub next: Option<u32>,
    pub last: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct OwnerPage {
    pub repos: Vec<RemoteRepo>,
    pub links: PageLinks,
}

#[derive(Debug, Clone)]
pub struct SearchPage {
    pub total_count: u64,
    pub repos: Vec<RemoteRepo>,
}

/// Transport to a hosted git platform. Every call attaches `token` when given.
#[async_trait]
pub trait Forge: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    async fn list_owner_repos(
        &self,
        owner: &str,
        page: u32,
        per_page: u32,
        token: Option<&str>,
    ) -> Result<OwnerPage>;

    #[allow(clippy::too_many_arguments)]
    async fn search_repos(
        &self,
        language: &str,
        sort: SortKey,
        order: SortOrder,
        page: u32,
        per_page: u32,
        token: Option<&str>,
    ) -> Result<SearchPage>;

    async fn list_branches(&self, owner: &str, repo: &str, token: Option<&str>)
        -> Result<Vec<String>>;
}
