use crate::branches::resolve_branches;
use crate::error::{GrabError, Result};
use crate::forge::{Forge, PageLinks};
use crate::types::{PageFetch, RemoteRepo, RepoRecord, SearchMode, SearchQuery, TotalHint};

/// Fetch one page of results for `query` and enrich every item with its
/// branch list. Any listing failure discards the whole page.
pub async fn fetch_page(forge: &dyn Forge, query: &SearchQuery, page: u32) -> Result<PageFetch> {
    let token = query.token.as_deref();

    let (repos, hint) = match &query.mode {
        SearchMode::ByOwner { owner } => {
            let listing = forge
                .list_owner_repos(owner, page, query.per_page, token)
                .await
                .map_err(|e| GrabError::Search(e.to_string()))?;
            (listing.repos, owner_hint(page, &listing.links))
        }
        SearchMode::ByLanguage {
            language,
            sort,
            order,
        } => {
            let search = forge
                .search_repos(language, *sort, *order, page, query.per_page, token)
                .await
                .map_err(|e| GrabError::Search(e.to_string()))?;
            (search.repos, TotalHint::Items(search.total_count))
        }
    };

    tracing::debug!(page, count = repos.len(), ?hint, "fetched page, resolving branches");

    Ok(PageFetch {
        records: enrich(forge, repos, token).await,
        hint,
    })
}

// One branch lookup per item, in order. The platform has no batch endpoint.
async fn enrich(forge: &dyn Forge, repos: Vec<RemoteRepo>, token: Option<&str>) -> Vec<RepoRecord> {
    let mut records = Vec::with_capacity(repos.len());
    for repo in repos {
        let branches = resolve_branches(forge, &repo.owner, &repo.name, token).await;
        records.push(RepoRecord::new(repo, branches));
    }
    records
}

fn owner_hint(page: u32, links: &PageLinks) -> TotalHint {
    match links.last {
        Some(last) => TotalHint::Pages(last.max(page)),
        None if links.present && links.next.is_none() => TotalHint::Pages(page),
        None => TotalHint::Unknown,
    }
}
