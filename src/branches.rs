use crate::forge::Forge;
use crate::types::FALLBACK_BRANCH;

/// Resolve a repository's branch names.
///
/// Never fails: any transport or decode error is logged and replaced with
/// `["main"]` so one repository cannot abort the enrichment of a whole page.
pub async fn resolve_branches(
    forge: &dyn Forge,
    owner: &str,
    repo: &str,
    token: Option<&str>,
) -> Vec<String> {
    match forge.list_branches(owner, repo, token).await {
        Ok(branches) if !branches.is_empty() => branches,
        Ok(_) => {
            tracing::debug!(owner, repo, "repository has no branches, using fallback");
            vec![FALLBACK_BRANCH.to_string()]
        }
        Err(e) => {
            tracing::warn!(owner, repo, error = %e, "branch lookup failed, using fallback");
            vec![FALLBACK_BRANCH.to_string()]
        }
    }
}
