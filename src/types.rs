use serde::Deserialize;
use std::fmt;

use crate::error::{GrabError, Result};

/// Branch used when a repository's branch list cannot be resolved.
pub const FALLBACK_BRANCH: &str = "main";

pub const DEFAULT_PER_PAGE: u32 = 50;

/// Largest `per_page` the GitHub API honours.
pub const MAX_PER_PAGE: u32 = 100;

pub const DEFAULT_LANGUAGE: &str = "Verilog";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Stars,
    Forks,
    Updated,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Stars, SortKey::Forks, SortKey::Updated];

    pub fn as_api_str(&self) -> &'static str {
        match self {
            SortKey::Stars => "stars",
            SortKey::Forks => "forks",
            SortKey::Updated => "updated",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            SortOrder::Desc => "desc",
            SortOrder::Asc => "asc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Desc => SortOrder::Asc,
            SortOrder::Asc => SortOrder::Desc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    ByLanguage {
        language: String,
        sort: SortKey,
        order: SortOrder,
    },
    ByOwner {
        owner: String,
    },
}

/// One search session's parameters. Replaced wholesale by every new search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub mode: SearchMode,
    pub token: Option<String>,
    pub per_page: u32,
}

impl SearchQuery {
    /// Language search. A blank language falls back to [`DEFAULT_LANGUAGE`].
    pub fn by_language(
        language: &str,
        sort: SortKey,
        order: SortOrder,
        per_page: u32,
        token: Option<String>,
    ) -> Self {
        let language = match language.trim() {
            "" => DEFAULT_LANGUAGE.to_string(),
            lang => lang.to_string(),
        };
        Self {
            mode: SearchMode::ByLanguage {
                language,
                sort,
                order,
            },
            token,
            per_page: clamp_page_size(per_page),
        }
    }

    pub fn by_owner(owner: &str, per_page: u32, token: Option<String>) -> Result<Self> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(GrabError::InvalidQuery("owner name is required".into()));
        }
        Ok(Self {
            mode: SearchMode::ByOwner {
                owner: owner.to_string(),
            },
            token,
            per_page: clamp_page_size(per_page),
        })
    }

    pub fn describe(&self) -> String {
        match &self.mode {
            SearchMode::ByLanguage {
                language,
                sort,
                order,
            } => format!("language:{} by {} {}", language, sort, order),
            SearchMode::ByOwner { owner } => format!("repos of {}", owner),
        }
    }
}

/// Parse a user-entered page size. Zero or non-numeric input falls back to
/// [`DEFAULT_PER_PAGE`]; anything above [`MAX_PER_PAGE`] is clamped.
pub fn parse_page_size(input: &str) -> u32 {
    match input.trim().parse::<u32>() {
        Ok(0) | Err(_) => DEFAULT_PER_PAGE,
        Ok(n) => n.min(MAX_PER_PAGE),
    }
}

fn clamp_page_size(n: u32) -> u32 {
    match n {
        0 => DEFAULT_PER_PAGE,
        n => n.min(MAX_PER_PAGE),
    }
}

/// Repository identity as reported by the platform, before branch enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    pub name: String,
    pub owner: String,
    pub stars: u64,
    pub html_url: String,
}

/// One repository's cached state, owned by the page cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRecord {
    pub name: String,
    pub owner: String,
    pub stars: u64,
    pub url: String,
    pub branches: Vec<String>,
    pub selected: bool,
    pub chosen_branch: String,
}

impl RepoRecord {
    pub fn new(remote: RemoteRepo, branches: Vec<String>) -> Self {
        let branches = if branches.is_empty() {
            vec![FALLBACK_BRANCH.to_string()]
        } else {
            branches
        };
        let chosen_branch = branches[0].clone();
        Self {
            name: remote.name,
            owner: remote.owner,
            stars: remote.stars,
            url: remote.html_url,
            branches,
            selected: false,
            chosen_branch,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Directory name this repository is cloned into: `<owner>-<name>` with
    /// any `.git` suffix removed.
    pub fn target_dir_name(&self) -> String {
        let name = self.name.strip_suffix(".git").unwrap_or(&self.name);
        format!("{}-{}", self.owner, name)
    }
}

/// Stable address of a cached record: its page and position on that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub page: u32,
    pub index: usize,
}

/// What the platform told us about the size of the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalHint {
    /// Total matching items (language search `total_count`).
    Items(u64),
    /// Authoritative page count (owner listing `Link` header).
    Pages(u32),
    Unknown,
}

#[derive(Debug, Clone)]
pub struct PageFetch {
    pub records: Vec<RepoRecord>,
    pub hint: TotalHint,
}

/// Terminal result of one clone task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    Succeeded(String),
    Skipped(String),
    Failed(String, String),
}

impl fmt::Display for CloneOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloneOutcome::Succeeded(repo) => write!(f, "✓ {}", repo),
            CloneOutcome::Skipped(repo) => write!(f, "⊘ {} (already exists)", repo),
            CloneOutcome::Failed(repo, msg) => write!(f, "✗ {}: {}", repo, msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneEvent {
    Progress {
        outcome: CloneOutcome,
        finished: usize,
        total: usize,
    },
    AllDone(CloneReport),
}

/// Aggregate result of a clone batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneReport {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<(String, String)>,
}

impl CloneReport {
    pub fn record(&mut self, outcome: &CloneOutcome) {
        match outcome {
            CloneOutcome::Succeeded(_) => self.succeeded += 1,
            CloneOutcome::Skipped(_) => self.skipped += 1,
            CloneOutcome::Failed(repo, msg) => self.failed.push((repo.clone(), msg.clone())),
        }
    }

    pub fn finished(&self) -> usize {
        self.succeeded + self.skipped + self.failed.len()
    }
}
