use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{GrabError, Result};
use crate::forge::{Forge, OwnerPage, PageLinks, SearchPage};
use crate::types::{RemoteRepo, SortKey, SortOrder, MAX_PER_PAGE};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub struct GitHub {
    client: Client,
    api_url: String,
}

impl std::fmt::Debug for GitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHub")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl GitHub {
    pub fn new(api_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("grab")
            .build()
            .map_err(|e| GrabError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: Option<&str>,
    ) -> Result<Response> {
        tracing::debug!(url, ?query, "GET");

        let mut request = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| GrabError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(GrabError::Status { status, body });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| GrabError::Decode(e.to_string()))
    }
}

// GitHub API response types

#[derive(Deserialize)]
struct GhRepo {
    name: String,
    owner: GhOwner,
    #[serde(default)]
    stargazers_count: u64,
    html_url: String,
}

#[derive(Deserialize)]
struct GhOwner {
    login: String,
}

#[derive(Deserialize)]
struct GhSearch {
    total_count: u64,
    items: Vec<GhRepo>,
}

#[derive(Deserialize)]
struct GhBranch {
    name: String,
}

impl From<GhRepo> for RemoteRepo {
    fn from(repo: GhRepo) -> Self {
        RemoteRepo {
            name: repo.name,
            owner: repo.owner.login,
            stars: repo.stargazers_count,
            html_url: repo.html_url,
        }
    }
}

#[async_trait]
impl Forge for GitHub {
    fn name(&self) -> &str {
        "GitHub"
    }

    async fn list_owner_repos(
        &self,
        owner: &str,
        page: u32,
        per_page: u32,
        token: Option<&str>,
    ) -> Result<OwnerPage> {
        let url = self.api_url(&format!("/users/{}/repos", urlencoding::encode(owner)));
        let query = [("page", page.to_string()), ("per_page", per_page.to_string())];
        let response = self.get(&url, &query, token).await?;

        let links = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(parse_link_header)
            .unwrap_or_default();

        let repos: Vec<GhRepo> = Self::decode(response).await?;

        Ok(OwnerPage {
            repos: repos.into_iter().map(RemoteRepo::from).collect(),
            links,
        })
    }

    async fn search_repos(
        &self,
        language: &str,
        sort: SortKey,
        order: SortOrder,
        page: u32,
        per_page: u32,
        token: Option<&str>,
    ) -> Result<SearchPage> {
        let url = self.api_url("/search/repositories");
        let query = [
            ("q", language_qualifier(language)),
            ("sort", sort.as_api_str().to_string()),
            ("order", order.as_api_str().to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        let response = self.get(&url, &query, token).await?;
        let search: GhSearch = Self::decode(response).await?;

        Ok(SearchPage {
            total_count: search.total_count,
            repos: search.items.into_iter().map(RemoteRepo::from).collect(),
        })
    }

    async fn list_branches(
        &self,
        owner: &str,
        repo: &str,
        token: Option<&str>,
    ) -> Result<Vec<String>> {
        let url = self.api_url(&format!(
            "/repos/{}/{}/branches",
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        ));
        let query = [("per_page", MAX_PER_PAGE.to_string())];
        let response = self.get(&url, &query, token).await?;
        let branches: Vec<GhBranch> = Self::decode(response).await?;

        Ok(branches.into_iter().map(|b| b.name).collect())
    }
}

/// Search qualifier for `language`. Multi-word names must be quoted or the
/// words after the first become free-text terms.
fn language_qualifier(language: &str) -> String {
    let language = language.trim();
    if language.contains(char::is_whitespace) {
        format!("language:\"{}\"", language.replace('"', ""))
    } else {
        format!("language:{}", language)
    }
}

/// Parse a `Link` header such as
/// `<https://api.github.com/user/1/repos?page=2>; rel="next", <...?page=5>; rel="last"`.
fn parse_link_header(value: &str) -> PageLinks {
    let mut links = PageLinks {
        present: true,
        ..PageLinks::default()
    };

    for entry in value.split(',') {
        let mut parts = entry.split(';');
        let Some(target) = parts.next() else {
            continue;
        };
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let page = page_param(target);

        for param in parts {
            match param.trim() {
                r#"rel="next""# => links.next = page,
                r#"rel="last""# => links.last = page,
                _ => {}
            }
        }
    }

    links
}

fn page_param(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "page" {
            value.parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo_json(owner: &str, name: &str, stars: u64) -> serde_json::Value {
        json!({
            "name": name,
            "owner": { "login": owner, "id": 1 },
            "stargazers_count": stars,
            "html_url": format!("https://github.com/{}/{}", owner, name),
            "fork": false,
        })
    }

    #[test]
    fn link_header_with_next_and_last() {
        let links = parse_link_header(
            r#"<https://api.github.com/user/9/repos?per_page=2&page=2>; rel="next", <https://api.github.com/user/9/repos?per_page=2&page=7>; rel="last""#,
        );
        assert!(links.present);
        assert_eq!(links.next, Some(2));
        assert_eq!(links.last, Some(7));
    }

    #[test]
    fn link_header_on_last_page() {
        let links = parse_link_header(
            r#"<https://api.github.com/user/9/repos?page=1>; rel="prev", <https://api.github.com/user/9/repos?page=1>; rel="first""#,
        );
        assert!(links.present);
        assert_eq!(links.next, None);
        assert_eq!(links.last, None);
    }

    #[test]
    fn page_param_ignores_per_page() {
        assert_eq!(page_param("https://x/y?per_page=30&page=4"), Some(4));
        assert_eq!(page_param("https://x/y?per_page=30"), None);
        assert_eq!(page_param("https://x/y"), None);
    }

    #[tokio::test]
    async fn owner_listing_sends_paging_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/alice/repos"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "2"))
            .and(header("Authorization", "token s3cret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([repo_json("alice", "one", 3)]))
                    .insert_header(
                        "Link",
                        r#"<https://api.github.com/user/1/repos?page=1>; rel="prev""#,
                    ),
            )
            .mount(&server)
            .await;

        let github = GitHub::new(&server.uri()).unwrap();
        let page = github
            .list_owner_repos("alice", 2, 2, Some("s3cret"))
            .await
            .unwrap();

        assert_eq!(page.repos.len(), 1);
        assert_eq!(page.repos[0].owner, "alice");
        assert_eq!(page.repos[0].stars, 3);
        assert!(page.links.present);
        assert_eq!(page.links.next, None);
    }

    #[tokio::test]
    async fn owner_listing_without_link_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/bob/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let github = GitHub::new(&server.uri()).unwrap();
        let page = github.list_owner_repos("bob", 1, 50, None).await.unwrap();

        assert!(page.repos.is_empty());
        assert_eq!(page.links, PageLinks::default());
    }

    #[tokio::test]
    async fn search_reports_total_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("q", "language:Go"))
            .and(query_param("sort", "forks"))
            .and(query_param("order", "asc"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 5,
                "incomplete_results": false,
                "items": [repo_json("a", "x", 10), repo_json("b", "y", 9)],
            })))
            .mount(&server)
            .await;

        let github = GitHub::new(&server.uri()).unwrap();
        let page = github
            .search_repos("Go", SortKey::Forks, SortOrder::Asc, 1, 2, None)
            .await
            .unwrap();

        assert_eq!(page.total_count, 5);
        assert_eq!(page.repos.len(), 2);
        assert_eq!(page.repos[1].html_url, "https://github.com/b/y");
    }

    #[test]
    fn multi_word_language_is_quoted() {
        assert_eq!(language_qualifier("Rust"), "language:Rust");
        assert_eq!(
            language_qualifier("Visual Basic .NET"),
            r#"language:"Visual Basic .NET""#
        );
    }

    #[tokio::test]
    async fn search_sends_quoted_language() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("q", r#"language:"Visual Basic .NET""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "incomplete_results": false,
                "items": [repo_json("a", "vb", 3)],
            })))
            .mount(&server)
            .await;

        let github = GitHub::new(&server.uri()).unwrap();
        let page = github
            .search_repos("Visual Basic .NET", SortKey::Stars, SortOrder::Desc, 1, 10, None)
            .await
            .unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.repos[0].name, "vb");
    }

    #[tokio::test]
    async fn branches_are_listed_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/alice/tool/branches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "main", "protected": true },
                { "name": "dev", "protected": false },
            ])))
            .mount(&server)
            .await;

        let github = GitHub::new(&server.uri()).unwrap();
        let branches = github.list_branches("alice", "tool", None).await.unwrap();

        assert_eq!(branches, vec!["main".to_string(), "dev".to_string()]);
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/ghost/repos"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let github = GitHub::new(&server.uri()).unwrap();
        let err = github
            .list_owner_repos("ghost", 1, 10, None)
            .await
            .unwrap_err();

        match err {
            GrabError::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "Not Found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": "nope" })))
            .mount(&server)
            .await;

        let github = GitHub::new(&server.uri()).unwrap();
        let err = github
            .search_repos("Rust", SortKey::Stars, SortOrder::Desc, 1, 10, None)
            .await
            .unwrap_err();

        assert!(matches!(err, GrabError::Decode(_)));
    }
}
