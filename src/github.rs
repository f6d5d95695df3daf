use crate::credentials::GitHubToken;
use crate::fetcher::{Fetched, PageError, PageRequest, PageSource, Paginator, Termination};
use crate::pulls::PullRequest;
use crate::target::Target;
use http::header::USER_AGENT;
use indicatif::ProgressBar;
use log::{info, warn};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to fetch repositories of {login}: {reason}")]
    Repositories { login: String, reason: PageError },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwnedRepository {
    pub name: String,
}

/// Where pull requests and repository listings come from.
pub trait Forge {
    type Pulls<'a>: PageSource<Item = PullRequest>
    where
        Self: 'a;
    type Repositories<'a>: PageSource<Item = OwnedRepository>
    where
        Self: 'a;

    fn closed_pulls(&self, owner: &str, repo: &str) -> Self::Pulls<'_>;

    fn repositories(&self, login: &str) -> Self::Repositories<'_>;
}

pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    pub fn new(token: &GitHubToken) -> octocrab::Result<Self> {
        Self::with_base_uri(token, None)
    }

    /// `base_uri` defaults to https://api.github.com.
    pub(crate) fn with_base_uri(
        token: &GitHubToken,
        base_uri: Option<&str>,
    ) -> octocrab::Result<Self> {
        let mut builder = Octocrab::builder()
            .personal_token(token.secret().to_string())
            .add_header(USER_AGENT, "prfetch".to_string());
        // One page request must stay one HTTP request.
        builder.add_retry_config(RetryConfig::None);
        let builder = match base_uri {
            Some(uri) => builder.base_uri(uri)?,
            None => builder,
        };
        Ok(GitHubClient {
            octocrab: builder.build()?,
        })
    }
}

impl Forge for GitHubClient {
    type Pulls<'a> = ClosedPulls<'a> where Self: 'a;
    type Repositories<'a> = OwnedRepositories<'a> where Self: 'a;

    fn closed_pulls(&self, owner: &str, repo: &str) -> ClosedPulls<'_> {
        ClosedPulls {
            octocrab: &self.octocrab,
            resource: format!("{}/{}", owner, repo),
        }
    }

    fn repositories(&self, login: &str) -> OwnedRepositories<'_> {
        OwnedRepositories {
            octocrab: &self.octocrab,
            login: login.to_string(),
        }
    }
}

#[derive(Serialize)]
struct PageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
    per_page: u8,
    page: u32,
}

/// octocrab appends a backtrace to most error messages; keep the first line only.
fn headline(error: &octocrab::Error) -> String {
    error.to_string().lines().next().unwrap_or_default().trim().to_string()
}

fn page_error(error: octocrab::Error) -> PageError {
    match error {
        octocrab::Error::GitHub { source, .. } => PageError::Rejected(source.message),
        // Non-success status whose body is not a GitHub error document, or a body
        // that is not the expected JSON. The server did answer.
        octocrab::Error::Serde { .. } | octocrab::Error::Json { .. } => {
            PageError::Rejected(headline(&error))
        }
        other => PageError::Transport(headline(&other)),
    }
}

/// `GET /repos/{owner}/{repo}/pulls?state=closed`
pub struct ClosedPulls<'a> {
    octocrab: &'a Octocrab,
    /// owner/repo
    resource: String,
}

impl PageSource for ClosedPulls<'_> {
    type Item = PullRequest;

    fn resource(&self) -> &str {
        &self.resource
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<PullRequest>, PageError> {
        let params = PageParams {
            state: Some("closed"),
            per_page: request.per_page,
            page: request.page,
        };
        self.octocrab
            .get(format!("/repos/{}/pulls", self.resource), Some(&params))
            .await
            .map_err(page_error)
    }
}

/// `GET /users/{login}/repos`
pub struct OwnedRepositories<'a> {
    octocrab: &'a Octocrab,
    login: String,
}

impl PageSource for OwnedRepositories<'_> {
    type Item = OwnedRepository;

    fn resource(&self) -> &str {
        &self.login
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<OwnedRepository>, PageError> {
        let params = PageParams {
            state: None,
            per_page: request.per_page,
            page: request.page,
        };
        self.octocrab
            .get(format!("/users/{}/repos", self.login), Some(&params))
            .await
            .map_err(page_error)
    }
}

#[derive(Debug, Default)]
pub struct Collection {
    pub pulls: Vec<PullRequest>,
    /// Collections whose fetch stopped on a failure or on the page ceiling.
    pub truncated: Vec<String>,
}

impl Collection {
    fn note<T>(&mut self, resource: &str, fetched: &Fetched<T>) {
        if fetched.possibly_truncated() {
            self.truncated.push(resource.to_string());
        }
    }
}

/// Closed pull requests of the target, one repository after the other.
pub async fn collect<F: Forge>(
    forge: &F,
    target: &Target,
    paginator: &Paginator,
) -> Result<Collection, CollectError> {
    let mut collection = Collection::default();

    match target {
        Target::Repository { owner, name } => {
            let source = forge.closed_pulls(owner, name);
            let fetched = paginator.fetch_all(&source).await;
            collection.note(source.resource(), &fetched);
            collection.pulls.extend(tag(fetched.items, name));
        }
        Target::Account { login } => {
            let listing = forge.repositories(login);
            let repos = paginator.fetch_all(&listing).await;
            if let (true, Termination::Failed { reason, .. }) =
                (repos.items.is_empty(), &repos.termination)
            {
                return Err(CollectError::Repositories {
                    login: login.clone(),
                    reason: reason.clone(),
                });
            }
            collection.note(&format!("{} (repositories)", login), &repos);
            info!("{} repositories owned by {}", repos.items.len(), login);

            let pb = ProgressBar::new(repos.items.len() as u64);
            for repo in repos.items {
                let source = forge.closed_pulls(login, &repo.name);
                let fetched = paginator.fetch_all(&source).await;
                info!("{} -- {} closed pull requests", source.resource(), fetched.items.len());
                collection.note(source.resource(), &fetched);
                collection.pulls.extend(tag(fetched.items, &repo.name));
                pb.inc(1);
            }
            pb.finish();
        }
    }

    if !collection.truncated.is_empty() {
        warn!(
            "Results may be incomplete for: {}",
            collection.truncated.join(", ")
        );
    }
    Ok(collection)
}

fn tag(pulls: Vec<PullRequest>, repository: &str) -> impl Iterator<Item = PullRequest> + '_ {
    pulls.into_iter().map(move |mut pr| {
        pr.repository = repository.to_string();
        pr
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulls::tests::pull;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Pages<T> = Vec<Result<Vec<T>, PageError>>;

    struct FakePages<'a, T> {
        resource: String,
        pages: &'a [Result<Vec<T>, PageError>],
        log: &'a Mutex<Vec<String>>,
    }

    impl<T: Clone> PageSource for FakePages<'_, T> {
        type Item = T;

        fn resource(&self) -> &str {
            &self.resource
        }

        async fn fetch_page(&self, request: PageRequest) -> Result<Vec<T>, PageError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}#{}", self.resource, request.page));
            self.pages
                .get(request.page as usize - 1)
                .cloned()
                .unwrap_or(Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct FakeForge {
        repositories: Pages<OwnedRepository>,
        pulls: HashMap<String, Pages<PullRequest>>,
        log: Mutex<Vec<String>>,
    }

    impl Forge for FakeForge {
        type Pulls<'a> = FakePages<'a, PullRequest> where Self: 'a;
        type Repositories<'a> = FakePages<'a, OwnedRepository> where Self: 'a;

        fn closed_pulls(&self, owner: &str, repo: &str) -> FakePages<'_, PullRequest> {
            let resource = format!("{}/{}", owner, repo);
            let pages = self.pulls.get(&resource).map(Vec::as_slice).unwrap_or(&[]);
            FakePages {
                resource,
                pages,
                log: &self.log,
            }
        }

        fn repositories(&self, login: &str) -> FakePages<'_, OwnedRepository> {
            FakePages {
                resource: login.to_string(),
                pages: &self.repositories,
                log: &self.log,
            }
        }
    }

    fn owned(name: &str) -> OwnedRepository {
        OwnedRepository {
            name: name.to_string(),
        }
    }

    fn account(login: &str) -> Target {
        Target::Account {
            login: login.to_string(),
        }
    }

    #[tokio::test]
    async fn single_repository_pulls_are_tagged() {
        let mut forge = FakeForge::default();
        forge.pulls.insert(
            "octo/app".to_string(),
            vec![Ok(vec![pull(1, "a", None, None), pull(2, "b", None, None)])],
        );
        let target = Target::parse("octo/app").unwrap();

        let collection = collect(&forge, &target, &Paginator::default()).await.unwrap();

        assert_eq!(collection.pulls.len(), 2);
        assert!(collection.pulls.iter().all(|pr| pr.repository == "app"));
        assert!(collection.truncated.is_empty());
    }

    #[tokio::test]
    async fn account_walks_every_repository_in_order() {
        let mut forge = FakeForge::default();
        forge.repositories = vec![Ok(vec![owned("one"), owned("two")])];
        forge
            .pulls
            .insert("octo/one".to_string(), vec![Ok(vec![pull(1, "a", None, None)])]);
        forge
            .pulls
            .insert("octo/two".to_string(), vec![Ok(vec![pull(7, "b", None, None)])]);

        let collection = collect(&forge, &account("octo"), &Paginator::default())
            .await
            .unwrap();

        let tagged: Vec<(String, u64)> = collection
            .pulls
            .iter()
            .map(|pr| (pr.repository.clone(), pr.number))
            .collect();
        assert_eq!(tagged, vec![("one".to_string(), 1), ("two".to_string(), 7)]);
        assert_eq!(
            *forge.log.lock().unwrap(),
            vec!["octo#1", "octo#2", "octo/one#1", "octo/one#2", "octo/two#1", "octo/two#2"]
        );
    }

    #[tokio::test]
    async fn failed_listing_is_an_error() {
        let mut forge = FakeForge::default();
        forge.repositories = vec![Err(PageError::Rejected("Not Found".to_string()))];

        let result = collect(&forge, &account("nobody"), &Paginator::default()).await;

        assert!(matches!(result, Err(CollectError::Repositories { .. })));
    }

    #[tokio::test]
    async fn truncated_repositories_are_reported() {
        let mut forge = FakeForge::default();
        forge.repositories = vec![Ok(vec![owned("big"), owned("broken"), owned("small")])];
        forge.pulls.insert(
            "octo/big".to_string(),
            vec![
                Ok(vec![pull(1, "a", None, None)]),
                Ok(vec![pull(2, "a", None, None)]),
            ],
        );
        forge.pulls.insert(
            "octo/broken".to_string(),
            vec![Err(PageError::Transport("reset".to_string()))],
        );
        let paginator = Paginator::new(2, 1).unwrap();

        let collection = collect(&forge, &account("octo"), &paginator).await.unwrap();

        assert_eq!(collection.pulls.len(), 2);
        assert_eq!(collection.truncated, vec!["octo/big", "octo/broken"]);
    }

    mod over_http {
        use super::*;
        use crate::credentials::GitHubToken;
        use pretty_assertions::assert_eq;
        use serde_json::{json, Value};
        use wiremock::matchers::{method, path, query_param, query_param_is_missing};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn client(server: &MockServer) -> GitHubClient {
            let token = GitHubToken::from_value(Some("ghp_test".to_string())).unwrap();
            GitHubClient::with_base_uri(&token, Some(&server.uri())).unwrap()
        }

        fn pulls_page(first: u64, count: u64) -> Value {
            (first..first + count)
                .map(|number| {
                    json!({
                        "number": number,
                        "title": format!("Change {}", number),
                        "user": {"login": "octocat", "avatar_url": "https://avatars.example/1"},
                        "created_at": "2024-01-01T00:00:00Z",
                        "merged_at": null,
                        "closed_at": "2024-01-02T00:00:00Z",
                        "html_url": format!("https://github.com/o/r/pull/{}", number)
                    })
                })
                .collect()
        }

        async fn hits(server: &MockServer) -> usize {
            server.received_requests().await.unwrap().len()
        }

        #[tokio::test]
        async fn closed_pulls_stop_at_not_found_page() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/repos/o/r/pulls"))
                .and(query_param("state", "closed"))
                .and(query_param("per_page", "100"))
                .and(query_param("page", "1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(pulls_page(1, 100)))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/repos/o/r/pulls"))
                .and(query_param("page", "2"))
                .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                    "message": "Not Found",
                    "documentation_url": "https://docs.github.com/rest"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let client = client(&server);
            let fetched = Paginator::default()
                .fetch_all(&client.closed_pulls("o", "r"))
                .await;

            assert_eq!(fetched.items.len(), 100);
            assert_eq!(fetched.items[0].number, 1);
            assert_eq!(fetched.requests, 2);
            assert_eq!(
                fetched.termination,
                Termination::Failed {
                    page: 2,
                    reason: PageError::Rejected("Not Found".to_string()),
                }
            );
            assert_eq!(hits(&server).await, 2);
        }

        #[tokio::test]
        async fn server_error_is_requested_once() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
                .mount(&server)
                .await;

            let client = client(&server);
            let fetched = Paginator::default()
                .fetch_all(&client.closed_pulls("o", "r"))
                .await;

            assert_eq!(hits(&server).await, 1);
            assert_eq!(fetched.requests, 1);
            match fetched.termination {
                Termination::Failed {
                    page: 1,
                    reason: PageError::Rejected(message),
                } => assert!(!message.is_empty() && !message.contains('\n'), "{}", message),
                other => panic!("unexpected termination {:?}", other),
            }
        }

        #[tokio::test]
        async fn owned_repositories_are_paged_without_state() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/users/octo/repos"))
                .and(query_param_is_missing("state"))
                .and(query_param("per_page", "30"))
                .and(query_param("page", "1"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!([{"name": "one", "id": 1}, {"name": "two", "id": 2}])),
                )
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/users/octo/repos"))
                .and(query_param("page", "2"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .expect(1)
                .mount(&server)
                .await;

            let client = client(&server);
            let fetched = Paginator::new(5, 30)
                .unwrap()
                .fetch_all(&client.repositories("octo"))
                .await;

            assert_eq!(fetched.items, vec![owned("one"), owned("two")]);
            assert_eq!(fetched.termination, Termination::Exhausted { page: 2 });
        }
    }
}
