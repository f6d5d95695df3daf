// A target is either a single repository (owner/repoName) or a whole account.
// https://github.com/owner/repoName or https://github.com/owner

use reqwest::Url;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("no GitHub URL given")]
    Empty,
    #[error("`{0}` is neither a repository nor an account URL")]
    Unrecognized(String),
    #[error("`{0}` does not point to github.com")]
    ForeignHost(String),
}

const GITHUB_HOST: &str = "github.com";
const GITHUB_WWW_HOST: &str = "www.github.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Repository { owner: String, name: String },
    Account { login: String },
}

impl Target {
    pub fn parse(input: &str) -> Result<Self, TargetError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TargetError::Empty);
        }

        let path = match Url::parse(input) {
            Ok(url) => match url.host_str() {
                Some(GITHUB_HOST) | Some(GITHUB_WWW_HOST) => url.path().to_string(),
                _ => return Err(TargetError::ForeignHost(input.to_string())),
            },
            // No scheme: github.com/owner/repo or owner/repo
            Err(_) => [GITHUB_WWW_HOST, GITHUB_HOST]
                .iter()
                .find_map(|host| input.strip_prefix(host)?.strip_prefix('/'))
                .unwrap_or(input)
                .to_string(),
        };

        let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
        match parts.as_slice() {
            // Logins never contain dots, so `gitlab.com/x` is not mistaken for an owner.
            [owner, ..] if owner.contains('.') => Err(TargetError::Unrecognized(input.to_string())),
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Target::Repository {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            [login] if !login.is_empty() => Ok(Target::Account {
                login: login.to_string(),
            }),
            _ => Err(TargetError::Unrecognized(input.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Repository { owner, name } => write!(f, "{}/{}", owner, name),
            Target::Account { login } => f.write_str(login),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(owner: &str, name: &str) -> Target {
        Target::Repository {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn repository_urls() {
        assert_eq!(
            Target::parse("https://github.com/rust-lang/cargo").unwrap(),
            repo("rust-lang", "cargo")
        );
        assert_eq!(
            Target::parse("https://github.com/rust-lang/cargo/").unwrap(),
            repo("rust-lang", "cargo")
        );
        assert_eq!(
            Target::parse("github.com/rust-lang/cargo").unwrap(),
            repo("rust-lang", "cargo")
        );
        assert_eq!(Target::parse(" rust-lang/cargo ").unwrap(), repo("rust-lang", "cargo"));
    }

    #[test]
    fn account_urls() {
        let account = Target::Account {
            login: "octocat".to_string(),
        };
        assert_eq!(Target::parse("https://github.com/octocat").unwrap(), account);
        assert_eq!(Target::parse("octocat").unwrap(), account);
        assert_eq!(account.to_string(), "octocat");
    }

    #[test]
    fn rejects_other_shapes() {
        assert_eq!(Target::parse("   "), Err(TargetError::Empty));
        assert!(matches!(
            Target::parse("https://github.com/"),
            Err(TargetError::Unrecognized(_))
        ));
        assert!(matches!(
            Target::parse("https://github.com/rust-lang/cargo/pulls"),
            Err(TargetError::Unrecognized(_))
        ));
    }

    #[test]
    fn display_of_repository() {
        assert_eq!(repo("rust-lang", "cargo").to_string(), "rust-lang/cargo");
    }

    #[test]
    fn rejects_other_hosts() {
        assert_eq!(
            Target::parse("https://gitlab.com/a/b"),
            Err(TargetError::ForeignHost("https://gitlab.com/a/b".to_string()))
        );
        assert!(matches!(
            Target::parse("gitlab.com/a"),
            Err(TargetError::Unrecognized(_))
        ));
        assert!(matches!(
            Target::parse("github.company/x"),
            Err(TargetError::Unrecognized(_))
        ));
        assert_eq!(
            Target::parse("https://www.github.com/rust-lang/cargo").unwrap(),
            repo("rust-lang", "cargo")
        );
        assert_eq!(
            Target::parse("www.github.com/octocat").unwrap(),
            Target::Account {
                login: "octocat".to_string()
            }
        );
    }
}
