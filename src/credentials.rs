use std::fmt;
use thiserror::Error;

pub const TOKEN_VARIABLE: &str = "GITHUB_TOKEN";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("missing GITHUB_TOKEN; export it or put it in a .env file")]
    Missing,
}

/// Personal access token handed to the GitHub client.
#[derive(Clone, PartialEq, Eq)]
pub struct GitHubToken(String);

impl GitHubToken {
    /// Reads the token from the environment, after loading `.env` when there is one.
    pub fn from_env() -> Result<Self, CredentialError> {
        dotenv::dotenv().ok();
        Self::from_value(std::env::var(TOKEN_VARIABLE).ok())
    }

    pub fn from_value(value: Option<String>) -> Result<Self, CredentialError> {
        match value {
            Some(token) if !token.trim().is_empty() => Ok(GitHubToken(token.trim().to_string())),
            _ => Err(CredentialError::Missing),
        }
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for GitHubToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GitHubToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_or_absent_token_is_missing() {
        assert_eq!(GitHubToken::from_value(None), Err(CredentialError::Missing));
        assert_eq!(
            GitHubToken::from_value(Some("  \n".to_string())),
            Err(CredentialError::Missing)
        );
    }

    #[test]
    fn token_is_trimmed() {
        let token = GitHubToken::from_value(Some(" ghp_abc\n".to_string())).unwrap();
        assert_eq!(token.secret(), "ghp_abc");
    }

    #[test]
    fn debug_hides_the_secret() {
        let token = GitHubToken::from_value(Some("ghp_abc".to_string())).unwrap();
        assert!(!format!("{:?}", token).contains("ghp_abc"));
    }
}
