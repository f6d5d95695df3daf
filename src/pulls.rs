//! Pull request records and how they turn into merged/closed report rows.

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// The fields of a GitHub pull request that the reports use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    /// `None` for deleted accounts.
    pub user: Option<Author>,
    pub created_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub html_url: String,
    /// Filled in by the collector, not by GitHub.
    #[serde(skip)]
    pub repository: String,
}

impl PullRequest {
    pub fn login(&self) -> &str {
        self.user.as_ref().map(|u| u.login.as_str()).unwrap_or("")
    }

    pub fn avatar_url(&self) -> &str {
        self.user.as_ref().map(|u| u.avatar_url.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TimeRange {
    Today,
    Week,
    Month,
    #[default]
    Year,
    #[value(name = "5-years")]
    FiveYears,
    #[value(name = "10-years")]
    TenYears,
}

impl TimeRange {
    pub fn days(self) -> i64 {
        match self {
            TimeRange::Today => 1,
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Year => 365,
            TimeRange::FiveYears => 1825,
            TimeRange::TenYears => 3650,
        }
    }

    /// Oldest instant still inside the range.
    pub fn limit(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    #[serde(rename = "Repository")]
    pub repository: String,
    #[serde(rename = "Number")]
    pub number: u64,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Avatar")]
    pub avatar: String,
}

impl Row {
    fn new(pr: &PullRequest, at: DateTime<Utc>) -> Self {
        Row {
            repository: pr.repository.clone(),
            number: pr.number,
            title: pr.title.clone(),
            author: pr.login().to_string(),
            date: at.format("%Y-%m-%d").to_string(),
            link: pr.html_url.clone(),
            avatar: pr.avatar_url().to_string(),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Classified {
    pub merged: Vec<Row>,
    pub closed: Vec<Row>,
}

impl Classified {
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty() && self.closed.is_empty()
    }
}

/// Sorted, de-duplicated author logins.
pub fn authors(pulls: &[PullRequest]) -> Vec<String> {
    pulls
        .iter()
        .filter_map(|pr| pr.user.as_ref().map(|u| u.login.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Splits pulls into merged and closed rows dated on or after `limit`.
///
/// An empty `only_authors` keeps everybody. A merged pull is closed too and
/// lands in both lists.
pub fn classify(pulls: &[PullRequest], only_authors: &[String], limit: DateTime<Utc>) -> Classified {
    let mut classified = Classified::default();
    for pr in pulls {
        if !only_authors.is_empty() && !only_authors.iter().any(|a| a == pr.login()) {
            continue;
        }
        if let Some(merged_at) = pr.merged_at.filter(|d| *d >= limit) {
            classified.merged.push(Row::new(pr, merged_at));
        }
        if let Some(closed_at) = pr.closed_at.filter(|d| *d >= limit) {
            classified.closed.push(Row::new(pr, closed_at));
        }
    }
    classified
}
