//! Keyword search against the French company registry
//! (recherche-entreprises.api.gouv.fr).

use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://recherche-entreprises.api.gouv.fr";
pub const MIN_RESULTS: u8 = 5;
pub const MAX_RESULTS: u8 = 50;
pub const DEFAULT_RESULTS: u8 = 10;

#[derive(Debug, Error)]
pub enum CompanyError {
    #[error("company search failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("company registry answered with status {0}")]
    Status(StatusCode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Company {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "SIREN")]
    pub siren: String,
    #[serde(rename = "Created")]
    pub created: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Main activity")]
    pub activity: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Collective agreement")]
    pub collective_agreement: String,
}

pub const HEADER: [&str; 9] = [
    "Name",
    "SIREN",
    "Created",
    "Status",
    "Category",
    "Main activity",
    "Address",
    "Website",
    "Collective agreement",
];

impl Company {
    fn from_result(result: &Map<String, Value>) -> Self {
        let field = |key: &str| match result.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        Company {
            name: field("nom_complet"),
            siren: field("siren"),
            created: field("date_creation"),
            status: field("statut"),
            category: field("categorie_entreprise"),
            activity: field("activite_principale"),
            address: field("adresse"),
            website: field("site_internet"),
            collective_agreement: field("convention_collective_renseignee"),
        }
    }

    pub fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.siren.clone(),
            self.created.clone(),
            self.status.clone(),
            self.category.clone(),
            self.activity.clone(),
            self.address.clone(),
            self.website.clone(),
            self.collective_agreement.clone(),
        ]
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Map<String, Value>>,
}

pub struct Registry {
    client: Client,
    base_url: String,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(DEFAULT_BASE_URL)
    }
}

impl Registry {
    pub fn new(base_url: &str) -> Self {
        Registry {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Companies matching `keyword`; `count` is clamped to what the registry allows.
    pub async fn search(&self, keyword: &str, count: u8) -> Result<Vec<Company>, CompanyError> {
        let count = count.clamp(MIN_RESULTS, MAX_RESULTS);
        debug!("Searching companies for {:?} ({} results)", keyword, count);
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", keyword.to_string()), ("per_page", count.to_string())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CompanyError::Status(response.status()));
        }
        let body: SearchResponse = response.json().await?;
        let companies: Vec<Company> = body.results.iter().map(Company::from_result).collect();
        info!("{} companies found for {:?}", companies.len(), keyword);
        Ok(companies)
    }
}
