use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Identifier;
use crate::error::KiraError;
use crate::http::{self, encode_url_component};

const CROSSREF_BASE: &str = "https://api.crossref.org";

/// Bibliographic summary of a work as reported by Crossref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkCitation {
    pub doi: Identifier,
    pub authors: String,
    pub title: String,
    pub year: i64,
    pub citation: String,
    pub preprints: Vec<Identifier>,
}

pub trait CrossrefClient: Send + Sync {
    fn fetch_citation(&self, doi: &Identifier) -> Result<WorkCitation, KiraError>;
}

#[derive(Clone)]
pub struct CrossrefHttpClient {
    client: Client,
    base_url: String,
}

impl CrossrefHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, KiraError> {
        let client = http::build_client(timeout, KiraError::CrossrefHttp)?;
        Ok(Self {
            client,
            base_url: CROSSREF_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn work_url(&self, doi: &Identifier) -> String {
        format!(
            "{}/works/{}",
            self.base_url.trim_end_matches('/'),
            encode_url_component(doi.as_str())
        )
    }
}

impl CrossrefClient for CrossrefHttpClient {
    fn fetch_citation(&self, doi: &Identifier) -> Result<WorkCitation, KiraError> {
        let url = self.work_url(doi);
        debug!(%url, "crossref lookup");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| KiraError::CrossrefHttp(err.to_string()))?;
        let response = http::check_status(response, "Crossref request failed", |status, message| {
            KiraError::CrossrefStatus { status, message }
        })?;
        let body = response
            .text()
            .map_err(|err| KiraError::CrossrefHttp(err.to_string()))?;
        parse_work(doi, &body)
    }
}

/// Builds a [`WorkCitation`] from a Crossref `/works/{doi}` response body.
pub fn parse_work(doi: &Identifier, body: &str) -> Result<WorkCitation, KiraError> {
    let payload: CrossrefResponse =
        serde_json::from_str(body).map_err(|err| KiraError::CrossrefParse(err.to_string()))?;
    let message = payload.message;

    let entries = message
        .author
        .ok_or_else(|| KiraError::CrossrefParse(format!("no author list for {doi}")))?;
    let mut authors = Vec::with_capacity(entries.len());
    for author in entries {
        match author.family.or(author.name) {
            Some(name) => authors.push(name),
            None => return Err(KiraError::AuthorFieldMissing(doi.to_string())),
        }
    }

    let title = message
        .title
        .and_then(|titles| titles.into_iter().next())
        .ok_or_else(|| KiraError::CrossrefParse(format!("no title for {doi}")))?;
    let year = message
        .created
        .and_then(|created| created.date_parts.into_iter().next())
        .and_then(|parts| parts.into_iter().next())
        .flatten()
        .ok_or_else(|| KiraError::CrossrefParse(format!("no creation year for {doi}")))?;

    let preprints = message
        .relation
        .map(|relation| {
            relation
                .has_preprint
                .iter()
                .map(|item| Identifier::new(&item.id))
                .filter(|id| !id.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let citation = format_citation(&authors, year, &title, doi);
    Ok(WorkCitation {
        doi: doi.clone(),
        authors: authors.join(", "),
        title,
        year,
        citation,
        preprints,
    })
}

/// `"<authors> (<year>). <title>. doi:<doi>"`
pub fn format_citation(authors: &[String], year: i64, title: &str, doi: &Identifier) -> String {
    format!("{} ({year}). {title}. doi:{doi}", authors.join(", "))
}

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefMessage,
}

#[derive(Debug, Deserialize)]
struct CrossrefMessage {
    author: Option<Vec<CrossrefAuthor>>,
    title: Option<Vec<String>>,
    created: Option<CrossrefDate>,
    relation: Option<CrossrefRelation>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    family: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

#[derive(Debug, Deserialize)]
struct CrossrefRelation {
    #[serde(rename = "has-preprint", default)]
    has_preprint: Vec<CrossrefRelatedItem>,
}

#[derive(Debug, Deserialize)]
struct CrossrefRelatedItem {
    id: String,
}
