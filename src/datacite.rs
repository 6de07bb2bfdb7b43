use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{
    Citation, IDENTIFIER_TYPE_DOI, Identifier, RELATION_CITATIONS, RELATION_REFERENCES, UNKNOWN,
};
use crate::error::KiraError;
use crate::http::{self, encode_url_component};

const DATACITE_BASE: &str = "https://api.datacite.org";

pub trait DataciteClient: Send + Sync {
    /// Related works of `doi`, deduplicated by identifier and not yet
    /// enriched with citation text.
    fn fetch_relations(&self, doi: &Identifier) -> Result<Vec<Citation>, KiraError>;
}

#[derive(Clone)]
pub struct DataciteHttpClient {
    client: Client,
    base_url: String,
}

impl DataciteHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, KiraError> {
        let client = http::build_client(timeout, KiraError::DataciteHttp)?;
        Ok(Self {
            client,
            base_url: DATACITE_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn doi_url(&self, doi: &Identifier) -> String {
        format!(
            "{}/dois/{}",
            self.base_url.trim_end_matches('/'),
            encode_url_component(doi.as_str())
        )
    }
}

impl DataciteClient for DataciteHttpClient {
    fn fetch_relations(&self, doi: &Identifier) -> Result<Vec<Citation>, KiraError> {
        let url = self.doi_url(doi);
        debug!(%url, "datacite lookup");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| KiraError::DataciteHttp(err.to_string()))?;
        let response = http::check_status(response, "DataCite request failed", |status, message| {
            KiraError::DataciteStatus { status, message }
        })?;
        let body = response
            .text()
            .map_err(|err| KiraError::DataciteHttp(err.to_string()))?;
        parse_relations(&body)
    }
}

/// Collects related works from a DataCite `/dois/{doi}` response body.
///
/// `relatedIdentifiers` come first, followed by the `references` and
/// `citations` relationship collections. An identifier already collected
/// is not added again.
pub fn parse_relations(body: &str) -> Result<Vec<Citation>, KiraError> {
    let payload: DataciteResponse =
        serde_json::from_str(body).map_err(|err| KiraError::DataciteParse(err.to_string()))?;
    let mut citations = Vec::new();
    let Some(data) = payload.data else {
        return Ok(citations);
    };

    let related = data
        .attributes
        .and_then(|attributes| attributes.related_identifiers)
        .unwrap_or_default();
    for item in related {
        let Some(raw) = item.related_identifier else {
            continue;
        };
        let citation = Citation::new(
            Identifier::new(&raw),
            item.related_identifier_type.as_deref().unwrap_or(UNKNOWN),
            item.relation_type.as_deref().unwrap_or(UNKNOWN),
        );
        push_unique(&mut citations, citation);
    }

    if let Some(relationships) = data.relationships {
        if let Some(references) = relationships.references {
            add_relationship_items(references, RELATION_REFERENCES, &mut citations);
        }
        if let Some(cited_by) = relationships.citations {
            add_relationship_items(cited_by, RELATION_CITATIONS, &mut citations);
        }
    }

    Ok(citations)
}

fn add_relationship_items(set: RelationshipSet, relation_type: &str, citations: &mut Vec<Citation>) {
    for item in set.data.unwrap_or_default() {
        let Some(id) = item.id else {
            continue;
        };
        let identifier_type = match item.kind.as_deref() {
            Some("dois") => IDENTIFIER_TYPE_DOI,
            Some(other) => other,
            None => UNKNOWN,
        };
        let citation = Citation::new(Identifier::new(&id), identifier_type, relation_type);
        push_unique(citations, citation);
    }
}

fn push_unique(citations: &mut Vec<Citation>, citation: Citation) {
    if citations
        .iter()
        .any(|existing| existing.identifier == citation.identifier)
    {
        return;
    }
    citations.push(citation);
}

#[derive(Debug, Deserialize)]
struct DataciteResponse {
    data: Option<DataciteRecord>,
}

#[derive(Debug, Deserialize)]
struct DataciteRecord {
    attributes: Option<DataciteAttributes>,
    relationships: Option<DataciteRelationships>,
}

#[derive(Debug, Deserialize)]
struct DataciteAttributes {
    #[serde(rename = "relatedIdentifiers")]
    related_identifiers: Option<Vec<RelatedIdentifier>>,
}

#[derive(Debug, Deserialize)]
struct RelatedIdentifier {
    #[serde(rename = "relatedIdentifier")]
    related_identifier: Option<String>,
    #[serde(rename = "relationType")]
    relation_type: Option<String>,
    #[serde(rename = "relatedIdentifierType")]
    related_identifier_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DataciteRelationships {
    references: Option<RelationshipSet>,
    citations: Option<RelationshipSet>,
}

#[derive(Debug, Deserialize)]
struct RelationshipSet {
    data: Option<Vec<RelationshipItem>>,
}

#[derive(Debug, Deserialize)]
struct RelationshipItem {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}
