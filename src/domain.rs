use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

const DOI_RESOLVER_PREFIX: &str = "https://doi.org/";
const DOI_SCHEME_PREFIX: &str = "doi:";

pub const IDENTIFIER_TYPE_DOI: &str = "DOI";
pub const UNKNOWN: &str = "Unknown";
pub const RELATION_REFERENCES: &str = "References";
pub const RELATION_CITATIONS: &str = "Citations";

/// Strips surrounding whitespace, `https://doi.org/` and a leading `doi:`.
///
/// The pass repeats until the value is stable, so normalizing twice never
/// changes the result of normalizing once.
pub fn normalize_identifier(raw: &str) -> String {
    let mut current = normalize_once(raw);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(raw: &str) -> String {
    let mut value = raw.trim().to_string();
    if value.contains(DOI_RESOLVER_PREFIX) {
        value = value.replace(DOI_RESOLVER_PREFIX, "");
    }
    match value.strip_prefix(DOI_SCHEME_PREFIX) {
        Some(rest) => rest.trim().to_string(),
        None => value.trim().to_string(),
    }
}

/// A work identifier in normalized form. Equality is on the normalized value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(#[serde(deserialize_with = "deserialize_normalized")] String);

fn deserialize_normalized<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_identifier(&raw))
}

impl Identifier {
    pub fn new(raw: &str) -> Self {
        Self(normalize_identifier(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks the `10.<registrant>/<suffix>` shape of a DOI.
    pub fn looks_like_doi(&self) -> bool {
        doi_regex().is_match(&self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A DOI as supplied by a user; parsing validates the shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Doi(Identifier);

impl Doi {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn identifier(&self) -> &Identifier {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Doi {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let identifier = Identifier::new(value);
        if !identifier.looks_like_doi() {
            return Err(KiraError::InvalidDoi(value.to_string()));
        }
        Ok(Self(identifier))
    }
}

impl TryFrom<String> for Doi {
    type Error = KiraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn doi_regex() -> &'static Regex {
    static DOI: OnceLock<Regex> = OnceLock::new();
    DOI.get_or_init(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("static DOI pattern"))
}

/// Repository scope such as `knb-lter-ble`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Scope(String);

impl Scope {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Scope {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.');
        if !is_valid {
            return Err(KiraError::InvalidScope(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for Scope {
    type Error = KiraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How the citation text of a [`Citation`] came to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CitationStatus {
    /// Text was composed from Crossref metadata.
    Resolved,
    /// The identifier is not a DOI, so no lookup was attempted.
    NotDoi,
    /// A lookup was attempted and failed.
    LookupFailed { reason: String },
}

/// A work related to a dataset DOI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub identifier: Identifier,
    pub identifier_type: String,
    pub relation_type: String,
    pub citation: String,
    pub preprints: Vec<Identifier>,
    #[serde(flatten)]
    pub status: CitationStatus,
}

impl Citation {
    pub fn new(identifier: Identifier, identifier_type: &str, relation_type: &str) -> Self {
        Self {
            identifier,
            identifier_type: identifier_type.to_string(),
            relation_type: relation_type.to_string(),
            citation: String::new(),
            preprints: Vec::new(),
            status: CitationStatus::NotDoi,
        }
    }

    pub fn is_doi(&self) -> bool {
        self.identifier_type == IDENTIFIER_TYPE_DOI
    }

    pub fn lookup_failed(&self) -> bool {
        matches!(self.status, CitationStatus::LookupFailed { .. })
    }
}

/// Descriptive metadata of one dataset revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetRevision {
    pub scope: String,
    pub package_id: String,
    pub revision: String,
    pub title: String,
    pub pub_date: String,
    pub creators: String,
    pub doi: Option<Identifier>,
}

impl DatasetRevision {
    /// `scope.package.revision`, the packageId form used by the repository.
    pub fn package_label(&self) -> String {
        format!("{}.{}.{}", self.scope, self.package_id, self.revision)
    }
}
