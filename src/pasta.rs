use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::blocking::Client;
use tracing::debug;

use crate::domain::{DatasetRevision, Identifier};
use crate::error::KiraError;
use crate::http;

const PASTA_BASE: &str = "https://pasta.lternet.edu/package";
const DOI_SYSTEM: &str = "https://doi.org";

pub trait PastaClient: Send + Sync {
    fn list_package_ids(&self, scope: &str) -> Result<Vec<String>, KiraError>;
    fn list_revisions(&self, scope: &str, package: &str) -> Result<Vec<String>, KiraError>;
    fn resolve_doi(
        &self,
        scope: &str,
        package: &str,
        revision: &str,
    ) -> Result<Identifier, KiraError>;
    fn fetch_metadata(
        &self,
        scope: &str,
        package: &str,
        revision: &str,
    ) -> Result<DatasetRevision, KiraError>;
}

#[derive(Clone)]
pub struct PastaHttpClient {
    client: Client,
    base_url: String,
}

impl PastaHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, KiraError> {
        let client = http::build_client(timeout, KiraError::PastaHttp)?;
        Ok(Self {
            client,
            base_url: PASTA_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, path: &[&str]) -> String {
        let mut url = self.base_url.trim_end_matches('/').to_string();
        for segment in path {
            url.push('/');
            url.push_str(segment);
        }
        url
    }

    fn get_text(&self, url: &str) -> Result<String, KiraError> {
        debug!(%url, "pasta request");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| KiraError::PastaHttp(err.to_string()))?;
        let response = http::check_status(response, "PASTA request failed", |status, message| {
            KiraError::PastaStatus { status, message }
        })?;
        response
            .text()
            .map_err(|err| KiraError::PastaHttp(err.to_string()))
    }
}

impl PastaClient for PastaHttpClient {
    fn list_package_ids(&self, scope: &str) -> Result<Vec<String>, KiraError> {
        let text = self.get_text(&self.url(&["eml", scope]))?;
        parse_id_list(&text)
    }

    fn list_revisions(&self, scope: &str, package: &str) -> Result<Vec<String>, KiraError> {
        let text = self.get_text(&self.url(&["eml", scope, package]))?;
        parse_id_list(&text)
    }

    fn resolve_doi(
        &self,
        scope: &str,
        package: &str,
        revision: &str,
    ) -> Result<Identifier, KiraError> {
        let text = self.get_text(&self.url(&["doi", "eml", scope, package, revision]))?;
        parse_doi_response(&text)
    }

    fn fetch_metadata(
        &self,
        scope: &str,
        package: &str,
        revision: &str,
    ) -> Result<DatasetRevision, KiraError> {
        let text = self.get_text(&self.url(&["metadata", "eml", scope, package, revision]))?;
        parse_eml(scope, package, revision, &text)
    }
}

/// Parses a newline-delimited list of integers into ascending numeric order.
pub fn parse_id_list(text: &str) -> Result<Vec<String>, KiraError> {
    let mut ids = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<u64>()
                .map_err(|_| KiraError::MetadataParse(format!("expected an integer id, got {line:?}")))
        })
        .collect::<Result<Vec<_>, KiraError>>()?;
    ids.sort_unstable();
    Ok(ids.into_iter().map(|id| id.to_string()).collect())
}

/// Reads the body of the DOI endpoint, e.g. `doi:10.6073/pasta/abc`.
pub fn parse_doi_response(text: &str) -> Result<Identifier, KiraError> {
    let trimmed = text.trim();
    let identifier = Identifier::new(trimmed.strip_prefix("doi:").unwrap_or(trimmed));
    if identifier.is_empty() {
        return Err(KiraError::MetadataParse(
            "DOI endpoint returned an empty body".to_string(),
        ));
    }
    Ok(identifier)
}

/// Joins creator names with `", "`.
pub fn join_creators(names: &[String]) -> String {
    names.join(", ")
}

#[derive(Default)]
struct CreatorNames {
    surname: Option<String>,
    organization: Option<String>,
}

#[derive(Default)]
struct EmlFields {
    title: Option<String>,
    pub_date: Option<String>,
    doi: Option<String>,
    creators: Vec<String>,
}

/// Extracts the dataset fields of an EML document.
///
/// Element paths are matched on local names below the document root, so the
/// `eml:` prefix on the root element does not matter.
pub fn parse_eml(
    scope: &str,
    package: &str,
    revision: &str,
    xml: &str,
) -> Result<DatasetRevision, KiraError> {
    let fields = read_eml_fields(xml)?;
    let label = format!("{scope}.{package}.{revision}");
    let title = fields
        .title
        .ok_or_else(|| KiraError::MetadataParse(format!("{label}: missing dataset/title")))?;
    let pub_date = fields
        .pub_date
        .ok_or_else(|| KiraError::MetadataParse(format!("{label}: missing dataset/pubDate")))?;

    Ok(DatasetRevision {
        scope: scope.to_string(),
        package_id: package.to_string(),
        revision: revision.to_string(),
        title,
        pub_date,
        creators: join_creators(&fields.creators),
        doi: fields.doi.map(|doi| Identifier::new(&doi)),
    })
}

fn read_eml_fields(xml: &str) -> Result<EmlFields, KiraError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fields = EmlFields::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut identifier_system: Option<String> = None;
    let mut creator: Option<CreatorNames> = None;

    loop {
        let event = reader.read_event().map_err(|err| {
            KiraError::MetadataParse(format!(
                "malformed XML at byte {}: {err}",
                reader.error_position()
            ))
        })?;
        match event {
            Event::Start(element) => {
                path.push(local_name(&element));
                text.clear();
                open_element(&path, &element, &mut identifier_system, &mut creator)?;
            }
            Event::Empty(element) => {
                path.push(local_name(&element));
                text.clear();
                open_element(&path, &element, &mut identifier_system, &mut creator)?;
                close_element(&path, &text, &mut fields, &mut creator, &identifier_system)?;
                path.pop();
            }
            Event::Text(value) => {
                let value = value
                    .unescape()
                    .map_err(|err| KiraError::MetadataParse(err.to_string()))?;
                text.push_str(&value);
            }
            Event::CData(value) => {
                text.push_str(&String::from_utf8_lossy(&value.into_inner()));
            }
            Event::End(_) => {
                close_element(&path, &text, &mut fields, &mut creator, &identifier_system)?;
                path.pop();
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(fields)
}

fn open_element(
    path: &[String],
    element: &BytesStart<'_>,
    identifier_system: &mut Option<String>,
    creator: &mut Option<CreatorNames>,
) -> Result<(), KiraError> {
    match dataset_path(path).as_slice() {
        ["alternateIdentifier"] => *identifier_system = attribute(element, "system")?,
        ["creator"] => *creator = Some(CreatorNames::default()),
        _ => {}
    }
    Ok(())
}

fn close_element(
    path: &[String],
    text: &str,
    fields: &mut EmlFields,
    creator: &mut Option<CreatorNames>,
    identifier_system: &Option<String>,
) -> Result<(), KiraError> {
    let value = text.trim();
    match dataset_path(path).as_slice() {
        ["title"] => {
            fields.title.get_or_insert_with(|| value.to_string());
        }
        ["pubDate"] => {
            fields.pub_date.get_or_insert_with(|| value.to_string());
        }
        ["alternateIdentifier"] => {
            let doi = value.strip_prefix("doi:").unwrap_or(value).trim();
            if identifier_system.as_deref() == Some(DOI_SYSTEM) && !doi.is_empty() {
                fields.doi = Some(doi.to_string());
            }
        }
        ["creator", "individualName", "surName"] => {
            if let Some(names) = creator.as_mut() {
                names.surname.get_or_insert_with(|| value.to_string());
            }
        }
        ["creator", "organizationName"] => {
            if let Some(names) = creator.as_mut() {
                names.organization.get_or_insert_with(|| value.to_string());
            }
        }
        ["creator"] => {
            let names = creator.take().unwrap_or_default();
            let name = names.surname.or(names.organization).ok_or_else(|| {
                KiraError::MetadataParse(
                    "dataset/creator has neither individualName/surName nor organizationName"
                        .to_string(),
                )
            })?;
            fields.creators.push(name);
        }
        _ => {}
    }
    Ok(())
}

/// Local element names below `<root>/dataset`, or an empty list when the path
/// is elsewhere in the document.
fn dataset_path(path: &[String]) -> Vec<&str> {
    match path {
        [_root, dataset, rest @ ..] if dataset == "dataset" && !rest.is_empty() => {
            rest.iter().map(String::as_str).collect()
        }
        _ => Vec::new(),
    }
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).to_string()
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Result<Option<String>, KiraError> {
    let attr = element
        .try_get_attribute(key)
        .map_err(|err| KiraError::MetadataParse(err.to_string()))?;
    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|err| KiraError::MetadataParse(err.to_string()))?;
            Ok(Some(value.trim().to_string()))
        }
        None => Ok(None),
    }
}
