use std::collections::HashSet;

use tracing::{debug, warn};

use crate::crossref::CrossrefClient;
use crate::datacite::DataciteClient;
use crate::domain::{Citation, CitationStatus, Identifier};
use crate::error::KiraError;

/// Resolves the works related to a DOI into citation records.
#[derive(Clone)]
pub struct CitationCollector<D: DataciteClient, C: CrossrefClient> {
    datacite: D,
    crossref: C,
}

impl<D: DataciteClient, C: CrossrefClient> CitationCollector<D, C> {
    pub fn new(datacite: D, crossref: C) -> Self {
        Self { datacite, crossref }
    }

    /// Related works of `doi` with citation text filled in.
    ///
    /// A failing DataCite lookup fails the call. A failing Crossref lookup
    /// only marks that one citation as [`CitationStatus::LookupFailed`].
    /// Works that are preprints of another work in the result are dropped.
    pub fn fetch_related(&self, doi: &Identifier) -> Result<Vec<Citation>, KiraError> {
        let mut citations = self.datacite.fetch_relations(doi)?;
        debug!(doi = %doi, related = citations.len(), "datacite relations");
        for citation in &mut citations {
            self.enrich(citation);
        }
        Ok(remove_published_preprints(citations))
    }

    fn enrich(&self, citation: &mut Citation) {
        if !citation.is_doi() {
            citation.citation.clear();
            citation.status = CitationStatus::NotDoi;
            return;
        }
        match self.crossref.fetch_citation(&citation.identifier) {
            Ok(work) => {
                citation.citation = work.citation;
                citation.preprints = work.preprints;
                citation.status = CitationStatus::Resolved;
            }
            Err(err) => {
                warn!(identifier = %citation.identifier, error = %err, "citation lookup failed");
                citation.citation.clear();
                citation.status = CitationStatus::LookupFailed {
                    reason: err.to_string(),
                };
            }
        }
    }
}

/// Drops every citation whose identifier is listed as a preprint of another
/// citation in `citations`. Order of the survivors is kept.
pub fn remove_published_preprints(citations: Vec<Citation>) -> Vec<Citation> {
    let superseded: HashSet<&Identifier> = citations
        .iter()
        .flat_map(|citation| {
            citation
                .preprints
                .iter()
                .filter(move |preprint| **preprint != citation.identifier)
        })
        .collect();
    if superseded.is_empty() {
        return citations;
    }
    let keep: Vec<bool> = citations
        .iter()
        .map(|citation| !superseded.contains(&citation.identifier))
        .collect();
    citations
        .into_iter()
        .zip(keep)
        .filter_map(|(citation, keep)| keep.then_some(citation))
        .collect()
}
