use camino::Utf8Path;
use serde::Serialize;
use tracing::info;

use crate::citations::CitationCollector;
use crate::config::StandaloneDataset;
use crate::crossref::CrossrefClient;
use crate::datacite::DataciteClient;
use crate::domain::{Citation, DatasetRevision};
use crate::error::KiraError;
use crate::pasta::PastaClient;

pub const CSV_COLUMNS: [&str; 8] = [
    "scope",
    "package_id",
    "revision",
    "pubdate",
    "title",
    "creators",
    "doi",
    "citation",
];

/// One dataset revision paired with one work that cites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub scope: String,
    pub package_id: String,
    pub revision: String,
    pub pubdate: String,
    pub title: String,
    pub creators: String,
    pub doi: String,
    pub citation: String,
}

impl ReportRow {
    pub fn new(dataset: &DatasetRevision, citation: &Citation) -> Self {
        Self {
            scope: dataset.scope.clone(),
            package_id: dataset.package_id.clone(),
            revision: dataset.revision.clone(),
            pubdate: dataset.pub_date.clone(),
            title: dataset.title.clone(),
            creators: dataset.creators.clone(),
            doi: dataset
                .doi
                .as_ref()
                .map(|doi| doi.to_string())
                .unwrap_or_default(),
            citation: citation.citation.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub datasets: usize,
    pub rows: Vec<ReportRow>,
    pub failed_lookups: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub scope: String,
    pub output_path: String,
    pub datasets: usize,
    pub rows: usize,
    pub failed_lookups: usize,
    pub generated_at: String,
}

impl ReportSummary {
    pub fn new(scope: &str, output_path: &Utf8Path, report: &Report) -> Self {
        Self {
            scope: scope.to_string(),
            output_path: output_path.to_string(),
            datasets: report.datasets,
            rows: report.rows.len(),
            failed_lookups: report.failed_lookups,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Forwards progress to the `tracing` subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        info!("{}", event.message);
    }
}

fn emit(sink: &dyn ProgressSink, message: String) {
    sink.event(ProgressEvent { message });
}

#[derive(Clone)]
pub struct ReportBuilder<P: PastaClient, D: DataciteClient, C: CrossrefClient> {
    pasta: P,
    collector: CitationCollector<D, C>,
}

impl<P: PastaClient, D: DataciteClient, C: CrossrefClient> ReportBuilder<P, D, C> {
    pub fn new(pasta: P, datacite: D, crossref: C) -> Self {
        Self {
            pasta,
            collector: CitationCollector::new(datacite, crossref),
        }
    }

    pub fn collector(&self) -> &CitationCollector<D, C> {
        &self.collector
    }

    pub fn pasta(&self) -> &P {
        &self.pasta
    }

    /// Metadata of one revision. When the EML carries no DOI the one
    /// registered with the repository is used.
    pub fn revision(
        &self,
        scope: &str,
        package: &str,
        revision: &str,
    ) -> Result<DatasetRevision, KiraError> {
        let mut meta = self.pasta.fetch_metadata(scope, package, revision)?;
        if meta.doi.is_none() {
            meta.doi = Some(self.pasta.resolve_doi(scope, package, revision)?);
        }
        Ok(meta)
    }

    /// Metadata for every revision of every package in `scope`, packages and
    /// revisions in ascending order.
    pub fn collect_scope(
        &self,
        scope: &str,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<DatasetRevision>, KiraError> {
        let packages = self.pasta.list_package_ids(scope)?;
        emit(
            sink,
            format!("found {} packages in scope {scope}", packages.len()),
        );

        let mut revisions = Vec::new();
        for package in &packages {
            for revision in self.pasta.list_revisions(scope, package)? {
                emit(
                    sink,
                    format!("fetching metadata for {scope}.{package}.{revision}"),
                );
                revisions.push(self.revision(scope, package, &revision)?);
            }
        }
        Ok(revisions)
    }

    /// Builds the rows for all revisions in `scope` followed by the
    /// standalone datasets.
    pub fn build(
        &self,
        scope: &str,
        standalone: &[StandaloneDataset],
        sink: &dyn ProgressSink,
    ) -> Result<Report, KiraError> {
        let mut datasets = self.collect_scope(scope, sink)?;
        if !standalone.is_empty() {
            emit(
                sink,
                format!("adding {} standalone datasets", standalone.len()),
            );
            datasets.extend(standalone.iter().map(StandaloneDataset::to_revision));
        }
        self.build_for(&datasets, sink)
    }

    pub fn build_for(
        &self,
        datasets: &[DatasetRevision],
        sink: &dyn ProgressSink,
    ) -> Result<Report, KiraError> {
        let mut report = Report {
            datasets: datasets.len(),
            ..Report::default()
        };
        for dataset in datasets {
            let Some(doi) = &dataset.doi else {
                emit(
                    sink,
                    format!("skipping {}: no DOI", dataset.package_label()),
                );
                continue;
            };
            emit(
                sink,
                format!("fetching citations for {} ({doi})", dataset.package_label()),
            );
            let citations = self.collector.fetch_related(doi)?;
            for citation in &citations {
                if citation.lookup_failed() {
                    report.failed_lookups += 1;
                }
                report.rows.push(ReportRow::new(dataset, citation));
            }
        }
        Ok(report)
    }
}
