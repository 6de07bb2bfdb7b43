use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("no scope configured (set \"scope\" in the config or pass --scope)")]
    MissingScope,

    #[error("Crossref request failed: {0}")]
    CrossrefHttp(String),

    #[error("Crossref returned status {status}: {message}")]
    CrossrefStatus { status: u16, message: String },

    #[error("unexpected Crossref payload: {0}")]
    CrossrefParse(String),

    #[error("Crossref author entry has neither a family nor an organization name (doi {0})")]
    #[diagnostic(help("the upstream record is malformed; report it to the publisher"))]
    AuthorFieldMissing(String),

    #[error("DataCite request failed: {0}")]
    DataciteHttp(String),

    #[error("DataCite returned status {status}: {message}")]
    DataciteStatus { status: u16, message: String },

    #[error("unexpected DataCite payload: {0}")]
    DataciteParse(String),

    #[error("PASTA request failed: {0}")]
    PastaHttp(String),

    #[error("PASTA returned status {status}: {message}")]
    PastaStatus { status: u16, message: String },

    #[error("failed to parse dataset metadata: {0}")]
    MetadataParse(String),

    #[error("failed to write report: {0}")]
    ReportWrite(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl KiraError {
    /// Transport status code for errors raised by a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            KiraError::CrossrefStatus { status, .. }
            | KiraError::DataciteStatus { status, .. }
            | KiraError::PastaStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            KiraError::CrossrefHttp(_)
                | KiraError::CrossrefStatus { .. }
                | KiraError::CrossrefParse(_)
                | KiraError::AuthorFieldMissing(_)
                | KiraError::DataciteHttp(_)
                | KiraError::DataciteStatus { .. }
                | KiraError::DataciteParse(_)
                | KiraError::PastaHttp(_)
                | KiraError::PastaStatus { .. }
                | KiraError::MetadataParse(_)
        )
    }
}
