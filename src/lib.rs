pub mod citations;
pub mod config;
pub mod crossref;
pub mod datacite;
pub mod domain;
pub mod error;
pub mod http;
pub mod output;
pub mod pasta;
pub mod report;
