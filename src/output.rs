use std::fs;
use std::io::{self, Write};

use camino::Utf8Path;
use serde::Serialize;

use crate::domain::{Citation, DatasetRevision};
use crate::error::KiraError;
use crate::report::{CSV_COLUMNS, ProgressEvent, ProgressSink, ReportRow, ReportSummary};

/// Writes the header and `rows` to `writer` as CSV.
pub fn write_csv<W: Write>(writer: W, rows: &[ReportRow]) -> Result<(), KiraError> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(CSV_COLUMNS)
        .map_err(|err| KiraError::ReportWrite(err.to_string()))?;
    for row in rows {
        csv.serialize(row)
            .map_err(|err| KiraError::ReportWrite(err.to_string()))?;
    }
    csv.flush()
        .map_err(|err| KiraError::ReportWrite(err.to_string()))?;
    Ok(())
}

/// Writes the report next to `path` and moves it into place once complete,
/// so an interrupted run leaves any previous report untouched.
pub fn write_csv_file(path: &Utf8Path, rows: &[ReportRow]) -> Result<(), KiraError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("kira-dc-report")
        .suffix(".csv.tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    write_csv(temp.as_file_mut(), rows)?;
    temp.persist(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &ReportSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_citations(citations: &[Citation]) -> io::Result<()> {
        Self::print_json(&citations)
    }

    pub fn print_ids(ids: &[String]) -> io::Result<()> {
        Self::print_json(&ids)
    }

    pub fn print_revision(revision: &DatasetRevision) -> io::Result<()> {
        Self::print_json(revision)
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(citation: &str) -> ReportRow {
        ReportRow {
            scope: "knb-lter-ble".to_string(),
            package_id: "1".to_string(),
            revision: "2".to_string(),
            pubdate: "2020".to_string(),
            title: "Lagoon, temperature".to_string(),
            creators: "Smith, Wang".to_string(),
            doi: "10.6073/pasta/abc".to_string(),
            citation: citation.to_string(),
        }
    }

    #[test]
    fn header_then_quoted_rows() {
        let mut out = Vec::new();
        write_csv(&mut out, &[row("Lee (2022). Title. doi:10.1/x")]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("scope,package_id,revision,pubdate,title,creators,doi,citation")
        );
        assert_eq!(
            lines.next(),
            Some(
                "knb-lter-ble,1,2,2020,\"Lagoon, temperature\",\"Smith, Wang\",10.6073/pasta/abc,Lee (2022). Title. doi:10.1/x"
            )
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_report_has_header_only() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "scope,package_id,revision,pubdate,title,creators,doi,citation\n"
        );
    }
}
