use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use kira_data_citations::config::{ConfigLoader, ConfigOverrides};
use kira_data_citations::error::KiraError;

#[test]
fn load_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-dc.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "scope": "knb-lter-ble",
            "output_path": "reports/citations.csv",
            "timeout_secs": 10,
            "standalone": [
                {"scope": "knb-lter-ble", "pub_date": "2021", "title": "Some Model Data",
                 "creators": "Rawlins, M.", "doi": "doi:10.6073/pasta/a49b3da18b4c83d6ff69d9d878bb7dc3"}
            ]
        }"#,
    )
    .unwrap();

    let resolved =
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap();

    assert_eq!(resolved.require_scope().unwrap().as_str(), "knb-lter-ble");
    assert_eq!(resolved.output_path, Utf8PathBuf::from("reports/citations.csv"));
    assert_eq!(resolved.timeout, Duration::from_secs(10));
    assert_eq!(resolved.standalone.len(), 1);
    let dataset = &resolved.standalone[0];
    assert_eq!(dataset.package_id, "n/a");
    assert_eq!(dataset.revision, "n/a");
    assert_eq!(
        dataset.doi.as_str(),
        "10.6073/pasta/a49b3da18b4c83d6ff69d9d878bb7dc3"
    );
}

#[test]
fn invalid_standalone_doi_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-dc.json");
    fs::write(
        &path,
        r#"{"standalone": [{"scope": "s", "pub_date": "2021", "title": "T", "creators": "C", "doi": "n/a"}]}"#,
    )
    .unwrap();

    let err = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, KiraError::InvalidDoi(_));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let err = ConfigLoader::resolve(
        Some("/nonexistent/kira-dc.json"),
        ConfigOverrides::default(),
    )
    .unwrap_err();
    assert_matches!(err, KiraError::ConfigRead(_));
}

#[test]
fn malformed_config_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-dc.json");
    fs::write(&path, "{ scope: ").unwrap();
    let err = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, KiraError::ConfigParse(_));
}

#[test]
fn missing_scope_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-dc.json");
    fs::write(&path, "{}").unwrap();
    let resolved = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap();
    assert_matches!(resolved.require_scope(), Err(KiraError::MissingScope));
}
