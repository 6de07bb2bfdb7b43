use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;

use kira_data_citations::domain::Identifier;
use kira_data_citations::error::KiraError;
use kira_data_citations::pasta::{PastaClient, PastaHttpClient, parse_eml, parse_id_list};

/// Answers a single request with `status` and `body`, returning the base URL
/// and the handle that yields the request line.
fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}/package", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            if header.trim().is_empty() {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        reader.get_mut().write_all(response.as_bytes()).unwrap();
        request_line
    });
    (base_url, handle)
}

fn client(base_url: &str) -> PastaHttpClient {
    PastaHttpClient::new(Duration::from_secs(5))
        .unwrap()
        .with_base_url(base_url)
}

#[test]
fn parse_eml_fixture() {
    let raw = fs::read_to_string("tests/fixtures/eml_knb-lter-ble_9_1.xml").unwrap();
    let meta = parse_eml("knb-lter-ble", "9", "1", &raw).unwrap();

    assert_eq!(meta.scope, "knb-lter-ble");
    assert_eq!(meta.package_id, "9");
    assert_eq!(meta.revision, "1");
    assert_eq!(
        meta.title,
        "Water column temperature & salinity, Beaufort Lagoon Ecosystems LTER, 2018-2019"
    );
    assert_eq!(meta.pub_date, "2020-03-24");
    assert_eq!(meta.creators, "Dunton, Beaufort Lagoon Ecosystems LTER, Lougheed");
    assert_eq!(
        meta.doi,
        Some(Identifier::new("10.6073/pasta/bb7d76017b8a8534c4960346705bcb77"))
    );
    assert_eq!(meta.package_label(), "knb-lter-ble.9.1");
}

#[test]
fn missing_pub_date_is_a_parse_error() {
    let xml = r#"<eml:eml xmlns:eml="https://eml.ecoinformatics.org/eml-2.2.0">
        <dataset><title>T</title></dataset>
    </eml:eml>"#;
    let err = parse_eml("knb-lter-ble", "1", "1", xml).unwrap_err();
    assert_matches!(err, KiraError::MetadataParse(message) if message.contains("pubDate"));
}

#[test]
fn missing_title_is_a_parse_error() {
    let xml = r#"<eml:eml><dataset><pubDate>2020</pubDate></dataset></eml:eml>"#;
    let err = parse_eml("knb-lter-ble", "1", "1", xml).unwrap_err();
    assert_matches!(err, KiraError::MetadataParse(message) if message.contains("title"));
}

#[test]
fn doi_without_prefix_is_kept() {
    let xml = r#"<eml:eml><dataset>
        <alternateIdentifier system="https://doi.org">10.6073/pasta/abc</alternateIdentifier>
        <title>T</title><pubDate>2020</pubDate>
    </dataset></eml:eml>"#;
    let meta = parse_eml("s", "1", "1", xml).unwrap();
    assert_eq!(meta.doi, Some(Identifier::new("10.6073/pasta/abc")));
    assert_eq!(meta.creators, "");
}

#[test]
fn malformed_xml_is_a_parse_error() {
    let err = parse_eml("s", "1", "1", "<eml><dataset><title>T</dataset>").unwrap_err();
    assert_matches!(err, KiraError::MetadataParse(_));
}

#[test]
fn scrambled_ids_sort_numerically() {
    assert_eq!(parse_id_list("10\n2\n1").unwrap(), vec!["1", "2", "10"]);
    assert_eq!(parse_id_list("3\r\n1\r\n\r\n").unwrap(), vec!["1", "3"]);
}

#[test]
fn empty_doi_identifier_counts_as_absent() {
    for element in [
        r#"<alternateIdentifier system="https://doi.org"></alternateIdentifier>"#,
        r#"<alternateIdentifier system="https://doi.org"/>"#,
        r#"<alternateIdentifier system="https://doi.org"> doi: </alternateIdentifier>"#,
    ] {
        let xml = format!(
            "<eml:eml><dataset>{element}<title>T</title><pubDate>2020</pubDate></dataset></eml:eml>"
        );
        let meta = parse_eml("s", "1", "1", &xml).unwrap();
        assert_eq!(meta.doi, None, "element {element}");
    }
}

#[test]
fn empty_doi_identifier_keeps_earlier_value() {
    let xml = r#"<eml:eml><dataset>
        <alternateIdentifier system="https://doi.org">doi:10.6073/pasta/abc</alternateIdentifier>
        <alternateIdentifier system="https://doi.org"/>
        <title>T</title><pubDate>2020</pubDate>
    </dataset></eml:eml>"#;
    let meta = parse_eml("s", "1", "1", xml).unwrap();
    assert_eq!(meta.doi, Some(Identifier::new("10.6073/pasta/abc")));
}

#[test]
fn non_success_status_becomes_pasta_status() {
    let (base_url, server) = serve_once("503 Service Unavailable", "down");
    let err = client(&base_url).list_package_ids("knb-lter-ble").unwrap_err();
    assert_matches!(
        &err,
        KiraError::PastaStatus { status: 503, message } if message == "down"
    );
    assert_eq!(err.status(), Some(503));
    assert!(server.join().unwrap().starts_with("GET /package/eml/knb-lter-ble "));
}

#[test]
fn resolve_doi_strips_scheme_from_endpoint_body() {
    let (base_url, server) = serve_once("200 OK", "doi:10.6073/pasta/abc\n");
    let doi = client(&base_url)
        .resolve_doi("knb-lter-ble", "9", "1")
        .unwrap();
    assert_eq!(doi.as_str(), "10.6073/pasta/abc");
    assert!(
        server
            .join()
            .unwrap()
            .starts_with("GET /package/doi/eml/knb-lter-ble/9/1 ")
    );
}
