use std::fs;

use kira_data_citations::datacite::parse_relations;
use kira_data_citations::domain::{CitationStatus, RELATION_CITATIONS};

#[test]
fn parse_datacite_fixture() {
    let raw = fs::read_to_string("tests/fixtures/datacite_dataset.json").unwrap();
    let citations = parse_relations(&raw).unwrap();

    let ids: Vec<_> = citations.iter().map(|c| c.identifier.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "10.1029/2022JG007012",
            "10.1002/essoar.10511234.1",
            "https://ble.lternet.edu/methods",
            "10.1029/2022jg007012",
            "10.5194/bg-20-1-2023",
        ]
    );
    // Relationship ids come back lower-cased; only exact matches are merged.
    assert_eq!(citations[3].relation_type, RELATION_CITATIONS);
    assert_eq!(citations[0].relation_type, "IsCitedBy");
    assert_eq!(citations[1].relation_type, "IsCitedBy");
    assert_eq!(citations[2].identifier_type, "URL");
    assert_eq!(citations[4].relation_type, RELATION_CITATIONS);
    assert_eq!(citations[4].identifier_type, "DOI");
    assert!(citations.iter().all(|c| c.citation.is_empty()));
    assert!(citations.iter().all(|c| c.status == CitationStatus::NotDoi));
}
