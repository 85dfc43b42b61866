mod common;

use common::{edgar, read_fixture};
use edgarlens::{FilingOptions, Submission};

#[test]
fn parse_submission() {
    let content = read_fixture("submissions/CIK0001045810.json");
    let submission: Submission = serde_json::from_str(&content).unwrap();

    assert_eq!(submission.name, "NVIDIA CORP");
    assert_eq!(submission.cik, "1045810");
    assert_eq!(submission.tickers, vec!["NVDA"]);
    assert_eq!(submission.filings.recent.accession_number.len(), 8);
}

#[test]
fn references_keep_target_forms() {
    let content = read_fixture("submissions/CIK0001045810.json");
    let submission: Submission = serde_json::from_str(&content).unwrap();

    let references = edgar().references_from_submission(
        "nvda",
        "0001045810",
        &submission,
        &FilingOptions::default(),
    );
    let forms: Vec<&str> = references.iter().map(|r| r.form.as_str()).collect();
    assert_eq!(forms, vec!["4", "144", "8-K", "4/A", "4", "10-K"]);
    assert!(references.iter().all(|r| r.symbol == "NVDA"));

    assert_eq!(
        references[0].link,
        "https://www.sec.gov/Archives/edgar/data/1045810/000119764724000021/xslF345X05/wk-form4_1717625454.xml"
    );
    assert_eq!(
        references[1].link,
        "https://www.sec.gov/Archives/edgar/data/1045810/000195917324003555/0001959173-24-003555-index.html"
    );
    assert_eq!(references[2].date, "2024-05-22");
}

#[test]
fn references_respect_limit_and_amendments() {
    let content = read_fixture("submissions/CIK0001045810.json");
    let submission: Submission = serde_json::from_str(&content).unwrap();
    let edgar = edgar();

    let capped = edgar.references_from_submission(
        "NVDA",
        "1045810",
        &submission,
        &FilingOptions::default().with_limit(3),
    );
    assert_eq!(capped.len(), 3);

    let exact = edgar.references_from_submission(
        "NVDA",
        "1045810",
        &submission,
        &FilingOptions::new()
            .with_form_type("4")
            .with_include_amendments(false),
    );
    assert_eq!(exact.len(), 2);
    assert!(exact.iter().all(|r| r.form == "4"));
}
