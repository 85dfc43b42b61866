mod common;

use common::read_fixture;
use edgarlens::{CikLookup, pad_cik, parse_company_tickers};
use std::collections::HashMap;

#[test]
fn parse_tickers_file() {
    let content = read_fixture("tickers/company_tickers.json");
    let tickers = parse_company_tickers(&content).unwrap();

    assert_eq!(tickers.len(), 5);
    let nvda = tickers.iter().find(|t| t.ticker == "NVDA").unwrap();
    assert_eq!(nvda.cik, 1045810);
    assert_eq!(nvda.title, "NVIDIA CORP");
    assert_eq!(pad_cik(nvda.cik), "0001045810");

    let att = tickers.iter().find(|t| t.ticker == "T").unwrap();
    assert_eq!(att.title, "AT&T INC.");
}

#[tokio::test]
async fn fixed_map_lookup() {
    let map: HashMap<String, String> = HashMap::from([("AMD".to_string(), "2488".to_string())]);

    assert_eq!(map.cik_for(" amd ").await.unwrap(), "0000002488");
    assert!(map.cik_for("NOPE").await.is_err());
}
