mod common;

use common::read_fixture;
use edgarlens::interpret::{FormFindings, FormInterpreter, interpreter_for, schema_for};
use edgarlens::parsing::cascade::{ParseCascade, Stage};
use edgarlens::{Dilutive, FilingReference, FormFamily, Impact, InsiderAction, classify};

fn interpret(fixture: &str, family: FormFamily) -> (Stage, FormFindings) {
    let payload = read_fixture(fixture);
    let output = ParseCascade::run(&payload, schema_for(family), 6000).unwrap();
    let findings = interpreter_for(family).interpret(&output).unwrap();
    (output.stage, findings)
}

#[test]
fn form4_xml_sale() {
    let (stage, findings) = interpret("form4/nvda_sale.xml", FormFamily::InsiderTransaction);

    assert_eq!(stage, Stage::StrictXml);
    assert_eq!(findings.event_type, "insider selling");
    assert_eq!(findings.insider_action, Some(InsiderAction::Sell));
    assert_eq!(findings.insider_name.as_deref(), Some("HUANG JEN HSUN"));
    assert_eq!(
        findings.insider_role.as_deref(),
        Some("Director, Officer (President and CEO)")
    );
    assert_eq!(findings.shares, Some(200000.0));
    assert_eq!(findings.value_usd, Some(26_140_000.0));
    assert_eq!(findings.price, Some(130.7));
    assert_eq!(findings.transaction_type.as_deref(), Some("open market"));
    assert_eq!(findings.impact, Impact::Medium);
    assert_eq!(findings.dilutive, Dilutive::False);
}

#[test]
fn form4_envelope_with_bare_ampersand() {
    let (stage, findings) = interpret("form4/att_envelope.txt", FormFamily::InsiderTransaction);

    assert_eq!(stage, Stage::SanitizedFragment);
    assert_eq!(findings.insider_action, Some(InsiderAction::Sell));
    assert_eq!(findings.insider_name.as_deref(), Some("McElfresh Jeffery S"));
    assert_eq!(
        findings.insider_role.as_deref(),
        Some("Officer (CEO-AT&T Communications)")
    );
    assert_eq!(findings.shares, Some(4210.0));
    assert_eq!(findings.transaction_type.as_deref(), Some("tax withholding"));
}

#[test]
fn form4_rendered_table() {
    let (stage, findings) = interpret("form4/rendered_table.html", FormFamily::InsiderTransaction);

    assert_eq!(stage, Stage::HtmlTable);
    assert_eq!(findings.event_type, "insider buying");
    assert_eq!(findings.insider_action, Some(InsiderAction::Buy));
    assert_eq!(findings.shares, Some(1500.0));
    assert_eq!(findings.value_usd, Some(38000.0));
    assert_eq!(findings.insider_role.as_deref(), Some("Director"));
    assert_eq!(findings.insider_name.as_deref(), Some("Smith John"));
}

#[test]
fn form144_xml() {
    let (stage, findings) = interpret("form144/edgar_submission.xml", FormFamily::ProposedSale);

    assert_eq!(stage, Stage::StrictXml);
    assert_eq!(findings.insider_name.as_deref(), Some("Jane Doe"));
    assert_eq!(findings.insider_role.as_deref(), Some("Officer"));
    assert_eq!(findings.shares, Some(5000.0));
    assert_eq!(findings.value_usd, Some(250000.0));
    assert_eq!(findings.sale_date.as_deref(), Some("2024-05-01"));
}

#[test]
fn form144_loose_tags() {
    let (stage, findings) = interpret("form144/loose_envelope.txt", FormFamily::ProposedSale);

    assert_eq!(stage, Stage::LooseTags);
    assert_eq!(findings.insider_name.as_deref(), Some("Mary Major"));
    assert_eq!(findings.insider_role.as_deref(), Some("Director"));
    assert_eq!(findings.shares, Some(12000.0));
    assert_eq!(findings.value_usd, Some(480000.0));
    assert_eq!(findings.sale_date.as_deref(), Some("07/15/2024"));
}

#[test]
fn form144_plain_text() {
    let (stage, findings) = interpret("form144/plain_text.txt", FormFamily::ProposedSale);

    assert_eq!(stage, Stage::LabeledText);
    assert_eq!(findings.insider_name.as_deref(), Some("Wesley Cummins"));
    assert_eq!(findings.insider_role.as_deref(), Some("Chief Executive Officer"));
    assert_eq!(findings.shares, Some(100000.0));
    assert_eq!(findings.value_usd, Some(412500.0));
    assert_eq!(findings.sale_date.as_deref(), Some("06/03/2024"));
}

#[test]
fn current_report_results_release() {
    let (stage, findings) = interpret("current/results_release.htm", FormFamily::CurrentReport);

    assert_eq!(stage, Stage::LabeledText);
    assert_eq!(findings.items, vec!["2.02", "7.01", "9.01"]);
    assert_eq!(findings.event_type, "results/guidance");
    assert_eq!(findings.material, Some(true));
    assert_eq!(findings.impact, Impact::High);
    assert_eq!(findings.dilutive, Dilutive::False);
}

#[test]
fn annual_report_items_only() {
    let (_, findings) = interpret("annual/annual_report.htm", FormFamily::AnnualReport);

    assert_eq!(findings.event_type, "annual report");
    assert_eq!(findings.items, vec!["1", "1A", "1B", "1C", "7", "7A"]);
    assert_eq!(findings.shares, None);
    assert_eq!(findings.value_usd, None);
}

#[test]
fn classified_summaries() {
    let reference = FilingReference::new(
        "soun",
        "144",
        "2024-04-30",
        "https://www.sec.gov/Archives/edgar/data/1840292/000195917324003555/primary_doc.xml",
    );
    let (_, findings) = interpret("form144/edgar_submission.xml", FormFamily::ProposedSale);
    let record = classify(&reference, FormFamily::ProposedSale, findings, "v1");

    assert_eq!(record.ticker, "SOUN");
    assert_eq!(record.form_type, "Form 144");
    assert_eq!(
        record.summary,
        "Form 144: insider proposed sale. Seller: Jane Doe. Shares: 5000. Approx. value: $250000. Estimated date: 2024-05-01."
    );

    let (_, findings) = interpret("form4/nvda_sale.xml", FormFamily::InsiderTransaction);
    let record = classify(&reference, FormFamily::InsiderTransaction, findings, "v1");
    assert_eq!(
        record.summary,
        "Form 4: insider selling. Insider: HUANG JEN HSUN (Director, Officer (President and CEO)). Shares: 200000. Average price: $130.7. Type: open market."
    );
}

#[test]
fn malformed_documents_terminate() {
    let payloads = [
        "",
        "   \n\t",
        "<ownershipDocument><nonDerivativeTable>",
        "<<<>>>&&&;;;",
        "<html><body><table><tr><td>1</td></tr></table></body></html>",
        "\u{0}\u{1}binary\u{fffd}",
    ];
    for family in [
        FormFamily::InsiderTransaction,
        FormFamily::ProposedSale,
        FormFamily::CurrentReport,
        FormFamily::AnnualReport,
    ] {
        for payload in payloads {
            match ParseCascade::run(payload, schema_for(family), 6000) {
                Ok(output) => {
                    let _ = interpreter_for(family).interpret(&output);
                }
                Err(diagnostic) => assert!(!diagnostic.is_empty()),
            }
        }
    }
}
