//! Chain → classifier → engine → query, through the scanner.

mod common;

use alloy::primitives::{Address, Bytes, TxHash};
use std::collections::BTreeMap;

use common::{harness, transfer, MockChain};
use treasury_indexer::blockchain::ChainTransaction;
use treasury_indexer::classification::{RuleSet, SpendingCategory};
use treasury_indexer::config::ScannerConfig;
use treasury_indexer::treasury::units::tokens_to_wei;
use treasury_indexer::treasury::Runway;

const PINNED_RULES: &str = r#"
[[rules]]
category = "SALARY"
[rules.conditions]
value = { min = 0.5 }
note_contains = ["payroll"]

[[rules]]
category = "OPERATIONS"
[rules.conditions]
value = { min = 0.01, max = 1.0 }
"#;

fn aaa() -> Address {
    "0x0000000000000000000000000000000000000aaa".parse().unwrap()
}

fn bbb() -> Address {
    "0x0000000000000000000000000000000000000bbb".parse().unwrap()
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[tokio::test]
async fn test_transfer_is_classified_and_counted() {
    let rules = RuleSet::from_toml_str(PINNED_RULES).unwrap();
    let chain = MockChain::new(99);
    let h = harness(chain.clone(), rules, vec![aaa()], ScannerConfig::default());
    h.scanner.poll_once().await.unwrap();

    chain.add_block(100, now(), vec![transfer(7, aaa(), bbb(), tokens_to_wei(0.6))]);
    chain.set_height(100);
    h.scanner.poll_once().await.unwrap();

    let metrics = h.scanner.require_metrics("0x0000000000000000000000000000000000000AAA").unwrap();
    assert_eq!(metrics.transaction_count, 1);
    assert_eq!(metrics.category_distribution[&SpendingCategory::Operations], 1);
    assert_eq!(metrics.top_category(), SpendingCategory::Operations);
    assert_eq!(metrics.top_recipients.len(), 1);
    assert_eq!(metrics.top_recipients[0].address, bbb());
    assert_eq!(metrics.top_recipients[0].amount, tokens_to_wei(0.6));
    assert!((metrics.monthly_burn - 0.6).abs() < 1e-9);
    // The mock chain reports a zero balance.
    assert_eq!(metrics.runway, Runway::Months(0.0));

    let expected: BTreeMap<SpendingCategory, u64> = SpendingCategory::ALL
        .iter()
        .map(|c| (*c, u64::from(*c == SpendingCategory::Operations)))
        .collect();
    assert_eq!(metrics.category_distribution, expected);
}

#[tokio::test]
async fn test_memo_selects_rule() {
    let rules = RuleSet::from_toml_str(PINNED_RULES).unwrap();
    let chain = MockChain::new(1);
    let h = harness(chain.clone(), rules, vec![aaa()], ScannerConfig::default());
    h.scanner.poll_once().await.unwrap();

    let payroll = ChainTransaction {
        hash: TxHash::repeat_byte(9),
        from: aaa(),
        to: Some(bbb()),
        value: tokens_to_wei(0.75),
        input: Bytes::from_static(b"October payroll"),
    };
    chain.add_block(2, now(), vec![payroll]);
    chain.set_height(2);
    h.scanner.poll_once().await.unwrap();

    let metrics = h.scanner.require_metrics(&aaa().to_string()).unwrap();
    assert_eq!(metrics.category_distribution[&SpendingCategory::Salary], 1);
    assert_eq!(metrics.category_distribution[&SpendingCategory::Operations], 0);
}

#[tokio::test]
async fn test_default_rules_grant() {
    let chain = MockChain::new(1);
    let h = harness(chain.clone(), RuleSet::default_rules(), vec![aaa()], ScannerConfig::default());
    h.scanner.poll_once().await.unwrap();

    chain.add_block(2, now(), vec![transfer(3, aaa(), bbb(), tokens_to_wei(0.6))]);
    chain.set_height(2);
    h.scanner.poll_once().await.unwrap();

    let metrics = h.scanner.require_metrics(&aaa().to_string()).unwrap();
    assert_eq!(metrics.category_distribution[&SpendingCategory::Grant], 1);
}

#[tokio::test]
async fn test_incoming_transfer_attributed_to_sender() {
    let rules = RuleSet::from_toml_str(PINNED_RULES).unwrap();
    let chain = MockChain::new(1);
    let h = harness(chain.clone(), rules, vec![bbb()], ScannerConfig::default());
    h.scanner.poll_once().await.unwrap();

    chain.add_block(2, now(), vec![transfer(4, aaa(), bbb(), tokens_to_wei(0.2))]);
    chain.set_height(2);
    h.scanner.poll_once().await.unwrap();

    assert!(h.scanner.get_metrics(&bbb().to_string()).unwrap().is_none());
    let sender = h.scanner.require_metrics(&aaa().to_string()).unwrap();
    assert_eq!(sender.transaction_count, 1);
}

#[tokio::test]
async fn test_unknown_address_is_not_found() {
    let chain = MockChain::new(1);
    let h = harness(chain, RuleSet::default_rules(), vec![aaa()], ScannerConfig::default());
    let err = h.scanner.require_metrics(&bbb().to_string()).unwrap_err();
    assert_eq!(err.status_code(), 404);
}
