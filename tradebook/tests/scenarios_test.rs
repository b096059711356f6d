//! Demonstration scenarios run against a fixed date.

use rust_decimal_macros::dec;
use tradebook::{scenarios, Config, Scenario};
use tradebook_testkit::{date, quantity_of};

fn strict_config() -> Config {
    Config {
        strict_references: true,
        ..Config::test()
    }
}

#[tokio::test]
async fn test_back_dated_scenario() {
    let reports = scenarios::run(Scenario::BackDated, &strict_config(), date(2024, 3, 6))
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];

    let first = report.step("CURRENT POSITIONS AFTER FIRST TRADE").unwrap();
    assert_eq!(quantity_of(first, "DEMO-BOOK", "Z77.SI"), dec!(100));
    assert_eq!(quantity_of(first, "BROKER", "Z77.SI"), dec!(-100));

    let third = report.step("CURRENT POSITIONS AFTER THIRD TRADE").unwrap();
    assert_eq!(quantity_of(third, "DEMO-BOOK", "Z77.SI"), dec!(300));
    let yesterday = report.step("YESTERDAY'S POSITIONS AFTER THIRD TRADE").unwrap();
    assert_eq!(quantity_of(yesterday, "DEMO-BOOK", "Z77.SI"), dec!(200));

    let cancelled = report.step("CURRENT POSITIONS AFTER CANCELLATION").unwrap();
    assert_eq!(quantity_of(cancelled, "DEMO-BOOK", "Z77.SI"), dec!(150));
    let yesterday = report.step("YESTERDAY'S POSITIONS AFTER CANCELLATION").unwrap();
    assert_eq!(quantity_of(yesterday, "DEMO-BOOK", "Z77.SI"), dec!(50));

    let amended = report.step("CURRENT POSITIONS AFTER AMEND").unwrap();
    assert_eq!(quantity_of(amended, "DEMO-BOOK", "Z77.SI"), dec!(110));
    let yesterday = report.step("YESTERDAY'S POSITIONS AFTER AMEND").unwrap();
    assert_eq!(quantity_of(yesterday, "DEMO-BOOK", "Z77.SI"), dec!(10));
}

#[tokio::test]
async fn test_book_transfer_scenario() {
    let reports = scenarios::run(Scenario::BookTransfer, &strict_config(), date(2024, 3, 6))
        .await
        .unwrap();
    let after = reports[0].step("POSITIONS AFTER BOOK TRANSFER").unwrap();

    assert_eq!(quantity_of(after, "BOOK1", "JB355"), dec!(500000));
    assert_eq!(quantity_of(after, "BOOK2", "JB355"), dec!(500000));
    assert_eq!(quantity_of(after, "WASH", "JB355"), dec!(0));
    assert_eq!(quantity_of(after, "BROKER", "JB355"), dec!(-1000000));
}

#[tokio::test]
async fn test_trading_day_scenario() {
    let reports = scenarios::run(Scenario::TradingDay, &strict_config(), date(2024, 3, 6))
        .await
        .unwrap();
    let report = &reports[0];

    // Both trades settle in two days
    let trade_date = report.step("TRADING POSITIONS (Transaction Date)").unwrap();
    assert_eq!(quantity_of(trade_date, "DEMO-BOOK", "0005.HK"), dec!(50));
    let settled = report.step("TRADING POSITIONS (Settlement Date)").unwrap();
    assert!(settled.is_empty());
}

#[tokio::test]
async fn test_fund_investors_scenario() {
    let reports = scenarios::run(Scenario::FundInvestors, &strict_config(), date(2024, 3, 6))
        .await
        .unwrap();
    let holdings = reports[0].step("HOLDINGS").unwrap();

    assert_eq!(quantity_of(holdings, "DEMO-FUND", "DEMO-FUND"), dec!(110));
    assert_eq!(quantity_of(holdings, "ISSUANCE", "DEMO-FUND"), dec!(-100));
    assert_eq!(quantity_of(holdings, "INVESTOR1", "DEMO-FUND"), dec!(-10));
}

#[tokio::test]
async fn test_all_runs_every_scenario_in_order() {
    let reports = scenarios::run(Scenario::All, &Config::test(), date(2024, 3, 6))
        .await
        .unwrap();
    let names: Vec<_> = reports.iter().map(|r| r.scenario).collect();
    assert_eq!(
        names,
        vec![
            Scenario::BackDated,
            Scenario::BookTransfer,
            Scenario::TradingDay,
            Scenario::FundInvestors
        ]
    );

    let json = serde_json::to_value(&reports).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 4);
}
