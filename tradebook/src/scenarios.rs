//! Demonstration scenarios.
//!
//! Each scenario registers its reference data, books a short trading story
//! against a fresh in-memory service and records the positions it shows
//! along the way. The binary logs them and prints the reports.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use tradebook_domain::{
    AccountingBasis, AssetId, BookId, Currency, PartyId, Position, Price, Quantity, TenantId,
    TransactionAction, TransactionDraft, TransactionId,
};
use tradebook_ledger::TransferRequest;
use tradebook_positions::{PositionFilter, PositionQuery};

use crate::config::Config;
use crate::error::{ServiceError, ServiceResult};
use crate::service::TransactionService;

/// Which scenario(s) to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scenario {
    BackDated,
    BookTransfer,
    TradingDay,
    FundInvestors,
    All,
}

impl Scenario {
    const EACH: [Scenario; 4] = [
        Scenario::BackDated,
        Scenario::BookTransfer,
        Scenario::TradingDay,
        Scenario::FundInvestors,
    ];

    /// Concrete scenarios this selection stands for
    pub fn expand(&self) -> Vec<Scenario> {
        match self {
            Scenario::All => Self::EACH.to_vec(),
            single => vec![*single],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::BackDated => "back-dated",
            Scenario::BookTransfer => "book-transfer",
            Scenario::TradingDay => "trading-day",
            Scenario::FundInvestors => "fund-investors",
            Scenario::All => "all",
        }
    }
}

impl FromStr for Scenario {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "back-dated" | "back-dated-transactions" | "backdated" => Ok(Scenario::BackDated),
            "book-transfer" => Ok(Scenario::BookTransfer),
            "trading-day" => Ok(Scenario::TradingDay),
            "fund-investors" => Ok(Scenario::FundInvestors),
            "all" => Ok(Scenario::All),
            _ => Err(ServiceError::Config(format!(
                "Invalid TRADEBOOK_SCENARIO: {}. Expected: back-dated, book-transfer, \
                 trading-day, fund-investors, all",
                s
            ))),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Positions shown at one step of a scenario
#[derive(Debug, Clone, Serialize)]
pub struct ReportStep {
    pub heading: String,
    pub positions: Vec<Position>,
}

/// Everything a scenario showed, in order
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub steps: Vec<ReportStep>,
}

impl ScenarioReport {
    /// Positions shown under `heading`
    pub fn step(&self, heading: &str) -> Option<&[Position]> {
        self.steps.iter().find(|s| s.heading == heading).map(|s| s.positions.as_slice())
    }
}

struct Recorder<'a> {
    service: &'a TransactionService,
    display_scale: u32,
    report: ScenarioReport,
}

impl<'a> Recorder<'a> {
    fn new(service: &'a TransactionService, config: &Config, scenario: Scenario) -> Self {
        info!(%scenario, tenant = %config.tenant_id, "Scenario started");
        Self {
            service,
            display_scale: config.display_scale,
            report: ScenarioReport {
                scenario,
                steps: Vec::new(),
            },
        }
    }

    fn show(&mut self, heading: &str, positions: Vec<Position>) {
        self.service.log_positions(heading, &positions, self.display_scale);
        self.report.steps.push(ReportStep {
            heading: heading.to_string(),
            positions,
        });
    }

    fn finish(self) -> ScenarioReport {
        info!(scenario = %self.report.scenario, steps = self.report.steps.len(), "Scenario finished");
        self.report
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Run the selected scenario(s), each against its own fresh service.
pub async fn run(
    scenario: Scenario,
    config: &Config,
    today: NaiveDate,
) -> ServiceResult<Vec<ScenarioReport>> {
    let mut reports = Vec::new();
    for single in scenario.expand() {
        let service = TransactionService::in_memory(config);
        let report = match single {
            Scenario::BackDated => back_dated(&service, config, today).await?,
            Scenario::BookTransfer => book_transfer(&service, config, today).await?,
            Scenario::TradingDay => trading_day(&service, config, today).await?,
            Scenario::FundInvestors => fund_investors(&service, config, today).await?,
            Scenario::All => continue,
        };
        reports.push(report);
    }
    Ok(reports)
}

struct Trade<'a> {
    id: Option<&'a str>,
    action: TransactionAction,
    asset: &'a str,
    book: &'a str,
    counterparty: &'a str,
    traded: NaiveDate,
    settles: NaiveDate,
    quantity: Decimal,
    price: Decimal,
    currency: &'a str,
}

impl Trade<'_> {
    fn draft(&self, tenant_id: TenantId) -> ServiceResult<TransactionDraft> {
        Ok(TransactionDraft {
            tenant_id,
            transaction_id: self.id.map(TransactionId::new).transpose()?,
            action: self.action,
            asset_id: AssetId::new(self.asset)?,
            asset_book_id: BookId::new(self.book)?,
            counterparty_book_id: BookId::new(self.counterparty)?,
            transaction_date: self.traded,
            settlement_date: self.settles,
            quantity: Quantity::new(self.quantity)?,
            price: Price::new(self.price)?,
            currency: Currency::new(self.currency)?,
            transfer_id: None,
        })
    }
}

async fn register(
    service: &TransactionService,
    tenant_id: TenantId,
    books: &[&str],
    parties: &[&str],
    assets: &[(TenantId, &str)],
) -> ServiceResult<()> {
    let directory = service.references();
    for id in books {
        directory.register_book(tenant_id, &BookId::new(*id)?).await;
    }
    for id in parties {
        directory.register_party(tenant_id, &PartyId::new(*id)?).await;
    }
    for (scope, id) in assets {
        directory.register_asset(*scope, &AssetId::new(*id)?).await;
    }
    Ok(())
}

fn book_filter(id: &str) -> ServiceResult<PositionFilter> {
    Ok(PositionFilter::all().with_books([BookId::new(id)?]))
}

async fn search(
    service: &TransactionService,
    query: PositionQuery,
) -> ServiceResult<Vec<Position>> {
    let mut sets = service.position_search(&query).await?;
    Ok(sets.pop().map(|set| set.positions).unwrap_or_default())
}

/// Back-dated bookings, a cancellation and an amendment, viewed today and
/// as of yesterday.
pub async fn back_dated(
    service: &TransactionService,
    config: &Config,
    today: NaiveDate,
) -> ServiceResult<ScenarioReport> {
    let tenant = config.tenant_id;
    let (yesterday, ereyesterday) = (today - Duration::days(1), today - Duration::days(2));
    let (tomorrow, overmorrow) = (today + Duration::days(1), today + Duration::days(2));
    register(service, tenant, &["DEMO-BOOK", "BROKER"], &["BROKER"], &[(TenantId::SHARED, "Z77.SI")])
        .await?;

    let mut recorder = Recorder::new(service, config, Scenario::BackDated);
    let buy = |traded, settles, quantity| Trade {
        id: None,
        action: TransactionAction::Buy,
        asset: "Z77.SI",
        book: "DEMO-BOOK",
        counterparty: "BROKER",
        traded,
        settles,
        quantity,
        price: dec!(3.92),
        currency: "SGD",
    };
    let yesterday_query = || -> ServiceResult<PositionQuery> {
        Ok(PositionQuery::new(tenant, yesterday)
            .with_filter(book_filter("DEMO-BOOK")?)
            .with_bases([AccountingBasis::TransactionDate]))
    };

    service.book(buy(today, overmorrow, dec!(100)).draft(tenant)?).await?;
    recorder.show(
        "CURRENT POSITIONS AFTER FIRST TRADE",
        service.positions_by_asset_manager(tenant, Some(today), None).await?,
    );

    let yesterdays = service.book(buy(yesterday, tomorrow, dec!(150)).draft(tenant)?).await?;
    recorder.show(
        "CURRENT POSITIONS AFTER SECOND TRADE",
        service.positions_by_asset_manager(tenant, Some(today), None).await?,
    );

    let ereyesterdays = service.book(buy(ereyesterday, today, dec!(50)).draft(tenant)?).await?;
    recorder.show(
        "CURRENT POSITIONS AFTER THIRD TRADE",
        service.positions_by_asset_manager(tenant, Some(today), None).await?,
    );
    recorder.show(
        "YESTERDAY'S POSITIONS AFTER THIRD TRADE",
        search(service, yesterday_query()?).await?,
    );

    service.cancel(tenant, &yesterdays).await?;
    recorder.show(
        "CURRENT POSITIONS AFTER CANCELLATION",
        service.positions_by_asset_manager(tenant, Some(today), None).await?,
    );
    recorder.show(
        "YESTERDAY'S POSITIONS AFTER CANCELLATION",
        search(service, yesterday_query()?).await?,
    );

    let mut edited = service.retrieve(tenant, &ereyesterdays).await?;
    edited.quantity = Quantity::new(dec!(10))?;
    service.amend(&edited).await?;
    recorder.show(
        "CURRENT POSITIONS AFTER AMEND",
        service.positions_by_asset_manager(tenant, Some(today), None).await?,
    );
    recorder.show("YESTERDAY'S POSITIONS AFTER AMEND", search(service, yesterday_query()?).await?);

    Ok(recorder.finish())
}

/// A bond bought into one book, half of it moved to a second book.
pub async fn book_transfer(
    service: &TransactionService,
    config: &Config,
    today: NaiveDate,
) -> ServiceResult<ScenarioReport> {
    let tenant = config.tenant_id;
    register(
        service,
        tenant,
        &["BOOK1", "BOOK2", "WASH", "BROKER"],
        &["BROKER"],
        &[(TenantId::SHARED, "JB355")],
    )
    .await?;

    let mut recorder = Recorder::new(service, config, Scenario::BookTransfer);
    let buy = Trade {
        id: None,
        action: TransactionAction::Buy,
        asset: "JB355",
        book: "BOOK1",
        counterparty: "BROKER",
        traded: today,
        settles: today + Duration::days(2),
        quantity: dec!(1000000),
        price: dec!(100.487),
        currency: "JPY",
    };
    service.book(buy.draft(tenant)?).await?;
    recorder.show(
        "POSITIONS AFTER FIRST TRADE",
        service.positions_by_asset_manager(tenant, Some(today), None).await?,
    );

    let transfer_id = service
        .book_transfer(TransferRequest {
            tenant_id: tenant,
            source_book_id: BookId::new("BOOK1")?,
            target_book_id: BookId::new("BOOK2")?,
            wash_book_id: BookId::new("WASH")?,
            asset_id: AssetId::new("JB355")?,
            quantity: Quantity::new(dec!(500000))?,
            price: Price::new(dec!(100.45))?,
            currency: Currency::new("JPY")?,
            date: Some(today),
            transfer_id: None,
        })
        .await?;
    info!(%transfer_id, "Book transfer booked");
    recorder.show(
        "POSITIONS AFTER BOOK TRANSFER",
        service.positions_by_asset_manager(tenant, Some(today), None).await?,
    );

    Ok(recorder.finish())
}

/// A buy and a sell on the same day, shown for the trading book.
pub async fn trading_day(
    service: &TransactionService,
    config: &Config,
    today: NaiveDate,
) -> ServiceResult<ScenarioReport> {
    let tenant = config.tenant_id;
    let settles = today + Duration::days(2);
    register(service, tenant, &["DEMO-BOOK", "BROKER"], &["BROKER"], &[(TenantId::SHARED, "0005.HK")])
        .await?;

    let mut recorder = Recorder::new(service, config, Scenario::TradingDay);
    let trade = |id, action, quantity, price| Trade {
        id: Some(id),
        action,
        asset: "0005.HK",
        book: "DEMO-BOOK",
        counterparty: "BROKER",
        traded: today,
        settles,
        quantity,
        price,
        currency: "HKD",
    };
    service
        .book(trade("transaction1", TransactionAction::Buy, dec!(100), dec!(63)).draft(tenant)?)
        .await?;
    service
        .book(trade("transaction2", TransactionAction::Sell, dec!(50), dec!(63.5)).draft(tenant)?)
        .await?;

    let query = PositionQuery::new(tenant, today)
        .with_filter(book_filter("DEMO-BOOK")?)
        .with_bases(AccountingBasis::ALL);
    for set in service.position_search(&query).await? {
        recorder.show(&format!("TRADING POSITIONS ({})", set.basis), set.positions);
    }

    Ok(recorder.finish())
}

/// Share creation into a fund and one investor subscription.
pub async fn fund_investors(
    service: &TransactionService,
    config: &Config,
    today: NaiveDate,
) -> ServiceResult<ScenarioReport> {
    let tenant = config.tenant_id;
    register(
        service,
        tenant,
        &["DEMO-FUND", "INVESTOR1", "ISSUANCE"],
        &["DEMO-FUND", "TRADER-JOE", "INVESTOR1"],
        &[(tenant, "DEMO-FUND")],
    )
    .await?;

    let mut recorder = Recorder::new(service, config, Scenario::FundInvestors);
    let creation = Trade {
        id: Some("SHARE-CREATION"),
        action: TransactionAction::Acquire,
        asset: "DEMO-FUND",
        book: "DEMO-FUND",
        counterparty: "ISSUANCE",
        traded: today,
        settles: today,
        quantity: dec!(100),
        price: Decimal::ZERO,
        currency: "USD",
    };
    service.book(creation.draft(tenant)?).await?;

    let subscription = Trade {
        id: Some("SUBSCRIPTION-ONE"),
        action: TransactionAction::Subscription,
        counterparty: "INVESTOR1",
        settles: today + Duration::days(1),
        quantity: dec!(10),
        price: dec!(1000000),
        ..creation
    };
    service.book(subscription.draft(tenant)?).await?;

    let query = PositionQuery::new(tenant, today).with_filter(
        PositionFilter::all().with_assets([AssetId::new("DEMO-FUND")?]),
    );
    recorder.show("HOLDINGS", search(service, query).await?);

    Ok(recorder.finish())
}
