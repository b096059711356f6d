//! Tradebook demonstration runner
//!
//! Books the demonstration scenarios against an in-memory ledger, logs the
//! positions shown at each step and prints the reports as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Run every scenario
//! cargo run -p tradebook
//!
//! # One scenario, settlement-date positions, two decimals
//! TRADEBOOK_SCENARIO=back-dated TRADEBOOK_DEFAULT_BASIS="Settlement Date" \
//!     TRADEBOOK_DISPLAY_SCALE=2 cargo run -p tradebook
//! ```
//!
//! # Environment Variables
//!
//! - `TRADEBOOK_ENV`: Environment (test, development, production)
//! - `TRADEBOOK_TENANT_ID`: Tenant to book under (default: 1)
//! - `TRADEBOOK_DEFAULT_BASIS`: Transaction Date or Settlement Date
//! - `TRADEBOOK_DISPLAY_SCALE`: Decimal places shown (default: 6)
//! - `TRADEBOOK_STRICT_REFERENCES`: Reject unregistered references (default: true)
//! - `TRADEBOOK_LOG_JSON`: JSON log lines (default: false)
//! - `TRADEBOOK_SCENARIO`: back-dated, book-transfer, trading-day, fund-investors, all

use chrono::Utc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tradebook::{scenarios, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first: it decides the log format
    let config = Config::from_env()?;

    let filter = EnvFilter::from_default_env().add_directive("tradebook=info".parse()?);
    if config.log_json {
        tracing_subscriber::registry().with(fmt::layer().json()).with(filter).init();
    } else {
        tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        tenant = %config.tenant_id,
        basis = %config.default_basis,
        scenario = %config.scenario,
        "Tradebook"
    );

    let reports = scenarios::run(config.scenario, &config, Utc::now().date_naive()).await?;
    println!("{}", serde_json::to_string_pretty(&reports)?);

    Ok(())
}
