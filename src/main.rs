mod arb_engine;
mod budget;
mod cli;
mod config;
mod cross_platform;
mod driver;
mod error;
mod models;
mod odds_math;
mod sources;
mod tracker;

use anyhow::Context;
use clap::Parser;

use cli::Cli;
use driver::ScanDriver;
use sources::{ReqwestContractSource, ReqwestOddsSource};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match cli::resolve(cli) {
        Ok(config) => config,
        Err(msg) => {
            tracing::error!(error = msg, "missing credentials");
            std::process::exit(1);
        }
    };

    let odds_source = ReqwestOddsSource::new(config.odds_api_key.clone());
    let contract_source = Some(ReqwestContractSource::new(config.contract_api_key.clone()));

    let driver = ScanDriver::new(odds_source, contract_source, config).await;

    // The outermost call site: typed errors are downcast into an
    // `anyhow::Error` purely to get a remediation-hint-annotated,
    // one-line operator message before mapping to an exit code.
    let result: anyhow::Result<()> = driver.run().await.context("scan cycle failed");
    if let Err(e) = result {
        tracing::error!(error = %e, "fatal error, exiting");
        std::process::exit(2);
    }
}
