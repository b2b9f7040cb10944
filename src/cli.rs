//! CLI argument surface (§6): one-shot vs loop mode, sport/bookmaker
//! selection, edge thresholds, credential override.

use clap::Parser;

use crate::config::{
    state_bookmaker_preset, RunConfig, DEFAULT_BUDGET_PATH, DEFAULT_CREDIT_THRESHOLD, DEFAULT_INTERVAL_SECS,
    DEFAULT_MIN_EDGE, DEFAULT_MIN_EDGE_VALUE_BET, DEFAULT_OPPORTUNITIES_PATH, DEFAULT_SPORTS,
};

#[derive(Parser, Debug)]
#[command(name = "lineedge")]
#[command(about = "Periodic cross-book arbitrage and value-bet detector for US sportsbook markets")]
pub struct Cli {
    /// Sport keys to poll (default: NFL, NBA, MLB, NHL).
    #[arg(long, value_delimiter = ',')]
    pub sport: Option<Vec<String>>,

    /// Explicit bookmaker keys to restrict fetches to.
    #[arg(long, value_delimiter = ',')]
    pub bookmakers: Option<Vec<String>>,

    /// Two-letter state code selecting a licensed-bookmaker preset.
    #[arg(long)]
    pub state: Option<String>,

    /// Minimum edge for a cross-book arbitrage opportunity.
    #[arg(long, default_value_t = DEFAULT_MIN_EDGE)]
    pub min_edge: f64,

    /// Minimum edge for a value-bet or cross-platform opportunity.
    #[arg(long = "min-edge-vb", default_value_t = DEFAULT_MIN_EDGE_VALUE_BET)]
    pub min_edge_value_bet: f64,

    /// Odds-source API key, overriding `ODDS_API_KEY`.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Run continuously, sleeping `--interval` seconds between cycles.
    #[arg(long)]
    pub r#loop: bool,

    /// Seconds to sleep between cycles in loop mode.
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval: u64,

    /// Enable the cross-platform (binary contract) detector.
    #[arg(long = "cross-platform")]
    pub cross_platform: bool,

    /// Emit one JSON-encoded opportunity record per line.
    #[arg(long)]
    pub json: bool,

    /// Vendor credit threshold below which the cycle aborts further fetches.
    #[arg(long, default_value_t = DEFAULT_CREDIT_THRESHOLD)]
    pub credit_threshold: u32,

    /// Path to the opportunity-tracker state file.
    #[arg(long, default_value = DEFAULT_OPPORTUNITIES_PATH)]
    pub opportunities_path: String,

    /// Path to the budget-tracker state file.
    #[arg(long, default_value = DEFAULT_BUDGET_PATH)]
    pub budget_path: String,
}

/// Resolves CLI args into a `RunConfig`. Returns `Err` (mapped to
/// exit code 1 by the caller) when no credential is available from
/// either `--api-key` or `ODDS_API_KEY`.
pub fn resolve(cli: Cli) -> Result<RunConfig, &'static str> {
    let odds_api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("ODDS_API_KEY").ok())
        .ok_or("missing odds-source credential: pass --api-key or set ODDS_API_KEY")?;

    let contract_api_key = std::env::var("CONTRACT_API_KEY").ok();
    let contract_series = std::env::var("CONTRACT_SERIES").unwrap_or_else(|_| "KXNFLGAME".to_string());

    let sports = cli.sport.unwrap_or_else(|| DEFAULT_SPORTS.iter().map(|s| s.to_string()).collect());

    let bookmakers = cli
        .bookmakers
        .or_else(|| cli.state.as_deref().and_then(state_bookmaker_preset));

    Ok(RunConfig {
        odds_api_key,
        contract_api_key,
        contract_series,
        sports,
        bookmakers,
        min_edge: cli.min_edge,
        min_edge_value_bet: cli.min_edge_value_bet,
        loop_mode: cli.r#loop,
        interval_secs: cli.interval,
        cross_platform: cli.cross_platform,
        json_output: cli.json,
        credit_threshold: cli.credit_threshold,
        opportunities_path: cli.opportunities_path,
        budget_path: cli.budget_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_preset_fills_bookmakers_when_unset() {
        let cli = Cli {
            sport: None,
            bookmakers: None,
            state: Some("NJ".to_string()),
            min_edge: DEFAULT_MIN_EDGE,
            min_edge_value_bet: DEFAULT_MIN_EDGE_VALUE_BET,
            api_key: Some("k".to_string()),
            r#loop: false,
            interval: DEFAULT_INTERVAL_SECS,
            cross_platform: false,
            json: false,
            credit_threshold: DEFAULT_CREDIT_THRESHOLD,
            opportunities_path: DEFAULT_OPPORTUNITIES_PATH.to_string(),
            budget_path: DEFAULT_BUDGET_PATH.to_string(),
        };
        let config = resolve(cli).unwrap();
        assert!(config.bookmakers.unwrap().contains(&"draftkings".to_string()));
    }

    #[test]
    fn missing_credential_is_rejected() {
        std::env::remove_var("ODDS_API_KEY");
        let cli = Cli {
            sport: None,
            bookmakers: None,
            state: None,
            min_edge: DEFAULT_MIN_EDGE,
            min_edge_value_bet: DEFAULT_MIN_EDGE_VALUE_BET,
            api_key: None,
            r#loop: false,
            interval: DEFAULT_INTERVAL_SECS,
            cross_platform: false,
            json: false,
            credit_threshold: DEFAULT_CREDIT_THRESHOLD,
            opportunities_path: DEFAULT_OPPORTUNITIES_PATH.to_string(),
            budget_path: DEFAULT_BUDGET_PATH.to_string(),
        };
        assert!(resolve(cli).is_err());
    }
}
