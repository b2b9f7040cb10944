//! §4.6 ScanDriver: orchestrates one scan cycle, loops on interval.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Duration;

use crate::arb_engine::{ArbEngine, ArbEngineConfig};
use crate::budget::BudgetTracker;
use crate::config::{RunConfig, TeamNames};
use crate::cross_platform::{CrossPlatformConfig, CrossPlatformMatcher};
use crate::error::{LineedgeError, Result};
use crate::models::{ContractGame, Event, MarketType, OpportunityRecord};
use crate::sources::{ContractSource, OddsSource};
use crate::tracker::OpportunityTracker;

const MARKETS: [MarketType; 3] = [MarketType::H2h, MarketType::Spreads, MarketType::Totals];

/// Nominal dollar cost charged to `api_budget` per vendor request,
/// used only to keep the budget's api_spent bucket moving in step
/// with real fetch volume (§4.5); the vendor's own billing unit is a
/// per-bookmaker credit count, not a dollar figure, so this is a
/// coarse proxy, not an invoiced price.
const NOMINAL_COST_PER_REQUEST: f64 = 0.10;

pub struct ScanDriver<O: OddsSource, C: ContractSource> {
    odds_source: O,
    contract_source: Option<C>,
    config: RunConfig,
    team_names: TeamNames,
    tracker: Arc<Mutex<OpportunityTracker>>,
    /// Owned but independent of the scan cycle (§2): the driver only
    /// feeds it api-spend observations. Bet placement itself is out
    /// of scope (§1) and is never invoked from here.
    budget: Arc<Mutex<BudgetTracker>>,
}

impl<O: OddsSource, C: ContractSource> ScanDriver<O, C> {
    pub async fn new(odds_source: O, contract_source: Option<C>, config: RunConfig) -> Self {
        let tracker = OpportunityTracker::load(&config.opportunities_path, crate::config::DEFAULT_TRACKER_TTL_SECS).await;
        let budget = BudgetTracker::load(&config.budget_path).await;
        Self {
            odds_source,
            contract_source,
            team_names: TeamNames::load(),
            config,
            tracker: Arc::new(Mutex::new(tracker)),
            budget: Arc::new(Mutex::new(budget)),
        }
    }

    /// Runs either a single cycle or loops forever on the configured
    /// interval, per §4.6 and §5's non-overlap rule.
    pub async fn run(&self) -> Result<()> {
        loop {
            self.run_cycle().await?;
            if !self.config.loop_mode {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_secs(self.config.interval_secs)).await;
        }
    }

    async fn run_cycle(&self) -> Result<()> {
        let events = self.fetch_all_sports().await?;

        let arb_config = ArbEngineConfig::new(
            self.config.min_edge,
            self.config.min_edge_value_bet,
            crate::models::MAX_SINGLE_LEG,
            crate::models::MAX_ARB_TOTAL,
        );
        let engine = ArbEngine::new(arb_config);
        let mut opportunities = engine.scan_events(&events);

        if self.config.cross_platform {
            if let Some(contract_source) = &self.contract_source {
                let games = self.fetch_contract_games(contract_source).await?;
                let matcher_config = CrossPlatformConfig {
                    min_edge_value_bet: self.config.min_edge_value_bet,
                    max_single_bet: crate::models::MAX_SINGLE_LEG,
                };
                let matcher = CrossPlatformMatcher::new(&self.team_names, matcher_config);
                opportunities.extend(matcher.scan(&games, &events));
            }
        }

        let novel = {
            let mut tracker = self.tracker.lock().await;
            tracker.ingest(&opportunities).await?
        };

        self.report(&novel);
        Ok(())
    }

    /// Fetches every configured sport in turn (§5), checking the
    /// vendor's remaining-credit figure after each response before
    /// issuing the next request. Once it drops below threshold, the
    /// loop stops before firing the next fetch. That's the only point
    /// in the cycle that can actually prevent an overspend, since the
    /// credit count for request N+1 isn't known until request N has
    /// returned.
    async fn fetch_all_sports(&self) -> Result<Vec<Event>> {
        let mut all_events = Vec::new();

        for sport in &self.config.sports {
            let result = self
                .odds_source
                .fetch_odds(sport, &MARKETS, self.config.bookmakers.as_deref())
                .await;

            match result {
                Ok(fetch) => {
                    all_events.extend(fetch.events);
                    {
                        let mut budget = self.budget.lock().await;
                        let _ = budget.record_api_spend(NOMINAL_COST_PER_REQUEST).await;
                    }
                    if let Some(credit) = fetch.credit {
                        if credit.remaining < self.config.credit_threshold {
                            tracing::warn!(remaining = credit.remaining, "credit below threshold, abandoning remaining fetches this cycle");
                            return Err(LineedgeError::CreditExhausted { remaining: credit.remaining });
                        }
                    }
                }
                Err(LineedgeError::UpstreamError(msg)) => {
                    // Fatal to the sport only, not the cycle.
                    tracing::error!(sport, error = %msg, "sport fetch failed");
                }
                Err(e @ (LineedgeError::AuthError | LineedgeError::RateLimited)) => {
                    tracing::error!(sport, error = %e, hint = e.remediation_hint(), "fatal cycle error");
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(all_events)
    }

    async fn fetch_contract_games(&self, source: &C) -> Result<Vec<ContractGame>> {
        source.fetch_games(&self.config.contract_series).await
    }

    fn report(&self, novel: &[OpportunityRecord]) {
        for record in novel {
            if self.config.json_output {
                match serde_json::to_string(record) {
                    Ok(json) => println!("{json}"),
                    Err(e) => tracing::error!(error = %e, "failed to serialize opportunity record"),
                }
            } else {
                let opp = &record.opportunity;
                let legs: Vec<String> = opp
                    .legs
                    .iter()
                    .map(|l| format!("{}@{} ${:.2}", l.outcome_name, l.bookmaker, l.stake))
                    .collect();
                tracing::info!(
                    target: "lineedge::opportunity",
                    strategy = ?opp.strategy,
                    event = %opp.event_name,
                    edge = format!("{:.4}", opp.edge),
                    legs = %legs.join(" / "),
                    "opportunity detected"
                );
            }
        }
    }
}
