use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard platform caps (§4.2, §9). Caller-supplied config is always
/// clamped to these at the engine constructor — never exceeded.
pub const MAX_SINGLE_LEG: f64 = 50.0;
pub const MAX_ARB_TOTAL: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    H2h,
    Spreads,
    Totals,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::H2h => "h2h",
            MarketType::Spreads => "spreads",
            MarketType::Totals => "totals",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "h2h" => Some(MarketType::H2h),
            "spreads" => Some(MarketType::Spreads),
            "totals" => Some(MarketType::Totals),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CrossBookArb,
    ValueBet,
    CrossPlatformValue,
}

/// A single outcome quoted by one bookmaker in one market.
///
/// Invariant (market type ⇒ point): h2h outcomes never carry a point;
/// spreads and totals outcomes always do. Enforced by callers
/// constructing an `Outcome` for a given `MarketType`, since the wire
/// format doesn't distinguish at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub name: String,
    pub price: i32,
    pub point: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub market_type: MarketType,
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerBookmakerQuote {
    pub bookmaker: String,
    pub last_update: DateTime<Utc>,
    pub markets: Vec<MarketQuote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub sport: String,
    pub start_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub bookmakers: Vec<PerBookmakerQuote>,
}

/// One side (home or away) of a paired binary event-contract market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractMarket {
    pub ticker: String,
    pub yes_bid: u8,
    pub yes_ask: u8,
    pub volume_24h: f64,
}

impl ContractMarket {
    /// (bid + ask) / 200, defined whenever the ask side is quoted.
    /// The spec requires ask > 0; bid may legitimately be 0.
    pub fn implied_probability(&self) -> Option<f64> {
        if self.yes_ask == 0 {
            return None;
        }
        Some((self.yes_bid as f64 + self.yes_ask as f64) / 200.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractGame {
    pub event_id: String,
    pub series: String,
    pub home_short: String,
    pub home_full: String,
    pub away_short: String,
    pub away_full: String,
    pub home_market: ContractMarket,
    pub away_market: ContractMarket,
    pub close_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbLeg {
    pub bookmaker: String,
    pub outcome_name: String,
    pub american_odds: i32,
    pub implied_prob: f64,
    pub stake: f64,
    pub point: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbOpportunity {
    pub event_id: String,
    pub event_name: String,
    pub sport: String,
    pub market_type: MarketType,
    pub strategy: Strategy,
    pub edge: f64,
    pub legs: Vec<ArbLeg>,
    pub detected_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Tracker-owned projection of an `ArbOpportunity`, carrying the
/// stable identity and dedup bookkeeping described in §4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityRecord {
    pub id: String,
    pub opportunity: ArbOpportunity,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub notified: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Pending,
    Win,
    Loss,
    Void,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRecord {
    pub id: String,
    pub event_id: String,
    pub outcome: String,
    pub bookmaker: String,
    pub american_odds: i32,
    pub stake: f64,
    pub status: BetStatus,
    pub payout: f64,
    pub pnl: f64,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetState {
    pub api_budget: f64,
    pub betting_bankroll: f64,
    pub reserve: f64,
    pub api_spent: f64,
    pub betting_pnl: f64,
    pub bets_placed: u64,
    pub bets_settled: u64,
    pub bets: Vec<BetRecord>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Monotonic counter backing `bet_%06d` ids; never reset on settle.
    pub next_bet_seq: u64,
}

impl BudgetState {
    /// Fresh state per §3: 1000.0 = 60 (api) + 200 (bankroll) + 740 (reserve).
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            api_budget: 60.0,
            betting_bankroll: 200.0,
            reserve: 740.0,
            api_spent: 0.0,
            betting_pnl: 0.0,
            bets_placed: 0,
            bets_settled: 0,
            bets: Vec::new(),
            created_at: now,
            last_updated: now,
            next_bet_seq: 1,
        }
    }

    pub fn pending_stakes(&self) -> f64 {
        self.bets
            .iter()
            .filter(|b| b.status == BetStatus::Pending)
            .map(|b| b.stake)
            .sum()
    }

    pub fn available_bankroll(&self) -> f64 {
        self.betting_bankroll + self.betting_pnl - self.pending_stakes()
    }

    pub fn can_release_reserve(&self) -> bool {
        self.bets_settled >= 10 && self.betting_pnl > 0.0 && self.reserve > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_budget_sums_to_total() {
        let s = BudgetState::fresh(Utc::now());
        assert_eq!(s.api_budget + s.betting_bankroll + s.reserve, 1000.0);
    }

    #[test]
    fn contract_market_implied_probability() {
        let m = ContractMarket {
            ticker: "T".into(),
            yes_bid: 40,
            yes_ask: 60,
            volume_24h: 10.0,
        };
        assert_eq!(m.implied_probability(), Some(0.5));
    }

    #[test]
    fn contract_market_no_ask_is_undefined() {
        let m = ContractMarket {
            ticker: "T".into(),
            yes_bid: 0,
            yes_ask: 0,
            volume_24h: 10.0,
        };
        assert_eq!(m.implied_probability(), None);
    }
}
