//! §4.5 BudgetTracker: three-bucket allocation, bet lifecycle, reserve
//! release policy, persisted state.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{LineedgeError, Result};
use crate::models::{BetRecord, BetStatus, BudgetState, MAX_SINGLE_LEG};

const RESERVE_RELEASE_CAP: f64 = 100.0;

pub struct BudgetTracker {
    state: BudgetState,
    path: PathBuf,
}

impl BudgetTracker {
    /// Loads from `path` if present; a missing or corrupt file yields
    /// a fresh `BudgetState` with a logged notice (§6).
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<BudgetState>(&contents) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "budget state corrupt, starting fresh");
                    BudgetState::fresh(Utc::now())
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "no existing budget state, starting fresh");
                BudgetState::fresh(Utc::now())
            }
        };
        Self { state, path }
    }

    pub fn state(&self) -> &BudgetState {
        &self.state
    }

    pub async fn record_api_spend(&mut self, amount: f64) -> Result<()> {
        self.state.api_spent += amount;
        if self.state.api_spent > self.state.api_budget {
            tracing::warn!(
                spent = self.state.api_spent,
                budget = self.state.api_budget,
                "api spend exceeded budget"
            );
        }
        self.state.last_updated = Utc::now();
        self.persist().await
    }

    /// Returns `None` (no record created) if the stake exceeds
    /// available bankroll — a soft-fail per §7's BudgetViolation
    /// policy, not a hard error.
    pub async fn record_bet(
        &mut self,
        event_id: &str,
        outcome: &str,
        bookmaker: &str,
        american_odds: i32,
        stake: f64,
    ) -> Result<Option<BetRecord>> {
        if stake > self.state.available_bankroll() {
            tracing::warn!(stake, available = self.state.available_bankroll(), "bet rejected: exceeds available bankroll");
            return Ok(None);
        }

        let clamped_stake = if stake > MAX_SINGLE_LEG {
            tracing::warn!(stake, cap = MAX_SINGLE_LEG, "bet stake clamped to max single leg");
            MAX_SINGLE_LEG
        } else {
            stake
        };

        let id = format!("bet_{:06}", self.state.next_bet_seq);
        self.state.next_bet_seq += 1;

        let record = BetRecord {
            id,
            event_id: event_id.to_string(),
            outcome: outcome.to_string(),
            bookmaker: bookmaker.to_string(),
            american_odds,
            stake: clamped_stake,
            status: BetStatus::Pending,
            payout: 0.0,
            pnl: 0.0,
            placed_at: Utc::now(),
            settled_at: None,
        };

        self.state.bets.push(record.clone());
        self.state.bets_placed += 1;
        self.state.last_updated = Utc::now();
        self.persist().await?;
        Ok(Some(record))
    }

    pub async fn record_win(&mut self, bet_id: &str) -> Result<()> {
        self.settle(bet_id, |bet| {
            let payout = if bet.american_odds < 0 {
                bet.stake + bet.stake * (100.0 / bet.american_odds.unsigned_abs() as f64)
            } else {
                bet.stake + bet.stake * (bet.american_odds as f64 / 100.0)
            };
            (BetStatus::Win, payout, payout - bet.stake)
        })
        .await
    }

    pub async fn record_loss(&mut self, bet_id: &str) -> Result<()> {
        self.settle(bet_id, |bet| (BetStatus::Loss, 0.0, -bet.stake)).await?;
        if self.state.available_bankroll() <= 0.0 {
            tracing::warn!(bet_id, "loss recorded and available bankroll is now exhausted");
        }
        Ok(())
    }

    pub async fn record_void(&mut self, bet_id: &str) -> Result<()> {
        self.settle(bet_id, |bet| (BetStatus::Void, bet.stake, 0.0)).await
    }

    async fn settle(&mut self, bet_id: &str, compute: impl FnOnce(&BetRecord) -> (BetStatus, f64, f64)) -> Result<()> {
        let bet = match self.state.bets.iter_mut().find(|b| b.id == bet_id) {
            Some(b) => b,
            None => return Err(LineedgeError::InvalidInput(format!("unknown bet id {bet_id}"))),
        };
        if bet.status != BetStatus::Pending {
            // Already settled: a no-op per §4.5's "exactly once" rule.
            return Ok(());
        }

        let (status, payout, pnl) = compute(bet);
        bet.status = status;
        bet.payout = payout;
        bet.pnl = pnl;
        bet.settled_at = Some(Utc::now());

        self.state.betting_pnl += pnl;
        self.state.bets_settled += 1;
        self.state.last_updated = Utc::now();
        self.persist().await
    }

    pub async fn release_from_reserve(&mut self, amount: f64) -> Result<f64> {
        if !self.state.can_release_reserve() {
            return Err(LineedgeError::BudgetViolation(
                "reserve release requires bets_settled >= 10, positive betting_pnl, and reserve > 0".to_string(),
            ));
        }
        let released = amount.min(RESERVE_RELEASE_CAP).min(self.state.reserve);
        self.state.reserve -= released;
        self.state.betting_bankroll += released;
        self.state.last_updated = Utc::now();
        self.persist().await?;
        Ok(released)
    }

    async fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.state).map_err(|e| LineedgeError::PersistenceError(e.to_string()))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&path, &json))
            .await
            .map_err(|e| LineedgeError::PersistenceError(e.to_string()))??;
        Ok(())
    }
}

fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LineedgeError::PersistenceError(e.to_string()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents).map_err(|e| LineedgeError::PersistenceError(e.to_string()))?;
    std::fs::rename(&tmp_path, path).map_err(|e| LineedgeError::PersistenceError(e.to_string()))?;
    Ok(())
}
