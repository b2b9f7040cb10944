//! §4.4 OpportunityTracker: stable identity, TTL dedup, notified bit,
//! atomic JSON persistence.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LineedgeError, Result};
use crate::models::{ArbOpportunity, OpportunityRecord};

#[derive(Debug, Serialize, Deserialize, Default)]
struct PersistedState {
    records: Vec<OpportunityRecord>,
}

pub struct OpportunityTracker {
    records: Vec<OpportunityRecord>,
    ttl: Duration,
    path: PathBuf,
}

impl OpportunityTracker {
    /// Loads from `path` if present; a missing or corrupt file yields
    /// a fresh in-memory state with a logged notice (§4.4, §6).
    pub async fn load(path: impl AsRef<Path>, ttl_secs: i64) -> Self {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<PersistedState>(&contents) {
                Ok(state) => state.records,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "opportunity state corrupt, starting fresh");
                    Vec::new()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "no existing opportunity state, starting fresh");
                Vec::new()
            }
        };

        Self {
            records,
            ttl: Duration::seconds(ttl_secs),
            path,
        }
    }

    /// Stable id: event id, market-type tag, strategy, and the sorted
    /// bookmaker keys of its legs. Deliberately excludes edge, stake,
    /// odds, and timestamps (§4.4).
    pub fn identity(opp: &ArbOpportunity) -> String {
        let mut bookmakers: Vec<&str> = opp.legs.iter().map(|l| l.bookmaker.as_str()).collect();
        bookmakers.sort_unstable();

        let mut hasher = DefaultHasher::new();
        opp.event_id.hash(&mut hasher);
        opp.market_type.as_str().hash(&mut hasher);
        format!("{:?}", opp.strategy).hash(&mut hasher);
        bookmakers.join(",").hash(&mut hasher);

        format!("{:012x}", hasher.finish() & 0xFFFF_FFFF_FFFF)
    }

    /// Ingests a batch, returning the records novel to this call
    /// (§4.4 steps 1–3), and persists the updated state to disk.
    pub async fn ingest(&mut self, opportunities: &[ArbOpportunity]) -> Result<Vec<OpportunityRecord>> {
        let now = Utc::now();
        let mut novel = Vec::new();

        for opp in opportunities {
            let id = Self::identity(opp);

            if let Some(existing) = self.records.iter_mut().find(|r| r.id == id) {
                let age = now - existing.last_seen;
                existing.last_seen = now;
                existing.opportunity = opp.clone();
                existing.expires_at = opp.expires_at;

                if age < self.ttl {
                    continue;
                }
                existing.notified = false;
                novel.push(existing.clone());
            } else {
                let record = OpportunityRecord {
                    id,
                    opportunity: opp.clone(),
                    first_seen: now,
                    last_seen: now,
                    notified: false,
                    expires_at: opp.expires_at,
                };
                self.records.push(record.clone());
                novel.push(record);
            }
        }

        self.save().await?;
        Ok(novel)
    }

    pub fn mark_notified(&mut self, id: &str) {
        if let Some(record) = self.records.iter_mut().find(|r| r.id == id) {
            record.notified = true;
        }
    }

    pub fn get_unnotified(&self) -> Vec<&OpportunityRecord> {
        self.records.iter().filter(|r| !r.notified).collect()
    }

    pub fn get_all(&self) -> Vec<&OpportunityRecord> {
        let mut all: Vec<&OpportunityRecord> = self.records.iter().collect();
        all.sort_by(|a, b| {
            b.opportunity
                .edge
                .partial_cmp(&a.opportunity.edge)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        all
    }

    /// Write-to-temp + rename, matching §4.4's atomicity requirement.
    async fn save(&self) -> Result<()> {
        let state = PersistedState { records: self.records.clone() };
        let json = serde_json::to_string_pretty(&state).map_err(|e| LineedgeError::PersistenceError(e.to_string()))?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArbLeg, MarketType, Strategy};

    fn sample_opp(edge: f64) -> ArbOpportunity {
        ArbOpportunity {
            event_id: "E1".to_string(),
            event_name: "Cowboys @ Eagles".to_string(),
            sport: "americanfootball_nfl".to_string(),
            market_type: MarketType::H2h,
            strategy: Strategy::CrossBookArb,
            edge,
            legs: vec![
                ArbLeg {
                    bookmaker: "draftkings".to_string(),
                    outcome_name: "Eagles".to_string(),
                    american_odds: -120,
                    implied_prob: 0.5455,
                    stake: 55.64,
                    point: None,
                },
                ArbLeg {
                    bookmaker: "fanduel".to_string(),
                    outcome_name: "Cowboys".to_string(),
                    american_odds: 130,
                    implied_prob: 0.4348,
                    stake: 44.36,
                    point: None,
                },
            ],
            detected_at: Utc::now(),
            expires_at: None,
        }
    }

    fn tmp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lineedge-tracker-test-{name}-{}.json", std::process::id()))
    }

    #[tokio::test]
    async fn identity_excludes_edge_stake_and_timestamps() {
        let mut opp_a = sample_opp(0.02);
        let opp_b = sample_opp(0.09);
        opp_a.legs[0].stake = 1.0;
        assert_eq!(OpportunityTracker::identity(&opp_a), OpportunityTracker::identity(&opp_b));
    }

    #[tokio::test]
    async fn dedup_window_matches_seed_scenario() {
        let path = tmp_path("dedup");
        let _ = tokio::fs::remove_file(&path).await;
        let mut tracker = OpportunityTracker::load(&path, 300).await;

        let opp = sample_opp(0.02);
        let first = tracker.ingest(&[opp.clone()]).await.unwrap();
        assert_eq!(first.len(), 1);

        // Simulate a re-presentation inside the TTL window by forcing
        // last_seen backwards only slightly (age < TTL): expect dedup.
        let second = tracker.ingest(&[opp.clone()]).await.unwrap();
        assert!(second.is_empty());

        // Force the stored last_seen outside the TTL window to
        // simulate the t=400s re-presentation from the seed scenario.
        let id = OpportunityTracker::identity(&opp);
        if let Some(r) = tracker.records.iter_mut().find(|r| r.id == id) {
            r.last_seen = Utc::now() - Duration::seconds(400);
            r.notified = true;
        }
        let third = tracker.ingest(&[opp]).await.unwrap();
        assert_eq!(third.len(), 1);
        assert!(!third[0].notified);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn corrupt_state_file_yields_fresh_state() {
        let path = tmp_path("corrupt");
        tokio::fs::write(&path, b"not json").await.unwrap();
        let tracker = OpportunityTracker::load(&path, 300).await;
        assert!(tracker.records.is_empty());
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn get_all_sorted_by_edge_descending() {
        let path = tmp_path("sorted");
        let _ = tokio::fs::remove_file(&path).await;
        let mut tracker = OpportunityTracker::load(&path, 300).await;

        let mut low = sample_opp(0.02);
        low.legs[0].bookmaker = "betmgm".to_string();
        let high = sample_opp(0.09);

        tracker.ingest(&[low, high]).await.unwrap();
        let all = tracker.get_all();
        assert!(all[0].opportunity.edge >= all[1].opportunity.edge);

        let _ = tokio::fs::remove_file(&path).await;
    }
}
