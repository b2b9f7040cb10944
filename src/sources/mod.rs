//! Boundary traits for the two HTTP data sources (§6), plus their
//! production `reqwest` implementations and vendor wire-format types.
//! Trait-boundaried so `ScanDriver` and tests can substitute a fixture
//! source without a live network call.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{LineedgeError, Result};
use crate::models::{Event, MarketQuote, MarketType, Outcome, PerBookmakerQuote};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Vendor-reported API credit remaining after a fetch, extracted from
/// response headers by the credit guard (§5).
#[derive(Debug, Clone, Copy)]
pub struct CreditStatus {
    pub remaining: u32,
    pub used: u32,
}

/// One fetch result: the events for a sport plus the credit status
/// observed on that response.
#[derive(Debug, Clone)]
pub struct SportFetch {
    pub events: Vec<Event>,
    pub credit: Option<CreditStatus>,
}

#[async_trait]
pub trait OddsSource: Send + Sync {
    /// List active sport keys the vendor currently offers odds for.
    async fn list_sports(&self) -> Result<Vec<String>>;

    /// Fetch all events for one sport key, across the requested
    /// market types and (optionally) a bookmaker filter.
    async fn fetch_odds(
        &self,
        sport_key: &str,
        markets: &[MarketType],
        bookmakers: Option<&[String]>,
    ) -> Result<SportFetch>;
}

#[async_trait]
pub trait ContractSource: Send + Sync {
    /// Fetch open paired binary-contract markets for one series key.
    async fn fetch_games(&self, series: &str) -> Result<Vec<crate::models::ContractGame>>;
}

// ── Odds-API wire format ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireSport {
    key: String,
    active: bool,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    id: String,
    sport_key: String,
    commence_time: DateTime<Utc>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<WireBookmaker>,
}

#[derive(Debug, Deserialize)]
struct WireBookmaker {
    key: String,
    #[allow(dead_code)]
    title: String,
    last_update: DateTime<Utc>,
    #[serde(default)]
    markets: Vec<WireMarket>,
}

#[derive(Debug, Deserialize)]
struct WireMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<WireOutcome>,
}

#[derive(Debug, Deserialize)]
struct WireOutcome {
    name: String,
    price: i32,
    point: Option<f64>,
}

fn wire_event_to_event(w: WireEvent) -> Event {
    let bookmakers = w
        .bookmakers
        .into_iter()
        .map(|b| PerBookmakerQuote {
            bookmaker: b.key,
            last_update: b.last_update,
            markets: b
                .markets
                .into_iter()
                .filter_map(|m| {
                    let market_type = MarketType::from_key(&m.key)?;
                    Some(MarketQuote {
                        market_type,
                        outcomes: m
                            .outcomes
                            .into_iter()
                            .map(|o| Outcome {
                                name: o.name,
                                price: o.price,
                                point: o.point,
                            })
                            .collect(),
                    })
                })
                .collect(),
        })
        .collect();

    Event {
        id: w.id,
        sport: w.sport_key,
        start_time: w.commence_time,
        home_team: w.home_team,
        away_team: w.away_team,
        bookmakers,
    }
}

/// Production `OddsSource` backed by `reqwest`, matching the teacher's
/// fetcher shape: GET + query-string auth, status-code → typed-error
/// mapping, credit headers read off every response.
pub struct ReqwestOddsSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ReqwestOddsSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.the-odds-api.com/v4")
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builds with a static timeout config");
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn credit_status(resp: &reqwest::Response) -> Option<CreditStatus> {
        let remaining = resp
            .headers()
            .get("X-Requests-Remaining")?
            .to_str()
            .ok()?
            .parse()
            .ok()?;
        let used = resp
            .headers()
            .get("X-Requests-Used")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        Some(CreditStatus { remaining, used })
    }

    async fn map_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        match resp.status().as_u16() {
            200..=299 => Ok(resp),
            401 => Err(LineedgeError::AuthError),
            429 => Err(LineedgeError::RateLimited),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(LineedgeError::UpstreamError(body))
            }
        }
    }
}

#[async_trait]
impl OddsSource for ReqwestOddsSource {
    async fn list_sports(&self) -> Result<Vec<String>> {
        let url = format!("{}/sports", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("apiKey", &self.api_key)])
            .send()
            .await
            .map_err(|e| LineedgeError::UpstreamError(e.to_string()))?;
        let resp = Self::map_status(resp).await?;
        let sports: Vec<WireSport> = resp
            .json()
            .await
            .map_err(|e| LineedgeError::UpstreamError(e.to_string()))?;
        Ok(sports.into_iter().filter(|s| s.active).map(|s| s.key).collect())
    }

    async fn fetch_odds(
        &self,
        sport_key: &str,
        markets: &[MarketType],
        bookmakers: Option<&[String]>,
    ) -> Result<SportFetch> {
        let markets_param = markets.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(",");
        let mut query = vec![
            ("apiKey".to_string(), self.api_key.clone()),
            ("regions".to_string(), "us".to_string()),
            ("markets".to_string(), markets_param),
        ];
        if let Some(books) = bookmakers {
            if !books.is_empty() {
                query.push(("bookmakers".to_string(), books.join(",")));
            }
        }

        let url = format!("{}/sports/{sport_key}/odds", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| LineedgeError::UpstreamError(e.to_string()))?;
        let resp = Self::map_status(resp).await?;
        let credit = Self::credit_status(&resp);

        let wire_events: Vec<WireEvent> = resp
            .json()
            .await
            .map_err(|e| LineedgeError::UpstreamError(e.to_string()))?;
        let events = wire_events.into_iter().map(wire_event_to_event).collect();

        Ok(SportFetch { events, credit })
    }
}

// ── Contract-API wire format ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireContractMarket {
    ticker: String,
    event_ticker: String,
    title: String,
    yes_bid: u8,
    yes_ask: u8,
    volume_24h: f64,
    close_time: DateTime<Utc>,
}

/// Production `ContractSource` backed by `reqwest`. The wire format
/// pairs home/away sides by `event_ticker` and splits the two legs out
/// of `title` (`"Away at Home Winner?"`) the same way the vendor
/// exposes them, since the API lists markets, not pre-paired games.
pub struct ReqwestContractSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ReqwestContractSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, "https://trading-api.kalshi.com/trade-api/v2")
    }

    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builds with a static timeout config");
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ContractSource for ReqwestContractSource {
    async fn fetch_games(&self, series: &str) -> Result<Vec<crate::models::ContractGame>> {
        let url = format!("{}/markets", self.base_url);
        let mut req = self.client.get(&url).query(&[("series_ticker", series)]);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| LineedgeError::UpstreamError(e.to_string()))?;

        let resp = match resp.status().as_u16() {
            200..=299 => resp,
            401 => return Err(LineedgeError::AuthError),
            429 => return Err(LineedgeError::RateLimited),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                return Err(LineedgeError::UpstreamError(body));
            }
        };

        let markets: Vec<WireContractMarket> = resp
            .json()
            .await
            .map_err(|e| LineedgeError::UpstreamError(e.to_string()))?;

        Ok(pair_contract_markets(series, markets))
    }
}

/// Groups raw markets by `event_ticker` and pairs the two sides,
/// skipping any event that doesn't resolve to exactly two legs — a
/// malformed or partially-published event is logged and dropped
/// rather than failing the whole fetch.
fn pair_contract_markets(series: &str, markets: Vec<WireContractMarket>) -> Vec<crate::models::ContractGame> {
    use std::collections::HashMap as Map;
    let mut grouped: Map<String, Vec<WireContractMarket>> = Map::new();
    for m in markets {
        grouped.entry(m.event_ticker.clone()).or_default().push(m);
    }

    grouped
        .into_iter()
        .filter_map(|(event_ticker, mut sides)| {
            if sides.len() != 2 {
                tracing::debug!(event_ticker, count = sides.len(), "skipping contract event without exactly two sides");
                return None;
            }
            sides.sort_by(|a, b| a.ticker.cmp(&b.ticker));
            let away_side = sides.remove(0);
            let home_side = sides.remove(0);

            let (away_full, home_full) = split_title(&home_side.title)?;

            Some(crate::models::ContractGame {
                event_id: event_ticker,
                series: series.to_string(),
                home_short: home_side.ticker.clone(),
                home_full,
                away_short: away_side.ticker.clone(),
                away_full,
                home_market: crate::models::ContractMarket {
                    ticker: home_side.ticker,
                    yes_bid: home_side.yes_bid,
                    yes_ask: home_side.yes_ask,
                    volume_24h: home_side.volume_24h,
                },
                away_market: crate::models::ContractMarket {
                    ticker: away_side.ticker,
                    yes_bid: away_side.yes_bid,
                    yes_ask: away_side.yes_ask,
                    volume_24h: away_side.volume_24h,
                },
                close_time: home_side.close_time,
            })
        })
        .collect()
}

/// Splits a `"Away at Home Winner?"` title into `(away, home)`.
fn split_title(title: &str) -> Option<(String, String)> {
    let stripped = title.trim_end_matches('?').trim_end_matches("Winner").trim();
    let (away, home) = stripped.split_once(" at ")?;
    Some((away.trim().to_string(), home.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_title_into_away_and_home() {
        let (away, home) = split_title("Philadelphia Eagles at Dallas Cowboys Winner?").unwrap();
        assert_eq!(away, "Philadelphia Eagles");
        assert_eq!(home, "Dallas Cowboys");
    }

    #[test]
    fn malformed_title_fails_to_split() {
        assert!(split_title("not a matchup").is_none());
    }
}
