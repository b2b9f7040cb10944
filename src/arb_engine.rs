//! §4.2 ArbEngine: cross-book arbitrage and value-bet detection over
//! one batch of events.

use std::collections::HashMap;

use chrono::Utc;

use crate::models::{ArbLeg, ArbOpportunity, Event, MarketType, Outcome, Strategy};
use crate::odds_math::{american_to_prob, two_leg_arb_stakes};

#[derive(Debug, Clone, Copy)]
pub struct ArbEngineConfig {
    pub min_edge: f64,
    pub min_edge_value_bet: f64,
    pub max_single_bet: f64,
    pub max_arb_total: f64,
}

impl ArbEngineConfig {
    /// Hard caps are enforced here, not trusted from the caller:
    /// `min(caller_input, platform_max)` per the design's constructor
    /// rule (§9).
    pub fn new(min_edge: f64, min_edge_value_bet: f64, max_single_bet: f64, max_arb_total: f64) -> Self {
        Self {
            min_edge,
            min_edge_value_bet,
            max_single_bet: max_single_bet.min(crate::models::MAX_SINGLE_LEG),
            max_arb_total: max_arb_total.min(crate::models::MAX_ARB_TOTAL),
        }
    }
}

pub struct ArbEngine {
    config: ArbEngineConfig,
}

/// One bookmaker's offer on one outcome, flattened out of the event
/// tree for pairing.
struct Offer<'a> {
    bookmaker: &'a str,
    outcome: &'a Outcome,
    implied_prob: f64,
}

impl ArbEngine {
    pub fn new(config: ArbEngineConfig) -> Self {
        Self { config }
    }

    /// Scans one batch of events and returns opportunities sorted by
    /// edge descending (stable: ties keep discovery order).
    pub fn scan_events(&self, events: &[Event]) -> Vec<ArbOpportunity> {
        let mut out = Vec::new();
        for event in events {
            for market_type in present_market_types(event) {
                let offers = collect_offers(event, market_type);
                out.extend(self.cross_book_arb(event, market_type, &offers));
                out.extend(self.value_bets(event, market_type, &offers));
            }
        }
        out.sort_by(|a, b| b.edge.partial_cmp(&a.edge).unwrap_or(std::cmp::Ordering::Equal));
        out
    }

    fn cross_book_arb(&self, event: &Event, market_type: MarketType, offers: &[Offer]) -> Vec<ArbOpportunity> {
        let pairs = complementary_pairs(market_type, offers);
        let mut out = Vec::new();

        for (side_a, side_b) in pairs {
            let best_a = match lowest_implied_prob(&side_a) {
                Some(o) => o,
                None => continue,
            };
            let best_b = match lowest_implied_prob(&side_b) {
                Some(o) => o,
                None => continue,
            };

            if best_a.bookmaker == best_b.bookmaker {
                continue;
            }

            let edge = 1.0 - (best_a.implied_prob + best_b.implied_prob);
            if edge < self.config.min_edge {
                continue;
            }

            let (stake_a, stake_b) = match two_leg_arb_stakes(self.config.max_arb_total, best_a.implied_prob, best_b.implied_prob) {
                Ok(v) => v,
                Err(_) => continue,
            };

            out.push(ArbOpportunity {
                event_id: event.id.clone(),
                event_name: format!("{} @ {}", event.away_team, event.home_team),
                sport: event.sport.clone(),
                market_type,
                strategy: Strategy::CrossBookArb,
                edge,
                legs: vec![
                    leg_from_offer(best_a, stake_a),
                    leg_from_offer(best_b, stake_b),
                ],
                detected_at: Utc::now(),
                expires_at: Some(event.start_time),
            });
        }

        out
    }

    fn value_bets(&self, event: &Event, market_type: MarketType, offers: &[Offer]) -> Vec<ArbOpportunity> {
        let mut groups: HashMap<String, Vec<&Offer>> = HashMap::new();
        for offer in offers {
            groups.entry(value_bet_key(market_type, offer.outcome)).or_default().push(offer);
        }

        let mut out = Vec::new();
        for members in groups.values() {
            if distinct_bookmakers(members) < 3 {
                continue;
            }

            let consensus = members.iter().map(|o| o.implied_prob).sum::<f64>() / members.len() as f64;

            for offer in members {
                let edge = consensus - offer.implied_prob;
                if edge < self.config.min_edge_value_bet {
                    continue;
                }

                let stake = round_cents(self.config.max_single_bet * (edge / 0.10).min(1.0));

                out.push(ArbOpportunity {
                    event_id: event.id.clone(),
                    event_name: format!("{} @ {}", event.away_team, event.home_team),
                    sport: event.sport.clone(),
                    market_type,
                    strategy: Strategy::ValueBet,
                    edge,
                    legs: vec![leg_from_offer(offer, stake)],
                    detected_at: Utc::now(),
                    expires_at: Some(event.start_time),
                });
            }
        }

        out
    }
}

fn present_market_types(event: &Event) -> Vec<MarketType> {
    let mut seen = Vec::new();
    for book in &event.bookmakers {
        for market in &book.markets {
            if !seen.contains(&market.market_type) {
                seen.push(market.market_type);
            }
        }
    }
    seen
}

/// Flattens every bookmaker's outcomes for one market type into
/// `Offer`s, skipping malformed outcomes (§4.2 failure semantics):
/// zero price, missing point where the market type requires one, or a
/// duplicate outcome name within the same bookmaker/market.
fn collect_offers<'a>(event: &'a Event, market_type: MarketType) -> Vec<Offer<'a>> {
    let mut out = Vec::new();
    for book in &event.bookmakers {
        for market in &book.markets {
            if market.market_type != market_type {
                continue;
            }
            let mut seen_names = Vec::new();
            for outcome in &market.outcomes {
                if outcome.price == 0 {
                    tracing::debug!(bookmaker = %book.bookmaker, "skipping outcome with zero price");
                    continue;
                }
                if market_type != MarketType::H2h && outcome.point.is_none() {
                    tracing::debug!(bookmaker = %book.bookmaker, "skipping outcome missing required point");
                    continue;
                }
                let name_key = outcome.name.to_lowercase();
                if seen_names.contains(&name_key) {
                    tracing::debug!(bookmaker = %book.bookmaker, "skipping duplicate outcome name on one bookmaker");
                    continue;
                }
                seen_names.push(name_key);

                let implied_prob = match american_to_prob(outcome.price) {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                out.push(Offer {
                    bookmaker: &book.bookmaker,
                    outcome,
                    implied_prob,
                });
            }
        }
    }
    out
}

/// Builds the complementary (side_a, side_b) groups per §4.2's
/// market-type-specific pairing rules.
fn complementary_pairs<'a, 'b>(market_type: MarketType, offers: &'b [Offer<'a>]) -> Vec<(Vec<&'b Offer<'a>>, Vec<&'b Offer<'a>>)> {
    match market_type {
        MarketType::H2h => {
            let mut distinct_names: Vec<String> = Vec::new();
            for o in offers {
                let key = o.outcome.name.to_lowercase();
                if !distinct_names.contains(&key) {
                    distinct_names.push(key);
                }
            }
            if distinct_names.len() != 2 {
                return Vec::new();
            }
            let side_a: Vec<&Offer> = offers.iter().filter(|o| o.outcome.name.to_lowercase() == distinct_names[0]).collect();
            let side_b: Vec<&Offer> = offers.iter().filter(|o| o.outcome.name.to_lowercase() == distinct_names[1]).collect();
            vec![(side_a, side_b)]
        }
        MarketType::Spreads => {
            let mut by_abs_point: HashMap<String, Vec<&Offer>> = HashMap::new();
            for o in offers {
                if let Some(point) = o.outcome.point {
                    by_abs_point.entry(format!("{:.3}", point.abs())).or_default().push(o);
                }
            }
            by_abs_point
                .into_values()
                .filter_map(|group| {
                    let negative: Vec<&Offer> = group.iter().filter(|o| o.outcome.point.unwrap_or(0.0) < 0.0).copied().collect();
                    let positive: Vec<&Offer> = group.iter().filter(|o| o.outcome.point.unwrap_or(0.0) > 0.0).copied().collect();
                    if negative.is_empty() || positive.is_empty() {
                        return None;
                    }
                    if negative[0].outcome.name.to_lowercase() == positive[0].outcome.name.to_lowercase() {
                        return None;
                    }
                    Some((negative, positive))
                })
                .collect()
        }
        MarketType::Totals => {
            let mut by_point: HashMap<String, Vec<&Offer>> = HashMap::new();
            for o in offers {
                if let Some(point) = o.outcome.point {
                    by_point.entry(format!("{:.3}", point)).or_default().push(o);
                }
            }
            by_point
                .into_values()
                .filter_map(|group| {
                    let over: Vec<&Offer> = group.iter().filter(|o| o.outcome.name.eq_ignore_ascii_case("over")).copied().collect();
                    let under: Vec<&Offer> = group.iter().filter(|o| o.outcome.name.eq_ignore_ascii_case("under")).copied().collect();
                    if over.is_empty() || under.is_empty() {
                        return None;
                    }
                    Some((over, under))
                })
                .collect()
        }
    }
}

fn value_bet_key(market_type: MarketType, outcome: &Outcome) -> String {
    match market_type {
        MarketType::H2h => outcome.name.to_lowercase(),
        MarketType::Spreads | MarketType::Totals => {
            format!("{}|{:.3}", outcome.name.to_lowercase(), outcome.point.unwrap_or(0.0))
        }
    }
}

fn lowest_implied_prob<'a, 'b>(side: &'b [&'b Offer<'a>]) -> Option<&'b Offer<'a>> {
    side.iter().min_by(|a, b| a.implied_prob.partial_cmp(&b.implied_prob).unwrap_or(std::cmp::Ordering::Equal)).copied()
}

fn distinct_bookmakers(offers: &[&Offer]) -> usize {
    let mut seen = Vec::new();
    for o in offers {
        if !seen.contains(&o.bookmaker) {
            seen.push(o.bookmaker);
        }
    }
    seen.len()
}

fn leg_from_offer(offer: &Offer, stake: f64) -> ArbLeg {
    ArbLeg {
        bookmaker: offer.bookmaker.to_string(),
        outcome_name: offer.outcome.name.clone(),
        american_odds: offer.outcome.price,
        implied_prob: offer.implied_prob,
        stake,
        point: offer.outcome.point,
    }
}

fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
