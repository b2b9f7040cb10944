//! §4.3 CrossPlatformMatcher: joins binary-contract prices with
//! sportsbook h2h consensus and flags divergences.

use chrono::{DateTime, Duration, Utc};

use crate::config::TeamNames;
use crate::models::{ArbLeg, ArbOpportunity, ContractGame, Event, MarketType, Strategy};
use crate::odds_math::{american_to_prob, prob_to_american};

const MIN_VOLUME_24H: f64 = 5.0;
const SAME_GAME_WINDOW_SECS: i64 = 12 * 60 * 60;
const CONTRACT_PLATFORM_KEY: &str = "contract-platform-key";

pub struct CrossPlatformConfig {
    pub min_edge_value_bet: f64,
    pub max_single_bet: f64,
}

/// One sportsbook offer on a team's moneyline, flattened out of the
/// h2h market for the team→offers index.
struct BookOffer<'a> {
    event: &'a Event,
    bookmaker: &'a str,
    team: &'a str,
    implied_prob: f64,
    american_odds: i32,
}

pub struct CrossPlatformMatcher<'a> {
    team_names: &'a TeamNames,
    config: CrossPlatformConfig,
}

impl<'a> CrossPlatformMatcher<'a> {
    pub fn new(team_names: &'a TeamNames, config: CrossPlatformConfig) -> Self {
        Self { team_names, config }
    }

    pub fn scan<'b>(&self, games: &[ContractGame], events: &'b [Event]) -> Vec<ArbOpportunity> {
        let index = build_team_index(events);
        let mut out = Vec::new();

        for game in games {
            out.extend(self.scan_side(game, true, &index));
            out.extend(self.scan_side(game, false, &index));
        }
        out
    }

    fn scan_side<'b>(&self, game: &ContractGame, home: bool, index: &[BookOffer<'b>]) -> Option<ArbOpportunity> {
        let (market, side_short, opponent_short) = if home {
            (&game.home_market, &game.home_short, &game.away_short)
        } else {
            (&game.away_market, &game.away_short, &game.home_short)
        };

        if market.volume_24h < MIN_VOLUME_24H {
            return None;
        }
        let contract_prob = market.implied_probability()?;

        let side_full = self.team_names.resolve(&game.series, side_short)?;
        let opponent_full = self.team_names.resolve(&game.series, opponent_short)?;

        // Offers on either team's moneyline in an event that matches
        // this game by opponent name and close-time window.
        let event_survivors: Vec<&BookOffer<'b>> = index
            .iter()
            .filter(|o| {
                o.event.home_team.eq_ignore_ascii_case(opponent_full) || o.event.away_team.eq_ignore_ascii_case(opponent_full)
            })
            .filter(|o| within_same_game_window(o.event.start_time, game.close_time))
            .collect();

        if event_survivors.is_empty() {
            return None;
        }

        // Consensus is the mean of the side team's own implied
        // probabilities, not the opponent's (§4.3 step 6).
        let side_offers: Vec<&BookOffer<'b>> = event_survivors
            .iter()
            .copied()
            .filter(|o| o.team.eq_ignore_ascii_case(side_full))
            .collect();

        if side_offers.is_empty() {
            return None;
        }

        let sb_consensus = side_offers.iter().map(|o| o.implied_prob).sum::<f64>() / side_offers.len() as f64;
        let edge = (contract_prob - sb_consensus).abs();
        if edge < self.config.min_edge_value_bet {
            return None;
        }

        let stake = round_cents(self.config.max_single_bet * (edge / 0.10).min(1.0));

        let leg = if contract_prob < sb_consensus {
            let odds = prob_to_american(contract_prob).ok()?;
            ArbLeg {
                bookmaker: CONTRACT_PLATFORM_KEY.to_string(),
                outcome_name: side_full.to_string(),
                american_odds: odds,
                implied_prob: contract_prob,
                stake,
                point: None,
            }
        } else {
            let best = event_survivors
                .iter()
                .copied()
                .filter(|o| o.team.eq_ignore_ascii_case(opponent_full))
                .min_by(|a, b| a.implied_prob.partial_cmp(&b.implied_prob).unwrap_or(std::cmp::Ordering::Equal))?;
            ArbLeg {
                bookmaker: best.bookmaker.to_string(),
                outcome_name: opponent_full.to_string(),
                american_odds: best.american_odds,
                implied_prob: best.implied_prob,
                stake,
                point: None,
            }
        };

        Some(ArbOpportunity {
            event_id: game.event_id.clone(),
            event_name: format!("{} at {}", game.away_full, game.home_full),
            sport: game.series.clone(),
            market_type: MarketType::H2h,
            strategy: Strategy::CrossPlatformValue,
            edge,
            legs: vec![leg],
            detected_at: Utc::now(),
            expires_at: Some(game.close_time),
        })
    }
}

fn within_same_game_window(event_start: DateTime<Utc>, contract_close: DateTime<Utc>) -> bool {
    (event_start - contract_close).abs() <= Duration::seconds(SAME_GAME_WINDOW_SECS)
}

fn build_team_index(events: &[Event]) -> Vec<BookOffer<'_>> {
    let mut out = Vec::new();
    for event in events {
        for book in &event.bookmakers {
            for market in &book.markets {
                if market.market_type != MarketType::H2h {
                    continue;
                }
                for outcome in &market.outcomes {
                    if let Ok(implied_prob) = american_to_prob(outcome.price) {
                        out.push(BookOffer {
                            event,
                            bookmaker: &book.bookmaker,
                            team: &outcome.name,
                            implied_prob,
                            american_odds: outcome.price,
                        });
                    }
                }
            }
        }
    }
    out
}

fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContractMarket, MarketQuote, Outcome, PerBookmakerQuote};
    use chrono::TimeZone;

    fn sample_event(start: DateTime<Utc>) -> Event {
        Event {
            id: "E9".to_string(),
            sport: "americanfootball_nfl".to_string(),
            start_time: start,
            home_team: "Dallas Cowboys".to_string(),
            away_team: "Philadelphia Eagles".to_string(),
            bookmakers: vec![
                PerBookmakerQuote {
                    bookmaker: "fanduel".to_string(),
                    last_update: start,
                    markets: vec![MarketQuote {
                        market_type: MarketType::H2h,
                        outcomes: vec![
                            Outcome { name: "Dallas Cowboys".to_string(), price: -130, point: None },
                            Outcome { name: "Philadelphia Eagles".to_string(), price: 110, point: None },
                        ],
                    }],
                },
                PerBookmakerQuote {
                    bookmaker: "draftkings".to_string(),
                    last_update: start,
                    markets: vec![MarketQuote {
                        market_type: MarketType::H2h,
                        outcomes: vec![
                            Outcome { name: "Dallas Cowboys".to_string(), price: -125, point: None },
                            Outcome { name: "Philadelphia Eagles".to_string(), price: 105, point: None },
                        ],
                    }],
                },
                PerBookmakerQuote {
                    bookmaker: "betmgm".to_string(),
                    last_update: start,
                    markets: vec![MarketQuote {
                        market_type: MarketType::H2h,
                        outcomes: vec![
                            Outcome { name: "Dallas Cowboys".to_string(), price: -135, point: None },
                            Outcome { name: "Philadelphia Eagles".to_string(), price: 115, point: None },
                        ],
                    }],
                },
            ],
        }
    }

    fn sample_game(close: DateTime<Utc>) -> ContractGame {
        ContractGame {
            event_id: "KXNFLGAME-DAL".to_string(),
            series: "NFL".to_string(),
            home_short: "dallas".to_string(),
            home_full: "Dallas Cowboys".to_string(),
            away_short: "philadelphia".to_string(),
            away_full: "Philadelphia Eagles".to_string(),
            home_market: ContractMarket { ticker: "DAL".to_string(), yes_bid: 70, yes_ask: 74, volume_24h: 100.0 },
            away_market: ContractMarket { ticker: "PHI".to_string(), yes_bid: 24, yes_ask: 28, volume_24h: 100.0 },
            close_time: close,
        }
    }

    #[test]
    fn illiquid_market_is_skipped() {
        let close = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let mut game = sample_game(close);
        game.home_market.volume_24h = 1.0;
        let event = sample_event(close);
        let names = TeamNames::load();
        let matcher = CrossPlatformMatcher::new(&names, CrossPlatformConfig { min_edge_value_bet: 0.0, max_single_bet: 50.0 });
        let opps = matcher.scan(&[game], &[event]);
        assert!(opps.iter().all(|o| o.legs[0].outcome_name != "Dallas Cowboys"));
    }

    #[test]
    fn outside_same_game_window_is_skipped() {
        let close = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let far_event_start = close + Duration::hours(13);
        let game = sample_game(close);
        let mut event = sample_event(far_event_start);
        event.id = "far".to_string();
        let names = TeamNames::load();
        let matcher = CrossPlatformMatcher::new(&names, CrossPlatformConfig { min_edge_value_bet: 0.0, max_single_bet: 50.0 });
        let opps = matcher.scan(&[game], &[event]);
        assert!(opps.is_empty());
    }

    #[test]
    fn within_window_and_liquid_produces_opportunity_when_edge_clears() {
        let close = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let game = sample_game(close);
        let event = sample_event(close + Duration::hours(1));
        let names = TeamNames::load();
        let matcher = CrossPlatformMatcher::new(&names, CrossPlatformConfig { min_edge_value_bet: 0.001, max_single_bet: 50.0 });
        let opps = matcher.scan(&[game], &[event]);
        assert!(!opps.is_empty());
        for o in &opps {
            assert_eq!(o.strategy, Strategy::CrossPlatformValue);
            assert_eq!(o.legs.len(), 1);
        }
    }

    #[test]
    fn consensus_uses_only_the_side_teams_own_offers() {
        let close = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let game = sample_game(close);
        let event = sample_event(close);
        let names = TeamNames::load();
        let matcher = CrossPlatformMatcher::new(&names, CrossPlatformConfig { min_edge_value_bet: 0.0, max_single_bet: 50.0 });
        let opps = matcher.scan(&[game], &[event]);

        let home_opp = opps
            .iter()
            .find(|o| o.legs[0].bookmaker != CONTRACT_PLATFORM_KEY)
            .expect("home-side sportsbook-leg opportunity present");

        // Cowboys consensus over -130/-125/-135 is ~0.565, not the
        // ~0.521 a mixed (both teams') average would produce.
        assert!((home_opp.edge - 0.155).abs() < 0.01, "edge was {}", home_opp.edge);
    }

    #[test]
    fn sportsbook_side_leg_matches_its_own_odds() {
        // Cowboys contract (0.72) is overpriced against Cowboys
        // consensus (~0.565), so the home side recommends the
        // opposing sportsbook leg: it must carry an Eagles price, not
        // whichever offer happened to have the lowest implied prob
        // across both teams.
        let close = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let game = sample_game(close);
        let event = sample_event(close);
        let names = TeamNames::load();
        let matcher = CrossPlatformMatcher::new(&names, CrossPlatformConfig { min_edge_value_bet: 0.001, max_single_bet: 50.0 });
        let opps = matcher.scan(&[game], &[event]);

        let eagles_opp = opps
            .iter()
            .find(|o| o.legs[0].outcome_name == "Philadelphia Eagles" && o.legs[0].bookmaker != CONTRACT_PLATFORM_KEY)
            .expect("sportsbook-side eagles opportunity present");
        let leg = &eagles_opp.legs[0];
        // The emitted price must be one of the Eagles' actual quoted
        // prices (105/110/115), never a Cowboys price.
        assert!([105, 110, 115].contains(&leg.american_odds), "odds was {}", leg.american_odds);
    }

    #[test]
    fn unresolved_team_name_is_skipped() {
        let close = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let mut game = sample_game(close);
        game.home_short = "nowhere".to_string();
        let event = sample_event(close);
        let names = TeamNames::load();
        let matcher = CrossPlatformMatcher::new(&names, CrossPlatformConfig { min_edge_value_bet: 0.0, max_single_bet: 50.0 });
        let opps = matcher.scan(&[game], &[event]);
        assert!(opps.iter().all(|o| o.legs[0].outcome_name != "Dallas Cowboys"));
    }
}
