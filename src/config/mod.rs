//! Static, read-only configuration: the run-time knobs assembled from
//! CLI/env (`RunConfig`), the team-name lookup table (§4.7) and the
//! state-licensed bookmaker presets (§4.8). None of this is mutated
//! after construction.

use std::collections::HashMap;

/// Sports polled when the operator passes no explicit `--sport` list.
pub const DEFAULT_SPORTS: &[&str] = &["americanfootball_nfl", "basketball_nba", "baseball_mlb", "icehockey_nhl"];

pub const DEFAULT_MIN_EDGE: f64 = 0.05;
pub const DEFAULT_MIN_EDGE_VALUE_BET: f64 = 0.05;
pub const DEFAULT_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_CREDIT_THRESHOLD: u32 = 10;
pub const DEFAULT_TRACKER_TTL_SECS: i64 = 300;

pub const DEFAULT_OPPORTUNITIES_PATH: &str = "logs/opportunities.json";
pub const DEFAULT_BUDGET_PATH: &str = "logs/budget.json";

/// Fully resolved run parameters, assembled once at startup from CLI
/// args (with env-var and default fallbacks) and never mutated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub odds_api_key: String,
    pub contract_api_key: Option<String>,
    pub contract_series: String,
    pub sports: Vec<String>,
    pub bookmakers: Option<Vec<String>>,
    pub min_edge: f64,
    pub min_edge_value_bet: f64,
    pub loop_mode: bool,
    pub interval_secs: u64,
    pub cross_platform: bool,
    pub json_output: bool,
    pub credit_threshold: u32,
    pub opportunities_path: String,
    pub budget_path: String,
}

/// Resolve a `--state` two-letter code to its licensed bookmaker keys.
/// Unknown codes resolve to `None`, leaving the caller's bookmaker
/// filter unset (i.e. all bookmakers the source returns).
pub fn state_bookmaker_preset(code: &str) -> Option<Vec<String>> {
    state_presets().get(&code.to_uppercase()).cloned()
}

fn state_presets() -> HashMap<String, Vec<String>> {
    let raw: &[(&str, &[&str])] = &[
        ("NJ", &["draftkings", "fanduel", "betmgm", "pointsbetus", "caesars", "bet365"]),
        ("PA", &["draftkings", "fanduel", "betmgm", "unibet", "betrivers"]),
        ("NY", &["draftkings", "fanduel", "betmgm", "caesars", "betrivers"]),
        ("CO", &["draftkings", "fanduel", "betmgm", "pointsbetus", "betrivers", "wynnbet"]),
        ("IL", &["draftkings", "fanduel", "betmgm", "pointsbetus", "betrivers"]),
        ("AZ", &["draftkings", "fanduel", "betmgm", "caesars", "pointsbetus"]),
        ("MI", &["draftkings", "fanduel", "betmgm", "pointsbetus", "betrivers", "wynnbet"]),
        ("VA", &["draftkings", "fanduel", "betmgm", "caesars", "betrivers"]),
        ("TN", &["draftkings", "fanduel", "betmgm", "caesars"]),
        ("IN", &["draftkings", "fanduel", "betmgm", "pointsbetus", "betrivers"]),
    ];
    raw.iter()
        .map(|(code, books)| ((*code).to_string(), books.iter().map(|b| b.to_string()).collect()))
        .collect()
}

/// Team-name lookup (§4.7): resolves a contract-source short name to
/// the full team name as it appears in sportsbook event payloads.
/// Series-specific tables are checked before the sport-agnostic
/// fallback so ambiguous short names (e.g. "chicago") resolve per
/// league.
pub struct TeamNames {
    series_tables: HashMap<String, HashMap<String, String>>,
    fallback: HashMap<String, String>,
}

impl TeamNames {
    pub fn load() -> Self {
        let mut series_tables: HashMap<String, HashMap<String, String>> = HashMap::new();

        series_tables.insert(
            "NBA".to_string(),
            table(&[
                ("chicago", "Chicago Bulls"),
                ("boston", "Boston Celtics"),
                ("la lakers", "Los Angeles Lakers"),
                ("la clippers", "LA Clippers"),
                ("golden state", "Golden State Warriors"),
                ("miami", "Miami Heat"),
                ("dallas", "Dallas Mavericks"),
                ("denver", "Denver Nuggets"),
                ("new york", "New York Knicks"),
                ("philadelphia", "Philadelphia 76ers"),
            ]),
        );
        series_tables.insert(
            "NHL".to_string(),
            table(&[
                ("chicago", "Chicago Blackhawks"),
                ("boston", "Boston Bruins"),
                ("new york rangers", "New York Rangers"),
                ("new york islanders", "New York Islanders"),
                ("dallas", "Dallas Stars"),
                ("colorado", "Colorado Avalanche"),
                ("vegas", "Vegas Golden Knights"),
            ]),
        );
        series_tables.insert(
            "NFL".to_string(),
            table(&[
                ("dallas", "Dallas Cowboys"),
                ("philadelphia", "Philadelphia Eagles"),
                ("new york giants", "New York Giants"),
                ("new york jets", "New York Jets"),
                ("san francisco", "San Francisco 49ers"),
                ("kansas city", "Kansas City Chiefs"),
                ("buffalo", "Buffalo Bills"),
                ("miami", "Miami Dolphins"),
            ]),
        );
        series_tables.insert(
            "MLB".to_string(),
            table(&[
                ("chicago cubs", "Chicago Cubs"),
                ("chicago white sox", "Chicago White Sox"),
                ("new york yankees", "New York Yankees"),
                ("new york mets", "New York Mets"),
                ("los angeles dodgers", "Los Angeles Dodgers"),
                ("boston", "Boston Red Sox"),
            ]),
        );

        // Sport-agnostic fallback for names that don't collide across
        // leagues; checked only on a series-table miss.
        let fallback = table(&[
            ("dallas", "Dallas Cowboys"),
            ("boston", "Boston Celtics"),
            ("philadelphia", "Philadelphia Eagles"),
        ]);

        Self { series_tables, fallback }
    }

    /// Resolve `short_name` under `series` first, then the
    /// sport-agnostic table. Returns `None` if neither resolves it —
    /// callers must skip, never guess (§9 Open Question 3).
    pub fn resolve(&self, series: &str, short_name: &str) -> Option<&str> {
        let key = short_name.to_lowercase();
        if let Some(table) = self.series_tables.get(series) {
            if let Some(full) = table.get(&key) {
                return Some(full.as_str());
            }
        }
        self.fallback.get(&key).map(|s| s.as_str())
    }
}

fn table(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}
