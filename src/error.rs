use thiserror::Error;

/// Crate-wide error type. Variants map 1:1 to the error kinds table
/// in the design: local failures are rejected at the call site,
/// upstream failures carry a remediation hint for the operator
/// channel.
#[derive(Debug, Error)]
pub enum LineedgeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("authentication failed against odds source (check --api-key / ODDS_API_KEY)")]
    AuthError,

    #[error("rate limited by odds source; back off and retry")]
    RateLimited,

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("credit exhausted: {remaining} requests remaining, below threshold")]
    CreditExhausted { remaining: u32 },

    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error("budget violation: {0}")]
    BudgetViolation(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

impl LineedgeError {
    /// One-line remediation hint for the operator-facing output.
    /// No internal stack traces on the happy path (§7).
    pub fn remediation_hint(&self) -> &'static str {
        match self {
            LineedgeError::InvalidInput(_) => "check the input values passed to this call",
            LineedgeError::AuthError => "renew or correct your odds-source API key",
            LineedgeError::RateLimited => "wait for the rate-limit window to reset and retry",
            LineedgeError::UpstreamError(_) => "check odds-source status and retry",
            LineedgeError::CreditExhausted { .. } => "renew API credits before the next cycle",
            LineedgeError::PersistenceError(_) => "check state file permissions and disk space",
            LineedgeError::BudgetViolation(_) => "increase bankroll or wait for pending bets to settle",
            LineedgeError::NotImplemented(_) => "this call is intentionally unimplemented",
        }
    }
}

pub type Result<T> = std::result::Result<T, LineedgeError>;
