//! Pure odds-conversion and stake-sizing math (§4.1). No state, no I/O.

use crate::error::{LineedgeError, Result};
use crate::models::MAX_SINGLE_LEG;

/// American odds → implied probability.
///
/// `price` must be a nonzero integer with `|price| >= 100` by
/// convention; negative favors the bettor's opponent (favorite),
/// positive is the underdog price.
pub fn american_to_prob(price: i32) -> Result<f64> {
    if price == 0 {
        return Err(LineedgeError::InvalidInput(
            "american odds price must not be zero".into(),
        ));
    }
    let prob = if price < 0 {
        let abs = price.unsigned_abs() as f64;
        abs / (abs + 100.0)
    } else {
        100.0 / (price as f64 + 100.0)
    };
    Ok(prob)
}

/// Implied probability → American odds. `p` must be strictly inside
/// (0, 1).
pub fn prob_to_american(p: f64) -> Result<i32> {
    if !(p > 0.0 && p < 1.0) {
        return Err(LineedgeError::InvalidInput(format!(
            "probability {p} out of range (0, 1)"
        )));
    }
    let odds = if p >= 0.5 {
        -(100.0 * p / (1.0 - p)).round()
    } else {
        (100.0 * (1.0 - p) / p).round()
    };
    Ok(odds as i32)
}

/// American odds → decimal odds (the reciprocal of implied probability).
pub fn american_to_decimal(price: i32) -> Result<f64> {
    Ok(1.0 / american_to_prob(price)?)
}

/// Size a two-leg cross-book arbitrage so both legs earn an equal
/// payout, splitting `total_budget` in proportion `pA : pB`, then
/// clamping so neither leg exceeds `MAX_SINGLE_LEG` (scaling both legs
/// down proportionally if needed). Returns `(stake_a, stake_b)`
/// rounded to the cent.
pub fn two_leg_arb_stakes(total_budget: f64, p_a: f64, p_b: f64) -> Result<(f64, f64)> {
    if p_a + p_b <= 0.0 {
        return Err(LineedgeError::InvalidInput(
            "pA + pB must be positive".into(),
        ));
    }

    let mut stake_a = total_budget * p_a / (p_a + p_b);
    let mut stake_b = total_budget * p_b / (p_a + p_b);

    let largest = stake_a.max(stake_b);
    if largest > MAX_SINGLE_LEG {
        let scale = MAX_SINGLE_LEG / largest;
        stake_a *= scale;
        stake_b *= scale;
    }

    Ok((round_cents(stake_a), round_cents(stake_b)))
}

fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorite_implied_prob() {
        // -150 → 150/250 = 0.6
        assert!((american_to_prob(-150).unwrap() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn underdog_implied_prob() {
        // +150 → 100/250 = 0.4
        assert!((american_to_prob(150).unwrap() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn zero_price_is_invalid() {
        assert!(american_to_prob(0).is_err());
    }

    #[test]
    fn prob_out_of_range_is_invalid() {
        assert!(prob_to_american(0.0).is_err());
        assert!(prob_to_american(1.0).is_err());
    }

    #[test]
    fn round_trip_american_price() {
        // p == 100 sits exactly on the p == 0.5 rounding boundary that
        // probToAmerican's spec explicitly excludes (+100 and -100
        // both imply prob 0.5, which is inherently non-invertible),
        // so the round-trip law is checked away from that one point.
        for p in (137..=10_000).step_by(37) {
            let prob = american_to_prob(p).unwrap();
            assert_eq!(prob_to_american(prob).unwrap(), p);

            let prob_neg = american_to_prob(-p).unwrap();
            assert_eq!(prob_to_american(prob_neg).unwrap(), -p);
        }
    }

    #[test]
    fn round_trip_probability() {
        let mut p = 1u32;
        while p <= 99 {
            let prob = p as f64 / 100.0;
            let american = prob_to_american(prob).unwrap();
            let back = american_to_prob(american).unwrap();
            assert!((back - prob).abs() < 5e-5, "p={prob} back={back}");
            p += 1;
        }
    }

    #[test]
    fn decimal_is_inverse_of_implied_prob() {
        let price = -120;
        let prob = american_to_prob(price).unwrap();
        let dec = american_to_decimal(price).unwrap();
        assert!((dec - 1.0 / prob).abs() < 1e-12);
    }

    #[test]
    fn two_leg_stakes_equalize_payout() {
        let p_a = american_to_prob(130).unwrap(); // FanDuel Cowboys +130
        let p_b = american_to_prob(-120).unwrap(); // DraftKings Eagles -120
        let (stake_a, stake_b) = two_leg_arb_stakes(100.0, p_a, p_b).unwrap();

        assert!((stake_a + stake_b - 100.0).abs() < 0.02);

        let dec_a = american_to_decimal(130).unwrap();
        let dec_b = american_to_decimal(-120).unwrap();
        let payout_a = stake_a * dec_a;
        let payout_b = stake_b * dec_b;
        assert!((payout_a - payout_b).abs() < 0.02);
    }

    #[test]
    fn two_leg_stakes_clamp_to_max_single_leg() {
        // Heavily lopsided probabilities force a larger leg past $50.
        let (stake_a, stake_b) = two_leg_arb_stakes(100.0, 0.9, 0.1).unwrap();
        assert!((stake_a - MAX_SINGLE_LEG).abs() < 1e-9 || (stake_b - MAX_SINGLE_LEG).abs() < 1e-9);
        assert!(stake_a <= MAX_SINGLE_LEG + 1e-9);
        assert!(stake_b <= MAX_SINGLE_LEG + 1e-9);
    }

    #[test]
    fn two_leg_stakes_reject_nonpositive_sum() {
        assert!(two_leg_arb_stakes(100.0, 0.0, 0.0).is_err());
    }
}
