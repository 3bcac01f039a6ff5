//! Loan pricing and repayment math tests
//!
//! Exercises the pure pricing functions: eligibility tiers, interest rate
//! bounds, collateral ratios, and the simple-interest repayment formula.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use creditvault_server::loan_service::{
    collateral_ratio, interest_rate, min_credit_score, total_due, MAX_RATE, MIN_RATE,
    SECONDS_PER_YEAR,
};

// ============================================================================
// Eligibility Tiers
// ============================================================================

#[test]
fn test_min_credit_score_tiers() {
    assert_eq!(min_credit_score(dec!(500)), 500);
    assert_eq!(min_credit_score(dec!(1000)), 500);
    assert_eq!(min_credit_score(dec!(1000.01)), 600);
    assert_eq!(min_credit_score(dec!(5000)), 600);
    assert_eq!(min_credit_score(dec!(5000.01)), 650);
    assert_eq!(min_credit_score(dec!(10000)), 650);
    assert_eq!(min_credit_score(dec!(10000.01)), 700);
    assert_eq!(min_credit_score(dec!(1000000)), 700);
}

#[test]
fn test_min_credit_score_is_monotonic() {
    let amounts = [
        dec!(1),
        dec!(999),
        dec!(1000),
        dec!(1001),
        dec!(4999),
        dec!(5000),
        dec!(5001),
        dec!(9999),
        dec!(10000),
        dec!(10001),
        dec!(50000),
        dec!(250000),
    ];

    let mut previous = 0;
    for amount in amounts {
        let required = min_credit_score(amount);
        assert!(
            required >= previous,
            "required score dropped from {} to {} at amount {}",
            previous,
            required,
            amount
        );
        previous = required;
    }
}

// ============================================================================
// Interest Rate Pricing
// ============================================================================

#[test]
fn test_rate_stays_within_bounds_for_all_inputs() {
    let scores = [0, 300, 549, 550, 649, 650, 749, 750, 850];
    let amounts = [dec!(1), dec!(1000), dec!(10001), dec!(50001), dec!(999999)];
    let durations = [
        86_400,
        30 * 86_400,
        180 * 86_400,
        181 * 86_400,
        365 * 86_400,
    ];

    for score in scores {
        for amount in amounts {
            for duration in durations {
                let rate = interest_rate(score, amount, duration);
                assert!(
                    (MIN_RATE..=MAX_RATE).contains(&rate),
                    "rate {} out of bounds for score={} amount={} duration={}",
                    rate,
                    score,
                    amount,
                    duration
                );
            }
        }
    }
}

#[test]
fn test_rate_score_tiers() {
    let amount = dec!(1000);
    let duration = 30 * 86_400;

    // Highest matching tier applies once
    assert_eq!(interest_rate(800, amount, duration), 7);
    assert_eq!(interest_rate(750, amount, duration), 7);
    assert_eq!(interest_rate(700, amount, duration), 9);
    assert_eq!(interest_rate(650, amount, duration), 9);
    assert_eq!(interest_rate(600, amount, duration), 10);
    assert_eq!(interest_rate(550, amount, duration), 10);
    assert_eq!(interest_rate(549, amount, duration), 15);
}

#[test]
fn test_rate_amount_and_duration_adjustments() {
    // Neutral score band so only the amount/duration tiers move the rate
    let score = 600;

    assert_eq!(interest_rate(score, dec!(10000), 86_400), 10);
    assert_eq!(interest_rate(score, dec!(10001), 86_400), 11);
    assert_eq!(interest_rate(score, dec!(50001), 86_400), 12);

    assert_eq!(interest_rate(score, dec!(1000), 180 * 86_400), 10);
    assert_eq!(interest_rate(score, dec!(1000), 181 * 86_400), 11);
}

#[test]
fn test_rate_scenario_mid_tier_borrower() {
    // 1000 over 30 days at score 650: base 10 with the -1 score tier and no
    // other adjustment
    assert_eq!(interest_rate(650, dec!(1000), 2_592_000), 9);
}

#[test]
fn test_best_borrower_prices_above_floor() {
    // The largest discount is the -3 score tier, so the cheapest possible
    // loan still prices above the floor
    let rate = interest_rate(850, dec!(100), 86_400);
    assert_eq!(rate, 7);
    assert!(rate >= MIN_RATE);
}

// ============================================================================
// Collateral
// ============================================================================

#[test]
fn test_collateral_ratio_computation() {
    assert_eq!(collateral_ratio(dec!(1600), dec!(1000)), dec!(160));
    assert_eq!(collateral_ratio(dec!(1500), dec!(1000)), dec!(150));
    assert_eq!(collateral_ratio(dec!(749), dec!(500)), dec!(149.8));
}

// ============================================================================
// Repayment Math
// ============================================================================

#[test]
fn test_total_due_formula() {
    // 1000 at 9% annual over 30 days of a 365-day year
    let due = total_due(dec!(1000), 9, 2_592_000);
    let expected = dec!(1000)
        * (Decimal::ONE
            + Decimal::from(9) / Decimal::from(100) * Decimal::from(2_592_000)
                / Decimal::from(SECONDS_PER_YEAR));
    assert_eq!(due, expected);
    assert!(due > dec!(1007) && due < dec!(1008));
}

#[test]
fn test_total_due_full_year_is_principal_plus_rate() {
    let due = total_due(dec!(1000), 10, SECONDS_PER_YEAR);
    assert_eq!(due, dec!(1100));
}

#[test]
fn test_exact_payment_leaves_no_overpayment() {
    let due = total_due(dec!(2500), 12, 90 * 86_400);
    let overpayment = due - due;
    assert_eq!(overpayment, Decimal::ZERO);
}

#[test]
fn test_one_cent_short_is_a_shortfall() {
    let due = total_due(dec!(2500), 12, 90 * 86_400);
    let offered = due - dec!(0.01);
    assert!(offered < due);
    assert_eq!(due - offered, dec!(0.01));
}
