//! Money arithmetic used by the resolver and payment adjustments.
//!
//! No catalog access and no I/O.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Round to `places` decimals, ties to even.
///
/// Used for payment-method deltas, which are cents rather than whole
/// increments.
///
/// ```
/// use rust_decimal_macros::dec;
/// use court_pricing::pricing::round_money;
///
/// assert_eq!(round_money(dec!(24.125), 2), dec!(24.12));
/// assert_eq!(round_money(dec!(24.135), 2), dec!(24.14));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Round to the nearest multiple of `increment`, halves up.
///
/// Halves go towards positive infinity, so -1050 rounds to -1000. A zero or
/// negative increment, or an amount too large to divide, is left untouched.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use court_pricing::pricing::round_to_increment;
///
/// assert_eq!(round_to_increment(dec!(2449), dec!(100)), dec!(2400));
/// assert_eq!(round_to_increment(dec!(2450), dec!(100)), dec!(2500));
/// ```
pub fn round_to_increment(amount: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return amount;
    }
    let Some(steps) = amount.checked_div(increment) else {
        return amount;
    };
    let strategy = if steps.is_sign_negative() {
        RoundingStrategy::MidpointTowardZero
    } else {
        RoundingStrategy::MidpointAwayFromZero
    };
    steps
        .round_dp_with_strategy(0, strategy)
        .checked_mul(increment)
        .map_or(amount, |rounded| rounded.normalize())
}

/// `percent` percent of `amount`, or `None` on overflow.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)
}

/// Price of `hours` at an hourly `rate`, or `None` on overflow.
pub fn hourly_total(rate: Decimal, hours: Decimal) -> Option<Decimal> {
    rate.checked_mul(hours)
}
