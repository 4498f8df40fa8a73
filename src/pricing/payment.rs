//! Payment-method surcharge/discount, applied after `quote()`.

use tracing::debug;

use super::calculators::{percent_of, round_money};
use super::models::{Adjustment, AdjustmentKind, PaymentMethodAdjustment, PriceQuote};
use super::services::PricingError;

/// Scale the quote's final price by the method's percentage and append the
/// delta as its own adjustment line.
///
/// The delta is rounded to cents; the result is not re-rounded to the
/// quote's increment.
pub fn apply_payment_adjustment(
    quote: &PriceQuote,
    method: &PaymentMethodAdjustment,
) -> Result<PriceQuote, PricingError> {
    if !method.enabled {
        return Err(PricingError::PaymentMethodDisabled(method.id.clone()));
    }

    let out_of_range = || PricingError::PaymentAdjustmentOutOfRange(method.id.clone());
    let delta = percent_of(quote.final_price, method.adjustment_percent)
        .map(|delta| round_money(delta, 2))
        .ok_or_else(out_of_range)?;
    let subtotal = quote.subtotal.checked_add(delta).ok_or_else(out_of_range)?;
    let final_price = quote.final_price.checked_add(delta).ok_or_else(out_of_range)?;
    debug!("Payment method {} adjusts {} by {}", method.id, quote.final_price, delta);

    let mut adjusted = quote.clone();
    adjusted.adjustments.push(Adjustment {
        kind: AdjustmentKind::PaymentMethod,
        label: format!("{} ({:+}%)", method.name, method.adjustment_percent.normalize()),
        amount: delta,
    });
    adjusted.subtotal = subtotal;
    adjusted.final_price = final_price;

    Ok(adjusted)
}
