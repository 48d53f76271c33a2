//! Invoice amount calculation.
//!
//! Pure functions only: no storage, no clock, no randomness.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::invoice::LineItem;
use crate::error::DomainError;

/// Highest tax percentage an invoice may carry.
const MAX_TAX_RATE: Decimal = Decimal::ONE_HUNDRED;

/// Amounts derived from an invoice's line items and tax rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Amounts {
    pub amount_due: u64,
    pub amount_paid: u64,
}

/// Parses a tax rate percentage such as `"7.5"`, accepting scientific notation.
pub fn parse_tax_rate(rate: &str) -> Option<Decimal> {
    Decimal::from_str(rate)
        .or_else(|_| Decimal::from_scientific(rate))
        .ok()
}

/// Checks that a tax rate string is usable by [`calculate_amounts`].
///
/// An empty string means "no tax" and is valid.
pub fn validate_tax_rate(rate: &str) -> Result<(), &'static str> {
    if rate.is_empty() {
        return Ok(());
    }

    match parse_tax_rate(rate) {
        None => Err("tax rate must be a decimal percentage"),
        Some(r) if r.is_sign_negative() => Err("tax rate cannot be negative"),
        Some(r) if r > MAX_TAX_RATE => Err("tax rate cannot exceed 100"),
        Some(_) => Ok(()),
    }
}

/// Calculates the amount due for the given line items and tax rate.
///
/// The tax is `subtotal * rate / 100`, truncated to two decimal places and
/// then rounded half-to-even to a whole minor unit, so ties such as `2.5`
/// round to `2` and `3.5` to `4`. Amount paid is always zero.
pub fn calculate_amounts(line_items: &[LineItem], tax_rate: &str) -> Result<Amounts, DomainError> {
    let mut subtotal: u64 = 0;
    for item in line_items {
        let line = item
            .quantity
            .checked_mul(item.price)
            .ok_or(DomainError::AmountOverflow)?;
        subtotal = subtotal
            .checked_add(line)
            .ok_or(DomainError::AmountOverflow)?;
    }

    let mut amount_due = subtotal;

    if !tax_rate.is_empty() {
        let rate = parse_tax_rate(tax_rate)
            .filter(|r| !r.is_sign_negative())
            .ok_or_else(|| DomainError::CalculatingAmounts(format!("invalid tax rate: {}", tax_rate)))?;

        let tax = Decimal::from(subtotal)
            .checked_mul(rate)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(DomainError::AmountOverflow)?
            .round_dp_with_strategy(2, RoundingStrategy::ToZero)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_u64()
            .ok_or(DomainError::AmountOverflow)?;

        amount_due = amount_due
            .checked_add(tax)
            .ok_or(DomainError::AmountOverflow)?;
    }

    Ok(Amounts {
        amount_due,
        amount_paid: 0,
    })
}
