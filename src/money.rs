//! Money
//!
//! All monetary arithmetic in the engine goes through these helpers so that
//! prices are computed on decimals and rounded once, to two places, half away
//! from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

/// Number of decimal places carried by every price the engine produces.
pub const CURRENCY_SCALE: u32 = 2;

/// Errors that can occur during money arithmetic.
#[derive(Debug, Error, PartialEq)]
pub enum MoneyMathError {
    /// A decimal operation overflowed.
    #[error("decimal arithmetic overflowed")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Round a decimal amount to the currency scale.
#[must_use]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Build a money value from a decimal amount, rounded to the currency scale.
#[must_use]
pub fn money(amount: Decimal, currency: &Currency) -> Money<'_, Currency> {
    Money::from_decimal(round_currency(amount), currency)
}

/// Take `percent` percent off a price: `price - (price / 100) * percent`.
///
/// # Errors
///
/// Returns [`MoneyMathError::Overflow`] when the decimal arithmetic overflows.
pub fn percent_off<'a>(
    price: &Money<'a, Currency>,
    percent: Decimal,
) -> Result<Money<'a, Currency>, MoneyMathError> {
    let amount = *price.amount();

    let discount = amount
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|hundredth| hundredth.checked_mul(percent))
        .ok_or(MoneyMathError::Overflow)?;

    let discounted = amount
        .checked_sub(discount)
        .ok_or(MoneyMathError::Overflow)?;

    Ok(money(discounted, price.currency()))
}

/// Price of `count` units.
///
/// # Errors
///
/// Returns [`MoneyMathError::Overflow`] when the decimal arithmetic overflows.
pub fn line_total<'a>(
    unit_price: &Money<'a, Currency>,
    count: u32,
) -> Result<Money<'a, Currency>, MoneyMathError> {
    let total = unit_price
        .amount()
        .checked_mul(Decimal::from(count))
        .ok_or(MoneyMathError::Overflow)?;

    Ok(money(total, unit_price.currency()))
}

/// Sum money values, starting from zero in the given currency.
///
/// # Errors
///
/// Returns [`MoneyMathError::Money`] if any value is in another currency.
pub fn sum<'a>(
    currency: &'a Currency,
    amounts: impl IntoIterator<Item = Money<'a, Currency>>,
) -> Result<Money<'a, Currency>, MoneyMathError> {
    let total = amounts
        .into_iter()
        .try_fold(Money::from_decimal(Decimal::ZERO, currency), |acc, amount| {
            acc.add(amount)
        })?;

    Ok(total)
}
