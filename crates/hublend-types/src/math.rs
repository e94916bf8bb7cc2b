//! Fixed-point helpers.
//!
//! Amounts, shares and indexes are stored as `u128`; every product goes
//! through a 256-bit intermediate so `amount * index` cannot overflow before
//! the division brings it back into range.

use alloy_primitives::U256;

use crate::{HubError, Result, constants::BPS};

fn narrow(value: U256) -> Result<u128> {
    u128::try_from(value).map_err(|_| HubError::MathOverflow)
}

/// `a * b / d`, truncating.
pub fn mul_div(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(HubError::DivisionByZero);
    }
    narrow(U256::from(a) * U256::from(b) / U256::from(d))
}

/// `a * b / d`, rounding up.
pub fn mul_div_up(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(HubError::DivisionByZero);
    }
    let d = U256::from(d);
    let product = U256::from(a) * U256::from(b);
    let quotient = product / d;
    let rounded = if product % d == U256::ZERO {
        quotient
    } else {
        quotient + U256::from(1u8)
    };
    narrow(rounded)
}

/// `amount * bps / 10000`, truncating.
pub fn apply_bps(amount: u128, bps: u128) -> Result<u128> {
    mul_div(amount, bps, BPS)
}

/// `10^decimals` as `u128`.
pub fn pow10(decimals: u8) -> Result<u128> {
    10u128
        .checked_pow(u32::from(decimals))
        .ok_or(HubError::MathOverflow)
}

/// Checked addition mapped onto [`HubError::MathOverflow`].
pub fn add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(HubError::MathOverflow)
}

/// Checked subtraction mapped onto [`HubError::MathOverflow`].
pub fn sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(HubError::MathOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RAY;

    #[test]
    fn mul_div_truncates() {
        assert_eq!(mul_div(10, 10, 3).unwrap(), 33);
        assert_eq!(mul_div_up(10, 10, 3).unwrap(), 34);
        assert_eq!(mul_div_up(9, 10, 3).unwrap(), 30);
    }

    #[test]
    fn mul_div_survives_wide_products() {
        let amount = 10u128.pow(30);
        assert_eq!(mul_div(amount, 2 * RAY, RAY).unwrap(), 2 * amount);
    }

    #[test]
    fn mul_div_reports_overflow_and_zero_divisor() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(HubError::MathOverflow));
        assert_eq!(mul_div(1, 1, 0), Err(HubError::DivisionByZero));
    }

    #[test]
    fn bps_and_pow10() {
        assert_eq!(apply_bps(200, 8_000).unwrap(), 160);
        assert_eq!(pow10(6).unwrap(), 1_000_000);
        assert!(pow10(39).is_err());
    }
}
