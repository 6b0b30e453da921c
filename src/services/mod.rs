//! Business operations of the contract/payment lifecycle.
//!
//! Handlers stay thin: they extract the caller and the request and call into
//! these functions, which own every state transition and every transaction.

pub mod contracts;
pub mod payments;
pub mod reconciliation;
pub mod wallet;
pub mod withdrawals;

use crate::errors::AppError;

/// Validate a request amount: a positive, whole number of display units.
pub fn parse_amount(amount: f64) -> Result<i64, AppError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::Validation(
            "Amount must be a positive number".to_string(),
        ));
    }
    if amount.fract() != 0.0 {
        return Err(AppError::Validation(
            "Amount must be a whole number of currency units".to_string(),
        ));
    }
    if amount > (i64::MAX / crate::gateway::MINOR_UNITS) as f64 {
        return Err(AppError::Validation("Amount is too large".to_string()));
    }
    Ok(amount as i64)
}

#[cfg(test)]
mod tests {
    use super::parse_amount;

    #[test]
    fn accepts_positive_whole_amounts() {
        assert_eq!(parse_amount(5000.0).unwrap(), 5000);
        assert_eq!(parse_amount(1.0).unwrap(), 1);
    }

    #[test]
    fn rejects_zero_negative_fractional_and_non_finite() {
        assert!(parse_amount(0.0).is_err());
        assert!(parse_amount(-10.0).is_err());
        assert!(parse_amount(12.5).is_err());
        assert!(parse_amount(f64::NAN).is_err());
        assert!(parse_amount(f64::INFINITY).is_err());
        assert!(parse_amount(1e300).is_err());
    }
}
