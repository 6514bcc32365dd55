//! Field validators plugged into `#[derive(Validate)]` request types

use validator::ValidationError;

use crate::money::Money;

/// Amount must be strictly greater than zero and fit a money column.
pub fn validate_positive_amount(amount: &Money) -> Result<(), ValidationError> {
    if !amount.is_positive() {
        let mut err = ValidationError::new("positive_amount");
        err.message = Some("must be greater than 0".into());
        return Err(err);
    }
    if *amount > Money::MAX {
        let mut err = ValidationError::new("max_amount");
        err.message = Some(format!("must not exceed {}", Money::MAX).into());
        return Err(err);
    }
    Ok(())
}
