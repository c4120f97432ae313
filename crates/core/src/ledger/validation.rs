//! Input validation for ledger operations.
//!
//! Every check here runs before the store is touched, so a rejected request
//! never opens a database transaction and is never audited.

use rust_decimal::Decimal;

use super::error::LedgerError;

/// Maximum number of fractional digits an amount may carry (`NUMERIC(19,4)`).
pub const MAX_SCALE: u32 = 4;

/// Amounts must stay below this magnitude to fit `NUMERIC(19,4)`.
pub const MAX_MAGNITUDE: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0); // 10^15

fn check_representable(amount: Decimal, field: &str) -> Result<(), LedgerError> {
    if amount.normalize().scale() > MAX_SCALE {
        return Err(LedgerError::Validation(format!(
            "{field} must have at most {MAX_SCALE} decimal places"
        )));
    }
    if amount.abs() >= MAX_MAGNITUDE {
        return Err(LedgerError::Validation(format!("{field} is too large")));
    }
    Ok(())
}

/// Validates a transfer or grant amount: strictly positive.
///
/// # Errors
///
/// Returns `LedgerError::Validation` if the amount is not positive or not representable.
pub fn validate_positive_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }
    check_representable(amount, "Amount")
}

/// Validates a signed adjustment: any non-zero amount.
///
/// # Errors
///
/// Returns `LedgerError::Validation` if the amount is zero or not representable.
pub fn validate_adjustment(amount: Decimal) -> Result<(), LedgerError> {
    if amount.is_zero() {
        return Err(LedgerError::Validation(
            "Adjustment amount cannot be zero".to_string(),
        ));
    }
    check_representable(amount, "Amount")
}

/// Validates a per-transaction limit.
///
/// # Errors
///
/// Returns `LedgerError::InvalidLimit` if the limit is not positive.
pub fn validate_limit(limit: Decimal) -> Result<(), LedgerError> {
    if limit <= Decimal::ZERO {
        return Err(LedgerError::InvalidLimit(limit));
    }
    check_representable(limit, "Limit")
}

/// Validates an absolute pool or reserve amount.
///
/// # Errors
///
/// Returns `LedgerError::Validation` if the amount is negative.
pub fn validate_pool_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::Validation(
            "Pool amount cannot be negative".to_string(),
        ));
    }
    check_representable(amount, "Pool amount")
}

/// Validates the shape of an account number: `prefix` followed by 8 digits.
///
/// # Errors
///
/// Returns `LedgerError::Validation` if the number is malformed.
pub fn validate_account_number(number: &str, prefix: &str) -> Result<(), LedgerError> {
    let well_formed = number.len() == prefix.len() + 8
        && number.starts_with(prefix)
        && number.bytes().all(|b| b.is_ascii_digit());

    if well_formed {
        Ok(())
    } else {
        Err(LedgerError::Validation(format!(
            "Account number must be {prefix} followed by 8 digits"
        )))
    }
}

/// Trims optional free text, mapping blank input to `None`.
#[must_use]
pub fn normalize_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
