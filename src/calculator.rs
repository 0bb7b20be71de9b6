//! PPP-adjusted income conversion.

use std::fmt;

use crate::normalizer::PppRecord;

/// Errors surfaced while converting an income figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalculateError {
    /// The source country's PPP value is zero, so the ratio is undefined.
    ZeroSourceValue {
        /// Country whose stored value made the division impossible.
        country_code: String,
    },
}

impl fmt::Display for CalculateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSourceValue { country_code } => {
                write!(f, "PPP value for {country_code} is zero")
            }
        }
    }
}

impl std::error::Error for CalculateError {}

/// Converts `income` from the source country's currency context into the
/// target's using the ratio of their PPP values.
///
/// The result is truncated toward zero to a whole number. A zero source
/// value is rejected instead of producing an infinite or NaN ratio; income
/// sign and magnitude are otherwise not bounds-checked.
pub fn adjust_income(
    income: f64,
    src: &PppRecord,
    target: &PppRecord,
) -> Result<i64, CalculateError> {
    if src.value == 0.0 {
        return Err(CalculateError::ZeroSourceValue {
            country_code: src.country_code.clone(),
        });
    }
    Ok((income / src.value * target.value) as i64)
}
