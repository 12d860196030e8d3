//! Exact numeric text decoders.
//!
//! Decimal and 64-bit integer columns are transferred as text so that no
//! precision is lost in the driver. The text is validated and normalized
//! here.

use crate::error::{Error, Result};

/// Validate and normalize decimal text.
///
/// Accepts an optional sign, digits and at most one decimal point. A leading
/// `+` and surrounding blanks are dropped; everything else is kept as
/// reported so precision and scale survive.
pub fn parse_decimal(text: &str) -> Result<String> {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    let mut digits = 0;
    let mut points = 0;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            _ => {
                return Err(Error::type_conversion(format!(
                    "Invalid decimal text: {:?}",
                    text
                )))
            }
        }
    }
    if digits == 0 || points > 1 {
        return Err(Error::type_conversion(format!(
            "Invalid decimal text: {:?}",
            text
        )));
    }
    let normalized = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let normalized = if normalized.starts_with('.') {
        format!("0{}", normalized)
    } else if let Some(rest) = normalized.strip_prefix("-.") {
        format!("-0.{}", rest)
    } else {
        normalized.to_string()
    };
    Ok(normalized)
}

/// Parse 64-bit integer text.
pub fn parse_bigint(text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .map_err(|e| Error::type_conversion(format!("Invalid BIGINT text {:?}: {}", text, e)))
}
