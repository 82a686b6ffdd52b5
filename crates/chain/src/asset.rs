//! Defensive parsing of chain asset strings like `"12.345678 VESTS"`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetParseError {
    #[error("asset string {0:?} is not '<amount> <symbol>'")]
    Malformed(String),

    #[error("asset symbol mismatch: expected {expected}, found {found}")]
    WrongSymbol { expected: String, found: String },

    #[error("asset amount {0:?} is not a non-negative number")]
    BadAmount(String),
}

/// Parse an `"<amount> <SYMBOL>"` asset string, checking the symbol.
///
/// Chain APIs serve amounts as strings to dodge JSON float precision; the
/// engine works in f64, so the 6-decimal amounts here always fit.
pub fn parse_asset(raw: &str, symbol: &str) -> Result<f64, AssetParseError> {
    let mut parts = raw.split_whitespace();
    let (amount, unit) = match (parts.next(), parts.next(), parts.next()) {
        (Some(amount), Some(unit), None) => (amount, unit),
        _ => return Err(AssetParseError::Malformed(raw.to_string())),
    };

    if unit != symbol {
        return Err(AssetParseError::WrongSymbol {
            expected: symbol.to_string(),
            found: unit.to_string(),
        });
    }

    let value = amount
        .parse::<f64>()
        .map_err(|_| AssetParseError::BadAmount(amount.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(AssetParseError::BadAmount(amount.to_string()));
    }
    Ok(value)
}
