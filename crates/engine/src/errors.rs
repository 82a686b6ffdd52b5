use thiserror::Error;

/// Failure to decode the transport form of a filter payload.
///
/// Decode failures are distinct from field validation: a payload that decodes
/// but carries bad fields is repaired field by field, never rejected. Callers
/// that hit a decode failure fall back to [`crate::Filter::unapplied`].
#[derive(Debug, Error)]
pub enum FilterDecodeError {
    #[error("filter payload is not valid UTF-8 after percent-decoding: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("filter payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A single violated payment-config constraint.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigViolation {
    #[error("account must not be empty")]
    EmptyAccount,

    #[error("base rate must be within [0, 100], got {0}")]
    BaseRateOutOfRange(f64),

    #[error("minimum rate must be at least 0, got {0}")]
    MinRateTooLow(f64),

    #[error("maximum rate must be at most 100, got {0}")]
    MaxRateTooHigh(f64),

    #[error("minimum rate {min} exceeds maximum rate {max}")]
    MinAboveMax { min: f64, max: f64 },
}

/// Payment-config construction failure carrying every violated constraint,
/// so a caller can report all problems at once.
#[derive(Debug, Error)]
#[error("payment config rejected with {} violation(s)", .violations.len())]
pub struct PaymentConfigError {
    pub violations: Vec<ConfigViolation>,
}
