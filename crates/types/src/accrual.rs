//! Reward accrual statistics per fixed look-back window.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed accrual look-back window offered by the stats endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccrualWindow {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
}

impl AccrualWindow {
    /// Parse the wire literal (`"24h"`, `"7d"`, `"30d"`).
    pub fn from_literal(value: &str) -> Option<Self> {
        match value.trim() {
            "24h" => Some(AccrualWindow::Day),
            "7d" => Some(AccrualWindow::Week),
            "30d" => Some(AccrualWindow::Month),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> &'static str {
        match self {
            AccrualWindow::Day => "24h",
            AccrualWindow::Week => "7d",
            AccrualWindow::Month => "30d",
        }
    }
}

impl fmt::Display for AccrualWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_literal())
    }
}

/// Reward accrual totals for the target account, in HP, one figure per fixed
/// window. Immutable per fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccrualStats {
    pub last_24h_hp: f64,
    pub last_7d_hp: f64,
    pub last_30d_hp: f64,
}

impl AccrualStats {
    /// Accrual total for one fixed window.
    pub fn window_total(&self, window: AccrualWindow) -> f64 {
        match window {
            AccrualWindow::Day => self.last_24h_hp,
            AccrualWindow::Week => self.last_7d_hp,
            AccrualWindow::Month => self.last_30d_hp,
        }
    }
}
