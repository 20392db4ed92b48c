use crate::utils::error::{Result, SyncError};
use serde::Deserialize;

/// Money and quantity values arrive either as JSON numbers or as decimal
/// strings, sometimes with thousands separators (`"1,250.00"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    pub fn to_f64(&self) -> Result<f64> {
        let value = match self {
            Amount::Number(n) => *n,
            Amount::Text(s) => s.trim().replace(',', "").parse::<f64>().map_err(|e| {
                SyncError::ProcessingError {
                    message: format!("invalid amount '{}': {}", s, e),
                }
            })?,
        };

        // "NaN" / "inf" 也能被 parse，要擋掉
        if !value.is_finite() {
            return Err(SyncError::ProcessingError {
                message: format!("non-finite amount: {:?}", self),
            });
        }
        Ok(value)
    }
}
