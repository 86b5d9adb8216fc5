//! Service configuration.
//!
//! Configuration is loaded from `SLOTBOOK_*` environment variables with
//! fallback to defaults.
//!
//! | Variable                            | Default | Meaning                         |
//! |-------------------------------------|---------|---------------------------------|
//! | `SLOTBOOK_DEFAULT_CURRENCY`         | `USD`   | Currency when none is given     |
//! | `SLOTBOOK_DEFAULT_TAX_RATE`         | `0`     | Fraction, e.g. `0.08`           |
//! | `SLOTBOOK_REFERENCE_PREFIX`         | `RSV`   | Prefix of reference codes       |
//! | `SLOTBOOK_FREE_CANCELLATION_HOURS`  | `24`    | Free customer cancellation lead |
//! | `SLOTBOOK_CANCELLATION_FEE_BPS`     | `0`     | Late fee in bps of the total    |

use chrono::Duration;
use std::env;

use slotbook_core::validation::{validate_currency, validate_tax_rate_bps};
use slotbook_core::{CancellationPolicy, TaxRate, DEFAULT_CURRENCY};
use slotbook_db::DEFAULT_REFERENCE_PREFIX;

/// Reservation service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Used when neither the request nor the catalog names a currency.
    pub default_currency: String,

    /// Used when the request carries no tax rate.
    pub default_tax_rate: TaxRate,

    /// Prefix of generated reference codes (`RSV-XXXXXXXX`).
    pub reference_prefix: String,

    /// Late-cancellation fee policy.
    pub cancellation: CancellationPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            default_currency: DEFAULT_CURRENCY.to_string(),
            default_tax_rate: TaxRate::zero(),
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
            cancellation: CancellationPolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ServiceConfig::default();

        let default_currency = lookup("SLOTBOOK_DEFAULT_CURRENCY")
            .unwrap_or(defaults.default_currency);
        validate_currency(&default_currency)
            .map_err(|_| ConfigError::InvalidValue("SLOTBOOK_DEFAULT_CURRENCY".to_string()))?;

        let default_tax_rate = match lookup("SLOTBOOK_DEFAULT_TAX_RATE") {
            Some(raw) => TaxRate::parse_fraction(&raw)
                .filter(|rate| validate_tax_rate_bps(rate.bps()).is_ok())
                .ok_or_else(|| ConfigError::InvalidValue("SLOTBOOK_DEFAULT_TAX_RATE".to_string()))?,
            None => defaults.default_tax_rate,
        };

        let reference_prefix = lookup("SLOTBOOK_REFERENCE_PREFIX")
            .unwrap_or(defaults.reference_prefix);
        if reference_prefix.is_empty()
            || reference_prefix.len() > 8
            || !reference_prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::InvalidValue(
                "SLOTBOOK_REFERENCE_PREFIX".to_string(),
            ));
        }

        let free_cancellation_window = lookup("SLOTBOOK_FREE_CANCELLATION_HOURS")
            .unwrap_or_else(|| defaults.cancellation.free_cancellation_window.num_hours().to_string())
            .parse::<i64>()
            .ok()
            .filter(|hours| *hours >= 0)
            .and_then(Duration::try_hours)
            .ok_or_else(|| {
                ConfigError::InvalidValue("SLOTBOOK_FREE_CANCELLATION_HOURS".to_string())
            })?;

        let fee_bps: u32 = lookup("SLOTBOOK_CANCELLATION_FEE_BPS")
            .unwrap_or_else(|| defaults.cancellation.fee_bps.to_string())
            .parse()
            .ok()
            .filter(|bps| *bps <= 10_000)
            .ok_or_else(|| ConfigError::InvalidValue("SLOTBOOK_CANCELLATION_FEE_BPS".to_string()))?;

        Ok(ServiceConfig {
            default_currency,
            default_tax_rate,
            reference_prefix,
            cancellation: CancellationPolicy {
                free_cancellation_window,
                fee_bps,
            },
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(load(&[]).unwrap(), ServiceConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SLOTBOOK_DEFAULT_CURRENCY", "EUR"),
            ("SLOTBOOK_DEFAULT_TAX_RATE", "0.08"),
            ("SLOTBOOK_REFERENCE_PREFIX", "BK"),
            ("SLOTBOOK_FREE_CANCELLATION_HOURS", "48"),
            ("SLOTBOOK_CANCELLATION_FEE_BPS", "2500"),
        ])
        .unwrap();

        assert_eq!(config.default_currency, "EUR");
        assert_eq!(config.default_tax_rate.bps(), 800);
        assert_eq!(config.reference_prefix, "BK");
        assert_eq!(config.cancellation.free_cancellation_window, Duration::hours(48));
        assert_eq!(config.cancellation.fee_bps, 2500);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        for (key, value) in [
            ("SLOTBOOK_DEFAULT_CURRENCY", "euro"),
            ("SLOTBOOK_DEFAULT_TAX_RATE", "1.5"),
            ("SLOTBOOK_DEFAULT_TAX_RATE", "eight"),
            ("SLOTBOOK_REFERENCE_PREFIX", "R-S"),
            ("SLOTBOOK_FREE_CANCELLATION_HOURS", "-1"),
            ("SLOTBOOK_FREE_CANCELLATION_HOURS", "9223372036854775807"),
            ("SLOTBOOK_CANCELLATION_FEE_BPS", "10001"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid value for {key}"));
        }
    }
}
