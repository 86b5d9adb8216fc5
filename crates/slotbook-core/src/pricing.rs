//! # Pricing Calculator
//!
//! Turns a service price, a discount and a tax rate into a breakdown.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  servicePrice ─┐                                                        │
//! │                ├─► subTotal = servicePrice − discount                   │
//! │  discount ─────┘         │                                              │
//! │                          ▼                                              │
//! │  taxRate ─────────► tax = round_half_up(subTotal × taxRate)  (1 round)  │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                   total = subTotal + tax                                │
//! │                                                                         │
//! │  tip is NOT part of the breakdown: effectiveTotal = total + tip         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use slotbook_core::money::Money;
//! use slotbook_core::pricing::{calculate, PricingInput};
//! use slotbook_core::types::TaxRate;
//!
//! let breakdown = calculate(&PricingInput {
//!     service_price: Money::from_cents(10000),
//!     discount: Money::from_cents(1000),
//!     tax_rate: TaxRate::from_bps(800),
//!     currency: "USD".to_string(),
//! })
//! .unwrap();
//!
//! assert_eq!(breakdown.sub_total.cents(), 9000);
//! assert_eq!(breakdown.tax.cents(), 720);
//! assert_eq!(breakdown.total.cents(), 9720);
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::PricingError;
use crate::money::Money;
use crate::status::CancelledBy;
use crate::types::TaxRate;
use crate::validation::{validate_currency, validate_tax_rate_bps};

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// Raw pricing inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingInput {
    pub service_price: Money,
    pub discount: Money,
    pub tax_rate: TaxRate,
    /// ISO 4217 code, e.g. `"USD"`.
    pub currency: String,
}

/// The decomposition of a reservation's price.
///
/// Computed once and stored alongside the reservation; only an explicit
/// repricing replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingBreakdown {
    pub service_price: Money,
    pub discount: Money,
    pub sub_total: Money,
    pub tax_rate: TaxRate,
    pub tax: Money,
    pub total: Money,
    pub currency: String,
}

// =============================================================================
// Calculation
// =============================================================================

/// Computes a [`PricingBreakdown`].
///
/// ## Errors
/// [`PricingError`] when the price or discount is negative, the discount
/// exceeds the price, the tax rate is outside `[0, 1]`, the currency code
/// is malformed, or the total does not fit in `i64` cents.
pub fn calculate(input: &PricingInput) -> Result<PricingBreakdown, PricingError> {
    if input.service_price.is_negative() {
        return Err(PricingError::NegativePrice {
            price: input.service_price.to_string(),
        });
    }

    if input.discount.is_negative() {
        return Err(PricingError::NegativeDiscount {
            discount: input.discount.to_string(),
        });
    }

    if input.discount > input.service_price {
        return Err(PricingError::DiscountExceedsPrice {
            discount: input.discount.to_string(),
            price: input.service_price.to_string(),
        });
    }

    validate_tax_rate_bps(input.tax_rate.bps())
        .map_err(|_| PricingError::TaxRateOutOfRange {
            bps: input.tax_rate.bps(),
        })?;

    validate_currency(&input.currency).map_err(|_| PricingError::InvalidCurrency {
        code: input.currency.clone(),
    })?;

    let sub_total = input.service_price - input.discount;
    let tax = sub_total.apply_rate_bps(input.tax_rate.bps());
    let total = sub_total
        .checked_add(tax)
        .ok_or_else(|| PricingError::AmountTooLarge {
            field: "total".to_string(),
        })?;

    Ok(PricingBreakdown {
        service_price: input.service_price,
        discount: input.discount,
        sub_total,
        tax_rate: input.tax_rate,
        tax,
        total,
        currency: input.currency.clone(),
    })
}

/// `breakdown.total + tip`, rejecting a negative tip or an overflowing sum.
pub fn effective_total(breakdown: &PricingBreakdown, tip: Money) -> Result<Money, PricingError> {
    if tip.is_negative() {
        return Err(PricingError::NegativeTip {
            tip: tip.to_string(),
        });
    }
    breakdown
        .total
        .checked_add(tip)
        .ok_or_else(|| PricingError::AmountTooLarge {
            field: "tip".to_string(),
        })
}

// =============================================================================
// Cancellation Fee
// =============================================================================

/// When a cancellation costs the customer money.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationPolicy {
    /// Customer cancellations at least this long before the scheduled start
    /// are free.
    pub free_cancellation_window: Duration,
    /// Fee charged on late customer cancellations, in basis points of the
    /// breakdown total.
    pub fee_bps: u32,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        CancellationPolicy {
            free_cancellation_window: Duration::hours(24),
            fee_bps: 0,
        }
    }
}

impl CancellationPolicy {
    /// Fee for a cancellation by `by` at `now` of a reservation starting at
    /// `scheduled_start` with the given breakdown total.
    ///
    /// ```text
    /// now ──────────── window ──────────── scheduled_start
    ///      free ◄──────────┤├──────────► late (customer pays fee)
    /// ```
    ///
    /// Providers never pay.
    pub fn fee(
        &self,
        by: CancelledBy,
        now: DateTime<Utc>,
        scheduled_start: DateTime<Utc>,
        total: Money,
    ) -> Money {
        match by {
            CancelledBy::Provider => Money::zero(),
            CancelledBy::Customer => {
                if scheduled_start - now >= self.free_cancellation_window {
                    Money::zero()
                } else {
                    total.apply_rate_bps(self.fee_bps)
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(price: i64, discount: i64, bps: u32) -> PricingInput {
        PricingInput {
            service_price: Money::from_cents(price),
            discount: Money::from_cents(discount),
            tax_rate: TaxRate::from_bps(bps),
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn test_reference_scenario() {
        // 100.00 - 10.00 = 90.00; 90.00 × 0.08 = 7.20; total 97.20
        let b = calculate(&input(10000, 1000, 800)).unwrap();
        assert_eq!(b.sub_total, Money::from_cents(9000));
        assert_eq!(b.tax, Money::from_cents(720));
        assert_eq!(b.total, Money::from_cents(9720));
        assert_eq!(b.currency, "USD");
    }

    #[test]
    fn test_identities_hold_across_inputs() {
        for price in [0, 1, 99, 1000, 4550, 123_457] {
            for discount in [0, 1, price / 3, price].into_iter().filter(|d| *d <= price) {
                for bps in [0, 1, 333, 825, 2000, 10_000] {
                    let b = calculate(&input(price, discount, bps)).unwrap();
                    assert_eq!(b.sub_total, b.service_price - b.discount);
                    assert_eq!(b.total, b.sub_total + b.tax);
                    assert!(!b.total.is_negative());
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let a = calculate(&input(4550, 250, 825)).unwrap();
        let b = calculate(&input(4550, 250, 825)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tax_rounds_once_half_up() {
        // 10.00 × 8.25% = 0.825 → 0.83
        let b = calculate(&input(1000, 0, 825)).unwrap();
        assert_eq!(b.tax.cents(), 83);
        assert_eq!(b.total.cents(), 1083);
    }

    #[test]
    fn test_full_discount_is_free() {
        let b = calculate(&input(5000, 5000, 800)).unwrap();
        assert!(b.total.is_zero());
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(matches!(
            calculate(&input(1000, -1, 800)),
            Err(PricingError::NegativeDiscount { .. })
        ));
        assert!(matches!(
            calculate(&input(1000, 1001, 800)),
            Err(PricingError::DiscountExceedsPrice { .. })
        ));
        assert!(matches!(
            calculate(&input(-5, 0, 800)),
            Err(PricingError::NegativePrice { .. })
        ));
        assert_eq!(
            calculate(&input(1000, 0, 10_001)),
            Err(PricingError::TaxRateOutOfRange { bps: 10_001 })
        );

        let mut bad_currency = input(1000, 0, 800);
        bad_currency.currency = "usd".to_string();
        assert!(matches!(
            calculate(&bad_currency),
            Err(PricingError::InvalidCurrency { .. })
        ));
    }

    #[test]
    fn test_effective_total_adds_tip_outside_breakdown() {
        let b = calculate(&input(10000, 1000, 800)).unwrap();
        assert_eq!(
            effective_total(&b, Money::from_cents(500)).unwrap().cents(),
            10220
        );
        assert_eq!(b.total.cents(), 9720);
        assert!(effective_total(&b, Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_oversized_amounts_are_rejected_not_wrapped() {
        // sub_total + tax at 100% no longer fits in i64 cents.
        let huge = i64::MAX / 2 + 1;
        assert_eq!(
            calculate(&input(huge, 0, 10_000)),
            Err(PricingError::AmountTooLarge {
                field: "total".to_string()
            })
        );
        assert_eq!(calculate(&input(huge, 0, 0)).unwrap().total.cents(), huge);

        let b = calculate(&input(10000, 1000, 800)).unwrap();
        assert_eq!(
            effective_total(&b, Money::from_cents(i64::MAX)),
            Err(PricingError::AmountTooLarge {
                field: "tip".to_string()
            })
        );
    }

    #[test]
    fn test_cancellation_fee() {
        let policy = CancellationPolicy {
            free_cancellation_window: Duration::hours(24),
            fee_bps: 5000,
        };
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let total = Money::from_cents(9720);

        let early = start - Duration::hours(48);
        let late = start - Duration::hours(2);

        assert!(policy.fee(CancelledBy::Customer, early, start, total).is_zero());
        assert_eq!(
            policy.fee(CancelledBy::Customer, late, start, total).cents(),
            4860
        );
        assert!(policy.fee(CancelledBy::Provider, late, start, total).is_zero());
    }
}
