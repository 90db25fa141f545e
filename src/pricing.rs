//! Checkout total computation.
//!
//! Tax and fee are each computed from the raw subtotal and rounded to two
//! decimal places independently, and the total is the sum of the three
//! rounded figures. Rounding per field can accumulate up to a cent of
//! drift versus rounding once at the end; existing receipts were written
//! with per-field rounding, so this module must keep it to stay
//! bit-compatible with them.

use serde::{Deserialize, Serialize};

/// GST applied to the subtotal
pub const GST_RATE: f64 = 0.18;

/// Internet handling fee applied to the subtotal
pub const HANDLING_FEE_RATE: f64 = 0.07;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Itemized totals for one checkout attempt
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Price times quantity
    pub subtotal: f64,
    /// 18% GST on the subtotal
    pub gst: f64,
    /// 7% handling fee on the subtotal
    pub handling_fee: f64,
    /// Sum of the three figures above
    pub total: f64,
}

impl PriceBreakdown {
    /// Computes the breakdown for a unit price and quantity
    #[must_use]
    pub fn compute(unit_price: f64, quantity: u32) -> Self {
        let raw = unit_price * f64::from(quantity);
        let subtotal = round2(raw);
        let gst = round2(raw * GST_RATE);
        let handling_fee = round2(raw * HANDLING_FEE_RATE);
        let total = round2(subtotal + gst + handling_fee);
        Self {
            subtotal,
            gst,
            handling_fee,
            total,
        }
    }

    /// Total in minor currency units, as payment gateways expect
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn total_minor_units(&self) -> u64 {
        (self.total * 100.0).round() as u64
    }
}

/// Formats an amount the way the order and ticket collections store it
#[must_use]
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_breakdown_for_thousand() {
        let breakdown = PriceBreakdown::compute(1000.0, 1);
        assert!((breakdown.subtotal - 1000.0).abs() < 1e-9);
        assert!((breakdown.gst - 180.0).abs() < 1e-9);
        assert!((breakdown.handling_fee - 70.0).abs() < 1e-9);
        assert!((breakdown.total - 1250.0).abs() < 1e-9);
        assert_eq!(breakdown.total_minor_units(), 125_000);
    }

    #[test]
    fn quantity_scales_before_rounding() {
        let breakdown = PriceBreakdown::compute(333.33, 3);
        assert!((breakdown.subtotal - 999.99).abs() < 1e-9);
        assert!((breakdown.gst - 180.0).abs() < 1e-9);
        assert!((breakdown.handling_fee - 70.0).abs() < 1e-9);
        assert!((breakdown.total - 1249.99).abs() < 1e-9);
    }

    #[test]
    fn each_figure_rounds_independently() {
        // 0.07 * 14.95 = 1.0465 -> 1.05; 0.18 * 14.95 = 2.691 -> 2.69
        let breakdown = PriceBreakdown::compute(14.95, 1);
        assert!((breakdown.gst - 2.69).abs() < 1e-9);
        assert!((breakdown.handling_fee - 1.05).abs() < 1e-9);
        assert!((breakdown.total - 18.69).abs() < 1e-9);
    }

    #[test]
    fn amounts_format_with_two_decimals() {
        assert_eq!(format_amount(1250.0), "1250.00");
        assert_eq!(format_amount(18.694), "18.69");
    }
}
