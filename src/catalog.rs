//! Category and phase wire-format parsing.
//!
//! The hosted store persists ticket tiers as colon-delimited strings
//! (`name:price:quantity[:phaseTag]`) and sale phases as `phaseId:...`
//! strings whose last element names the current phase. Parsing is total:
//! malformed entries become non-purchasable, never errors, because the
//! collection already contains hand-entered rows we cannot reject.
//!
//! Everything here is a pure function of the event document, so the
//! purchasable set can be recomputed at every re-validation checkpoint and
//! always yields the same result for the same document.

use crate::types::EventDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hard cap on admissions per order, regardless of availability
pub const MAX_TICKETS_PER_ORDER: u32 = 10;

/// One parsed `name:price:quantity[:phaseTag]` entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    /// Category name, whitespace-trimmed
    pub name: String,
    /// Per-unit price
    pub price: f64,
    /// Remaining quantity; malformed counts parse as 0
    pub quantity: u32,
    /// Phase this category is restricted to, if tagged
    pub phase_tag: Option<String>,
}

impl CategoryDescriptor {
    /// Parses one category string.
    ///
    /// Fields are trimmed before interpretation. Entries with fewer than
    /// three fields or a non-numeric price yield `None`; a non-numeric
    /// quantity parses as 0, which makes the category unpurchasable
    /// without discarding its name and price.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let name = parts[0];
        if name.is_empty() {
            return None;
        }
        let price: f64 = parts[1].parse().ok()?;
        if !price.is_finite() || price < 0.0 {
            return None;
        }
        let quantity: u32 = parts[2].parse().unwrap_or(0);
        let phase_tag = parts
            .get(3)
            .filter(|tag| !tag.is_empty())
            .map(ToString::to_string);
        Some(Self {
            name: name.to_string(),
            price,
            quantity,
            phase_tag,
        })
    }

    /// Whether this category can be purchased under the given current phase.
    ///
    /// Untagged categories are purchasable in any phase while stocked;
    /// tagged categories additionally require their tag to equal the
    /// current phase identifier.
    #[must_use]
    pub fn purchasable_in(&self, current_phase: Option<&str>) -> bool {
        let phase_match = self
            .phase_tag
            .as_deref()
            .is_none_or(|tag| Some(tag) == current_phase);
        self.quantity > 0 && phase_match
    }
}

/// Extracts the current phase identifier: the id portion of the last phase
/// string, or `None` when the sequence is empty or the id portion is blank.
#[must_use]
pub fn current_phase(phases: &[String]) -> Option<String> {
    phases
        .last()
        .and_then(|p| p.split(':').next())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
}

/// A purchasable ticket tier, ready for selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketOption {
    /// Category name
    pub category: String,
    /// Per-unit price
    pub unit_price: f64,
    /// Remaining quantity at the time the document was read
    pub available: u32,
}

impl TicketOption {
    /// Display label, e.g. `"VIP - Rs. 5000"`
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} - Rs. {}", self.category, self.unit_price)
    }
}

/// Computes the purchasable set for an event document.
///
/// Pure function of the document: filters categories on stock and phase
/// eligibility, preserving document order.
#[must_use]
pub fn purchasable_options(event: &EventDocument) -> Vec<TicketOption> {
    let phase = current_phase(&event.phase);
    event
        .categories
        .iter()
        .filter_map(|raw| CategoryDescriptor::parse(raw))
        .filter(|cat| cat.purchasable_in(phase.as_deref()))
        .map(|cat| TicketOption {
            category: cat.name,
            unit_price: cat.price,
            available: cat.quantity,
        })
        .collect()
}

/// Picks the default selection: the cheapest purchasable option.
#[must_use]
pub fn cheapest_option(options: &[TicketOption]) -> Option<&TicketOption> {
    options.iter().reduce(|min, opt| {
        if opt.unit_price < min.unit_price {
            opt
        } else {
            min
        }
    })
}

/// Builds the availability snapshot keyed by category name.
///
/// Ignores phase tags entirely: the snapshot answers "how many remain",
/// not "can I buy this now". Entries with fewer than three fields are
/// skipped; unparsable quantities count as 0.
#[must_use]
pub fn availability_by_category(categories: &[String]) -> HashMap<String, u32> {
    let mut map = HashMap::new();
    for raw in categories {
        let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
        if parts.len() >= 3 && !parts[0].is_empty() {
            map.insert(parts[0].to_string(), parts[2].parse().unwrap_or(0));
        }
    }
    map
}

/// A buyer's current selection: one ticket option and a bounded quantity.
///
/// Quantity is clamped to `min(10, available)` on the way up and to 1 on
/// the way down; out-of-bounds adjustments are no-ops rather than errors,
/// matching the increment/decrement controls they back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketSelection {
    option: TicketOption,
    quantity: u32,
}

impl TicketSelection {
    /// Creates a selection of one ticket for the given option
    #[must_use]
    pub fn new(option: TicketOption) -> Self {
        Self { option, quantity: 1 }
    }

    /// The selected option
    #[must_use]
    pub fn option(&self) -> &TicketOption {
        &self.option
    }

    /// The selected quantity
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Upper bound for this selection's quantity
    #[must_use]
    pub fn max_quantity(&self) -> u32 {
        MAX_TICKETS_PER_ORDER.min(self.option.available)
    }

    /// Adds one admission; no-op at `min(10, available)`
    pub fn increment(&mut self) {
        if self.quantity < self.max_quantity() {
            self.quantity += 1;
        }
    }

    /// Removes one admission; no-op at 1
    pub const fn decrement(&mut self) {
        if self.quantity > 1 {
            self.quantity -= 1;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event_with(categories: &[&str], phase: &[&str]) -> EventDocument {
        EventDocument {
            name: "Test".to_string(),
            sub_name: String::new(),
            date: String::new(),
            time: String::new(),
            location: String::new(),
            image_file_id: String::new(),
            categories: categories.iter().map(ToString::to_string).collect(),
            phase: phase.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn parses_three_field_category() {
        let cat = CategoryDescriptor::parse("GA:1000:50").unwrap();
        assert_eq!(cat.name, "GA");
        assert!((cat.price - 1000.0).abs() < f64::EPSILON);
        assert_eq!(cat.quantity, 50);
        assert_eq!(cat.phase_tag, None);
    }

    #[test]
    fn trims_whitespace_around_fields() {
        let cat = CategoryDescriptor::parse("  VIP : 5000 : 2 : PhaseA ").unwrap();
        assert_eq!(cat.name, "VIP");
        assert_eq!(cat.quantity, 2);
        assert_eq!(cat.phase_tag.as_deref(), Some("PhaseA"));
    }

    #[test]
    fn malformed_entries_are_not_purchasable() {
        assert!(CategoryDescriptor::parse("GA:1000").is_none());
        assert!(CategoryDescriptor::parse("").is_none());
        assert!(CategoryDescriptor::parse("GA:abc:50").is_none());
        // Non-numeric quantity parses as zero stock rather than rejecting.
        let cat = CategoryDescriptor::parse("GA:1000:lots").unwrap();
        assert_eq!(cat.quantity, 0);
        assert!(!cat.purchasable_in(None));
    }

    #[test]
    fn phase_gating_matches_current_phase_only() {
        let event = event_with(
            &["VIP:5000:2:PhaseA", "GA:1000:50"],
            &["PhaseA:Early bird"],
        );
        let options = purchasable_options(&event);
        assert_eq!(options.len(), 2);

        let later = event_with(
            &["VIP:5000:2:PhaseA", "GA:1000:50"],
            &["PhaseA:Early bird", "PhaseB:Regular"],
        );
        let options = purchasable_options(&later);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].category, "GA");
    }

    #[test]
    fn current_phase_is_last_element_id() {
        assert_eq!(
            current_phase(&["I:Early".to_string(), "II:Late".to_string()]).as_deref(),
            Some("II")
        );
        assert_eq!(current_phase(&[]), None);
    }

    #[test]
    fn purchasable_set_is_idempotent() {
        let event = event_with(&["VIP:5000:2:PhaseA", "GA:1000:50"], &["PhaseA"]);
        assert_eq!(purchasable_options(&event), purchasable_options(&event));
    }

    #[test]
    fn zero_quantity_is_filtered_out() {
        let event = event_with(&["GA:1000:0"], &[]);
        assert!(purchasable_options(&event).is_empty());
    }

    #[test]
    fn cheapest_option_wins_default_selection() {
        let event = event_with(&["VIP:5000:2", "GA:1000:50", "Balcony:2500:10"], &[]);
        let options = purchasable_options(&event);
        assert_eq!(cheapest_option(&options).unwrap().category, "GA");
    }

    #[test]
    fn availability_snapshot_ignores_phase_tags() {
        let map = availability_by_category(&[
            "VIP:5000:2:PhaseA".to_string(),
            "GA:1000:50".to_string(),
            "broken".to_string(),
        ]);
        assert_eq!(map.get("VIP"), Some(&2));
        assert_eq!(map.get("GA"), Some(&50));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn selection_clamps_at_both_bounds() {
        let mut selection = TicketSelection::new(TicketOption {
            category: "GA".to_string(),
            unit_price: 1000.0,
            available: 3,
        });
        selection.decrement();
        assert_eq!(selection.quantity(), 1);
        for _ in 0..10 {
            selection.increment();
        }
        assert_eq!(selection.quantity(), 3);
    }

    #[test]
    fn selection_caps_at_ten_even_with_deep_stock() {
        let mut selection = TicketSelection::new(TicketOption {
            category: "GA".to_string(),
            unit_price: 1000.0,
            available: 500,
        });
        for _ in 0..50 {
            selection.increment();
        }
        assert_eq!(selection.quantity(), MAX_TICKETS_PER_ORDER);
    }
}
