//! Units-sold thresholds for the demand target.

use crate::domain::DemandLabel;

/// Highest `units_sold` still counted as low demand.
pub const LOW_DEMAND_MAX: u32 = 20;
/// Highest `units_sold` still counted as medium demand.
pub const MEDIUM_DEMAND_MAX: u32 = 50;

/// Map a units-sold count to its demand level.
///
/// Bands are closed on the upper end: `..=20` low, `21..=50` medium, `51..` high.
pub fn demand_label(units_sold: u32) -> DemandLabel {
    if units_sold <= LOW_DEMAND_MAX {
        DemandLabel::Low
    } else if units_sold <= MEDIUM_DEMAND_MAX {
        DemandLabel::Medium
    } else {
        DemandLabel::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges() {
        assert_eq!(demand_label(0), DemandLabel::Low);
        assert_eq!(demand_label(20), DemandLabel::Low);
        assert_eq!(demand_label(21), DemandLabel::Medium);
        assert_eq!(demand_label(50), DemandLabel::Medium);
        assert_eq!(demand_label(51), DemandLabel::High);
        assert_eq!(demand_label(u32::MAX), DemandLabel::High);
    }
}
