//! Per-listing derived cost figures.

use serde::{Deserialize, Serialize};

/// Cost metrics derived from a listing's raw numeric fields.
///
/// `None` means "not applicable" and is never replaced by zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    #[serde(default)]
    pub cost_per_sqft: Option<f64>,
    #[serde(default, alias = "cost_per_roommate")]
    pub cost_per_occupant: Option<f64>,
}

impl DerivedMetrics {
    pub fn derive(
        price: Option<f64>,
        square_footage: Option<u32>,
        utility_estimate: Option<f64>,
        occupant_count: u32,
    ) -> Self {
        Self {
            cost_per_sqft: cost_per_sqft(price, square_footage),
            cost_per_occupant: cost_per_occupant(price, utility_estimate, occupant_count),
        }
    }
}

/// `price / square_footage`, defined only when both are strictly positive.
pub fn cost_per_sqft(price: Option<f64>, square_footage: Option<u32>) -> Option<f64> {
    match (price, square_footage) {
        (Some(price), Some(sqft)) if price > 0.0 && sqft > 0 => Some(price / f64::from(sqft)),
        _ => None,
    }
}

/// Monthly rent plus utilities split across occupants.
///
/// Zero occupants means the renter lives alone and carries the full total.
pub fn cost_per_occupant(
    price: Option<f64>,
    utility_estimate: Option<f64>,
    occupant_count: u32,
) -> Option<f64> {
    let price = price.filter(|value| value.is_finite())?;
    let utilities = utility_estimate
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or(0.0);
    let total = price + utilities;

    if occupant_count > 0 {
        Some(total / f64::from(occupant_count))
    } else {
        Some(total)
    }
}
