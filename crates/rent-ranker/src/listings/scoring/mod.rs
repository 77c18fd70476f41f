//! Weighted multi-criteria scoring of a listing set.
//!
//! Every criterion is min–max normalized against the listings ranked together,
//! so a score only compares listings within one pass. Callers rescore whenever
//! the visible set or the weight configuration changes.

mod normalize;
mod weights;

pub use normalize::{NormalizationBasis, Preference, MISSING_VALUE, UNIFORM_VALUE};
pub use weights::{
    ScoreWeights, WeightConfig, WeightConfigError, WeightConfigInput, WEIGHT_SUM_TOLERANCE,
};

use std::cmp::Ordering;
use std::fmt;

use normalize::CriterionRange;
use serde::{Deserialize, Serialize};

use super::domain::{Listing, ListingId};

/// The five attributes a listing is ranked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Rent,
    Sqft,
    Beds,
    Baths,
    Distance,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Rent,
        Criterion::Sqft,
        Criterion::Beds,
        Criterion::Baths,
        Criterion::Distance,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Criterion::Rent => "rent",
            Criterion::Sqft => "sqft",
            Criterion::Beds => "beds",
            Criterion::Baths => "baths",
            Criterion::Distance => "distance",
        }
    }

    pub const fn preference(self) -> Preference {
        match self {
            Criterion::Rent | Criterion::Distance => Preference::LowerIsBetter,
            Criterion::Sqft | Criterion::Beds | Criterion::Baths => Preference::HigherIsBetter,
        }
    }

    /// Raw input for this criterion, or `None` when the listing cannot take
    /// part in its normalization.
    pub fn raw_value(self, listing: &Listing) -> Option<f64> {
        let value = match self {
            Criterion::Rent => listing.price,
            Criterion::Sqft => listing
                .square_footage
                .filter(|sqft| *sqft > 0)
                .map(f64::from),
            Criterion::Beds => listing.bedrooms,
            Criterion::Baths => listing.bathrooms,
            Criterion::Distance => listing.distance,
        };
        value.filter(|value| value.is_finite() && *value >= 0.0)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Contribution of one criterion to a listing's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub criterion: Criterion,
    pub weight: f64,
    pub normalized: f64,
    pub contribution: f64,
    pub basis: NormalizationBasis,
}

/// Score and breakdown for one listing of a ranking pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub listing_id: ListingId,
    pub score: Option<f64>,
    pub components: Vec<ScoreComponent>,
}

/// Applies a validated weighting to a listing set.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine {
    weights: ScoreWeights,
}

impl ScoringEngine {
    pub fn new(config: &WeightConfig) -> Self {
        Self {
            weights: *config.weights(),
        }
    }

    /// Score every listing against the others in `listings`. The output is
    /// aligned with the input order.
    pub fn score_set(&self, listings: &[Listing]) -> Vec<ScoreCard> {
        let ranges = Criterion::ALL.map(|criterion| {
            CriterionRange::from_values(
                listings
                    .iter()
                    .filter_map(|listing| criterion.raw_value(listing)),
            )
        });

        listings
            .iter()
            .map(|listing| self.score_listing(listing, &ranges))
            .collect()
    }

    /// Score `listings` in place, replacing any earlier score.
    pub fn apply(&self, listings: &mut [Listing]) {
        let cards = self.score_set(listings);
        for (listing, card) in listings.iter_mut().zip(cards) {
            listing.score = card.score;
            listing.score_components = card.components;
        }
    }

    fn score_listing(&self, listing: &Listing, ranges: &[Option<CriterionRange>; 5]) -> ScoreCard {
        let not_computable = ScoreCard {
            listing_id: listing.id,
            score: None,
            components: Vec::new(),
        };

        let components: Vec<ScoreComponent> = Criterion::ALL
            .iter()
            .zip(ranges)
            .map(|(&criterion, range)| {
                let (normalized, basis) = match (criterion.raw_value(listing), range) {
                    (Some(value), Some(range)) => range.normalize(value, criterion.preference()),
                    _ => (MISSING_VALUE, NormalizationBasis::Missing),
                };
                let weight = self.weights.weight(criterion);
                ScoreComponent {
                    criterion,
                    weight,
                    normalized,
                    contribution: weight * normalized,
                    basis,
                }
            })
            .collect();

        if components
            .iter()
            .all(|component| component.basis == NormalizationBasis::Missing)
        {
            return not_computable;
        }

        let total: f64 = components.iter().map(|component| component.contribution).sum();
        if !total.is_finite() {
            return not_computable;
        }

        ScoreCard {
            listing_id: listing.id,
            score: Some(total.clamp(0.0, 1.0)),
            components,
        }
    }
}

/// Order by descending score with unscored listings last; ties fall back to
/// ascending identifier. The sort is stable.
pub fn rank(listings: &mut [Listing]) {
    listings.sort_by(compare_scores);
}

pub(crate) fn compare_scores(a: &Listing, b: &Listing) -> Ordering {
    let by_score = match (a.score, b.score) {
        (Some(left), Some(right)) => right.total_cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_score.then_with(|| a.id.cmp(&b.id))
}
