use serde::{Deserialize, Serialize};

use super::Criterion;

/// Allowed distance of the weight total from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

// Float noise when a user enters e.g. 0.33 + 0.33 + 0.35.
const SUM_EPSILON: f64 = 1e-9;

/// Relative importance of each scoring criterion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub rent: f64,
    pub sqft: f64,
    pub beds: f64,
    pub baths: f64,
    pub distance: f64,
}

impl ScoreWeights {
    pub const fn weight(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Rent => self.rent,
            Criterion::Sqft => self.sqft,
            Criterion::Beds => self.beds,
            Criterion::Baths => self.baths,
            Criterion::Distance => self.distance,
        }
    }

    pub fn sum(&self) -> f64 {
        self.rent + self.sqft + self.beds + self.baths + self.distance
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            rent: 0.3,
            sqft: 0.2,
            beds: 0.2,
            baths: 0.2,
            distance: 0.1,
        }
    }
}

/// Validated weighting plus the reference address distances are measured from.
///
/// Construction is the only validation point; scoring trusts a `WeightConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightConfigInput")]
pub struct WeightConfig {
    #[serde(flatten)]
    weights: ScoreWeights,
    reference_address: String,
}

impl WeightConfig {
    pub fn new(
        weights: ScoreWeights,
        reference_address: impl Into<String>,
    ) -> Result<Self, WeightConfigError> {
        for criterion in Criterion::ALL {
            let value = weights.weight(criterion);
            if !value.is_finite() {
                return Err(WeightConfigError::NonFiniteWeight { criterion });
            }
            if value < 0.0 {
                return Err(WeightConfigError::NegativeWeight { criterion, value });
            }
        }

        let sum = weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE + SUM_EPSILON {
            return Err(WeightConfigError::SumOutOfTolerance { sum });
        }

        Ok(Self {
            weights,
            reference_address: reference_address.into().trim().to_string(),
        })
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn reference_address(&self) -> &str {
        &self.reference_address
    }

    pub fn with_reference_address(mut self, reference_address: impl Into<String>) -> Self {
        self.reference_address = reference_address.into().trim().to_string();
        self
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            reference_address: String::new(),
        }
    }
}

/// Wire shape accepted for weight updates; keys from older settings forms are aliased.
#[derive(Debug, Clone, Deserialize)]
pub struct WeightConfigInput {
    #[serde(alias = "rent_weight")]
    pub rent: f64,
    #[serde(alias = "sqft_weight")]
    pub sqft: f64,
    #[serde(alias = "bedrooms", alias = "bedrooms_weight")]
    pub beds: f64,
    #[serde(alias = "bathrooms", alias = "bathrooms_weight")]
    pub baths: f64,
    #[serde(alias = "dist", alias = "distance_weight")]
    pub distance: f64,
    #[serde(default, alias = "address", alias = "originAddress")]
    pub reference_address: String,
}

impl TryFrom<WeightConfigInput> for WeightConfig {
    type Error = WeightConfigError;

    fn try_from(input: WeightConfigInput) -> Result<Self, Self::Error> {
        let weights = ScoreWeights {
            rent: input.rent,
            sqft: input.sqft,
            beds: input.beds,
            baths: input.baths,
            distance: input.distance,
        };
        WeightConfig::new(weights, input.reference_address)
    }
}

/// Rejected weight configuration. The previously active configuration stays in force.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightConfigError {
    #[error("{criterion} weight must be a finite number")]
    NonFiniteWeight { criterion: Criterion },
    #[error("{criterion} weight must not be negative (got {value})")]
    NegativeWeight { criterion: Criterion, value: f64 },
    #[error("weights must sum to 1.0 (±0.01), got {sum:.3}")]
    SumOutOfTolerance { sum: f64 },
}
