use serde::{Deserialize, Serialize};

/// Value given to every listing when a criterion has no spread across the set.
pub const UNIFORM_VALUE: f64 = 1.0;

/// Value given to a listing that lacks the raw input for a criterion.
pub const MISSING_VALUE: f64 = 0.5;

/// Which way a criterion's raw values point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    LowerIsBetter,
    HigherIsBetter,
}

/// How a normalized criterion value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationBasis {
    /// Min–max scaled against the set.
    Ranged,
    /// Every listing in the set shares the same raw value.
    Uniform,
    /// The listing has no raw input for the criterion.
    Missing,
}

/// Observed bounds of one criterion across a ranking pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CriterionRange {
    min: f64,
    max: f64,
}

impl CriterionRange {
    pub(crate) fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        values
            .into_iter()
            .filter(|value| value.is_finite())
            .fold(None, |range: Option<Self>, value| match range {
                Some(range) => Some(Self {
                    min: range.min.min(value),
                    max: range.max.max(value),
                }),
                None => Some(Self {
                    min: value,
                    max: value,
                }),
            })
    }

    pub(crate) fn normalize(&self, value: f64, preference: Preference) -> (f64, NormalizationBasis) {
        if self.max == self.min {
            return (UNIFORM_VALUE, NormalizationBasis::Uniform);
        }
        let span = self.max - self.min;

        let position = ((value - self.min) / span).clamp(0.0, 1.0);
        let normalized = match preference {
            Preference::HigherIsBetter => position,
            Preference::LowerIsBetter => 1.0 - position,
        };
        (normalized, NormalizationBasis::Ranged)
    }
}
