//! Rental listing tracking: derived cost metrics, set-relative weighted
//! scoring, and partial-update reconciliation behind a single service.

pub mod collaborators;
pub mod domain;
pub mod import;
pub mod metrics;
pub mod query;
pub mod reconcile;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod settings;
pub mod spiel;

#[cfg(test)]
mod tests;

pub use collaborators::{
    DistanceError, DistanceProvider, ExtractionError, ListingExtractor, ListingSource, RawListing,
};
pub use domain::{GroupTag, ImageDecodeError, Listing, ListingId, ListingImage, Rating};
pub use import::{ImportIssue, ImportRow, ImportSummary, ListingCsvImporter};
pub use metrics::DerivedMetrics;
pub use query::{GroupFilter, ListingQuery, ListingQueryParams, ListingSort, QueryError};
pub use reconcile::{
    FieldIssue, IssueKind, ListingDraft, ListingField, ListingPatch, PatchError, ReconcileOutcome,
};
pub use repository::{ListingRepository, RepositoryError};
pub use router::listing_router;
pub use scoring::{
    rank, Criterion, NormalizationBasis, ScoreCard, ScoreComponent, ScoreWeights, ScoringEngine,
    WeightConfig, WeightConfigError, WeightConfigInput,
};
pub use service::{ListingService, ListingServiceError, ListingUpdate};
pub use settings::{SettingsError, SettingsStore, WeightConfigHolder};
pub use spiel::{MemorySpiel, SpielError, SpielStore};
