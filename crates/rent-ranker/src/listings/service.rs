use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::collaborators::{DistanceProvider, ExtractionError, ListingExtractor, ListingSource};
use super::domain::{Listing, ListingId};
use super::import::{ImportRow, ImportSummary};
use super::query::ListingQuery;
use super::reconcile::{FieldIssue, ListingDraft, ListingField, ListingPatch, PatchError};
use super::repository::{ListingRepository, RepositoryError};
use super::scoring::{ScoringEngine, WeightConfig};
use super::settings::{SettingsError, SettingsStore, WeightConfigHolder};
use super::spiel::{MemorySpiel, SpielError, SpielStore};

/// Result of a create or update: the stored, rescored listing plus what the
/// merge did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingUpdate {
    pub listing: Listing,
    pub changed: BTreeSet<ListingField>,
    pub issues: Vec<FieldIssue>,
}

/// Service composing the listing store, weight configuration, the saved
/// spiel, and the distance and extraction collaborators.
///
/// Every mutation runs validate, merge, derive, score, persist in that order
/// while holding the writer lock, so no caller observes a half-applied update.
pub struct ListingService<R, S> {
    repository: Arc<R>,
    weights: WeightConfigHolder<S>,
    distances: Arc<dyn DistanceProvider>,
    extractor: Option<Arc<dyn ListingExtractor>>,
    spiel: Arc<dyn SpielStore>,
    writer: Mutex<()>,
}

impl<R, S> ListingService<R, S>
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    pub fn new(
        repository: Arc<R>,
        weights: WeightConfigHolder<S>,
        distances: Arc<dyn DistanceProvider>,
    ) -> Self {
        Self {
            repository,
            weights,
            distances,
            extractor: None,
            spiel: Arc::new(MemorySpiel::default()),
            writer: Mutex::new(()),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ListingExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_spiel_store(mut self, spiel: Arc<dyn SpielStore>) -> Self {
        self.spiel = spiel;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a listing from a field payload and rescore the collection.
    pub fn create(&self, draft: ListingDraft) -> Result<ListingUpdate, ListingServiceError> {
        let _writer = self.lock();
        let config = self.weights.current();

        let mut update = self.insert_draft(&draft, &config)?;
        let rescored = match self.rescore_all(&config) {
            Ok(rescored) => rescored,
            Err(error) => {
                self.discard(&[update.listing.id]);
                return Err(error.into());
            }
        };
        if let Some(listing) = find_listing(rescored, update.listing.id) {
            update.listing = listing;
        }

        info!(
            listing_id = %update.listing.id,
            issues = update.issues.len(),
            "listing created"
        );
        Ok(update)
    }

    /// Run the configured extractor over `source` and create a listing from
    /// the attributes it found.
    pub fn create_from_source(
        &self,
        source: &ListingSource,
    ) -> Result<ListingUpdate, ListingServiceError> {
        let extractor = self
            .extractor
            .as_ref()
            .ok_or(ListingServiceError::ExtractorUnavailable)?;
        let raw = extractor.extract(source)?;

        let mut draft = raw.into_draft();
        if !draft.fields().contains_key("url") {
            if let Some(url) = source.url() {
                draft.set("url", Value::String(url.to_string()));
            }
        }
        self.create(draft)
    }

    pub fn get(&self, id: ListingId) -> Result<Listing, ListingServiceError> {
        self.repository
            .fetch(id)?
            .ok_or(ListingServiceError::NotFound(id))
    }

    /// Ranked view. Scores are recomputed against the visible set and are not
    /// persisted.
    pub fn list(&self, query: &ListingQuery) -> Result<Vec<Listing>, ListingServiceError> {
        let mut visible: Vec<Listing> = self
            .repository
            .list()?
            .into_iter()
            .filter(|listing| query.group.matches(listing))
            .collect();

        ScoringEngine::new(&self.weights.current()).apply(&mut visible);
        query.order(&mut visible);
        Ok(visible)
    }

    /// Merge a partial update into the stored listing.
    pub fn update(&self, patch: ListingPatch) -> Result<ListingUpdate, ListingServiceError> {
        let _writer = self.lock();
        let id = patch.id();
        let current = self
            .repository
            .fetch(id)?
            .ok_or(ListingServiceError::NotFound(id))?;

        let outcome = patch.apply(&current);
        let mut listing = outcome.listing;

        if outcome.changed.is_empty() {
            debug!(
                listing_id = %id,
                issues = outcome.issues.len(),
                "update left listing unchanged"
            );
            return Ok(ListingUpdate {
                listing,
                changed: outcome.changed,
                issues: outcome.issues,
            });
        }

        let config = self.weights.current();
        if outcome.changed.contains(&ListingField::Address) {
            listing.distance = self.lookup_distance(&listing.address, config.reference_address());
        }

        self.repository.update(listing).map_err(|error| match error {
            RepositoryError::NotFound => ListingServiceError::NotFound(id),
            other => other.into(),
        })?;

        let rescored = match self.rescore_all(&config) {
            Ok(rescored) => rescored,
            Err(error) => {
                if let Err(restore) = self.repository.update(current) {
                    warn!(
                        listing_id = %id,
                        error = %restore,
                        "previous listing could not be restored"
                    );
                }
                return Err(error.into());
            }
        };
        let listing = find_listing(rescored, id).ok_or(ListingServiceError::NotFound(id))?;

        let changed: Vec<&str> = outcome.changed.iter().map(|field| field.key()).collect();
        info!(
            listing_id = %id,
            changed = ?changed,
            issues = outcome.issues.len(),
            "listing updated"
        );

        Ok(ListingUpdate {
            listing,
            changed: outcome.changed,
            issues: outcome.issues,
        })
    }

    pub fn set_contacted(
        &self,
        id: ListingId,
        selected: bool,
    ) -> Result<ListingUpdate, ListingServiceError> {
        self.update(ListingPatch::single(id, "contacted", Value::Bool(selected)))
    }

    pub fn set_applied(
        &self,
        id: ListingId,
        selected: bool,
    ) -> Result<ListingUpdate, ListingServiceError> {
        self.update(ListingPatch::single(id, "applied", Value::Bool(selected)))
    }

    pub fn set_group(
        &self,
        id: ListingId,
        group: Value,
    ) -> Result<ListingUpdate, ListingServiceError> {
        self.update(ListingPatch::single(id, "group", group))
    }

    pub fn set_comments(
        &self,
        id: ListingId,
        comments: Value,
    ) -> Result<ListingUpdate, ListingServiceError> {
        self.update(ListingPatch::single(id, "comments", comments))
    }

    /// Remove a listing. The survivors are scored before anything is
    /// removed, so a store that cannot be read leaves the collection intact.
    pub fn delete(&self, id: ListingId) -> Result<(), ListingServiceError> {
        let _writer = self.lock();
        let mut remaining = self.repository.list()?;
        let before = remaining.len();
        remaining.retain(|listing| listing.id != id);
        if remaining.len() == before {
            return Err(ListingServiceError::NotFound(id));
        }
        ScoringEngine::new(&self.weights.current()).apply(&mut remaining);

        if !self.repository.delete(id)? {
            return Err(ListingServiceError::NotFound(id));
        }
        if let Err(error) = self.repository.update_many(remaining) {
            warn!(
                listing_id = %id,
                error = %error,
                "remaining listings kept their previous scores"
            );
        }

        info!(listing_id = %id, "listing deleted");
        Ok(())
    }

    pub fn settings(&self) -> WeightConfig {
        self.weights.current()
    }

    /// Activate a new weight configuration and rescore every stored listing.
    /// Distances are refreshed when the reference address moved.
    ///
    /// The rescored set is computed before the configuration is swapped, and
    /// the previous configuration comes back if the listings cannot be saved.
    pub fn update_settings(
        &self,
        config: WeightConfig,
    ) -> Result<WeightConfig, ListingServiceError> {
        let _writer = self.lock();
        let active = self.weights.current();

        let mut listings = self.repository.list()?;
        let reference_moved = active.reference_address() != config.reference_address();
        if reference_moved {
            for listing in &mut listings {
                listing.distance =
                    self.lookup_distance(&listing.address, config.reference_address());
            }
        }

        ScoringEngine::new(&config).apply(&mut listings);
        let count = listings.len();

        let previous = self.weights.replace(config.clone())?;
        if let Err(error) = self.repository.update_many(listings) {
            if let Err(restore) = self.weights.replace(previous) {
                warn!(error = %restore, "previous weight configuration could not be restored");
            }
            return Err(error.into());
        }

        info!(rescored = count, reference_moved, "weight configuration replaced");
        Ok(config)
    }

    /// The saved application spiel, empty until one is saved.
    pub fn spiel(&self) -> Result<String, ListingServiceError> {
        Ok(self.spiel.get()?.unwrap_or_default())
    }

    pub fn save_spiel(&self, spiel: &str) -> Result<(), ListingServiceError> {
        self.spiel.set(spiel)?;
        info!(chars = spiel.chars().count(), "application spiel saved");
        Ok(())
    }

    /// Create every importable row, skipping addresses already tracked.
    /// Store failures abort the import and discard the rows it already created;
    /// row-level problems are collected.
    pub fn import(&self, rows: Vec<ImportRow>) -> Result<ImportSummary, ListingServiceError> {
        let _writer = self.lock();
        let config = self.weights.current();
        let mut summary = ImportSummary::default();
        let mut created = Vec::new();

        for row in rows {
            match self.insert_draft(&row.draft, &config) {
                Ok(update) => {
                    summary.created += 1;
                    created.push(update.listing.id);
                    summary
                        .issues
                        .extend(update.issues.into_iter().map(|issue| row.issue(issue)));
                }
                Err(error @ ListingServiceError::DuplicateAddress(_)) => {
                    summary.duplicates += 1;
                    summary.issues.push(row.rejection(&error));
                }
                Err(error @ ListingServiceError::Validation(_)) => {
                    summary.rejected_rows += 1;
                    summary.issues.push(row.rejection(&error));
                }
                Err(other) => {
                    self.discard(&created);
                    return Err(other);
                }
            }
        }

        if summary.created > 0 {
            if let Err(error) = self.rescore_all(&config) {
                self.discard(&created);
                return Err(error.into());
            }
        }

        info!(
            created = summary.created,
            duplicates = summary.duplicates,
            rejected = summary.rejected_rows,
            "listing import finished"
        );
        Ok(summary)
    }

    fn insert_draft(
        &self,
        draft: &ListingDraft,
        config: &WeightConfig,
    ) -> Result<ListingUpdate, ListingServiceError> {
        let outcome = draft.build()?;
        let mut listing = outcome.listing;

        let key = listing.address_key();
        if self
            .repository
            .list()?
            .iter()
            .any(|existing| existing.address_key() == key)
        {
            return Err(ListingServiceError::DuplicateAddress(listing.address));
        }

        listing.distance = self.lookup_distance(&listing.address, config.reference_address());
        let stored = self.repository.insert(listing)?;

        Ok(ListingUpdate {
            listing: stored,
            changed: outcome.changed,
            issues: outcome.issues,
        })
    }

    fn rescore_all(&self, config: &WeightConfig) -> Result<Vec<Listing>, RepositoryError> {
        let mut listings = self.repository.list()?;
        ScoringEngine::new(config).apply(&mut listings);
        self.repository.update_many(listings.clone())?;
        Ok(listings)
    }

    /// Remove listings inserted by an operation that went on to fail.
    fn discard(&self, ids: &[ListingId]) {
        for &id in ids {
            if let Err(error) = self.repository.delete(id) {
                warn!(
                    listing_id = %id,
                    error = %error,
                    "could not discard listing after failed write"
                );
            }
        }
    }

    /// Distance lookups never fail an operation; the criterion is simply
    /// treated as missing.
    fn lookup_distance(&self, address: &str, reference: &str) -> Option<f64> {
        if reference.trim().is_empty() {
            return None;
        }

        match self.distances.distance(address, reference) {
            Ok(distance) if distance.is_finite() && distance >= 0.0 => Some(distance),
            Ok(distance) => {
                warn!(address, distance, "distance provider returned an invalid value");
                None
            }
            Err(error) => {
                warn!(address, error = %error, "distance lookup failed");
                None
            }
        }
    }
}

fn find_listing(listings: Vec<Listing>, id: ListingId) -> Option<Listing> {
    listings.into_iter().find(|listing| listing.id == id)
}

/// Error raised by the listing service.
#[derive(Debug, thiserror::Error)]
pub enum ListingServiceError {
    #[error(transparent)]
    Validation(#[from] PatchError),
    #[error("a listing for '{0}' already exists")]
    DuplicateAddress(String),
    #[error("listing {0} not found")]
    NotFound(ListingId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("no listing extractor is configured")]
    ExtractorUnavailable,
    #[error(transparent)]
    Spiel(#[from] SpielError),
}
