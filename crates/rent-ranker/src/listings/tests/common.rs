use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};

use crate::listings::collaborators::{
    DistanceError, DistanceProvider, ExtractionError, ListingExtractor, ListingSource, RawListing,
};
use crate::listings::domain::{Listing, ListingId};
use crate::listings::reconcile::ListingDraft;
use crate::listings::repository::{ListingRepository, RepositoryError};
use crate::listings::scoring::{ScoreWeights, WeightConfig};
use crate::listings::settings::{SettingsError, SettingsStore, WeightConfigHolder};
use crate::listings::{listing_router, ListingService};

pub(super) const REFERENCE_ADDRESS: &str = "1 Campus Way";

pub(super) type MemoryService = ListingService<MemoryRepository, MemorySettings>;

pub(super) fn listing(id: u64) -> Listing {
    let mut listing = Listing::blank();
    listing.id = ListingId(id);
    listing.address = format!("{id} Maple Ave");
    listing
}

/// Listing with every scoring input present.
pub(super) fn priced_listing(
    id: u64,
    price: f64,
    square_footage: u32,
    bedrooms: f64,
    bathrooms: f64,
    distance: f64,
) -> Listing {
    let mut listing = listing(id);
    listing.price = Some(price);
    listing.square_footage = Some(square_footage);
    listing.bedrooms = Some(bedrooms);
    listing.bathrooms = Some(bathrooms);
    listing.distance = Some(distance);
    listing.refresh_metrics();
    listing
}

pub(super) fn draft(payload: Value) -> ListingDraft {
    ListingDraft::from_value(payload).expect("draft payload is an object")
}

pub(super) fn weights(rent: f64, sqft: f64, beds: f64, baths: f64, distance: f64) -> WeightConfig {
    WeightConfig::new(
        ScoreWeights {
            rent,
            sqft,
            beds,
            baths,
            distance,
        },
        REFERENCE_ADDRESS,
    )
    .expect("valid weights")
}

pub(super) fn default_config() -> WeightConfig {
    WeightConfig::default().with_reference_address(REFERENCE_ADDRESS)
}

pub(super) fn build_service() -> (MemoryService, Arc<MemoryRepository>, Arc<MemorySettings>) {
    build_service_with_distances(Arc::new(TableDistances::default()))
}

pub(super) fn build_service_with_distances(
    distances: Arc<dyn DistanceProvider>,
) -> (MemoryService, Arc<MemoryRepository>, Arc<MemorySettings>) {
    let repository = Arc::new(MemoryRepository::default());
    let settings = Arc::new(MemorySettings::default());
    let holder = WeightConfigHolder::load(settings.clone(), default_config());
    let service = ListingService::new(repository.clone(), holder, distances);
    (service, repository, settings)
}

pub(super) fn seed(service: &MemoryService, payloads: Vec<Value>) -> Vec<ListingId> {
    payloads
        .into_iter()
        .map(|payload| {
            service
                .create(draft(payload))
                .expect("seed listing created")
                .listing
                .id
        })
        .collect()
}

pub(super) fn sample_payloads() -> Vec<Value> {
    vec![
        json!({
            "address": "10 Birch Rd",
            "price": "$1,000",
            "square_footage": 500,
            "bedrooms": 2,
            "bathrooms": 1,
        }),
        json!({
            "address": "22 Cedar Ct",
            "price": 1200,
            "square_footage": 600,
            "bedrooms": 1,
            "bathrooms": 1,
            "group": "blue",
        }),
        json!({
            "address": "35 Aspen Ln",
            "price": 2100,
            "square_footage": 1100,
            "bedrooms": 3,
            "bathrooms": 2,
            "group": "blue",
        }),
    ]
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<BTreeMap<ListingId, Listing>>,
    next_id: Mutex<u64>,
}

impl MemoryRepository {
    pub(super) fn stored(&self, id: ListingId) -> Option<Listing> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(&id)
            .cloned()
    }
}

impl ListingRepository for MemoryRepository {
    fn insert(&self, mut listing: Listing) -> Result<Listing, RepositoryError> {
        let mut next_id = self.next_id.lock().expect("sequence mutex poisoned");
        *next_id += 1;
        listing.id = ListingId(*next_id);
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(listing.id, listing.clone());
        Ok(listing)
    }

    fn fetch(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(self.stored(id))
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn update(&self, listing: Listing) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(&listing.id) {
            Some(slot) => {
                *slot = listing;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete(&self, id: ListingId) -> Result<bool, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.remove(&id).is_some())
    }
}

pub(super) struct UnavailableRepository;

impl ListingRepository for UnavailableRepository {
    fn insert(&self, _listing: Listing) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _listing: Listing) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: ListingId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Memory store whose updates can be switched off while reads, inserts and
/// deletes keep working.
#[derive(Default)]
pub(super) struct FrozenUpdates {
    pub(super) inner: MemoryRepository,
    frozen: AtomicBool,
}

impl FrozenUpdates {
    pub(super) fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }
}

impl ListingRepository for FrozenUpdates {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        self.inner.insert(listing)
    }

    fn fetch(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.list()
    }

    fn update(&self, listing: Listing) -> Result<(), RepositoryError> {
        if self.frozen.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("updates frozen".to_string()));
        }
        self.inner.update(listing)
    }

    fn delete(&self, id: ListingId) -> Result<bool, RepositoryError> {
        self.inner.delete(id)
    }
}

#[derive(Default)]
pub(super) struct MemorySettings {
    stored: Mutex<Option<WeightConfig>>,
}

impl MemorySettings {
    pub(super) fn stored(&self) -> Option<WeightConfig> {
        self.stored.lock().expect("settings mutex poisoned").clone()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self) -> Result<Option<WeightConfig>, SettingsError> {
        Ok(self.stored())
    }

    fn set(&self, config: &WeightConfig) -> Result<(), SettingsError> {
        *self.stored.lock().expect("settings mutex poisoned") = Some(config.clone());
        Ok(())
    }
}

/// Distances keyed by address; unknown addresses fail to resolve.
#[derive(Default)]
pub(super) struct TableDistances {
    table: HashMap<String, f64>,
    calls: Mutex<Vec<(String, String)>>,
}

impl TableDistances {
    pub(super) fn with(entries: &[(&str, f64)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(address, distance)| (address.to_string(), *distance))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

impl DistanceProvider for TableDistances {
    fn distance(&self, address: &str, reference: &str) -> Result<f64, DistanceError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push((address.to_string(), reference.to_string()));
        self.table
            .get(address)
            .copied()
            .ok_or_else(|| DistanceError::Unresolved(address.to_string()))
    }
}

pub(super) struct FixedExtractor(pub(super) RawListing);

impl ListingExtractor for FixedExtractor {
    fn extract(&self, _source: &ListingSource) -> Result<RawListing, ExtractionError> {
        Ok(self.0.clone())
    }
}

pub(super) struct BrokenExtractor;

impl ListingExtractor for BrokenExtractor {
    fn extract(&self, _source: &ListingSource) -> Result<RawListing, ExtractionError> {
        Err(ExtractionError::Parse("no price element".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    listing_router(Arc::new(service))
}
