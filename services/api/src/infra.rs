use metrics_exporter_prometheus::PrometheusHandle;
use rent_ranker::listings::{
    DistanceError, DistanceProvider, Listing, ListingId, ListingRepository, RepositoryError,
    SettingsError, SettingsStore, SpielError, SpielStore, WeightConfig,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Serialized form of the listing store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ListingSnapshot {
    next_id: u64,
    listings: Vec<Listing>,
}

/// Listing store kept in memory and, when a path is set, mirrored to a JSON
/// file after every mutation.
#[derive(Debug)]
pub(crate) struct ListingStore {
    path: Option<PathBuf>,
    state: Mutex<ListingSnapshot>,
}

impl ListingStore {
    pub(crate) fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(ListingSnapshot::default()),
        }
    }

    /// Opens a file-backed store. A missing file starts empty.
    pub(crate) fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let snapshot = match fs::read(&path) {
            Ok(bytes) => {
                let mut snapshot: ListingSnapshot = serde_json::from_slice(&bytes)
                    .map_err(|err| unavailable(&path, err))?;
                let highest = snapshot.listings.iter().map(|l| l.id.0).max().unwrap_or(0);
                snapshot.next_id = snapshot.next_id.max(highest);
                snapshot
            }
            Err(err) if err.kind() == ErrorKind::NotFound => ListingSnapshot::default(),
            Err(err) => return Err(unavailable(&path, err)),
        };

        debug!(path = %path.display(), listings = snapshot.listings.len(), "listing store opened");
        Ok(Self {
            path: Some(path),
            state: Mutex::new(snapshot),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ListingSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes `staged` out and only then makes it the visible state.
    fn commit(
        &self,
        current: &mut MutexGuard<'_, ListingSnapshot>,
        staged: ListingSnapshot,
    ) -> Result<(), RepositoryError> {
        self.flush(&staged)?;
        **current = staged;
        Ok(())
    }

    fn flush(&self, snapshot: &ListingSnapshot) -> Result<(), RepositoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(|err| unavailable(path, err))?;
        write_atomically(path, &bytes).map_err(|err| unavailable(path, err))
    }
}

impl ListingRepository for ListingStore {
    fn insert(&self, mut listing: Listing) -> Result<Listing, RepositoryError> {
        let mut guard = self.lock();
        let mut staged = guard.clone();
        staged.next_id += 1;
        listing.id = ListingId(staged.next_id);
        staged.listings.push(listing.clone());
        self.commit(&mut guard, staged)?;
        Ok(listing)
    }

    fn fetch(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        let guard = self.lock();
        Ok(guard.listings.iter().find(|listing| listing.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        Ok(self.lock().listings.clone())
    }

    fn update(&self, listing: Listing) -> Result<(), RepositoryError> {
        self.update_many(vec![listing])
    }

    fn update_many(&self, listings: Vec<Listing>) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        let mut staged = guard.clone();
        for listing in listings {
            let slot = staged
                .listings
                .iter_mut()
                .find(|stored| stored.id == listing.id)
                .ok_or(RepositoryError::NotFound)?;
            *slot = listing;
        }
        self.commit(&mut guard, staged)
    }

    fn delete(&self, id: ListingId) -> Result<bool, RepositoryError> {
        let mut guard = self.lock();
        if !guard.listings.iter().any(|listing| listing.id == id) {
            return Ok(false);
        }
        let mut staged = guard.clone();
        staged.listings.retain(|listing| listing.id != id);
        self.commit(&mut guard, staged)?;
        Ok(true)
    }
}

/// Weight settings held in memory, optionally persisted as JSON.
#[derive(Debug, Default)]
pub(crate) struct SettingsFile {
    path: Option<PathBuf>,
    cached: Mutex<Option<WeightConfig>>,
}

impl SettingsFile {
    pub(crate) fn in_memory() -> Self {
        Self::default()
    }

    pub(crate) fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            cached: Mutex::new(None),
        }
    }
}

impl SettingsStore for SettingsFile {
    fn get(&self) -> Result<Option<WeightConfig>, SettingsError> {
        let cached = self
            .cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if cached.is_some() {
            return Ok(cached);
        }
        let Some(path) = &self.path else {
            return Ok(None);
        };

        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice::<WeightConfig>(&bytes)
                .map(Some)
                .map_err(|err| SettingsError::Corrupt(format!("{}: {err}", path.display()))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SettingsError::Unavailable(format!(
                "{}: {err}",
                path.display()
            ))),
        }
    }

    fn set(&self, config: &WeightConfig) -> Result<(), SettingsError> {
        if let Some(path) = &self.path {
            let bytes = serde_json::to_vec_pretty(config)
                .map_err(|err| SettingsError::Unavailable(err.to_string()))?;
            write_atomically(path, &bytes).map_err(|err| {
                SettingsError::Unavailable(format!("{}: {err}", path.display()))
            })?;
        }
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
        Ok(())
    }
}

/// Application spiel kept as a plain text file. A missing or empty file reads
/// as nothing saved.
#[derive(Debug)]
pub(crate) struct SpielFile {
    path: PathBuf,
}

impl SpielFile {
    pub(crate) fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SpielStore for SpielFile {
    fn get(&self) -> Result<Option<String>, SpielError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SpielError::Unavailable(format!(
                "{}: {err}",
                self.path.display()
            ))),
        }
    }

    fn set(&self, spiel: &str) -> Result<(), SpielError> {
        write_atomically(&self.path, spiel.as_bytes())
            .map_err(|err| SpielError::Unavailable(format!("{}: {err}", self.path.display())))
    }
}

/// Used when no geocoding backend is configured. Distances stay absent and the
/// distance criterion falls back to its neutral value.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct OfflineDistanceProvider;

impl DistanceProvider for OfflineDistanceProvider {
    fn distance(&self, address: &str, _reference: &str) -> Result<f64, DistanceError> {
        Err(DistanceError::Unavailable(format!(
            "no geocoding backend configured for '{address}'"
        )))
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    fs::write(&staging, bytes)?;
    fs::rename(&staging, path)
}

fn unavailable(path: &Path, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable(format!("{}: {err}", path.display()))
}
