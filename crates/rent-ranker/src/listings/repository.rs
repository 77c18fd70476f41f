use super::domain::{Listing, ListingId};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ListingRepository: Send + Sync {
    /// Store a new listing, assigning its identifier.
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError>;
    fn fetch(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError>;
    fn list(&self) -> Result<Vec<Listing>, RepositoryError>;
    fn update(&self, listing: Listing) -> Result<(), RepositoryError>;

    fn update_many(&self, listings: Vec<Listing>) -> Result<(), RepositoryError> {
        for listing in listings {
            self.update(listing)?;
        }
        Ok(())
    }

    /// Remove a listing; `false` when nothing was stored under `id`.
    fn delete(&self, id: ListingId) -> Result<bool, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
