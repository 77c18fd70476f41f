//! The saved application message a renter pastes into landlord inquiries.

use std::sync::{PoisonError, RwLock};

/// Storage for the single saved spiel.
pub trait SpielStore: Send + Sync {
    /// `None` when nothing has been saved yet.
    fn get(&self) -> Result<Option<String>, SpielError>;
    fn set(&self, spiel: &str) -> Result<(), SpielError>;
}

/// Spiel kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySpiel {
    saved: RwLock<Option<String>>,
}

impl SpielStore for MemorySpiel {
    fn get(&self) -> Result<Option<String>, SpielError> {
        Ok(self
            .saved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn set(&self, spiel: &str) -> Result<(), SpielError> {
        *self.saved.write().unwrap_or_else(PoisonError::into_inner) = Some(spiel.to_string());
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpielError {
    #[error("spiel store unavailable: {0}")]
    Unavailable(String),
}
