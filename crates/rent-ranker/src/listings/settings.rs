use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use super::scoring::WeightConfig;

/// Persistence for the active weight configuration.
pub trait SettingsStore: Send + Sync {
    fn get(&self) -> Result<Option<WeightConfig>, SettingsError>;
    fn set(&self, config: &WeightConfig) -> Result<(), SettingsError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings store unavailable: {0}")]
    Unavailable(String),
    #[error("stored settings are invalid: {0}")]
    Corrupt(String),
}

/// Owns the weight configuration every scoring pass reads.
pub struct WeightConfigHolder<S> {
    store: Arc<S>,
    current: RwLock<WeightConfig>,
}

impl<S> WeightConfigHolder<S>
where
    S: SettingsStore,
{
    /// Start from the stored configuration, or `fallback` when the store is
    /// empty or unreadable.
    pub fn load(store: Arc<S>, fallback: WeightConfig) -> Self {
        let current = match store.get() {
            Ok(Some(config)) => config,
            Ok(None) => fallback,
            Err(error) => {
                warn!(error = %error, "falling back to default weights");
                fallback
            }
        };

        Self {
            store,
            current: RwLock::new(current),
        }
    }

    pub fn current(&self) -> WeightConfig {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persist and activate `config`, returning the configuration it replaced.
    /// When persisting fails the active configuration is left untouched.
    pub fn replace(&self, config: WeightConfig) -> Result<WeightConfig, SettingsError> {
        self.store.set(&config)?;
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        Ok(std::mem::replace(&mut *current, config))
    }
}

impl<S> std::fmt::Debug for WeightConfigHolder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("WeightConfigHolder")
            .field("current", &*current)
            .finish_non_exhaustive()
    }
}
