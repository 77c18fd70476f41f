//! Narrow interfaces to the systems that feed listing data in: page
//! extraction and address-to-distance lookup.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::reconcile::ListingDraft;

/// Where a listing's page content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    Url(String),
    Page { url: Option<String>, content: String },
}

impl ListingSource {
    /// Pasted page content wins over fetching the URL. Blank values count as
    /// absent, so `None` means there is nothing to extract from.
    pub fn from_parts(url: Option<String>, content: Option<String>) -> Option<Self> {
        let url = url.filter(|url| !url.trim().is_empty());
        match content.filter(|content| !content.trim().is_empty()) {
            Some(content) => Some(ListingSource::Page { url, content }),
            None => url.map(ListingSource::Url),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ListingSource::Url(url) => Some(url),
            ListingSource::Page { url, .. } => url.as_deref(),
        }
    }
}

/// Attribute bag produced by an extractor. Values are kept as the text found
/// on the page and go through the same field rules as any other payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    pub url: Option<String>,
    pub address: Option<String>,
    pub price: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub square_footage: Option<String>,
    pub date_available: Option<String>,
    /// Image as a `data:` URI.
    pub image: Option<String>,
}

impl RawListing {
    pub fn into_draft(self) -> ListingDraft {
        let mut draft = ListingDraft::default();
        let attributes = [
            ("url", self.url),
            ("address", self.address),
            ("price", self.price),
            ("bedrooms", self.bedrooms),
            ("bathrooms", self.bathrooms),
            ("square_footage", self.square_footage),
            ("date_available", self.date_available),
            ("image", self.image),
        ];
        for (key, value) in attributes {
            if let Some(value) = value {
                draft.set(key, Value::String(value));
            }
        }
        draft
    }
}

pub trait ListingExtractor: Send + Sync {
    fn extract(&self, source: &ListingSource) -> Result<RawListing, ExtractionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("listing page could not be fetched: {0}")]
    Fetch(String),
    #[error("listing page could not be parsed: {0}")]
    Parse(String),
}

/// Distance between two addresses, in the provider's reference unit.
pub trait DistanceProvider: Send + Sync {
    fn distance(&self, address: &str, reference: &str) -> Result<f64, DistanceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DistanceError {
    #[error("address could not be resolved: {0}")]
    Unresolved(String),
    #[error("distance provider unavailable: {0}")]
    Unavailable(String),
}
