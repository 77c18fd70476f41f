use serde_json::{Map, Value};

use super::{merge_fields, ReconcileOutcome};
use crate::listings::domain::{Listing, ListingId};

/// Payload-level validation failure. Nothing has been mutated when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("listing payload must be a JSON object")]
    NotAnObject,
    #[error("listing payload is missing an id")]
    MissingId,
    #[error("invalid listing id '{0}'")]
    InvalidId(String),
    #[error("listing address is required")]
    MissingAddress,
}

/// Partial update addressed to one stored listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPatch {
    id: ListingId,
    fields: Map<String, Value>,
}

impl ListingPatch {
    pub fn new(id: ListingId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Patch touching a single field, as issued by the status endpoints.
    pub fn single(id: ListingId, key: &str, value: Value) -> Self {
        let mut fields = Map::new();
        fields.insert(key.to_string(), value);
        Self { id, fields }
    }

    /// Split an update body into its target id and the remaining fields.
    pub fn from_value(payload: Value) -> Result<Self, PatchError> {
        let Value::Object(mut fields) = payload else {
            return Err(PatchError::NotAnObject);
        };
        let raw_id = fields.remove("id").ok_or(PatchError::MissingId)?;
        let id = parse_id(&raw_id)?;
        Ok(Self { id, fields })
    }

    pub fn id(&self) -> ListingId {
        self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn apply(&self, current: &Listing) -> ReconcileOutcome {
        merge_fields(current, &self.fields)
    }
}

/// Field bag a new listing is built from: a creation request, a scraped
/// attribute set, or one CSV row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingDraft {
    fields: Map<String, Value>,
}

impl ListingDraft {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn from_value(payload: Value) -> Result<Self, PatchError> {
        match payload {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(PatchError::NotAnObject),
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Merge the draft onto a blank listing. The result still carries the
    /// placeholder id until the repository assigns one.
    pub fn build(&self) -> Result<ReconcileOutcome, PatchError> {
        let outcome = merge_fields(&Listing::blank(), &self.fields);
        if outcome.listing.address.trim().is_empty() {
            return Err(PatchError::MissingAddress);
        }
        Ok(outcome)
    }
}

pub(crate) fn parse_id(value: &Value) -> Result<ListingId, PatchError> {
    let parsed = match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(raw) => raw.trim().parse::<u64>().ok(),
        Value::Null => return Err(PatchError::MissingId),
        _ => None,
    };

    parsed
        .map(ListingId)
        .ok_or_else(|| PatchError::InvalidId(value.to_string()))
}
