//! Partial-update merge rules for listing records.
//!
//! A payload is a JSON object of field name to value. Each field is validated
//! independently: a bad value is reported as a [`FieldIssue`] and the rest of
//! the payload still applies. Omitted keys, `null` and blank strings leave
//! numeric fields untouched so "no value" never collapses into zero.

mod fields;
mod patch;

pub use patch::{ListingDraft, ListingPatch, PatchError};

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::domain::{GroupTag, Listing, ListingImage, Rating};

/// Writable listing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingField {
    Address,
    Url,
    Price,
    SquareFootage,
    Bedrooms,
    Bathrooms,
    OccupantCount,
    UtilityEstimate,
    DateAvailable,
    OverallRating,
    Group,
    Contacted,
    Applied,
    Comments,
    Image,
}

impl ListingField {
    pub const fn key(self) -> &'static str {
        match self {
            ListingField::Address => "address",
            ListingField::Url => "url",
            ListingField::Price => "price",
            ListingField::SquareFootage => "square_footage",
            ListingField::Bedrooms => "bedrooms",
            ListingField::Bathrooms => "bathrooms",
            ListingField::OccupantCount => "occupant_count",
            ListingField::UtilityEstimate => "utility_estimate",
            ListingField::DateAvailable => "date_available",
            ListingField::OverallRating => "overall_rating",
            ListingField::Group => "group",
            ListingField::Contacted => "contacted",
            ListingField::Applied => "applied",
            ListingField::Comments => "comments",
            ListingField::Image => "image",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "address" => ListingField::Address,
            "url" => ListingField::Url,
            "price" => ListingField::Price,
            "square_footage" => ListingField::SquareFootage,
            "bedrooms" => ListingField::Bedrooms,
            "bathrooms" => ListingField::Bathrooms,
            "occupant_count" | "roommates" => ListingField::OccupantCount,
            "utility_estimate" => ListingField::UtilityEstimate,
            "date_available" => ListingField::DateAvailable,
            "overall_rating" => ListingField::OverallRating,
            "group" => ListingField::Group,
            "contacted" => ListingField::Contacted,
            "applied" => ListingField::Applied,
            "comments" => ListingField::Comments,
            "image" | "new_image_base64" => ListingField::Image,
            _ => return None,
        };
        Some(field)
    }
}

impl fmt::Display for ListingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

const READ_ONLY_KEYS: [&str; 7] = [
    "id",
    "cost_per_sqft",
    "cost_per_occupant",
    "cost_per_roommate",
    "score",
    "score_components",
    "distance",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Value could not be read as a number; the field was left unchanged.
    Unparseable,
    Negative,
    /// Rating was outside 1–10 or unreadable and has been reset to the default.
    RatingReset,
    InvalidGroup,
    InvalidImage,
    WrongType,
    EmptyAddress,
    ReadOnly,
    UnknownField,
}

/// Field-level problem found while merging. Never aborts the update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub kind: IssueKind,
    pub message: String,
}

impl FieldIssue {
    fn new(field: &str, kind: IssueKind) -> Self {
        let message = match kind {
            IssueKind::Unparseable => format!("{field} is not a number; left unchanged"),
            IssueKind::Negative => format!("{field} must not be negative"),
            IssueKind::RatingReset => format!(
                "{field} must be an integer between {} and {}; reset to {}",
                Rating::MIN,
                Rating::MAX,
                Rating::DEFAULT.get()
            ),
            IssueKind::InvalidGroup => {
                format!("{field} must be one of none, red, blue, green, yellow, purple")
            }
            IssueKind::InvalidImage => format!("{field} must be a base64 image data URI"),
            IssueKind::WrongType => format!("{field} has the wrong type"),
            IssueKind::EmptyAddress => format!("{field} must not be empty"),
            IssueKind::ReadOnly => format!("{field} is computed and cannot be set"),
            IssueKind::UnknownField => format!("{field} is not a listing field"),
        };
        Self {
            field: field.to_string(),
            kind,
            message,
        }
    }

    fn with_detail(field: &str, kind: IssueKind, detail: impl fmt::Display) -> Self {
        let mut issue = Self::new(field, kind);
        issue.message = format!("{}: {detail}", issue.message);
        issue
    }
}

/// Merged record, the fields whose value actually changed, and the issues met.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub listing: Listing,
    pub changed: BTreeSet<ListingField>,
    pub issues: Vec<FieldIssue>,
}

impl ReconcileOutcome {
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Merge `fields` onto a copy of `current` and refresh its derived metrics.
/// Scoring is left to the caller.
pub(crate) fn merge_fields(current: &Listing, fields: &Map<String, Value>) -> ReconcileOutcome {
    let mut listing = current.clone();
    let mut changed = BTreeSet::new();
    let mut issues = Vec::new();

    for (key, value) in fields {
        let Some(field) = ListingField::from_key(key) else {
            let kind = if READ_ONLY_KEYS.contains(&key.as_str()) {
                IssueKind::ReadOnly
            } else {
                IssueKind::UnknownField
            };
            issues.push(FieldIssue::new(key, kind));
            continue;
        };

        if field == ListingField::OverallRating {
            // An invalid rating is still written (as the default) and reported.
            let (rating_changed, reset) = apply_rating(&mut listing, value);
            if rating_changed {
                changed.insert(field);
            }
            if reset {
                issues.push(FieldIssue::new(key, IssueKind::RatingReset));
            }
            continue;
        }

        match apply_field(&mut listing, field, key, value) {
            Ok(true) => {
                changed.insert(field);
            }
            Ok(false) => {}
            Err(issue) => issues.push(issue),
        }
    }

    listing.refresh_metrics();

    ReconcileOutcome {
        listing,
        changed,
        issues,
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Returns whether the rating moved and whether the input had to be reset.
fn apply_rating(listing: &mut Listing, value: &Value) -> (bool, bool) {
    if fields::parse_numeric(value) == fields::NumericInput::Unchanged {
        return (false, false);
    }
    let (rating, valid) = Rating::from_value(value);
    (replace(&mut listing.overall_rating, rating), !valid)
}

fn apply_field(
    listing: &mut Listing,
    field: ListingField,
    key: &str,
    value: &Value,
) -> Result<bool, FieldIssue> {
    let issue = |kind: IssueKind| FieldIssue::new(key, kind);

    let changed = match field {
        ListingField::Price
        | ListingField::Bedrooms
        | ListingField::Bathrooms
        | ListingField::UtilityEstimate => {
            let Some(parsed) = fields::non_negative(value).map_err(issue)? else {
                return Ok(false);
            };
            let slot = match field {
                ListingField::Price => &mut listing.price,
                ListingField::Bedrooms => &mut listing.bedrooms,
                ListingField::Bathrooms => &mut listing.bathrooms,
                _ => &mut listing.utility_estimate,
            };
            replace(slot, Some(parsed))
        }
        ListingField::SquareFootage => match fields::non_negative_integer(value).map_err(issue)? {
            Some(parsed) => replace(&mut listing.square_footage, Some(parsed)),
            None => false,
        },
        ListingField::OccupantCount => match fields::non_negative_integer(value).map_err(issue)? {
            Some(parsed) => replace(&mut listing.occupant_count, parsed),
            None => false,
        },
        // Resets are reported by `merge_fields`.
        ListingField::OverallRating => apply_rating(listing, value).0,
        ListingField::Group => {
            let tag = value
                .as_str()
                .and_then(GroupTag::from_label)
                .ok_or_else(|| FieldIssue::with_detail(key, IssueKind::InvalidGroup, value))?;
            replace(&mut listing.group, tag)
        }
        ListingField::Contacted => {
            replace(&mut listing.contacted, fields::boolean(value).map_err(issue)?)
        }
        ListingField::Applied => {
            replace(&mut listing.applied, fields::boolean(value).map_err(issue)?)
        }
        ListingField::Comments => match value {
            Value::String(text) => replace(&mut listing.comments, text.clone()),
            Value::Null => replace(&mut listing.comments, String::new()),
            _ => return Err(issue(IssueKind::WrongType)),
        },
        ListingField::Address => match value {
            Value::String(text) if !text.trim().is_empty() => {
                replace(&mut listing.address, text.trim().to_string())
            }
            Value::String(_) | Value::Null => return Err(issue(IssueKind::EmptyAddress)),
            _ => return Err(issue(IssueKind::WrongType)),
        },
        ListingField::Url => {
            replace(&mut listing.url, fields::optional_text(value).map_err(issue)?)
        }
        ListingField::DateAvailable => replace(
            &mut listing.date_available,
            fields::optional_text(value).map_err(issue)?,
        ),
        ListingField::Image => match value {
            Value::Null => replace(&mut listing.image, None),
            Value::String(raw) if raw.trim().is_empty() => false,
            Value::String(raw) => {
                let image = ListingImage::from_data_uri(raw)
                    .map_err(|error| FieldIssue::with_detail(key, IssueKind::InvalidImage, error))?;
                replace(&mut listing.image, Some(image))
            }
            _ => return Err(issue(IssueKind::WrongType)),
        },
    };

    Ok(changed)
}
