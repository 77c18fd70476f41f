//! Sorting and group filtering for listing views.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use super::domain::{GroupTag, Listing};
use super::scoring::compare_scores;

const DATE_FORMATS: [&str; 3] = ["%B %d, %Y", "%Y-%m-%d", "%m/%d/%Y"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingSort {
    #[default]
    Score,
    Price,
    Distance,
    CostPerSqft,
    CostPerOccupant,
    SquareFootage,
    Bedrooms,
    Bathrooms,
    OverallRating,
    DateAvailable,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Ascending,
    Descending,
}

impl ListingSort {
    pub const fn key(self) -> &'static str {
        match self {
            ListingSort::Score => "score",
            ListingSort::Price => "price",
            ListingSort::Distance => "distance",
            ListingSort::CostPerSqft => "cost_per_sqft",
            ListingSort::CostPerOccupant => "cost_per_occupant",
            ListingSort::SquareFootage => "square_footage",
            ListingSort::Bedrooms => "bedrooms",
            ListingSort::Bathrooms => "bathrooms",
            ListingSort::OverallRating => "overall_rating",
            ListingSort::DateAvailable => "date_available",
            ListingSort::Id => "id",
        }
    }

    const fn direction(self) -> Direction {
        match self {
            ListingSort::Price
            | ListingSort::Distance
            | ListingSort::CostPerSqft
            | ListingSort::CostPerOccupant
            | ListingSort::DateAvailable
            | ListingSort::Id => Direction::Ascending,
            ListingSort::Score
            | ListingSort::SquareFootage
            | ListingSort::Bedrooms
            | ListingSort::Bathrooms
            | ListingSort::OverallRating => Direction::Descending,
        }
    }

    fn sort_value(self, listing: &Listing) -> Option<f64> {
        match self {
            ListingSort::Score => listing.score,
            ListingSort::Price => listing.price,
            ListingSort::Distance => listing.distance,
            ListingSort::CostPerSqft => listing.metrics.cost_per_sqft,
            ListingSort::CostPerOccupant => listing.metrics.cost_per_occupant,
            ListingSort::SquareFootage => listing.square_footage.map(f64::from),
            ListingSort::Bedrooms => listing.bedrooms,
            ListingSort::Bathrooms => listing.bathrooms,
            ListingSort::OverallRating => Some(f64::from(listing.overall_rating.get())),
            ListingSort::DateAvailable => listing
                .date_available
                .as_deref()
                .and_then(parse_available_date)
                .map(|date| f64::from(date.num_days_from_ce())),
            ListingSort::Id => Some(listing.id.0 as f64),
        }
    }

    /// Order listings by this key; absent values go last and ties fall back
    /// to ascending id.
    pub fn compare(self, a: &Listing, b: &Listing) -> Ordering {
        match self {
            ListingSort::Score => compare_scores(a, b),
            ListingSort::Id => a.id.cmp(&b.id),
            _ => compare_present_first(self.sort_value(a), self.sort_value(b), self.direction())
                .then_with(|| a.id.cmp(&b.id)),
        }
    }
}

impl FromStr for ListingSort {
    type Err = QueryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let sort = match raw.trim().to_ascii_lowercase().as_str() {
            "" | "score" => ListingSort::Score,
            "price" => ListingSort::Price,
            "distance" => ListingSort::Distance,
            "cost_per_sqft" => ListingSort::CostPerSqft,
            "cost_per_occupant" | "cost_per_roommate" => ListingSort::CostPerOccupant,
            "square_footage" => ListingSort::SquareFootage,
            "bedrooms" => ListingSort::Bedrooms,
            "bathrooms" => ListingSort::Bathrooms,
            "overall_rating" => ListingSort::OverallRating,
            "date_available" => ListingSort::DateAvailable,
            "id" => ListingSort::Id,
            _ => return Err(QueryError::UnknownSortKey(raw.to_string())),
        };
        Ok(sort)
    }
}

fn compare_present_first(a: Option<f64>, b: Option<f64>, direction: Direction) -> Ordering {
    match (a, b) {
        (Some(left), Some(right)) => match direction {
            Direction::Ascending => left.total_cmp(&right),
            Direction::Descending => right.total_cmp(&left),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub(crate) fn parse_available_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Which listings a view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupFilter {
    #[default]
    All,
    Only(GroupTag),
}

impl GroupFilter {
    pub fn matches(self, listing: &Listing) -> bool {
        match self {
            GroupFilter::All => true,
            GroupFilter::Only(tag) => listing.group == tag,
        }
    }
}

impl FromStr for GroupFilter {
    type Err = QueryError;

    /// `none` selects every listing, matching the "show all" choice of the
    /// group picker.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(GroupFilter::All);
        }
        match GroupTag::from_label(trimmed) {
            Some(GroupTag::Unassigned) => Ok(GroupFilter::All),
            Some(tag) => Ok(GroupFilter::Only(tag)),
            None => Err(QueryError::UnknownGroup(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("unknown sort key '{0}'")]
    UnknownSortKey(String),
    #[error("unknown group '{0}'")]
    UnknownGroup(String),
}

/// A ranked, optionally group-filtered view of the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub sort: ListingSort,
    pub group: GroupFilter,
}

/// Raw query string parameters for listing views.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQueryParams {
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl TryFrom<ListingQueryParams> for ListingQuery {
    type Error = QueryError;

    fn try_from(params: ListingQueryParams) -> Result<Self, Self::Error> {
        Ok(Self {
            sort: params.sort_by.as_deref().unwrap_or_default().parse()?,
            group: params.group.as_deref().unwrap_or_default().parse()?,
        })
    }
}

impl ListingQuery {
    pub fn order(&self, listings: &mut [Listing]) {
        listings.sort_by(|a, b| self.sort.compare(a, b));
    }
}
