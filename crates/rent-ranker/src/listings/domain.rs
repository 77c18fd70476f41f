use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::metrics::DerivedMetrics;
use super::scoring::ScoreComponent;

/// Identifier assigned by the listing store. Never changes once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub u64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One tracked rental unit together with the user's annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub address: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub square_footage: Option<u32>,
    #[serde(default)]
    pub bedrooms: Option<f64>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default = "default_occupant_count", alias = "roommates")]
    pub occupant_count: u32,
    #[serde(default)]
    pub utility_estimate: Option<f64>,
    #[serde(default)]
    pub date_available: Option<String>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub overall_rating: Rating,
    #[serde(default)]
    pub group: GroupTag,
    #[serde(default)]
    pub contacted: bool,
    #[serde(default)]
    pub applied: bool,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub image: Option<ListingImage>,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub score_components: Vec<ScoreComponent>,
}

pub(crate) const fn default_occupant_count() -> u32 {
    1
}

impl Listing {
    /// Empty record used as the base that creation payloads are merged into.
    /// The store replaces the placeholder identifier on insert.
    pub fn blank() -> Self {
        Self {
            id: ListingId(0),
            address: String::new(),
            url: None,
            price: None,
            square_footage: None,
            bedrooms: None,
            bathrooms: None,
            occupant_count: default_occupant_count(),
            utility_estimate: None,
            date_available: None,
            distance: None,
            overall_rating: Rating::default(),
            group: GroupTag::default(),
            contacted: false,
            applied: false,
            comments: String::new(),
            image: None,
            metrics: DerivedMetrics::default(),
            score: None,
            score_components: Vec::new(),
        }
    }

    /// Recompute cost per area and cost per occupant from the raw fields.
    pub fn refresh_metrics(&mut self) {
        self.metrics = DerivedMetrics::derive(
            self.price,
            self.square_footage,
            self.utility_estimate,
            self.occupant_count,
        );
    }

    /// Address key used to detect duplicate entries of the same unit.
    pub fn address_key(&self) -> String {
        normalize_address(&self.address)
    }
}

pub(crate) fn normalize_address(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// User rating on a 1–10 scale. Anything outside the scale collapses to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    pub const DEFAULT: Rating = Rating(5);

    pub fn new(value: i64) -> Option<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            u8::try_from(value).ok().map(Rating)
        } else {
            None
        }
    }

    /// Parse a loosely typed rating, falling back to the default when it is
    /// missing, fractional, out of range, or not a number.
    pub fn from_value(value: &Value) -> (Self, bool) {
        let parsed = match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(raw) => raw.trim().parse::<i64>().ok(),
            _ => None,
        };

        match parsed.and_then(Self::new) {
            Some(rating) => (rating, true),
            None => (Self::DEFAULT, false),
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Rating::from_value(&value).0)
    }
}

/// Colour tag users group listings under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupTag {
    #[default]
    #[serde(rename = "none")]
    Unassigned,
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
}

impl GroupTag {
    pub const ALL: [GroupTag; 6] = [
        GroupTag::Unassigned,
        GroupTag::Red,
        GroupTag::Blue,
        GroupTag::Green,
        GroupTag::Yellow,
        GroupTag::Purple,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            GroupTag::Unassigned => "none",
            GroupTag::Red => "red",
            GroupTag::Blue => "blue",
            GroupTag::Green => "green",
            GroupTag::Yellow => "yellow",
            GroupTag::Purple => "purple",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let wanted = raw.trim();
        Self::ALL
            .into_iter()
            .find(|tag| tag.label().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for GroupTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decoded image bytes plus the media type they were submitted with.
///
/// Serialized as a `data:` URI so stored records stay self-describing.
#[derive(Clone, PartialEq, Eq)]
pub struct ListingImage {
    media_type: String,
    data: Vec<u8>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageDecodeError {
    #[error("image payload must be a data URI")]
    NotDataUri,
    #[error("image data URI must be base64 encoded")]
    NotBase64Encoded,
    #[error("invalid image media type '{0}'")]
    InvalidMediaType(String),
    #[error("invalid base64 image payload: {0}")]
    Payload(#[from] base64::DecodeError),
    #[error("image payload is empty")]
    Empty,
}

impl ListingImage {
    pub fn new(media_type: mime::Mime, data: Vec<u8>) -> Self {
        Self {
            media_type: media_type.essence_str().to_string(),
            data,
        }
    }

    /// Decode `data:<media-type>;base64,<payload>`.
    pub fn from_data_uri(raw: &str) -> Result<Self, ImageDecodeError> {
        let rest = raw
            .trim()
            .strip_prefix("data:")
            .ok_or(ImageDecodeError::NotDataUri)?;
        let (header, payload) = rest.split_once(',').ok_or(ImageDecodeError::NotDataUri)?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or(ImageDecodeError::NotBase64Encoded)?;

        let parsed: mime::Mime = media_type
            .parse()
            .map_err(|_| ImageDecodeError::InvalidMediaType(media_type.to_string()))?;
        if parsed.type_() != mime::IMAGE {
            return Err(ImageDecodeError::InvalidMediaType(media_type.to_string()));
        }

        let data = STANDARD.decode(payload.trim())?;
        if data.is_empty() {
            return Err(ImageDecodeError::Empty);
        }

        Ok(Self::new(parsed, data))
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, STANDARD.encode(&self.data))
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for ListingImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingImage")
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Serialize for ListingImage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_data_uri())
    }
}

impl<'de> Deserialize<'de> for ListingImage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ListingImage::from_data_uri(&raw).map_err(serde::de::Error::custom)
    }
}
