//! Dataset record types.
//!
//! These types mirror the JSON dataset so the pipeline can rewrite the file
//! without losing keys it does not own.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Pixel dimensions of an image, serialized as `"<width>x<height>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected <width>x<height>, got {s:?}"))?;
        let width = width
            .trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid width in {s:?}: {err}"))?;
        let height = height
            .trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid height in {s:?}: {err}"))?;
        Ok(Self { width, height })
    }
}

impl Serialize for Dimensions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dimensions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// One vehicle in the dataset.
///
/// `(make, model, year)` is the semantic identity; the three image fields are
/// the only ones the pipeline ever mutates. Unknown keys ride along in
/// `extra` so a rewrite never drops data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarRecord {
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "optional_dimensions")]
    pub image_size: Option<Dimensions>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub car_color: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CarRecord {
    pub fn new(make: impl Into<String>, model: impl Into<String>, year: i32) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year,
            image_url: None,
            image_size: None,
            car_color: None,
            extra: serde_json::Map::new(),
        }
    }

    /// A record is enriched once it carries an image URL.
    pub fn is_enriched(&self) -> bool {
        self.image_url.is_some()
    }

    /// Enriched but still missing the color label.
    pub fn needs_color(&self) -> bool {
        self.is_enriched() && self.car_color.is_none()
    }

    /// Clear a size or color left behind without an image URL.
    ///
    /// Returns true when something was cleared.
    pub fn clear_orphaned_image_fields(&mut self) -> bool {
        if self.is_enriched() || (self.image_size.is_none() && self.car_color.is_none()) {
            return false;
        }
        self.image_size = None;
        self.car_color = None;
        true
    }

    pub fn query(&self) -> CarQuery {
        CarQuery {
            make: self.make.clone(),
            model: self.model.clone(),
            year: self.year,
        }
    }

    /// Apply a validated enrichment in one step.
    pub fn enrich(&mut self, url: String, size: Dimensions, color: String) {
        self.image_url = Some(url);
        self.image_size = Some(size);
        self.car_color = Some(color);
    }

    pub fn label(&self) -> String {
        format!("{} {} {}", self.make, self.model, self.year)
    }
}

/// Identifying fields handed to search providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarQuery {
    pub make: String,
    pub model: String,
    pub year: i32,
}

impl fmt::Display for CarQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.make, self.model, self.year)
    }
}

/// Ordered record sequence; order is the traversal order and is preserved
/// across writes.
pub type RecordCollection = Vec<CarRecord>;

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.trim().is_empty()))
}

fn optional_dimensions<'de, D>(deserializer: D) -> Result<Option<Dimensions>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value {
        Some(text) if !text.trim().is_empty() => text
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
