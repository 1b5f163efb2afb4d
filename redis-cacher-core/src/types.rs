//! Geospatial query options and result records

use crate::value::RespValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance unit understood by the geo commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeoUnit {
    /// Meters
    #[default]
    Meters,
    /// Kilometers
    Kilometers,
    /// Miles
    Miles,
    /// Feet
    Feet,
}

impl GeoUnit {
    /// Argument spelling of the unit
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Miles => "mi",
            Self::Feet => "ft",
        }
    }
}

impl fmt::Display for GeoUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort order of a radius query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoSort {
    /// Nearest first
    Asc,
    /// Farthest first
    Desc,
}

/// Which optional fields a radius query asks for, and how results are
/// ordered and capped.
///
/// The reply shape of each element depends on the `with_*` flags, so the
/// same options must be handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeoOptions {
    /// Include `[longitude, latitude]`
    pub with_coord: bool,
    /// Include the distance from the query center
    pub with_dist: bool,
    /// Include the raw 52-bit geohash
    pub with_hash: bool,
    /// Optional sort order
    pub sort: Option<GeoSort>,
    /// Optional result cap
    pub count: Option<usize>,
    /// Unit for radius and distances
    pub unit: GeoUnit,
}

impl GeoOptions {
    /// Options requesting nothing beyond member names
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request coordinates
    #[must_use]
    pub const fn with_coord(mut self) -> Self {
        self.with_coord = true;
        self
    }

    /// Request distances
    #[must_use]
    pub const fn with_dist(mut self) -> Self {
        self.with_dist = true;
        self
    }

    /// Request geohashes
    #[must_use]
    pub const fn with_hash(mut self) -> Self {
        self.with_hash = true;
        self
    }

    /// Set sort order
    #[must_use]
    pub const fn sort(mut self, sort: GeoSort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Cap the number of results
    #[must_use]
    pub const fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Set the distance unit
    #[must_use]
    pub const fn unit(mut self, unit: GeoUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Whether any per-element field beyond the name was requested
    #[must_use]
    pub const fn has_fields(&self) -> bool {
        self.with_coord || self.with_dist || self.with_hash
    }

    /// Number of positions each reply element carries
    #[must_use]
    pub const fn element_len(&self) -> usize {
        1 + self.with_dist as usize + self.with_hash as usize + self.with_coord as usize
    }

    /// Render the flags, cap and order as radius-query arguments
    ///
    /// The unit is not included; it sits right after the radius.
    #[must_use]
    pub fn args(&self) -> Vec<RespValue> {
        let mut args = Vec::new();
        if self.with_coord {
            args.push(RespValue::from("WITHCOORD"));
        }
        if self.with_dist {
            args.push(RespValue::from("WITHDIST"));
        }
        if self.with_hash {
            args.push(RespValue::from("WITHHASH"));
        }
        if let Some(count) = self.count {
            args.push(RespValue::from("COUNT"));
            args.push(RespValue::from(count));
        }
        match self.sort {
            Some(GeoSort::Asc) => args.push(RespValue::from("ASC")),
            Some(GeoSort::Desc) => args.push(RespValue::from("DESC")),
            None => {}
        }
        args
    }
}

/// One decoded member of a radius query
///
/// Fields that were not requested keep their zero value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Member name
    pub name: String,
    /// Longitude
    pub longitude: f64,
    /// Latitude
    pub latitude: f64,
    /// Distance from the query center, in the query unit
    pub distance: f64,
    /// Raw geohash
    pub hash: i64,
}
