use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{MapPoint, Property};

/// Sentinel used by the filter dropdowns for "no filter".
pub const ALL: &str = "all";

/// Query parameters of the listings page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingFilters {
    /// Property type, or `all`
    #[serde(default = "all")]
    pub r#type: String,
    /// Location slug, or `all`
    #[serde(default = "all")]
    pub location: String,
    /// `price_asc`, `price_desc`, or empty
    #[serde(default)]
    pub sort: String,
}

fn all() -> String {
    ALL.to_string()
}

impl Default for ListingFilters {
    fn default() -> Self {
        Self {
            r#type: all(),
            location: all(),
            sort: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Unsorted,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        match value {
            "price_asc" => SortOrder::PriceAsc,
            "price_desc" => SortOrder::PriceDesc,
            _ => SortOrder::Unsorted,
        }
    }
}

impl ListingFilters {
    /// Filter then sort a copy of the catalog. Sorting is stable.
    pub fn apply(&self, properties: &[Property]) -> Vec<Property> {
        let mut selected: Vec<Property> = properties
            .iter()
            .filter(|p| self.r#type == ALL || p.property_type == self.r#type)
            .filter(|p| self.location == ALL || p.location_slug == self.location)
            .cloned()
            .collect();

        match SortOrder::parse(&self.sort) {
            // Price-on-request listings go last.
            SortOrder::PriceAsc => selected.sort_by_key(|p| {
                if p.price > 0 {
                    (0, p.price)
                } else {
                    (1, 0)
                }
            }),
            SortOrder::PriceDesc => {
                selected.sort_by_key(|p| std::cmp::Reverse(p.price.max(0)))
            }
            SortOrder::Unsorted => {}
        }
        selected
    }
}

/// Geolocated locations and how many listings each has
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationFacets {
    pub counts: BTreeMap<String, usize>,
    /// `(slug, display name)` ordered by display name
    pub locations: Vec<(String, String)>,
}

impl LocationFacets {
    pub fn from_properties(properties: &[Property]) -> Self {
        let mut counts = BTreeMap::new();
        let mut names: BTreeMap<String, String> = BTreeMap::new();

        for property in properties.iter().filter(|p| p.coordinates().is_some()) {
            if property.location_slug.is_empty() || property.location.is_empty() {
                continue;
            }
            *counts.entry(property.location_slug.clone()).or_insert(0) += 1;
            names
                .entry(property.location_slug.clone())
                .or_insert_with(|| property.location.clone());
        }

        let mut locations: Vec<(String, String)> = names.into_iter().collect();
        locations.sort_by(|a, b| a.1.cmp(&b.1));

        Self { counts, locations }
    }
}

pub fn map_points(properties: &[Property]) -> Vec<MapPoint> {
    properties.iter().filter_map(MapPoint::from_property).collect()
}

/// Format a price with `.` as the thousands separator.
pub fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if price < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
