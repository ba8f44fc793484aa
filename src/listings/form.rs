use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, Result};
use crate::images::{ImageChanges, UploadedImage};

pub const FEATURE_PREFIX: &str = "feature_";
pub const DEFAULT_STATUS: &str = "for_sale";

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid slug pattern"));

/// A feature label the operator introduced while editing a listing
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeature {
    pub key: String,
    pub label: String,
}

/// Admin listing form after boundary validation.
///
/// Numbers parse permissively: blank or malformed input reads as 0, except
/// `lat`/`lon` which read as absent.
#[derive(Debug, Clone, Default)]
pub struct ListingForm {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub location: String,
    pub property_type: String,
    pub status: String,
    pub price: i64,
    pub area: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub features: Vec<String>,
    pub new_feature: Option<NewFeature>,
    pub images: ImageChanges,
}

impl ListingForm {
    /// Build from raw `(name, value)` text fields plus uploaded files.
    pub fn from_fields(fields: &[(String, String)], uploads: Vec<UploadedImage>) -> Self {
        let first = |name: &str| first_value(fields, name);
        let text = |name: &str| first_value(fields, name).unwrap_or_default().to_string();
        let all = |name: &str| all_values(fields, name);

        let new_feature = match (first("new_feature_key"), first("new_feature_label")) {
            (Some(key), Some(label)) => Some(NewFeature {
                key: feature_key(key),
                label: label.to_string(),
            }),
            _ => None,
        };

        Self {
            id: first("id").map(str::to_string),
            title: text("title"),
            description: text("description"),
            location: text("location"),
            property_type: text("type"),
            status: first("status").unwrap_or(DEFAULT_STATUS).to_string(),
            price: parse_number(first("price")) as i64,
            area: parse_number(first("area")),
            bedrooms: parse_count(first("bedrooms")),
            bathrooms: parse_count(first("bathrooms")),
            lat: first("lat").and_then(|v| v.parse().ok()),
            lon: first("lon").and_then(|v| v.parse().ok()),
            features: all("features"),
            new_feature,
            images: ImageChanges {
                retained: all("existing_images"),
                uploads,
                final_order: all("image_order"),
                main_image: first("main_image").map(str::to_string),
            },
        }
    }

    /// The id for a new listing; rejects blanks and anything unsafe in a path.
    pub fn require_id(&self) -> Result<String> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| AppError::MissingInput("id".into()))?;
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::InvalidInput {
                field: "id".into(),
                reason: "use only letters, digits, '-' and '_'".into(),
            });
        }
        Ok(id.to_string())
    }

    /// Room counts as stored: always zero for plots.
    pub fn rooms(&self) -> (u32, u32) {
        if self.property_type == crate::models::PLOT_TYPE {
            (0, 0)
        } else {
            (self.bedrooms, self.bathrooms)
        }
    }
}

fn first_value<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

fn all_values(fields: &[(String, String)], name: &str) -> Vec<String> {
    fields
        .iter()
        .filter(|(n, _)| n == name)
        .flat_map(|(_, v)| list_values(v))
        .collect()
}

/// A repeated field may also arrive as one JSON array string.
fn list_values(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(values) = serde_json::from_str::<Vec<String>>(raw) {
            return values;
        }
    }
    if raw.is_empty() {
        Vec::new()
    } else {
        vec![raw.to_string()]
    }
}

fn parse_number(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.replace(',', ".").parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

fn parse_count(raw: Option<&str>) -> u32 {
    let n = parse_number(raw);
    if n > 0.0 {
        n as u32
    } else {
        0
    }
}

/// Lowercase, collapse runs of non-alphanumerics to `-`, trim the ends.
pub fn slugify(location: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&location.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

pub fn feature_key(raw: &str) -> String {
    if raw.starts_with(FEATURE_PREFIX) {
        raw.to_string()
    } else {
        format!("{FEATURE_PREFIX}{raw}")
    }
}

pub fn title_key(id: &str) -> String {
    format!("prop_{}_title", id.replace('-', "_"))
}

pub fn description_key(id: &str) -> String {
    format!("prop_{}_description", id.replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn slug_collapses_punctuation_runs() {
        assert_eq!(slugify("Nea Vrasna!!"), "nea-vrasna");
        assert_eq!(slugify("  --Stavros,  Thessaloniki-- "), "stavros-thessaloniki");
        assert_eq!(slugify("Νέα Βρασνά"), "νέα-βρασνά");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn numbers_default_to_zero() {
        let form = ListingForm::from_fields(
            &fields(&[
                ("price", "abc"),
                ("area", "85,5"),
                ("bedrooms", ""),
                ("bathrooms", "2"),
                ("lat", "n/a"),
                ("lon", "23.71"),
            ]),
            Vec::new(),
        );
        assert_eq!(form.price, 0);
        assert_eq!(form.area, 85.5);
        assert_eq!(form.bedrooms, 0);
        assert_eq!(form.bathrooms, 2);
        assert_eq!(form.lat, None);
        assert_eq!(form.lon, Some(23.71));
        assert_eq!(form.status, DEFAULT_STATUS);
    }

    #[test]
    fn plots_have_no_rooms() {
        let form = ListingForm::from_fields(
            &fields(&[("type", "plot"), ("bedrooms", "3"), ("bathrooms", "2")]),
            Vec::new(),
        );
        assert_eq!(form.rooms(), (0, 0));
    }

    #[test]
    fn repeated_and_json_list_fields() {
        let form = ListingForm::from_fields(
            &fields(&[
                ("features", "feature_sea_view"),
                ("features", "feature_parking"),
                ("image_order", r#"["/static/a.jpg", "new:b.jpg"]"#),
                ("new_feature_key", "fireplace"),
                ("new_feature_label", "Τζάκι"),
            ]),
            Vec::new(),
        );
        assert_eq!(form.features, ["feature_sea_view", "feature_parking"]);
        assert_eq!(form.images.final_order, ["/static/a.jpg", "new:b.jpg"]);
        assert_eq!(
            form.new_feature,
            Some(NewFeature {
                key: "feature_fireplace".into(),
                label: "Τζάκι".into()
            })
        );
    }

    #[test]
    fn id_validation() {
        let missing = ListingForm::from_fields(&fields(&[("id", "  ")]), Vec::new());
        assert!(matches!(missing.require_id(), Err(AppError::MissingInput(_))));

        let unsafe_id = ListingForm::from_fields(&fields(&[("id", "../x")]), Vec::new());
        assert!(matches!(unsafe_id.require_id(), Err(AppError::InvalidInput { .. })));

        let ok = ListingForm::from_fields(&fields(&[("id", "the-twins")]), Vec::new());
        assert_eq!(ok.require_id().unwrap(), "the-twins");
        assert_eq!(title_key("the-twins"), "prop_the_twins_title");
    }
}
