use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Image shown when a listing has no pictures at all.
pub const PLACEHOLDER_IMAGE: &str = "/static/images/placeholder.jpg";

/// Listing type whose room counts are always zero.
pub const PLOT_TYPE: &str = "plot";

/// Core property record, one element of `properties.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: String,
    pub title_key: String,
    pub description_key: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub location_slug: String,
    #[serde(rename = "type", default)]
    pub property_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub price: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub area: f64,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub bedrooms: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub bathrooms: u32,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub main_image: String,
    #[serde(default)]
    pub features_keys: Vec<String>,
    /// Fields this service does not manage (e.g. `project_id`), kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Property {
    /// Coordinates when both are present and non-zero.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        self.extra.get("project_id").and_then(Value::as_str)
    }

    pub fn is_plot(&self) -> bool {
        self.property_type == PLOT_TYPE
    }
}

/// Marker data for the map widgets
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MapPoint {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub title_key: String,
    pub main_image: String,
    pub price: i64,
    pub area: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
}

impl MapPoint {
    pub fn from_property(property: &Property) -> Option<Self> {
        let (lat, lon) = property.coordinates()?;
        Some(Self {
            id: property.id.clone(),
            lat,
            lon,
            title_key: property.title_key.clone(),
            main_image: property.main_image.clone(),
            price: property.price,
            area: property.area,
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
        })
    }
}

/// One chatbot exchange, written once and never updated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub timestamp: String,
    pub user_question: String,
    pub bot_answer: String,
    pub session_id: Option<String>,
}

/// Accepts numbers, numeric strings and null; anything else reads as zero.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_number(deserializer).map(|n| n as i64)
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_number(deserializer)
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_number(deserializer).map(|n| if n > 0.0 { n as u32 } else { 0 })
}
