//! Records returned by the backend.
//!
//! Place rows come straight out of the backend's SQLite table, so field names
//! follow the GeoNames postal-code dump and some values arrive with loose
//! types (numeric postal codes, coordinates as strings, null admin names).

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::geo::LatLng;

/// A point of interest with postal code, name, region and coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    #[serde(rename = "place_name", deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub postal_code: String,
    /// State or province name (`admin_name1`)
    #[serde(rename = "admin_name1", default, deserialize_with = "lenient_string")]
    pub admin_region: String,
    /// State or province abbreviation (`admin_code1`)
    #[serde(rename = "admin_code1", default, deserialize_with = "lenient_string")]
    pub admin_code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country_code: String,
    #[serde(deserialize_with = "coordinate")]
    pub latitude: f64,
    #[serde(deserialize_with = "coordinate")]
    pub longitude: f64,
}

impl Place {
    pub fn coordinates(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Text drawn next to the marker, e.g. `Palo Alto, CA`
    pub fn marker_label(&self) -> String {
        if self.admin_code.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.admin_code)
        }
    }

    /// Row shown in the autocomplete list, e.g. `Palo Alto, California, 94301`
    pub fn suggestion_label(&self) -> String {
        [&self.name, &self.admin_region, &self.postal_code]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A news article about a postal code
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
}

/// Accept strings, numbers and null (as empty)
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

/// Accept numbers and numeric strings
fn coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom("coordinate out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid coordinate {:?}: {}", s, e))),
        other => Err(de::Error::custom(format!(
            "expected coordinate, found {}",
            other
        ))),
    }
}
