//! Logistics dataset types
//!
//! [`GlobalData`] is the root aggregate that is imported, validated and
//! exported as a whole. Field names serialize in camelCase so datasets
//! written by other tools load unchanged.

use serde::{Serialize, Deserialize};

use globe_math::GeoPoint;

/// Current dataset format version
pub const DATA_VERSION: &str = "1.0";

/// A city that routes can connect
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    /// Unique key referenced by routes
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: String,
    pub coordinates: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,
    /// Free-form attributes carried through import and export
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl City {
    /// Create a city with no population or extra data
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        country: impl Into<String>,
        coordinates: GeoPoint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            country: country.into(),
            coordinates,
            population: None,
            data: None,
        }
    }

    /// Set the population
    pub fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }
}

/// A route between two cities, referenced by city id
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRoute {
    pub id: String,
    pub from: String,
    pub to: String,
    /// Transport type label (e.g. "air", "sea")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl FlightRoute {
    /// Create a route with the conventional `"{from}-{to}"` id
    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        Self {
            id: route_id(&from, &to),
            from,
            to,
            kind: None,
            data: None,
        }
    }

    /// Set the transport type label
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Conventional route id for a city pair
pub fn route_id(from: &str, to: &str) -> String {
    format!("{}-{}", from, to)
}

/// Descriptive dataset metadata
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// RFC 3339 creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// RFC 3339 timestamp of the last import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// The whole dataset: cities, routes and metadata
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalData {
    #[serde(default = "default_version")]
    pub version: String,
    pub cities: Vec<City>,
    pub routes: Vec<FlightRoute>,
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_version() -> String {
    DATA_VERSION.to_string()
}

impl Default for GlobalData {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalData {
    /// Empty dataset stamped with the current time as its creation date
    pub fn new() -> Self {
        Self {
            version: default_version(),
            cities: Vec::new(),
            routes: Vec::new(),
            metadata: Metadata {
                created: Some(now_rfc3339()),
                ..Metadata::default()
            },
        }
    }

    /// Look up a city by id
    pub fn city(&self, id: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.id == id)
    }

    /// Look up a route by id
    pub fn route(&self, id: &str) -> Option<&FlightRoute> {
        self.routes.iter().find(|r| r.id == id)
    }

    /// Resolve both ends of a route
    ///
    /// Returns `None` if either city is missing.
    pub fn route_endpoints(&self, route: &FlightRoute) -> Option<(&City, &City)> {
        Some((self.city(&route.from)?, self.city(&route.to)?))
    }

    /// True if the dataset has no cities and no routes
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty() && self.routes.is_empty()
    }
}

/// Current UTC time formatted as RFC 3339
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GlobalData {
        let mut data = GlobalData::new();
        data.cities.push(City::new("PEK", "Beijing", "China", GeoPoint::new(39.9042, 116.4074).unwrap()));
        data.cities.push(City::new("JFK", "New York", "USA", GeoPoint::new(40.7128, -74.006).unwrap()));
        data.routes.push(FlightRoute::between("PEK", "JFK").with_kind("air"));
        data
    }

    #[test]
    fn test_route_id_convention() {
        let route = FlightRoute::between("PEK", "JFK");
        assert_eq!(route.id, "PEK-JFK");
    }

    #[test]
    fn test_route_endpoints() {
        let data = sample();
        let (from, to) = data.route_endpoints(&data.routes[0]).unwrap();
        assert_eq!(from.name, "Beijing");
        assert_eq!(to.name, "New York");

        let dangling = FlightRoute::between("PEK", "LHR");
        assert!(data.route_endpoints(&dangling).is_none());
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["routes"][0]["type"], "air");
        assert_eq!(json["cities"][0]["coordinates"]["latitude"], 39.9042);
        assert!(json["cities"][0].get("population").is_none());
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let json = r#"{
            "cities": [{"id": "a", "name": "A", "coordinates": {"latitude": 1.0, "longitude": 2.0}}],
            "routes": []
        }"#;
        let data: GlobalData = serde_json::from_str(json).unwrap();
        assert_eq!(data.version, DATA_VERSION);
        assert_eq!(data.cities[0].country, "");
        assert_eq!(data.metadata, Metadata::default());
    }
}
