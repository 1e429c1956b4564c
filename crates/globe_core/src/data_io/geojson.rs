//! GeoJSON FeatureCollection
//!
//! `Point` features become cities and `LineString` features become routes.
//! Other geometry types are ignored. Positions are `[longitude, latitude]`.

use serde_json::{json, Map, Value};

use globe_math::GeoPoint;

use super::DataIoError;
use crate::data::{City, FlightRoute, GlobalData};

pub(super) fn parse(content: &str) -> Result<GlobalData, DataIoError> {
    let document: Value = serde_json::from_str(content)?;
    if document.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(DataIoError::GeoJson("expected a FeatureCollection".to_string()));
    }
    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| DataIoError::GeoJson("FeatureCollection has no features array".to_string()))?;

    let empty = Map::new();
    let mut data = GlobalData::new();
    for (index, feature) in features.iter().enumerate() {
        let properties = feature
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let geometry_type = feature
            .get("geometry")
            .and_then(|g| g.get("type"))
            .and_then(Value::as_str);

        match geometry_type {
            Some("Point") => {
                let (longitude, latitude) = point_position(feature, index)?;
                let id = string_prop(properties, "id")
                    .unwrap_or_else(|| format!("city-{}", data.cities.len()));
                let mut city = City::new(
                    id,
                    string_prop(properties, "name").unwrap_or_default(),
                    string_prop(properties, "country").unwrap_or_default(),
                    GeoPoint::new_unchecked(latitude, longitude),
                );
                city.population = properties.get("population").and_then(Value::as_u64);
                data.cities.push(city);
            }
            Some("LineString") => {
                let id = string_prop(properties, "id")
                    .unwrap_or_else(|| format!("route-{}", data.routes.len()));
                data.routes.push(FlightRoute {
                    id,
                    from: string_prop(properties, "from").unwrap_or_default(),
                    to: string_prop(properties, "to").unwrap_or_default(),
                    kind: string_prop(properties, "type"),
                    data: None,
                });
            }
            _ => log::debug!("Skipping GeoJSON feature {} with unsupported geometry", index),
        }
    }

    Ok(data)
}

fn string_prop(properties: &Map<String, Value>, key: &str) -> Option<String> {
    properties
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn point_position(feature: &Value, index: usize) -> Result<(f64, f64), DataIoError> {
    let coordinates = feature
        .get("geometry")
        .and_then(|g| g.get("coordinates"))
        .and_then(Value::as_array)
        .ok_or_else(|| DataIoError::GeoJson(format!("feature {} has no coordinates", index)))?;
    match (
        coordinates.first().and_then(Value::as_f64),
        coordinates.get(1).and_then(Value::as_f64),
    ) {
        (Some(lon), Some(lat)) => Ok((lon, lat)),
        _ => Err(DataIoError::GeoJson(format!(
            "feature {} has a malformed position",
            index
        ))),
    }
}

fn position(point: &GeoPoint) -> Value {
    json!([point.longitude(), point.latitude()])
}

pub(super) fn serialize(data: &GlobalData) -> Result<String, DataIoError> {
    let mut features = Vec::with_capacity(data.cities.len() + data.routes.len());

    for city in &data.cities {
        features.push(json!({
            "type": "Feature",
            "properties": {
                "id": city.id,
                "name": city.name,
                "country": city.country,
            },
            "geometry": {
                "type": "Point",
                "coordinates": position(&city.coordinates),
            },
        }));
    }

    for route in &data.routes {
        let (from, to) = data.route_endpoints(route).ok_or_else(|| {
            DataIoError::GeoJson(format!("route '{}' references an unknown city", route.id))
        })?;
        features.push(json!({
            "type": "Feature",
            "properties": {
                "id": route.id,
                "from": route.from,
                "to": route.to,
                "type": route.kind,
            },
            "geometry": {
                "type": "LineString",
                "coordinates": [position(&from.coordinates), position(&to.coordinates)],
            },
        }));
    }

    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    Ok(serde_json::to_string_pretty(&collection)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"id": "PEK", "name": "Beijing", "country": "China"},
             "geometry": {"type": "Point", "coordinates": [116.4074, 39.9042]}},
            {"type": "Feature", "properties": {"name": "Somewhere"},
             "geometry": {"type": "Point", "coordinates": [10.0, 20.0]}},
            {"type": "Feature", "properties": {"from": "PEK", "to": "city-1", "type": "air"},
             "geometry": {"type": "LineString", "coordinates": [[116.4074, 39.9042], [10.0, 20.0]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": []}}
        ]
    }"#;

    #[test]
    fn test_points_and_lines() {
        let data = parse(SAMPLE).unwrap();
        assert_eq!(data.cities.len(), 2);
        assert_eq!(data.cities[0].coordinates.latitude(), 39.9042);
        assert_eq!(data.cities[0].coordinates.longitude(), 116.4074);
        assert_eq!(data.cities[1].id, "city-1");
        assert_eq!(data.routes.len(), 1);
        assert_eq!(data.routes[0].id, "route-0");
        assert_eq!(data.routes[0].kind.as_deref(), Some("air"));
    }

    #[test]
    fn test_not_a_feature_collection() {
        assert!(matches!(
            parse(r#"{"type": "Feature"}"#),
            Err(DataIoError::GeoJson(_))
        ));
        assert!(matches!(parse("{"), Err(DataIoError::Json(_))));
    }

    #[test]
    fn test_export_then_import() {
        let data = parse(SAMPLE).unwrap();
        let text = serialize(&data).unwrap();
        let back = parse(&text).unwrap();
        assert_eq!(back.cities, data.cities);
        assert_eq!(back.routes, data.routes);

        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["features"][2]["geometry"]["type"], "LineString");
    }

    #[test]
    fn test_export_dangling_route_is_error() {
        let mut data = GlobalData::new();
        data.routes.push(FlightRoute::between("A", "B"));
        assert!(serialize(&data).is_err());
    }
}
