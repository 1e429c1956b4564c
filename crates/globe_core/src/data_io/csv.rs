//! Two-section CSV
//!
//! ```text
//! ID,Name,Country,Latitude,Longitude
//! PEK,Beijing,China,39.9042,116.4074
//!
//! ROUTES
//! From,To,Type
//! PEK,JFK,air
//! ```
//!
//! Route ids are not stored; they are rebuilt as `"{from}-{to}"`.

use globe_math::GeoPoint;

use super::DataIoError;
use crate::data::{City, FlightRoute, GlobalData};

const CITY_HEADER: &str = "ID,Name,Country,Latitude,Longitude";
const ROUTE_HEADER: &str = "From,To,Type";
const ROUTES_MARKER: &str = "ROUTES";

pub(super) fn parse(content: &str) -> Result<GlobalData, DataIoError> {
    let mut data = GlobalData::new();
    let mut in_routes = false;

    for (index, raw) in content.split('\n').enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line == ROUTES_MARKER {
            in_routes = true;
            continue;
        }

        let columns: Vec<&str> = line.split(',').map(str::trim).collect();
        if in_routes {
            if is_header(&columns, "from", "to") {
                continue;
            }
            data.routes.push(parse_route(&columns, line_no)?);
        } else {
            if is_header(&columns, "id", "name") {
                continue;
            }
            data.cities.push(parse_city(&columns, line_no)?);
        }
    }

    Ok(data)
}

fn is_header(columns: &[&str], first: &str, second: &str) -> bool {
    columns.len() >= 2
        && columns[0].eq_ignore_ascii_case(first)
        && columns[1].eq_ignore_ascii_case(second)
}

fn parse_city(columns: &[&str], line: usize) -> Result<City, DataIoError> {
    if columns.len() < 5 {
        return Err(DataIoError::Csv {
            line,
            message: format!("expected 5 city columns, found {}", columns.len()),
        });
    }
    let latitude = parse_number(columns[3], "latitude", line)?;
    let longitude = parse_number(columns[4], "longitude", line)?;
    Ok(City::new(
        columns[0],
        columns[1],
        columns[2],
        GeoPoint::new_unchecked(latitude, longitude),
    ))
}

fn parse_route(columns: &[&str], line: usize) -> Result<FlightRoute, DataIoError> {
    if columns.len() < 2 {
        return Err(DataIoError::Csv {
            line,
            message: format!("expected at least 2 route columns, found {}", columns.len()),
        });
    }
    let mut route = FlightRoute::between(columns[0], columns[1]);
    if let Some(kind) = columns.get(2).filter(|k| !k.is_empty()) {
        route.kind = Some(kind.to_string());
    }
    Ok(route)
}

fn parse_number(text: &str, field: &str, line: usize) -> Result<f64, DataIoError> {
    text.parse::<f64>().map_err(|err| DataIoError::Csv {
        line,
        message: format!("invalid {} '{}': {}", field, text, err),
    })
}

pub(super) fn serialize(data: &GlobalData) -> String {
    let mut csv = String::new();
    csv.push_str(CITY_HEADER);
    csv.push('\n');
    for city in &data.cities {
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            city.id,
            city.name,
            city.country,
            city.coordinates.latitude(),
            city.coordinates.longitude()
        ));
    }

    csv.push('\n');
    csv.push_str(ROUTES_MARKER);
    csv.push('\n');
    csv.push_str(ROUTE_HEADER);
    csv.push('\n');
    for route in &data.routes {
        csv.push_str(&format!(
            "{},{},{}\n",
            route.from,
            route.to,
            route.kind.as_deref().unwrap_or("")
        ));
    }
    csv
}
