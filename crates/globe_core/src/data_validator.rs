//! Dataset validation
//!
//! The [`DataValidator`] checks a [`GlobalData`] before it is accepted:
//! required fields, coordinate ranges, duplicate city ids and dangling
//! route references. All problems are collected, not just the first.

use std::collections::HashSet;

use crate::data::GlobalData;

/// Validation error found in a dataset
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// City at this index has an empty id
    MissingCityId(usize),
    /// City has an empty name
    MissingCityName(String),
    /// City coordinates are outside [-90, 90] x [-180, 180] or NaN
    CoordinatesOutOfRange {
        city: String,
        latitude: f64,
        longitude: f64,
    },
    /// Two cities share an id
    DuplicateCityId(String),
    /// Route at this index has an empty id
    MissingRouteId(usize),
    /// Route has an empty `from` or `to`
    MissingRouteEndpoint(String),
    /// Route `from` does not name a city in the dataset
    SourceCityNotFound { route: String, city: String },
    /// Route `to` does not name a city in the dataset
    DestinationCityNotFound { route: String, city: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingCityId(index) => {
                write!(f, "City at index {} has no id", index)
            }
            ValidationError::MissingCityName(id) => write!(f, "City '{}' has no name", id),
            ValidationError::CoordinatesOutOfRange { city, latitude, longitude } => {
                write!(
                    f,
                    "Invalid coordinates for city '{}': ({}, {})",
                    city, latitude, longitude
                )
            }
            ValidationError::DuplicateCityId(id) => write!(f, "Duplicate city id: '{}'", id),
            ValidationError::MissingRouteId(index) => {
                write!(f, "Route at index {} has no id", index)
            }
            ValidationError::MissingRouteEndpoint(id) => {
                write!(f, "Route '{}' is missing an endpoint", id)
            }
            ValidationError::SourceCityNotFound { route, city } => {
                write!(f, "Source city not found: '{}' (route '{}')", city, route)
            }
            ValidationError::DestinationCityNotFound { route, city } => {
                write!(f, "Destination city not found: '{}' (route '{}')", city, route)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Dataset validator
///
/// # Example
/// ```ignore
/// let errors = DataValidator::validate(&data);
/// for error in &errors {
///     log::warn!("{}", error);
/// }
/// ```
pub struct DataValidator;

impl DataValidator {
    /// Validate a dataset, returning all errors found
    pub fn validate(data: &GlobalData) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let mut city_ids = HashSet::new();
        for (index, city) in data.cities.iter().enumerate() {
            if city.id.trim().is_empty() {
                errors.push(ValidationError::MissingCityId(index));
            } else if !city_ids.insert(city.id.as_str()) {
                errors.push(ValidationError::DuplicateCityId(city.id.clone()));
            }

            if city.name.trim().is_empty() {
                errors.push(ValidationError::MissingCityName(city.id.clone()));
            }

            if !city.coordinates.is_valid() {
                errors.push(ValidationError::CoordinatesOutOfRange {
                    city: city.id.clone(),
                    latitude: city.coordinates.latitude(),
                    longitude: city.coordinates.longitude(),
                });
            }
        }

        for (index, route) in data.routes.iter().enumerate() {
            if route.id.trim().is_empty() {
                errors.push(ValidationError::MissingRouteId(index));
            }

            if route.from.trim().is_empty() || route.to.trim().is_empty() {
                errors.push(ValidationError::MissingRouteEndpoint(route.id.clone()));
                continue;
            }

            if !city_ids.contains(route.from.as_str()) {
                errors.push(ValidationError::SourceCityNotFound {
                    route: route.id.clone(),
                    city: route.from.clone(),
                });
            }
            if !city_ids.contains(route.to.as_str()) {
                errors.push(ValidationError::DestinationCityNotFound {
                    route: route.id.clone(),
                    city: route.to.clone(),
                });
            }
        }

        errors
    }

    /// Validate and return Result (Ok if no errors, Err with all errors)
    pub fn validate_or_error(data: &GlobalData) -> Result<(), Vec<ValidationError>> {
        let errors = Self::validate(data);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
