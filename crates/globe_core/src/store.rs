//! Dataset store
//!
//! The [`DataStore`] is the single owner of the current [`GlobalData`].
//! Imports are all-or-nothing: a dataset that fails to parse or validate
//! leaves the current one untouched.

use std::fs;
use std::path::{Path, PathBuf};

use crate::data::{now_rfc3339, City, FlightRoute, GlobalData};
use crate::data_io::{DataFormat, DataIoError};
use crate::data_validator::DataValidator;

/// Owner of the current dataset and of the route-line visibility toggle
#[derive(Debug)]
pub struct DataStore {
    data: GlobalData,
    show_lines: bool,
    /// Incremented whenever the dataset changes
    revision: u64,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    /// Create a store holding an empty dataset
    pub fn new() -> Self {
        Self {
            data: GlobalData::new(),
            show_lines: true,
            revision: 0,
        }
    }

    /// The current dataset
    pub fn data(&self) -> &GlobalData {
        &self.data
    }

    /// Change counter; bumps on every accepted mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Parse, validate and replace the dataset wholesale
    ///
    /// On success `metadata.modified` is set to the current time. On failure
    /// the current dataset is unchanged.
    pub fn import_str(&mut self, content: &str, format: DataFormat) -> Result<(), DataIoError> {
        let mut data = match format.parse(content) {
            Ok(data) => data,
            Err(err) => {
                log::warn!("Import rejected ({}): {}", format, err);
                return Err(err);
            }
        };

        if let Err(errors) = DataValidator::validate_or_error(&data) {
            for error in &errors {
                log::warn!("Import rejected ({}): {}", format, error);
            }
            return Err(DataIoError::Validation(errors));
        }

        data.metadata.modified = Some(now_rfc3339());
        log::info!(
            "Imported {} cities and {} routes ({})",
            data.cities.len(),
            data.routes.len(),
            format
        );
        self.data = data;
        self.revision += 1;
        Ok(())
    }

    /// Import a file, inferring the format from its extension
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<(), DataIoError> {
        let path = path.as_ref();
        let format = DataFormat::from_path(path)?;
        let content = fs::read_to_string(path)?;
        self.import_str(&content, format)
    }

    /// Serialize the current dataset
    pub fn export(&self, format: DataFormat) -> Result<String, DataIoError> {
        format.serialize(&self.data)
    }

    /// Write the current dataset to `dir/global-data-{timestamp}.{ext}`
    ///
    /// Returns the path written.
    pub fn export_to_file(&self, dir: impl AsRef<Path>, format: DataFormat) -> Result<PathBuf, DataIoError> {
        let content = self.export(format)?;
        let path = dir.as_ref().join(export_file_name(format));
        fs::write(&path, content)?;
        log::info!("Exported dataset to {}", path.display());
        Ok(path)
    }

    /// Validate and swap in a dataset built in memory
    ///
    /// Stamped and counted like an import. Route-line visibility is kept.
    pub fn replace(&mut self, data: GlobalData) -> Result<(), DataIoError> {
        self.accept(data)?;
        log::info!(
            "Replaced dataset: {} cities and {} routes",
            self.data.cities.len(),
            self.data.routes.len()
        );
        Ok(())
    }

    /// Add a city after validating the resulting dataset
    pub fn add_city(&mut self, city: City) -> Result<(), DataIoError> {
        let mut candidate = self.data.clone();
        candidate.cities.push(city);
        self.accept(candidate)
    }

    /// Add a route after validating the resulting dataset
    pub fn add_route(&mut self, route: FlightRoute) -> Result<(), DataIoError> {
        let mut candidate = self.data.clone();
        candidate.routes.push(route);
        self.accept(candidate)
    }

    /// Remove every route from `from` to `to`
    ///
    /// Returns the number of routes removed.
    pub fn remove_route(&mut self, from: &str, to: &str) -> usize {
        let before = self.data.routes.len();
        self.data.routes.retain(|r| !(r.from == from && r.to == to));
        let removed = before - self.data.routes.len();
        if removed > 0 {
            self.data.metadata.modified = Some(now_rfc3339());
            self.revision += 1;
        }
        removed
    }

    /// Flip route-line visibility, returning the new state
    pub fn toggle_lines(&mut self) -> bool {
        self.show_lines = !self.show_lines;
        self.show_lines
    }

    /// Whether route lines are shown
    pub fn show_lines(&self) -> bool {
        self.show_lines
    }

    /// Look up a city by id
    pub fn city(&self, id: &str) -> Option<&City> {
        self.data.city(id)
    }

    /// Resolve both ends of a route
    pub fn route_endpoints(&self, route: &FlightRoute) -> Option<(&City, &City)> {
        self.data.route_endpoints(route)
    }

    fn accept(&mut self, mut candidate: GlobalData) -> Result<(), DataIoError> {
        DataValidator::validate_or_error(&candidate)?;
        candidate.metadata.modified = Some(now_rfc3339());
        self.data = candidate;
        self.revision += 1;
        Ok(())
    }
}

/// File name used by [`DataStore::export_to_file`]
///
/// The timestamp has `:` replaced so the name is valid on every platform.
pub fn export_file_name(format: DataFormat) -> String {
    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S%.3fZ");
    format!("global-data-{}.{}", stamp, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_math::GeoPoint;

    const CSV: &str = "PEK,Beijing,China,39.9042,116.4074\nJFK,New York,USA,40.7128,-74.006\nROUTES\nPEK,JFK,air\n";

    #[test]
    fn test_import_sets_modified() {
        let mut store = DataStore::new();
        store.import_str(CSV, DataFormat::Csv).unwrap();
        assert_eq!(store.data().cities.len(), 2);
        assert!(store.data().metadata.modified.is_some());
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_rejected_import_leaves_data_unchanged() {
        let mut store = DataStore::new();
        store.import_str(CSV, DataFormat::Csv).unwrap();
        let before = store.data().clone();

        let dangling = "PEK,Beijing,China,39.9042,116.4074\nROUTES\nPEK,LHR\n";
        let err = store.import_str(dangling, DataFormat::Csv).unwrap_err();
        assert!(matches!(err, DataIoError::Validation(_)));
        assert_eq!(store.data(), &before);

        assert!(store.import_str("not json", DataFormat::Json).is_err());
        assert_eq!(store.data(), &before);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_add_city_and_route_validate() {
        let mut store = DataStore::new();
        store
            .add_city(City::new("A", "Alpha", "X", GeoPoint::new(1.0, 2.0).unwrap()))
            .unwrap();
        assert!(store.add_route(FlightRoute::between("A", "B")).is_err());
        store
            .add_city(City::new("B", "Beta", "Y", GeoPoint::new(3.0, 4.0).unwrap()))
            .unwrap();
        store.add_route(FlightRoute::between("A", "B")).unwrap();
        assert_eq!(store.data().routes.len(), 1);

        assert!(store
            .add_city(City::new("C", "Gamma", "Z", GeoPoint::new_unchecked(91.0, 0.0)))
            .is_err());
        assert_eq!(store.data().cities.len(), 2);
    }

    #[test]
    fn test_every_mutation_is_stamped_and_counted() {
        let mut store = DataStore::new();
        store
            .add_city(City::new("A", "Alpha", "X", GeoPoint::new(1.0, 2.0).unwrap()))
            .unwrap();
        assert!(store.data().metadata.modified.is_some());
        assert_eq!(store.revision(), 1);

        let mut data = store.data().clone();
        data.cities.push(City::new("B", "Beta", "Y", GeoPoint::new(3.0, 4.0).unwrap()));
        data.routes.push(FlightRoute::between("A", "B"));
        data.metadata.modified = None;
        store.replace(data).unwrap();
        assert!(store.data().metadata.modified.is_some());
        assert_eq!(store.data().routes.len(), 1);
        assert_eq!(store.revision(), 2);

        assert_eq!(store.remove_route("A", "B"), 1);
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn test_rejected_replace_keeps_state() {
        let mut store = DataStore::new();
        store.import_str(CSV, DataFormat::Csv).unwrap();
        store.toggle_lines();
        let before = store.data().clone();

        let mut bad = before.clone();
        bad.routes.push(FlightRoute::between("PEK", "LHR"));
        assert!(matches!(store.replace(bad), Err(DataIoError::Validation(_))));
        assert_eq!(store.data(), &before);
        assert_eq!(store.revision(), 1);
        assert!(!store.show_lines());
    }

    #[test]
    fn test_remove_route_and_toggle_lines() {
        let mut store = DataStore::new();
        store.import_str(CSV, DataFormat::Csv).unwrap();
        assert_eq!(store.remove_route("JFK", "PEK"), 0);
        assert_eq!(store.remove_route("PEK", "JFK"), 1);
        assert!(store.data().routes.is_empty());

        assert!(store.show_lines());
        assert!(!store.toggle_lines());
        assert!(store.toggle_lines());
    }

    #[test]
    fn test_export_file_name() {
        let name = export_file_name(DataFormat::GeoJson);
        assert!(name.starts_with("global-data-"));
        assert!(name.ends_with(".geojson"));
        assert!(!name.contains(':'));
    }
}
