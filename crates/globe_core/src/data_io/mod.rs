//! Dataset import and export formats
//!
//! Every format converts between text and [`GlobalData`]. Parsing never
//! validates; callers run the [`DataValidator`](crate::DataValidator) before
//! accepting the result.

mod csv;
mod geojson;
mod json;

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::data::GlobalData;
use crate::data_validator::ValidationError;

/// Supported interchange formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Json,
    Csv,
    GeoJson,
    /// Recognized but not implemented
    Kml,
}

impl DataFormat {
    /// File extension used when exporting
    pub fn extension(self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Csv => "csv",
            DataFormat::GeoJson => "geojson",
            DataFormat::Kml => "kml",
        }
    }

    /// Infer the format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(DataFormat::Json),
            "csv" => Some(DataFormat::Csv),
            "geojson" => Some(DataFormat::GeoJson),
            "kml" => Some(DataFormat::Kml),
            _ => None,
        }
    }

    /// Infer the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self, DataIoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| DataIoError::UnknownExtension(ext.to_string()))
    }

    /// Parse text in this format
    pub fn parse(self, content: &str) -> Result<GlobalData, DataIoError> {
        match self {
            DataFormat::Json => json::parse(content),
            DataFormat::Csv => csv::parse(content),
            DataFormat::GeoJson => geojson::parse(content),
            DataFormat::Kml => Err(DataIoError::Unsupported(self)),
        }
    }

    /// Serialize a dataset in this format
    pub fn serialize(self, data: &GlobalData) -> Result<String, DataIoError> {
        match self {
            DataFormat::Json => json::serialize(data),
            DataFormat::Csv => Ok(csv::serialize(data)),
            DataFormat::GeoJson => geojson::serialize(data),
            DataFormat::Kml => Err(DataIoError::Unsupported(self)),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Error importing or exporting a dataset
#[derive(Debug)]
pub enum DataIoError {
    /// Reading or writing a file failed
    Io(io::Error),
    /// Malformed JSON (also used for GeoJSON syntax errors)
    Json(serde_json::Error),
    /// Malformed CSV row (1-based line number)
    Csv { line: usize, message: String },
    /// Structurally valid JSON that is not a usable GeoJSON document
    GeoJson(String),
    /// Format is recognized but not implemented
    Unsupported(DataFormat),
    /// File extension does not name a known format
    UnknownExtension(String),
    /// Parsed dataset failed validation
    Validation(Vec<ValidationError>),
}

impl fmt::Display for DataIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataIoError::Io(err) => write!(f, "Data IO error: {}", err),
            DataIoError::Json(err) => write!(f, "JSON error: {}", err),
            DataIoError::Csv { line, message } => write!(f, "CSV error on line {}: {}", line, message),
            DataIoError::GeoJson(msg) => write!(f, "GeoJSON error: {}", msg),
            DataIoError::Unsupported(format) => write!(f, "Unsupported format: {}", format),
            DataIoError::UnknownExtension(ext) => write!(f, "Unknown file extension: '{}'", ext),
            DataIoError::Validation(errors) => {
                write!(f, "Validation failed with {} error(s)", errors.len())?;
                if let Some(first) = errors.first() {
                    write!(f, ": {}", first)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for DataIoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataIoError::Io(err) => Some(err),
            DataIoError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DataIoError {
    fn from(err: io::Error) -> Self {
        DataIoError::Io(err)
    }
}

impl From<serde_json::Error> for DataIoError {
    fn from(err: serde_json::Error) -> Self {
        DataIoError::Json(err)
    }
}

impl From<Vec<ValidationError>> for DataIoError {
    fn from(errors: Vec<ValidationError>) -> Self {
        DataIoError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(DataFormat::from_extension("JSON"), Some(DataFormat::Json));
        assert_eq!(DataFormat::from_extension("geojson"), Some(DataFormat::GeoJson));
        assert_eq!(DataFormat::from_extension("xlsx"), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(DataFormat::from_path(Path::new("routes.csv")).unwrap(), DataFormat::Csv);
        assert!(matches!(
            DataFormat::from_path(Path::new("routes")),
            Err(DataIoError::UnknownExtension(_))
        ));
    }

    #[test]
    fn test_kml_unsupported() {
        assert!(matches!(
            DataFormat::Kml.parse("<kml/>"),
            Err(DataIoError::Unsupported(DataFormat::Kml))
        ));
        assert!(DataFormat::Kml.serialize(&GlobalData::new()).is_err());
    }

    #[test]
    fn test_validation_error_display_mentions_first() {
        let err = DataIoError::Validation(vec![ValidationError::DuplicateCityId("A".into())]);
        let msg = err.to_string();
        assert!(msg.contains("1 error"));
        assert!(msg.contains("Duplicate city id"));
    }
}
