//! JSON: direct (de)serialization of [`GlobalData`]

use super::DataIoError;
use crate::data::GlobalData;

pub(super) fn parse(content: &str) -> Result<GlobalData, DataIoError> {
    Ok(serde_json::from_str(content)?)
}

/// Pretty-printed with two-space indentation
pub(super) fn serialize(data: &GlobalData) -> Result<String, DataIoError> {
    Ok(serde_json::to_string_pretty(data)?)
}
