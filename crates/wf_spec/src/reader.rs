//! Checklist file reading.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{SpecError, SpecResult};
use crate::models::{Checklist, GenerateRequest};

/// Reader for checklist files in JSON, YAML or TOML.
pub struct SpecReader;

impl SpecReader {
    /// Read a generation request from a file.
    ///
    /// The file may hold either a bare checklist or a `{ checklist: ... }`
    /// wrapper.
    pub fn read_request(path: impl AsRef<Path>) -> SpecResult<GenerateRequest> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SpecError::NotFound(path.to_path_buf()));
        }
        debug!("Reading generation request from {:?}", path);

        let content = fs::read_to_string(path)?;
        let value = Self::parse_value(path, &content)?;
        Self::request_from_value(value).map_err(|message| SpecError::InvalidFormat {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Read only the checklist from a file.
    pub fn read_checklist(path: impl AsRef<Path>) -> SpecResult<Checklist> {
        Ok(Self::read_request(path)?.checklist)
    }

    /// Parse a request from a JSON string.
    pub fn parse_json(content: &str) -> SpecResult<GenerateRequest> {
        let value: Value = serde_json::from_str(content)?;
        Self::request_from_value(value).map_err(SpecError::ValidationFailed)
    }

    fn parse_value(path: &Path, content: &str) -> SpecResult<Value> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let value = match ext.as_str() {
            "json" => serde_json::from_str(content)?,
            "yaml" | "yml" => serde_yaml::from_str(content)?,
            "toml" => {
                let table: toml::Value = toml::from_str(content)?;
                serde_json::to_value(table)?
            }
            _ => return Err(SpecError::UnsupportedFormat(path.to_path_buf())),
        };
        Ok(value)
    }

    fn request_from_value(value: Value) -> Result<GenerateRequest, String> {
        let checklist_value = match value {
            Value::Object(mut map) if map.contains_key("checklist") => {
                map.remove("checklist").unwrap_or(Value::Null)
            }
            other => other,
        };

        serde_json::from_value::<Checklist>(checklist_value)
            .map(GenerateRequest::new)
            .map_err(|e| format!("Not a valid checklist: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_accepts_wrapper_and_bare() {
        let wrapped = r#"{"checklist": {"branding": {"colors": {}}, "pages": []}}"#;
        let bare = r#"{"branding": {"colors": {}}, "pages": []}"#;

        assert!(SpecReader::parse_json(wrapped).is_ok());
        assert!(SpecReader::parse_json(bare).is_ok());
    }

    #[test]
    fn test_parse_json_rejects_missing_pages() {
        let result = SpecReader::parse_json(r#"{"branding": {"colors": {}}}"#);
        assert!(matches!(result, Err(SpecError::ValidationFailed(_))));
    }
}
