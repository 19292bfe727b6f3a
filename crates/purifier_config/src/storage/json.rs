use crate::errors::Error;
use crate::settings::Setting;
use crate::StorageAdapter;
use log::warn;
use purifier_shared::types::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::sync::{Mutex, PoisonError};

/// Reads settings from a flat json object of `"section.key": value` pairs. Values are either
/// typed strings (`"b:true"`, `"m:script,style"`) or native json booleans, numbers and arrays
/// of strings. Writes are kept in memory; the file itself is never modified.
pub struct JsonStorageAdapter {
    path: String,
    elements: Mutex<HashMap<String, Setting>>,
}

impl TryFrom<&String> for JsonStorageAdapter {
    type Error = anyhow::Error;

    fn try_from(path: &String) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(Error::Config(format!("{path} is not a regular file")).into());
        }

        let buf = fs::read_to_string(path)?;
        let elements = Self::parse(&buf)?;

        Ok(JsonStorageAdapter {
            path: path.to_string(),
            elements: Mutex::new(elements),
        })
    }
}

impl StorageAdapter for JsonStorageAdapter {
    fn get(&self, key: &str) -> Option<Setting> {
        let lock = self.elements.lock().unwrap_or_else(PoisonError::into_inner);
        lock.get(key).cloned()
    }

    fn set(&self, key: &str, value: Setting) {
        let mut lock = self.elements.lock().unwrap_or_else(PoisonError::into_inner);
        lock.insert(key.to_owned(), value);
    }

    fn all(&self) -> Result<HashMap<String, Setting>> {
        let lock = self.elements.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(lock.clone())
    }
}

impl JsonStorageAdapter {
    /// Path of the json file this adapter was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parses the json document into settings. Entries that cannot be converted are skipped
    /// with a warning.
    fn parse(buf: &str) -> std::result::Result<HashMap<String, Setting>, Error> {
        let parsed_json: Value = serde_json::from_str(buf)?;

        let Value::Object(settings) = parsed_json else {
            return Err(Error::Config("settings file must contain a json object".into()));
        };

        let mut elements = HashMap::new();
        for (key, value) in &settings {
            match Setting::from_json(value) {
                Ok(setting) => {
                    elements.insert(key.clone(), setting);
                }
                Err(err) => {
                    warn!("problem reading setting {key} from json: {err}");
                }
            }
        }

        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_and_native_values() {
        let elements = JsonStorageAdapter::parse(
            r#"{
                "core.escape_invalid_tags": true,
                "html.allowed": "s:p,b,a[href]",
                "core.hidden_elements": ["script"],
                "broken": {"x": 1}
            }"#,
        )
        .unwrap();

        assert_eq!(elements.len(), 3);
        assert_eq!(
            elements.get("core.escape_invalid_tags"),
            Some(&Setting::Bool(true))
        );
        assert_eq!(
            elements.get("html.allowed"),
            Some(&Setting::String("p,b,a[href]".into()))
        );
        assert_eq!(
            elements.get("core.hidden_elements"),
            Some(&Setting::Map(vec!["script".into()]))
        );
    }

    #[test]
    fn rejects_non_objects() {
        assert!(JsonStorageAdapter::parse("[1, 2]").is_err());
        assert!(JsonStorageAdapter::parse("{not json").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = String::from("/nonexistent/purifier/settings.json");
        assert!(JsonStorageAdapter::try_from(&path).is_err());
    }
}
