pub mod errors;
pub mod settings;
pub mod storage;

use crate::errors::Error;
use crate::settings::{Setting, SettingInfo};
use crate::storage::MemoryStorageAdapter;
use log::warn;
use purifier_shared::types::Result;
use serde_derive::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::mem;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use wildmatch::WildMatch;

/// Settings are stored in a json file, but this is included in the binary for mostly easy editing.
const SETTINGS_JSON: &str = include_str!("./settings.json");

/// `StorageAdapter` is the interface for storing and retrieving settings.
/// This can be used to store settings in a json file, memory, etc.
pub trait StorageAdapter: Send + Sync {
    /// Retrieves a setting from the storage
    fn get(&self, key: &str) -> Option<Setting>;

    /// Stores a given setting to the storage. Note that "self" is not mutable, adapters keep
    /// their data behind a lock.
    fn set(&self, key: &str, value: Setting);

    /// Retrieves all the settings in the storage in one go. This is used for preloading the settings
    /// into the `ConfigStore`.
    fn all(&self) -> Result<HashMap<String, Setting>>;
}

/// `JsonEntry` is used for parsing the settings.json file
#[derive(Debug, Deserialize)]
struct JsonEntry {
    key: String,
    #[serde(rename = "type")]
    _entry_type: String,
    default: String,
    description: String,
}

/// Configuration storage is the place where the purifier finds all configurable options. A store
/// is an explicit value: build one, adjust it and hand it to the purifier.
pub struct ConfigStore {
    /// A hashmap of all settings so we can search o(1) time
    settings: Mutex<HashMap<String, Setting>>,
    /// A hashmap of all setting descriptions, default values and type information
    settings_info: HashMap<String, SettingInfo>,
    /// Keys of all settings so we can iterate keys easily
    setting_keys: Vec<String>,
    /// The storage adapter used for persisting and loading keys
    storage: Box<dyn StorageAdapter>,
}

impl ConfigStore {
    /// Creates a store populated with the default settings and backed by memory storage
    pub fn new() -> Result<Self> {
        Self::with_storage(Box::new(MemoryStorageAdapter::new()))
    }

    /// Creates a store populated with the default settings, overlaid with whatever the given
    /// storage holds.
    pub fn with_storage(storage: Box<dyn StorageAdapter>) -> Result<Self> {
        let mut store = Self {
            settings: Mutex::new(HashMap::new()),
            settings_info: HashMap::new(),
            setting_keys: Vec::new(),
            storage: Box::new(MemoryStorageAdapter::new()),
        };

        store.populate_default_settings()?;
        store.set_storage(storage)?;

        Ok(store)
    }

    /// Sets a new storage engine and updates all settings in the config store according to what
    /// is written in the storage. Settings unknown to the store, or of the wrong type, are
    /// rejected.
    pub fn set_storage(&mut self, storage: Box<dyn StorageAdapter>) -> Result<()> {
        let all_settings = storage.all()?;
        self.storage = storage;

        for (key, value) in all_settings {
            self.check_type(&key, &value)?;
            self.lock().insert(key, value);
        }

        Ok(())
    }

    /// Returns true when the storage knows about the given key
    pub fn has(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Returns a list of keys that matches the given search string (can use ? and *) for search
    /// wildcards.
    pub fn find(&self, search: &str) -> Vec<String> {
        let search = WildMatch::new(search);

        self.setting_keys
            .iter()
            .filter(|key| search.matches(key))
            .cloned()
            .collect()
    }

    /// Retrieves information about the given key, or returns None when key is unknown
    pub fn get_info(&self, key: &str) -> Option<SettingInfo> {
        self.settings_info.get(key).cloned()
    }

    /// Returns the setting with the given key. If the setting is not found in the current
    /// store, it will load the key from the storage. If the key is still not found, the
    /// default value for the given key is returned. Unknown keys return None.
    pub fn get(&self, key: &str) -> Option<Setting> {
        if let Some(setting) = self.lock().get(key) {
            return Some(setting.clone());
        }

        if let Some(setting) = self.storage.get(key) {
            self.lock().insert(key.to_string(), setting.clone());
            return Some(setting);
        }

        if let Some(info) = self.settings_info.get(key) {
            return Some(info.default.clone());
        }

        warn!("config: setting {key} is not known");
        None
    }

    /// Sets the given setting to the given value. Will persist the setting to the
    /// storage. The setting must be known and of the same type as its default.
    pub fn set(&self, key: &str, value: Setting) -> Result<()> {
        if let Err(err) = self.check_type(key, &value) {
            warn!("config: {err}");
            return Err(err.into());
        }

        self.lock().insert(key.to_owned(), value.clone());
        self.storage.set(key, value);

        Ok(())
    }

    /// Sets a setting from an untyped string (as given on the command line). The type of the
    /// key's default decides how the string is parsed.
    pub fn set_from_str(&self, key: &str, raw: &str) -> Result<()> {
        let Some(info) = self.settings_info.get(key) else {
            warn!("config: setting {key} is not known");
            return Err(Error::UnknownSetting(key.to_string()).into());
        };

        let value = info.default.parse_like(raw)?;
        self.set(key, value)
    }

    /// Returns the boolean value of the key, or false when the key is unknown
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).is_some_and(|s| s.to_bool())
    }

    /// Returns the unsigned value of the key, or 0 when the key is unknown
    pub fn get_uint(&self, key: &str) -> usize {
        self.get(key).map_or(0, |s| s.to_uint())
    }

    /// Returns the string value of the key, or an empty string when the key is unknown
    pub fn get_string(&self, key: &str) -> String {
        self.get(key).map(|s| s.to_string()).unwrap_or_default()
    }

    /// Returns the map value of the key, or an empty list when the key is unknown
    pub fn get_map(&self, key: &str) -> Vec<String> {
        self.get(key).map(|s| s.to_map()).unwrap_or_default()
    }

    fn check_type(&self, key: &str, value: &Setting) -> std::result::Result<(), Error> {
        let Some(info) = self.settings_info.get(key) else {
            return Err(Error::UnknownSetting(key.to_string()));
        };

        if mem::discriminant(&info.default) != mem::discriminant(value) {
            return Err(Error::TypeMismatch {
                key: key.to_string(),
                expected: info.default.type_name(),
            });
        }

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Setting>> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Populates the settings in the storage from the settings.json file
    fn populate_default_settings(&mut self) -> Result<()> {
        let json_data: Value = serde_json::from_str(SETTINGS_JSON).map_err(Error::JsonSerde)?;

        let Value::Object(data) = json_data else {
            return Err(Error::Config("settings.json is not an object".into()).into());
        };

        for (section_prefix, section_entries) in data {
            let section_entries: Vec<JsonEntry> =
                serde_json::from_value(section_entries).map_err(Error::JsonSerde)?;

            for entry in section_entries {
                let key = format!("{}.{}", section_prefix, entry.key);

                let info = SettingInfo {
                    key: key.clone(),
                    description: entry.description,
                    default: Setting::from_str(&entry.default)?,
                };

                self.setting_keys.push(key.clone());
                self.lock().insert(key.clone(), info.default.clone());
                self.settings_info.insert(key, info);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_loaded() {
        let store = ConfigStore::new().unwrap();

        assert_eq!(
            store.get("core.escape_invalid_tags").unwrap(),
            Setting::Bool(false)
        );
        assert_eq!(
            store.get("core.hidden_elements").unwrap(),
            Setting::Map(vec!["script".into(), "style".into()])
        );
        assert_eq!(
            store.get("html.parent").unwrap(),
            Setting::String("div".into())
        );
        assert!(store.has("autoformat.remove_empty.remove_nbsp"));
    }

    #[test]
    fn set_and_get() {
        let store = ConfigStore::new().unwrap();

        store
            .set("core.escape_invalid_tags", Setting::Bool(true))
            .unwrap();
        assert!(store.get_bool("core.escape_invalid_tags"));

        store.set_from_str("html.allowed", "p,b,a[href]").unwrap();
        assert_eq!(store.get_string("html.allowed"), "p,b,a[href]");

        store.set_from_str("core.hidden_elements", "script").unwrap();
        assert_eq!(store.get_map("core.hidden_elements"), vec!["script"]);
    }

    #[test]
    fn invalid_setting() {
        testing_logger::setup();
        let store = ConfigStore::new().unwrap();

        let res = store.set(
            "core.escape_invalid_tags",
            Setting::String("wont accept strings".into()),
        );
        assert!(res.is_err());
        assert!(!store.get_bool("core.escape_invalid_tags"));

        testing_logger::validate(|captured_logs| {
            assert_eq!(captured_logs.len(), 1);
            assert_eq!(captured_logs[0].level, log::Level::Warn);
        });
    }

    #[test]
    fn unknown_setting() {
        let store = ConfigStore::new().unwrap();

        assert!(store.get("this.key.doesnt.exist").is_none());
        assert!(store.set_from_str("this.key.doesnt.exist", "x").is_err());
        assert_eq!(store.get_string("this.key.doesnt.exist"), "");
    }

    #[test]
    fn find_with_wildcards() {
        let store = ConfigStore::new().unwrap();

        let keys = store.find("autoformat.*");
        assert!(keys.contains(&"autoformat.linkify".to_string()));
        assert!(keys.contains(&"autoformat.remove_empty.remove_nbsp".to_string()));
        assert!(!keys.iter().any(|k| k.starts_with("core.")));

        let info = store.get_info("html.parent").unwrap();
        assert_eq!(info.default, Setting::String("div".into()));
    }

    #[test]
    fn storage_overlays_defaults() {
        let storage = MemoryStorageAdapter::new();
        storage.set("autoformat.linkify", Setting::Bool(true));

        let store = ConfigStore::with_storage(Box::new(storage)).unwrap();
        assert!(store.get_bool("autoformat.linkify"));
        assert!(!store.get_bool("autoformat.auto_paragraph"));
    }

    #[test]
    fn storage_with_wrong_type_is_rejected() {
        let storage = MemoryStorageAdapter::new();
        storage.set("autoformat.linkify", Setting::UInt(1));

        assert!(ConfigStore::with_storage(Box::new(storage)).is_err());
    }
}
