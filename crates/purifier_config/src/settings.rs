use crate::errors::Error;
use core::fmt::Display;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::str::FromStr;

/// A setting can be either an unsigned integer, string, map or boolean.
/// Maps are lists of strings, written as comma separated values.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Setting {
    UInt(usize),
    String(String),
    Bool(bool),
    Map(Vec<String>),
}

impl Setting {
    #[must_use]
    pub fn to_bool(&self) -> bool {
        if !matches!(self, Self::Bool(_)) {
            warn!("setting is not a boolean");
        }

        match self {
            Self::Bool(value) => *value,
            Self::UInt(value) => *value != 0,
            Self::String(value) => is_bool_value(value),
            Self::Map(values) => !values.is_empty(),
        }
    }

    #[must_use]
    pub fn to_uint(&self) -> usize {
        if !matches!(self, Self::UInt(_)) {
            warn!("setting is not an unsigned integer");
        }

        match self {
            Self::UInt(value) => *value,
            Self::Bool(value) => usize::from(*value),
            Self::String(value) => usize::from(is_bool_value(value)),
            Self::Map(values) => values.len(),
        }
    }

    #[allow(clippy::inherent_to_string_shadow_display)]
    #[must_use]
    pub fn to_string(&self) -> String {
        if !matches!(self, Self::String(_)) {
            warn!("setting is not a string");
        }

        match self {
            Self::UInt(value) => value.to_string(),
            Self::String(value) => value.clone(),
            Self::Bool(value) => value.to_string(),
            Self::Map(values) => values.join(","),
        }
    }

    #[must_use]
    pub fn to_map(&self) -> Vec<String> {
        if !matches!(self, Self::Map(_)) {
            warn!("setting is not a map");
        }

        match self {
            Self::Map(values) => values.clone(),
            Self::String(value) => split_map(value),
            other => vec![other.to_string()],
        }
    }

    /// Name of the type of this setting, as used in error messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::UInt(_) => "unsigned integer",
            Self::String(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Map(_) => "map",
        }
    }

    /// Parses a raw (untyped) value into a setting of the same type as `self`. This is used
    /// for values coming from the command line, where the type is implied by the key.
    pub fn parse_like(&self, raw: &str) -> Result<Self, Error> {
        let setting = match self {
            Self::Bool(_) => {
                let us = raw.to_uppercase();
                if ["YES", "ON", "TRUE", "1"].contains(&us.as_str()) {
                    Self::Bool(true)
                } else if ["NO", "OFF", "FALSE", "0"].contains(&us.as_str()) {
                    Self::Bool(false)
                } else {
                    return Err(Error::Config(format!("error parsing {raw}: not a boolean")));
                }
            }
            Self::UInt(_) => Self::UInt(
                raw.parse::<usize>()
                    .map_err(|err| Error::Config(format!("error parsing {raw}: {err}")))?,
            ),
            Self::String(_) => Self::String(raw.to_string()),
            Self::Map(_) => Self::Map(split_map(raw)),
        };

        Ok(setting)
    }

    /// Converts a json value into a setting. Strings are expected in the typed `x:value`
    /// notation, but native json booleans, numbers and string arrays are accepted as well.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => n
                .as_u64()
                .and_then(|u| usize::try_from(u).ok())
                .map(Self::UInt)
                .ok_or_else(|| Error::Config(format!("unsupported number: {n}"))),
            Value::String(s) => Self::from_str(s),
            Value::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => values.push(s.clone()),
                        other => values.push(other.to_string()),
                    }
                }
                Ok(Self::Map(values))
            }
            other => Err(Error::Config(format!("unsupported setting value: {other}"))),
        }
    }
}

fn is_bool_value(s: &str) -> bool {
    let us = s.to_uppercase();
    if ["YES", "ON", "TRUE", "1"].contains(&us.as_str()) {
        return true;
    }

    false
}

/// Splits a comma separated list, dropping empty entries so that `m:` is an empty map
fn split_map(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

impl Serialize for Setting {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = match self {
            Self::UInt(value) => format!("u:{value}"),
            Self::String(value) => format!("s:{value}"),
            Self::Bool(value) => format!("b:{value}"),
            Self::Map(values) => format!("m:{}", values.join(",")),
        };
        serializer.collect_str(&s)
    }
}

impl<'de> Deserialize<'de> for Setting {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::from_str(&value)
            .map_err(|err| serde::de::Error::custom(format!("cannot deserialize: {err}")))
    }
}

impl Display for Setting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UInt(value) => write!(f, "u:{value}"),
            Self::String(value) => write!(f, "s:{value}"),
            Self::Bool(value) => write!(f, "b:{value}"),
            Self::Map(values) => write!(f, "m: {}", values.join(",")),
        }
    }
}

impl FromStr for Setting {
    type Err = Error;

    // first element is the type:
    //   b:true
    //   u:234
    //   s:hello world
    //   m:foo,bar,baz

    /// Converts a string to a setting, or an error when the string is invalid
    fn from_str(key: &str) -> Result<Self, crate::errors::Error> {
        let (key_type, key_value) = key
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("missing type prefix: {key}")))?;

        let setting = match key_type {
            "b" => Self::Bool(
                key_value
                    .parse::<bool>()
                    .map_err(|err| Error::Config(format!("error parsing {key_value}: {err}")))?,
            ),
            "u" => Self::UInt(
                key_value
                    .parse::<usize>()
                    .map_err(|err| Error::Config(format!("error parsing {key_value}: {err}")))?,
            ),
            "s" => Self::String(key_value.to_string()),
            "m" => Self::Map(split_map(key_value)),
            _ => return Err(Error::Config(format!("unknown setting: {key_value}"))),
        };

        Ok(setting)
    }
}

/// `SettingInfo` returns information about a given setting
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SettingInfo {
    /// Name of the key (dot notation, ie: html.allowed)
    pub key: String,
    /// Description of the setting
    pub description: String,
    /// Default setting if none has been specified
    pub default: Setting,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn setting() {
        let s = Setting::from_str("b:true").unwrap();
        assert_eq!(s, Setting::Bool(true));
        assert!(s.to_bool());
        assert_eq!(1, s.to_uint());
        assert_eq!("true", s.to_string());
        assert_eq!(vec!["true"], s.to_map());

        let s = Setting::from_str("u:12").unwrap();
        assert_eq!(s, Setting::UInt(12));
        assert!(s.to_bool());
        assert_eq!("12", s.to_string());

        let s = Setting::from_str("s:hello world").unwrap();
        assert_eq!(s, Setting::String("hello world".into()));
        assert!(!s.to_bool());
        assert_eq!("hello world", s.to_string());

        let s = Setting::from_str("m:foo,bar,baz").unwrap();
        assert_eq!(
            s,
            Setting::Map(vec!["foo".into(), "bar".into(), "baz".into()])
        );
        assert!(s.to_bool());
        assert_eq!(3, s.to_uint());
        assert_eq!("foo,bar,baz", s.to_string());

        let s = Setting::from_str("notexist:true");
        assert!(matches!(s, Err(Error::Config(_))));

        let s = Setting::from_str("b:foobar");
        assert!(matches!(s, Err(Error::Config(_))));

        let s = Setting::from_str("u:-1");
        assert!(matches!(s, Err(Error::Config(_))));

        let s = Setting::from_str("no prefix");
        assert!(matches!(s, Err(Error::Config(_))));
    }

    #[test]
    fn empty_map_has_no_entries() {
        let s = Setting::from_str("m:").unwrap();
        assert_eq!(s, Setting::Map(vec![]));
        assert!(!s.to_bool());
    }

    #[test]
    fn parse_like_follows_the_default_type() {
        assert_eq!(
            Setting::Bool(false).parse_like("on").unwrap(),
            Setting::Bool(true)
        );
        assert_eq!(
            Setting::Map(vec![]).parse_like("p, b ,i").unwrap(),
            Setting::Map(vec!["p".into(), "b".into(), "i".into()])
        );
        assert_eq!(
            Setting::String(String::new()).parse_like("p,b").unwrap(),
            Setting::String("p,b".into())
        );
        assert!(Setting::UInt(0).parse_like("-3").is_err());
        assert!(Setting::Bool(true).parse_like("maybe").is_err());
    }

    #[test]
    fn from_json_values() {
        let v: Value = serde_json::json!(true);
        assert_eq!(Setting::from_json(&v).unwrap(), Setting::Bool(true));

        let v: Value = serde_json::json!(["a", "b"]);
        assert_eq!(
            Setting::from_json(&v).unwrap(),
            Setting::Map(vec!["a".into(), "b".into()])
        );

        let v: Value = serde_json::json!("s:p,b");
        assert_eq!(
            Setting::from_json(&v).unwrap(),
            Setting::String("p,b".into())
        );

        let v: Value = serde_json::json!(7);
        assert_eq!(Setting::from_json(&v).unwrap(), Setting::UInt(7));

        let v: Value = serde_json::json!(-1);
        assert!(Setting::from_json(&v).is_err());

        let v: Value = serde_json::json!({"nested": 1});
        assert!(Setting::from_json(&v).is_err());
    }

    #[test]
    fn serialize_roundtrips_through_typed_notation() {
        let s = Setting::Map(vec!["script".into(), "style".into()]);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"m:script,style\"");
    }
}
