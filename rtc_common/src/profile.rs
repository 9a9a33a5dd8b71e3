//! Module profile.
//!
//! Every component module ships a static key/value table describing itself
//! (identity, activity type, instance limit) and its configuration
//! variables (`conf.default.*`, `conf.__widget__.*`,
//! `conf.__constraints__.*`, `conf.__type__.*`). The table is turned into
//! [`Properties`] and then validated into a [`ModuleProfile`].

use crate::conf::{Constraint, ParamSpec, ParamType, Widget};
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

/// Error types for module profile parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// A required key is absent or empty
    #[error("Missing required profile key: {0}")]
    MissingKey(&'static str),

    /// A key has an unparseable value
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue {
        /// Property key
        key: String,
        /// Offending value
        value: String,
    },
}

/// Ordered string properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    /// Build from a static key/value table. Later duplicates override earlier ones.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut props = Self::default();
        for (k, v) in pairs {
            props.set(k, v);
        }
        props
    }

    /// Insert or replace a value.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    /// Value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `key`, or `default`.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// `(suffix, value)` of every key starting with `prefix`, in insertion order.
    pub fn keys_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.entries
            .iter()
            .filter_map(move |(k, v)| k.strip_prefix(prefix).map(|rest| (rest, v.as_str())))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How the execution context triggers the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    /// Executed every period
    Periodic,
    /// Executed on demand
    Sporadic,
    /// Executed on events
    EventDriven,
}

impl FromStr for ActivityType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERIODIC" => Ok(ActivityType::Periodic),
            "SPORADIC" => Ok(ActivityType::Sporadic),
            "EVENT_DRIVEN" => Ok(ActivityType::EventDriven),
            _ => Err(()),
        }
    }
}

/// Validated module metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleProfile {
    /// Unique id the factory is registered under
    pub implementation_id: String,
    /// Type name, prefix of instance names
    pub type_name: String,
    /// Human-readable description
    pub description: String,
    /// Module version
    pub version: String,
    /// Vendor
    pub vendor: String,
    /// Category
    pub category: String,
    /// Activity type
    pub activity_type: ActivityType,
    /// Component kind
    pub kind: String,
    /// Maximum number of live instances (0 = unlimited)
    pub max_instance: u32,
    /// Implementation language
    pub language: String,
    /// Language type (compile / script)
    pub lang_type: String,
    /// Configuration variable specs, in declaration order
    pub params: Vec<ParamSpec>,
}

fn required(props: &Properties, key: &'static str) -> Result<String, ProfileError> {
    match props.get(key) {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(ProfileError::MissingKey(key)),
    }
}

fn invalid(key: String, value: &str) -> ProfileError {
    ProfileError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

impl ModuleProfile {
    /// Parse and validate a static module spec table.
    pub fn from_spec(spec: &[(&str, &str)]) -> Result<Self, ProfileError> {
        Self::from_properties(&Properties::from_pairs(spec))
    }

    /// Parse and validate properties.
    pub fn from_properties(props: &Properties) -> Result<Self, ProfileError> {
        let implementation_id = required(props, "implementation_id")?;
        let type_name = required(props, "type_name")?;

        let activity_raw = props.get_or("activity_type", "PERIODIC");
        let activity_type = activity_raw
            .parse::<ActivityType>()
            .map_err(|_| invalid("activity_type".to_string(), activity_raw))?;

        let max_raw = props.get_or("max_instance", "0");
        let max_instance = max_raw
            .trim()
            .parse::<u32>()
            .map_err(|_| invalid("max_instance".to_string(), max_raw))?;

        let mut params = Vec::new();
        for (name, default) in props.keys_with_prefix("conf.default.") {
            let ty = match props.get(&format!("conf.__type__.{name}")) {
                Some(raw) => Some(
                    raw.parse::<ParamType>()
                        .map_err(|_| invalid(format!("conf.__type__.{name}"), raw))?,
                ),
                None => None,
            };
            let widget = props
                .get(&format!("conf.__widget__.{name}"))
                .map(Widget::parse);
            let constraint = match props.get(&format!("conf.__constraints__.{name}")) {
                Some(raw) if !raw.trim().is_empty() => Some(
                    Constraint::parse(raw)
                        .map_err(|_| invalid(format!("conf.__constraints__.{name}"), raw))?,
                ),
                _ => None,
            };
            params.push(ParamSpec {
                name: name.to_string(),
                default: default.to_string(),
                ty,
                widget,
                constraint,
            });
        }

        Ok(Self {
            implementation_id,
            type_name,
            description: props.get_or("description", "").to_string(),
            version: props.get_or("version", "").to_string(),
            vendor: props.get_or("vendor", "").to_string(),
            category: props.get_or("category", "").to_string(),
            activity_type,
            kind: props.get_or("kind", "DataFlowComponent").to_string(),
            max_instance,
            language: props.get_or("language", "Rust").to_string(),
            lang_type: props.get_or("lang_type", "compile").to_string(),
            params,
        })
    }

    /// Spec of one configuration variable.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &[(&str, &str)] = &[
        ("implementation_id", "Sample"),
        ("type_name", "Sample"),
        ("description", "sample module"),
        ("version", "0.1.0"),
        ("max_instance", "2"),
        ("conf.default.gain", "1.0"),
        ("conf.default.mode", "normal"),
        ("conf.__widget__.gain", "slider.0.1"),
        ("conf.__constraints__.gain", "0<=x<=10"),
        ("conf.__constraints__.mode", "(slow,normal)"),
        ("conf.__type__.gain", "double"),
        ("conf.__type__.mode", "string"),
    ];

    #[test]
    fn test_properties_override_and_prefix() {
        let mut props = Properties::from_pairs(&[("a.x", "1"), ("a.y", "2"), ("b", "3")]);
        props.set("a.x", "9");
        assert_eq!(props.get("a.x"), Some("9"));
        assert_eq!(props.len(), 3);
        let under_a: Vec<_> = props.keys_with_prefix("a.").collect();
        assert_eq!(under_a, vec![("x", "9"), ("y", "2")]);
        assert_eq!(props.get_or("missing", "dflt"), "dflt");
    }

    #[test]
    fn test_profile_parse() {
        let profile = ModuleProfile::from_spec(SPEC).unwrap();
        assert_eq!(profile.implementation_id, "Sample");
        assert_eq!(profile.max_instance, 2);
        assert_eq!(profile.activity_type, ActivityType::Periodic);
        assert_eq!(profile.kind, "DataFlowComponent");
        assert_eq!(profile.params.len(), 2);

        let gain = profile.param("gain").unwrap();
        assert_eq!(gain.default, "1.0");
        assert_eq!(gain.ty, Some(ParamType::Double));
        assert_eq!(gain.widget, Some(Widget::Slider(0.1)));
        assert!(gain.constraint.as_ref().unwrap().check("10"));

        let mode = profile.param("mode").unwrap();
        assert!(mode.widget.is_none());
        assert!(!mode.constraint.as_ref().unwrap().check("fast"));
    }

    #[test]
    fn test_missing_type_name() {
        let err = ModuleProfile::from_spec(&[("implementation_id", "X")]).unwrap_err();
        assert_eq!(err, ProfileError::MissingKey("type_name"));
    }

    #[test]
    fn test_bad_max_instance() {
        let err = ModuleProfile::from_spec(&[
            ("implementation_id", "X"),
            ("type_name", "X"),
            ("max_instance", "-1"),
        ])
        .unwrap_err();
        assert!(matches!(err, ProfileError::InvalidValue { ref key, .. } if key == "max_instance"));
    }

    #[test]
    fn test_bad_constraint() {
        let err = ModuleProfile::from_spec(&[
            ("implementation_id", "X"),
            ("type_name", "X"),
            ("conf.default.v", "0"),
            ("conf.__constraints__.v", "x<>1"),
        ])
        .unwrap_err();
        assert!(matches!(err, ProfileError::InvalidValue { .. }));
    }

    #[test]
    fn test_unknown_activity_type() {
        let err = ModuleProfile::from_spec(&[
            ("implementation_id", "X"),
            ("type_name", "X"),
            ("activity_type", "SOMETIMES"),
        ])
        .unwrap_err();
        assert!(matches!(err, ProfileError::InvalidValue { .. }));
    }
}
