use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::config::{ConfigStore, scalar_to_string};
use crate::values::keys;
use crate::values::{ValueError, ValueResult};

static PROCESS_DATETIME: OnceLock<String> = OnceLock::new();

/// Timestamp captured on first use and shared by every lookup in this process.
pub fn process_datetime() -> &'static str {
    PROCESS_DATETIME.get_or_init(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Is this value produced while a workflow runs (so never taken from config)?
pub fn ignored_value(key: &str) -> bool {
    matches!(
        key,
        keys::LTI_DEV_ID | keys::LTI_DEV_KEY | keys::API_DEV_ID | keys::API_DEV_KEY
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasEnvironment {
    Test,
    Beta,
    Prod,
}

impl CanvasEnvironment {
    pub fn from_url(canvas_url: &str) -> Self {
        if canvas_url.contains(".test.") {
            Self::Test
        } else if canvas_url.contains(".beta.") {
            Self::Beta
        } else {
            Self::Prod
        }
    }

    pub fn provider_url(self) -> &'static str {
        match self {
            Self::Test => "https://sso.test.canvaslms.com",
            Self::Beta => "https://sso.beta.canvaslms.com",
            Self::Prod => "https://sso.canvaslms.com",
        }
    }

    pub fn issuer_uri(self) -> &'static str {
        match self {
            Self::Test => "https://canvas.test.instructure.com",
            Self::Beta => "https://canvas.beta.instructure.com",
            Self::Prod => "https://canvas.instructure.com",
        }
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub registration_id: Option<String>,
}

/// Developer key ids and secrets captured from Canvas during a workflow.
#[derive(Debug, Clone, Default)]
pub struct GeneratedValues {
    pub lti_dev_id: Option<String>,
    pub lti_dev_key: Option<String>,
    pub api_dev_id: Option<String>,
    pub api_dev_key: Option<String>,
}

impl GeneratedValues {
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            keys::LTI_DEV_ID => self.lti_dev_id.as_deref(),
            keys::LTI_DEV_KEY => self.lti_dev_key.as_deref(),
            keys::API_DEV_ID => self.api_dev_id.as_deref(),
            keys::API_DEV_KEY => self.api_dev_key.as_deref(),
            _ => None,
        }
    }
}

/// Snapshot of every value source for one invocation.
///
/// Lookup order: command-line overrides, persisted config (`secrets.`,
/// `setup.`, bare), template defaults, then legacy aliases and finally
/// values derived from other values. Building a new layer returns a new
/// snapshot; nothing is mutated after construction.
#[derive(Debug, Clone)]
pub struct ValueSpace {
    overrides: BTreeMap<String, String>,
    persisted: ConfigStore,
    defaults: BTreeMap<String, String>,
    generated: GeneratedValues,
    captured_at: String,
}

impl ValueSpace {
    pub fn new(persisted: ConfigStore) -> Self {
        Self {
            overrides: BTreeMap::new(),
            persisted,
            defaults: BTreeMap::new(),
            generated: GeneratedValues::default(),
            captured_at: process_datetime().to_string(),
        }
    }

    /// Template defaults only fill gaps: keys already present in any layer
    /// keep their value.
    pub fn with_defaults(mut self, config: Option<&Map<String, Value>>) -> Self {
        let Some(config) = config else {
            return self;
        };
        for (key, value) in config {
            let Some(value) = scalar_to_string(value) else {
                continue;
            };
            if self.overrides.contains_key(key)
                || self.persisted.has(key)
                || self.defaults.contains_key(key)
            {
                continue;
            }
            self.defaults.insert(key.clone(), value);
        }
        self
    }

    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(registration_id) = overrides
            .registration_id
            .as_ref()
            .filter(|id| !id.is_empty())
        {
            self.overrides
                .insert(keys::LTI_REGISTRATION_ID.to_string(), registration_id.clone());
        }
        self
    }

    pub fn with_generated(mut self, generated: GeneratedValues) -> Self {
        self.generated = generated;
        self
    }

    pub fn with_captured_at(mut self, captured_at: impl Into<String>) -> Self {
        self.captured_at = captured_at.into();
        self
    }

    pub fn generated(&self) -> &GeneratedValues {
        &self.generated
    }

    pub fn lookup_value(&self, key: &str) -> Option<String> {
        let direct = self.direct(key);
        if is_set(direct.as_deref()) {
            return direct;
        }
        if let Some(alias) = keys::alias_for(key) {
            let aliased = self.direct(alias);
            if is_set(aliased.as_deref()) {
                return aliased;
            }
        }
        if let Some(derived) = self.derived(key) {
            return Some(derived);
        }
        // An explicit empty string is still a value.
        direct
    }

    /// Like [`lookup_value`](Self::lookup_value) but empty values count as
    /// missing.
    pub fn check_defined(&self, key: &str) -> ValueResult<String> {
        self.lookup_value(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ValueError::Missing {
                key: key.to_string(),
            })
    }

    fn direct(&self, key: &str) -> Option<String> {
        if let Some(value) = self.overrides.get(key) {
            return Some(value.clone());
        }
        for namespace in keys::NAMESPACES {
            if let Some(value) = self.persisted.get(&format!("{namespace}.{key}")) {
                return Some(value);
            }
        }
        if let Some(value) = self.persisted.get(key) {
            return Some(value);
        }
        self.defaults.get(key).cloned()
    }

    fn derived(&self, key: &str) -> Option<String> {
        match key {
            keys::CANVAS_PROVIDER_URL => self
                .canvas_environment()
                .map(|env| env.provider_url().to_string()),
            keys::CANVAS_ISSUER_URI => self
                .canvas_environment()
                .map(|env| env.issuer_uri().to_string()),
            keys::CURRENT_DATETIME => Some(self.captured_at.clone()),
            _ => None,
        }
    }

    fn canvas_environment(&self) -> Option<CanvasEnvironment> {
        self.direct(keys::CANVAS_URL)
            .filter(|url| !url.is_empty())
            .map(|url| CanvasEnvironment::from_url(&url))
    }
}

fn is_set(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CanvasEnvironment, Overrides, ValueSpace, ignored_value};
    use crate::config::ConfigStore;
    use crate::values::ValueError;

    fn space(persisted: serde_json::Value) -> ValueSpace {
        ValueSpace::new(ConfigStore::from_value(persisted))
    }

    #[test]
    fn namespaces_checked_in_order() {
        let values = space(json!({
            "secrets": { "canvas_token": "from-secrets" },
            "setup": { "canvas_token": "from-setup", "canvas_url": "https://setup" },
            "canvas_token": "bare",
            "canvas_url": "https://bare",
            "tool_support_url": "https://ts"
        }));
        assert_eq!(values.lookup_value("canvas_token").as_deref(), Some("from-secrets"));
        assert_eq!(values.lookup_value("canvas_url").as_deref(), Some("https://setup"));
        assert_eq!(values.lookup_value("tool_support_url").as_deref(), Some("https://ts"));
    }

    #[test]
    fn override_beats_every_layer() {
        let template = json!({ "lti_registration_id": "from-template" });
        let values = space(json!({ "secrets": { "lti_registration_id": "from-secrets" } }))
            .with_defaults(template.as_object())
            .with_overrides(&Overrides {
                registration_id: Some("from-cli".to_string()),
            });
        assert_eq!(
            values.lookup_value("lti_registration_id").as_deref(),
            Some("from-cli")
        );
    }

    #[test]
    fn defaults_fill_gaps_only() {
        let template = json!({ "canvas_token": "default-token", "lti_tool_title": "Tool" });
        let other = json!({ "lti_tool_title": "Other" });
        let once = space(json!({ "canvas_token": "persisted" })).with_defaults(template.as_object());
        let twice = once.clone().with_defaults(template.as_object());
        let values = twice.clone().with_defaults(other.as_object());
        assert_eq!(values.lookup_value("canvas_token").as_deref(), Some("persisted"));
        assert_eq!(values.lookup_value("lti_tool_title").as_deref(), Some("Tool"));
        for key in ["canvas_token", "lti_tool_title"] {
            assert_eq!(once.lookup_value(key), twice.lookup_value(key));
        }
    }

    #[test]
    fn alias_used_only_when_direct_missing() {
        let values = space(json!({ "setup": { "tool_support_url": "https://ts" } }));
        assert_eq!(
            values.lookup_value("proxy_server_url").as_deref(),
            Some("https://ts")
        );

        let values = space(json!({
            "proxy_server_url": "https://proxy",
            "tool_support_url": "https://ts"
        }));
        assert_eq!(
            values.lookup_value("proxy_server_url").as_deref(),
            Some("https://proxy")
        );
    }

    #[test]
    fn derived_values_follow_canvas_url() {
        for (url, env) in [
            ("https://x.test.y", CanvasEnvironment::Test),
            ("https://x.beta.y", CanvasEnvironment::Beta),
            ("https://canvas.example.edu", CanvasEnvironment::Prod),
        ] {
            let values = space(json!({ "canvas_url": url }));
            assert_eq!(
                values.lookup_value("canvas_provider_url").as_deref(),
                Some(env.provider_url())
            );
            assert_eq!(
                values.lookup_value("canvas_issuer_uri").as_deref(),
                Some(env.issuer_uri())
            );
        }
        assert_eq!(
            CanvasEnvironment::from_url("https://x.test.y").provider_url(),
            "https://sso.test.canvaslms.com"
        );
    }

    #[test]
    fn explicit_value_beats_derived() {
        let values = space(json!({
            "canvas_url": "https://x.test.y",
            "canvas_provider_url": "https://custom"
        }));
        assert_eq!(
            values.lookup_value("canvas_provider_url").as_deref(),
            Some("https://custom")
        );
    }

    #[test]
    fn derived_requires_canvas_url() {
        let values = space(json!({}));
        assert!(values.lookup_value("canvas_provider_url").is_none());
    }

    #[test]
    fn current_datetime_is_stable() {
        let values = space(json!({}));
        let first = values.lookup_value("current_datetime");
        let second = values.lookup_value("current_datetime");
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some(super::process_datetime()));
    }

    #[test]
    fn empty_string_is_a_value_but_not_defined() {
        let values = space(json!({ "notes": "" }));
        assert_eq!(values.lookup_value("notes").as_deref(), Some(""));
        assert_eq!(
            values.check_defined("notes"),
            Err(ValueError::Missing {
                key: "notes".to_string()
            })
        );
        assert!(values.lookup_value("absent").is_none());
    }

    #[test]
    fn ignored_values_are_exactly_the_generated_keys() {
        for key in ["lti_dev_id", "lti_dev_key", "api_dev_id", "api_dev_key"] {
            assert!(ignored_value(key));
        }
        for key in ["LTI_DEV_ID", "canvas_url", "lti_registration_id", "api_dev", ""] {
            assert!(!ignored_value(key));
        }
    }
}
