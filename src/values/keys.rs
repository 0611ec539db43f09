//! Canonical configuration key names.

pub const CANVAS_URL: &str = "canvas_url";
pub const CANVAS_TOKEN: &str = "canvas_token";
pub const CANVAS_PROVIDER_URL: &str = "canvas_provider_url";
pub const CANVAS_ISSUER_URI: &str = "canvas_issuer_uri";
pub const TOOL_SUPPORT_URL: &str = "tool_support_url";
pub const TOOL_SUPPORT_USERNAME: &str = "tool_support_username";
pub const TOOL_SUPPORT_PASSWORD: &str = "tool_support_password";
pub const LTI_REGISTRATION_ID: &str = "lti_registration_id";
pub const LTI_ACCOUNT_ID: &str = "lti_account_id";
pub const CURRENT_DATETIME: &str = "current_datetime";

pub const LTI_DEV_ID: &str = "lti_dev_id";
pub const LTI_DEV_KEY: &str = "lti_dev_key";
pub const API_DEV_ID: &str = "api_dev_id";
pub const API_DEV_KEY: &str = "api_dev_key";

/// Keys that must resolve before any network call is made.
pub const CONNECTION_KEYS: [&str; 5] = [
    CANVAS_URL,
    CANVAS_TOKEN,
    TOOL_SUPPORT_URL,
    TOOL_SUPPORT_USERNAME,
    TOOL_SUPPORT_PASSWORD,
];

/// Namespaces checked, in order, when reading a key from persisted config.
pub const NAMESPACES: [&str; 2] = ["secrets", "setup"];

/// Old key names still found in templates and config files.
pub const LEGACY_ALIASES: [(&str, &str); 4] = [
    ("proxy_server_url", TOOL_SUPPORT_URL),
    ("lti_server_url", TOOL_SUPPORT_URL),
    ("lti_user", TOOL_SUPPORT_USERNAME),
    ("lti_password", TOOL_SUPPORT_PASSWORD),
];

pub fn alias_for(key: &str) -> Option<&'static str> {
    LEGACY_ALIASES
        .iter()
        .find(|(legacy, _)| *legacy == key)
        .map(|(_, canonical)| *canonical)
}
