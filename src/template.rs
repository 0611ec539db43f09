use std::path::{Path, PathBuf};

use jsonschema::validator_for;
use serde_json::{Map, Value, json};

use crate::values::{
    ValueError, ValueSpace, finalize_document, generated_references, substitute_document,
};

pub const CONFIG_SECTION: &str = "config";
pub const LTI_KEY_SECTION: &str = "ltiKey";
pub const API_KEY_SECTION: &str = "apiKey";
pub const TOOL_REG_SECTION: &str = "toolReg";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {detail}")]
    Read { path: PathBuf, detail: String },
    #[error("Template is not valid JSON: {0}")]
    Json(String),
    #[error("Template does not match the expected shape: {0}")]
    Schema(String),
    #[error("Template has no '{0}' section")]
    MissingSection(&'static str),
    #[error(transparent)]
    Values(#[from] ValueError),
}

pub type TemplateResult<T> = Result<T, TemplateError>;

fn template_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "config": {
                "type": "object",
                "additionalProperties": { "type": ["string", "number", "boolean", "null"] }
            },
            "ltiKey": { "type": "object" },
            "apiKey": { "type": ["object", "null"] },
            "toolReg": {
                "type": "object",
                "properties": {
                    "lti": { "type": ["object", "null"] },
                    "proxy": { "type": ["object", "null"] }
                }
            }
        }
    })
}

/// A parsed, not yet substituted, template document.
#[derive(Debug, Clone)]
pub struct Template {
    document: Value,
}

impl Template {
    pub fn load(path: &Path) -> TemplateResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| TemplateError::Read {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> TemplateResult<Self> {
        let document: Value =
            serde_json::from_str(text).map_err(|err| TemplateError::Json(err.to_string()))?;
        Self::from_value(document)
    }

    pub fn from_value(document: Value) -> TemplateResult<Self> {
        let validator =
            validator_for(&template_schema()).map_err(|err| TemplateError::Schema(err.to_string()))?;
        if let Err(error) = validator.validate(&document) {
            return Err(TemplateError::Schema(error.to_string()));
        }
        Ok(Self { document })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn config(&self) -> Option<&Map<String, Value>> {
        self.document.get(CONFIG_SECTION).and_then(Value::as_object)
    }

    pub fn has_api_key(&self) -> bool {
        section(&self.document, API_KEY_SECTION).is_some()
    }

    /// Substitutes the whole document against `values`.
    ///
    /// Always substitutes from the original text, so running it again after
    /// generated values are known never re-expands earlier output.
    pub fn resolve(&self, values: &ValueSpace) -> TemplateResult<ResolvedTemplate> {
        let resolved = substitute_document(&self.document, values)?;
        let lti_key = section(&resolved, LTI_KEY_SECTION)
            .cloned()
            .ok_or(TemplateError::MissingSection(LTI_KEY_SECTION))?;
        let tool_reg = section(&resolved, TOOL_REG_SECTION)
            .cloned()
            .ok_or(TemplateError::MissingSection(TOOL_REG_SECTION))?;
        let api_key = section(&resolved, API_KEY_SECTION).cloned();
        Ok(ResolvedTemplate {
            lti_key,
            api_key,
            tool_reg,
        })
    }

    /// Substitutes `toolReg` once the developer keys exist. Any generated
    /// name still without a value is an error here.
    pub fn resolve_tool_reg(&self, values: &ValueSpace) -> TemplateResult<Value> {
        let tool_reg = section(&self.document, TOOL_REG_SECTION)
            .ok_or(TemplateError::MissingSection(TOOL_REG_SECTION))?;
        Ok(finalize_document(tool_reg, values)?)
    }

    /// Generated names `toolReg` expects a workflow to produce.
    pub fn tool_reg_generated_references(&self) -> Vec<String> {
        section(&self.document, TOOL_REG_SECTION)
            .map(generated_references)
            .unwrap_or_default()
    }
}

/// Payloads for each call, after substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTemplate {
    pub lti_key: Value,
    pub api_key: Option<Value>,
    pub tool_reg: Value,
}

impl ResolvedTemplate {
    pub fn tool_reg_has_proxy(&self) -> bool {
        section(&self.tool_reg, "proxy").is_some()
    }
}

fn section<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value.get(name).filter(|section| !section.is_null())
}
