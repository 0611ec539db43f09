pub mod keys;
pub mod placeholder;
pub mod resolver;

pub use placeholder::{
    Placeholder, finalize_document, generated_references, scan, substitute_document,
    substitute_str,
};
pub use resolver::{CanvasEnvironment, GeneratedValues, Overrides, ValueSpace, ignored_value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("Configuration missing: {key} is not defined")]
    Missing { key: String },
    #[error("Unresolved template values: {}", keys.join(", "))]
    Unresolved { keys: Vec<String> },
}

pub type ValueResult<T> = Result<T, ValueError>;
