use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

pub const CONFIG_DIR_ENV: &str = "LTI_CONFIG_DIR";
pub const ENVIRONMENT_ENV: &str = "LTI_ENV";
pub const DEFAULT_ENVIRONMENT: &str = "development";

const EXTENSIONS: [&str; 2] = ["json", "toml"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {detail}")]
    Read { path: PathBuf, detail: String },
    #[error("Failed to parse config file {path}: {detail}")]
    Parse { path: PathBuf, detail: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Persisted configuration merged from every file found in the search path.
///
/// Values are addressed by dotted path (`secrets.canvas_token`). Only scalar
/// leaves count as values; they are always handed out as strings.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    root: Map<String, Value>,
}

impl ConfigStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(root) => Self { root },
            _ => Self::empty(),
        }
    }

    /// Loads `default`, `<env>`, `local` and `local-<env>` from each directory,
    /// later files overriding earlier ones.
    pub fn load(dirs: &[PathBuf], environment: &str) -> ConfigResult<Self> {
        let mut store = Self::empty();
        let stems = [
            "default".to_string(),
            environment.to_string(),
            "local".to_string(),
            format!("local-{environment}"),
        ];
        for dir in dirs {
            for stem in &stems {
                for ext in EXTENSIONS {
                    let path = dir.join(format!("{stem}.{ext}"));
                    if !path.is_file() {
                        continue;
                    }
                    let value = read_file(&path)?;
                    tracing::debug!(event = "config_file_loaded", path = %path.display());
                    store.merge(value);
                }
            }
        }
        Ok(store)
    }

    pub fn merge(&mut self, value: Value) {
        if let Value::Object(incoming) = value {
            merge_objects(&mut self.root, incoming);
        }
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn get(&self, path: &str) -> Option<String> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        scalar_to_string(current)
    }
}

/// Directories searched when none are given on the command line.
pub fn default_search_path() -> Vec<PathBuf> {
    if let Ok(raw) = std::env::var(CONFIG_DIR_ENV) {
        let dirs: Vec<PathBuf> = std::env::split_paths(&raw)
            .filter(|path| !path.as_os_str().is_empty())
            .collect();
        if !dirs.is_empty() {
            return dirs;
        }
    }
    let mut search = Vec::new();
    if let Some(home) = dirs::home_dir() {
        search.push(home.join(".tool-config"));
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    search.push(cwd.join("tool-config"));
    search
}

pub fn environment_name(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(ENVIRONMENT_ENV).ok())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

fn read_file(path: &Path) -> ConfigResult<Value> {
    let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })?;
    let parse_err = |detail: String| ConfigError::Parse {
        path: path.to_path_buf(),
        detail,
    };
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => {
            let table: toml::Table = toml::from_str(&raw).map_err(|err| parse_err(err.to_string()))?;
            serde_json::to_value(table).map_err(|err| parse_err(err.to_string()))
        }
        _ => serde_json::from_str(&raw).map_err(|err| parse_err(err.to_string())),
    }
}

fn merge_objects(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_objects(existing, nested);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
