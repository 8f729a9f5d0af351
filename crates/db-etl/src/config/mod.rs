//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::borrow::Cow;
use std::path::Path;

use crate::core::SqlValue;
use crate::error::{EtlError, Result};

impl Config {
    /// Load configuration from a JSON or YAML file, chosen by extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let content = std::fs::read_to_string(path)?;
        match extension.as_str() {
            "json" => Self::from_json(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            other => Err(EtlError::Config(format!(
                "unsupported config file format '{}' (expected .json, .yaml or .yml)",
                other
            ))),
        }
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl ExtractionConfig {
    /// Convert the configured query parameters into bindable values.
    pub fn bind_params(&self) -> Result<Vec<SqlValue<'static>>> {
        self.params
            .iter()
            .enumerate()
            .map(|(idx, param)| json_param_to_value(idx, param))
            .collect()
    }
}

fn json_param_to_value(idx: usize, param: &serde_json::Value) -> Result<SqlValue<'static>> {
    use serde_json::Value;

    match param {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::I64(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::F64(f))
            } else {
                Err(EtlError::Config(format!(
                    "extraction.params[{}]: number {} is out of range",
                    idx, n
                )))
            }
        }
        Value::String(s) => Ok(SqlValue::Text(Cow::Owned(s.clone()))),
        Value::Array(_) | Value::Object(_) => Err(EtlError::Config(format!(
            "extraction.params[{}] must be a scalar value",
            idx
        ))),
    }
}
