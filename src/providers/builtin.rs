//! Builtin providers
//!
//! | name     | options            | result                                  |
//! |----------|--------------------|-----------------------------------------|
//! | `md5`    |                    | hex MD5 digest of the value             |
//! | `sha256` |                    | hex SHA-256 digest of the value         |
//! | `clear`  |                    | NULL                                    |
//! | `set`    | `value`            | the configured value                    |
//! | `mask`   | `sign` (def. `X`)  | one `sign` per character of the value   |
//! | `choice` | `values`           | a random element of `values`            |
//! | `uuid4`  |                    | a random UUID                           |

use super::{Provider, ProviderRegistry};
use crate::domain::{AnonymizerError, ProviderConfig, Result, Value};
use md5::Md5;
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Register every builtin provider
pub fn register_all(registry: &mut ProviderRegistry) {
    registry
        .register("md5", |_| Ok(Arc::new(Md5Provider) as Arc<dyn Provider>))
        .register("sha256", |_| Ok(Arc::new(Sha256Provider) as Arc<dyn Provider>))
        .register("clear", |_| Ok(Arc::new(ClearProvider) as Arc<dyn Provider>))
        .register("set", |config| {
            Ok(Arc::new(SetProvider::from_config(config)?) as Arc<dyn Provider>)
        })
        .register("mask", |config| {
            Ok(Arc::new(MaskProvider::from_config(config)?) as Arc<dyn Provider>)
        })
        .register("choice", |config| {
            Ok(Arc::new(ChoiceProvider::from_config(config)?) as Arc<dyn Provider>)
        })
        .register("uuid4", |_| Ok(Arc::new(Uuid4Provider) as Arc<dyn Provider>));
}

fn option_error(config: &ProviderConfig, message: impl Into<String>) -> AnonymizerError {
    AnonymizerError::Configuration(format!(
        "provider '{}': {}",
        config.name,
        message.into()
    ))
}

fn hash_text<D: Digest>(value: &Value) -> Value {
    match value.text_form() {
        Some(text) => Value::Text(
            D::digest(text.as_bytes())
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect(),
        ),
        None => Value::Null,
    }
}

/// Hex MD5 digest of the textual value
#[derive(Debug, Default)]
pub struct Md5Provider;

impl Provider for Md5Provider {
    fn name(&self) -> &str {
        "md5"
    }

    fn alter(&self, value: &Value) -> Result<Value> {
        Ok(hash_text::<Md5>(value))
    }
}

/// Hex SHA-256 digest of the textual value
#[derive(Debug, Default)]
pub struct Sha256Provider;

impl Provider for Sha256Provider {
    fn name(&self) -> &str {
        "sha256"
    }

    fn alter(&self, value: &Value) -> Result<Value> {
        Ok(hash_text::<Sha256>(value))
    }
}

/// Replaces every value with NULL
#[derive(Debug, Default)]
pub struct ClearProvider;

impl Provider for ClearProvider {
    fn name(&self) -> &str {
        "clear"
    }

    fn alter(&self, _value: &Value) -> Result<Value> {
        Ok(Value::Null)
    }
}

/// Replaces every value with a configured constant
#[derive(Debug)]
pub struct SetProvider {
    value: Value,
}

impl SetProvider {
    /// Provider returning `value`
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    fn from_config(config: &ProviderConfig) -> Result<Self> {
        let value = config
            .options
            .get("value")
            .cloned()
            .ok_or_else(|| option_error(config, "missing option 'value'"))?;
        Ok(Self::new(Value::from_json(value)))
    }
}

impl Provider for SetProvider {
    fn name(&self) -> &str {
        "set"
    }

    fn alter(&self, _value: &Value) -> Result<Value> {
        Ok(self.value.clone())
    }
}

/// Masks every character of the value
#[derive(Debug)]
pub struct MaskProvider {
    sign: char,
}

impl MaskProvider {
    /// Provider masking with `sign`
    pub fn new(sign: char) -> Self {
        Self { sign }
    }

    fn from_config(config: &ProviderConfig) -> Result<Self> {
        let sign = match config.options.get("sign") {
            None => 'X',
            Some(serde_json::Value::String(s)) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => return Err(option_error(config, "'sign' must be a single character")),
                }
            }
            Some(_) => return Err(option_error(config, "'sign' must be a string")),
        };
        Ok(Self::new(sign))
    }
}

impl Provider for MaskProvider {
    fn name(&self) -> &str {
        "mask"
    }

    fn alter(&self, value: &Value) -> Result<Value> {
        Ok(match value.text_form() {
            Some(text) => Value::Text(std::iter::repeat(self.sign).take(text.chars().count()).collect()),
            None => Value::Null,
        })
    }
}

/// Picks a random value from a configured list
#[derive(Debug)]
pub struct ChoiceProvider {
    values: Vec<Value>,
}

impl ChoiceProvider {
    /// Provider choosing among `values`
    ///
    /// Returns `None` when `values` is empty.
    pub fn new(values: Vec<Value>) -> Option<Self> {
        if values.is_empty() {
            None
        } else {
            Some(Self { values })
        }
    }

    fn from_config(config: &ProviderConfig) -> Result<Self> {
        let values = match config.options.get("values") {
            Some(serde_json::Value::Array(items)) => {
                items.iter().cloned().map(Value::from_json).collect()
            }
            Some(_) => return Err(option_error(config, "'values' must be an array")),
            None => return Err(option_error(config, "missing option 'values'")),
        };
        Self::new(values).ok_or_else(|| option_error(config, "'values' cannot be empty"))
    }
}

impl Provider for ChoiceProvider {
    fn name(&self) -> &str {
        "choice"
    }

    fn alter(&self, _value: &Value) -> Result<Value> {
        self.values
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| AnonymizerError::Provider {
                provider: "choice".to_string(),
                message: "no values to choose from".to_string(),
            })
    }
}

/// Replaces every value with a random UUID
#[derive(Debug, Default)]
pub struct Uuid4Provider;

impl Provider for Uuid4Provider {
    fn name(&self) -> &str {
        "uuid4"
    }

    fn alter(&self, _value: &Value) -> Result<Value> {
        Ok(Value::Text(uuid::Uuid::new_v4().to_string()))
    }
}
