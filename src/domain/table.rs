//! Table definitions
//!
//! A [`TableDefinition`] describes which columns of a table are anonymized,
//! with which provider, and which rows are left alone. Definitions are plain
//! data deserialized from the `[[tables]]` section of the configuration; they
//! are resolved against a provider registry into a table plan before any row
//! is read.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identifying column used when a definition does not name one
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Number of rows fetched per round-trip when a definition does not set one
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Anonymization rules for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name, optionally schema-qualified (`schema.table`)
    pub name: String,

    /// Column rules, applied in order
    #[serde(default)]
    pub fields: Vec<ColumnRule>,

    /// Rows matching any exclude rule are left untouched
    #[serde(default)]
    pub excludes: Vec<ExcludeRule>,

    /// Raw SQL search condition used as `WHERE` clause
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Identifying column, unique per row
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Rows fetched per batch
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Replacement rule for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRule {
    /// Column name
    pub column: String,

    /// Provider producing the replacement value
    pub provider: ProviderConfig,

    /// Literal suffix appended after transformation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<String>,
}

/// Reference to a provider plus its options
///
/// Everything besides `name` is handed to the provider factory untouched,
/// e.g. `{ name = "set", value = "redacted" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Registered provider name
    pub name: String,

    /// Provider-specific options
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl ProviderConfig {
    /// Provider reference without options
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: serde_json::Map::new(),
        }
    }

    /// Add an option
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// Pattern-based guard exempting rows from anonymization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludeRule {
    /// Column whose value is matched
    pub column: String,

    /// Regular expressions, matched case-insensitively from the start of the value
    pub patterns: Vec<String>,
}

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl TableDefinition {
    /// Create a definition with defaults for everything but the name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            excludes: Vec::new(),
            search: None,
            primary_key: default_primary_key(),
            chunk_size: default_chunk_size(),
        }
    }

    /// Add a column rule
    pub fn field(mut self, column: impl Into<String>, provider: ProviderConfig) -> Self {
        self.fields.push(ColumnRule {
            column: column.into(),
            provider,
            append: None,
        });
        self
    }

    /// Add a column rule with a literal suffix
    pub fn field_with_append(
        mut self,
        column: impl Into<String>,
        provider: ProviderConfig,
        append: impl Into<String>,
    ) -> Self {
        self.fields.push(ColumnRule {
            column: column.into(),
            provider,
            append: Some(append.into()),
        });
        self
    }

    /// Add an exclude rule
    pub fn exclude(mut self, column: impl Into<String>, patterns: &[&str]) -> Self {
        self.excludes.push(ExcludeRule {
            column: column.into(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    /// Set the search condition
    pub fn search(mut self, condition: impl Into<String>) -> Self {
        self.search = Some(condition.into());
        self
    }

    /// Set the identifying column
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Set the chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Validate the structural constraints of the definition
    ///
    /// Provider names and exclude patterns are checked when the definition
    /// is resolved into a plan.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("table name cannot be empty".to_string());
        }
        if self.primary_key.trim().is_empty() {
            return Err(format!("tables.{}: primary_key cannot be empty", self.name));
        }
        if self.chunk_size == 0 {
            return Err(format!("tables.{}: chunk_size must be > 0", self.name));
        }
        if self.fields.is_empty() {
            return Err(format!(
                "tables.{}: at least one field rule is required",
                self.name
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.column.trim().is_empty() {
                return Err(format!("tables.{}: field column cannot be empty", self.name));
            }
            if field.column == self.primary_key {
                return Err(format!(
                    "tables.{}: the identifying column '{}' cannot be anonymized",
                    self.name, field.column
                ));
            }
            if !seen.insert(field.column.as_str()) {
                return Err(format!(
                    "tables.{}: duplicate field rule for column '{}'",
                    self.name, field.column
                ));
            }
            if field.provider.name.trim().is_empty() {
                return Err(format!(
                    "tables.{}.{}: provider name cannot be empty",
                    self.name, field.column
                ));
            }
        }

        for exclude in &self.excludes {
            if exclude.column.trim().is_empty() {
                return Err(format!(
                    "tables.{}: exclude column cannot be empty",
                    self.name
                ));
            }
        }

        Ok(())
    }
}
