//! Table plans
//!
//! A [`TablePlan`] is a [`TableDefinition`] resolved against a provider
//! registry: providers are instantiated, exclude patterns compiled and the
//! fetched column list fixed. Building plans for every table before any row
//! is read makes configuration mistakes fail fast.

use super::exclude::ExcludeFilter;
use crate::domain::{AnonymizerError, Result, TableDefinition};
use crate::providers::{Provider, ProviderRegistry};
use std::sync::Arc;

/// A column rule with its provider instantiated
#[derive(Debug, Clone)]
pub struct ResolvedRule {
    /// Column name
    pub column: String,
    /// Position of the column in the fetched column list
    pub index: usize,
    /// Provider name, for diagnostics
    pub provider_name: String,
    /// Provider instance shared by all workers
    pub provider: Arc<dyn Provider>,
    /// Literal suffix appended after transformation
    pub append: Option<String>,
}

/// Names and SQL-relevant settings of a table, without provider instances
///
/// This is the part of a plan a database session needs to build its
/// statements.
#[derive(Debug, Clone, PartialEq)]
pub struct TableShape {
    /// Source table name, optionally schema-qualified
    pub table: String,
    /// Identifying column
    pub primary_key: String,
    /// Columns selected from the source: identifying column first, then rule
    /// columns in rule order, then exclude-only columns
    pub fetch_columns: Vec<String>,
    /// Rule columns, in rule order
    pub rule_columns: Vec<String>,
    /// Raw SQL search condition
    pub search: Option<String>,
}

impl TableShape {
    /// Columns of the staging table: identifying column followed by rule columns
    pub fn staging_columns(&self) -> Vec<String> {
        std::iter::once(self.primary_key.clone())
            .chain(self.rule_columns.iter().cloned())
            .collect()
    }
}

/// Fully resolved anonymization plan for one table
#[derive(Debug, Clone)]
pub struct TablePlan {
    /// Table names and columns
    pub shape: TableShape,
    /// Shared fetched column list handed to every row
    pub columns: Arc<[String]>,
    /// Column rules with providers
    pub rules: Vec<ResolvedRule>,
    /// Compiled exclude rules
    pub excludes: ExcludeFilter,
    /// Rows fetched per batch
    pub chunk_size: usize,
}

/// Union of identifying column, rule columns and exclude columns, in that order, without duplicates
pub fn fetch_columns(definition: &TableDefinition) -> Vec<String> {
    let mut columns = vec![definition.primary_key.clone()];
    let rule_columns = definition.fields.iter().map(|f| &f.column);
    let exclude_columns = definition.excludes.iter().map(|e| &e.column);

    for column in rule_columns.chain(exclude_columns) {
        if !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

impl TablePlan {
    /// Resolve a table definition
    ///
    /// # Errors
    ///
    /// Returns a configuration error for structurally invalid definitions and
    /// unknown providers, and [`AnonymizerError::ExcludePattern`] for invalid
    /// exclude patterns.
    pub fn build(definition: &TableDefinition, registry: &ProviderRegistry) -> Result<Self> {
        definition
            .validate()
            .map_err(AnonymizerError::Configuration)?;

        let fetch_columns = fetch_columns(definition);

        let mut rules = Vec::with_capacity(definition.fields.len());
        for field in &definition.fields {
            let provider = registry.resolve(&field.provider).map_err(|e| match e {
                AnonymizerError::Configuration(msg) => AnonymizerError::Configuration(format!(
                    "tables.{}.{}: {}",
                    definition.name, field.column, msg
                )),
                other => other,
            })?;
            let index = fetch_columns
                .iter()
                .position(|c| c == &field.column)
                .unwrap_or_default();

            rules.push(ResolvedRule {
                column: field.column.clone(),
                index,
                provider_name: field.provider.name.clone(),
                provider,
                append: field.append.clone().filter(|s| !s.is_empty()),
            });
        }

        let excludes = ExcludeFilter::compile(&definition.excludes, &fetch_columns)?;

        let shape = TableShape {
            table: definition.name.clone(),
            primary_key: definition.primary_key.clone(),
            rule_columns: definition.fields.iter().map(|f| f.column.clone()).collect(),
            fetch_columns: fetch_columns.clone(),
            search: definition
                .search
                .clone()
                .filter(|s| !s.trim().is_empty()),
        };

        Ok(Self {
            shape,
            columns: fetch_columns.into(),
            rules,
            excludes,
            chunk_size: definition.chunk_size,
        })
    }

    /// Source table name
    pub fn table(&self) -> &str {
        &self.shape.table
    }

    /// Estimated number of batches for `total_rows` rows
    pub fn estimated_batches(&self, total_rows: u64) -> u64 {
        total_rows.div_ceil(self.chunk_size as u64)
    }
}

/// Resolve every definition, stopping at the first invalid one
pub fn build_plans(
    definitions: &[TableDefinition],
    registry: &ProviderRegistry,
) -> Result<Vec<TablePlan>> {
    definitions
        .iter()
        .map(|definition| TablePlan::build(definition, registry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderConfig;

    fn users() -> TableDefinition {
        TableDefinition::new("users")
            .field("email", ProviderConfig::named("md5"))
            .field_with_append("name", ProviderConfig::named("mask"), "")
            .exclude("login", &["admin"])
            .exclude("email", &[r"\S.*@example\.com"])
            .chunk_size(2)
    }

    #[test]
    fn test_fetch_columns_order() {
        assert_eq!(fetch_columns(&users()), vec!["id", "email", "name", "login"]);
    }

    #[test]
    fn test_build_plan() {
        let plan = TablePlan::build(&users(), &ProviderRegistry::with_builtins()).unwrap();

        assert_eq!(plan.table(), "users");
        assert_eq!(plan.shape.rule_columns, vec!["email", "name"]);
        assert_eq!(plan.shape.staging_columns(), vec!["id", "email", "name"]);
        assert_eq!(plan.rules[0].index, 1);
        assert_eq!(plan.rules[1].index, 2);
        // empty suffix is treated as no suffix
        assert!(plan.rules[1].append.is_none());
        assert_eq!(plan.excludes.rules().len(), 2);
        assert_eq!(plan.excludes.rules()[0].index, 3);
    }

    #[test]
    fn test_estimated_batches() {
        let plan = TablePlan::build(&users(), &ProviderRegistry::with_builtins()).unwrap();
        assert_eq!(plan.estimated_batches(0), 0);
        assert_eq!(plan.estimated_batches(4), 2);
        assert_eq!(plan.estimated_batches(5), 3);
    }

    #[test]
    fn test_unknown_provider_fails_fast() {
        let definitions = vec![
            users(),
            TableDefinition::new("orders").field("address", ProviderConfig::named("fake.address")),
        ];
        let err = build_plans(&definitions, &ProviderRegistry::with_builtins()).unwrap_err();
        assert!(matches!(err, AnonymizerError::Configuration(_)));
        assert!(err.to_string().contains("tables.orders.address"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let definition = users().search("   ");
        let plan = TablePlan::build(&definition, &ProviderRegistry::with_builtins()).unwrap();
        assert!(plan.shape.search.is_none());
    }
}
