//! Row transformation
//!
//! Each row of a batch is first checked against the exclude filter, then every
//! column rule is applied in order. Rows are independent, so a batch is split
//! into slices that run on a bounded number of blocking workers. Results are
//! aggregated explicitly: excluded and unchanged rows are counted, and the
//! first provider error aborts the whole batch.

use super::plan::TablePlan;
use crate::domain::{AnonymizerError, Result, Row, Value};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Identifying value plus the new value of every rule column
///
/// `values` is aligned with the plan's rule order.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingRecord {
    /// Value of the identifying column
    pub key: Value,
    /// Values for the rule columns
    pub values: Vec<Value>,
}

/// What happened to one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// An exclude rule matched; the row is left untouched
    Excluded,
    /// Every rule column was NULL or empty; nothing to write
    Unchanged,
    /// At least one column was transformed
    Staged(StagingRecord),
}

/// Aggregated result of transforming one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Records to bulk-load into staging
    pub records: Vec<StagingRecord>,
    /// Rows skipped by exclude rules
    pub excluded: usize,
    /// Rows without any transformable value
    pub unchanged: usize,
}

impl BatchOutcome {
    fn push(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Excluded => self.excluded += 1,
            RowOutcome::Unchanged => self.unchanged += 1,
            RowOutcome::Staged(record) => self.records.push(record),
        }
    }

    fn merge(&mut self, other: BatchOutcome) {
        self.records.extend(other.records);
        self.excluded += other.excluded;
        self.unchanged += other.unchanged;
    }

    /// Number of rows accounted for
    pub fn total(&self) -> usize {
        self.records.len() + self.excluded + self.unchanged
    }
}

/// Transform one row according to the plan
///
/// NULL or empty rule-column values are not passed to the provider; the
/// original value is carried into the staging record so the merge writes it
/// back unchanged.
pub fn transform_row(plan: &TablePlan, row: &Row) -> Result<RowOutcome> {
    if plan.excludes.matches(row) {
        return Ok(RowOutcome::Excluded);
    }

    let mut values = Vec::with_capacity(plan.rules.len());
    let mut transformed = false;

    for rule in &plan.rules {
        let original = row.value_at(rule.index).ok_or_else(|| {
            AnonymizerError::Configuration(format!(
                "column '{}' missing from fetched row of table '{}'",
                rule.column,
                plan.table()
            ))
        })?;

        if original.is_empty() {
            values.push(original.clone());
            continue;
        }

        let mut value = rule
            .provider
            .alter(original)
            .map_err(|e| match e {
                AnonymizerError::Provider { .. } => e,
                other => AnonymizerError::Provider {
                    provider: rule.provider_name.clone(),
                    message: format!("column '{}': {}", rule.column, other),
                },
            })?;
        if let Some(suffix) = &rule.append {
            value = value.with_suffix(suffix);
        }

        values.push(value);
        transformed = true;
    }

    if !transformed {
        return Ok(RowOutcome::Unchanged);
    }

    Ok(RowOutcome::Staged(StagingRecord {
        key: row.key().clone(),
        values,
    }))
}

fn transform_slice(plan: &TablePlan, rows: &[Row]) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    for row in rows {
        outcome.push(transform_row(plan, row)?);
    }
    Ok(outcome)
}

/// Applies a table plan to batches of rows on a bounded worker pool
#[derive(Debug, Clone)]
pub struct RowTransformer {
    plan: Arc<TablePlan>,
    workers: usize,
}

impl RowTransformer {
    /// Create a transformer using at most `workers` concurrent workers
    pub fn new(plan: Arc<TablePlan>, workers: usize) -> Self {
        Self {
            plan,
            workers: workers.max(1),
        }
    }

    /// Number of workers
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Transform a batch
    ///
    /// Every surviving row appears exactly once in the result; the order of
    /// records is not preserved.
    ///
    /// # Errors
    ///
    /// Returns the first provider error. The batch is discarded as a whole,
    /// nothing of it must reach the staging table.
    pub async fn transform_batch(&self, rows: Vec<Row>) -> Result<BatchOutcome> {
        if rows.is_empty() {
            return Ok(BatchOutcome::default());
        }
        if self.workers == 1 {
            return transform_slice(&self.plan, &rows);
        }

        let slice_len = rows.len().div_ceil(self.workers);
        let slices = split_into(rows, slice_len);

        let mut results = stream::iter(slices)
            .map(|slice| {
                let plan = Arc::clone(&self.plan);
                tokio::task::spawn_blocking(move || transform_slice(&plan, &slice))
            })
            .buffer_unordered(self.workers);

        let mut outcome = BatchOutcome::default();
        while let Some(joined) = results.next().await {
            let slice_outcome = joined.map_err(|e| AnonymizerError::Provider {
                provider: "worker".to_string(),
                message: format!("transformation worker failed: {e}"),
            })??;
            outcome.merge(slice_outcome);
        }

        Ok(outcome)
    }
}

fn split_into(rows: Vec<Row>, slice_len: usize) -> Vec<Vec<Row>> {
    let mut slices = Vec::with_capacity(rows.len().div_ceil(slice_len));
    let mut iter = rows.into_iter().peekable();
    while iter.peek().is_some() {
        slices.push(iter.by_ref().take(slice_len).collect());
    }
    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderConfig, TableDefinition};
    use crate::providers::{Provider, ProviderRegistry};
    use md5::{Digest, Md5};
    use serde_json::json;

    fn plan(definition: TableDefinition, registry: &ProviderRegistry) -> Arc<TablePlan> {
        Arc::new(TablePlan::build(&definition, registry).unwrap())
    }

    fn users_plan() -> Arc<TablePlan> {
        plan(
            TableDefinition::new("users")
                .field_with_append("email", ProviderConfig::named("md5"), "@localhost")
                .field(
                    "name",
                    ProviderConfig::named("set").with_option("value", json!("anon")),
                )
                .exclude("email", &[r"\S.*@example\.com"]),
            &ProviderRegistry::with_builtins(),
        )
    }

    fn row(plan: &TablePlan, id: i64, email: Value, name: Value) -> Row {
        Row::new(Arc::clone(&plan.columns), vec![Value::from(id), email, name]).unwrap()
    }

    #[test]
    fn test_transform_row() {
        let plan = users_plan();
        let outcome =
            transform_row(&plan, &row(&plan, 1, Value::from("foo@example.org"), Value::from("Foo")))
                .unwrap();

        let RowOutcome::Staged(record) = outcome else {
            panic!("row should be staged");
        };
        assert_eq!(record.key, Value::from(1));
        assert_eq!(
            record.values,
            vec![
                Value::from(format!("{:x}@localhost", Md5::digest(b"foo@example.org"))),
                Value::from("anon"),
            ]
        );
    }

    #[test]
    fn test_excluded_row() {
        let plan = users_plan();
        let outcome =
            transform_row(&plan, &row(&plan, 1, Value::from("a@example.com"), Value::from("A")))
                .unwrap();
        assert_eq!(outcome, RowOutcome::Excluded);
    }

    #[test]
    fn test_empty_values_are_carried_over() {
        let plan = users_plan();
        let outcome =
            transform_row(&plan, &row(&plan, 7, Value::Null, Value::from("Bob"))).unwrap();
        let RowOutcome::Staged(record) = outcome else {
            panic!("row should be staged");
        };
        assert_eq!(record.values, vec![Value::Null, Value::from("anon")]);

        let outcome = transform_row(&plan, &row(&plan, 8, Value::Null, Value::from(""))).unwrap();
        assert_eq!(outcome, RowOutcome::Unchanged);
    }

    struct Failing;

    impl Provider for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn alter(&self, _value: &Value) -> Result<Value> {
            Err(AnonymizerError::Provider {
                provider: "failing".to_string(),
                message: "boom".to_string(),
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_keeps_every_row_once() {
        let plan = users_plan();
        let rows: Vec<Row> = (0..103)
            .map(|id| {
                let email = if id % 10 == 0 {
                    format!("user{id}@example.com")
                } else {
                    format!("user{id}@corp.org")
                };
                row(&plan, id, Value::from(email), Value::from("x"))
            })
            .collect();

        let transformer = RowTransformer::new(Arc::clone(&plan), 4);
        let outcome = transformer.transform_batch(rows).await.unwrap();

        assert_eq!(outcome.total(), 103);
        assert_eq!(outcome.excluded, 11);
        assert_eq!(outcome.records.len(), 92);

        let mut keys: Vec<String> = outcome.records.iter().map(|r| r.key.to_string()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 92);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_provider_error_aborts_batch() {
        let mut registry = ProviderRegistry::new();
        registry.register("failing", |_| Ok(Arc::new(Failing) as Arc<dyn Provider>));
        let plan = plan(
            TableDefinition::new("users").field("email", ProviderConfig::named("failing")),
            &registry,
        );
        let rows = (0..10i64)
            .map(|id| {
                Row::new(
                    Arc::clone(&plan.columns),
                    vec![Value::from(id), Value::from("x")],
                )
                .unwrap()
            })
            .collect();

        let err = RowTransformer::new(plan, 3)
            .transform_batch(rows)
            .await
            .unwrap_err();
        assert!(matches!(err, AnonymizerError::Provider { .. }));
    }

    #[test]
    fn test_split_into() {
        let plan = users_plan();
        let rows: Vec<Row> = (0..5)
            .map(|id| row(&plan, id, Value::Null, Value::Null))
            .collect();
        let sizes: Vec<usize> = split_into(rows, 2).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }
}
