//! Exclude filter
//!
//! Rows whose excluded-column value matches one of the configured patterns are
//! passed through untouched. Patterns are matched case-insensitively and
//! anchored at the start of the value; NULL never matches.

use crate::domain::{AnonymizerError, ExcludeRule, Result, Row};
use regex::{Regex, RegexBuilder};

/// Compiled patterns for one column
#[derive(Debug, Clone)]
pub struct CompiledExclude {
    /// Column name
    pub column: String,
    /// Position of the column in the fetched column list
    pub index: usize,
    /// Anchored, case-insensitive patterns
    pub patterns: Vec<Regex>,
}

/// Set of compiled exclude rules for a table
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    rules: Vec<CompiledExclude>,
}

/// Compile one exclude pattern so that it only matches from the start of the value
pub fn compile_pattern(column: &str, pattern: &str) -> Result<Regex> {
    RegexBuilder::new(&format!("^(?:{pattern})"))
        .case_insensitive(true)
        .build()
        .map_err(|e| AnonymizerError::ExcludePattern {
            column: column.to_string(),
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

impl ExcludeFilter {
    /// Compile exclude rules against the fetched column list
    ///
    /// # Errors
    ///
    /// Returns [`AnonymizerError::ExcludePattern`] for an invalid regular
    /// expression, and a configuration error if a rule names a column that is
    /// not fetched.
    pub fn compile(rules: &[ExcludeRule], columns: &[String]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            let index = columns
                .iter()
                .position(|c| c == &rule.column)
                .ok_or_else(|| {
                    AnonymizerError::Configuration(format!(
                        "exclude column '{}' is not fetched",
                        rule.column
                    ))
                })?;

            let patterns = rule
                .patterns
                .iter()
                .map(|p| compile_pattern(&rule.column, p))
                .collect::<Result<Vec<_>>>()?;

            compiled.push(CompiledExclude {
                column: rule.column.clone(),
                index,
                patterns,
            });
        }

        Ok(Self { rules: compiled })
    }

    /// True when no rules are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compiled rules
    pub fn rules(&self) -> &[CompiledExclude] {
        &self.rules
    }

    /// Check whether a row must be left untouched
    pub fn matches(&self, row: &Row) -> bool {
        self.rules.iter().any(|rule| {
            let Some(text) = row.value_at(rule.index).and_then(|v| v.text_form()) else {
                return false;
            };
            rule.patterns.iter().any(|re| re.is_match(&text))
        })
    }
}
