//! Row filtering.
//!
//! A [`RowFilter`] is a typed predicate over [`Row`]s. It runs once over
//! the whole loaded set before any command is built, keeps input order,
//! and aborts the run on the first evaluation error.
//!
//! Predicates come either from code ([`RowFilter::from_fn`],
//! [`RowFilter::try_from_fn`]) or from declarative [`FilterRule`]s, which
//! is what config files and the CLI use:
//!
//! ```text
//! --filter 'Status=Active'     cell equals value (trimmed cell)
//! --filter 'Status!=Closed'    cell differs from value
//! --filter 'Ref~^INV-\d+$'     regex matches raw cell
//! --filter 'Email?'            cell is not blank
//! --filter '!Email?'           cell is blank
//! ```
//!
//! Several rules combine with AND.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfigError, ConfigResult, FilterError, FilterResult};
use crate::models::Row;

// =============================================================================
// Declarative rules
// =============================================================================

/// Condition checked against one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Equals(String),
    NotEquals(String),
    Matches(String),
    /// `true`: cell must not be blank; `false`: cell must be blank.
    NotEmpty(bool),
    /// `true`: cell must be blank; `false`: cell must not be blank.
    Empty(bool),
}

/// One column condition, e.g. `{"column": "Status", "equals": "Active"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub column: String,
    #[serde(flatten)]
    pub condition: Condition,
}

impl FilterRule {
    pub fn new(column: impl Into<String>, condition: Condition) -> Self {
        Self {
            column: column.into(),
            condition,
        }
    }

    /// Parse the CLI shorthand (`Col=v`, `Col!=v`, `Col~re`, `Col?`, `!Col?`).
    pub fn parse(expr: &str) -> ConfigResult<Self> {
        let invalid = |message: &str| ConfigError::InvalidArgument {
            option: "--filter".to_string(),
            value: expr.to_string(),
            message: message.to_string(),
        };

        let trimmed = expr.trim();

        // Earliest operator wins; `!=` before `=` when both start at the same spot.
        let operators: [(&str, fn(String) -> Condition); 3] = [
            ("!=", Condition::NotEquals),
            ("=", Condition::Equals),
            ("~", Condition::Matches),
        ];
        let found = operators
            .iter()
            .filter_map(|(op, make)| trimmed.find(op).map(|pos| (pos, *op, *make)))
            .min_by_key(|(pos, op, _)| (*pos, usize::MAX - op.len()));

        let Some((pos, op, make)) = found else {
            let column = trimmed
                .strip_suffix('?')
                .ok_or_else(|| invalid("expected COLUMN=VALUE, COLUMN!=VALUE, COLUMN~REGEX or COLUMN?"))?;
            let (column, blank) = match column.strip_prefix('!') {
                Some(rest) => (rest.trim(), true),
                None => (column.trim(), false),
            };
            if column.is_empty() {
                return Err(invalid("missing column name"));
            }
            let condition = if blank { Condition::Empty(true) } else { Condition::NotEmpty(true) };
            return Ok(Self::new(column, condition));
        };

        let column = trimmed[..pos].trim();
        if column.is_empty() {
            return Err(invalid("missing column name"));
        }
        // Regexes see the raw cell, so only comparison values are trimmed.
        let value = &trimmed[pos + op.len()..];
        let value = if op == "~" { value } else { value.trim() };
        Ok(Self::new(column, make(value.to_string())))
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Condition::Equals(v) => write!(f, "{} = \"{}\"", self.column, v),
            Condition::NotEquals(v) => write!(f, "{} != \"{}\"", self.column, v),
            Condition::Matches(re) => write!(f, "{} ~ /{}/", self.column, re),
            Condition::NotEmpty(true) | Condition::Empty(false) => write!(f, "{} is not blank", self.column),
            Condition::NotEmpty(false) | Condition::Empty(true) => write!(f, "{} is blank", self.column),
        }
    }
}

/// A rule with its regex compiled.
#[derive(Debug)]
struct CompiledRule {
    rule: FilterRule,
    pattern: Option<Regex>,
}

impl CompiledRule {
    fn compile(rule: FilterRule) -> FilterResult<Self> {
        let pattern = match &rule.condition {
            Condition::Matches(p) => Some(Regex::new(p).map_err(|source| FilterError::InvalidPattern {
                pattern: p.clone(),
                source,
            })?),
            _ => None,
        };
        Ok(Self { rule, pattern })
    }

    fn evaluate(&self, row: &Row) -> FilterResult<bool> {
        if !row.has_column(&self.rule.column) {
            return Err(FilterError::UnknownColumn(self.rule.column.clone()));
        }
        let raw = row.get(&self.rule.column).unwrap_or("");
        let cell = raw.trim();

        Ok(match &self.rule.condition {
            Condition::Equals(v) => cell == v.trim(),
            Condition::NotEquals(v) => cell != v.trim(),
            Condition::Matches(_) => self.pattern.as_ref().is_some_and(|re| re.is_match(raw)),
            Condition::NotEmpty(want) => !cell.is_empty() == *want,
            Condition::Empty(want) => cell.is_empty() == *want,
        })
    }
}

// =============================================================================
// RowFilter
// =============================================================================

type Closure = dyn Fn(&Row) -> Result<bool, String> + Send + Sync;

enum Predicate {
    All,
    Closure(Box<Closure>),
    Rules(Vec<CompiledRule>),
}

/// Predicate deciding which rows become commands. Defaults to accepting all rows.
pub struct RowFilter {
    predicate: Predicate,
}

/// Rows kept by a filter plus the counts reported in diagnostics.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Retained rows, input order preserved.
    pub rows: Vec<Row>,
    /// Row count before filtering.
    pub total: usize,
}

impl FilterOutcome {
    /// Rows the predicate rejected.
    pub fn excluded(&self) -> usize {
        self.total - self.rows.len()
    }
}

impl RowFilter {
    pub fn accept_all() -> Self {
        Self { predicate: Predicate::All }
    }

    /// Wrap an infallible predicate.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Predicate::Closure(Box::new(move |row: &Row| -> Result<bool, String> { Ok(f(row)) })),
        }
    }

    /// Wrap a fallible predicate. The first error aborts filtering.
    pub fn try_from_fn<F, E>(f: F) -> Self
    where
        F: Fn(&Row) -> Result<bool, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self {
            predicate: Predicate::Closure(Box::new(move |row: &Row| -> Result<bool, String> {
                f(row).map_err(|e| e.to_string())
            })),
        }
    }

    /// Build a filter from rules combined with AND. No rules accepts all rows.
    pub fn from_rules(rules: Vec<FilterRule>) -> FilterResult<Self> {
        if rules.is_empty() {
            return Ok(Self::accept_all());
        }
        let compiled = rules
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<FilterResult<Vec<_>>>()?;
        Ok(Self {
            predicate: Predicate::Rules(compiled),
        })
    }

    pub fn is_accept_all(&self) -> bool {
        matches!(self.predicate, Predicate::All)
    }

    /// Evaluate against one row. `row_number` is 1-based and only used in errors.
    pub fn matches(&self, row: &Row, row_number: usize) -> FilterResult<bool> {
        match &self.predicate {
            Predicate::All => Ok(true),
            Predicate::Closure(f) => f(row).map_err(|message| FilterError::Predicate {
                row: row_number,
                message,
            }),
            Predicate::Rules(rules) => {
                for rule in rules {
                    if !rule.evaluate(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// Keep the rows satisfying the predicate, in order.
    pub fn apply(&self, rows: Vec<Row>) -> FilterResult<FilterOutcome> {
        let total = rows.len();
        if self.is_accept_all() {
            return Ok(FilterOutcome { rows, total });
        }

        let mut kept = Vec::with_capacity(total);
        for (i, row) in rows.into_iter().enumerate() {
            if self.matches(&row, i + 1)? {
                kept.push(row);
            }
        }
        Ok(FilterOutcome { rows: kept, total })
    }

    /// Short description for diagnostics.
    pub fn describe(&self) -> String {
        match &self.predicate {
            Predicate::All => "all rows".to_string(),
            Predicate::Closure(_) => "custom predicate".to_string(),
            Predicate::Rules(rules) => rules
                .iter()
                .map(|r| r.rule.to_string())
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }
}

impl Default for RowFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl fmt::Debug for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RowFilter").field(&self.describe()).finish()
    }
}
