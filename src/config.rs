// ABOUTME: Immutable export configuration and its TOML file format
// ABOUTME: Builder for programmatic use, loader for dump configuration files

use crate::filters::TableFilter;
use crate::prefix::RewriteMode;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

/// Default ceiling, in bytes, for a single extended INSERT statement
pub const MAX_LINE_SIZE: usize = 1_000_000;

/// Which non-NULL column values are eligible for prefix rewriting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteGate {
    /// Skip values that are empty or exactly `0`
    Truthy,
    /// Rewrite every non-NULL value
    NonNull,
}

/// How column values are prefix-rewritten during row export
///
/// The default (`Truthy`, `Unanchored`) leaves empty strings and `0` untouched
/// and replaces the prefix anywhere inside a value. Whether the truthy gate is
/// intended behavior or an accident of its origin is unresolved, so both
/// variants are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRewritePolicy {
    pub gate: RewriteGate,
    pub mode: RewriteMode,
}

impl Default for ValueRewritePolicy {
    fn default() -> Self {
        Self {
            gate: RewriteGate::Truthy,
            mode: RewriteMode::Unanchored,
        }
    }
}

impl ValueRewritePolicy {
    pub fn applies_to(&self, value: &[u8]) -> bool {
        match self.gate {
            RewriteGate::Truthy => !value.is_empty() && value != b"0",
            RewriteGate::NonNull => true,
        }
    }
}

/// Snapshot of everything that shapes a dump
///
/// Built once through [`ExportConfigBuilder`]; nothing changes while a dump runs.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    filter: TableFilter,
    old_prefix: String,
    new_prefix: String,
    no_table_data: bool,
    add_drop_table: bool,
    extended_insert: bool,
    table_clauses: BTreeMap<String, String>,
    max_statement_size: usize,
    value_rewrite: ValueRewritePolicy,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfigBuilder::default().build()
    }
}

impl ExportConfig {
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder::default()
    }

    pub fn filter(&self) -> &TableFilter {
        &self.filter
    }

    pub fn old_prefix(&self) -> &str {
        &self.old_prefix
    }

    pub fn new_prefix(&self) -> &str {
        &self.new_prefix
    }

    pub fn no_table_data(&self) -> bool {
        self.no_table_data
    }

    pub fn add_drop_table(&self) -> bool {
        self.add_drop_table
    }

    pub fn extended_insert(&self) -> bool {
        self.extended_insert
    }

    /// Extra SQL appended to a table's row query, if one is configured
    pub fn table_clause(&self, table: &str) -> Option<&str> {
        self.table_clauses.get(table).map(String::as_str)
    }

    pub fn max_statement_size(&self) -> usize {
        self.max_statement_size
    }

    pub fn value_rewrite(&self) -> ValueRewritePolicy {
        self.value_rewrite
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfigBuilder {
    include_tables: BTreeSet<String>,
    exclude_tables: BTreeSet<String>,
    old_prefix: String,
    new_prefix: String,
    no_table_data: bool,
    add_drop_table: bool,
    extended_insert: bool,
    table_clauses: BTreeMap<String, String>,
    max_statement_size: usize,
    value_rewrite: ValueRewritePolicy,
}

impl Default for ExportConfigBuilder {
    fn default() -> Self {
        Self {
            include_tables: BTreeSet::new(),
            exclude_tables: BTreeSet::new(),
            old_prefix: String::new(),
            new_prefix: String::new(),
            no_table_data: false,
            add_drop_table: false,
            extended_insert: true,
            table_clauses: BTreeMap::new(),
            max_statement_size: MAX_LINE_SIZE,
            value_rewrite: ValueRewritePolicy::default(),
        }
    }
}

impl ExportConfigBuilder {
    pub fn include_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_tables.extend(tables.into_iter().map(Into::into));
        self
    }

    pub fn exclude_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tables.extend(tables.into_iter().map(Into::into));
        self
    }

    pub fn prefixes(mut self, old_prefix: impl Into<String>, new_prefix: impl Into<String>) -> Self {
        self.old_prefix = old_prefix.into();
        self.new_prefix = new_prefix.into();
        self
    }

    pub fn no_table_data(mut self, flag: bool) -> Self {
        self.no_table_data = flag;
        self
    }

    pub fn add_drop_table(mut self, flag: bool) -> Self {
        self.add_drop_table = flag;
        self
    }

    pub fn extended_insert(mut self, flag: bool) -> Self {
        self.extended_insert = flag;
        self
    }

    pub fn table_clause(mut self, table: impl Into<String>, clause: impl Into<String>) -> Self {
        self.table_clauses.insert(table.into(), clause.into());
        self
    }

    pub fn max_statement_size(mut self, bytes: usize) -> Self {
        self.max_statement_size = bytes;
        self
    }

    pub fn value_rewrite(mut self, policy: ValueRewritePolicy) -> Self {
        self.value_rewrite = policy;
        self
    }

    pub fn build(self) -> ExportConfig {
        ExportConfig {
            filter: TableFilter::new(self.include_tables, self.exclude_tables),
            old_prefix: self.old_prefix,
            new_prefix: self.new_prefix,
            no_table_data: self.no_table_data,
            add_drop_table: self.add_drop_table,
            extended_insert: self.extended_insert,
            table_clauses: self.table_clauses,
            max_statement_size: self.max_statement_size,
            value_rewrite: self.value_rewrite,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DumpConfigFile {
    #[serde(default)]
    include_tables: Vec<String>,
    #[serde(default)]
    exclude_tables: Vec<String>,
    #[serde(default)]
    old_prefix: String,
    #[serde(default)]
    new_prefix: String,
    #[serde(default)]
    no_table_data: bool,
    #[serde(default)]
    add_drop_table: bool,
    extended_insert: Option<bool>,
    max_statement_size: Option<usize>,
    value_rewrite_gate: Option<RewriteGate>,
    value_rewrite_mode: Option<ModeConfig>,
    #[serde(default)]
    table_clauses: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ModeConfig {
    Anchored,
    Unanchored,
}

impl From<ModeConfig> for RewriteMode {
    fn from(mode: ModeConfig) -> Self {
        match mode {
            ModeConfig::Anchored => RewriteMode::Anchored,
            ModeConfig::Unanchored => RewriteMode::Unanchored,
        }
    }
}

/// Parse a TOML dump configuration into a builder
///
/// Returning the builder lets command-line flags be layered on top before
/// the configuration is frozen.
pub fn parse_export_config(raw: &str) -> Result<ExportConfigBuilder> {
    let parsed: DumpConfigFile = toml::from_str(raw).context("Failed to parse TOML config")?;

    if parsed.max_statement_size == Some(0) {
        bail!("max_statement_size must be greater than zero");
    }

    let defaults = ValueRewritePolicy::default();
    let policy = ValueRewritePolicy {
        gate: parsed.value_rewrite_gate.unwrap_or(defaults.gate),
        mode: parsed
            .value_rewrite_mode
            .map(RewriteMode::from)
            .unwrap_or(defaults.mode),
    };

    let mut builder = ExportConfig::builder()
        .include_tables(parsed.include_tables)
        .exclude_tables(parsed.exclude_tables)
        .prefixes(parsed.old_prefix, parsed.new_prefix)
        .no_table_data(parsed.no_table_data)
        .add_drop_table(parsed.add_drop_table)
        .extended_insert(parsed.extended_insert.unwrap_or(true))
        .max_statement_size(parsed.max_statement_size.unwrap_or(MAX_LINE_SIZE))
        .value_rewrite(policy);

    for (table, clause) in parsed.table_clauses {
        builder = builder.table_clause(table, clause);
    }

    Ok(builder)
}

pub fn load_export_config(path: &str) -> Result<ExportConfigBuilder> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path))?;
    parse_export_config(&raw).with_context(|| format!("Invalid dump config at {}", path))
}
