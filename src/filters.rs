// ABOUTME: Table include/exclude filtering for selective dumps
// ABOUTME: Exclusion always wins over inclusion; empty include list means all tables

use std::collections::BTreeSet;

/// Represents table selection rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    include_tables: BTreeSet<String>,
    exclude_tables: BTreeSet<String>,
}

impl TableFilter {
    pub fn new<I, E>(include_tables: I, exclude_tables: E) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            include_tables: include_tables.into_iter().map(Into::into).collect(),
            exclude_tables: exclude_tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an empty filter (dump everything)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Checks if any filters are active
    pub fn is_empty(&self) -> bool {
        self.include_tables.is_empty() && self.exclude_tables.is_empty()
    }

    /// Determines if a table should be dumped
    pub fn should_dump_table(&self, table_name: &str) -> bool {
        // If include list exists, table must be in it
        if !self.include_tables.is_empty() && !self.include_tables.contains(table_name) {
            return false;
        }

        !self.exclude_tables.contains(table_name)
    }

    /// Keep the tables that pass the filter, preserving order and dropping repeats
    pub fn apply(&self, tables: Vec<String>) -> Vec<String> {
        let mut seen = BTreeSet::new();
        tables
            .into_iter()
            .filter(|table| self.should_dump_table(table))
            .filter(|table| seen.insert(table.clone()))
            .collect()
    }
}
