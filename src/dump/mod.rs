// ABOUTME: Dump engine that writes a database's schema and rows as SQL text
// ABOUTME: Drives enumeration, structure export and batched row export per table

pub mod rows;
pub mod schema;
pub mod structure;

pub use rows::RowsOutcome;
pub use structure::StructureOutcome;

use crate::config::ExportConfig;
use crate::connection::Connection;
use crate::mysql::dialect::SqlDialect;
use crate::prefix::PrefixRewriter;
use crate::sink::Sink;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local};

pub const DEFAULT_PRODUCT: &str = "All In One WP Migration SQL Dump";
pub const DEFAULT_PRODUCT_URL: &str = "http://servmask.com/";

/// Comment block at the top of every dump
#[derive(Debug, Clone)]
pub struct DumpHeader {
    pub product: String,
    pub product_url: String,
    pub host: String,
    pub database: String,
    pub generated_at: DateTime<FixedOffset>,
}

impl DumpHeader {
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            product: DEFAULT_PRODUCT.to_string(),
            product_url: DEFAULT_PRODUCT_URL.to_string(),
            host: host.into(),
            database: database.into(),
            generated_at: Local::now().into(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "-- {}\n-- {}\n--\n-- Host: {}\n-- Generation Time: {}\n\n--\n-- Database: `{}`\n--\n\n",
            self.product,
            self.product_url,
            self.host,
            self.generated_at.format("%a, %d %b %Y %H:%M:%S %z"),
            self.database
        )
    }
}

/// Totals for a finished dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub tables: usize,
    pub rows: u64,
    pub statements: usize,
    /// Names that were listed but had no table definition (views, dropped tables)
    pub not_tables: Vec<String>,
}

/// Exports tables through injected connection, dialect and sink collaborators
pub struct DumpEngine<C, D> {
    conn: C,
    dialect: D,
    config: ExportConfig,
    rewriter: PrefixRewriter,
}

impl<C: Connection, D: SqlDialect> DumpEngine<C, D> {
    pub fn new(conn: C, dialect: D, config: ExportConfig) -> Result<Self> {
        let rewriter = PrefixRewriter::new(config.old_prefix(), config.new_prefix())
            .context("Invalid table prefix")?;

        Ok(Self {
            conn,
            dialect,
            config,
            rewriter,
        })
    }

    pub fn into_connection(self) -> C {
        self.conn
    }

    /// Tables of `database` that pass the include/exclude filter, in database order
    pub async fn tables_to_export(&mut self, database: &str) -> Result<Vec<String>> {
        let all = schema::list_tables(&mut self.conn, &self.dialect, database).await?;
        Ok(self.config.filter().apply(all))
    }

    /// Write a complete dump of `header.database` to `sink`
    pub async fn dump<S: Sink>(&mut self, sink: &mut S, header: &DumpHeader) -> Result<DumpSummary> {
        tracing::info!("Dumping database '{}'", header.database);

        sink.write(header.render().as_bytes()).await?;

        let tables = self.tables_to_export(&header.database).await?;
        tracing::info!("Exporting {} table(s)", tables.len());

        let mut summary = DumpSummary::default();
        for table in &tables {
            let name = crate::utils::sanitize_identifier(table);

            match self.export_structure(table, sink).await? {
                StructureOutcome::Exported => {}
                StructureOutcome::NotATable => {
                    tracing::warn!("Skipping '{}': no table definition found", name);
                    summary.not_tables.push(table.clone());
                    continue;
                }
            }
            summary.tables += 1;

            match self
                .export_rows(table, sink)
                .await
                .with_context(|| format!("Failed to export rows of table '{}'", name))?
            {
                RowsOutcome::Skipped => {
                    tracing::info!("  ✓ {} (structure only)", name);
                }
                RowsOutcome::Exported { rows, statements } => {
                    tracing::info!("  ✓ {} ({} rows, {} statements)", name, rows, statements);
                    summary.rows += rows;
                    summary.statements += statements;
                }
            }
        }

        sink.finish().await?;

        tracing::info!(
            "✓ Dump complete: {} tables, {} rows",
            summary.tables,
            summary.rows
        );

        Ok(summary)
    }
}
