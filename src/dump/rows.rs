// ABOUTME: Row export with size-bounded extended INSERT batching
// ABOUTME: Streams rows from a cursor, rewrites prefixes in values, quotes literals

use super::DumpEngine;
use crate::config::ValueRewritePolicy;
use crate::connection::{Connection, RowCursor};
use crate::mysql::dialect::SqlDialect;
use crate::prefix::{PrefixRewriter, RewriteMode};
use crate::sink::Sink;
use anyhow::{Context, Result};
use mysql_async::Value;

const STATEMENT_TERMINATOR: &str = ";\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowsOutcome {
    /// Data export disabled for this table
    Skipped,
    Exported { rows: u64, statements: usize },
}

impl<C: Connection, D: SqlDialect> DumpEngine<C, D> {
    /// Stream the rows of `table` as INSERT statements
    ///
    /// With `no_table_data` set, only tables that have a configured clause are
    /// exported. The cursor is closed before returning so the connection is
    /// free for the next query.
    pub async fn export_rows<S: Sink>(&mut self, table: &str, sink: &mut S) -> Result<RowsOutcome> {
        let clause = self.config.table_clause(table);
        if self.config.no_table_data() && clause.is_none() {
            tracing::debug!("Skipping data of '{}'", table);
            return Ok(RowsOutcome::Skipped);
        }

        let mut sql = self.dialect.select_all(table);
        if let Some(clause) = clause {
            sql.push_str(clause);
        }

        let name = self.rewriter.rewrite(table, RewriteMode::Anchored);
        let ident = self.dialect.quote_ident(&name);
        sink.write(format!("--\n-- Dumping data for table {}\n--\n\n", ident).as_bytes())
            .await?;

        let mut batcher = InsertBatcher::new(
            &ident,
            self.config.max_statement_size(),
            self.config.extended_insert(),
        );
        let policy = self.config.value_rewrite();

        let mut rows = self
            .conn
            .query(&sql)
            .await
            .with_context(|| format!("Failed to query rows: {}", sql))?;

        let mut count = 0u64;
        while let Some(row) = rows.next_row().await? {
            let items: Vec<String> = row
                .into_iter()
                .map(|value| render_value::<C>(value, &self.rewriter, policy))
                .collect();
            batcher.push(sink, &items).await?;
            count += 1;
        }
        rows.close().await?;

        batcher.finish(sink).await?;

        Ok(RowsOutcome::Exported {
            rows: count,
            statements: batcher.statements(),
        })
    }
}

/// Render one column value as SQL, rewriting string contents first
fn render_value<C: Connection>(
    value: Value,
    rewriter: &PrefixRewriter,
    policy: ValueRewritePolicy,
) -> String {
    match value {
        Value::NULL => "NULL".to_string(),
        Value::Bytes(bytes) if policy.applies_to(&bytes) => {
            let rewritten = rewriter.rewrite_bytes(&bytes, policy.mode).into_owned();
            C::quote(&Value::Bytes(rewritten))
        }
        other => C::quote(&other),
    }
}

/// Packs rendered rows into INSERT statements no larger than `max_size`
///
/// Sizes count the statement's bytes including its `;\n` terminator. A row
/// that is too large on its own still gets a statement of its own.
struct InsertBatcher {
    prefix: String,
    max_size: usize,
    extended: bool,
    open: bool,
    size: usize,
    statements: usize,
}

impl InsertBatcher {
    fn new(table_ident: &str, max_size: usize, extended: bool) -> Self {
        Self {
            prefix: format!("INSERT INTO {} VALUES ", table_ident),
            max_size,
            extended,
            open: false,
            size: 0,
            statements: 0,
        }
    }

    fn statements(&self) -> usize {
        self.statements
    }

    async fn push<S: Sink>(&mut self, sink: &mut S, items: &[String]) -> Result<()> {
        let group = format!("({})", items.join(","));

        let appended = self.size + 1 + group.len() + STATEMENT_TERMINATOR.len();
        if self.open && self.extended && appended > self.max_size {
            self.terminate(sink).await?;
        }

        if !self.open || !self.extended {
            self.size += sink
                .write(format!("{}{}", self.prefix, group).as_bytes())
                .await?;
            self.open = true;
            self.statements += 1;
        } else {
            self.size += sink.write(format!(",{}", group).as_bytes()).await?;
        }

        if self.size + STATEMENT_TERMINATOR.len() > self.max_size || !self.extended {
            self.terminate(sink).await?;
        }

        Ok(())
    }

    async fn terminate<S: Sink>(&mut self, sink: &mut S) -> Result<()> {
        sink.write(STATEMENT_TERMINATOR.as_bytes()).await?;
        self.open = false;
        self.size = 0;
        Ok(())
    }

    async fn finish<S: Sink>(&mut self, sink: &mut S) -> Result<()> {
        if self.open {
            self.terminate(sink).await?;
        }
        Ok(())
    }
}
