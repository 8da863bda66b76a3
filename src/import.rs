// ABOUTME: Replays a SQL dump statement by statement against a connection
// ABOUTME: Line-based statement assembly with prefix rewriting and configurable strictness

use crate::connection::Connection;
use crate::prefix::{PrefixRewriter, RewriteMode};
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// What to do when a replayed statement fails
///
/// `Lenient` drops the failing statement and keeps going. A dump that is only
/// partly compatible with the target server still loads as far as it can,
/// but a lenient import can silently lose data: callers that need a faithful
/// copy should use `Strict` or verify row counts afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    #[default]
    Lenient,
    Strict,
}

/// Totals for a finished import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub executed: usize,
    pub failed: usize,
    /// Bytes of trailing text that never reached a statement delimiter
    pub residual_bytes: usize,
}

/// Whether `line` finishes a statement: a `;` followed only by whitespace
///
/// # Examples
///
/// ```
/// # use seren_mysqldump::import::ends_statement;
/// assert!(ends_statement("INSERT INTO `t` VALUES (1);\n"));
/// assert!(ends_statement("DROP TABLE `t`;  \r\n"));
/// assert!(!ends_statement("CREATE TABLE `t` (\n"));
/// assert!(!ends_statement("-- a; comment; then text\n"));
/// ```
pub fn ends_statement(line: &str) -> bool {
    line.trim_end_matches(|c: char| c.is_ascii_whitespace() || c == '\x0b')
        .ends_with(';')
}

pub struct Importer<C> {
    conn: C,
    rewriter: PrefixRewriter,
    strictness: Strictness,
}

impl<C: Connection> Importer<C> {
    pub fn new(conn: C, rewriter: PrefixRewriter, strictness: Strictness) -> Self {
        Self {
            conn,
            rewriter,
            strictness,
        }
    }

    pub fn into_connection(self) -> C {
        self.conn
    }

    pub async fn import_file(&mut self, path: impl AsRef<Path>) -> Result<ImportReport> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open dump file {}", path.display()))?;

        tracing::info!("Importing {}", path.display());

        self.import(BufReader::new(file))
            .await
            .with_context(|| format!("Failed to import {}", path.display()))
    }

    /// Replay every delimited statement read from `reader`
    ///
    /// Each line is prefix-rewritten and appended to the statement being
    /// assembled; a line ending in `;` submits it.
    pub async fn import<R: AsyncBufRead + Unpin>(&mut self, mut reader: R) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut statement = String::new();
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .await
                .context("Failed to read dump input")?;
            if read == 0 {
                break;
            }

            let text = String::from_utf8_lossy(&line);
            let text = self.rewriter.rewrite(&text, RewriteMode::Unanchored);
            statement.push_str(&text);

            if !ends_statement(&text) {
                continue;
            }

            let number = report.executed + report.failed + 1;
            match self.conn.exec(&statement).await {
                Ok(()) => report.executed += 1,
                Err(e) => match self.strictness {
                    Strictness::Strict => {
                        return Err(e.context(format!("Statement {} failed", number)));
                    }
                    Strictness::Lenient => {
                        tracing::warn!("Skipping statement {}: {:#}", number, e);
                        report.failed += 1;
                    }
                },
            }
            statement.clear();
        }

        if !statement.trim().is_empty() {
            report.residual_bytes = statement.len();
            tracing::warn!(
                "Dump ended with {} bytes that were not terminated by ';'",
                report.residual_bytes
            );
        }

        tracing::info!(
            "✓ Import complete: {} statements executed, {} failed",
            report.executed,
            report.failed
        );

        Ok(report)
    }
}
