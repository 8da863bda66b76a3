// ABOUTME: Table structure export: section header, optional drop, CREATE statement
// ABOUTME: Reports tables without a definition so their rows are not exported

use super::DumpEngine;
use crate::connection::{Connection, RowCursor};
use crate::mysql::dialect::SqlDialect;
use crate::prefix::RewriteMode;
use crate::sink::Sink;
use anyhow::Result;
use mysql_async::Value;

/// Column of `SHOW CREATE TABLE` that carries the definition
const CREATE_TABLE_COLUMN: &str = "Create Table";

const SECTION_SEPARATOR: &str = "-- --------------------------------------------------------\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureOutcome {
    Exported,
    /// No table definition was found (a view, or a table dropped mid-dump)
    NotATable,
}

impl<C: Connection, D: SqlDialect> DumpEngine<C, D> {
    /// Emit the definition of `table`, with prefixes rewritten
    ///
    /// The table name is rewritten only at its start; the definition body is
    /// rewritten everywhere so foreign keys and constraint names follow.
    pub async fn export_structure<S: Sink>(
        &mut self,
        table: &str,
        sink: &mut S,
    ) -> Result<StructureOutcome> {
        let Some(definition) = self.fetch_definition(table).await? else {
            return Ok(StructureOutcome::NotATable);
        };

        let name = self.rewriter.rewrite(table, RewriteMode::Anchored);
        let ident = self.dialect.quote_ident(&name);

        let mut out = String::with_capacity(definition.len() + 256);
        out.push_str(SECTION_SEPARATOR);
        out.push_str(&format!("--\n-- Table structure for table {}\n--\n\n", ident));
        if self.config.add_drop_table() {
            out.push_str(&format!("DROP TABLE IF EXISTS {};\n\n", ident));
        }
        out.push_str(&self.rewriter.rewrite(&definition, RewriteMode::Unanchored));
        out.push_str(";\n\n");

        sink.write(out.as_bytes()).await?;

        tracing::debug!("Wrote structure of '{}' as {}", table, ident);

        Ok(StructureOutcome::Exported)
    }

    async fn fetch_definition(&mut self, table: &str) -> Result<Option<String>> {
        let sql = self.dialect.show_create_table(table);
        let mut rows = match self.conn.query(&sql).await {
            Ok(rows) => rows,
            Err(e) if C::is_missing_table(&e) => {
                tracing::debug!("Table '{}' no longer exists: {:#}", table, e);
                return Ok(None);
            }
            Err(e) => {
                return Err(e.context(format!(
                    "Failed to read structure of table '{}'",
                    crate::utils::sanitize_identifier(table)
                )))
            }
        };

        let column = rows
            .columns()
            .iter()
            .position(|name| name == CREATE_TABLE_COLUMN);

        let mut definition = None;
        while let Some(row) = rows.next_row().await? {
            if definition.is_some() {
                continue;
            }
            if let Some(Value::Bytes(text)) = column.and_then(|index| row.into_iter().nth(index)) {
                definition = Some(String::from_utf8_lossy(&text).into_owned());
            }
        }
        rows.close().await?;

        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;
    use crate::connection::memory::{MemoryConnection, Resultset};
    use crate::mysql::dialect::MysqlDialect;

    const DEFINITION: &str = "CREATE TABLE `wp_comments` (\n  `post_id` int,\n  CONSTRAINT `wp_fk` FOREIGN KEY (`post_id`) REFERENCES `wp_posts` (`id`)\n)";

    fn engine(config: ExportConfig) -> DumpEngine<MemoryConnection, MysqlDialect> {
        let conn = MemoryConnection::default().with_result(
            "SHOW CREATE TABLE `WP_comments`",
            Resultset::new(
                &["Table", "Create Table"],
                vec![vec![
                    Value::Bytes(b"WP_comments".to_vec()),
                    Value::Bytes(DEFINITION.as_bytes().to_vec()),
                ]],
            ),
        );
        DumpEngine::new(conn, MysqlDialect, config).unwrap()
    }

    #[tokio::test]
    async fn test_structure_with_drop_table() {
        let config = ExportConfig::builder()
            .prefixes("wp_", "live_")
            .add_drop_table(true)
            .build();
        let mut engine = engine(config);
        let mut sink: Vec<u8> = Vec::new();

        let outcome = engine
            .export_structure("WP_comments", &mut sink)
            .await
            .unwrap();

        assert_eq!(outcome, StructureOutcome::Exported);
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "-- --------------------------------------------------------\n\n\
             --\n-- Table structure for table `live_comments`\n--\n\n\
             DROP TABLE IF EXISTS `live_comments`;\n\n\
             CREATE TABLE `live_comments` (\n  `post_id` int,\n  CONSTRAINT `live_fk` FOREIGN KEY (`post_id`) REFERENCES `live_posts` (`id`)\n);\n\n"
        );
    }

    #[tokio::test]
    async fn test_structure_without_drop_table() {
        let mut engine = engine(ExportConfig::default());
        let mut sink: Vec<u8> = Vec::new();

        engine
            .export_structure("WP_comments", &mut sink)
            .await
            .unwrap();

        let text = String::from_utf8(sink).unwrap();
        assert!(!text.contains("DROP TABLE"));
        assert!(text.contains("Table structure for table `WP_comments`"));
        assert!(text.ends_with(&format!("{};\n\n", DEFINITION)));
    }

    #[tokio::test]
    async fn test_view_is_not_a_table() {
        let conn = MemoryConnection::default().with_result(
            "SHOW CREATE TABLE `recent_posts`",
            Resultset::new(
                &["View", "Create View"],
                vec![vec![
                    Value::Bytes(b"recent_posts".to_vec()),
                    Value::Bytes(b"CREATE VIEW `recent_posts` AS SELECT 1".to_vec()),
                ]],
            ),
        );
        let mut engine = DumpEngine::new(conn, MysqlDialect, ExportConfig::default()).unwrap();
        let mut sink: Vec<u8> = Vec::new();

        let outcome = engine
            .export_structure("recent_posts", &mut sink)
            .await
            .unwrap();

        assert_eq!(outcome, StructureOutcome::NotATable);
        assert!(sink.is_empty());
        assert_eq!(engine.into_connection().open_cursors, 0);
    }

    #[tokio::test]
    async fn test_vanished_table_is_not_a_table() {
        let mut conn = MemoryConnection::default();
        conn.missing.push("SHOW CREATE TABLE `gone`".to_string());
        let mut engine = DumpEngine::new(conn, MysqlDialect, ExportConfig::default()).unwrap();
        let mut sink: Vec<u8> = Vec::new();

        let outcome = engine.export_structure("gone", &mut sink).await.unwrap();
        assert_eq!(outcome, StructureOutcome::NotATable);
    }

    #[tokio::test]
    async fn test_other_query_errors_propagate() {
        let mut engine =
            DumpEngine::new(MemoryConnection::default(), MysqlDialect, ExportConfig::default())
                .unwrap();
        let mut sink: Vec<u8> = Vec::new();

        let err = engine
            .export_structure("posts", &mut sink)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read structure of table 'posts'"));
    }
}
