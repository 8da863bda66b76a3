// ABOUTME: Table enumeration and whole-database truncation
// ABOUTME: Lists tables in database order using the dialect's listing query

use crate::connection::{Connection, RowCursor};
use crate::mysql::dialect::SqlDialect;
use anyhow::{Context, Result};
use mysql_async::Value;

/// List every table of `database`, in the order the server returns them
pub async fn list_tables<C, D>(conn: &mut C, dialect: &D, database: &str) -> Result<Vec<String>>
where
    C: Connection,
    D: SqlDialect,
{
    tracing::debug!("Listing tables of database '{}'", database);

    let sql = dialect.list_tables(database);
    let mut rows = conn
        .query(&sql)
        .await
        .with_context(|| format!("Failed to list tables of database '{}'", database))?;

    let mut tables = Vec::new();
    while let Some(row) = rows.next_row().await? {
        if let Some(Value::Bytes(name)) = row.into_iter().next() {
            tables.push(String::from_utf8_lossy(&name).into_owned());
        }
    }
    rows.close().await?;

    tracing::debug!("Found {} table(s) in '{}'", tables.len(), database);

    Ok(tables)
}

/// Drop every table of `database`, returning how many drops were issued
///
/// All names are read before the first drop so the listing cursor is closed
/// when the drops run.
pub async fn truncate_database<C, D>(conn: &mut C, dialect: &D, database: &str) -> Result<usize>
where
    C: Connection,
    D: SqlDialect,
{
    let tables = list_tables(conn, dialect, database).await?;

    tracing::info!(
        "Dropping {} table(s) from database '{}'",
        tables.len(),
        database
    );

    for table in &tables {
        conn.exec(&dialect.drop_table(table)).await.with_context(|| {
            format!(
                "Failed to drop table '{}'",
                crate::utils::sanitize_identifier(table)
            )
        })?;
    }

    Ok(tables.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::memory::{MemoryConnection, Resultset};
    use crate::mysql::dialect::MysqlDialect;

    fn listing() -> MemoryConnection {
        MemoryConnection::default().with_result(
            &MysqlDialect.list_tables("shop"),
            Resultset::new(
                &["table_name"],
                vec![
                    vec![Value::Bytes(b"orders".to_vec())],
                    vec![Value::Bytes(b"customers".to_vec())],
                ],
            ),
        )
    }

    #[tokio::test]
    async fn test_list_tables_keeps_server_order() {
        let mut conn = listing();
        let tables = list_tables(&mut conn, &MysqlDialect, "shop").await.unwrap();

        assert_eq!(tables, vec!["orders".to_string(), "customers".to_string()]);
        assert_eq!(conn.open_cursors, 0);
    }

    #[tokio::test]
    async fn test_list_tables_propagates_query_errors() {
        let mut conn = MemoryConnection::default();
        let err = list_tables(&mut conn, &MysqlDialect, "shop")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to list tables"));
    }

    #[tokio::test]
    async fn test_truncate_drops_every_table() {
        let mut conn = listing();
        let dropped = truncate_database(&mut conn, &MysqlDialect, "shop")
            .await
            .unwrap();

        assert_eq!(dropped, 2);
        assert_eq!(
            conn.executed,
            vec![
                "DROP TABLE `orders`".to_string(),
                "DROP TABLE `customers`".to_string()
            ]
        );
    }
}
