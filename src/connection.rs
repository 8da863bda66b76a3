// ABOUTME: Connection capabilities the dump engine and importer depend on
// ABOUTME: Query cursors, statement execution and literal quoting

use anyhow::Result;
use mysql_async::Value;

/// A database connection as seen by the dump and import engines
///
/// Results are streamed: [`Connection::query`] hands back a cursor that
/// mutably borrows the connection, so a second query cannot be issued until
/// the cursor is closed or dropped. This mirrors the single in-flight result
/// set of an unbuffered connection.
#[allow(async_fn_in_trait)]
pub trait Connection {
    type Rows<'a>: RowCursor
    where
        Self: 'a;

    /// Start a query and return a cursor over its rows
    async fn query<'a>(&'a mut self, sql: &str) -> Result<Self::Rows<'a>>;

    /// Execute a statement, discarding any result set
    async fn exec(&mut self, sql: &str) -> Result<()>;

    /// Render a non-NULL value as a SQL literal
    fn quote(value: &Value) -> String;

    /// Whether a query error means the referenced table does not exist
    fn is_missing_table(_error: &anyhow::Error) -> bool {
        false
    }
}

/// Forward-only cursor over a query result
#[allow(async_fn_in_trait)]
pub trait RowCursor {
    /// Column names of the result, in order
    fn columns(&self) -> Vec<String>;

    async fn next_row(&mut self) -> Result<Option<Vec<Value>>>;

    /// Drain any remaining rows and release the connection
    async fn close(self) -> Result<()>;
}
