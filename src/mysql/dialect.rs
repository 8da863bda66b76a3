// ABOUTME: SQL template builder for the statements the dump engine issues
// ABOUTME: MySQL flavour: backtick identifiers, information_schema listing

/// Produces dialect-specific SQL text for the dump and import engines
pub trait SqlDialect {
    /// Query whose first column is the name of every table in `database`
    fn list_tables(&self, database: &str) -> String;

    /// Query returning the definition of `table` in a `Create Table` column
    fn show_create_table(&self, table: &str) -> String;

    fn drop_table(&self, table: &str) -> String;

    fn set_names(&self, charset: &str) -> String;

    fn quote_ident(&self, identifier: &str) -> String;

    /// Base row-fetch query for a table, ready for a trailing clause
    fn select_all(&self, table: &str) -> String {
        format!("SELECT * FROM {} ", self.quote_ident(table))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl SqlDialect for MysqlDialect {
    fn list_tables(&self, database: &str) -> String {
        format!(
            "SELECT TABLE_NAME AS table_name FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = {} ORDER BY TABLE_NAME",
            quote_string(database)
        )
    }

    fn show_create_table(&self, table: &str) -> String {
        format!("SHOW CREATE TABLE {}", self.quote_ident(table))
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.quote_ident(table))
    }

    fn set_names(&self, charset: &str) -> String {
        format!("SET NAMES {}", quote_string(charset))
    }

    /// Wrap an identifier in backticks, doubling embedded backticks
    ///
    /// # Examples
    ///
    /// ```
    /// # use seren_mysqldump::mysql::dialect::{MysqlDialect, SqlDialect};
    /// assert_eq!(MysqlDialect.quote_ident("wp_posts"), "`wp_posts`");
    /// assert_eq!(MysqlDialect.quote_ident("odd`name"), "`odd``name`");
    /// ```
    fn quote_ident(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }
}

fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}
