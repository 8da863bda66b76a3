// ABOUTME: CLI entry point for seren-mysqldump
// ABOUTME: Parses commands and routes to dump, import and truncate handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm};
use seren_mysqldump::config::{load_export_config, ExportConfigBuilder};
use seren_mysqldump::dump::schema::truncate_database;
use seren_mysqldump::mysql::{self, dialect::MysqlDialect};
use seren_mysqldump::sink::FileSink;
use seren_mysqldump::{DumpEngine, DumpHeader, ExportConfig, Importer, PrefixRewriter, Strictness};

#[derive(Parser)]
#[command(name = "seren-mysqldump")]
#[command(about = "Dump and restore MySQL databases with table prefix rewriting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the schema and rows of a database to a SQL file
    Dump {
        #[arg(long)]
        source: String,
        #[arg(long, default_value = "dump.sql")]
        output: String,
        /// TOML file with dump settings; flags below override it
        #[arg(long)]
        config: Option<String>,
        /// Dump only these tables (comma-separated)
        #[arg(long, value_delimiter = ',')]
        include_tables: Option<Vec<String>>,
        /// Skip these tables (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude_tables: Option<Vec<String>>,
        /// Table prefix to replace
        #[arg(long, requires = "new_prefix")]
        old_prefix: Option<String>,
        /// Replacement for --old-prefix
        #[arg(long, requires = "old_prefix")]
        new_prefix: Option<String>,
        /// Dump structure only
        #[arg(long)]
        no_table_data: bool,
        /// Emit DROP TABLE IF EXISTS before each table
        #[arg(long)]
        add_drop_table: bool,
        /// One INSERT statement per row
        #[arg(long)]
        skip_extended_insert: bool,
    },
    /// Replay a SQL dump into a database
    Import {
        #[arg(long)]
        target: String,
        #[arg(long)]
        input: String,
        /// Table prefix to replace
        #[arg(long, requires = "new_prefix")]
        old_prefix: Option<String>,
        /// Replacement for --old-prefix
        #[arg(long, requires = "old_prefix")]
        new_prefix: Option<String>,
        /// Abort on the first failing statement instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Drop every table of a database
    Truncate {
        #[arg(long)]
        target: String,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            source,
            output,
            config,
            include_tables,
            exclude_tables,
            old_prefix,
            new_prefix,
            no_table_data,
            add_drop_table,
            skip_extended_insert,
        } => {
            let mut builder = match config {
                Some(path) => load_export_config(&path)?,
                None => ExportConfig::builder(),
            };
            if let Some(tables) = include_tables {
                builder = builder.include_tables(tables);
            }
            if let Some(tables) = exclude_tables {
                builder = builder.exclude_tables(tables);
            }
            if let (Some(old), Some(new)) = (old_prefix, new_prefix) {
                builder = builder.prefixes(old, new);
            }
            builder = apply_flags(builder, no_table_data, add_drop_table, skip_extended_insert);

            dump(&source, &output, builder.build()).await
        }
        Commands::Import {
            target,
            input,
            old_prefix,
            new_prefix,
            strict,
        } => {
            let rewriter = PrefixRewriter::new(
                old_prefix.as_deref().unwrap_or(""),
                new_prefix.as_deref().unwrap_or(""),
            )?;
            let strictness = if strict {
                Strictness::Strict
            } else {
                Strictness::Lenient
            };
            import(&target, &input, rewriter, strictness).await
        }
        Commands::Truncate { target, yes } => truncate(&target, yes).await,
    }
}

fn apply_flags(
    mut builder: ExportConfigBuilder,
    no_table_data: bool,
    add_drop_table: bool,
    skip_extended_insert: bool,
) -> ExportConfigBuilder {
    if no_table_data {
        builder = builder.no_table_data(true);
    }
    if add_drop_table {
        builder = builder.add_drop_table(true);
    }
    if skip_extended_insert {
        builder = builder.extended_insert(false);
    }
    builder
}

async fn dump(source: &str, output: &str, config: ExportConfig) -> Result<()> {
    let info = mysql::source_info(source)?;
    let conn = mysql::connect(source, &MysqlDialect).await?;

    let mut sink = FileSink::create(output).await?;
    let mut engine = DumpEngine::new(conn, MysqlDialect, config)?;
    let header = DumpHeader::new(info.host, info.database);

    let summary = engine.dump(&mut sink, &header).await?;
    if !summary.not_tables.is_empty() {
        tracing::info!(
            "Skipped {} non-table object(s): {}",
            summary.not_tables.len(),
            summary.not_tables.join(", ")
        );
    }
    tracing::info!("✓ Wrote {}", sink.path().display());

    engine.into_connection().disconnect().await
}

async fn import(
    target: &str,
    input: &str,
    rewriter: PrefixRewriter,
    strictness: Strictness,
) -> Result<()> {
    let conn = mysql::connect(target, &MysqlDialect).await?;
    let mut importer = Importer::new(conn, rewriter, strictness);

    let report = importer.import_file(input).await?;
    if report.failed > 0 {
        tracing::warn!(
            "⚠ {} statement(s) failed and were skipped; verify the imported data",
            report.failed
        );
    }

    importer.into_connection().disconnect().await
}

async fn truncate(target: &str, yes: bool) -> Result<()> {
    let info = mysql::source_info(target)?;

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Drop every table in database '{}' on {}?",
                info.database, info.host
            ))
            .default(false)
            .interact()
            .context("Failed to get confirmation")?;

        if !confirmed {
            tracing::warn!("⚠ User cancelled operation");
            anyhow::bail!("Truncate cancelled by user");
        }
    }

    let mut conn = mysql::connect(target, &MysqlDialect).await?;
    let dropped = truncate_database(&mut conn, &MysqlDialect, &info.database).await?;
    tracing::info!("✓ Dropped {} table(s)", dropped);

    conn.disconnect().await
}
