// ABOUTME: Library module for seren-mysqldump
// ABOUTME: Exports the dump and import engines and their collaborators

pub mod config;
pub mod connection;
pub mod dump;
pub mod filters;
pub mod import;
pub mod mysql;
pub mod prefix;
pub mod sink;
pub mod utils;

pub use config::{ExportConfig, ExportConfigBuilder};
pub use dump::{DumpEngine, DumpHeader, DumpSummary};
pub use import::{ImportReport, Importer, Strictness};
pub use prefix::{PrefixRewriter, RewriteMode};
