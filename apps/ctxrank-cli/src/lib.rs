//! Command-line front end: concurrent file ingestion and the interactive shell.

pub mod ingest;
pub mod shell;
