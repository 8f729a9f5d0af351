//! # db-etl
//!
//! Configuration-driven transfer of a query result from one relational
//! database into a table of another.
//!
//! A run goes through four stages, each finished before the next starts:
//!
//! - **Extract** the rows of a read query from the source
//! - **Map** column names (rename, reorder, positional)
//! - **Provision** the target table (create if missing, empty if asked)
//! - **Load** the rows in batches, committing each batch
//!
//! SQLite, MySQL/MariaDB and PostgreSQL are supported on either side.
//!
//! ## Example
//!
//! ```rust,no_run
//! use db_etl::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> db_etl::Result<()> {
//!     let pipeline = Pipeline::from_file("config.yaml")?;
//!     let report = pipeline.run().await;
//!     println!("Loaded {} rows in {} batches", report.rows_loaded, report.batches);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod pipeline;

// Re-exports for convenient access
pub use config::{Config, ConnectionSpec, DatabaseKind, ExtractionConfig, LoadingConfig};
pub use crate::core::{Connection, ConnectionProvider, Dialect, Row, RowSet, SqlValue, TableName};
pub use drivers::{ConnectionImpl, DialectImpl, DriverProvider};
pub use error::{DriverError, ErrorKind, EtlError, Result};
pub use orchestrator::events::{EventSink, MemorySink, PipelineEvent, Role, TracingSink};
pub use orchestrator::state::PipelineState;
pub use orchestrator::{LoadReport, Pipeline, Warning};
