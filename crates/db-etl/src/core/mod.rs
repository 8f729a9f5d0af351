//! Core abstractions shared by the drivers and the pipeline.
//!
//! - [`value`]: SQL value and row representation
//! - [`identifier`]: identifier validation, quoting and table names
//! - [`traits`]: connection, provider and dialect traits

pub mod identifier;
pub mod traits;
pub mod value;

pub use identifier::TableName;
pub use traits::{Connection, ConnectionProvider, Dialect};
pub use value::{Row, RowSet, SqlValue};
