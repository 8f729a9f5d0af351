//! SQLite driver.
//!
//! - [`SqliteDialect`]: SQL syntax strategy
//! - [`SqliteConn`]: a single session over sqlx's `SqliteConnection`

mod connection;
mod dialect;

pub use connection::SqliteConn;
pub use dialect::SqliteDialect;
