//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy
//! - [`PostgresConn`]: a single session over `tokio_postgres::Client`

mod connection;
mod dialect;
mod encode;

pub use connection::PostgresConn;
pub use dialect::PostgresDialect;
