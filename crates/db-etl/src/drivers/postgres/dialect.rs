//! PostgreSQL SQL dialect.

use crate::core::traits::Dialect;

/// The wire protocol encodes the parameter count as an Int16.
const POSTGRES_MAX_PARAMS: usize = 65_535;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn max_bind_params(&self) -> usize {
        POSTGRES_MAX_PARAMS
    }
}
