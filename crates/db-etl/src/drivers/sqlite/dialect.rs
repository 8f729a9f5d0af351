//! SQLite SQL dialect.

use crate::core::traits::Dialect;

/// SQLite allows at most 32766 host parameters per statement (3.32+).
const SQLITE_MAX_VARIABLES: usize = 32_766;

/// SQLite dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn max_bind_params(&self) -> usize {
        SQLITE_MAX_VARIABLES
    }
}
