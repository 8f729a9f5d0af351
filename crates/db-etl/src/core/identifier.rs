//! Identifier validation and quoting.
//!
//! Table and column names cannot be bound as statement parameters, so every
//! identifier that ends up in generated SQL is validated here and quoted by
//! the target dialect. Escaping doubles the engine's quote character.

use crate::error::{EtlError, Result};

/// Maximum identifier length (conservative limit across engines).
/// - PostgreSQL: 63 bytes
/// - MySQL: 64 characters
/// - SQLite: no limit
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier.
///
/// Rejects empty names, names containing NUL bytes and names longer than
/// [`MAX_IDENTIFIER_LENGTH`] bytes.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EtlError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(EtlError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(EtlError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Validate a column type declaration from `column_definitions`.
///
/// Declarations are spliced into `CREATE TABLE` verbatim, so statement
/// separators and comment markers are refused.
pub fn validate_type_declaration(declaration: &str) -> Result<()> {
    if declaration.contains(';') {
        return Err(EtlError::Config(format!(
            "Column type declaration contains semicolon: {:?}",
            declaration
        )));
    }

    if declaration.contains("--") || declaration.contains("/*") || declaration.contains("*/") {
        return Err(EtlError::Config(format!(
            "Column type declaration contains SQL comment markers: {:?}",
            declaration
        )));
    }

    if declaration.contains('\0') {
        return Err(EtlError::Config(format!(
            "Column type declaration contains null byte: {:?}",
            declaration
        )));
    }

    Ok(())
}

/// A target table name, optionally qualified with a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    /// Unqualified table name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Parse `table` or `schema.table`.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split('.').map(str::trim).collect();
        let table = match parts.as_slice() {
            [name] => Self::new(*name),
            [schema, name] => Self {
                schema: Some(schema.to_string()),
                name: name.to_string(),
            },
            _ => {
                return Err(EtlError::Config(format!(
                    "Table name must be 'table' or 'schema.table': {:?}",
                    raw
                )))
            }
        };

        if let Some(schema) = &table.schema {
            validate_identifier(schema)?;
        }
        validate_identifier(&table.name)?;
        Ok(table)
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("cliente_id").is_ok());
        assert!(validate_identifier("Column With Spaces").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        assert!(validate_identifier("users\0").is_err());
    }

    #[test]
    fn test_validate_identifier_length() {
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_type_declaration() {
        assert!(validate_type_declaration("INTEGER PRIMARY KEY").is_ok());
        assert!(validate_type_declaration("VARCHAR(255) NOT NULL DEFAULT 'x'").is_ok());
        assert!(validate_type_declaration("INT CHECK (valor >= 0)").is_ok());
        assert!(validate_type_declaration("INT; DROP TABLE t").is_err());
        assert!(validate_type_declaration("INT -- hidden").is_err());
        assert!(validate_type_declaration("INT /* x */").is_err());
    }

    #[test]
    fn test_table_name_parse() {
        let plain = TableName::parse("clientes").unwrap();
        assert_eq!(plain, TableName::new("clientes"));
        assert_eq!(plain.to_string(), "clientes");

        let qualified = TableName::parse("staging.clientes").unwrap();
        assert_eq!(qualified.schema.as_deref(), Some("staging"));
        assert_eq!(qualified.name, "clientes");
        assert_eq!(qualified.to_string(), "staging.clientes");

        assert!(TableName::parse("a.b.c").is_err());
        assert!(TableName::parse(".clientes").is_err());
        assert!(TableName::parse("").is_err());
    }
}
