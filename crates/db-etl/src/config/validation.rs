//! Configuration validation.
//!
//! Everything checked here fails with a configuration error before any
//! connection is opened.

use std::collections::HashSet;

use super::{Config, ConnectionSpec};
use crate::core::identifier::{validate_identifier, validate_type_declaration, TableName};
use crate::error::{EtlError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_connection("source_db", &config.source_db)?;
    validate_connection("target_db", &config.target_db)?;

    // Extraction validation
    if config.extraction.query.trim().is_empty() {
        return Err(EtlError::Config("extraction.query is required".into()));
    }
    config.extraction.bind_params()?;

    // Loading validation
    let loading = &config.loading;
    if loading.target_table.trim().is_empty() {
        return Err(EtlError::Config("loading.target_table is required".into()));
    }
    TableName::parse(&loading.target_table)?;

    if loading.batch_size == 0 {
        return Err(EtlError::Config(
            "loading.batch_size must be at least 1".into(),
        ));
    }

    if loading.create_table && loading.column_definitions.is_empty() {
        return Err(EtlError::Config(
            "loading.column_definitions is required when create_table is set".into(),
        ));
    }
    for (column, declaration) in &loading.column_definitions {
        validate_identifier(column)?;
        if declaration.trim().is_empty() {
            return Err(EtlError::Config(format!(
                "loading.column_definitions.{} has an empty type declaration",
                column
            )));
        }
        validate_type_declaration(declaration)?;
    }

    if !loading.column_mapping.is_empty() && !loading.target_columns.is_empty() {
        return Err(EtlError::Config(
            "loading.column_mapping and loading.target_columns cannot both be set".into(),
        ));
    }

    let mut targets = HashSet::new();
    for (source, target) in &loading.column_mapping {
        validate_identifier(source)?;
        validate_identifier(target)?;
        if !targets.insert(target.as_str()) {
            return Err(EtlError::Config(format!(
                "loading.column_mapping maps more than one column to '{}'",
                target
            )));
        }
    }

    let mut targets = HashSet::new();
    for target in &loading.target_columns {
        validate_identifier(target)?;
        if !targets.insert(target.as_str()) {
            return Err(EtlError::Config(format!(
                "loading.target_columns lists '{}' more than once",
                target
            )));
        }
    }

    Ok(())
}

fn validate_connection(section: &str, spec: &ConnectionSpec) -> Result<()> {
    match spec {
        ConnectionSpec::Sqlite(params) => {
            if params.database.trim().is_empty() {
                return Err(EtlError::Config(format!(
                    "{}.connection_params.database is required",
                    section
                )));
            }
        }
        ConnectionSpec::Mysql(params) | ConnectionSpec::Postgresql(params) => {
            if matches!(params.host.as_deref(), Some(host) if host.trim().is_empty()) {
                return Err(EtlError::Config(format!(
                    "{}.connection_params.host cannot be empty",
                    section
                )));
            }
            if params.port == Some(0) {
                return Err(EtlError::Config(format!(
                    "{}.connection_params.port must be between 1 and 65535",
                    section
                )));
            }
        }
    }
    Ok(())
}
