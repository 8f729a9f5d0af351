//! Column mapping: renames and reorders extracted columns.
//!
//! A mapping is a pure projection. Values are never converted and row
//! order is kept.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::config::LoadingConfig;
use crate::core::value::{Row, RowSet, SqlValue};
use crate::error::{EtlError, Result};

/// How extracted column names become target column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMapping {
    /// Names pass through unchanged.
    Identity,

    /// Source name to target name. Mapped columns come first, in declaration
    /// order, followed by the unmapped columns in extraction order.
    Rename(IndexMap<String, String>),

    /// One target name per extracted column, by position.
    Positional(Vec<String>),
}

impl ColumnMapping {
    /// Mapping described by the loading section.
    pub fn from_config(loading: &LoadingConfig) -> Self {
        if !loading.target_columns.is_empty() {
            ColumnMapping::Positional(loading.target_columns.clone())
        } else if !loading.column_mapping.is_empty() {
            ColumnMapping::Rename(loading.column_mapping.clone())
        } else {
            ColumnMapping::Identity
        }
    }

    /// Apply the mapping to an extraction result.
    ///
    /// Fails with a configuration error when the mapping refers to a column
    /// the extraction did not return, or when a rename or positional list
    /// makes two output columns share a name. Without a mapping the result
    /// passes through as extracted.
    pub fn apply(&self, rows: RowSet) -> Result<RowSet> {
        let RowSet { columns, rows } = rows;

        let (names, order) = match self {
            ColumnMapping::Identity => return Ok(RowSet::new(columns, rows)),
            ColumnMapping::Positional(targets) => {
                if targets.len() != columns.len() {
                    return Err(EtlError::Config(format!(
                        "loading.target_columns has {} names but the extraction returned {} columns ({})",
                        targets.len(),
                        columns.len(),
                        columns.join(", ")
                    )));
                }
                (targets.clone(), None)
            }
            ColumnMapping::Rename(renames) => {
                let (names, order) = rename_plan(&columns, renames)?;
                (names, Some(order))
            }
        };

        ensure_unique(&names)?;

        let rows = match order {
            Some(order) if !is_identity(&order) => rows
                .into_iter()
                .map(|row| reorder(row, &order))
                .collect(),
            _ => rows,
        };

        Ok(RowSet::new(names, rows))
    }
}

/// Output names and, for each output position, the source position.
fn rename_plan(
    columns: &[String],
    renames: &IndexMap<String, String>,
) -> Result<(Vec<String>, Vec<usize>)> {
    let mut names = Vec::with_capacity(columns.len());
    let mut order = Vec::with_capacity(columns.len());

    for (source, target) in renames {
        let position = columns.iter().position(|c| c == source).ok_or_else(|| {
            EtlError::Config(format!(
                "loading.column_mapping references column '{}' which the extraction query does not return (columns: {})",
                source,
                columns.join(", ")
            ))
        })?;
        names.push(target.clone());
        order.push(position);
    }

    for (position, column) in columns.iter().enumerate() {
        if !renames.contains_key(column) {
            names.push(column.clone());
            order.push(position);
        }
    }

    Ok((names, order))
}

fn ensure_unique(names: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(EtlError::Config(format!(
                "column '{}' appears more than once after mapping",
                name
            )));
        }
    }
    Ok(())
}

fn is_identity(order: &[usize]) -> bool {
    order.iter().enumerate().all(|(i, &p)| i == p)
}

fn reorder(row: Row, order: &[usize]) -> Row {
    let mut slots: Vec<Option<SqlValue<'static>>> = row.into_iter().map(Some).collect();
    order
        .iter()
        .map(|&p| {
            slots
                .get_mut(p)
                .and_then(Option::take)
                .unwrap_or(SqlValue::Null)
        })
        .collect()
}

/// Check mapped column names against `column_definitions`.
///
/// Every loaded column needs a definition when definitions are given, so the
/// created table and the insert statement cannot drift apart.
pub fn check_against_definitions(
    columns: &[String],
    definitions: &IndexMap<String, String>,
) -> Result<()> {
    if definitions.is_empty() {
        return Ok(());
    }

    let missing: Vec<&str> = columns
        .iter()
        .filter(|c| !definitions.contains_key(c.as_str()))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EtlError::Config(format!(
            "loaded columns missing from loading.column_definitions: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RowSet {
        RowSet::new(
            vec!["id".into(), "nome".into(), "idade".into()],
            vec![
                vec![SqlValue::I64(1), "Ana".into(), SqlValue::I64(31)],
                vec![SqlValue::I64(2), "Bruno".into(), SqlValue::Null],
            ],
        )
    }

    fn renames(pairs: &[(&str, &str)]) -> ColumnMapping {
        ColumnMapping::Rename(
            pairs
                .iter()
                .map(|(s, t)| (s.to_string(), t.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_identity_is_unchanged() {
        assert_eq!(ColumnMapping::Identity.apply(sample()).unwrap(), sample());
    }

    #[test]
    fn test_identity_passes_repeated_names_through() {
        let rows = RowSet::new(
            vec!["id".into(), "id".into()],
            vec![vec![SqlValue::I64(1), SqlValue::I64(2)]],
        );
        let mapped = ColumnMapping::Identity.apply(rows.clone()).unwrap();
        assert_eq!(mapped, rows);
    }

    #[test]
    fn test_empty_rename_is_unchanged() {
        assert_eq!(renames(&[]).apply(sample()).unwrap(), sample());
    }

    #[test]
    fn test_rename_keeps_values() {
        let mapped = renames(&[("id", "cliente_id")]).apply(sample()).unwrap();
        assert_eq!(mapped.columns, ["cliente_id", "nome", "idade"]);
        assert_eq!(mapped.rows, sample().rows);
    }

    #[test]
    fn test_mapped_columns_come_first_in_declaration_order() {
        let mapped = renames(&[("idade", "age"), ("nome", "name")])
            .apply(sample())
            .unwrap();
        assert_eq!(mapped.columns, ["age", "name", "id"]);
        assert_eq!(
            mapped.rows[0],
            vec![SqlValue::I64(31), "Ana".into(), SqlValue::I64(1)]
        );
        assert_eq!(
            mapped.rows[1],
            vec![SqlValue::Null, "Bruno".into(), SqlValue::I64(2)]
        );
    }

    #[test]
    fn test_bijective_rename_round_trips_names() {
        let forward = renames(&[("id", "a"), ("nome", "b"), ("idade", "c")]);
        let back = renames(&[("a", "id"), ("b", "nome"), ("c", "idade")]);
        let result = back.apply(forward.apply(sample()).unwrap()).unwrap();
        assert_eq!(result, sample());
    }

    #[test]
    fn test_unknown_source_column_is_config_error() {
        let err = renames(&[("email", "mail")]).apply(sample()).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn test_rename_onto_existing_column_is_config_error() {
        let err = renames(&[("id", "nome")]).apply(sample()).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_positional_names() {
        let mapping = ColumnMapping::Positional(vec!["a".into(), "b".into(), "c".into()]);
        let mapped = mapping.apply(sample()).unwrap();
        assert_eq!(mapped.columns, ["a", "b", "c"]);
        assert_eq!(mapped.rows, sample().rows);

        let short = ColumnMapping::Positional(vec!["a".into()]);
        assert!(short.apply(sample()).is_err());
    }

    #[test]
    fn test_mapping_empty_result_keeps_columns() {
        let empty = RowSet::new(vec!["id".into(), "nome".into()], Vec::new());
        let mapped = renames(&[("nome", "name")]).apply(empty).unwrap();
        assert_eq!(mapped.columns, ["name", "id"]);
        assert!(mapped.is_empty());
    }

    #[test]
    fn test_from_config() {
        let mut loading = LoadingConfig::new("t");
        assert_eq!(ColumnMapping::from_config(&loading), ColumnMapping::Identity);

        loading.column_mapping.insert("id".into(), "cliente_id".into());
        assert!(matches!(
            ColumnMapping::from_config(&loading),
            ColumnMapping::Rename(_)
        ));
    }

    #[test]
    fn test_check_against_definitions() {
        let columns = vec!["cliente_id".to_string(), "nome".to_string()];
        let mut defs = IndexMap::new();
        assert!(check_against_definitions(&columns, &defs).is_ok());

        defs.insert("cliente_id".to_string(), "INTEGER".to_string());
        let err = check_against_definitions(&columns, &defs).unwrap_err();
        assert!(err.to_string().contains("nome"));

        defs.insert("nome".to_string(), "TEXT".to_string());
        defs.insert("extra".to_string(), "TEXT".to_string());
        assert!(check_against_definitions(&columns, &defs).is_ok());
    }
}
