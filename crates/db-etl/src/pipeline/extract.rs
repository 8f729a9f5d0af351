//! Extraction: runs the configured query once against the source.

use tracing::debug;

use crate::config::ExtractionConfig;
use crate::core::traits::Connection;
use crate::core::value::RowSet;
use crate::error::{EtlError, Result};

/// Run the extraction query and materialize the full result.
///
/// An empty result is not an error; the caller records it as a warning.
pub async fn extract<C>(conn: &mut C, extraction: &ExtractionConfig) -> Result<RowSet>
where
    C: Connection + ?Sized,
{
    let params = extraction.bind_params()?;
    debug!(
        "Running extraction query ({} params): {}",
        params.len(),
        extraction.query
    );

    let rows = conn
        .query(&extraction.query, &params)
        .await
        .map_err(EtlError::query)?;

    debug!("Extraction returned {} rows", rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlValue;
    use crate::pipeline::fake::FakeConnection;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_extract_returns_rows_and_binds_params() {
        let mut conn = FakeConnection::with_result(RowSet::new(
            vec!["id".into()],
            vec![vec![SqlValue::I64(1)]],
        ));
        let mut extraction = ExtractionConfig::new("SELECT id FROM t WHERE id > ?");
        extraction.params = vec![serde_json::json!(0)];

        let rows = extract(&mut conn, &extraction).await.unwrap();
        assert_eq!(rows.len(), 1);

        let state = conn.state();
        assert_eq!(state.queries, ["SELECT id FROM t WHERE id > ?"]);
        assert_eq!(state.query_params, [vec![SqlValue::I64(0)]]);
    }

    #[tokio::test]
    async fn test_extract_failure_is_query_error() {
        let mut conn = FakeConnection::failing_query();
        let err = extract(&mut conn, &ExtractionConfig::new("SELEC 1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);
    }
}
