//! Batched loading into the target table.

use tracing::debug;

use crate::core::identifier::TableName;
use crate::core::traits::Connection;
use crate::core::value::RowSet;
use crate::error::{EtlError, Result};
use crate::orchestrator::events::{EventSink, PipelineEvent};

/// Number of batches needed for `rows` rows.
pub fn batches_expected(rows: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    rows.div_ceil(batch_size)
}

/// Totals of a completed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    pub rows_loaded: u64,
    pub batches: usize,
}

/// Insert `rows` in consecutive batches of at most `batch_size` rows.
///
/// Each batch is committed before the next one starts. When batch k fails,
/// batches 1..k-1 stay committed and the returned [`EtlError::Load`] says
/// how far the load got.
pub async fn load<C>(
    conn: &mut C,
    table: &TableName,
    rows: &RowSet,
    batch_size: usize,
    sink: &dyn EventSink,
) -> Result<LoadOutcome>
where
    C: Connection + ?Sized,
{
    if batch_size == 0 {
        return Err(EtlError::config("loading.batch_size must be at least 1"));
    }

    let expected = batches_expected(rows.len(), batch_size);
    let mut outcome = LoadOutcome::default();

    for (idx, chunk) in rows.rows.chunks(batch_size).enumerate() {
        let batch = idx + 1;
        debug!("Inserting batch {}/{} ({} rows)", batch, expected, chunk.len());

        let inserted = conn
            .insert_batch(table, &rows.columns, chunk)
            .await
            .map_err(|source| EtlError::Load {
                table: table.to_string(),
                batch,
                batches_expected: expected,
                batches_committed: outcome.batches,
                rows_committed: outcome.rows_loaded,
                source,
            })?;

        // Engines may report affected rows differently; trust the batch length
        if inserted != chunk.len() as u64 {
            debug!(
                "Batch {} reported {} affected rows for {} rows",
                batch,
                inserted,
                chunk.len()
            );
        }

        outcome.batches = batch;
        outcome.rows_loaded += chunk.len() as u64;
        sink.emit(&PipelineEvent::BatchCommitted {
            batch,
            batches_expected: expected,
            rows: chunk.len() as u64,
            rows_loaded: outcome.rows_loaded,
        });
    }

    Ok(outcome)
}
