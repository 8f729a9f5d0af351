//! Pipeline stages.
//!
//! Each stage is a free function over a [`Connection`](crate::Connection),
//! called in order by the [`Pipeline`](crate::Pipeline):
//!
//! 1. [`extract`]: run the read query once
//! 2. [`ColumnMapping::apply`]: rename and reorder columns
//! 3. [`provision`]: create and/or empty the target table
//! 4. [`load`]: insert in committed batches

mod extract;
mod loader;
mod mapping;
mod provision;

#[cfg(test)]
pub(crate) mod fake;

pub use extract::extract;
pub use loader::{batches_expected, load, LoadOutcome};
pub use mapping::{check_against_definitions, ColumnMapping};
pub use provision::{provision, ProvisionOutcome};
