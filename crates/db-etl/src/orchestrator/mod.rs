//! Pipeline orchestrator - runs extract, map, provision and load in order.

pub mod events;
pub mod state;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::core::identifier::TableName;
use crate::core::traits::{Connection, ConnectionProvider};
use crate::drivers::DriverProvider;
use crate::error::{ErrorKind, EtlError, Result};
use crate::pipeline::{self, ColumnMapping};

use events::{EventSink, PipelineEvent, Role, TracingSink};
use state::PipelineState;

/// A configured transfer from one database to another.
///
/// The pipeline owns both connections for the duration of [`run`](Self::run)
/// and closes them on every exit path.
pub struct Pipeline<P: ConnectionProvider = DriverProvider> {
    config: Option<Config>,
    provider: P,
    sink: Arc<dyn EventSink>,
}

/// Non-fatal conditions noticed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    /// The extraction query returned no rows.
    EmptyResult,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// Unique run identifier.
    pub run_id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Rows returned by the extraction query.
    pub rows_extracted: u64,

    /// Rows committed to the target table.
    pub rows_loaded: u64,

    /// Batches committed.
    pub batches: usize,

    /// Batches the load needed in total.
    pub batches_expected: usize,

    pub table_created: bool,
    pub table_truncated: bool,
    pub succeeded: bool,

    /// Kind of the error that ended the run.
    pub error: Option<ErrorKind>,

    /// Full error text, including the engine's message.
    pub error_message: Option<String>,

    /// `done` on success, `failed` otherwise.
    pub final_state: PipelineState,

    pub warnings: Vec<Warning>,
}

impl LoadReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at,
            completed_at: started_at,
            duration_seconds: 0.0,
            rows_extracted: 0,
            rows_loaded: 0,
            batches: 0,
            batches_expected: 0,
            table_created: false,
            table_truncated: false,
            succeeded: false,
            error: None,
            error_message: None,
            final_state: PipelineState::Init,
            warnings: Vec::new(),
        }
    }

    /// Render the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 0 on success, otherwise the exit code of the error kind.
    pub fn exit_code(&self) -> u8 {
        if self.succeeded {
            0
        } else {
            self.error.map(ErrorKind::exit_code).unwrap_or(1)
        }
    }
}

/// Walks the state machine and reports every transition.
struct Tracker<'a> {
    state: PipelineState,
    sink: &'a dyn EventSink,
}

impl<'a> Tracker<'a> {
    fn new(sink: &'a dyn EventSink) -> Self {
        Self {
            state: PipelineState::Init,
            sink,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            self.transition(next);
        }
    }

    fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.transition(PipelineState::Failed);
        }
    }

    fn transition(&mut self, to: PipelineState) {
        self.sink.emit(&PipelineEvent::StateChanged {
            from: self.state,
            to,
        });
        self.state = to;
    }
}

impl Pipeline<DriverProvider> {
    /// Pipeline for the given configuration, using the built-in drivers.
    pub fn new(config: Config) -> Self {
        Self {
            config: Some(config),
            provider: DriverProvider,
            sink: Arc::new(TracingSink),
        }
    }

    /// Pipeline without configuration; call [`set_config`](Self::set_config)
    /// before running it.
    pub fn unconfigured() -> Self {
        Self {
            config: None,
            provider: DriverProvider,
            sink: Arc::new(TracingSink),
        }
    }

    /// Load and validate a configuration file, then build a pipeline for it.
    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Self> {
        Ok(Self::new(Config::load(path)?))
    }
}

impl<P: ConnectionProvider> Pipeline<P> {
    /// Replace the configuration.
    pub fn set_config(&mut self, config: Config) {
        self.config = Some(config);
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Send events to `sink` instead of the tracing log.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Open connections through `provider`.
    pub fn with_provider<Q: ConnectionProvider>(self, provider: Q) -> Pipeline<Q> {
        Pipeline {
            config: self.config,
            provider,
            sink: self.sink,
        }
    }

    fn require_config(&self) -> Result<&Config> {
        self.config.as_ref().ok_or_else(|| {
            EtlError::config("no configuration set; call set_config before running the pipeline")
        })
    }

    /// Open both databases, run a trivial query on each, and close them again.
    pub async fn health_check(&self) -> Result<()> {
        let config = self.require_config()?;

        for (role, spec) in [
            (Role::Source, &config.source_db),
            (Role::Target, &config.target_db),
        ] {
            let mut conn = self.provider.open(spec).await?;
            let probe = conn.query("SELECT 1", &[]).await;
            release(&mut conn, role).await;
            probe.map_err(|e| EtlError::connection(spec.kind(), e))?;
            info!("{} connection OK: {}", role, spec.describe());
        }

        Ok(())
    }

    /// Run the pipeline once.
    ///
    /// Never returns an error: failures are recorded in the report together
    /// with the state the run had reached.
    pub async fn run(&self) -> LoadReport {
        let clock = Instant::now();
        let mut report = LoadReport::new(Utc::now());
        let mut tracker = Tracker::new(self.sink.as_ref());

        info!("Starting run: {}", report.run_id);

        let outcome = match self.require_config() {
            Ok(config) => self.execute(config, &mut report, &mut tracker).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                tracker.advance();
                report.succeeded = true;
            }
            Err(e) => {
                error!("{}", e.format_detailed());
                if let EtlError::Load {
                    batches_committed,
                    rows_committed,
                    ..
                } = &e
                {
                    report.batches = *batches_committed;
                    report.rows_loaded = *rows_committed;
                }
                self.sink.emit(&PipelineEvent::Failed {
                    state: tracker.state,
                    kind: e.kind(),
                    message: e.to_string(),
                });
                tracker.fail();
                report.error = Some(e.kind());
                report.error_message = Some(e.to_string());
            }
        }

        report.final_state = tracker.state;
        report.completed_at = Utc::now();
        report.duration_seconds = clock.elapsed().as_secs_f64();

        self.sink.emit(&PipelineEvent::Finished {
            succeeded: report.succeeded,
            rows_loaded: report.rows_loaded,
            batches: report.batches,
            duration_seconds: report.duration_seconds,
        });

        report
    }

    /// Validate, connect, transfer, and release both connections.
    async fn execute(
        &self,
        config: &Config,
        report: &mut LoadReport,
        tracker: &mut Tracker<'_>,
    ) -> Result<()> {
        config.validate()?;
        let table = TableName::parse(&config.loading.target_table)?;
        let mapping = ColumnMapping::from_config(&config.loading);

        let mut source = self.provider.open(&config.source_db).await?;
        let mut target = match self.provider.open(&config.target_db).await {
            Ok(conn) => conn,
            Err(e) => {
                release(&mut source, Role::Source).await;
                return Err(e);
            }
        };

        tracker.advance();
        for (role, spec) in [
            (Role::Source, &config.source_db),
            (Role::Target, &config.target_db),
        ] {
            self.sink.emit(&PipelineEvent::Connected {
                role,
                engine: spec.kind(),
                location: spec.describe(),
            });
        }

        let result = self
            .transfer(
                config,
                &table,
                &mapping,
                &mut source,
                &mut target,
                report,
                tracker,
            )
            .await;

        release(&mut source, Role::Source).await;
        release(&mut target, Role::Target).await;

        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn transfer(
        &self,
        config: &Config,
        table: &TableName,
        mapping: &ColumnMapping,
        source: &mut P::Conn,
        target: &mut P::Conn,
        report: &mut LoadReport,
        tracker: &mut Tracker<'_>,
    ) -> Result<()> {
        let sink = self.sink.as_ref();
        let loading = &config.loading;

        let extracted = pipeline::extract(source, &config.extraction).await?;
        report.rows_extracted = extracted.len() as u64;
        sink.emit(&PipelineEvent::Extracted {
            rows: report.rows_extracted,
            columns: extracted.columns.clone(),
        });
        if extracted.is_empty() {
            report.warnings.push(Warning::EmptyResult);
            sink.emit(&PipelineEvent::EmptyResult);
        }
        tracker.advance();

        let mapped = mapping.apply(extracted)?;
        pipeline::check_against_definitions(&mapped.columns, &loading.column_definitions)?;
        sink.emit(&PipelineEvent::Mapped {
            columns: mapped.columns.clone(),
        });
        tracker.advance();

        let provisioned = pipeline::provision(target, table, loading, sink).await?;
        report.table_created = provisioned.created;
        report.table_truncated = provisioned.truncated;
        tracker.advance();

        report.batches_expected = pipeline::batches_expected(mapped.len(), loading.batch_size);
        let loaded = pipeline::load(target, table, &mapped, loading.batch_size, sink).await?;
        report.rows_loaded = loaded.rows_loaded;
        report.batches = loaded.batches;
        tracker.advance();

        Ok(())
    }
}

/// Close a connection, logging instead of failing.
async fn release<C: Connection + ?Sized>(conn: &mut C, role: Role) {
    match conn.close().await {
        Ok(()) => debug!("Closed {} connection", role),
        Err(e) => warn!("Failed to close {} connection: {}", role, e),
    }
}
