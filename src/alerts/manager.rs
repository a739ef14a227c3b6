//! Batch run over all active alert definitions

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use super::definition::{AlertDefinition, MeterOutcome, NotificationOutcome};
use super::notifier::Mailer;
use crate::calc::EvalContext;
use crate::error::AlertError;
use crate::period::PeriodResolver;
use crate::storage::AlertStore;

/// Manager settings
#[derive(Debug, Clone, Copy)]
pub struct ManagerConfig {
    /// Length of the LAST_CHECK window when no run marker exists yet
    pub first_run_lookback: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            first_run_lookback: Duration::hours(24),
        }
    }
}

/// Counters of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub definitions_loaded: usize,
    pub definitions_rejected: usize,
    pub definitions_failed: usize,
    pub meters_evaluated: usize,
    pub meters_without_data: usize,
    pub alerts_saved: usize,
    pub alerts_already_recorded: usize,
    pub notifications_sent: usize,
    pub notifications_skipped: usize,
    pub notifications_failed: usize,
}

impl RunReport {
    pub(crate) fn record(&mut self, outcome: MeterOutcome) {
        self.meters_evaluated += 1;
        match outcome {
            MeterOutcome::NoData => self.meters_without_data += 1,
            MeterOutcome::NoAlert => {}
            MeterOutcome::AlreadyRecorded => self.alerts_already_recorded += 1,
            MeterOutcome::AlertSaved(notification) => {
                self.alerts_saved += 1;
                match notification {
                    NotificationOutcome::Sent => self.notifications_sent += 1,
                    NotificationOutcome::Skipped => self.notifications_skipped += 1,
                    NotificationOutcome::Failed => self.notifications_failed += 1,
                }
            }
        }
    }
}

/// Loads active definitions, runs them and records the run marker
///
/// The run marker and notification tables are read then appended without any
/// concurrency check, so only one manager may run against a store at a time.
pub struct AlertManager {
    store: Arc<dyn AlertStore>,
    mailer: Arc<dyn Mailer>,
    config: ManagerConfig,
}

impl AlertManager {
    pub fn new(store: Arc<dyn AlertStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            config: ManagerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    /// Anchors of a run at `now`: the last run marker, or the first-run
    /// lookback when there is none.
    pub fn period_resolver(&self, now: NaiveDateTime) -> Result<PeriodResolver, AlertError> {
        let last_check = match self.store.fetch_last_run_marker()? {
            Some(marker) if marker > now => {
                tracing::warn!(marker = %marker, now = %now, "Last run marker is in the future, using an empty window");
                now
            }
            Some(marker) => marker,
            None => now
                .checked_sub_signed(self.config.first_run_lookback)
                .ok_or_else(|| AlertError::config("first_run_lookback", "out of calendar range"))?,
        };
        Ok(PeriodResolver::new(now, last_check))
    }

    /// Validate active definitions; rejected ones are logged and counted
    pub fn load_definitions(&self, report: &mut RunReport) -> Result<Vec<AlertDefinition>, AlertError> {
        let configs = self.store.fetch_active_definitions()?;
        report.definitions_loaded = configs.len();

        let mut definitions = Vec::with_capacity(configs.len());
        for config in &configs {
            match AlertDefinition::from_config(config) {
                Ok(definition) => definitions.push(definition),
                Err(e) => {
                    tracing::warn!(
                        definition_id = config.id,
                        error_kind = e.kind(),
                        error = %e,
                        "Alert definition rejected"
                    );
                    report.definitions_rejected += 1;
                }
            }
        }
        Ok(definitions)
    }

    /// Run every active definition, then append the run marker `now`.
    ///
    /// A storage failure aborts the run before the marker is written, so the
    /// next run re-covers the same window.
    pub async fn run(&self, now: NaiveDateTime) -> Result<RunReport, AlertError> {
        let mut report = RunReport::default();
        let ctx = EvalContext::new(self.store.as_ref(), self.period_resolver(now)?);

        tracing::info!(now = %now, last_check = %ctx.periods.last_check(), "Alert run starting");

        for mut definition in self.load_definitions(&mut report)? {
            self.execute(&mut definition, &ctx, &mut report).await?;
        }

        self.store.append_run_marker(now)?;

        tracing::info!(
            definitions = report.definitions_loaded,
            rejected = report.definitions_rejected,
            failed = report.definitions_failed,
            meters = report.meters_evaluated,
            alerts = report.alerts_saved,
            notifications = report.notifications_sent,
            "Alert run complete"
        );
        Ok(report)
    }

    /// Run a single definition by id. No run marker is written.
    pub async fn run_definition(&self, definition_id: i64, now: NaiveDateTime) -> Result<RunReport, AlertError> {
        let mut report = RunReport::default();
        let config = self.store.fetch_definition(definition_id)?.ok_or_else(|| {
            AlertError::config("definition_id", format!("definition {} does not exist", definition_id))
        })?;
        report.definitions_loaded = 1;

        let mut definition = AlertDefinition::from_config(&config)?;
        if !definition.is_active() {
            tracing::info!(definition_id = definition_id, "Definition is not active, nothing to run");
            return Ok(report);
        }

        let ctx = EvalContext::new(self.store.as_ref(), self.period_resolver(now)?);
        self.execute(&mut definition, &ctx, &mut report).await?;
        Ok(report)
    }

    async fn execute(
        &self,
        definition: &mut AlertDefinition,
        ctx: &EvalContext<'_>,
        report: &mut RunReport,
    ) -> Result<(), AlertError> {
        match definition.execute(ctx, self.mailer.as_ref(), report).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => {
                tracing::error!(
                    definition_id = definition.id(),
                    error = %e,
                    "Alert run aborted"
                );
                Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    definition_id = definition.id(),
                    error_kind = e.kind(),
                    error = %e,
                    "Alert definition failed"
                );
                report.definitions_failed += 1;
                Ok(())
            }
        }
    }
}
