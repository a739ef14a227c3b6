//! A validated alert definition and its per-meter evaluation loop

use super::config::DefinitionConfig;
use super::gate::NotificationGate;
use super::manager::RunReport;
use super::notifier::{AlertSummary, EmailMessage, Mailer};
use crate::calc::{AlertEvaluator, Comparator, DataResolver, EvalContext, Evaluation, HourWindow, Operator, ValueSpec};
use crate::data::{DefinitionStatus, Level};
use crate::error::AlertError;
use crate::period::PeriodSpec;
use crate::storage::StorageError;

/// What happened to one target meter during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterOutcome {
    NoData,
    NoAlert,
    /// An alert row for this (definition, meter, run) already exists
    AlreadyRecorded,
    AlertSaved(NotificationOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Gate closed or no recipient
    Skipped,
    Sent,
    Failed,
}

/// One monitoring rule, ready to run
#[derive(Debug)]
pub struct AlertDefinition {
    id: i64,
    name: String,
    description: String,
    category: String,
    level: Level,
    status: DefinitionStatus,
    meter_ids: Vec<i64>,
    evaluator: AlertEvaluator,
    gate: NotificationGate,
}

impl AlertDefinition {
    /// Validate raw configuration. Any enum or config error rejects the
    /// whole definition.
    pub fn from_config(config: &DefinitionConfig) -> Result<Self, AlertError> {
        let calc = &config.calculator;

        let level = Level::from_code(config.level)?;
        let status = DefinitionStatus::from_code(config.status)?;
        let operator = calc.operator.parse::<Operator>()?;
        let comparator = calc.comparator.parse::<Comparator>()?;
        let period = PeriodSpec::from_parts(
            &calc.data_period_type,
            calc.data_period_unit.as_deref(),
            calc.data_period_quantity,
        )?;
        let hours = HourWindow::from_parts(calc.hour_start, calc.hour_end)?;
        let value = ValueSpec::from_parts(&calc.value_type, calc.value_number, calc.value_period_type.as_deref())?;
        let tolerance = calc.acceptable_diff.then_some(calc.value_number);

        let data = DataResolver::new(operator, period).with_hours(hours);
        let evaluator = AlertEvaluator::new(data, value, comparator, tolerance)?;
        let gate = NotificationGate::from_config(&config.notification)?;

        let mut meter_ids = Vec::with_capacity(config.meter_ids.len());
        for id in &config.meter_ids {
            if !meter_ids.contains(id) {
                meter_ids.push(*id);
            }
        }
        if meter_ids.is_empty() {
            tracing::warn!(definition_id = config.id, "Alert definition has no target meters");
        }

        Ok(Self {
            id: config.id,
            name: config.name.clone(),
            description: config.description.clone(),
            category: config.category.clone(),
            level,
            status,
            meter_ids,
            evaluator,
            gate,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn status(&self) -> DefinitionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn meter_ids(&self) -> &[i64] {
        &self.meter_ids
    }

    pub fn evaluator(&self) -> &AlertEvaluator {
        &self.evaluator
    }

    pub fn gate(&self) -> &NotificationGate {
        &self.gate
    }

    /// Evaluate every target meter, saving alerts and sending notifications.
    ///
    /// Meters without data are skipped. Other non-fatal errors stop this
    /// definition; storage errors are returned for the caller to abort the run.
    pub async fn execute(
        &mut self,
        ctx: &EvalContext<'_>,
        mailer: &dyn Mailer,
        report: &mut RunReport,
    ) -> Result<(), AlertError> {
        for meter_id in self.meter_ids.clone() {
            let outcome = self.check_meter(ctx, mailer, meter_id).await?;
            report.record(outcome);
        }
        Ok(())
    }

    async fn check_meter(
        &mut self,
        ctx: &EvalContext<'_>,
        mailer: &dyn Mailer,
        meter_id: i64,
    ) -> Result<MeterOutcome, AlertError> {
        let evaluation = match self.evaluator.evaluate(ctx, meter_id) {
            Ok(evaluation) => evaluation,
            Err(AlertError::NoDataFound(reason)) => {
                tracing::debug!(
                    definition_id = self.id,
                    meter_id = meter_id,
                    reason = %reason,
                    "No data to evaluate, skipping meter"
                );
                return Ok(MeterOutcome::NoData);
            }
            Err(e) => return Err(e),
        };

        if !evaluation.is_alert {
            tracing::debug!(
                definition_id = self.id,
                meter_id = meter_id,
                data = evaluation.data,
                value = evaluation.value,
                "No alert"
            );
            return Ok(MeterOutcome::NoAlert);
        }

        let now = ctx.periods.now();
        match ctx
            .store
            .append_alert(self.id, meter_id, evaluation.data, evaluation.value, now)
        {
            Ok(alert_id) => {
                tracing::info!(
                    definition_id = self.id,
                    meter_id = meter_id,
                    alert_id = alert_id,
                    data = evaluation.data,
                    value = evaluation.value,
                    "Alert saved"
                );
            }
            Err(StorageError::Duplicate { .. }) => {
                tracing::warn!(
                    definition_id = self.id,
                    meter_id = meter_id,
                    "Alert already recorded for this run, skipping"
                );
                return Ok(MeterOutcome::AlreadyRecorded);
            }
            Err(e) => return Err(e.into()),
        }

        let notification = self.notify(ctx, mailer, meter_id, evaluation).await?;
        Ok(MeterOutcome::AlertSaved(notification))
    }

    async fn notify(
        &self,
        ctx: &EvalContext<'_>,
        mailer: &dyn Mailer,
        meter_id: i64,
        evaluation: Evaluation,
    ) -> Result<NotificationOutcome, AlertError> {
        let now = ctx.periods.now();

        if self.gate.email().is_empty() {
            tracing::debug!(definition_id = self.id, "No recipient, notification skipped");
            return Ok(NotificationOutcome::Skipped);
        }

        if !self.gate.is_allowed(ctx.store, self.id, now)? {
            tracing::debug!(
                definition_id = self.id,
                policy_id = self.gate.policy_id(),
                "Notification throttled"
            );
            return Ok(NotificationOutcome::Skipped);
        }

        let meter_name = ctx
            .store
            .fetch_meter(meter_id)?
            .map(|m| m.name)
            .unwrap_or_else(|| meter_id.to_string());
        let summary = AlertSummary {
            definition_name: &self.name,
            level: self.level.as_str(),
            meter_name: &meter_name,
            comparator: self.evaluator.comparator().symbol(),
            evaluation,
            timestamp: now,
        };
        let message = EmailMessage::for_alert(self.gate.email(), &summary);

        if !mailer.send(&message).await {
            tracing::warn!(
                definition_id = self.id,
                meter_id = meter_id,
                to = %message.to,
                "Notification delivery failed"
            );
            return Ok(NotificationOutcome::Failed);
        }

        ctx.store
            .append_notification_record(self.id, self.gate.policy_id(), now)?;
        tracing::info!(
            definition_id = self.id,
            meter_id = meter_id,
            to = %message.to,
            "Notification sent"
        );
        Ok(NotificationOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::config::{CalculatorConfig, NotificationConfig};

    fn config(calculator: CalculatorConfig) -> DefinitionConfig {
        DefinitionConfig::new(1, "peak", calculator).with_meters([3, 1, 3])
    }

    #[test]
    fn test_from_config() {
        let definition = AlertDefinition::from_config(
            &config(CalculatorConfig::literal("MAX", "SUP", 10.0).with_go_back("DAY", 2).with_hours(20, 8))
                .with_level(1),
        )
        .unwrap();

        assert_eq!(definition.meter_ids(), &[3, 1]);
        assert_eq!(definition.level(), Level::High);
        assert!(definition.is_active());
        assert_eq!(
            definition.evaluator().data_resolver().period_spec(),
            PeriodSpec::GoBack {
                unit: crate::period::PeriodUnit::Day,
                quantity: 2
            }
        );
        assert!(definition.evaluator().data_resolver().hours().is_some());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let kind = |calculator: CalculatorConfig| {
            AlertDefinition::from_config(&config(calculator)).unwrap_err().kind()
        };

        assert_eq!(kind(CalculatorConfig::literal("MEDIAN", "SUP", 1.0)), "enum");
        assert_eq!(kind(CalculatorConfig::literal("MAX", "GREATER", 1.0)), "enum");
        assert_eq!(kind(CalculatorConfig::literal("MAX", "SUP", 1.0).with_go_back("DECADE", 1)), "enum");
        assert_eq!(kind(CalculatorConfig::literal("MAX", "SUP", 1.0).with_go_back("DAY", 0)), "config");
        assert_eq!(kind(CalculatorConfig::literal("MAX", "SUP", 1.0).with_hours(20, 24)), "config");

        let mut tolerance = CalculatorConfig::literal("MAX", "SUP", 10.0);
        tolerance.acceptable_diff = true;
        assert_eq!(kind(tolerance), "config");

        let bad_policy = config(CalculatorConfig::literal("MAX", "SUP", 1.0)).with_notification(NotificationConfig {
            period_unit: "YEAR".to_string(),
            ..NotificationConfig::default()
        });
        assert_eq!(AlertDefinition::from_config(&bad_policy).unwrap_err().kind(), "enum");

        let bad_level = config(CalculatorConfig::literal("MAX", "SUP", 1.0)).with_level(7);
        assert_eq!(AlertDefinition::from_config(&bad_level).unwrap_err().kind(), "enum");
    }
}
