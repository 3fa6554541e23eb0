use std::sync::Arc;

use serde::Serialize;
use spendwatch_domain::{AnomalyResult, Category};
use tracing::{debug, info};

use crate::{
    store::validate_amount, AnomalyDetector, CancelToken, CoreError, ExpenseStore, Forecaster,
};

/// Outbound notification channel.
///
/// Implementations report delivery as a plain `bool` and never panic; transport
/// errors are logged and reported as `false`.
pub trait NotificationSender {
    /// Must send nothing and return `false` unless `predicted_amount > budget_limit`.
    fn send_budget_alert(&self, recipient: &str, predicted_amount: f64, budget_limit: f64)
        -> bool;

    fn send_anomaly_alert(&self, recipient: &str, amount: f64, category: Category) -> bool;
}

impl<T: NotificationSender + ?Sized> NotificationSender for &T {
    fn send_budget_alert(
        &self,
        recipient: &str,
        predicted_amount: f64,
        budget_limit: f64,
    ) -> bool {
        (**self).send_budget_alert(recipient, predicted_amount, budget_limit)
    }

    fn send_anomaly_alert(&self, recipient: &str, amount: f64, category: Category) -> bool {
        (**self).send_anomaly_alert(recipient, amount, category)
    }
}

impl<T: NotificationSender + ?Sized> NotificationSender for Arc<T> {
    fn send_budget_alert(
        &self,
        recipient: &str,
        predicted_amount: f64,
        budget_limit: f64,
    ) -> bool {
        (**self).send_budget_alert(recipient, predicted_amount, budget_limit)
    }

    fn send_anomaly_alert(&self, recipient: &str, amount: f64, category: Category) -> bool {
        (**self).send_anomaly_alert(recipient, amount, category)
    }
}

/// Outcome of comparing a spend prediction to a budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetCheck {
    pub predicted: f64,
    pub budget_limit: f64,
    pub alert_sent: bool,
}

impl BudgetCheck {
    pub fn is_over_budget(&self) -> bool {
        self.predicted > self.budget_limit
    }

    /// Amount above the limit, `None` when within budget.
    pub fn overage(&self) -> Option<f64> {
        self.is_over_budget()
            .then(|| self.predicted - self.budget_limit)
    }

    pub fn overage_percent(&self) -> Option<f64> {
        self.overage()
            .map(|overage| overage / self.budget_limit * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnomalyAlert {
    NothingToReport,
    Reported {
        anomaly: AnomalyResult,
        delivered: bool,
    },
}

/// Decides when alerts go out and hands them to a [`NotificationSender`].
#[derive(Debug, Clone)]
pub struct AlertService<N> {
    sender: N,
}

impl<N: NotificationSender> AlertService<N> {
    pub fn new(sender: N) -> Self {
        Self { sender }
    }

    pub fn sender(&self) -> &N {
        &self.sender
    }

    /// Sends a budget alert only when `predicted` exceeds `budget_limit`.
    pub fn check_budget(
        &self,
        recipient: &str,
        predicted: f64,
        budget_limit: f64,
    ) -> Result<BudgetCheck, CoreError> {
        validate_budget(budget_limit)?;
        validate_amount(predicted)?;

        let mut check = BudgetCheck {
            predicted,
            budget_limit,
            alert_sent: false,
        };
        if check.is_over_budget() {
            check.alert_sent = self
                .sender
                .send_budget_alert(recipient, predicted, budget_limit);
            if check.alert_sent {
                info!(recipient, predicted, budget_limit, "budget alert sent");
            }
        } else {
            debug!(predicted, budget_limit, "spending within budget; no alert");
        }
        Ok(check)
    }

    /// Forecasts the next thirty days and checks the total against `budget_limit`.
    pub fn check_monthly_budget<S: ExpenseStore>(
        &self,
        forecaster: &Forecaster<S>,
        recipient: &str,
        budget_limit: f64,
    ) -> Result<BudgetCheck, CoreError> {
        self.check_monthly_budget_with_cancel(
            forecaster,
            recipient,
            budget_limit,
            &CancelToken::new(),
        )
    }

    /// As [`AlertService::check_monthly_budget`]; the forecast stops early once
    /// `token` is cancelled and nothing is sent.
    pub fn check_monthly_budget_with_cancel<S: ExpenseStore>(
        &self,
        forecaster: &Forecaster<S>,
        recipient: &str,
        budget_limit: f64,
        token: &CancelToken,
    ) -> Result<BudgetCheck, CoreError> {
        validate_budget(budget_limit)?;
        let predicted = forecaster.get_monthly_prediction_with_cancel(token)?;
        self.check_budget(recipient, predicted, budget_limit)
    }

    /// Reports the single most anomalous record, if any.
    pub fn alert_top_anomaly<S: ExpenseStore>(
        &self,
        detector: &AnomalyDetector<S>,
        recipient: &str,
    ) -> Result<AnomalyAlert, CoreError> {
        let anomalies = detector.detect_anomalies()?;
        Ok(self.report_first(anomalies, recipient))
    }

    /// Reports the first entry of an already ranked anomaly list.
    pub fn report_first(&self, anomalies: Vec<AnomalyResult>, recipient: &str) -> AnomalyAlert {
        let Some(anomaly) = anomalies.into_iter().next() else {
            return AnomalyAlert::NothingToReport;
        };
        let delivered = self.sender.send_anomaly_alert(
            recipient,
            anomaly.record.amount(),
            anomaly.record.category(),
        );
        if delivered {
            info!(
                recipient,
                amount = anomaly.record.amount(),
                category = %anomaly.record.category(),
                "anomaly alert sent"
            );
        }
        AnomalyAlert::Reported { anomaly, delivered }
    }
}

fn validate_budget(budget_limit: f64) -> Result<(), CoreError> {
    if budget_limit > 0.0 && budget_limit.is_finite() {
        Ok(())
    } else {
        Err(CoreError::invalid_parameter(
            "budget_limit",
            "must be a positive amount",
        ))
    }
}
