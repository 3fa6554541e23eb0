use spendwatch_domain::{AnomalyResult, TransactionRecord};
use tracing::debug;

use super::{DetectorSettings, FittedEnsemble, IsolationForest};
use crate::{store::validate_amount, CancelToken, CoreError, ExpenseStore, MIN_HISTORY_RECORDS};

/// Flags structurally unusual amounts against the full store history.
///
/// Every call reads a fresh snapshot and retrains; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct AnomalyDetector<S> {
    store: S,
    forest: IsolationForest,
}

impl<S: ExpenseStore> AnomalyDetector<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, DetectorSettings::default())
    }

    pub fn with_settings(store: S, settings: DetectorSettings) -> Self {
        Self {
            store,
            forest: IsolationForest::new(settings),
        }
    }

    pub fn settings(&self) -> &DetectorSettings {
        self.forest.settings()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Anomalous records only, most anomalous first.
    pub fn detect_anomalies(&self) -> Result<Vec<AnomalyResult>, CoreError> {
        self.detect_anomalies_with_cancel(&CancelToken::new())
    }

    pub fn detect_anomalies_with_cancel(
        &self,
        token: &CancelToken,
    ) -> Result<Vec<AnomalyResult>, CoreError> {
        let anomalies: Vec<AnomalyResult> = self
            .score_all_with_cancel(token)?
            .into_iter()
            .filter(|result| result.is_anomaly)
            .collect();
        debug!(count = anomalies.len(), "anomaly detection finished");
        Ok(anomalies)
    }

    /// Every record with its result, ordered by ascending `anomaly_score`.
    pub fn score_all(&self) -> Result<Vec<AnomalyResult>, CoreError> {
        self.score_all_with_cancel(&CancelToken::new())
    }

    pub fn score_all_with_cancel(
        &self,
        token: &CancelToken,
    ) -> Result<Vec<AnomalyResult>, CoreError> {
        let records = self.load_history()?;
        let ensemble = self.train(&records, token)?;

        let mut results: Vec<AnomalyResult> = records
            .into_iter()
            .map(|record| {
                let score = ensemble.score(record.amount());
                AnomalyResult {
                    is_anomaly: score > ensemble.threshold(),
                    anomaly_score: -score,
                    record,
                }
            })
            .collect();
        // Stable sort keeps store order among equal scores.
        results.sort_by(|a, b| a.anomaly_score.total_cmp(&b.anomaly_score));
        Ok(results)
    }

    /// Classifies a hypothetical amount against an ensemble trained on the current
    /// history. The amount is not added to the store.
    pub fn is_amount_anomalous(&self, amount: f64) -> Result<bool, CoreError> {
        validate_amount(amount)?;
        let records = self.load_history()?;
        let ensemble = self.train(&records, &CancelToken::new())?;
        Ok(ensemble.is_anomalous(amount))
    }

    /// Trains on the current history and hands back the ensemble for repeated scoring.
    pub fn fit(&self) -> Result<FittedEnsemble, CoreError> {
        let records = self.load_history()?;
        self.train(&records, &CancelToken::new())
    }

    fn load_history(&self) -> Result<Vec<TransactionRecord>, CoreError> {
        let records = self.store.get_all_expenses()?;
        if records.len() < MIN_HISTORY_RECORDS {
            return Err(CoreError::InsufficientData {
                required: MIN_HISTORY_RECORDS,
                found: records.len(),
            });
        }
        Ok(records)
    }

    fn train(
        &self,
        records: &[TransactionRecord],
        token: &CancelToken,
    ) -> Result<FittedEnsemble, CoreError> {
        let amounts: Vec<f64> = records.iter().map(TransactionRecord::amount).collect();
        self.forest.fit_with_cancel(&amounts, token)
    }
}
