//! Transaction records supplied by the expense store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::Category;

/// A single spending entry. Fields are read-only once the record is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    id: Uuid,
    date: NaiveDate,
    amount: f64,
    category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl TransactionRecord {
    pub fn new(
        date: NaiveDate,
        amount: f64,
        category: Category,
        description: Option<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), date, amount, category, description)
    }

    /// Builds a record with a caller-chosen identifier. Blank descriptions are dropped.
    pub fn with_id(
        id: Uuid,
        date: NaiveDate,
        amount: f64,
        category: Category,
        description: Option<String>,
    ) -> Self {
        let description = description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Self {
            id,
            date,
            amount,
            category,
            description,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Amounts must be finite and non-negative to feed the detector and forecaster.
pub fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn blank_descriptions_are_dropped() {
        let record = TransactionRecord::new(
            date(2025, 3, 1),
            120.0,
            Category::Food,
            Some("   ".into()),
        );
        assert!(record.description().is_none());

        let record = TransactionRecord::new(
            date(2025, 3, 1),
            120.0,
            Category::Food,
            Some(" lunch ".into()),
        );
        assert_eq!(record.description(), Some("lunch"));
    }

    #[test]
    fn serializes_without_empty_description() {
        let record = TransactionRecord::new(date(2025, 3, 2), 45.5, Category::Travel, None);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("description"));

        let parsed: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn amount_validation() {
        assert!(is_valid_amount(0.0));
        assert!(is_valid_amount(1250.75));
        assert!(!is_valid_amount(-0.01));
        assert!(!is_valid_amount(f64::NAN));
        assert!(!is_valid_amount(f64::INFINITY));
    }
}
