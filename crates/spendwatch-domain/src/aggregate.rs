//! Daily aggregation of transaction records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::TransactionRecord;

/// Total spend recorded on one calendar date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub total_amount: f64,
}

/// Sums amounts per calendar date. Output is sorted by date and holds every
/// date that has at least one record exactly once.
pub fn aggregate_daily(records: &[TransactionRecord]) -> Vec<DailyAggregate> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        *totals.entry(record.date()).or_insert(0.0) += record.amount();
    }
    totals
        .into_iter()
        .map(|(date, total_amount)| DailyAggregate { date, total_amount })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Category;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn sums_per_date_in_order() {
        let records = vec![
            TransactionRecord::new(date(3), 10.0, Category::Food, None),
            TransactionRecord::new(date(1), 5.0, Category::Bills, None),
            TransactionRecord::new(date(3), 2.5, Category::Travel, None),
            TransactionRecord::new(date(2), 0.0, Category::Other, None),
        ];

        let daily = aggregate_daily(&records);
        assert_eq!(
            daily,
            vec![
                DailyAggregate {
                    date: date(1),
                    total_amount: 5.0
                },
                DailyAggregate {
                    date: date(2),
                    total_amount: 0.0
                },
                DailyAggregate {
                    date: date(3),
                    total_amount: 12.5
                },
            ]
        );
    }

    #[test]
    fn empty_input_yields_no_days() {
        assert!(aggregate_daily(&[]).is_empty());
    }
}
