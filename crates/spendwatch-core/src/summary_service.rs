use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use spendwatch_domain::{aggregate_daily, Category, TransactionRecord};

use crate::{CoreError, ExpenseStore};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: f64,
    /// Fraction of all spending, in `[0, 1]`.
    pub share: f64,
}

/// Dashboard metrics over the whole history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingSummary {
    pub total_spent: f64,
    /// Mean of the daily totals over days with at least one record.
    pub average_daily: f64,
    pub transaction_count: usize,
    pub top_category: Option<Category>,
    /// Largest first.
    pub by_category: Vec<CategoryTotal>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl SpendingSummary {
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        let total_spent: f64 = records.iter().map(TransactionRecord::amount).sum();
        let daily = aggregate_daily(records);
        let average_daily = if daily.is_empty() {
            0.0
        } else {
            daily.iter().map(|day| day.total_amount).sum::<f64>() / daily.len() as f64
        };

        let mut totals: BTreeMap<Category, f64> = BTreeMap::new();
        for record in records {
            *totals.entry(record.category()).or_default() += record.amount();
        }
        let mut by_category: Vec<CategoryTotal> = totals
            .into_iter()
            .map(|(category, total)| CategoryTotal {
                category,
                total,
                share: if total_spent > 0.0 {
                    total / total_spent
                } else {
                    0.0
                },
            })
            .collect();
        // Stable: equal totals keep category order.
        by_category.sort_by(|a, b| b.total.total_cmp(&a.total));

        Self {
            total_spent,
            average_daily,
            transaction_count: records.len(),
            top_category: by_category.first().map(|entry| entry.category),
            by_category,
            first_date: daily.first().map(|day| day.date),
            last_date: daily.last().map(|day| day.date),
        }
    }
}

/// Predicted spend measured against a budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub predicted: f64,
    pub budget_limit: f64,
    /// `budget_limit - predicted`; negative when over budget.
    pub difference: f64,
}

impl BudgetStatus {
    pub fn new(predicted: f64, budget_limit: f64) -> Self {
        Self {
            predicted,
            budget_limit,
            difference: budget_limit - predicted,
        }
    }

    pub fn within_budget(&self) -> bool {
        self.difference >= 0.0
    }

    /// Share of the budget left unspent, in percent; zero when over budget.
    pub fn savings_rate(&self) -> f64 {
        if self.within_budget() && self.budget_limit > 0.0 {
            self.difference / self.budget_limit * 100.0
        } else {
            0.0
        }
    }
}

pub struct SummaryService<S> {
    store: S,
}

impl<S: ExpenseStore> SummaryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn summarize(&self) -> Result<SpendingSummary, CoreError> {
        let records = self.store.get_all_expenses()?;
        Ok(SpendingSummary::from_records(&records))
    }

    /// Up to `limit` records, latest date first; same-day records newest insertion first.
    pub fn recent(&self, limit: usize) -> Result<Vec<TransactionRecord>, CoreError> {
        let mut records = self.store.get_all_expenses()?;
        records.reverse();
        records.sort_by(|a, b| b.date().cmp(&a.date()));
        records.truncate(limit);
        Ok(records)
    }
}
