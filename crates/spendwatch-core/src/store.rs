use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use spendwatch_domain::{is_valid_amount, Category, TransactionRecord};

use crate::CoreError;

/// Source of transaction history for the analytics services.
///
/// `get_all_expenses` must return a stable order within one call; each call is a
/// consistent snapshot the caller owns.
pub trait ExpenseStore: Send + Sync {
    fn get_all_expenses(&self) -> Result<Vec<TransactionRecord>, CoreError>;

    fn add_expense(
        &self,
        date: NaiveDate,
        amount: f64,
        category: Category,
        description: Option<&str>,
    ) -> Result<TransactionRecord, CoreError>;

    /// Bulk insert. Backends that can write once should override this.
    fn import_records(&self, records: &[TransactionRecord]) -> Result<usize, CoreError> {
        for record in records {
            self.add_expense(
                record.date(),
                record.amount(),
                record.category(),
                record.description(),
            )?;
        }
        Ok(records.len())
    }
}

impl<T: ExpenseStore + ?Sized> ExpenseStore for &T {
    fn get_all_expenses(&self) -> Result<Vec<TransactionRecord>, CoreError> {
        (**self).get_all_expenses()
    }

    fn add_expense(
        &self,
        date: NaiveDate,
        amount: f64,
        category: Category,
        description: Option<&str>,
    ) -> Result<TransactionRecord, CoreError> {
        (**self).add_expense(date, amount, category, description)
    }

    fn import_records(&self, records: &[TransactionRecord]) -> Result<usize, CoreError> {
        (**self).import_records(records)
    }
}

impl<T: ExpenseStore + ?Sized> ExpenseStore for Arc<T> {
    fn get_all_expenses(&self) -> Result<Vec<TransactionRecord>, CoreError> {
        (**self).get_all_expenses()
    }

    fn add_expense(
        &self,
        date: NaiveDate,
        amount: f64,
        category: Category,
        description: Option<&str>,
    ) -> Result<TransactionRecord, CoreError> {
        (**self).add_expense(date, amount, category, description)
    }

    fn import_records(&self, records: &[TransactionRecord]) -> Result<usize, CoreError> {
        (**self).import_records(records)
    }
}

/// Rejects amounts that are negative or not finite.
pub fn validate_amount(amount: f64) -> Result<(), CoreError> {
    if is_valid_amount(amount) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "amount must be a finite, non-negative number (got {amount})"
        )))
    }
}

/// Validates input and builds a fresh record with a new identifier.
pub fn build_record(
    date: NaiveDate,
    amount: f64,
    category: Category,
    description: Option<&str>,
) -> Result<TransactionRecord, CoreError> {
    validate_amount(amount)?;
    Ok(TransactionRecord::new(
        date,
        amount,
        category,
        description.map(str::to_string),
    ))
}

/// Process-local store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryExpenseStore {
    records: RwLock<Vec<TransactionRecord>>,
}

impl InMemoryExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<TransactionRecord>) -> Result<Self, CoreError> {
        for record in &records {
            validate_amount(record.amount())?;
        }
        Ok(Self {
            records: RwLock::new(records),
        })
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExpenseStore for InMemoryExpenseStore {
    fn get_all_expenses(&self) -> Result<Vec<TransactionRecord>, CoreError> {
        self.records
            .read()
            .map(|records| records.clone())
            .map_err(|_| CoreError::Storage("expense store lock poisoned".into()))
    }

    fn add_expense(
        &self,
        date: NaiveDate,
        amount: f64,
        category: Category,
        description: Option<&str>,
    ) -> Result<TransactionRecord, CoreError> {
        let record = build_record(date, amount, category, description)?;
        self.records
            .write()
            .map_err(|_| CoreError::Storage("expense store lock poisoned".into()))?
            .push(record.clone());
        Ok(record)
    }
}
