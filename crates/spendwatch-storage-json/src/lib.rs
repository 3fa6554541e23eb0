//! spendwatch-storage-json
//!
//! Single-file JSON persistence for expense records.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use spendwatch_core::{
    store::{build_record, validate_amount},
    CoreError, ExpenseStore,
};
use spendwatch_domain::{Category, TransactionRecord};
use tracing::debug;

pub const EXPENSE_FILE_SCHEMA_VERSION: u32 = 1;
const TMP_SUFFIX: &str = "tmp";

/// On-disk layout of the expense file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseFile {
    pub schema_version: u32,
    pub records: Vec<TransactionRecord>,
}

/// Expense store backed by one JSON file.
///
/// Every read goes to disk, so separate processes see each other's writes.
/// Writes inside one process are serialised and replace the file atomically.
#[derive(Debug)]
pub struct JsonExpenseStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonExpenseStore {
    /// Opens `path`, creating its parent directory. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            path,
            write_lock: Mutex::new(()),
        };
        // Surface a corrupt file at open rather than at first analysis.
        store.read_file()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, CoreError> {
        self.write_lock
            .lock()
            .map_err(|_| CoreError::Storage("expense file lock poisoned".into()))
    }

    fn read_file(&self) -> Result<ExpenseFile, CoreError> {
        if !self.path.exists() {
            return Ok(ExpenseFile {
                schema_version: EXPENSE_FILE_SCHEMA_VERSION,
                records: Vec::new(),
            });
        }
        let data = fs::read_to_string(&self.path)?;
        let file: ExpenseFile =
            serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))?;
        if file.schema_version != EXPENSE_FILE_SCHEMA_VERSION {
            return Err(CoreError::Storage(format!(
                "unsupported expense file schema version {} in {}",
                file.schema_version,
                self.path.display()
            )));
        }
        for record in &file.records {
            validate_amount(record.amount())?;
        }
        Ok(file)
    }

    fn write_file(&self, file: &ExpenseFile) -> Result<(), CoreError> {
        let json =
            serde_json::to_string_pretty(file).map_err(|err| CoreError::Serde(err.to_string()))?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(
            path = %self.path.display(),
            records = file.records.len(),
            "expense file written"
        );
        Ok(())
    }
}

impl ExpenseStore for JsonExpenseStore {
    fn get_all_expenses(&self) -> Result<Vec<TransactionRecord>, CoreError> {
        Ok(self.read_file()?.records)
    }

    fn add_expense(
        &self,
        date: NaiveDate,
        amount: f64,
        category: Category,
        description: Option<&str>,
    ) -> Result<TransactionRecord, CoreError> {
        let record = build_record(date, amount, category, description)?;
        let _guard = self.lock()?;
        let mut file = self.read_file()?;
        file.records.push(record.clone());
        self.write_file(&file)?;
        Ok(record)
    }

    /// Validates every record first, then writes once.
    fn import_records(&self, records: &[TransactionRecord]) -> Result<usize, CoreError> {
        for record in records {
            validate_amount(record.amount())?;
        }
        let _guard = self.lock()?;
        let mut file = self.read_file()?;
        file.records.extend(records.iter().cloned());
        self.write_file(&file)?;
        Ok(records.len())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
