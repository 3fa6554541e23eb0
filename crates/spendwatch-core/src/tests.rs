use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{Days, NaiveDate};
use spendwatch_domain::{Category, TransactionRecord};

use crate::{
    AlertService, AnalyticsTask, AnomalyAlert, AnomalyDetector, CoreError, DetectorSettings,
    ExpenseStore, Forecaster, InMemoryExpenseStore, NotificationSender, MIN_HISTORY_RECORDS,
};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date")
}

fn typical_store(count: u64) -> InMemoryExpenseStore {
    let store = InMemoryExpenseStore::new();
    for offset in 0..count {
        let date = start()
            .checked_add_days(Days::new(offset))
            .expect("date in range");
        let amount = 250.0 + (offset % 9) as f64 * 20.0;
        store
            .add_expense(date, amount, Category::Food, None)
            .expect("add expense");
    }
    store
}

#[test]
fn in_memory_store_keeps_insertion_order() {
    let store = InMemoryExpenseStore::new();
    store
        .add_expense(start(), 30.0, Category::Bills, Some("power"))
        .expect("add first");
    store
        .add_expense(start(), 10.0, Category::Food, Some("  "))
        .expect("add second");

    let records = store.get_all_expenses().expect("read back");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].description(), Some("power"));
    assert_eq!(records[1].description(), None);
    assert_ne!(records[0].id(), records[1].id());
}

#[test]
fn in_memory_store_rejects_invalid_amounts() {
    let store = InMemoryExpenseStore::new();
    for amount in [-1.0, f64::NAN, f64::INFINITY] {
        let err = store
            .add_expense(start(), amount, Category::Other, None)
            .expect_err("invalid amount");
        assert!(matches!(err, CoreError::Validation(_)));
    }
    assert!(store.is_empty());

    let bad = TransactionRecord::new(start(), -5.0, Category::Food, None);
    assert!(InMemoryExpenseStore::from_records(vec![bad]).is_err());
}

#[test]
fn default_import_adds_every_record() {
    let store = InMemoryExpenseStore::new();
    let records: Vec<TransactionRecord> = (0..3)
        .map(|i| TransactionRecord::new(start(), 10.0 * i as f64, Category::Shopping, None))
        .collect();
    let imported = store.import_records(&records).expect("import");
    assert_eq!(imported, 3);
    assert_eq!(store.len(), 3);
}

#[test]
fn detector_and_forecaster_share_the_minimum() {
    let store = typical_store(MIN_HISTORY_RECORDS as u64);
    AnomalyDetector::new(&store)
        .score_all()
        .expect("ten records are enough to score");
    Forecaster::new(&store)
        .predict_future(3)
        .expect("ten records are enough to forecast");
}

#[test]
fn score_all_orders_by_anomaly_score() {
    let store = typical_store(40);
    store
        .add_expense(start(), 12_000.0, Category::Travel, Some("flight"))
        .expect("add outlier");

    let results = AnomalyDetector::new(&store).score_all().expect("score");
    assert_eq!(results.len(), 41);
    assert!(results
        .windows(2)
        .all(|pair| pair[0].anomaly_score <= pair[1].anomaly_score));
    assert_eq!(results[0].record.description(), Some("flight"));
    assert!(results[0].isolation_score() > 0.5);
}

#[test]
fn contamination_bounds_flagged_share() {
    let store = typical_store(100);
    let settings = DetectorSettings {
        contamination: 0.1,
        ..DetectorSettings::default()
    };
    let anomalies = AnomalyDetector::with_settings(&store, settings)
        .detect_anomalies()
        .expect("detect");
    assert!(anomalies.len() <= 10, "flagged {}", anomalies.len());
    assert!(anomalies.iter().all(|result| result.is_anomaly));
}

#[test]
fn analytics_task_runs_a_forecast_in_the_background() {
    let store = Arc::new(typical_store(30));
    let forecaster = Forecaster::new(Arc::clone(&store));
    let task = AnalyticsTask::spawn("forecast", move |token| {
        forecaster.predict_future_with_cancel(7, token)
    })
    .expect("spawn task");

    let forecast = task
        .wait_timeout(Duration::from_secs(60))
        .expect("forecast finishes");
    assert_eq!(forecast.len(), 7);
}

#[test]
fn analytics_task_propagates_insufficient_data() {
    let store = Arc::new(typical_store(3));
    let detector = AnomalyDetector::new(Arc::clone(&store));
    let task = AnalyticsTask::spawn("anomalies", move |token| {
        detector.detect_anomalies_with_cancel(token)
    })
    .expect("spawn task");

    let err = task.wait().expect_err("too little history");
    assert!(err.is_insufficient_data());
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<String>>,
}

impl NotificationSender for Outbox {
    fn send_budget_alert(&self, recipient: &str, predicted: f64, limit: f64) -> bool {
        if predicted <= limit {
            return false;
        }
        self.sent
            .lock()
            .expect("outbox lock")
            .push(format!("budget:{recipient}"));
        true
    }

    fn send_anomaly_alert(&self, recipient: &str, amount: f64, category: Category) -> bool {
        self.sent
            .lock()
            .expect("outbox lock")
            .push(format!("anomaly:{recipient}:{amount}:{category}"));
        true
    }
}

#[test]
fn monthly_budget_check_uses_the_thirty_day_forecast() {
    let store = typical_store(30);
    let forecaster = Forecaster::new(&store);
    let outbox = Outbox::default();
    let alerts = AlertService::new(&outbox);

    let within = alerts
        .check_monthly_budget(&forecaster, "me@example.com", 1_000_000.0)
        .expect("check within");
    assert!(!within.is_over_budget());
    assert!(!within.alert_sent);
    assert!(within.predicted > 0.0);

    let over = alerts
        .check_monthly_budget(&forecaster, "me@example.com", 100.0)
        .expect("check over");
    assert!(over.alert_sent);
    assert_eq!(over.predicted, within.predicted);
    assert_eq!(
        *outbox.sent.lock().expect("outbox lock"),
        vec!["budget:me@example.com".to_string()]
    );
}

#[test]
fn top_anomaly_alert_reports_the_outlier() {
    let store = typical_store(40);
    store
        .add_expense(start(), 12_000.0, Category::Travel, Some("flight"))
        .expect("add outlier");
    let outbox = Outbox::default();

    let alert = AlertService::new(&outbox)
        .alert_top_anomaly(&AnomalyDetector::new(&store), "me@example.com")
        .expect("alert");
    match alert {
        AnomalyAlert::Reported { anomaly, delivered } => {
            assert!(delivered);
            assert_eq!(anomaly.record.description(), Some("flight"));
        }
        AnomalyAlert::NothingToReport => panic!("outlier should be reported"),
    }
    assert_eq!(
        *outbox.sent.lock().expect("outbox lock"),
        vec!["anomaly:me@example.com:12000:Travel".to_string()]
    );
}

#[test]
fn cancelled_monthly_budget_check_sends_nothing() {
    let store = typical_store(30);
    let forecaster = Forecaster::new(&store);
    let outbox = Outbox::default();
    let token = crate::CancelToken::new();
    token.cancel();

    let err = AlertService::new(&outbox)
        .check_monthly_budget_with_cancel(&forecaster, "me@example.com", 100.0, &token)
        .expect_err("cancelled before forecasting");
    assert!(matches!(err, CoreError::Cancelled));
    assert!(outbox.sent.lock().expect("outbox lock").is_empty());
}

#[test]
fn monthly_budget_check_runs_as_an_analytics_task() {
    let store = Arc::new(typical_store(30));
    let forecaster = Forecaster::new(Arc::clone(&store));
    let outbox = Arc::new(Outbox::default());
    let alerts = AlertService::new(Arc::clone(&outbox));

    let task = AnalyticsTask::spawn("budget-check", move |token| {
        alerts.check_monthly_budget_with_cancel(&forecaster, "me@example.com", 100.0, token)
    })
    .expect("spawn task");
    let check = task
        .wait_timeout(Duration::from_secs(60))
        .expect("check finishes");

    assert!(check.alert_sent);
    assert_eq!(outbox.sent.lock().expect("outbox lock").len(), 1);
}
