use std::fmt;

use colored::Colorize;
use spendwatch_domain::{AnomalyResult, ForecastPoint, TransactionRecord};

use crate::notify::format_amount;

#[derive(Clone, Copy, PartialEq, Eq)]
enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Section,
}

fn style(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    match kind {
        MessageKind::Info => format!("[i] {text}"),
        MessageKind::Success => format!("[ok] {text}").bright_green().to_string(),
        MessageKind::Warning => format!("[!] {text}").bright_yellow().to_string(),
        MessageKind::Error => format!("[x] {text}").bright_red().to_string(),
        MessageKind::Section => format!("=== {} ===", text.trim()).bold().to_string(),
    }
}

pub fn info(message: impl fmt::Display) {
    println!("{}", style(MessageKind::Info, message));
}

pub fn success(message: impl fmt::Display) {
    println!("{}", style(MessageKind::Success, message));
}

pub fn warning(message: impl fmt::Display) {
    println!("{}", style(MessageKind::Warning, message));
}

/// Errors go to stderr.
pub fn error(message: impl fmt::Display) {
    eprintln!("{}", style(MessageKind::Error, message));
}

pub fn section(title: impl fmt::Display) {
    println!("\n{}", style(MessageKind::Section, title));
}

pub fn record_header() -> String {
    format!(
        "{:<10}  {:>14}  {:<13}  {}",
        "Date", "Amount", "Category", "Description"
    )
    .bold()
    .to_string()
}

pub fn record_row(symbol: &str, record: &TransactionRecord) -> String {
    format!(
        "{:<10}  {:>14}  {:<13}  {}",
        record.date().to_string(),
        format_amount(symbol, record.amount()),
        record.category().as_str(),
        record.description().unwrap_or("-")
    )
}

pub fn anomaly_row(symbol: &str, result: &AnomalyResult) -> String {
    format!(
        "{}  {:>7.3}",
        record_row(symbol, &result.record),
        result.isolation_score()
    )
}

pub fn forecast_header() -> String {
    format!(
        "{:<10}  {:>14}  {:>14}  {:>14}",
        "Date", "Predicted", "Lower", "Upper"
    )
    .bold()
    .to_string()
}

pub fn forecast_row(symbol: &str, point: &ForecastPoint) -> String {
    format!(
        "{:<10}  {:>14}  {:>14}  {:>14}",
        point.date.to_string(),
        format_amount(symbol, point.predicted),
        format_amount(symbol, point.lower_bound),
        format_amount(symbol, point.upper_bound)
    )
}
