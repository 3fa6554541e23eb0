use chrono::{Local, NaiveDate};
use spendwatch_core::{
    forecast::{round_currency, MONTHLY_HORIZON_DAYS},
    AlertService, AnomalyAlert, AnomalyDetector, BudgetCheck, BudgetStatus, CoreError,
    ExpenseStore, Forecaster, SummaryService,
};
use spendwatch_domain::Category;
use tracing::debug;

use super::{output, CliContext, ConfigAction};
use crate::{errors::CliError, notify::format_amount, sample::SampleGenerator, utils::build_info};

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::Core(CoreError::Serde(err.to_string())))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(super) fn add(
    ctx: &CliContext,
    amount: f64,
    category: Category,
    date: Option<NaiveDate>,
    description: Option<&str>,
) -> Result<(), CliError> {
    if !(amount > 0.0 && amount.is_finite()) {
        return Err(CliError::Input(format!(
            "amount must be greater than zero, got {amount}"
        )));
    }
    let record = ctx
        .store()
        .add_expense(date.unwrap_or_else(today), amount, category, description)?;
    let symbol = ctx.currency_symbol();
    output::success(format!(
        "Added {} to {} on {}",
        format_amount(symbol, record.amount()),
        record.category(),
        record.date()
    ));

    let detector = AnomalyDetector::with_settings(ctx.store(), ctx.config().detector.clone());
    match detector.is_amount_anomalous(amount) {
        Ok(true) => output::warning(format!(
            "This amount ({}) is unusually high for your history",
            format_amount(symbol, amount)
        )),
        Ok(false) => {}
        Err(err) if err.is_insufficient_data() => {
            debug!(%err, "anomaly check skipped");
            output::info("Anomaly check skipped until there is more history");
        }
        Err(err) => output::warning(format!("Anomaly check failed: {err}")),
    }
    Ok(())
}

pub(super) fn list(ctx: &CliContext, limit: usize) -> Result<(), CliError> {
    let recent = SummaryService::new(ctx.store()).recent(limit)?;
    if recent.is_empty() {
        output::info("No expenses recorded yet");
        return Ok(());
    }
    output::section("Recent expenses");
    println!("{}", output::record_header());
    for record in &recent {
        println!("{}", output::record_row(ctx.currency_symbol(), record));
    }
    Ok(())
}

pub(super) fn sample(
    ctx: &CliContext,
    months: u32,
    seed: u64,
    end: Option<NaiveDate>,
    force: bool,
) -> Result<(), CliError> {
    let store = ctx.store();
    let existing = store.get_all_expenses()?.len();
    if existing > 0 && !force {
        return Err(CliError::Input(format!(
            "the store already holds {existing} expenses; pass --force to append sample data"
        )));
    }
    let generator = SampleGenerator::new(end.unwrap_or_else(today))
        .with_months(months)
        .with_seed(seed);
    let records = generator.generate();
    let imported = store.import_records(&records)?;
    output::success(format!(
        "Generated {imported} sample expenses from {} to {}",
        generator.start(),
        end.unwrap_or_else(today)
    ));
    Ok(())
}

pub(super) fn anomalies(ctx: &CliContext, json: bool) -> Result<(), CliError> {
    let detector = AnomalyDetector::with_settings(ctx.store(), ctx.config().detector.clone());
    let anomalies =
        ctx.run_analysis("anomalies", move |token| detector.detect_anomalies_with_cancel(token))?;

    if json {
        println!("{}", to_json(&anomalies)?);
        return Ok(());
    }
    if anomalies.is_empty() {
        output::success("No unusual expenses detected");
        return Ok(());
    }
    output::warning(format!("Found {} unusual expenses", anomalies.len()));
    println!("{}  {:>7}", output::record_header(), "Score");
    for result in &anomalies {
        println!("{}", output::anomaly_row(ctx.currency_symbol(), result));
    }
    Ok(())
}

pub(super) fn forecast(ctx: &CliContext, days: usize, json: bool) -> Result<(), CliError> {
    let forecaster = Forecaster::with_settings(ctx.store(), ctx.config().forecast.clone());
    let forecast = ctx.run_analysis("forecast", move |token| {
        forecaster.predict_future_with_cancel(days, token)
    })?;

    if json {
        println!("{}", to_json(&forecast)?);
        return Ok(());
    }
    let symbol = ctx.currency_symbol();
    output::section(format!("Forecast for the next {days} days"));
    println!("{}", output::forecast_header());
    for point in &forecast {
        println!("{}", output::forecast_row(symbol, point));
    }
    output::info(format!(
        "Total predicted: {}",
        format_amount(symbol, round_currency(forecast.total_predicted()))
    ));
    Ok(())
}

pub(super) fn summary(ctx: &CliContext, json: bool) -> Result<(), CliError> {
    let summary = SummaryService::new(ctx.store()).summarize()?;
    if json {
        println!("{}", to_json(&summary)?);
        return Ok(());
    }
    let symbol = ctx.currency_symbol();
    output::section("Spending summary");
    println!("Total spent:       {}", format_amount(symbol, summary.total_spent));
    println!(
        "Avg daily spend:   {}",
        format_amount(symbol, summary.average_daily)
    );
    println!("Transactions:      {}", summary.transaction_count);
    println!(
        "Top category:      {}",
        summary
            .top_category
            .map(|category| category.to_string())
            .unwrap_or_else(|| "N/A".into())
    );
    if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
        println!("Period:            {first} to {last}");
    }
    if !summary.by_category.is_empty() {
        output::section("By category");
        for entry in &summary.by_category {
            println!(
                "{:<13}  {:>14}  {:>5.1}%",
                entry.category.as_str(),
                format_amount(symbol, entry.total),
                entry.share * 100.0
            );
        }
    }
    Ok(())
}

pub(super) fn check_budget(
    ctx: &CliContext,
    budget: Option<f64>,
    recipient: Option<String>,
    dry_run: bool,
) -> Result<(), CliError> {
    let limit = budget.unwrap_or(ctx.config().alerts.monthly_budget);
    if !(limit > 0.0 && limit.is_finite()) {
        return Err(CliError::Input(format!(
            "budget must be greater than zero, got {limit}"
        )));
    }

    let recipient = if dry_run {
        None
    } else {
        recipient.or_else(|| ctx.config().alerts.recipient.clone())
    };
    let forecaster = Forecaster::with_settings(ctx.store(), ctx.config().forecast.clone());
    let check = match recipient.clone() {
        Some(recipient) => {
            let alerts = AlertService::new(ctx.alert_system());
            ctx.run_analysis("budget-check", move |token| {
                alerts.check_monthly_budget_with_cancel(&forecaster, &recipient, limit, token)
            })?
        }
        None => {
            let predicted = ctx.run_analysis("monthly-forecast", move |token| {
                forecaster.get_monthly_prediction_with_cancel(token)
            })?;
            BudgetCheck {
                predicted,
                budget_limit: limit,
                alert_sent: false,
            }
        }
    };

    let symbol = ctx.currency_symbol();
    let status = BudgetStatus::new(check.predicted, limit);
    output::section("Budget check");
    println!(
        "Predicted {MONTHLY_HORIZON_DAYS}-day spend: {}",
        format_amount(symbol, check.predicted)
    );
    println!("Budget limit:             {}", format_amount(symbol, limit));
    if status.within_budget() {
        output::success(format!(
            "Within budget by {} ({:.1}% potential savings)",
            format_amount(symbol, status.difference),
            status.savings_rate()
        ));
    } else {
        output::warning(format!(
            "Over budget by {}",
            format_amount(symbol, -status.difference)
        ));
    }

    match recipient {
        _ if dry_run => {}
        None => {
            if check.is_over_budget() {
                output::info(
                    "No alert recipient configured; set one with `spendwatch config set --recipient`",
                );
            }
        }
        Some(recipient) => {
            if check.alert_sent {
                output::success(format!(
                    "Budget alert for {recipient} queued in {}",
                    ctx.outbox_path().display()
                ));
            } else if check.is_over_budget() {
                output::warning("Budget alert could not be delivered; see the log for details");
            }
        }
    }
    Ok(())
}

pub(super) fn alert_anomaly(ctx: &CliContext, recipient: Option<String>) -> Result<(), CliError> {
    let recipient = recipient
        .or_else(|| ctx.config().alerts.recipient.clone())
        .ok_or_else(|| {
            CliError::Input(
                "no alert recipient; pass --recipient or run `spendwatch config set --recipient`"
                    .into(),
            )
        })?;

    let detector = AnomalyDetector::with_settings(ctx.store(), ctx.config().detector.clone());
    let anomalies =
        ctx.run_analysis("anomalies", move |token| detector.detect_anomalies_with_cancel(token))?;

    match AlertService::new(ctx.alert_system()).report_first(anomalies, &recipient) {
        AnomalyAlert::NothingToReport => output::success("No anomalies to report"),
        AnomalyAlert::Reported {
            anomaly,
            delivered: true,
        } => output::success(format!(
            "Anomaly alert for {} ({}) queued for {recipient}",
            format_amount(ctx.currency_symbol(), anomaly.record.amount()),
            anomaly.record.category()
        )),
        AnomalyAlert::Reported {
            delivered: false, ..
        } => output::warning("Anomaly alert could not be delivered; see the log for details"),
    }
    Ok(())
}

pub(super) fn config(ctx: &mut CliContext, action: ConfigAction) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => {
            println!("{}", to_json(ctx.config())?);
        }
        ConfigAction::Set {
            budget,
            recipient,
            currency_symbol,
            sender_address,
        } => {
            let alerts = &mut ctx.config.alerts;
            if let Some(budget) = budget {
                alerts.monthly_budget = budget;
            }
            if let Some(recipient) = recipient {
                alerts.recipient = Some(recipient);
            }
            if let Some(symbol) = currency_symbol {
                alerts.currency_symbol = symbol;
            }
            if let Some(sender) = sender_address {
                alerts.sender_address = sender;
            }
            ctx.config_manager.save(&ctx.config)?;
            output::success(format!(
                "Configuration saved to {}",
                ctx.config_manager.config_path().display()
            ));
        }
    }
    Ok(())
}

pub(super) fn info(ctx: &CliContext) -> Result<(), CliError> {
    let build = build_info::current();
    output::section("SpendWatch");
    println!("Version:      {}", build.short());
    println!("Built:        {} ({})", build.timestamp, build.profile);
    println!("Target:       {}", build.target);
    println!("Compiler:     {}", build.rustc);
    println!("Home:         {}", ctx.home().display());
    println!("Config file:  {}", ctx.config_manager.config_path().display());
    println!("Data file:    {}", ctx.store().path().display());
    println!("Outbox:       {}", ctx.outbox_path().display());
    Ok(())
}
