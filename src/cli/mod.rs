//! The `spendwatch` command line.

mod commands;
pub mod output;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use spendwatch_config::{app_data_dir, Config, ConfigManager};
use spendwatch_core::{AnalyticsTask, CancelToken, CoreError, MIN_HISTORY_RECORDS};
use spendwatch_domain::Category;
use spendwatch_storage_json::JsonExpenseStore;

use crate::{
    errors::CliError,
    notify::{EmailAlertSystem, OutboxTransport},
};

#[derive(Parser, Debug)]
#[command(
    name = "spendwatch",
    version,
    about = "Track spending, flag unusual expenses and forecast the month ahead"
)]
pub struct Cli {
    /// Application directory (defaults to $SPENDWATCH_HOME, then ~/.spendwatch)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Expense file to use instead of the configured one
    #[arg(long, global = true)]
    pub data_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record an expense
    Add {
        /// Amount spent; must be greater than zero
        #[arg(long)]
        amount: f64,

        /// Food, Travel, Shopping, Entertainment, Bills or Other
        #[arg(long)]
        category: Category,

        /// Date of the expense, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Show the most recent expenses
    List {
        #[arg(long, default_value_t = 15)]
        limit: usize,
    },

    /// Generate a deterministic sample history
    Sample {
        #[arg(long, default_value_t = crate::sample::DEFAULT_SAMPLE_MONTHS)]
        months: u32,

        #[arg(long, default_value_t = crate::sample::DEFAULT_SAMPLE_SEED)]
        seed: u64,

        /// Last day of the generated history (defaults to today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Append even when the store already holds records
        #[arg(long)]
        force: bool,
    },

    /// List expenses the isolation ensemble flags as unusual
    Anomalies {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Forecast daily spend for the coming days
    Forecast {
        #[arg(long, default_value_t = 30)]
        days: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Dashboard metrics over the whole history
    Summary {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Forecast the next 30 days and alert when the total exceeds the budget
    CheckBudget {
        /// Budget limit (defaults to the configured monthly budget)
        #[arg(long)]
        budget: Option<f64>,

        /// Alert recipient (defaults to the configured one)
        #[arg(long)]
        recipient: Option<String>,

        /// Report the status without sending anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Send an alert about the most unusual expense
    AlertAnomaly {
        #[arg(long)]
        recipient: Option<String>,
    },

    /// Show or change the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Build metadata and resolved paths
    Info,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as JSON
    Show,

    /// Update alert settings
    Set {
        #[arg(long)]
        budget: Option<f64>,

        #[arg(long)]
        recipient: Option<String>,

        #[arg(long)]
        currency_symbol: Option<String>,

        #[arg(long)]
        sender_address: Option<String>,
    },
}

/// Everything a command needs: resolved paths, loaded config and the open store.
pub struct CliContext {
    home: PathBuf,
    config_manager: ConfigManager,
    config: Config,
    store: Arc<JsonExpenseStore>,
}

impl CliContext {
    pub fn open(home: Option<PathBuf>, data_file: Option<PathBuf>) -> Result<Self, CliError> {
        let home = home.unwrap_or_else(app_data_dir);
        let config_manager = ConfigManager::with_base_dir(&home)?;
        let mut config = config_manager.load()?;
        if data_file.is_some() {
            config.data_file = data_file;
        }
        let store = Arc::new(JsonExpenseStore::open(config.resolve_data_file(&home))?);
        Ok(Self {
            home,
            config_manager,
            config,
            store,
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Arc<JsonExpenseStore> {
        Arc::clone(&self.store)
    }

    fn currency_symbol(&self) -> &str {
        &self.config.alerts.currency_symbol
    }

    fn outbox_path(&self) -> PathBuf {
        self.config.alerts.resolve_outbox(&self.home)
    }

    fn alert_system(&self) -> EmailAlertSystem<OutboxTransport> {
        EmailAlertSystem::new(
            OutboxTransport::new(self.outbox_path()),
            self.config.alerts.sender_address.clone(),
        )
        .with_currency_symbol(self.currency_symbol())
    }

    /// Runs a fit on a worker thread under the configured deadline.
    fn run_analysis<T, F>(&self, name: &str, job: F) -> Result<T, CliError>
    where
        T: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<T, CoreError> + Send + 'static,
    {
        let task = AnalyticsTask::spawn(name, job)?;
        Ok(task.wait_timeout(Duration::from_secs(self.config.fit_timeout_secs))?)
    }
}

pub fn run_cli() -> Result<(), CliError> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    let mut ctx = CliContext::open(cli.home, cli.data_file)?;
    match cli.command {
        Command::Add {
            amount,
            category,
            date,
            description,
        } => commands::add(&ctx, amount, category, date, description.as_deref()),
        Command::List { limit } => commands::list(&ctx, limit),
        Command::Sample {
            months,
            seed,
            end,
            force,
        } => commands::sample(&ctx, months, seed, end, force),
        Command::Anomalies { json } => commands::anomalies(&ctx, json),
        Command::Forecast { days, json } => commands::forecast(&ctx, days, json),
        Command::Summary { json } => commands::summary(&ctx, json),
        Command::CheckBudget {
            budget,
            recipient,
            dry_run,
        } => commands::check_budget(&ctx, budget, recipient, dry_run),
        Command::AlertAnomaly { recipient } => commands::alert_anomaly(&ctx, recipient),
        Command::Config { action } => commands::config(&mut ctx, action),
        Command::Info => commands::info(&ctx),
    }
}

/// Prints `err` and returns the process exit code. Too little history is an
/// expected state with its own guidance and exit code.
pub fn report_error(err: &CliError) -> i32 {
    if err.is_insufficient_data() {
        output::warning(format!("Need more data: {err}"));
        output::info(format!(
            "Analyses need at least {MIN_HISTORY_RECORDS} expenses. Add more with `spendwatch add` or run `spendwatch sample`."
        ));
        2
    } else {
        output::error(err);
        1
    }
}
