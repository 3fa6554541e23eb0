//! SpendWatch watches discretionary spending: it flags unusual expenses with an
//! isolation ensemble, forecasts daily spend, and warns when the month is heading
//! over budget.
//!
//! The analytics live in the `spendwatch-*` workspace crates; this crate adds the
//! email notification sender, sample data, and the `spendwatch` CLI.

pub mod cli;
pub mod errors;
pub mod notify;
pub mod sample;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup debug log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::debug!(
            version = utils::build_info::current().version,
            "spendwatch tracing initialized"
        );
    });
}
