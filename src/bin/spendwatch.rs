use spendwatch::{
    cli::{report_error, run_cli},
    init,
};

fn main() {
    init();

    if let Err(err) = run_cli() {
        std::process::exit(report_error(&err));
    }
}
