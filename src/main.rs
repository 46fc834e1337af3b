use std::env;

use warroom::cli;
use warroom::logs::setup_logging;

fn main() {
    setup_logging();
    let args: Vec<String> = env::args().collect();
    std::process::exit(cli::run_with_args(&args));
}
