//! split-ledger CLI
//!
//! Replays an expense journal and prints the outstanding balances of every
//! group.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > balances.csv
//! cargo run -- --strategy sync journal.csv > balances.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 journal.csv > balances.csv
//! cargo run -- --epsilon 0.05 --split-tolerance 0.02 journal.csv > balances.csv
//! RUST_LOG=split_ledger=debug cargo run -- journal.csv > balances.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success (rejected journal rows are logged, not fatal)
//! - 1: Error (missing arguments, file not found, output failure, etc.)

use split_ledger::{cli, strategy, telemetry};
use std::process;
use tracing::error;

fn main() {
    telemetry::init();

    let args = cli::parse_args();

    let strategy = {
        let batch = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), batch, args.to_ledger_config())
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        error!(error = %e, "replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
