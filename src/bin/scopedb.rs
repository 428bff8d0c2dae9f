//! scopedb: switch a SQLite database to write-ahead logging.

use scopedb::{config, ConnectionManager, ConnectionParams, WalStatus};
use std::process::ExitCode;
use tracing::info;

const USAGE: &str = "Usage: scopedb <DB_PATH | PARAMS.toml>";

fn main() -> ExitCode {
    // Logs go to stderr so stdout only carries the result
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(target) = args.get(1) else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    let params = if target.ends_with(".toml") {
        match config::load_params(target) {
            Ok(params) => params,
            Err(e) => {
                eprintln!("Failed to load parameters: {}", e);
                return ExitCode::from(2);
            }
        }
    } else {
        ConnectionParams::new(target.as_str())
    };

    info!(path = %params.path, "Checking journal mode");
    match ConnectionManager::new(params).enable_wal() {
        WalStatus::AlreadyEnabled => println!("journal_mode=wal (unchanged)"),
        WalStatus::Switched { previous, current } => {
            println!("journal_mode={} (was {})", current, previous)
        }
        WalStatus::Unreported => println!("journal_mode unreported"),
        WalStatus::Failed => {
            eprintln!("Failed to check journal mode of {}", target);
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
