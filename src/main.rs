//! keysmith - main entry point
//!
//! One-shot security bootstrap for a cluster deployment. Resolves the
//! command-line switches, then runs every platform service's setup
//! routines in their fixed order against the persisted security state.

use log::{debug, info};

use keysmith::cli::Cli;
use keysmith::services::{SetupContext, run_all};

/// Initialize the logger with appropriate settings
fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;

    Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env() // Allows RUST_LOG env var to override
        .init();
}

/// Main application entry point
fn main() {
    init_logger();
    info!("keysmith starting up");

    // A bad switch token dies here, before any state is touched.
    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    let options = cli.into_options();
    let mut ctx = SetupContext::new(options);

    match run_all(&mut ctx) {
        Ok(()) => {
            println!(
                "✓ Security settings persisted to {}",
                ctx.store.path().display()
            );
        }
        Err(e) => {
            eprintln!("✗ Setup failed: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
