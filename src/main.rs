// ambl - inspect binary execution traces

use ambl::cli::{self, Cli};
use ambl::config::load_config;
use clap::Parser;
use std::process::exit;
use tracing::{error, Level};

fn main() {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "failed to load config");
            exit(2);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = cli::run(&args, &config, &mut out) {
        error!("{e:#}");
        exit(1);
    }
}
