mod cmd;
mod config;

use anyhow::Result;
use clap::Parser;
use utils::version;

use crate::config::Cli;
use crate::config::Commands;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    utils::logging::init();
    tracing::debug!("device-plugin {}", &**version::VERSION);

    match cli.command {
        Commands::ListDevices(args) => cmd::run_list_devices(args),
        Commands::Validate(args) => cmd::run_validate(args),
        Commands::Resolve(args) => cmd::run_resolve(args),
    }
}
