//! dpi-bypass CLI
//!
//! Command-line host for the obfuscating relays in `bypass-core`.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use args::Args;
use commands::Command;
use logging::LogSettings;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // The service file may carry its own [logging] table
    let service_config = match args.command {
        Command::Run(ref run_args) => Some(commands::run::load_config(run_args)?),
        _ => None,
    };

    let mut settings = LogSettings::from_args(&args);
    if let Some(ref config) = service_config {
        settings = settings.with_config(&config.logging);
    }
    logging::init(&settings)?;

    if args.is_interactive_run() {
        print_banner();
    }

    let result = run(args.command, service_config);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn run(command: Command, service_config: Option<bypass_core::ServiceConfig>) -> Result<()> {
    match command {
        Command::Run(run_args) => {
            let config = match service_config {
                Some(config) => config,
                None => commands::run::load_config(&run_args)?,
            };
            commands::run::execute(run_args, config)
        }
        Command::Config(config_args) => commands::config::execute(config_args),
        Command::Completions(comp_args) => commands::completions::execute(comp_args),
    }
}

fn print_banner() {
    use colored::Colorize;

    println!();
    println!("{}", "╔═══════════════════════════════════════════════════════╗".cyan());
    println!("{}", "║                                                       ║".cyan());
    println!("{}{}{}",
        "║  ".cyan(),
        format!("dpi-bypass v{:<10}", env!("CARGO_PKG_VERSION")).green().bold(),
        "                               ║".cyan()
    );
    println!("{}{}{}",
        "║  ".cyan(),
        "Obfuscating relays for DPI circumvention".white(),
        "             ║".cyan()
    );
    println!("{}", "║                                                       ║".cyan());
    println!("{}", "╚═══════════════════════════════════════════════════════╝".cyan());
    println!();
}
