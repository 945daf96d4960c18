//! Config command - configuration management

use anyhow::{bail, Context, Result};
use bypass_core::config::ServiceConfig;
use bypass_core::TransformBuilder;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show a configuration file (or the built-in example)
    Show {
        /// Config file to show
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Generate an example configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "bypass.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Config file to validate
        file: PathBuf,
    },
}

/// Execute config command
pub fn execute(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show { file, json } => show_config(file.as_deref(), json),
        ConfigAction::Generate { output, force } => generate_config(&output, force),
        ConfigAction::Validate { file } => validate_config(&file),
    }
}

fn show_config(file: Option<&Path>, json: bool) -> Result<()> {
    let config = match file {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServiceConfig::example(),
    };

    let rendered = if json {
        serde_json::to_string_pretty(&config).context("Failed to serialize config")?
    } else {
        config.to_toml().context("Failed to serialize config")?
    };

    println!("{rendered}");
    Ok(())
}

fn generate_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let toml_str = ServiceConfig::example()
        .to_toml()
        .context("Failed to serialize config")?;

    // Add header comment
    let content = format!(
        "# dpi-bypass configuration\n\
         # Each [[bypass]] entry starts one local listener.\n\
         # Methods: shadowsocks, obfs4, custom, v2ray, http_header, tls_handshake,\n\
         #          tcp_fragment, udp_fragment, proxy_chain\n\n\
         {toml_str}"
    );

    std::fs::write(output, content)
        .with_context(|| format!("Failed to write config to {}", output.display()))?;

    info!(path = %output.display(), "Generated config file");
    println!("Configuration file generated: {}", output.display());

    Ok(())
}

fn validate_config(file: &Path) -> Result<()> {
    let config = ServiceConfig::load(file)
        .with_context(|| format!("Failed to load config from {}", file.display()))?;

    config.validate().context("Configuration validation failed")?;
    for bypass in &config.bypasses {
        TransformBuilder::from_config(bypass)
            .with_context(|| format!("Invalid parameters for bypass '{}'", bypass.id))?;
    }

    println!("{} Configuration is valid", "✓".green());
    println!("  Log level: {}", config.logging.level);
    println!("  Stats interval: {}s", config.runtime.stats_interval_secs);
    println!("  Bypasses: {}", config.bypasses.len());
    for bypass in &config.bypasses {
        println!(
            "    {:<20} {:<14} :{} -> {}{}",
            bypass.id,
            bypass.method,
            bypass.local_port,
            bypass.remote_addr(),
            if bypass.uses_tls() { " (tls)" } else { "" }
        );
    }

    Ok(())
}
