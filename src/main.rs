//! assetserver - serve a mounted tree of assets through filters and templates.

mod cli;

use anyhow::Result;
use assetserver::{ServerConfig, logger};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let mut config = ServerConfig::load(&cli.config)?;
    config.apply_common_options(cli.no_cache, cli.no_optimize);

    match &cli.command {
        Commands::Serve {
            interface,
            port,
            workers,
        } => {
            config.apply_serve_options(*interface, *port, *workers);
            cli::serve::serve(config)
        }
        Commands::Copy { dest, paths } => cli::copy::copy(config, dest, paths),
        Commands::Config { json } => cli::config::show_config(config, *json),
    }
}
