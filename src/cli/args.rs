//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// assetserver: serve and copy filtered assets
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path, searched upward from the current directory
    #[arg(short = 'C', long, default_value = "assetserver.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Disable the output cache (recompute every request)
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Skip the js/css optimizer filters
    #[arg(long, global = true)]
    pub no_optimize: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve assets over HTTP
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Request worker threads (0 = one per CPU)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Render every mounted resource into a directory
    #[command(visible_alias = "c")]
    Copy {
        /// Destination directory
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dest: PathBuf,

        /// Server paths to copy (prefixes). If omitted, copies everything.
        #[arg(value_name = "PATH")]
        paths: Vec<String>,
    },

    /// Show the effective configuration: mounts and filter bindings
    Config {
        /// Print the parsed configuration as JSON
        #[arg(long)]
        json: bool,
    },
}

#[allow(unused)]
impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
    pub const fn is_copy(&self) -> bool {
        matches!(self.command, Commands::Copy { .. })
    }
}
