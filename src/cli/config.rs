//! `config`: show what the server would do with the current configuration.

use anyhow::{Context, Result};
use assetserver::{
    Pipeline, ServerConfig,
    logger::{Logger, TerminalLogger},
};
use owo_colors::OwoColorize;
use std::{fmt::Write, sync::Arc};

pub fn show_config(config: ServerConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let logger: Arc<dyn Logger> = Arc::new(TerminalLogger);
    let pipeline = Pipeline::from_config(Arc::new(config), logger)
        .context("failed to set up the asset pipeline")?;
    print!("{}", report(&pipeline));
    Ok(())
}

/// Mounts, filter bindings in match order, addons and cache mode.
fn report(pipeline: &Pipeline) -> String {
    let config = pipeline.config();
    let mut out = String::new();

    if !config.config_path.as_os_str().is_empty() {
        let _ = writeln!(out, "{} {}", "config:".bold(), config.config_path.display());
    }

    let _ = writeln!(out, "{}", "mounts:".bold());
    for mount in pipeline.mounts().iter() {
        let _ = writeln!(out, "  {} -> {}", mount.point().cyan(), mount.store().describe());
    }

    let _ = writeln!(out, "{}", "filters:".bold());
    let bindings = pipeline.registry().bindings();
    if bindings.is_empty() {
        let _ = writeln!(out, "  {}", "(none)".dimmed());
    }
    for binding in bindings {
        let _ = writeln!(out, "  {} -> {}", binding.predicate(), binding.filter().id().green());
    }

    if !config.addons.is_empty() {
        let _ = writeln!(out, "{} {}", "addons:".bold(), config.addons.join(", "));
    }

    let cache = if config.cache.enabled {
        format!("on ({:?})", config.cache.signature).to_lowercase()
    } else {
        "off".to_string()
    };
    let _ = writeln!(out, "{} {}", "cache:".bold(), cache);
    out
}
