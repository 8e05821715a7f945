//! `copy`: render every mounted resource into a directory.
//!
//! Each file visible through a mount is resolved exactly as a request for
//! it would be, so filters and templates apply. Files hidden behind a more
//! specific mount are skipped, as are resources a filter drops.

use anyhow::{Context, Result, bail};
use assetserver::{
    Pipeline, ServerConfig,
    core::LogicalPath,
    log,
    logger::{Logger, ProgressLine, TerminalLogger},
};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

/// What happened to one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Written,
    Dropped,
    Failed(String),
}

pub fn copy(config: ServerConfig, dest: &Path, prefixes: &[String]) -> Result<()> {
    let logger: Arc<dyn Logger> = Arc::new(TerminalLogger);
    let pipeline = Pipeline::from_config(Arc::new(config), logger)
        .context("failed to set up the asset pipeline")?;

    let prefixes = parse_prefixes(prefixes)?;
    let targets = collect_targets(&pipeline, &prefixes);
    fs::create_dir_all(dest).with_context(|| format!("cannot create {}", dest.display()))?;

    let progress = ProgressLine::new(&[("files", targets.len())]);
    let outcomes: Vec<(LogicalPath, Outcome)> = targets
        .into_par_iter()
        .map(|path| {
            let outcome = copy_one(&pipeline, &path, dest);
            progress.inc("files");
            (path, outcome)
        })
        .collect();
    progress.finish();

    let mut failed = 0;
    let mut dropped = 0;
    for (path, outcome) in &outcomes {
        match outcome {
            Outcome::Written => {}
            Outcome::Dropped => dropped += 1,
            Outcome::Failed(message) => {
                failed += 1;
                log!("error"; "{path}: {message}");
            }
        }
    }

    log!(
        "copy";
        "{} written, {} dropped, {} failed -> {}",
        outcomes.len() - failed - dropped,
        dropped,
        failed,
        dest.display()
    );
    if failed > 0 {
        bail!("{failed} resource(s) failed to render");
    }
    Ok(())
}

fn parse_prefixes(prefixes: &[String]) -> Result<Vec<LogicalPath>> {
    prefixes
        .iter()
        .map(|p| LogicalPath::parse(p).with_context(|| format!("invalid server path `{p}`")))
        .collect()
}

/// Every file reachable through the mount that owns it, sorted.
fn collect_targets(pipeline: &Pipeline, prefixes: &[LogicalPath]) -> Vec<LogicalPath> {
    let mounts = pipeline.mounts();
    let mut targets: Vec<LogicalPath> = mounts
        .iter()
        .flat_map(|mount| {
            let base = mount.point().as_str().trim_end_matches('/').to_string();
            mount
                .store()
                .list()
                .into_iter()
                .filter_map(move |relative| LogicalPath::parse(&format!("{base}/{relative}")))
                .filter(move |path| {
                    mounts
                        .find(path)
                        .is_some_and(|(owner, _)| owner.point() == mount.point())
                })
        })
        .filter(|path| prefixes.is_empty() || prefixes.iter().any(|p| is_under(path, p)))
        .collect();
    targets.sort();
    targets.dedup();
    targets
}

fn is_under(path: &LogicalPath, prefix: &LogicalPath) -> bool {
    let mut segments = path.segments();
    prefix.segments().all(|s| segments.next() == Some(s))
}

fn copy_one(pipeline: &Pipeline, path: &LogicalPath, dest: &Path) -> Outcome {
    let locator = match pipeline.render(path) {
        Ok(Some(locator)) => locator,
        Ok(None) => return Outcome::Dropped,
        Err(e) => return Outcome::Failed(e.to_string()),
    };

    let target: PathBuf = path.segments().fold(dest.to_path_buf(), |acc, s| acc.join(s));
    let written = locator.bytes().map_err(|e| e.to_string()).and_then(|bytes| {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        fs::write(&target, &*bytes).map_err(|e| e.to_string())
    });

    match written {
        Ok(()) => Outcome::Written,
        Err(message) => Outcome::Failed(message),
    }
}
