//! Per-request state and the view a filter gets of it.

use std::collections::BTreeMap;

use super::Pipeline;
use crate::address::{AssetPath, Locator};
use crate::cache::{DependencyTracker, Tracking};
use crate::config::ServerConfig;
use crate::core::{Encoding, LogicalPath};
use crate::error::Result;
use crate::logger::Logger;
use crate::template::{RenderScope, TemplateHost};

/// Mutable state of one request.
///
/// Holds the stack of resources whose filter chains are running (outermost
/// first) and the dependency tracker. Never shared between requests.
#[derive(Debug, Default)]
pub struct RenderContext {
    frames: Vec<AssetPath>,
    tracker: DependencyTracker,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the first active chain: what the client asked for.
    pub fn requested_path(&self) -> Option<&AssetPath> {
        self.frames.first()
    }

    /// Path of the innermost active chain.
    pub fn current_path(&self) -> Option<&AssetPath> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn is_active(&self, path: &AssetPath) -> bool {
        self.frames.iter().any(|f| f.identity() == path.identity())
    }

    pub(crate) fn enter(&mut self, path: AssetPath) {
        self.frames.push(path);
    }

    pub(crate) fn leave(&mut self) {
        self.frames.pop();
    }
}

impl Tracking for RenderContext {
    fn tracker(&mut self) -> &mut DependencyTracker {
        &mut self.tracker
    }
}

/// What a filter sees while it runs.
///
/// Reads made through the context resolve through the whole pipeline and are
/// recorded as dependencies of the resource being filtered.
pub struct FilterContext<'a> {
    pipeline: &'a Pipeline,
    render: &'a mut RenderContext,
    path: &'a AssetPath,
}

impl<'a> FilterContext<'a> {
    pub(crate) fn new(
        pipeline: &'a Pipeline,
        render: &'a mut RenderContext,
        path: &'a AssetPath,
    ) -> Self {
        Self {
            pipeline,
            render,
            path,
        }
    }

    /// The resource being filtered.
    pub fn path(&self) -> &AssetPath {
        self.path
    }

    pub fn config(&self) -> &ServerConfig {
        self.pipeline.config()
    }

    pub fn logger(&self) -> &dyn Logger {
        self.pipeline.logger()
    }

    pub fn pipeline(&self) -> &Pipeline {
        self.pipeline
    }

    pub fn render_context(&mut self) -> &mut RenderContext {
        self.render
    }

    /// Resolve another resource, recording it as a dependency.
    pub fn resolve(&mut self, path: &LogicalPath) -> Result<Option<Locator>> {
        self.pipeline.resolve(path, self.render)
    }

    /// Compile and render `source` as a template.
    ///
    /// `Ok(None)` when the template would reproduce its source unchanged.
    pub fn render_template(&mut self, source: &str, origin: &str) -> Result<Option<String>> {
        let pipeline = self.pipeline;
        let program = pipeline.programs().compile(source, origin)?;
        if program.is_identity() {
            return Ok(None);
        }

        let mut scope = RenderScope::new(self, pipeline.functions());
        program.render(&mut scope)?;
        Ok(Some(scope.take_output()))
    }
}

impl TemplateHost for FilterContext<'_> {
    fn read(&mut self, path: &str, encoding: Option<Encoding>) -> Result<Option<String>> {
        let Some(logical) = LogicalPath::parse(path) else {
            return Ok(None);
        };
        match self.resolve(&logical)? {
            Some(locator) => locator.text(encoding).map(Some),
            None => Ok(None),
        }
    }

    fn this_path(&self) -> &str {
        self.path.full_path().as_str()
    }

    fn requested_path(&mut self) -> &str {
        self.render.tracker().note_request();
        self.render
            .requested_path()
            .unwrap_or(self.path)
            .full_path()
            .as_str()
    }

    fn params(&self) -> &BTreeMap<String, String> {
        self.path.params()
    }

    fn logger(&self) -> &dyn Logger {
        self.pipeline.logger()
    }
}
