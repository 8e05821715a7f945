//! The serving side: one current pipeline, swapped whole on reload.
//!
//! [`AssetServer::handle`] turns a request line into a transport-neutral
//! [`Reply`]; the HTTP front end only copies it onto the wire.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::Pipeline;
use crate::config::ServerConfig;
use crate::core::LogicalPath;
use crate::error::Result;
use crate::freshness::hash_bytes;
use crate::logger::Logger;
use crate::utils::mime::{self, types};

/// Request methods the server distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other,
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            _ => Self::Other,
        }
    }
}

/// A finished response, before it is written to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: String,
    pub etag: Option<String>,
    /// Empty for HEAD requests and bodiless statuses.
    pub body: Vec<u8>,
    pub no_cache: bool,
}

impl Reply {
    fn text(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            content_type: mime::content_type(types::PLAIN, None),
            etag: None,
            body: message.into().into_bytes(),
            no_cache: false,
        }
    }

    fn without_body(mut self) -> Self {
        self.body.clear();
        self
    }
}

/// Holds the live pipeline.
///
/// Requests load the current pipeline once and keep it for their whole
/// duration, so a reload never changes configuration under a running
/// request.
#[derive(Debug)]
pub struct AssetServer {
    pipeline: ArcSwap<Pipeline>,
}

impl AssetServer {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: ArcSwap::from_pointee(pipeline),
        }
    }

    /// Build the pipeline described by `config`.
    pub fn from_config(config: Arc<ServerConfig>, logger: Arc<dyn Logger>) -> Result<Self> {
        Pipeline::from_config(config, logger).map(Self::new)
    }

    #[inline]
    pub fn pipeline(&self) -> Arc<Pipeline> {
        self.pipeline.load_full()
    }

    /// Replace the pipeline. The old one (and its cache) is dropped once
    /// the last in-flight request lets go of it.
    pub fn swap(&self, pipeline: Pipeline) {
        self.pipeline.store(Arc::new(pipeline));
    }

    /// Rebuild from `config` and swap it in. On error the current pipeline
    /// stays.
    pub fn reload(&self, config: Arc<ServerConfig>, logger: Arc<dyn Logger>) -> Result<()> {
        let pipeline = Pipeline::from_config(config, logger)?;
        self.swap(pipeline);
        Ok(())
    }

    /// Answer one request.
    pub fn handle(&self, method: Method, target: &str, if_none_match: Option<&str>) -> Reply {
        let pipeline = self.pipeline();
        let reply = self.respond(&pipeline, method, target, if_none_match);
        pipeline
            .logger()
            .debug("serve", &format!("{} {target}", reply.status));
        reply
    }

    fn respond(
        &self,
        pipeline: &Pipeline,
        method: Method,
        target: &str,
        if_none_match: Option<&str>,
    ) -> Reply {
        if method == Method::Other {
            return Reply::text(405, "405 Method Not Allowed");
        }

        let Some(path) = LogicalPath::from_request(target) else {
            return Reply::text(404, "404 Not Found");
        };

        let locator = match pipeline.render(&path) {
            Ok(Some(locator)) => locator,
            Ok(None) => return finish(method, Reply::text(404, "404 Not Found")),
            Err(e) => {
                pipeline.logger().error("serve", &format!("{path}: {e}"));
                return finish(method, Reply::text(500, e.to_string()));
            }
        };

        let body = match locator.bytes() {
            Ok(bytes) => bytes.into_owned(),
            Err(e) => {
                pipeline.logger().error("serve", &format!("{path}: {e}"));
                return finish(method, Reply::text(500, e.to_string()));
            }
        };

        let etag = hash_bytes(&body).etag();
        let no_cache = pipeline.config().server.http_no_cache;
        if if_none_match.is_some_and(|tag| tag.trim() == etag) {
            return Reply {
                status: 304,
                content_type: String::new(),
                etag: Some(etag),
                body: Vec::new(),
                no_cache,
            };
        }

        finish(
            method,
            Reply {
                status: 200,
                content_type: mime::content_type(locator.content_type(), locator.encoding()),
                etag: Some(etag),
                body,
                no_cache,
            },
        )
    }
}

fn finish(method: Method, reply: Reply) -> Reply {
    match method {
        Method::Head => reply.without_body(),
        _ => reply,
    }
}
