//! HTTP front end over [`AssetServer`].

mod lifecycle;
mod response;

use anyhow::{Context, Result};
use assetserver::{
    AssetServer, ServerConfig, log,
    logger::{Logger, TerminalLogger},
};
use std::sync::Arc;
use tiny_http::{Request, Server};

/// Build the pipeline, bind, and answer requests until Ctrl+C.
pub fn serve(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    let logger: Arc<dyn Logger> = Arc::new(TerminalLogger);
    let assets = Arc::new(
        AssetServer::from_config(Arc::clone(&config), logger)
            .context("failed to set up the asset pipeline")?,
    );

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    let shutdown_rx = lifecycle::setup_shutdown_handler(Arc::clone(&server))?;

    log!("serve"; "http://{}", addr);
    run_request_loop(&server, &assets, config.serve.workers)?;

    if shutdown_rx.try_recv().is_err() {
        log!("serve"; "listener closed");
    }
    Ok(())
}

fn run_request_loop(server: &Server, assets: &Arc<AssetServer>, workers: usize) -> Result<()> {
    // Requests run in parallel; a slow template never blocks other clients
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("assetserver-worker-{i}"))
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let assets = Arc::clone(assets);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &assets) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, assets: &AssetServer) -> Result<()> {
    let method = response::method(&request);
    let if_none_match = response::header_value(&request, "If-None-Match");
    let reply = assets.handle(method, request.url(), if_none_match.as_deref());
    response::send(request, reply)
}
