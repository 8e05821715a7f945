//! HTTP response writing.

use assetserver::pipeline::{Method, Reply};
use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

/// Value of the `Server` header.
const SERVER_NAME: &str = concat!("assetserver/", env!("CARGO_PKG_VERSION"));

/// Request method as the pipeline sees it.
pub fn method(request: &Request) -> Method {
    match request.method() {
        tiny_http::Method::Get => Method::Get,
        tiny_http::Method::Head => Method::Head,
        _ => Method::Other,
    }
}

/// Value of the first header called `name`.
pub fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.to_string())
}

/// Write `reply` to the client.
pub fn send(request: Request, reply: Reply) -> Result<()> {
    let mut headers: Vec<Header> = Vec::new();
    let mut push = |name: &str, value: &str| {
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            headers.push(header);
        }
    };

    push("Server", SERVER_NAME);
    if !reply.content_type.is_empty() {
        push("Content-Type", &reply.content_type);
    }
    if let Some(etag) = &reply.etag {
        push("ETag", etag);
    }
    if reply.no_cache {
        push("Cache-Control", "no-cache");
    }

    let length = reply.body.len();
    let response = Response::new(
        StatusCode(reply.status),
        headers,
        std::io::Cursor::new(reply.body),
        Some(length),
        None,
    );
    request.respond(response)?;
    Ok(())
}
