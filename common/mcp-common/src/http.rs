//! HTTP transport
//!
//! A single `/mcp` endpoint: `POST` carries one JSON-RPC message per
//! request, `OPTIONS` answers CORS pre-flight. When a bearer token is
//! configured every `POST` must present it; pre-flight is never
//! authenticated. Clients that accept `text/event-stream` get the response
//! as a single SSE `data:` event instead of a JSON body.

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::post,
    Json, Router,
};
use futures_util::{future, stream};
use serde_json::{json, Value};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::protocol::{JsonRpcResponse, McpHandler};
use crate::provider::ToolProvider;

/// Path of the MCP endpoint
pub const MCP_PATH: &str = "/mcp";

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "POST, GET, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, Mcp-Session-Id";

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret expected as `Authorization: Bearer <token>`; `None` disables auth
    pub auth_token: Option<String>,
}

struct HttpState<P> {
    handler: Arc<McpHandler<P>>,
    auth_token: Option<Arc<str>>,
}

impl<P> Clone for HttpState<P> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            auth_token: self.auth_token.clone(),
        }
    }
}

/// Bind and serve the handler over HTTP until Ctrl-C
pub async fn serve_http<P: ToolProvider>(
    handler: Arc<McpHandler<P>>,
    config: HttpConfig,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        "Serving MCP over HTTP on http://{}{}",
        listener.local_addr()?,
        MCP_PATH
    );

    axum::serve(listener, router(handler, config.auth_token))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the router; exposed separately so it can be driven in-process
pub fn router<P: ToolProvider>(handler: Arc<McpHandler<P>>, auth_token: Option<String>) -> Router {
    let auth_token: Option<Arc<str>> = auth_token
        .filter(|token| !token.is_empty())
        .map(Arc::from);

    if auth_token.is_none() {
        tracing::warn!("No auth token configured - HTTP transport is running without authentication");
    }

    let state = HttpState {
        handler,
        auth_token,
    };

    Router::new()
        .route(MCP_PATH, post(handle_post::<P>).options(preflight))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer::<P>,
        ))
        .fallback(not_found)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(ALLOW_ORIGIN),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bearer-token middleware
///
/// Pre-flight passes through untouched. Everything else is rejected with
/// 401 before the body is read when the token is missing or wrong.
async fn require_bearer<P: ToolProvider>(
    State(state): State<HttpState<P>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.auth_token.as_deref() else {
        return next.run(request).await;
    };
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => {
            tracing::warn!("Invalid bearer token provided for {}", request.uri().path());
            unauthorized()
        }
        None => {
            tracing::warn!(
                "Missing or malformed Authorization header for {}",
                request.uri().path()
            );
            unauthorized()
        }
    }
}

async fn handle_post<P: ToolProvider>(
    State(state): State<HttpState<P>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid JSON body");
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid JSON" })))
                .into_response();
        }
    };

    let Some(response) = state.handler.handle_value(message).await else {
        return StatusCode::ACCEPTED.into_response();
    };

    if accepts_event_stream(&headers) {
        event_stream(&response)
    } else {
        Json(response).into_response()
    }
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("text/event-stream"))
}

/// Frame one response as a single-event SSE body
fn event_stream(response: &JsonRpcResponse) -> Response {
    match Event::default().json_data(response) {
        Ok(event) => {
            Sse::new(stream::once(future::ready(Ok::<_, Infallible>(event)))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode SSE event");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("Shutdown signal received");
}
