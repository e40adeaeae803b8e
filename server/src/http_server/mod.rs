use std::{net::SocketAddr, time::Duration};

use axum::{response::Response, Router};
use color_eyre::eyre::WrapErr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use errors::ServerError;

pub(crate) mod cmd;
pub mod errors;
mod routes;
mod trace;

mod api {
    pub mod health;
    pub mod meal_plan;
    pub mod meals;
    pub mod shopping_list;
    pub mod steps;
}

#[cfg(test)]
pub(crate) mod test_helpers;

pub(crate) use routes::make_router;

type ResponseResult<T = Response> = Result<T, ServerError>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wraps the routes with the shared middleware stack.
pub(crate) fn with_layers(routes: Router) -> Router {
    let tracer = trace::Tracer;
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(tracer)
        .on_response(tracer);

    routes
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .layer(trace_layer)
}

pub(crate) async fn run_server(routes: Router, port: u16) -> color_eyre::Result<()> {
    let app = with_layers(routes);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on port {}", port);

    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err("Failed to open port")?;

    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .wrap_err("Failed to run server")
}
