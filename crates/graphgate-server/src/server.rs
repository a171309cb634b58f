use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::Router;
use graphgate_graphql::{
    AsyncGraphqlConnector, NormalizerChain, RenderableNormalizer, RequestDispatcher,
    graphql_router,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::schemas;

/// Builds the application router from configuration.
///
/// Fails on configuration that can never serve a request, such as two
/// endpoints sharing a route identifier or a path.
pub fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    cfg.graphql
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid graphql configuration: {e}"))?;

    let registry = Arc::new(
        cfg.graphql
            .build_registry()
            .context("invalid graphql endpoint configuration")?,
    );

    let mut connector = AsyncGraphqlConnector::new(NormalizerChain::new().with(RenderableNormalizer));
    let catalog = schemas::catalog(&registry, Instant::now())
        .map_err(|e| anyhow::anyhow!("failed to build built-in schemas: {e}"))?;
    for (name, schema) in catalog {
        connector.register(name, schema);
    }

    for endpoint in registry.endpoints() {
        if !connector.contains(&endpoint.schema) {
            warn!(
                route = %endpoint.route,
                schema = %endpoint.schema,
                "Endpoint references an unknown schema; requests will fail"
            );
        }
    }

    info!(
        endpoints = registry.len(),
        debug = cfg.graphql.debug,
        "GraphQL endpoints registered"
    );

    let dispatcher = RequestDispatcher::new(registry, Arc::new(connector), cfg.graphql.debug);

    Ok(graphql_router(Arc::new(dispatcher)).layer(TraceLayer::new_for_http()))
}

/// Serves the application until Ctrl-C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg)?;
    let addr = cfg.addr();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Graphgate server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Graphgate server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
