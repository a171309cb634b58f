//! Axum HTTP handlers for GraphQL endpoints.
//!
//! Every configured endpoint is mounted on its own path for `GET` and `POST`.
//! The router attaches the endpoint's route identifier as a [`RouteName`]
//! extension, which the dispatcher resolves back to the endpoint.

use std::fmt;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Extension, RawQuery, State};
use axum::http::{HeaderMap, Method};
use axum::response::IntoResponse;
use axum::routing::get;
use tracing::debug;

use crate::dispatcher::{RequestDispatcher, TransportRequest};

/// Route identifier attached to a mounted endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteName(Arc<str>);

impl RouteName {
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handles `GET` and `POST` requests to a GraphQL endpoint.
///
/// The body is taken as raw bytes so that malformed input is reported as a
/// GraphQL error by the dispatcher rather than rejected by an extractor.
pub async fn graphql_handler(
    State(dispatcher): State<Arc<RequestDispatcher>>,
    route: Option<Extension<RouteName>>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query_string): RawQuery,
    body: Bytes,
) -> impl IntoResponse {
    let route = route.map(|Extension(name)| name.as_str().to_string());
    debug!(route = ?route, method = %method, "Processing GraphQL request");

    let request = TransportRequest {
        route,
        method,
        headers,
        query_string,
        body,
    };

    dispatcher.dispatch(request).await
}

/// Builds a router mounting every registered endpoint.
pub fn graphql_router(dispatcher: Arc<RequestDispatcher>) -> Router {
    let mut router = Router::new();

    for endpoint in dispatcher.registry().endpoints() {
        debug!(
            route = %endpoint.route,
            path = %endpoint.path,
            schema = %endpoint.schema,
            "Mounting GraphQL endpoint"
        );
        router = router.route(
            &endpoint.path,
            get(graphql_handler)
                .post(graphql_handler)
                .layer(Extension(RouteName::new(&endpoint.route))),
        );
    }

    router.with_state(dispatcher)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::connector::{AdaptedRequest, Connection, ConnectorError, EngineConnector};
    use crate::endpoint::{Endpoint, EndpointRegistry, SchemaRef};
    use crate::response::GraphQLResponse;

    /// Echoes the request back as data.
    struct EchoConnector;

    struct EchoConnection(SchemaRef);

    #[async_trait]
    impl Connection for EchoConnection {
        async fn request(
            &mut self,
            request: AdaptedRequest,
        ) -> Result<GraphQLResponse, ConnectorError> {
            Ok(GraphQLResponse::success(json!({
                "schema": self.0.as_str(),
                "query": request.query,
            })))
        }
    }

    #[async_trait]
    impl EngineConnector for EchoConnector {
        async fn connect(
            &self,
            schema: &SchemaRef,
        ) -> Result<Box<dyn Connection>, ConnectorError> {
            Ok(Box::new(EchoConnection(schema.clone())))
        }
    }

    fn router() -> Router {
        let registry = EndpointRegistry::from_endpoints([
            Endpoint::new("graphql.public", "/graphql", SchemaRef::new("public")),
            Endpoint::new("graphql.admin", "/admin/graphql", SchemaRef::new("admin")),
        ])
        .unwrap();
        let dispatcher = RequestDispatcher::new(Arc::new(registry), Arc::new(EchoConnector), false);
        graphql_router(Arc::new(dispatcher))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_post_routes_to_endpoint_schema() {
        let request = Request::post("/admin/graphql")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"query": "{ users }"}).to_string()))
            .unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            body_json(response).await,
            json!({"data": {"schema": "admin", "query": "{ users }"}, "errors": []})
        );
    }

    #[tokio::test]
    async fn test_get_routes_to_endpoint_schema() {
        let request = Request::get("/graphql?query=%7B%20ping%20%7D")
            .body(Body::empty())
            .unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["data"],
            json!({"schema": "public", "query": "{ ping }"})
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_graphql_error() {
        let request = Request::post("/graphql")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{"))
            .unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["data"], serde_json::Value::Null);
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
        assert_eq!(body["errors"][0]["message"], "Internal Server Error");
        assert_eq!(body["errors"][0]["code"], 400);
    }

    #[tokio::test]
    async fn test_unmounted_path_is_router_404() {
        let request = Request::get("/nowhere").body(Body::empty()).unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_route_without_endpoint_is_404() {
        let dispatcher = Arc::new(RequestDispatcher::new(
            Arc::new(EndpointRegistry::new()),
            Arc::new(EchoConnector),
            false,
        ));
        let router = Router::new()
            .route(
                "/stale",
                get(graphql_handler).layer(Extension(RouteName::new("graphql.stale"))),
            )
            .with_state(dispatcher);

        let request = Request::get("/stale?query=%7Ba%7D").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "GraphQL endpoint for route \"graphql.stale\" was not registered"
        );
    }
}
