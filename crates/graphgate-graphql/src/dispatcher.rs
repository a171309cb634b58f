//! Request dispatching.
//!
//! [`RequestDispatcher::dispatch`] is total: every request yields exactly one
//! [`TransportResponse`]. An unregistered route becomes HTTP 404; any other
//! failure, including a panic inside the engine, becomes a single in-band
//! GraphQL error with `data: null`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::connector::{AdaptedRequest, ConnectorError, EngineConnector};
use crate::endpoint::{Endpoint, EndpointRegistry, RegistryError};
use crate::response::{GraphQLRequestFailure, GraphQLResponse};

/// An HTTP request already matched by the router.
#[derive(Debug, Clone, Default)]
pub struct TransportRequest {
    /// Route identifier attached by the router.
    pub route: Option<String>,
    pub method: Method,
    pub headers: HeaderMap,
    /// Raw URL query string, without the leading `?`.
    pub query_string: Option<String>,
    pub body: Bytes,
}

impl TransportRequest {
    /// A POST request carrying a JSON body.
    #[must_use]
    pub fn post(route: impl Into<String>, body: serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        Self {
            route: Some(route.into()),
            method: Method::POST,
            headers,
            query_string: None,
            body: Bytes::from(body.to_string()),
        }
    }

    /// A GET request with an encoded query string.
    #[must_use]
    pub fn get(route: impl Into<String>, query_string: impl Into<String>) -> Self {
        Self {
            route: Some(route.into()),
            method: Method::GET,
            query_string: Some(query_string.into()),
            ..Self::default()
        }
    }
}

/// Body of a [`TransportResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportBody {
    /// A GraphQL-over-HTTP response.
    GraphQL(GraphQLResponse),

    /// The route has no registered endpoint.
    NotFound(String),
}

/// What the dispatcher hands back to the HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: TransportBody,
}

impl TransportResponse {
    #[must_use]
    pub fn graphql(response: GraphQLResponse) -> Self {
        Self {
            status: response.status_code(),
            body: TransportBody::GraphQL(response),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: TransportBody::NotFound(message.into()),
        }
    }

    #[must_use]
    pub fn graphql_response(&self) -> Option<&GraphQLResponse> {
        match &self.body {
            TransportBody::GraphQL(response) => Some(response),
            TransportBody::NotFound(_) => None,
        }
    }
}

impl IntoResponse for TransportResponse {
    fn into_response(self) -> Response {
        match self.body {
            TransportBody::GraphQL(response) => (
                self.status,
                [(header::CONTENT_TYPE, "application/json")],
                Json(response),
            )
                .into_response(),
            TransportBody::NotFound(message) => (self.status, message).into_response(),
        }
    }
}

/// Errors raised while turning a transport request into an engine request.
#[derive(Debug, Error)]
pub enum AdaptError {
    #[error("Missing GraphQL query")]
    MissingQuery,

    #[error("Invalid GraphQL request body: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Invalid GraphQL variables: {0}")]
    InvalidVariables(#[source] serde_json::Error),

    #[error("Method {0} is not supported for GraphQL requests")]
    UnsupportedMethod(Method),
}

impl AdaptError {
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::UnsupportedMethod(_) => 405,
            _ => 400,
        }
    }
}

#[derive(Debug, Error)]
enum DispatchError {
    #[error("Request was not matched to a named GraphQL route")]
    MissingRoute,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Adapt(#[from] AdaptError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("GraphQL request handling panicked: {0}")]
    Panicked(String),
}

impl DispatchError {
    fn code(&self) -> i64 {
        match self {
            Self::Adapt(err) => err.code(),
            Self::Connector(err) => err.code(),
            Self::MissingRoute | Self::Registry(_) | Self::Panicked(_) => 500,
        }
    }
}

/// GraphQL request body, as sent with POST.
#[derive(Debug, Default, Deserialize)]
struct GraphQLRequest {
    query: Option<String>,

    #[serde(rename = "operationName")]
    operation_name: Option<String>,

    variables: Option<serde_json::Value>,
}

/// Resolves requests to endpoints and executes them through the engine.
pub struct RequestDispatcher {
    registry: Arc<EndpointRegistry>,
    connector: Arc<dyn EngineConnector>,
    debug: bool,
}

impl RequestDispatcher {
    /// Creates a dispatcher. `debug` publishes internal failure detail for
    /// every endpoint.
    pub fn new(
        registry: Arc<EndpointRegistry>,
        connector: Arc<dyn EngineConnector>,
        debug: bool,
    ) -> Self {
        Self {
            registry,
            connector,
            debug,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Dispatches one request. Never fails.
    pub async fn dispatch(&self, request: TransportRequest) -> TransportResponse {
        let endpoint = match self.resolve(&request) {
            Ok(endpoint) => endpoint,
            Err(DispatchError::Registry(err @ RegistryError::EndpointNotFound { .. })) => {
                debug!(error = %err, "No GraphQL endpoint for route");
                return TransportResponse::not_found(err.to_string());
            }
            Err(err) => return self.failure(err, self.debug),
        };

        debug!(
            route = %endpoint.route,
            schema = %endpoint.schema,
            method = %request.method,
            "Dispatching GraphQL request"
        );

        let publish = self.debug || endpoint.debug;
        let result = AssertUnwindSafe(self.execute(endpoint, request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(DispatchError::Panicked(panic_message(panic.as_ref()))));

        match result {
            Ok(response) => TransportResponse::graphql(response),
            Err(err) => self.failure(err, publish),
        }
    }

    fn resolve(&self, request: &TransportRequest) -> Result<&Endpoint, DispatchError> {
        let route = request.route.as_deref().ok_or(DispatchError::MissingRoute)?;
        Ok(self.registry.resolve(route)?)
    }

    async fn execute(
        &self,
        endpoint: &Endpoint,
        request: TransportRequest,
    ) -> Result<GraphQLResponse, DispatchError> {
        let adapted = adapt(request)?;
        Ok(self.connector.execute(&endpoint.schema, adapted).await?)
    }

    fn failure(&self, err: DispatchError, publish: bool) -> TransportResponse {
        let code = err.code();
        warn!(error = %err, code, published = publish, "GraphQL request failed");

        let mut failure = GraphQLRequestFailure::from_cause(err, code);
        if publish {
            failure.publish();
        }

        TransportResponse::graphql(GraphQLResponse::from_failure(&failure))
    }
}

/// Builds the engine view of a transport request.
fn adapt(request: TransportRequest) -> Result<AdaptedRequest, AdaptError> {
    let body = match request.method {
        Method::GET => params_to_request(request.query_string.as_deref().unwrap_or_default())?,
        Method::POST => {
            serde_json::from_slice::<GraphQLRequest>(&request.body).map_err(AdaptError::InvalidBody)?
        }
        other => return Err(AdaptError::UnsupportedMethod(other)),
    };

    let query = body
        .query
        .filter(|query| !query.trim().is_empty())
        .ok_or(AdaptError::MissingQuery)?;

    Ok(AdaptedRequest {
        method: request.method,
        query,
        operation_name: body.operation_name.filter(|name| !name.is_empty()),
        variables: body.variables.filter(|vars| !vars.is_null()),
        headers: request.headers,
    })
}

/// Decodes GET query parameters into a GraphQL request.
fn params_to_request(query_string: &str) -> Result<GraphQLRequest, AdaptError> {
    let mut request = GraphQLRequest::default();

    for (key, value) in url::form_urlencoded::parse(query_string.as_bytes()) {
        match key.as_ref() {
            "query" => request.query = Some(value.into_owned()),
            "operationName" => request.operation_name = Some(value.into_owned()),
            "variables" => {
                request.variables =
                    Some(serde_json::from_str(&value).map_err(AdaptError::InvalidVariables)?);
            }
            _ => {}
        }
    }

    Ok(request)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_adapt_post_body() {
        let request = TransportRequest::post(
            "graphql",
            json!({
                "query": "{ _health }",
                "operationName": "GetHealth",
                "variables": {"foo": "bar"}
            }),
        );

        let adapted = adapt(request).unwrap();
        assert_eq!(adapted.method, Method::POST);
        assert_eq!(adapted.query, "{ _health }");
        assert_eq!(adapted.operation_name, Some("GetHealth".to_string()));
        assert_eq!(adapted.variables, Some(json!({"foo": "bar"})));
        assert_eq!(
            adapted.headers.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_adapt_get_params() {
        let request = TransportRequest::get(
            "graphql",
            "query=%7B%20_health%20%7D&operationName=GetHealth&variables=%7B%22foo%22%3A%22bar%22%7D",
        );

        let adapted = adapt(request).unwrap();
        assert_eq!(adapted.method, Method::GET);
        assert_eq!(adapted.query, "{ _health }");
        assert_eq!(adapted.operation_name, Some("GetHealth".to_string()));
        assert_eq!(adapted.variables, Some(json!({"foo": "bar"})));
    }

    #[test]
    fn test_adapt_null_variables() {
        let request = TransportRequest::post("graphql", json!({"query": "{ a }", "variables": null}));
        assert!(adapt(request).unwrap().variables.is_none());
    }

    #[test]
    fn test_adapt_invalid_variables() {
        let request = TransportRequest::get("graphql", "query=%7Ba%7D&variables=not%20json");
        let err = adapt(request).unwrap_err();
        assert!(matches!(err, AdaptError::InvalidVariables(_)));
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn test_adapt_missing_query() {
        let request = TransportRequest::post("graphql", json!({"query": "  "}));
        assert!(matches!(adapt(request), Err(AdaptError::MissingQuery)));

        let request = TransportRequest::get("graphql", "");
        assert!(matches!(adapt(request), Err(AdaptError::MissingQuery)));
    }

    #[test]
    fn test_adapt_invalid_body() {
        let mut request = TransportRequest::post("graphql", json!({}));
        request.body = Bytes::from_static(b"not json");
        assert!(matches!(adapt(request), Err(AdaptError::InvalidBody(_))));
    }

    #[test]
    fn test_adapt_unsupported_method() {
        let mut request = TransportRequest::post("graphql", json!({"query": "{ a }"}));
        request.method = Method::PUT;
        let err = adapt(request).unwrap_err();
        assert_eq!(err.code(), 405);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");

        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "Unknown panic");
    }

    #[test]
    fn test_dispatch_error_codes() {
        let not_found = DispatchError::from(RegistryError::EndpointNotFound {
            route: "graphql".into(),
        });
        assert_eq!(not_found.code(), 500);
        assert_eq!(DispatchError::MissingRoute.code(), 500);
        assert_eq!(DispatchError::Panicked("boom".into()).code(), 500);
        assert_eq!(DispatchError::from(AdaptError::MissingQuery).code(), 400);
    }

    #[tokio::test]
    async fn test_not_found_response_has_plain_body() {
        let response = TransportResponse::not_found("missing").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"missing");
    }
}
