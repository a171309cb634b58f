//! Engine connector contract.
//!
//! The connector is the adapter boundary to the GraphQL execution engine. It
//! does not implement GraphQL semantics and does not catch failures: every
//! error raised while connecting or executing is returned to the caller.

use std::error::Error as StdError;

use async_trait::async_trait;
use axum::http::{HeaderMap, Method};
use thiserror::Error;

use crate::endpoint::SchemaRef;
use crate::response::GraphQLResponse;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Transport-independent view of an incoming GraphQL request.
#[derive(Debug, Clone, Default)]
pub struct AdaptedRequest {
    pub method: Method,
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

impl AdaptedRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    #[must_use]
    pub fn with_variables(mut self, variables: serde_json::Value) -> Self {
        self.variables = Some(variables);
        self
    }
}

/// Errors raised by an engine connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The engine does not serve the requested schema.
    #[error("Schema \"{0}\" is not available")]
    UnknownSchema(SchemaRef),

    /// Opening a connection failed.
    #[error("Failed to connect to schema \"{schema}\"")]
    Connect {
        schema: SchemaRef,
        #[source]
        source: BoxError,
    },

    /// The engine failed while executing the request.
    #[error("GraphQL execution failed")]
    Execution(#[source] BoxError),
}

impl ConnectorError {
    pub fn execution(source: impl Into<BoxError>) -> Self {
        Self::Execution(source.into())
    }

    /// Numeric code reported with the wrapped failure.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::UnknownSchema(_) => 500,
            Self::Connect { .. } => 503,
            Self::Execution(_) => 500,
        }
    }
}

/// One logical connection to the engine for a single schema.
#[async_trait]
pub trait Connection: Send {
    /// Issues one request.
    async fn request(&mut self, request: AdaptedRequest)
    -> Result<GraphQLResponse, ConnectorError>;
}

/// Opens engine connections.
#[async_trait]
pub trait EngineConnector: Send + Sync {
    /// Opens a connection serving `schema`.
    async fn connect(&self, schema: &SchemaRef) -> Result<Box<dyn Connection>, ConnectorError>;

    /// Connects and issues one request.
    ///
    /// The connection is scoped to this call and released on every exit
    /// path, including errors.
    async fn execute(
        &self,
        schema: &SchemaRef,
        request: AdaptedRequest,
    ) -> Result<GraphQLResponse, ConnectorError> {
        let mut connection = self.connect(schema).await?;
        connection.request(request).await
    }
}
