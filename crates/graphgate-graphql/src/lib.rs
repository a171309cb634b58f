//! # graphgate-graphql
//!
//! GraphQL endpoint dispatching for the Graphgate server.
//!
//! This crate binds HTTP routes to independently configured GraphQL endpoints
//! and delegates execution to an external engine (async-graphql dynamic
//! schemas). It supports:
//!
//! - A read-only registry mapping route identifiers to endpoints
//! - An ordered chain of pluggable normalizers for resolver results
//! - A connector contract for the execution engine, with an async-graphql adapter
//! - A dispatcher that always produces exactly one GraphQL-over-HTTP response
//!
//! ## Overview
//!
//! The router attaches a [`RouteName`] to every mounted endpoint. The
//! [`RequestDispatcher`] resolves that name through the [`EndpointRegistry`],
//! adapts the HTTP request, and executes it through an [`EngineConnector`].
//! Any failure along the way is converted into a single in-band GraphQL
//! error; an unregistered route is the only case surfaced as HTTP 404.
//!
//! ## Configuration
//!
//! ```toml
//! [graphql]
//! debug = false
//!
//! [[graphql.endpoints]]
//! route = "graphql.status"
//! path = "/graphql"
//! schema = "status"
//! playground = true
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration section types
//! - [`endpoint`] - Endpoints and the endpoint registry
//! - [`normalizer`] - Resolver result normalization
//! - [`connector`] - Engine connector contract
//! - [`engine`] - async-graphql implementation of the connector
//! - [`response`] - Response model and request failures
//! - [`dispatcher`] - Request dispatching
//! - [`handler`] - Axum HTTP handlers

pub mod config;
pub mod connector;
pub mod dispatcher;
pub mod endpoint;
pub mod engine;
pub mod handler;
pub mod normalizer;
pub mod response;

// Re-export main types
pub use config::{EndpointConfig, GraphQLConfig};
pub use connector::{AdaptedRequest, Connection, ConnectorError, EngineConnector};
pub use dispatcher::{RequestDispatcher, TransportBody, TransportRequest, TransportResponse};
pub use endpoint::{Endpoint, EndpointRegistry, RegistryError, SchemaRef};
pub use engine::{AsyncGraphqlConnector, NormalizedField};
pub use handler::{RouteName, graphql_handler, graphql_router};
pub use normalizer::{
    NormalizationContext, Normalizer, NormalizerChain, Renderable, RenderableNormalizer, Resolved,
};
pub use response::{GraphQLRequestFailure, GraphQLResponse, Location, ResponseError};
