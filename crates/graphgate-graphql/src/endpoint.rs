//! Endpoints and the endpoint registry.
//!
//! The registry is built once when configuration is loaded and is read-only
//! afterwards, so it can be shared across request tasks behind an `Arc`
//! without locking.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Opaque handle naming the schema an endpoint is served from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaRef(Arc<str>);

impl SchemaRef {
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One configured GraphQL surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Route identifier, unique across the registry.
    pub route: String,

    /// URL path the HTTP router mounts this endpoint on.
    pub path: String,

    /// Schema the engine serves for this endpoint.
    pub schema: SchemaRef,

    /// Whether the explorer page is enabled for this endpoint.
    pub playground: bool,

    /// Publish internal failure detail for requests to this endpoint.
    pub debug: bool,
}

impl Endpoint {
    #[must_use]
    pub fn new(route: impl Into<String>, path: impl Into<String>, schema: SchemaRef) -> Self {
        Self {
            route: route.into(),
            path: path.into(),
            schema,
            playground: false,
            debug: false,
        }
    }

    #[must_use]
    pub fn with_playground(mut self, playground: bool) -> Self {
        self.playground = playground;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Errors raised by the endpoint registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No endpoint is registered for the route.
    #[error("GraphQL endpoint for route \"{route}\" was not registered")]
    EndpointNotFound { route: String },

    /// An endpoint is already registered for the route.
    #[error("GraphQL endpoint for route \"{route}\" is already registered")]
    DuplicateRoute { route: String },
}

/// Mapping from route identifier to endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, Endpoint>,
}

impl EndpointRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a list of endpoints, failing on the first
    /// duplicate route.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRoute`] if two endpoints share a route.
    pub fn from_endpoints(
        endpoints: impl IntoIterator<Item = Endpoint>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for endpoint in endpoints {
            registry.register(endpoint)?;
        }
        Ok(registry)
    }

    /// Registers an endpoint under its route identifier.
    ///
    /// The registry is left unchanged when the route is already taken.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRoute`] if the route is already registered.
    pub fn register(&mut self, endpoint: Endpoint) -> Result<(), RegistryError> {
        match self.endpoints.entry(endpoint.route.clone()) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateRoute {
                route: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(endpoint);
                Ok(())
            }
        }
    }

    /// Resolves a route identifier to its endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EndpointNotFound`] if nothing is registered for `route`.
    pub fn resolve(&self, route: &str) -> Result<&Endpoint, RegistryError> {
        self.endpoints
            .get(route)
            .ok_or_else(|| RegistryError::EndpointNotFound {
                route: route.to_string(),
            })
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
