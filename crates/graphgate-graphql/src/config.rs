//! GraphQL configuration.
//!
//! This module provides the `[graphql]` section of `graphgate.toml`.
//!
//! # Example Configuration
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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::endpoint::{Endpoint, EndpointRegistry, RegistryError, SchemaRef};

/// GraphQL layer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQLConfig {
    /// Publish internal failure detail in error responses.
    /// Should be disabled in production.
    /// Default: false
    #[serde(default)]
    pub debug: bool,

    /// Configured endpoints.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// One `[[graphql.endpoints]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Route identifier, unique across endpoints.
    pub route: String,

    /// URL path the endpoint is served on.
    pub path: String,

    /// Name of the schema serving this endpoint.
    pub schema: String,

    /// Enable the explorer page for this endpoint.
    /// Default: false
    #[serde(default)]
    pub playground: bool,

    /// Publish internal failure detail for this endpoint only.
    /// Default: false
    #[serde(default)]
    pub debug: bool,
}

impl EndpointConfig {
    #[must_use]
    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint::new(&self.route, &self.path, SchemaRef::new(&self.schema))
            .with_playground(self.playground)
            .with_debug(self.debug)
    }
}

impl GraphQLConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid or two endpoints
    /// share a path.
    pub fn validate(&self) -> Result<(), String> {
        let mut paths: HashMap<&str, &str> = HashMap::new();
        for (idx, endpoint) in self.endpoints.iter().enumerate() {
            if endpoint.route.trim().is_empty() {
                return Err(format!("graphql.endpoints[{idx}].route must not be empty"));
            }
            if endpoint.schema.trim().is_empty() {
                return Err(format!("graphql.endpoints[{idx}].schema must not be empty"));
            }
            if !endpoint.path.starts_with('/') {
                return Err(format!("graphql.endpoints[{idx}].path must start with '/'"));
            }
            if let Some(owner) = paths.insert(&endpoint.path, &endpoint.route) {
                return Err(format!(
                    "graphql.endpoints[{idx}].path \"{}\" is already used by route \"{owner}\"",
                    endpoint.path
                ));
            }
        }
        Ok(())
    }

    /// Builds the endpoint registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRoute`] if two endpoints share a route.
    pub fn build_registry(&self) -> Result<EndpointRegistry, RegistryError> {
        EndpointRegistry::from_endpoints(self.endpoints.iter().map(EndpointConfig::to_endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(route: &str, path: &str) -> EndpointConfig {
        EndpointConfig {
            route: route.into(),
            path: path.into(),
            schema: "main".into(),
            playground: false,
            debug: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = GraphQLConfig::default();
        assert!(!config.debug);
        assert!(config.endpoints.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            debug = true

            [[endpoints]]
            route = "graphql.public"
            path = "/graphql"
            schema = "public"
            playground = true

            [[endpoints]]
            route = "graphql.admin"
            path = "/admin/graphql"
            schema = "admin"
            debug = true
        "#;

        let config: GraphQLConfig = toml::from_str(toml).unwrap();
        assert!(config.debug);
        assert_eq!(config.endpoints.len(), 2);
        assert!(config.endpoints[0].playground);
        assert!(!config.endpoints[0].debug);
        assert!(!config.endpoints[1].playground);
        assert!(config.endpoints[1].debug);

        let registry = config.build_registry().unwrap();
        let admin = registry.resolve("graphql.admin").unwrap();
        assert_eq!(admin.path, "/admin/graphql");
        assert_eq!(admin.schema.as_str(), "admin");
        assert!(admin.debug);
    }

    #[test]
    fn test_invalid_path() {
        let config = GraphQLConfig {
            debug: false,
            endpoints: vec![endpoint("graphql", "graphql")],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_route() {
        let config = GraphQLConfig {
            debug: false,
            endpoints: vec![endpoint(" ", "/graphql")],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_routes() {
        let config = GraphQLConfig {
            debug: false,
            endpoints: vec![endpoint("graphql", "/a"), endpoint("graphql", "/b")],
        };
        assert!(config.validate().is_ok());
        assert_eq!(
            config.build_registry().unwrap_err(),
            RegistryError::DuplicateRoute {
                route: "graphql".into()
            }
        );
    }

    #[test]
    fn test_duplicate_paths() {
        let config = GraphQLConfig {
            debug: false,
            endpoints: vec![endpoint("a", "/graphql"), endpoint("b", "/graphql")],
        };
        assert_eq!(
            config.validate().unwrap_err(),
            r#"graphql.endpoints[1].path "/graphql" is already used by route "a""#
        );
    }
}
