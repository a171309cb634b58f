//! async-graphql implementation of the engine connector.
//!
//! Schemas are built by the application with the async-graphql dynamic API
//! and registered under a [`SchemaRef`]. Fields whose resolvers may return
//! values needing normalization are built with [`NormalizedField`]; the
//! connector injects its [`NormalizerChain`] into every request so those
//! resolvers can find it.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, ResolverContext, Schema, TypeRef};
use async_graphql::{Request, ServerError, Value, Variables};
use async_trait::async_trait;
use tracing::debug;

use crate::connector::{AdaptedRequest, Connection, ConnectorError, EngineConnector};
use crate::endpoint::SchemaRef;
use crate::normalizer::{NormalizationContext, NormalizerChain, Resolved};
use crate::response::{GraphQLResponse, Location, ResponseError};

const BUILTIN_SCALARS: [&str; 5] = [
    TypeRef::STRING,
    TypeRef::INT,
    TypeRef::FLOAT,
    TypeRef::BOOLEAN,
    TypeRef::ID,
];

type Resolver = dyn for<'a> Fn(&ResolverContext<'a>) -> async_graphql::Result<Option<Resolved>>
    + Send
    + Sync;

/// A dynamic schema field whose result passes through the normalizer chain.
///
/// The normalization context is derived from the field type: the position is
/// a list if any list wrapper is present, and a scalar if the named type is a
/// built-in scalar or the field was marked with [`custom_scalar`](Self::custom_scalar).
pub struct NormalizedField {
    name: String,
    ty: TypeRef,
    context: NormalizationContext,
    resolver: Arc<Resolver>,
}

impl NormalizedField {
    pub fn new<F>(name: impl Into<String>, ty: TypeRef, resolver: F) -> Self
    where
        F: for<'a> Fn(&ResolverContext<'a>) -> async_graphql::Result<Option<Resolved>>
            + Send
            + Sync
            + 'static,
    {
        let scalar = named_type(&ty);
        let context = NormalizationContext::new(
            BUILTIN_SCALARS.iter().any(|builtin| *builtin == scalar),
            is_list(&ty),
        );
        Self {
            name: name.into(),
            ty,
            context,
            resolver: Arc::new(resolver),
        }
    }

    /// Marks the field's named type as a custom scalar.
    #[must_use]
    pub fn custom_scalar(mut self) -> Self {
        self.context.is_scalar = true;
        self
    }

    #[must_use]
    pub fn context(&self) -> NormalizationContext {
        self.context
    }

    #[must_use]
    pub fn into_field(self) -> Field {
        let Self {
            name,
            ty,
            context,
            resolver,
        } = self;

        Field::new(name, ty, move |ctx| {
            let resolver = resolver.clone();
            FieldFuture::new(async move {
                let Some(value) = resolver(&ctx)? else {
                    return Ok(None);
                };
                let value = match ctx.data_opt::<Arc<NormalizerChain>>() {
                    Some(chain) => chain.apply(value, &context),
                    None => value,
                };
                Ok(Some(into_field_value(value)?))
            })
        })
    }
}

fn named_type(ty: &TypeRef) -> &str {
    match ty {
        TypeRef::Named(name) => name.as_ref(),
        TypeRef::NonNull(inner) | TypeRef::List(inner) => named_type(inner),
    }
}

fn is_list(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Named(_) => false,
        TypeRef::NonNull(inner) => is_list(inner),
        TypeRef::List(_) => true,
    }
}

/// Converts a resolved value into what the engine serializes.
///
/// Renderables left unnormalized become owned parent values, so object
/// fields below them can downcast to `Arc<dyn Renderable>`.
fn into_field_value<'a>(value: Resolved) -> async_graphql::Result<FieldValue<'a>> {
    Ok(match value {
        Resolved::Value(json) => FieldValue::value(Value::from_json(json)?),
        Resolved::List(items) => FieldValue::list(
            items
                .into_iter()
                .map(into_field_value)
                .collect::<async_graphql::Result<Vec<_>>>()?,
        ),
        Resolved::Renderable(renderable) => FieldValue::owned_any(renderable),
    })
}

/// Engine connector backed by async-graphql dynamic schemas.
#[derive(Default)]
pub struct AsyncGraphqlConnector {
    schemas: HashMap<SchemaRef, Schema>,
    normalizers: Arc<NormalizerChain>,
}

impl AsyncGraphqlConnector {
    #[must_use]
    pub fn new(normalizers: NormalizerChain) -> Self {
        Self {
            schemas: HashMap::new(),
            normalizers: Arc::new(normalizers),
        }
    }

    #[must_use]
    pub fn with_schema(mut self, name: SchemaRef, schema: Schema) -> Self {
        self.register(name, schema);
        self
    }

    /// Registers `schema` under `name`, replacing any previous one.
    pub fn register(&mut self, name: SchemaRef, schema: Schema) {
        self.schemas.insert(name, schema);
    }

    #[must_use]
    pub fn contains(&self, name: &SchemaRef) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &SchemaRef> {
        self.schemas.keys()
    }
}

#[async_trait]
impl EngineConnector for AsyncGraphqlConnector {
    async fn connect(&self, schema: &SchemaRef) -> Result<Box<dyn Connection>, ConnectorError> {
        let engine = self
            .schemas
            .get(schema)
            .ok_or_else(|| ConnectorError::UnknownSchema(schema.clone()))?;

        Ok(Box::new(AsyncGraphqlConnection {
            schema: engine.clone(),
            normalizers: self.normalizers.clone(),
        }))
    }
}

struct AsyncGraphqlConnection {
    schema: Schema,
    normalizers: Arc<NormalizerChain>,
}

#[async_trait]
impl Connection for AsyncGraphqlConnection {
    async fn request(
        &mut self,
        request: AdaptedRequest,
    ) -> Result<GraphQLResponse, ConnectorError> {
        let mut gql_request = Request::new(request.query);

        if let Some(op_name) = request.operation_name {
            gql_request = gql_request.operation_name(op_name);
        }

        if let Some(vars) = request.variables {
            gql_request = gql_request.variables(Variables::from_json(vars));
        }

        gql_request = gql_request
            .data(self.normalizers.clone())
            .data(request.headers);

        let response = self.schema.execute(gql_request).await;
        debug!(errors = response.errors.len(), "GraphQL execution finished");

        let data = response.data.into_json().map_err(ConnectorError::execution)?;
        let errors = response.errors.into_iter().map(engine_error).collect();

        Ok(GraphQLResponse::success(data).with_errors(errors))
    }
}

/// Passes an engine-reported error through without reinterpreting it.
fn engine_error(error: ServerError) -> ResponseError {
    let extensions = error
        .extensions
        .as_ref()
        .and_then(|ext| match serde_json::to_value(ext) {
            Ok(serde_json::Value::Object(map)) if !map.is_empty() => Some(map),
            _ => None,
        });

    ResponseError {
        message: error.message,
        locations: error
            .locations
            .iter()
            .map(|pos| Location {
                line: pos.line,
                column: pos.column,
            })
            .collect(),
        path: error
            .path
            .iter()
            .filter_map(|segment| serde_json::to_value(segment).ok())
            .collect(),
        extensions,
        ..ResponseError::default()
    }
}
