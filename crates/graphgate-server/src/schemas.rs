//! Built-in schemas served by the connector.
//!
//! Endpoints reference schemas by name; only the names listed here can be
//! served. The `status` schema reports the server version, its uptime and the
//! mounted endpoints.

use std::time::Instant;

use async_graphql::dynamic::{Field, FieldFuture, Object, Schema, SchemaError, TypeRef};
use async_graphql::{Name, Value};
use graphgate_graphql::{EndpointRegistry, NormalizedField, Renderable, Resolved, SchemaRef};
use serde_json::json;

pub const STATUS_SCHEMA: &str = "status";

/// Time since the server started, rendered in whole seconds.
struct Uptime(Instant);

impl Renderable for Uptime {
    fn render(&self) -> String {
        format!("{}s", self.0.elapsed().as_secs())
    }
}

/// Returns every built-in schema with the name endpoints reference it by.
pub fn catalog(
    registry: &EndpointRegistry,
    started: Instant,
) -> Result<Vec<(SchemaRef, Schema)>, SchemaError> {
    Ok(vec![(
        SchemaRef::new(STATUS_SCHEMA),
        status_schema(registry, started)?,
    )])
}

fn status_schema(registry: &EndpointRegistry, started: Instant) -> Result<Schema, SchemaError> {
    let mut endpoints: Vec<serde_json::Value> = registry
        .endpoints()
        .map(|endpoint| {
            json!({
                "route": endpoint.route,
                "path": endpoint.path,
                "schema": endpoint.schema.as_str(),
                "playground": endpoint.playground,
            })
        })
        .collect();
    endpoints.sort_by(|a, b| a["route"].as_str().cmp(&b["route"].as_str()));

    let endpoint_type = Object::new("Endpoint")
        .field(parent_field("route", TypeRef::named_nn(TypeRef::STRING)))
        .field(parent_field("path", TypeRef::named_nn(TypeRef::STRING)))
        .field(parent_field("schema", TypeRef::named_nn(TypeRef::STRING)))
        .field(parent_field("playground", TypeRef::named_nn(TypeRef::BOOLEAN)));

    let query = Object::new("Query")
        .field(
            NormalizedField::new("version", TypeRef::named_nn(TypeRef::STRING), |_| {
                Ok(Some(Resolved::Value(json!(env!("CARGO_PKG_VERSION")))))
            })
            .into_field(),
        )
        .field(
            NormalizedField::new("uptime", TypeRef::named_nn(TypeRef::STRING), move |_| {
                Ok(Some(Resolved::renderable(Uptime(started))))
            })
            .into_field(),
        )
        .field(
            NormalizedField::new(
                "endpoints",
                TypeRef::named_nn_list_nn("Endpoint"),
                move |_| {
                    Ok(Some(Resolved::List(
                        endpoints.iter().cloned().map(Resolved::Value).collect(),
                    )))
                },
            )
            .into_field(),
        );

    Schema::build("Query", None, None)
        .register(endpoint_type)
        .register(query)
        .finish()
}

/// Creates a field resolver that extracts a value from the parent object.
fn parent_field(name: &str, type_ref: TypeRef) -> Field {
    let key = name.to_string();

    Field::new(name, type_ref, move |ctx| {
        let key = key.clone();
        FieldFuture::new(async move {
            if let Some(Value::Object(obj)) = ctx.parent_value.as_value()
                && let Some(value) = obj.get(&Name::new(&key))
            {
                return Ok(Some(value.clone()));
            }
            Ok(None::<Value>)
        })
    })
}
