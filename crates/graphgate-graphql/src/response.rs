//! Response model for GraphQL-over-HTTP.
//!
//! A [`GraphQLResponse`] serializes as `{"data": ..., "errors": [...]}`. The
//! `errors` array is always present and empty on success; `data` is `null`
//! when execution never started.

use std::error::Error as StdError;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Message shown in place of the real one when a failure is suppressed.
pub const SUPPRESSED_MESSAGE: &str = "Internal Server Error";

/// A location in the GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// One entry of the top-level `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseError {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<String>>,
}

impl ResponseError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Result of one GraphQL execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQLResponse {
    pub data: Option<serde_json::Value>,

    pub errors: Vec<ResponseError>,

    #[serde(skip)]
    pub status: StatusCode,
}

impl GraphQLResponse {
    /// Creates a successful response carrying `data`.
    #[must_use]
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            data: if data.is_null() { None } else { Some(data) },
            errors: Vec::new(),
            status: StatusCode::OK,
        }
    }

    /// Creates a response carrying exactly one request failure and no data.
    ///
    /// GraphQL errors are reported in-band, so the status stays 200.
    #[must_use]
    pub fn from_failure(failure: &GraphQLRequestFailure) -> Self {
        Self {
            data: None,
            errors: vec![failure.to_response_error()],
            status: StatusCode::OK,
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ResponseError>) -> Self {
        self.errors = errors;
        self
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

type BoxError = Box<dyn StdError + Send + Sync>;

/// A fault raised while dispatching or executing a request.
///
/// Rendered either published (original message plus the cause chain) or
/// suppressed (generic message only).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GraphQLRequestFailure {
    message: String,
    code: i64,
    #[source]
    cause: Option<BoxError>,
    published: bool,
}

impl GraphQLRequestFailure {
    pub fn new(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code,
            cause: None,
            published: false,
        }
    }

    /// Wraps `cause`, keeping its message.
    pub fn from_cause(cause: impl StdError + Send + Sync + 'static, code: i64) -> Self {
        Self {
            message: cause.to_string(),
            code,
            cause: Some(Box::new(cause)),
            published: false,
        }
    }

    /// Marks the failure for publication with its internal detail.
    pub fn publish(&mut self) {
        self.published = true;
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.published
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn code(&self) -> i64 {
        self.code
    }

    /// Messages of the cause and each of its sources, outermost first.
    #[must_use]
    pub fn trace(&self) -> Vec<String> {
        let mut trace = Vec::new();
        let mut current = self
            .cause
            .as_ref()
            .map(|cause| cause.as_ref() as &(dyn StdError + 'static));
        while let Some(err) = current {
            trace.push(err.to_string());
            current = err.source();
        }
        trace
    }

    #[must_use]
    pub fn to_response_error(&self) -> ResponseError {
        if self.published {
            ResponseError {
                message: self.message.clone(),
                code: Some(self.code),
                trace: Some(self.trace()),
                ..ResponseError::default()
            }
        } else {
            ResponseError {
                message: SUPPRESSED_MESSAGE.to_string(),
                code: Some(self.code),
                ..ResponseError::default()
            }
        }
    }
}
