//! Typed errors and HTTP mapping.

use crate::response::{error_body, RetCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("descriptor {record}: {message}")]
    Descriptor { record: &'static str, message: String },
}

/// Classification the gateway attaches to every backend failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreErrorKind {
    Unique,
    NotFound,
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreErrorKind::Unique => "unique violation",
            StoreErrorKind::NotFound => "not found",
            StoreErrorKind::Other => "backend error",
        })
    }
}

#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn unique(message: impl Into<String>) -> Self {
        StoreError {
            kind: StoreErrorKind::Unique,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        StoreError {
            kind: StoreErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        StoreError {
            kind: StoreErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn ret_code(&self) -> RetCode {
        match self.kind {
            StoreErrorKind::Unique => RetCode::Forbidden,
            StoreErrorKind::NotFound => RetCode::NotFound,
            StoreErrorKind::Other => RetCode::InternalServerError,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let kind = match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreErrorKind::Unique,
            sqlx::Error::RowNotFound => StoreErrorKind::NotFound,
            _ => StoreErrorKind::Other,
        };
        StoreError {
            kind,
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::other(format!("decode: {}", e))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    UnknownRelation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("could not create related resource {relation}[{index}]: {source}")]
    Child {
        relation: &'static str,
        index: usize,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    pub fn ret_code(&self) -> RetCode {
        match self {
            AppError::Config(_) => RetCode::InternalServerError,
            AppError::BadRequest(_) | AppError::UnknownRelation(_) => RetCode::BadRequest,
            AppError::NotFound(_) => RetCode::NotFound,
            AppError::Store(e) | AppError::Child { source: e, .. } => e.ret_code(),
        }
    }

    fn details(&self) -> Option<Value> {
        let details = match self {
            AppError::Store(e) => json!({ "kind": e.kind.to_string() }),
            AppError::Child {
                relation,
                index,
                source,
            } => json!({
                "relation": relation,
                "index": index,
                "kind": source.kind.to_string(),
            }),
            _ => return None,
        };
        Some(details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.ret_code();
        if code == RetCode::InternalServerError {
            tracing::error!(error = %self, "request failed");
        }
        error_body(code, self.to_string(), self.details()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn store_errors_map_by_kind() {
        assert_eq!(AppError::from(StoreError::unique("dup")).ret_code(), RetCode::Forbidden);
        assert_eq!(AppError::from(StoreError::not_found("gone")).ret_code(), RetCode::NotFound);
        assert_eq!(
            AppError::from(StoreError::other("io")).ret_code(),
            RetCode::InternalServerError
        );
    }

    #[test]
    fn row_not_found_is_classified() {
        let e = StoreError::from(sqlx::Error::RowNotFound);
        assert_eq!(e.kind, StoreErrorKind::NotFound);
        let e = StoreError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(e.kind, StoreErrorKind::Other);
    }

    #[test]
    fn child_failure_keeps_classification_and_position() {
        let err = AppError::Child {
            relation: "contact",
            index: 1,
            source: StoreError::unique("email"),
        };
        assert_eq!(err.ret_code(), RetCode::Forbidden);
        let details = err.details().unwrap();
        assert_eq!(details["relation"], "contact");
        assert_eq!(details["index"], 1);
    }

    #[test]
    fn client_errors_are_not_internal() {
        assert_eq!(AppError::BadRequest("invalid id".into()).ret_code(), RetCode::BadRequest);
        assert_eq!(AppError::UnknownRelation("x".into()).ret_code(), RetCode::BadRequest);
        let config = AppError::from(ConfigError::Descriptor {
            record: "customer",
            message: "relation 'x' not declared".into(),
        });
        assert_eq!(config.ret_code(), RetCode::InternalServerError);
        assert!(config.details().is_none());
    }

    #[test]
    fn into_response_uses_envelope_status() {
        let res = AppError::NotFound("7".into()).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = AppError::from(StoreError::unique("dup")).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
