//! Standard response envelope: `{ code, message, data }` with a fixed code vocabulary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Stable return codes carried in every envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RetCode {
    SuccessOK,
    SuccessCreated,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    UnprocessableEntity,
    InternalServerError,
    ServiceUnavailable,
}

impl RetCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetCode::SuccessOK => "200",
            RetCode::SuccessCreated => "201",
            RetCode::BadRequest => "400",
            RetCode::Unauthorized => "401",
            RetCode::Forbidden => "403",
            RetCode::NotFound => "404",
            RetCode::UnprocessableEntity => "422",
            RetCode::InternalServerError => "500",
            RetCode::ServiceUnavailable => "503",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RetCode::SuccessOK => StatusCode::OK,
            RetCode::SuccessCreated => StatusCode::CREATED,
            RetCode::BadRequest => StatusCode::BAD_REQUEST,
            RetCode::Unauthorized => StatusCode::UNAUTHORIZED,
            RetCode::Forbidden => StatusCode::FORBIDDEN,
            RetCode::NotFound => StatusCode::NOT_FOUND,
            RetCode::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            RetCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            RetCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl Serialize for RetCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T = Value> {
    pub code: RetCode,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(code: RetCode, message: impl Into<String>, data: T) -> Self {
        Envelope {
            code,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

pub fn success<T: Serialize>(message: &str, data: T) -> Envelope<T> {
    Envelope::new(RetCode::SuccessOK, message, data)
}

pub fn error_body(code: RetCode, message: String, data: Option<Value>) -> Envelope {
    Envelope::new(code, message, data.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_as_strings() {
        let env = success("ok", 5u64);
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v, serde_json::json!({ "code": "200", "message": "ok", "data": 5 }));
    }

    #[test]
    fn status_mapping_follows_code() {
        assert_eq!(RetCode::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(RetCode::UnprocessableEntity.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(RetCode::ServiceUnavailable.as_str(), "503");
    }

    #[test]
    fn error_body_defaults_data_to_null() {
        let env = error_body(RetCode::NotFound, "No resource found".into(), None);
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["code"], "404");
        assert!(v["data"].is_null());
    }

    #[test]
    fn envelope_response_carries_status() {
        let res = Envelope::new(RetCode::BadRequest, "invalid id", Value::Null).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
