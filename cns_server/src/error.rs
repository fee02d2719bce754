//! Maps the core's error taxonomy onto HTTP status codes.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use cns_core::ErrorKind;
use std::fmt;

#[derive(Debug)]
pub struct ApiError(pub cns_core::CnsError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<cns_core::CnsError> for ApiError {
    fn from(e: cns_core::CnsError) -> Self {
        ApiError(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            ErrorKind::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = ErrorBody { kind: self.0.kind().label(), message: self.0.to_string() };
        HttpResponse::build(self.status_code()).json(body)
    }
}
