//! Response construction shared by all routes.

use crate::config::Environment;
use crate::error::ProxyError;
use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

pub type Body = Full<Bytes>;

pub(crate) fn json(status: StatusCode, value: &serde_json::Value) -> Response<Body> {
    let mut response = Response::new(Full::from(value.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

pub(crate) fn html(status: StatusCode, page: String) -> Response<Body> {
    let mut response = Response::new(Full::from(page));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

pub(crate) fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Allows any origin to call the proxy from a browser.
pub(crate) fn with_cors(mut response: Response<Body>) -> Response<Body> {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

/// Failure of a route, rendered as `{error, details?, stack?}`.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// A required request parameter is missing or malformed.
    BadRequest(String),
    NotFound(String),
    MethodNotAllowed,
    /// Anything that went wrong talking to Twitch. `message` is what clients see.
    Internal {
        message: &'static str,
        source: ProxyError,
    },
}

impl ApiError {
    pub(crate) fn internal(message: &'static str) -> impl FnOnce(ProxyError) -> Self {
        move |source| Self::Internal { message, source }
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn into_response(self, environment: Environment) -> Response<Body> {
        let status = self.status();
        let body = match self {
            Self::BadRequest(error) | Self::NotFound(error) => ErrorBody {
                error,
                details: None,
                stack: None,
            },
            Self::MethodNotAllowed => ErrorBody {
                error: "Method not allowed".to_string(),
                details: None,
                stack: None,
            },
            Self::Internal { message, source } => {
                tracing::error!(error = %source, "{message}");
                // configuration errors keep their own message, even in production
                let error = match &source {
                    ProxyError::Configuration(msg) => (*msg).to_string(),
                    _ => message.to_string(),
                };
                if environment.is_production() {
                    ErrorBody {
                        error,
                        details: None,
                        stack: None,
                    }
                } else {
                    ErrorBody {
                        error,
                        details: Some(source.to_string()),
                        stack: Some(source.chain().join("\n")),
                    }
                }
            }
        };
        json(
            status,
            &serde_json::to_value(body).unwrap_or(serde_json::Value::Null),
        )
    }
}
