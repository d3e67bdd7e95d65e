// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Error types for Cosmos DB operations.

use std::{fmt, time::Duration};

use azure_core::http::{headers::Headers, Method, StatusCode};
use bytes::Bytes;
use serde::Deserialize;
use url::Url;

use crate::{constants, request::OperationKind};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by Cosmos DB operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The connection is missing a bound credential or a required setting.
    #[error("connection is not initialized: {0}")]
    NotInitialized(String),

    /// A response body could not be parsed, or a request header value could not be formatted.
    #[error("{message}")]
    Format { message: String, raw: Bytes },

    /// The service returned a non-success status.
    ///
    /// Throttled (429) responses are retried internally and only surface here once the retry
    /// budget is exhausted.
    #[error(transparent)]
    Server(Box<ServerError>),

    /// The caller cancelled the operation.
    #[error("operation was cancelled")]
    Cancelled,

    /// The token credential failed to produce an access token.
    #[error("failed to acquire an access token: {message}")]
    Credential {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The token credential did not answer within the configured timeout.
    #[error("access token acquisition timed out after {0:?}")]
    CredentialTimeout(Duration),

    /// The transport failed before a full response was received.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// An outgoing payload could not be serialized.
    #[error("failed to serialize request payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn transport(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Transport(Box::new(error))
    }

    /// The HTTP status of the failed response, if the error came from the service.
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            Error::Server(e) => Some(e.status),
            _ => None,
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.http_status() == Some(StatusCode::TooManyRequests)
    }

    pub fn as_server_error(&self) -> Option<&ServerError> {
        match self {
            Error::Server(e) => Some(e),
            _ => None,
        }
    }
}

/// Identifies the request that produced a [`ServerError`].
///
/// Never carries the access token.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSummary {
    pub method: Method,
    pub url: Url,
    pub kind: OperationKind,
    pub collection: String,
    /// The partition key header value, if one was sent.
    pub partition_key: Option<String>,
}

/// A failure response from the service.
#[derive(Clone, Debug)]
pub struct ServerError {
    pub status: StatusCode,
    pub code: Option<String>,
    pub message: Option<String>,
    pub activity_id: Option<String>,
    pub charge: i64,
    pub request: RequestSummary,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl ServerError {
    pub(crate) fn from_response(
        status: StatusCode,
        headers: &Headers,
        body: &[u8],
        charge: i64,
        request: RequestSummary,
    ) -> Self {
        let (code, message) = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(body) => (body.code, body.message),
            Err(_) if body.is_empty() => (None, None),
            Err(_) => (None, Some(String::from_utf8_lossy(body).into_owned())),
        };
        Self {
            status,
            code,
            message,
            activity_id: headers.get_optional_string(&constants::ACTIVITY_ID),
            charge,
            request,
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} failed with status {}",
            self.request.method,
            self.request.url,
            u16::from(self.status)
        )?;
        if let Some(code) = &self.code {
            write!(f, " ({})", code)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServerError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RequestSummary {
        RequestSummary {
            method: Method::Patch,
            url: "https://acct.documents.azure.com/dbs/db/colls/docs/docs/1"
                .parse()
                .unwrap(),
            kind: OperationKind::Document,
            collection: "docs".into(),
            partition_key: Some(r#"["a"]"#.into()),
        }
    }

    #[test]
    fn server_error_parses_code_and_message() {
        let mut headers = Headers::new();
        headers.insert(constants::ACTIVITY_ID, "abc");
        let error = ServerError::from_response(
            StatusCode::PreconditionFailed,
            &headers,
            br#"{"code":"PreconditionFailed","message":"Operation cannot be performed."}"#,
            1,
            summary(),
        );
        assert_eq!(error.code.as_deref(), Some("PreconditionFailed"));
        assert_eq!(error.activity_id.as_deref(), Some("abc"));
        let text = error.to_string();
        assert!(text.starts_with("PATCH https://acct.documents.azure.com/"));
        assert!(text.contains("412 (PreconditionFailed)"));
    }

    #[test]
    fn server_error_keeps_unparseable_body_as_message() {
        let error = ServerError::from_response(
            StatusCode::ServiceUnavailable,
            &Headers::new(),
            b"upstream unavailable",
            -1,
            summary(),
        );
        assert_eq!(error.code, None);
        assert_eq!(error.message.as_deref(), Some("upstream unavailable"));
    }

    #[test]
    fn http_status_accessors() {
        let error = Error::Server(Box::new(ServerError::from_response(
            StatusCode::TooManyRequests,
            &Headers::new(),
            b"",
            -1,
            summary(),
        )));
        assert!(error.is_throttled());
        assert!(error.as_server_error().is_some());
        assert_eq!(Error::Cancelled.http_status(), None);
    }
}
