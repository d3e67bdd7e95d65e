// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use azure_core::http::{headers::Headers, RawResponse, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    constants, error::ServerError, CosmosConnection, Error, ErrorPolicy, RequestDescriptor,
};

/// The settled outcome of one logical operation, after all of its throttle retries.
#[derive(Clone, Debug)]
pub struct ResponseRecord<T = Value> {
    /// `true` for 2xx responses and for 304 (Not Modified).
    pub is_success: bool,
    pub status: StatusCode,
    /// Request units consumed, rounded down. `-1` when the service did not report a charge.
    pub charge: i64,
    /// The deserialized body; `None` when the response had no body.
    pub body: Option<T>,
    /// Present exactly when the service returned `x-ms-continuation`.
    pub continuation: Option<String>,
    pub session_token: Option<String>,
    pub activity_id: Option<String>,
    /// Every response header, when the connection collects them.
    pub headers: Option<ResponseHeaders>,
    /// The failure, for records returned under [`ErrorPolicy::Continue`].
    pub error: Option<Box<ServerError>>,
}

impl<T> ResponseRecord<T> {
    pub fn into_body(self) -> Option<T> {
        self.body
    }
}

/// Response headers captured verbatim, plus the diagnostic ones decoded.
#[derive(Clone, Debug, Default)]
pub struct ResponseHeaders {
    pub raw: Headers,
    /// `x-ms-documentdb-query-metrics`, split on `;`.
    pub query_metrics: Option<Vec<String>>,
    /// `x-ms-cosmos-index-utilization`, base64-decoded and parsed.
    pub index_utilization: Option<Value>,
}

impl ResponseHeaders {
    fn capture(headers: &Headers) -> Self {
        let query_metrics = headers
            .get_optional_str(&constants::QUERY_METRICS)
            .map(|metrics| {
                metrics
                    .split(';')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect()
            });
        let index_utilization = headers
            .get_optional_str(&constants::INDEX_UTILIZATION)
            .and_then(|encoded| match decode_index_utilization(encoded) {
                Ok(value) => Some(value),
                Err(error) => {
                    tracing::warn!(%error, "could not decode index utilization header");
                    None
                }
            });
        Self {
            raw: headers.clone(),
            query_metrics,
            index_utilization,
        }
    }
}

fn decode_index_utilization(encoded: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let json = STANDARD.decode(encoded.trim())?;
    Ok(serde_json::from_slice(&json)?)
}

fn request_charge(headers: &Headers) -> i64 {
    headers
        .get_optional_str(&constants::REQUEST_CHARGE)
        .and_then(|charge| charge.trim().parse::<f64>().ok())
        .filter(|charge| charge.is_finite() && *charge >= 0.0)
        .map(|charge| charge.trunc() as i64)
        .unwrap_or(-1)
}

/// Turns a settled response into a [`ResponseRecord`].
///
/// Records the session token of successful responses on the connection. Failures are
/// returned as `Err` or as a failed record depending on the descriptor's error policy.
#[tracing::instrument(level = "trace", skip_all, fields(collection = descriptor.collection(), status = u16::from(response.status())))]
pub(crate) fn normalize<T: DeserializeOwned>(
    response: RawResponse,
    connection: &CosmosConnection,
    descriptor: &RequestDescriptor,
) -> crate::Result<ResponseRecord<T>> {
    let (status, headers, body) = response.deconstruct();
    let body = Bytes::copy_from_slice(body.as_ref());
    let charge = request_charge(&headers);
    let continuation = headers.get_optional_string(&constants::CONTINUATION);
    let session_token = headers.get_optional_string(&constants::SESSION_TOKEN);
    let activity_id = headers.get_optional_string(&constants::ACTIVITY_ID);
    let captured = connection
        .collect_response_headers()
        .then(|| ResponseHeaders::capture(&headers));

    let is_success = status.is_success() || status == StatusCode::NotModified;
    if !is_success {
        let error =
            ServerError::from_response(status, &headers, &body, charge, descriptor.summary());
        return match descriptor.error_policy() {
            ErrorPolicy::Raise => Err(Error::Server(Box::new(error))),
            ErrorPolicy::Continue => {
                tracing::warn!(
                    status = u16::from(status),
                    code = error.code.as_deref().unwrap_or_default(),
                    message = error.message.as_deref().unwrap_or_default(),
                    activity_id = error.activity_id.as_deref().unwrap_or_default(),
                    "{} {} failed",
                    descriptor.method(),
                    descriptor.url()
                );
                Ok(ResponseRecord {
                    is_success: false,
                    status,
                    charge,
                    body: None,
                    continuation,
                    session_token,
                    activity_id,
                    headers: captured,
                    error: Some(Box::new(error)),
                })
            }
        };
    }

    if let Some(token) = &session_token {
        connection.sessions().record(descriptor.collection(), token);
    }

    let body = if body.is_empty()
        || status == StatusCode::NoContent
        || status == StatusCode::NotModified
    {
        None
    } else {
        let parsed = serde_json::from_slice::<T>(&body).map_err(|e| Error::Format {
            message: format!("failed to deserialize response body: {}", e),
            raw: body.clone(),
        })?;
        Some(parsed)
    };

    tracing::debug!(charge, continuation = continuation.is_some(), "request completed");
    Ok(ResponseRecord {
        is_success,
        status,
        charge,
        body,
        continuation,
        session_token,
        activity_id,
        headers: captured,
        error: None,
    })
}
