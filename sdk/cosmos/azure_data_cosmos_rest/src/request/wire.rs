// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use azure_core::http::Request;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use time::{
    format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime, UtcOffset,
};

use super::{OperationKind, RequestDescriptor};
use crate::{constants, Error};

/// Characters escaped in the authorization header (everything but RFC 3986 unreserved).
const AUTHORIZATION_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// `Tue, 15 Nov 1994 08:12:31 GMT`
const RFC1123: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

impl RequestDescriptor {
    /// Builds the wire request for this descriptor, dated now.
    pub fn materialize(&self) -> crate::Result<Request> {
        self.materialize_at(OffsetDateTime::now_utc())
    }

    /// Builds the wire request for this descriptor, dated `date`.
    ///
    /// Deterministic: the same descriptor and date always yield the same request.
    pub fn materialize_at(&self, date: OffsetDateTime) -> crate::Result<Request> {
        let mut request = Request::new(self.url.clone(), self.method);

        request.insert_header(constants::AUTHORIZATION, authorization(self.access_token.secret()));
        request.insert_header(constants::MS_DATE, to_rfc1123(date)?);
        request.insert_header(constants::VERSION, self.api_version.clone());
        if let Some(session_token) = self.session_token.as_ref().filter(|t| !t.is_empty()) {
            request.insert_header(constants::SESSION_TOKEN, session_token.clone());
        }

        if self.kind == OperationKind::Query {
            request.insert_header(constants::QUERY, "True");
            request.insert_header(constants::CONTENT_TYPE, constants::QUERY_CONTENT_TYPE);
            request.insert_header(
                constants::RESPONSE_CONTINUATION_TOKEN_LIMIT_KB,
                constants::CONTINUATION_TOKEN_LIMIT_KB,
            );
            if self.partition_key.is_empty() {
                request.insert_header(constants::QUERY_ENABLE_CROSS_PARTITION, "True");
            }
            if self.populate_metrics {
                request.insert_header(constants::POPULATE_QUERY_METRICS, "True");
                request.insert_header(constants::POPULATE_INDEX_METRICS, "True");
            }
        } else if self.payload.is_some() {
            request.insert_header(
                constants::CONTENT_TYPE,
                self.content_type.unwrap_or(constants::APPLICATION_JSON),
            );
        }

        if let Some(continuation) = &self.continuation {
            request.insert_header(constants::CONTINUATION, continuation.clone());
        }
        if let Some(max_item_count) = self.max_item_count {
            request.insert_header(constants::MAX_ITEM_COUNT, max_item_count.to_string());
        }
        if let Some(id) = &self.partition_key_range_id {
            request.insert_header(constants::PARTITION_KEY_RANGE_ID, id.clone());
        }

        if let Some(etag) = &self.etag {
            let header = match self.kind {
                OperationKind::Other => constants::IF_NONE_MATCH,
                _ => constants::IF_MATCH,
            };
            request.insert_header(header, etag.as_str().to_string());
        }
        if self.no_content {
            request.insert_header(constants::PREFER, constants::PREFER_MINIMAL);
        }
        if let Some(priority) = self.priority {
            request.insert_header(constants::PRIORITY_LEVEL, priority.as_str());
        }
        if self.upsert {
            request.insert_header(constants::IS_UPSERT, "True");
        }
        if let Some(partition_key) = self.partition_key.to_header_value() {
            request.insert_header(constants::PARTITION_KEY, partition_key);
        }

        if let Some(payload) = &self.payload {
            request.set_body(payload.clone());
        }
        Ok(request)
    }
}

fn authorization(token: &str) -> String {
    let signature = format!("type=aad&ver=1.0&sig={}", token);
    utf8_percent_encode(&signature, AUTHORIZATION_ENCODE_SET).to_string()
}

/// Formats `date` in UTC like `Tue, 15 Nov 1994 08:12:31 GMT`, independent of locale.
pub(crate) fn to_rfc1123(date: OffsetDateTime) -> crate::Result<String> {
    date.to_offset(UtcOffset::UTC)
        .format(RFC1123)
        .map_err(|e| Error::Format {
            message: format!("failed to format request date: {}", e),
            raw: Bytes::new(),
        })
}

#[cfg(test)]
mod tests {
    use azure_core::http::{headers::HeaderName, Method};
    use time::macros::datetime;

    use super::*;
    use crate::{
        options::{ETag, ErrorPolicy, PriorityLevel},
        test_support::{request_body, test_connection},
        RequestDescriptor,
    };

    const DATE: OffsetDateTime = datetime!(1994-11-15 08:12:31 UTC);

    fn url(path: &str) -> url::Url {
        format!("https://acct.documents.azure.com/dbs/db/colls/docs/{}", path)
            .parse()
            .unwrap()
    }

    fn header<'a>(request: &'a Request, name: &HeaderName) -> Option<&'a str> {
        request.headers().get_optional_str(name)
    }

    #[test]
    fn rfc1123_dates() -> crate::Result<()> {
        assert_eq!(to_rfc1123(DATE)?, "Tue, 15 Nov 1994 08:12:31 GMT");
        assert_eq!(
            to_rfc1123(datetime!(2024-02-29 23:05:09 -02:00))?,
            "Fri, 01 Mar 2024 01:05:09 GMT"
        );
        assert_eq!(
            to_rfc1123(datetime!(2023-01-01 00:00:00 UTC))?,
            "Sun, 01 Jan 2023 00:00:00 GMT"
        );
        Ok(())
    }

    #[test]
    fn authorization_is_url_encoded() {
        assert_eq!(
            authorization("ab+c/d=="),
            "type%3Daad%26ver%3D1.0%26sig%3Dab%2Bc%2Fd%3D%3D"
        );
    }

    #[tokio::test]
    async fn point_read_headers() -> crate::Result<()> {
        let (connection, _) = test_connection();
        let descriptor =
            RequestDescriptor::builder(OperationKind::Other, "docs", Method::Get, url("docs/123"))
                .partition_key("test-docs")
                .etag(Some(ETag::new("v1")))
                .priority(Some(PriorityLevel::Low))
                .build(&connection)
                .await?;
        let request = descriptor.materialize_at(DATE)?;

        assert!(matches!(request.method(), Method::Get));
        assert!(request_body(&request).is_empty());
        assert_eq!(
            header(&request, &constants::PARTITION_KEY),
            Some(r#"["test-docs"]"#)
        );
        assert_eq!(header(&request, &constants::IF_NONE_MATCH), Some("\"v1\""));
        assert_eq!(header(&request, &constants::IF_MATCH), None);
        assert_eq!(header(&request, &constants::PRIORITY_LEVEL), Some("Low"));
        assert_eq!(
            header(&request, &constants::MS_DATE),
            Some("Tue, 15 Nov 1994 08:12:31 GMT")
        );
        assert_eq!(header(&request, &constants::VERSION), Some("2018-12-31"));
        assert_eq!(
            header(&request, &constants::AUTHORIZATION),
            Some("type%3Daad%26ver%3D1.0%26sig%3Dtoken-1")
        );
        assert_eq!(header(&request, &constants::SESSION_TOKEN), None);
        assert_eq!(header(&request, &constants::QUERY), None);
        Ok(())
    }

    #[tokio::test]
    async fn delete_sends_if_none_match() -> crate::Result<()> {
        let (connection, _) = test_connection();
        let descriptor = RequestDescriptor::builder(
            OperationKind::Other,
            "docs",
            Method::Delete,
            url("docs/123"),
        )
        .partition_key("test-docs")
        .etag(Some(ETag::new("v3")))
        .build(&connection)
        .await?;
        let request = descriptor.materialize_at(DATE)?;

        assert_eq!(header(&request, &constants::IF_NONE_MATCH), Some("\"v3\""));
        assert_eq!(header(&request, &constants::IF_MATCH), None);
        Ok(())
    }

    #[tokio::test]
    async fn write_headers() -> crate::Result<()> {
        let (connection, _) = test_connection();
        connection.sessions().record("docs", "0:1#42");
        let descriptor =
            RequestDescriptor::builder(OperationKind::Document, "docs", Method::Put, url("docs/1"))
                .partition_key(("tenant", 7))
                .etag(Some(ETag::new("v2")))
                .upsert(true)
                .no_content(true)
                .payload(r#"{"id":"1"}"#)
                .build(&connection)
                .await?;
        let request = descriptor.materialize_at(DATE)?;

        assert_eq!(header(&request, &constants::IF_MATCH), Some("\"v2\""));
        assert_eq!(header(&request, &constants::IF_NONE_MATCH), None);
        assert_eq!(header(&request, &constants::PREFER), Some("return=minimal"));
        assert_eq!(header(&request, &constants::IS_UPSERT), Some("True"));
        assert_eq!(
            header(&request, &constants::PARTITION_KEY),
            Some(r#"["tenant",7]"#)
        );
        assert_eq!(
            header(&request, &constants::CONTENT_TYPE),
            Some("application/json")
        );
        assert_eq!(header(&request, &constants::SESSION_TOKEN), Some("0:1#42"));
        assert_eq!(request_body(&request).as_ref(), br#"{"id":"1"}"#);
        Ok(())
    }

    #[tokio::test]
    async fn query_headers() -> crate::Result<()> {
        let (connection, _) = test_connection();
        let cross_partition =
            RequestDescriptor::builder(OperationKind::Query, "docs", Method::Post, url("docs"))
                .continuation(Some("+RID:abc".into()))
                .max_item_count(Some(10))
                .partition_key_range_id(Some("2".into()))
                .payload(r#"{"query":"SELECT * FROM c"}"#)
                .build(&connection)
                .await?;
        let request = cross_partition.materialize_at(DATE)?;

        assert_eq!(header(&request, &constants::QUERY), Some("True"));
        assert_eq!(
            header(&request, &constants::CONTENT_TYPE),
            Some("application/query+json")
        );
        assert_eq!(
            header(&request, &constants::QUERY_ENABLE_CROSS_PARTITION),
            Some("True")
        );
        assert_eq!(header(&request, &constants::CONTINUATION), Some("+RID:abc"));
        assert_eq!(header(&request, &constants::MAX_ITEM_COUNT), Some("10"));
        assert_eq!(header(&request, &constants::PARTITION_KEY_RANGE_ID), Some("2"));
        assert_eq!(
            header(&request, &constants::RESPONSE_CONTINUATION_TOKEN_LIMIT_KB),
            Some("8")
        );
        assert_eq!(header(&request, &constants::PARTITION_KEY), None);
        assert_eq!(header(&request, &constants::POPULATE_QUERY_METRICS), None);

        let single_partition =
            RequestDescriptor::builder(OperationKind::Query, "docs", Method::Post, url("docs"))
                .partition_key("a")
                .payload(r#"{"query":"SELECT * FROM c"}"#)
                .build(&connection)
                .await?;
        let request = single_partition.materialize_at(DATE)?;
        assert_eq!(header(&request, &constants::QUERY_ENABLE_CROSS_PARTITION), None);
        assert_eq!(header(&request, &constants::PARTITION_KEY), Some(r#"["a"]"#));
        Ok(())
    }

    #[tokio::test]
    async fn rematerializing_only_changes_the_date() -> crate::Result<()> {
        let (connection, credential) = test_connection();
        connection.sessions().record("docs", "0:1#5");
        let descriptor =
            RequestDescriptor::builder(OperationKind::Document, "docs", Method::Post, url("docs"))
                .partition_key(("a", "b"))
                .payload(r#"{"id":"x"}"#)
                .error_policy(Some(ErrorPolicy::Continue))
                .build(&connection)
                .await?;

        // Later session updates do not leak into an already-built descriptor.
        connection.sessions().record("docs", "0:1#6");

        let first = descriptor.materialize_at(DATE)?;
        let second = descriptor.materialize_at(DATE + time::Duration::seconds(3))?;
        let without_date = |request: &Request| -> Vec<(String, String)> {
            request
                .headers()
                .iter()
                .filter(|(name, _)| **name != constants::MS_DATE)
                .map(|(name, value)| (name.as_str().to_string(), value.as_str().to_string()))
                .collect()
        };
        assert_eq!(without_date(&first), without_date(&second));
        assert_eq!(first.url(), second.url());
        assert_eq!(request_body(&first), request_body(&second));
        assert_eq!(
            header(&second, &constants::MS_DATE),
            Some("Tue, 15 Nov 1994 08:12:34 GMT")
        );
        assert_eq!(header(&first, &constants::SESSION_TOKEN), Some("0:1#5"));
        assert_eq!(credential.calls(), 1);
        assert_eq!(descriptor.error_policy(), ErrorPolicy::Continue);
        Ok(())
    }

    #[tokio::test]
    async fn range_session_token_is_preferred() -> crate::Result<()> {
        let (connection, _) = test_connection();
        connection.sessions().record("docs", "0:1#5");
        connection.sessions().record("docs", "1:1#9");
        let descriptor =
            RequestDescriptor::builder(OperationKind::Query, "docs", Method::Post, url("docs"))
                .partition_key_range_id(Some("0".into()))
                .build(&connection)
                .await?;
        assert_eq!(descriptor.session_token(), Some("0:1#5"));
        Ok(())
    }

    #[tokio::test]
    async fn consume_retry_stops_at_zero() -> crate::Result<()> {
        let (connection, _) = test_connection();
        connection.set_max_retries(1);
        let mut descriptor =
            RequestDescriptor::builder(OperationKind::Other, "docs", Method::Get, url("docs/1"))
                .build(&connection)
                .await?;
        assert!(descriptor.consume_retry());
        assert_eq!(descriptor.remaining_retries(), 0);
        assert!(!descriptor.consume_retry());
        assert_eq!(descriptor.remaining_retries(), 0);
        Ok(())
    }
}
