// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

// Don't spell-check header names (which should start with 'x-').
// cspell:ignoreRegExp /x-[^\s]+/
// cspell:ignore documentdb isquery pkranges partitionkey partitionkeyrangeid enablecrosspartition responsecontinuationtokenlimitinkb populatequerymetrics populateindexmetrics

//! Constants defining HTTP headers and other values relevant to Azure Cosmos DB APIs.

use std::time::Duration;

use azure_core::http::headers::HeaderName;

pub const AUTHORIZATION: HeaderName = HeaderName::from_static("authorization");
pub const CONTENT_TYPE: HeaderName = HeaderName::from_static("content-type");
pub const IF_MATCH: HeaderName = HeaderName::from_static("if-match");
pub const IF_NONE_MATCH: HeaderName = HeaderName::from_static("if-none-match");
pub const PREFER: HeaderName = HeaderName::from_static("prefer");

pub const MS_DATE: HeaderName = HeaderName::from_static("x-ms-date");
pub const VERSION: HeaderName = HeaderName::from_static("x-ms-version");
pub const SESSION_TOKEN: HeaderName = HeaderName::from_static("x-ms-session-token");
pub const ACTIVITY_ID: HeaderName = HeaderName::from_static("x-ms-activity-id");

pub const QUERY: HeaderName = HeaderName::from_static("x-ms-documentdb-isquery");
pub const MAX_ITEM_COUNT: HeaderName = HeaderName::from_static("x-ms-max-item-count");
pub const QUERY_ENABLE_CROSS_PARTITION: HeaderName =
    HeaderName::from_static("x-ms-documentdb-query-enablecrosspartition");
pub const CONTINUATION: HeaderName = HeaderName::from_static("x-ms-continuation");
pub const PARTITION_KEY_RANGE_ID: HeaderName =
    HeaderName::from_static("x-ms-documentdb-partitionkeyrangeid");
pub const RESPONSE_CONTINUATION_TOKEN_LIMIT_KB: HeaderName =
    HeaderName::from_static("x-ms-documentdb-responsecontinuationtokenlimitinkb");
pub const POPULATE_QUERY_METRICS: HeaderName =
    HeaderName::from_static("x-ms-documentdb-populatequerymetrics");
pub const POPULATE_INDEX_METRICS: HeaderName =
    HeaderName::from_static("x-ms-cosmos-populateindexmetrics");

pub const PARTITION_KEY: HeaderName = HeaderName::from_static("x-ms-documentdb-partitionkey");
pub const IS_UPSERT: HeaderName = HeaderName::from_static("x-ms-documentdb-is-upsert");
pub const PRIORITY_LEVEL: HeaderName = HeaderName::from_static("x-ms-cosmos-priority-level");

pub const REQUEST_CHARGE: HeaderName = HeaderName::from_static("x-ms-request-charge");
pub const RETRY_AFTER_MS: HeaderName = HeaderName::from_static("x-ms-retry-after-ms");
pub const QUERY_METRICS: HeaderName = HeaderName::from_static("x-ms-documentdb-query-metrics");
pub const INDEX_UTILIZATION: HeaderName =
    HeaderName::from_static("x-ms-cosmos-index-utilization");

pub const APPLICATION_JSON: &str = "application/json";
pub const QUERY_CONTENT_TYPE: &str = "application/query+json";
pub const JSON_PATCH_CONTENT_TYPE: &str = "application/json_patch+json";
pub const PREFER_MINIMAL: &str = "return=minimal";

/// The REST API version sent when the connection does not override it.
pub const DEFAULT_API_VERSION: &str = "2018-12-31";

/// Upper bound, in KB, on continuation tokens returned by the service.
///
/// Unbounded tokens can grow past the header size limits of the gateway.
pub const CONTINUATION_TOKEN_LIMIT_KB: &str = "8";

/// Wait applied to a throttled response that carries no `x-ms-retry-after-ms` hint.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_millis(1000);

/// Retry budget applied when the connection options do not override it.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
