// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Connection-wide settings and per-operation options.

use std::{fmt, str::FromStr, time::Duration};

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{constants, Error, PartitionKey};

/// What an operation does when the service answers with a failure status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Return the failure as `Err(Error::Server)`.
    #[default]
    Raise,
    /// Log the failure and return it as a record with `is_success == false`.
    Continue,
}

/// Request priority under priority-based execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriorityLevel {
    High,
    Low,
}

impl PriorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::High => "High",
            PriorityLevel::Low => "Low",
        }
    }
}

/// An entity tag, always held in its double-quoted wire form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ETag(String);

impl ETag {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            Self(value)
        } else {
            Self(format!("\"{}\"", value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ETag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ETag {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Settings shared by every operation issued through a [`CosmosConnection`](crate::CosmosConnection).
#[derive(Clone, Debug)]
pub struct ConnectionOptions {
    /// Throttle retries allowed per operation.
    pub max_retries: u32,
    /// Number of operations a batch keeps in flight before draining.
    pub batch_width: usize,
    pub api_version: String,
    /// Copy every response header into [`ResponseRecord::headers`](crate::ResponseRecord::headers).
    pub collect_response_headers: bool,
    pub error_policy: ErrorPolicy,
    /// Upper bound on a single token acquisition.
    pub token_timeout: Duration,
    /// Overrides `https://<account>.documents.azure.com/`.
    pub endpoint: Option<Url>,
    /// Token scopes. Empty means `<endpoint>/.default`.
    pub scopes: Vec<String>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            max_retries: constants::DEFAULT_MAX_RETRIES,
            batch_width: 1,
            api_version: constants::DEFAULT_API_VERSION.to_string(),
            collect_response_headers: false,
            error_policy: ErrorPolicy::Raise,
            token_timeout: Duration::from_secs(30),
            endpoint: None,
            scopes: Vec::new(),
        }
    }
}

impl ConnectionOptions {
    /// Creates a new [`ConnectionOptionsBuilder`] that can be used to construct a [`ConnectionOptions`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// let options = azure_data_cosmos_rest::ConnectionOptions::builder()
    ///     .with_max_retries(3)
    ///     .with_batch_width(4)
    ///     .build();
    /// assert_eq!(options.batch_width, 4);
    /// ```
    pub fn builder() -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder::default()
    }

    /// Reads overrides from `AZURE_COSMOS_*` environment variables on top of the defaults.
    ///
    /// Recognized: `AZURE_COSMOS_MAX_RETRIES`, `AZURE_COSMOS_BATCH_WIDTH`,
    /// `AZURE_COSMOS_API_VERSION`, `AZURE_COSMOS_COLLECT_HEADERS` and `AZURE_COSMOS_ENDPOINT`.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        fn parse<T: FromStr>(name: &str, value: &str) -> crate::Result<T> {
            value.trim().parse().map_err(|_| {
                Error::NotInitialized(format!("{} has an invalid value '{}'", name, value))
            })
        }

        let mut options = Self::default();
        if let Some(v) = lookup("AZURE_COSMOS_MAX_RETRIES") {
            options.max_retries = parse("AZURE_COSMOS_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("AZURE_COSMOS_BATCH_WIDTH") {
            options.batch_width = parse("AZURE_COSMOS_BATCH_WIDTH", &v)?;
            if options.batch_width == 0 {
                return Err(Error::NotInitialized(
                    "AZURE_COSMOS_BATCH_WIDTH must be at least 1".into(),
                ));
            }
        }
        if let Some(v) = lookup("AZURE_COSMOS_API_VERSION") {
            options.api_version = v;
        }
        if let Some(v) = lookup("AZURE_COSMOS_COLLECT_HEADERS") {
            options.collect_response_headers = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(Error::NotInitialized(format!(
                        "AZURE_COSMOS_COLLECT_HEADERS has an invalid value '{}'",
                        v
                    )))
                }
            };
        }
        if let Some(v) = lookup("AZURE_COSMOS_ENDPOINT") {
            options.endpoint = Some(parse("AZURE_COSMOS_ENDPOINT", &v)?);
        }
        Ok(options)
    }
}

/// Builder used to construct a [`ConnectionOptions`].
///
/// Obtain a [`ConnectionOptionsBuilder`] by calling [`ConnectionOptions::builder()`]
#[derive(Default)]
pub struct ConnectionOptionsBuilder(ConnectionOptions);

impl ConnectionOptionsBuilder {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.0.max_retries = max_retries;
        self
    }

    /// Sets the batch width. Values below 1 are treated as 1.
    pub fn with_batch_width(mut self, batch_width: usize) -> Self {
        self.0.batch_width = batch_width.max(1);
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.0.api_version = api_version.into();
        self
    }

    pub fn with_collect_response_headers(mut self, collect: bool) -> Self {
        self.0.collect_response_headers = collect;
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.0.error_policy = policy;
        self
    }

    pub fn with_token_timeout(mut self, timeout: Duration) -> Self {
        self.0.token_timeout = timeout;
        self
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.0.endpoint = Some(endpoint);
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Builds a [`ConnectionOptions`] from the builder.
    ///
    /// This does not consume the builder, and can be called multiple times.
    pub fn build(&self) -> ConnectionOptions {
        self.0.clone()
    }
}

/// Options for [`CollectionClient::read_document`](crate::clients::CollectionClient::read_document).
#[derive(Clone, Debug, Default)]
pub struct ReadDocumentOptions {
    /// Sent as `If-None-Match`; an unchanged document answers 304 with no body.
    pub if_none_match_etag: Option<ETag>,
    pub priority: Option<PriorityLevel>,
    pub error_policy: Option<ErrorPolicy>,
    pub cancellation: Option<CancellationToken>,
}

/// Options for creating and replacing documents.
#[derive(Clone, Debug, Default)]
pub struct WriteDocumentOptions {
    /// Create the document, or replace it if it already exists.
    pub upsert: bool,
    pub if_match_etag: Option<ETag>,
    /// Ask the service to omit the written document from the response.
    pub no_content: bool,
    pub priority: Option<PriorityLevel>,
    pub error_policy: Option<ErrorPolicy>,
    pub cancellation: Option<CancellationToken>,
}

#[derive(Clone, Debug, Default)]
pub struct DeleteDocumentOptions {
    /// Sent as `If-None-Match`, like every ETag on a point read or delete.
    pub if_none_match_etag: Option<ETag>,
    pub priority: Option<PriorityLevel>,
    pub error_policy: Option<ErrorPolicy>,
    pub cancellation: Option<CancellationToken>,
}

#[derive(Clone, Debug, Default)]
pub struct PatchDocumentOptions {
    pub if_match_etag: Option<ETag>,
    pub no_content: bool,
    pub priority: Option<PriorityLevel>,
    pub error_policy: Option<ErrorPolicy>,
    pub cancellation: Option<CancellationToken>,
}

/// Options for queries and document feeds.
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    /// Scopes the query to one logical partition. Empty means cross-partition.
    pub partition_key: PartitionKey,
    /// Pins the query to one partition key range.
    pub partition_key_range_id: Option<String>,
    /// Resume from a continuation token returned by an earlier page.
    pub continuation: Option<String>,
    pub max_item_count: Option<u32>,
    /// Keep fetching pages until the service stops returning a continuation.
    ///
    /// Without a partition key or range id this also fans out over every partition key range.
    pub auto_continue: bool,
    pub priority: Option<PriorityLevel>,
    pub error_policy: Option<ErrorPolicy>,
    pub cancellation: Option<CancellationToken>,
}

#[derive(Clone, Debug, Default)]
pub struct ProcedureOptions {
    pub continuation: Option<String>,
    pub max_item_count: Option<u32>,
    pub auto_continue: bool,
    pub priority: Option<PriorityLevel>,
    pub error_policy: Option<ErrorPolicy>,
    pub cancellation: Option<CancellationToken>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn etag_is_quoted_once() {
        assert_eq!(ETag::new("abc").as_str(), "\"abc\"");
        assert_eq!(ETag::new("\"abc\"").as_str(), "\"abc\"");
        assert_eq!(ETag::new("\"").as_str(), "\"\"\"");
    }

    #[test]
    fn builder_sets_fields() {
        let options = ConnectionOptions::builder()
            .with_max_retries(2)
            .with_batch_width(0)
            .with_error_policy(ErrorPolicy::Continue)
            .with_scopes(["a/.default"])
            .build();
        assert_eq!(options.max_retries, 2);
        assert_eq!(options.batch_width, 1);
        assert_eq!(options.error_policy, ErrorPolicy::Continue);
        assert_eq!(options.scopes, vec!["a/.default".to_string()]);
        assert_eq!(options.api_version, "2018-12-31");
    }

    #[test]
    fn environment_overrides() -> crate::Result<()> {
        let env: HashMap<&str, &str> = [
            ("AZURE_COSMOS_MAX_RETRIES", "9"),
            ("AZURE_COSMOS_BATCH_WIDTH", "3"),
            ("AZURE_COSMOS_COLLECT_HEADERS", "True"),
            ("AZURE_COSMOS_ENDPOINT", "https://localhost:8081/"),
        ]
        .into_iter()
        .collect();
        let options =
            ConnectionOptions::from_lookup(|name| env.get(name).map(|v| v.to_string()))?;
        assert_eq!(options.max_retries, 9);
        assert_eq!(options.batch_width, 3);
        assert!(options.collect_response_headers);
        assert_eq!(
            options.endpoint.as_ref().map(Url::as_str),
            Some("https://localhost:8081/")
        );
        Ok(())
    }

    #[test]
    fn invalid_environment_values_are_rejected() {
        let err = ConnectionOptions::from_lookup(|name| {
            (name == "AZURE_COSMOS_MAX_RETRIES").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, Error::NotInitialized(m) if m.contains("AZURE_COSMOS_MAX_RETRIES")));

        let err = ConnectionOptions::from_lookup(|name| {
            (name == "AZURE_COSMOS_BATCH_WIDTH").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, Error::NotInitialized(_)));
    }
}
