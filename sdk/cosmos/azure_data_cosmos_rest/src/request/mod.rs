// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Normalized descriptions of logical operations, and their conversion into wire requests.

mod wire;

use azure_core::{credentials::Secret, http::Method};
use bytes::Bytes;
use url::Url;

use crate::{
    error::RequestSummary,
    options::{ETag, ErrorPolicy, PriorityLevel},
    CosmosConnection, PartitionKey,
};

/// The kind of logical operation a request performs. Selects the header set sent on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    ProcedureCall,
    Document,
    /// Point reads, deletes, feeds and metadata reads. An ETag is sent as `If-None-Match`.
    Other,
}

/// Everything needed to send one logical operation, and to send it again after throttling.
///
/// A descriptor captures its access token and session token when it is built. Resending it
/// reuses both, so two materializations only differ in `x-ms-date`.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    kind: OperationKind,
    method: Method,
    url: Url,
    collection: String,
    access_token: Secret,
    api_version: String,
    session_token: Option<String>,
    partition_key: PartitionKey,
    partition_key_range_id: Option<String>,
    continuation: Option<String>,
    max_item_count: Option<u32>,
    upsert: bool,
    etag: Option<ETag>,
    priority: Option<PriorityLevel>,
    no_content: bool,
    populate_metrics: bool,
    payload: Option<Bytes>,
    content_type: Option<&'static str>,
    remaining_retries: u32,
    error_policy: ErrorPolicy,
}

impl RequestDescriptor {
    /// Starts describing an operation of `kind` against `collection`.
    pub fn builder(
        kind: OperationKind,
        collection: impl Into<String>,
        method: Method,
        url: Url,
    ) -> DescriptorBuilder {
        DescriptorBuilder {
            kind,
            method,
            url,
            collection: collection.into(),
            partition_key: PartitionKey::default(),
            partition_key_range_id: None,
            continuation: None,
            max_item_count: None,
            upsert: false,
            etag: None,
            priority: None,
            no_content: false,
            payload: None,
            content_type: None,
            error_policy: None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn partition_key(&self) -> &PartitionKey {
        &self.partition_key
    }

    pub fn partition_key_range_id(&self) -> Option<&str> {
        self.partition_key_range_id.as_deref()
    }

    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    pub fn max_item_count(&self) -> Option<u32> {
        self.max_item_count
    }

    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Throttle retries this operation may still consume.
    pub fn remaining_retries(&self) -> u32 {
        self.remaining_retries
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Spends one retry. Returns `false` when the budget was already exhausted.
    pub(crate) fn consume_retry(&mut self) -> bool {
        match self.remaining_retries.checked_sub(1) {
            Some(left) => {
                self.remaining_retries = left;
                true
            }
            None => false,
        }
    }

    /// Identifies this request in errors, without its credentials.
    pub fn summary(&self) -> RequestSummary {
        RequestSummary {
            method: self.method,
            url: self.url.clone(),
            kind: self.kind,
            collection: self.collection.clone(),
            partition_key: self.partition_key.to_header_value(),
        }
    }
}

/// Collects the per-call settings of a [`RequestDescriptor`].
///
/// Obtain one with [`RequestDescriptor::builder()`]. Building is async because it acquires an
/// access token from the connection.
#[derive(Clone, Debug)]
pub struct DescriptorBuilder {
    kind: OperationKind,
    method: Method,
    url: Url,
    collection: String,
    partition_key: PartitionKey,
    partition_key_range_id: Option<String>,
    continuation: Option<String>,
    max_item_count: Option<u32>,
    upsert: bool,
    etag: Option<ETag>,
    priority: Option<PriorityLevel>,
    no_content: bool,
    payload: Option<Bytes>,
    content_type: Option<&'static str>,
    error_policy: Option<ErrorPolicy>,
}

impl DescriptorBuilder {
    pub fn partition_key(mut self, partition_key: impl Into<PartitionKey>) -> Self {
        self.partition_key = partition_key.into();
        self
    }

    pub fn partition_key_range_id(mut self, id: Option<String>) -> Self {
        self.partition_key_range_id = id;
        self
    }

    pub fn continuation(mut self, continuation: Option<String>) -> Self {
        self.continuation = continuation;
        self
    }

    pub fn max_item_count(mut self, max_item_count: Option<u32>) -> Self {
        self.max_item_count = max_item_count;
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    /// Sent as `If-None-Match` for [`OperationKind::Other`] and `If-Match` for every other
    /// kind.
    pub fn etag(mut self, etag: Option<ETag>) -> Self {
        self.etag = etag;
        self
    }

    pub fn priority(mut self, priority: Option<PriorityLevel>) -> Self {
        self.priority = priority;
        self
    }

    pub fn no_content(mut self, no_content: bool) -> Self {
        self.no_content = no_content;
        self
    }

    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Overrides the connection's error policy for this operation.
    pub fn error_policy(mut self, policy: Option<ErrorPolicy>) -> Self {
        self.error_policy = policy;
        self
    }

    pub(crate) fn kind(&self) -> OperationKind {
        self.kind
    }

    pub(crate) fn collection(&self) -> &str {
        &self.collection
    }

    pub(crate) fn current_partition_key(&self) -> &PartitionKey {
        &self.partition_key
    }

    pub(crate) fn current_partition_key_range_id(&self) -> Option<&str> {
        self.partition_key_range_id.as_deref()
    }

    pub(crate) fn current_continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// Captures the access token, session token, retry budget and API version from
    /// `connection`.
    ///
    /// Fails with [`Error::NotInitialized`](crate::Error::NotInitialized) when no credential is
    /// bound to the connection.
    pub async fn build(self, connection: &CosmosConnection) -> crate::Result<RequestDescriptor> {
        let token = connection.access_token().await?;
        let session_token = connection
            .sessions()
            .session_token(&self.collection, self.partition_key_range_id.as_deref());
        let populate_metrics =
            self.kind == OperationKind::Query && connection.collect_response_headers();

        Ok(RequestDescriptor {
            kind: self.kind,
            method: self.method,
            url: self.url,
            collection: self.collection,
            access_token: token.token,
            api_version: connection.api_version().to_string(),
            session_token,
            partition_key: self.partition_key,
            partition_key_range_id: self.partition_key_range_id,
            continuation: self.continuation,
            max_item_count: self.max_item_count,
            upsert: self.upsert,
            etag: self.etag,
            priority: self.priority,
            no_content: self.no_content,
            populate_metrics,
            payload: self.payload,
            content_type: self.content_type,
            remaining_retries: connection.max_retries(),
            error_policy: self.error_policy.unwrap_or(connection.error_policy()),
        })
    }
}
