// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Collaborators for unit tests: a counting credential and a transport that answers `200 {}`.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use azure_core::{
    credentials::{AccessToken, TokenCredential, TokenRequestOptions},
    http::{headers::Headers, AsyncRawResponse, Body, HttpClient, Request, StatusCode},
};
use bytes::Bytes;
use time::OffsetDateTime;

use crate::{ConnectionOptions, CosmosConnection};

#[derive(Debug, Default)]
pub(crate) struct StaticCredential {
    calls: AtomicUsize,
}

impl StaticCredential {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenCredential for StaticCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AccessToken::new(
            format!("token-{}", n),
            OffsetDateTime::now_utc() + time::Duration::hours(1),
        ))
    }
}

#[derive(Debug)]
pub(crate) struct EmptyOkClient;

#[async_trait]
impl HttpClient for EmptyOkClient {
    async fn execute_request(&self, _request: &Request) -> azure_core::Result<AsyncRawResponse> {
        Ok(AsyncRawResponse::from_bytes(
            StatusCode::Ok,
            Headers::new(),
            Bytes::from_static(b"{}"),
        ))
    }
}

/// The bytes of a materialized request body.
pub(crate) fn request_body(request: &Request) -> Bytes {
    match request.body() {
        Body::Bytes(bytes) => bytes.clone(),
        #[allow(unreachable_patterns)]
        _ => Bytes::new(),
    }
}

pub(crate) fn connection_with_options(options: ConnectionOptions) -> CosmosConnection {
    build(options).0
}

pub(crate) fn test_connection() -> (CosmosConnection, Arc<StaticCredential>) {
    build(ConnectionOptions::default())
}

fn build(options: ConnectionOptions) -> (CosmosConnection, Arc<StaticCredential>) {
    let credential = Arc::new(StaticCredential::default());
    let connection = CosmosConnection::builder("acct", "db")
        .credential(credential.clone())
        .options(options)
        .http_client(Arc::new(EmptyOkClient))
        .build()
        .expect("test connection should build");
    (connection, credential)
}
