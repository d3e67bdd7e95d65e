// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![allow(dead_code)]

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use azure_core::{
    credentials::{AccessToken, TokenCredential, TokenRequestOptions},
    http::{
        headers::{HeaderName, Headers},
        AsyncRawResponse, Body, HttpClient, Request, StatusCode,
    },
};
use azure_data_cosmos_rest::{ConnectionOptions, CosmosConnection};
use bytes::Bytes;
use time::OffsetDateTime;

/// A scripted response.
pub struct Reply {
    pub status: StatusCode,
    pub headers: Headers,
    pub body: Bytes,
}

type Handler = dyn Fn(&Request) -> Reply + Send + Sync;

/// A transport that answers every request with a scripted handler and records what it sent.
pub struct MockTransport {
    handler: Box<Handler>,
    latency: Option<Duration>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&Request) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            latency: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Like [`MockTransport::new`], but every response takes `latency` to arrive.
    pub fn with_latency(
        latency: Duration,
        handler: impl Fn(&Request) -> Reply + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            latency: Some(latency),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpClient for MockTransport {
    async fn execute_request(&self, request: &Request) -> azure_core::Result<AsyncRawResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let reply = (self.handler)(request);
        Ok(AsyncRawResponse::from_bytes(
            reply.status,
            reply.headers,
            reply.body,
        ))
    }
}

/// Issues `token-1`, `token-2`, ... valid for an hour, counting the calls.
#[derive(Debug, Default)]
pub struct CountingCredential {
    calls: AtomicUsize,
}

impl CountingCredential {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenCredential for CountingCredential {
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

pub fn connection(
    transport: Arc<MockTransport>,
    options: Option<ConnectionOptions>,
) -> (CosmosConnection, Arc<CountingCredential>) {
    let credential = Arc::new(CountingCredential::default());
    let connection = CosmosConnection::builder("acct", "db")
        .credential(credential.clone())
        .options(options.unwrap_or_default())
        .http_client(transport)
        .build()
        .unwrap();
    (connection, credential)
}

pub fn json(status: u16, body: &str) -> Reply {
    respond(status, &[], body)
}

pub fn respond(status: u16, headers: &[(&'static str, &str)], body: &str) -> Reply {
    let mut map = Headers::new();
    for (name, value) in headers {
        map.insert(HeaderName::from_static(*name), value.to_string());
    }
    Reply {
        status: StatusCode::from(status),
        headers: map,
        body: Bytes::from(body.to_string()),
    }
}

pub fn throttled(retry_after_ms: Option<&str>) -> Reply {
    match retry_after_ms {
        Some(ms) => respond(
            429,
            &[("x-ms-retry-after-ms", ms)],
            r#"{"code":"TooManyRequests","message":"Request rate is large"}"#,
        ),
        None => respond(
            429,
            &[],
            r#"{"code":"TooManyRequests","message":"Request rate is large"}"#,
        ),
    }
}

pub fn header<'a>(request: &'a Request, name: &'static str) -> Option<&'a str> {
    request
        .headers()
        .get_optional_str(&HeaderName::from_static(name))
}

/// The bytes of the request body.
pub fn body(request: &Request) -> Bytes {
    match request.body() {
        Body::Bytes(bytes) => bytes.clone(),
        #[allow(unreachable_patterns)]
        _ => Bytes::new(),
    }
}

/// The `id` of the JSON document in the request body, if any.
pub fn body_id(request: &Request) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(&body(request)).ok()?;
    value.get("id")?.as_str().map(String::from)
}
