// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Batched execution with throttle retries.
//!
//! A batch keeps up to `width` operations in flight. Draining waits for *every* response,
//! emits the settled ones and collects the throttled ones (HTTP 429 with retries left). The
//! throttled subset is resent as a new batch after a single wait, the longest retry-after
//! hint among them, until nothing is throttled or the budget runs out.
//!
//! Requests are sent from spawned Tokio tasks, so a batch must be driven from within a Tokio
//! runtime.

use std::{future::Future, marker::PhantomData, mem, time::Duration};

use azure_core::http::{headers::Headers, RawResponse, StatusCode};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{
    constants,
    dispatch::{dispatch, settle, OutstandingOperation},
    response::{normalize, ResponseRecord},
    CosmosConnection, Error, RequestDescriptor,
};

/// Submits operations in batches of a fixed width.
///
/// Records are returned in submission order. Every submitted operation yields exactly one
/// result, however many throttle rounds it went through.
///
/// ```rust,no_run
/// # async fn doc(connection: azure_data_cosmos_rest::CosmosConnection) -> azure_data_cosmos_rest::Result<()> {
/// let docs = connection.collection_client("docs");
/// let mut batch = connection.batch_with_width::<serde_json::Value>(5);
/// for i in 0..5 {
///     let document = serde_json::json!({ "id": i.to_string(), "pk": "p" });
///     let descriptor = docs.prepare_create_document(&document, "p", None).await?;
///     for record in batch.push(descriptor).await {
///         println!("created with charge {}", record?.charge);
///     }
/// }
/// let remaining = batch.finish().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BatchExecutor<T = Value> {
    connection: CosmosConnection,
    width: usize,
    outstanding: Vec<OutstandingOperation>,
    cancellation: Option<CancellationToken>,
    _body: PhantomData<fn() -> T>,
}

impl<T> BatchExecutor<T> {
    pub(crate) fn new(connection: CosmosConnection, width: usize) -> Self {
        Self {
            connection,
            width: width.max(1),
            outstanding: Vec::new(),
            cancellation: None,
            _body: PhantomData,
        }
    }

    /// Aborts in-flight requests and retry waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of dispatched operations not yet drained.
    pub fn pending(&self) -> usize {
        self.outstanding.len()
    }
}

impl<T> Drop for BatchExecutor<T> {
    fn drop(&mut self) {
        for operation in &self.outstanding {
            operation.response.abort();
        }
    }
}

impl<T: DeserializeOwned> BatchExecutor<T> {
    /// Sends `descriptor` right away. Once `width` operations are in flight the batch is
    /// drained and their records returned; otherwise the result is empty.
    pub async fn push(
        &mut self,
        descriptor: RequestDescriptor,
    ) -> Vec<crate::Result<ResponseRecord<T>>> {
        self.outstanding.push(dispatch(descriptor, &self.connection));
        if self.outstanding.len() < self.width {
            return Vec::new();
        }
        self.drain().await
    }

    /// Drains every operation still in flight.
    pub async fn finish(mut self) -> Vec<crate::Result<ResponseRecord<T>>> {
        self.drain().await
    }

    /// Pushes every descriptor and drains the remainder.
    pub async fn execute_all(
        mut self,
        descriptors: impl IntoIterator<Item = RequestDescriptor>,
    ) -> Vec<crate::Result<ResponseRecord<T>>> {
        let mut records = Vec::new();
        for descriptor in descriptors {
            records.extend(self.push(descriptor).await);
        }
        records.extend(self.finish().await);
        records
    }

    async fn drain(&mut self) -> Vec<crate::Result<ResponseRecord<T>>> {
        let operations = mem::take(&mut self.outstanding);
        if operations.is_empty() {
            return Vec::new();
        }
        drain_batch(&self.connection, operations, self.cancellation.as_ref()).await
    }
}

/// The longest retry-after hint seen in one drain round.
#[derive(Debug, Default)]
struct RetryWait(Option<Duration>);

impl RetryWait {
    fn observe(&mut self, hint: Option<Duration>) {
        let hint = hint.unwrap_or(constants::DEFAULT_RETRY_AFTER);
        self.0 = Some(self.0.map_or(hint, |current| current.max(hint)));
    }

    fn interval(&self) -> Duration {
        self.0.unwrap_or(constants::DEFAULT_RETRY_AFTER)
    }
}

/// Reads `x-ms-retry-after-ms`. Fractional milliseconds are accepted.
fn retry_after(headers: &Headers) -> Option<Duration> {
    let value = headers.get_optional_str(&constants::RETRY_AFTER_MS)?.trim();
    if let Ok(ms) = value.parse::<u64>() {
        return Some(Duration::from_millis(ms));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
        .map(|ms| Duration::from_nanos((ms * 1_000_000.0).round() as u64))
}

enum Outcome {
    Settled(crate::Result<RawResponse>),
    Throttled { retry_after: Option<Duration> },
}

fn classify(response: crate::Result<RawResponse>, descriptor: &mut RequestDescriptor) -> Outcome {
    match response {
        Ok(raw) if raw.status() == StatusCode::TooManyRequests && descriptor.consume_retry() => {
            Outcome::Throttled {
                retry_after: retry_after(raw.headers()),
            }
        }
        other => Outcome::Settled(other),
    }
}

/// Awaits `future` unless `cancellation` fires first.
async fn unless_cancelled<F: Future>(
    future: F,
    cancellation: Option<&CancellationToken>,
) -> Option<F::Output> {
    match cancellation {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => None,
            output = future => Some(output),
        },
        None => Some(future.await),
    }
}

/// Drains `operations`, retrying throttled members, and returns one result per operation in
/// the order given.
///
/// On cancellation the in-flight requests are aborted and every operation without a record
/// yet settles as [`Error::Cancelled`].
#[tracing::instrument(level = "trace", skip_all, fields(size = operations.len()))]
pub(crate) async fn drain_batch<T: DeserializeOwned>(
    connection: &CosmosConnection,
    operations: Vec<OutstandingOperation>,
    cancellation: Option<&CancellationToken>,
) -> Vec<crate::Result<ResponseRecord<T>>> {
    let mut results: Vec<Option<crate::Result<ResponseRecord<T>>>> =
        operations.iter().map(|_| None).collect();
    let mut in_flight: Vec<(usize, OutstandingOperation)> =
        operations.into_iter().enumerate().collect();

    while !in_flight.is_empty() {
        let (slots, (descriptors, responses)): (Vec<usize>, (Vec<_>, Vec<_>)) = in_flight
            .drain(..)
            .map(|(slot, op)| (slot, (op.descriptor, op.response)))
            .unzip();

        let aborts: Vec<_> = responses.iter().map(|r| r.abort_handle()).collect();
        let Some(responses) =
            unless_cancelled(join_all(responses.into_iter().map(settle)), cancellation).await
        else {
            aborts.iter().for_each(|a| a.abort());
            tracing::debug!(abandoned = slots.len(), "batch cancelled while draining");
            break;
        };

        let mut retry = Vec::new();
        let mut wait = RetryWait::default();
        for ((slot, mut descriptor), response) in slots.into_iter().zip(descriptors).zip(responses)
        {
            match classify(response, &mut descriptor) {
                Outcome::Throttled { retry_after } => {
                    tracing::debug!(
                        collection = descriptor.collection(),
                        retry_after_ms = retry_after.map(|d| d.as_millis() as u64),
                        remaining_retries = descriptor.remaining_retries(),
                        "request throttled"
                    );
                    wait.observe(retry_after);
                    retry.push((slot, descriptor));
                }
                Outcome::Settled(response) => {
                    results[slot] =
                        Some(response.and_then(|raw| normalize(raw, connection, &descriptor)));
                }
            }
        }

        if retry.is_empty() {
            break;
        }

        connection.record_throttle_round();
        let interval = wait.interval();
        tracing::debug!(
            throttled = retry.len(),
            retry_after_ms = interval.as_millis() as u64,
            "retrying throttled requests"
        );
        if unless_cancelled(tokio::time::sleep(interval), cancellation)
            .await
            .is_none()
        {
            tracing::debug!(abandoned = retry.len(), "batch cancelled while waiting to retry");
            break;
        }

        in_flight = retry
            .into_iter()
            .map(|(slot, descriptor)| (slot, dispatch(descriptor, connection)))
            .collect();
    }

    results
        .into_iter()
        .map(|result| result.unwrap_or(Err(Error::Cancelled)))
        .collect()
}

/// Sends one operation through the retry engine.
pub(crate) async fn execute_single<T: DeserializeOwned>(
    connection: &CosmosConnection,
    descriptor: RequestDescriptor,
    cancellation: Option<&CancellationToken>,
) -> crate::Result<ResponseRecord<T>> {
    let operation = dispatch(descriptor, connection);
    drain_batch(connection, vec![operation], cancellation)
        .await
        .pop()
        .unwrap_or(Err(Error::Cancelled))
}
