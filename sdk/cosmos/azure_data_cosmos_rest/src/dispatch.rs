// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::fmt;

use azure_core::http::RawResponse;
use tokio::task::JoinHandle;

use crate::{CosmosConnection, Error, RequestDescriptor};

/// A sent request paired with the descriptor it was materialized from.
///
/// The wire request is owned by the spawned send task, so it is released exactly once: when
/// the response has been read or when the task is aborted.
pub(crate) struct OutstandingOperation {
    pub(crate) descriptor: RequestDescriptor,
    pub(crate) response: JoinHandle<crate::Result<RawResponse>>,
}

impl fmt::Debug for OutstandingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutstandingOperation")
            .field("descriptor", &self.descriptor)
            .field("finished", &self.response.is_finished())
            .finish()
    }
}

/// Materializes `descriptor` and puts it on the wire over the connection's transport.
///
/// The request is sent from a spawned task and goes out without waiting for the batch to be
/// drained. Draining awaits the response. Must be called from within a Tokio runtime.
pub(crate) fn dispatch(
    descriptor: RequestDescriptor,
    connection: &CosmosConnection,
) -> OutstandingOperation {
    let request = descriptor.materialize();
    let http_client = connection.http_client().clone();
    tracing::trace!(
        method = %descriptor.method(),
        url = %descriptor.url(),
        collection = descriptor.collection(),
        "dispatching request"
    );
    let response = tokio::spawn(async move {
        let request = request?;
        let response = http_client
            .execute_request(&request)
            .await
            .map_err(Error::transport)?;
        response
            .try_into_raw_response()
            .await
            .map_err(Error::transport)
    });
    OutstandingOperation {
        descriptor,
        response,
    }
}

/// Waits for the send task of an operation. A task that panicked settles as a transport error.
pub(crate) async fn settle(
    response: JoinHandle<crate::Result<RawResponse>>,
) -> crate::Result<RawResponse> {
    response.await.map_err(Error::transport)?
}
