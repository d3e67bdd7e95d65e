// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Continuation-driven paging for queries, feeds and stored procedures.

use std::pin::Pin;

use azure_core::http::Method;
use futures::{stream, Stream};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::{
    batch::execute_single,
    models::{FeedPage, PartitionKeyRange, PartitionKeyRanges},
    request::{DescriptorBuilder, OperationKind},
    utils::AppendPathSegments,
    CosmosConnection, Error, ErrorPolicy, RequestDescriptor, ResponseRecord,
};

/// A stream of page records, yielded as soon as each page arrives.
pub type Pager<T> = Pin<Box<dyn Stream<Item = crate::Result<ResponseRecord<T>>> + Send>>;

/// A [`Pager`] over feed or query pages.
pub type FeedPager<T> = Pager<FeedPage<T>>;

enum State {
    Start,
    /// Paging one logical stream of pages.
    Single { continuation: Option<String> },
    /// Paging each partition key range in turn.
    Ranges {
        ranges: Vec<String>,
        index: usize,
        continuation: Option<String>,
    },
    Done,
}

struct Paging {
    connection: CosmosConnection,
    builder: DescriptorBuilder,
    auto_continue: bool,
    cancellation: Option<CancellationToken>,
    state: State,
}

/// Pages through the results of the operation described by `builder`.
///
/// Without `auto_continue` exactly one page is fetched; its continuation is returned to the
/// caller. With it, pages are fetched until the service stops returning a continuation. An
/// auto-continued query with neither a partition key nor a range id runs once per partition
/// key range, sequentially.
pub(crate) fn paginate<T>(
    connection: CosmosConnection,
    builder: DescriptorBuilder,
    auto_continue: bool,
    cancellation: Option<CancellationToken>,
) -> Pager<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let paging = Paging {
        connection,
        builder,
        auto_continue,
        cancellation,
        state: State::Start,
    };
    Box::pin(stream::unfold(paging, |mut paging| async move {
        let item = paging.next_page::<T>().await?;
        Some((item, paging))
    }))
}

impl Paging {
    fn fans_out(&self) -> bool {
        self.auto_continue
            && self.builder.kind() == OperationKind::Query
            && self.builder.current_partition_key().is_empty()
            && self.builder.current_partition_key_range_id().is_none()
    }

    async fn next_page<T: DeserializeOwned>(&mut self) -> Option<crate::Result<ResponseRecord<T>>> {
        if let State::Start = self.state {
            let continuation = self.builder.current_continuation().map(String::from);
            self.state = if self.fans_out() {
                let ranges = self.resolve_ranges().await?;
                State::Ranges {
                    ranges,
                    index: 0,
                    continuation,
                }
            } else {
                State::Single { continuation }
            };
        }

        let (continuation, range) = match &self.state {
            State::Start | State::Done => return None,
            State::Single { continuation } => (continuation.clone(), None),
            State::Ranges {
                ranges,
                index,
                continuation,
            } => (continuation.clone(), Some(ranges[*index].clone())),
        };

        if self.cancellation.as_ref().is_some_and(|c| c.is_cancelled()) {
            self.state = State::Done;
            return Some(Err(Error::Cancelled));
        }

        let mut builder = self.builder.clone().continuation(continuation);
        if range.is_some() {
            builder = builder.partition_key_range_id(range.clone());
        }
        let result = match builder.build(&self.connection).await {
            Ok(descriptor) => {
                tracing::trace!(
                    collection = descriptor.collection(),
                    pkrange_id = range.as_deref(),
                    "fetching page"
                );
                execute_single(&self.connection, descriptor, self.cancellation.as_ref()).await
            }
            Err(e) => Err(e),
        };

        let next = match &result {
            Ok(record) => record.continuation.clone(),
            Err(_) => {
                self.state = State::Done;
                return Some(result);
            }
        };
        self.advance(next);
        Some(result)
    }

    fn advance(&mut self, next: Option<String>) {
        let state = std::mem::replace(&mut self.state, State::Done);
        self.state = match state {
            _ if !self.auto_continue => State::Done,
            State::Single { .. } => match next {
                Some(continuation) => State::Single {
                    continuation: Some(continuation),
                },
                None => State::Done,
            },
            State::Ranges { ranges, index, .. } => match next {
                Some(continuation) => State::Ranges {
                    ranges,
                    index,
                    continuation: Some(continuation),
                },
                None if index + 1 < ranges.len() => State::Ranges {
                    ranges,
                    index: index + 1,
                    continuation: None,
                },
                None => State::Done,
            },
            State::Start | State::Done => State::Done,
        };
    }

    /// Returns `None`, ending the stream, when the ranges cannot be read or there are none.
    async fn resolve_ranges(&mut self) -> Option<Vec<String>> {
        let collection = self.builder.collection().to_string();
        match fetch_partition_key_ranges(&self.connection, &collection, self.cancellation.as_ref())
            .await
        {
            Ok(ranges) if !ranges.is_empty() => {
                tracing::debug!(
                    collection = %collection,
                    ranges = ranges.len(),
                    "fanning out over partition key ranges"
                );
                Some(ranges.into_iter().map(|r| r.id).collect())
            }
            Ok(_) => {
                tracing::warn!(collection = %collection, "collection has no partition key ranges");
                self.state = State::Done;
                None
            }
            Err(error) => {
                tracing::warn!(
                    collection = %collection,
                    %error,
                    "failed to read partition key ranges"
                );
                self.state = State::Done;
                None
            }
        }
    }
}

/// Reads every partition key range of `collection`, following continuations.
pub(crate) async fn fetch_partition_key_ranges(
    connection: &CosmosConnection,
    collection: &str,
    cancellation: Option<&CancellationToken>,
) -> crate::Result<Vec<PartitionKeyRange>> {
    let url = connection
        .collection_url(collection)
        .with_path_segments(["pkranges"]);
    let mut ranges = Vec::new();
    let mut continuation = None;
    loop {
        let descriptor =
            RequestDescriptor::builder(OperationKind::Other, collection, Method::Get, url.clone())
                .continuation(continuation)
                .error_policy(Some(ErrorPolicy::Raise))
                .build(connection)
                .await?;
        let record =
            execute_single::<PartitionKeyRanges>(connection, descriptor, cancellation).await?;
        if let Some(page) = record.body {
            ranges.extend(page.partition_key_ranges);
        }
        continuation = record.continuation;
        if continuation.is_none() {
            return Ok(ranges);
        }
    }
}
