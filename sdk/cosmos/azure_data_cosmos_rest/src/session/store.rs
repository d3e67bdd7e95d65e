// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use super::token::parse_collection_token;

#[derive(Debug, Default)]
struct CollectionSession {
    /// The raw token of the most recent successful response.
    latest: String,
    /// Partition tokens indexed by partition key range id.
    ranges: HashMap<String, String>,
}

/// Session tokens for every collection of a connection.
///
/// The most recent token returned for a collection always wins. When a token carries
/// partition key range components they are also indexed by range id, so a request pinned to
/// one range can send that range's own token.
///
/// Tokens are only recorded from successful responses; callers can read or forget them but
/// not supply their own.
///
/// ```rust,compile_fail
/// let store = azure_data_cosmos_rest::session::SessionStore::new();
/// store.record("docs", "0:1#100");
/// ```
#[derive(Debug, Default)]
pub struct SessionStore {
    collections: RwLock<HashMap<String, CollectionSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the session token returned for `collection`, overwriting the stored one.
    pub(crate) fn record(&self, collection: &str, token: &str) {
        if token.is_empty() {
            return;
        }
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let session = collections.entry(collection.to_string()).or_default();
        session.latest = token.to_string();

        match parse_collection_token(token) {
            Ok(partitions) => {
                for partition in partitions {
                    session
                        .ranges
                        .insert(partition.pkrange_id.clone(), partition.to_string());
                }
            }
            Err(error) => {
                tracing::trace!(collection, %error, "session token stored without range index");
            }
        }
    }

    /// The token to send on the next request to `collection`.
    ///
    /// When `pkrange_id` is given and a token for that range is known it is returned,
    /// otherwise the collection's latest token.
    pub fn session_token(&self, collection: &str, pkrange_id: Option<&str>) -> Option<String> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let session = collections.get(collection)?;
        pkrange_id
            .and_then(|id| session.ranges.get(id))
            .or(Some(&session.latest))
            .filter(|t| !t.is_empty())
            .cloned()
    }

    /// Forgets the tokens of one collection.
    pub fn clear(&self, collection: &str) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(collection);
    }

    pub fn clear_all(&self) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of collections with a stored token.
    pub fn len(&self) -> usize {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
