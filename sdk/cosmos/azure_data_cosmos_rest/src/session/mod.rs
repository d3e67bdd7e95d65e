// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Session consistency tracking for Cosmos DB operations.

mod store;
mod token;

pub use store::SessionStore;
pub use token::{
    parse_collection_token, PartitionSessionToken, SessionTokenError, VectorSessionToken,
};
