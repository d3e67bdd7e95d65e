// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![doc = include_str!("../README.md")]
// Docs.rs build is done with the nightly compiler, so we can enable nightly features in that build.
// In this case we enable two features:
// - `doc_auto_cfg`: Automatically scans `cfg` attributes and uses them to show those required configurations in the generated documentation.
// - `doc_cfg_hide`: Ignore the `doc` configuration for `doc_auto_cfg`.
// See https://doc.rust-lang.org/rustdoc/unstable-features.html#doc_auto_cfg-automatically-generate-doccfg for more details.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(docsrs, feature(doc_cfg_hide))]

mod batch;
pub mod clients;
mod connection;
pub mod constants;
pub mod credentials;
mod dispatch;
mod error;
pub mod models;
mod options;
mod pager;
mod partition_key;
mod patch;
mod query;
pub mod request;
mod response;
pub mod session;
pub(crate) mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::BatchExecutor;
#[doc(inline)]
pub use clients::CollectionClient;
pub use connection::{ConnectionBuilder, CosmosConnection};
pub use error::{Error, RequestSummary, Result, ServerError};
pub use models::{FeedPage, PartitionKeyRange};
pub use options::*;
pub use pager::{FeedPager, Pager};
pub use partition_key::*;
pub use patch::{PatchDocument, PatchOperation};
pub use query::{Query, QueryParameter};
pub use request::{OperationKind, RequestDescriptor};
pub use response::{ResponseHeaders, ResponseRecord};
