// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Access token caching for Microsoft Entra ID (AAD) authentication.
//!
//! Acquiring tokens is delegated to an [`azure_core::credentials::TokenCredential`]. The
//! crate only caches the tokens it returns and refreshes them before they expire.

mod cache;
mod claims;

pub use cache::TokenCache;
pub use claims::TokenClaims;
