// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use azure_core::credentials::AccessToken;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bytes::Bytes;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::Error;

/// Claims carried by a Microsoft Entra ID access token.
///
/// For debugging only: the token's signature is **not** validated.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "aud")]
    pub audience: Option<String>,
    #[serde(rename = "iss")]
    pub issuer: Option<String>,
    #[serde(rename = "tid")]
    pub tenant_id: Option<String>,
    #[serde(rename = "oid")]
    pub object_id: Option<String>,
    #[serde(rename = "appid", alias = "azp")]
    pub app_id: Option<String>,
    #[serde(rename = "upn", alias = "unique_name")]
    pub user_principal_name: Option<String>,
    #[serde(rename = "scp")]
    pub scopes: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(rename = "exp", default, with = "time::serde::timestamp::option")]
    pub expires_on: Option<OffsetDateTime>,
}

impl TokenClaims {
    /// Decodes the payload segment of `token`.
    pub fn decode(token: &AccessToken) -> crate::Result<Self> {
        let raw = token.token.secret();
        let payload = raw.split('.').nth(1).ok_or_else(|| Error::Format {
            message: "access token is not a JWT".into(),
            raw: Bytes::new(),
        })?;
        let json = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::Format {
                message: format!("access token payload is not base64url: {}", e),
                raw: Bytes::new(),
            })?;
        serde_json::from_slice(&json).map_err(|e| Error::Format {
            message: format!("access token payload is not valid JSON: {}", e),
            raw: Bytes::from(json),
        })
    }
}
