// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Parsing of the session tokens returned in `x-ms-session-token`.

use std::{collections::BTreeMap, fmt, str::FromStr};

/// Errors that can occur when parsing session tokens.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionTokenError {
    #[error("session token is empty")]
    EmptyInput,
    #[error("missing required components (version and global LSN)")]
    MissingComponents,
    #[error("invalid version: '{0}'")]
    InvalidVersion(String),
    #[error("invalid global LSN: '{0}'")]
    InvalidGlobalLsn(String),
    #[error("invalid region ID: '{0}'")]
    InvalidRegionId(String),
    #[error("invalid region LSN: '{0}'")]
    InvalidRegionLsn(String),
    #[error("malformed regional component: '{0}'")]
    MalformedRegionalComponent(String),
}

/// Digits only: `str::parse` would also accept a leading `+`.
fn parse_digits<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// The `<version>#<global lsn>[#<region>=<lsn>...]` part of a partition session token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorSessionToken {
    pub version: u64,
    pub global_lsn: u64,
    pub regional_lsns: BTreeMap<u32, u64>,
}

impl FromStr for VectorSessionToken {
    type Err = SessionTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SessionTokenError::EmptyInput);
        }

        let mut parts = s.split('#');
        let version_str = parts.next().unwrap_or_default();
        let global_str = parts.next().ok_or(SessionTokenError::MissingComponents)?;

        let version = parse_digits(version_str)
            .ok_or_else(|| SessionTokenError::InvalidVersion(version_str.to_string()))?;
        if global_str.is_empty() {
            return Err(SessionTokenError::MissingComponents);
        }
        let global_lsn = parse_digits(global_str)
            .ok_or_else(|| SessionTokenError::InvalidGlobalLsn(global_str.to_string()))?;

        let mut regional_lsns = BTreeMap::new();
        for component in parts {
            let (region, lsn) = component
                .split_once('=')
                .filter(|(r, l)| !r.is_empty() && !l.is_empty())
                .ok_or_else(|| {
                    SessionTokenError::MalformedRegionalComponent(component.to_string())
                })?;
            let region = parse_digits(region)
                .ok_or_else(|| SessionTokenError::InvalidRegionId(region.to_string()))?;
            let lsn = parse_digits(lsn)
                .ok_or_else(|| SessionTokenError::InvalidRegionLsn(lsn.to_string()))?;
            regional_lsns.insert(region, lsn);
        }

        Ok(Self {
            version,
            global_lsn,
            regional_lsns,
        })
    }
}

impl fmt::Display for VectorSessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.version, self.global_lsn)?;
        for (region, lsn) in &self.regional_lsns {
            write!(f, "#{}={}", region, lsn)?;
        }
        Ok(())
    }
}

/// A session token scoped to one partition key range: `<pkrange id>:<vector token>`.
///
/// For example `42:1#123#4=500#5=600`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionSessionToken {
    pub pkrange_id: String,
    pub vector_token: VectorSessionToken,
}

impl FromStr for PartitionSessionToken {
    type Err = SessionTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SessionTokenError::EmptyInput);
        }
        let (pkrange_id, vector) = s
            .split_once(':')
            .filter(|(id, v)| !id.is_empty() && !v.is_empty())
            .ok_or(SessionTokenError::MissingComponents)?;
        Ok(Self {
            pkrange_id: pkrange_id.to_string(),
            vector_token: vector.parse()?,
        })
    }
}

impl fmt::Display for PartitionSessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pkrange_id, self.vector_token)
    }
}

/// Splits a collection session token (comma-separated partition tokens) into its parts.
pub fn parse_collection_token(
    token: &str,
) -> Result<Vec<PartitionSessionToken>, SessionTokenError> {
    if token.trim().is_empty() {
        return Err(SessionTokenError::EmptyInput);
    }
    token
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse)
        .collect()
}
