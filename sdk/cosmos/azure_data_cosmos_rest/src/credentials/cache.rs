// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use async_lock::{Mutex, RwLock};
use azure_core::credentials::{AccessToken, TokenCredential};
use time::OffsetDateTime;

use crate::Error;

/// Tokens are refreshed once they are this close to expiry.
const REFRESH_WINDOW: Duration = Duration::from_secs(300);

/// Caches the tokens returned by a [`TokenCredential`], per set of scopes.
///
/// A cached token is returned until it is within five minutes of expiry; the next caller then
/// refreshes it. Refreshes are serialized so concurrent callers trigger a single acquisition.
pub struct TokenCache {
    credential: Arc<dyn TokenCredential>,
    timeout: Duration,
    tokens: RwLock<HashMap<Vec<String>, AccessToken>>,
    refresh: Mutex<()>,
}

impl TokenCache {
    pub fn new(credential: Arc<dyn TokenCredential>, timeout: Duration) -> Self {
        Self {
            credential,
            timeout,
            tokens: RwLock::new(HashMap::new()),
            refresh: Mutex::new(()),
        }
    }

    pub fn credential(&self) -> &Arc<dyn TokenCredential> {
        &self.credential
    }

    /// Returns a valid token for `scopes`, acquiring one if none is cached or the cached one
    /// is about to expire.
    pub async fn get_token(&self, scopes: &[&str]) -> crate::Result<AccessToken> {
        let key: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
        if let Some(token) = self.cached(&key).await {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = self.cached(&key).await {
            return Ok(token);
        }

        tracing::debug!(?scopes, "acquiring access token");
        let token = tokio::time::timeout(self.timeout, self.credential.get_token(scopes, None))
            .await
            .map_err(|_| Error::CredentialTimeout(self.timeout))?
            .map_err(|e| Error::Credential {
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;
        self.tokens.write().await.insert(key, token.clone());
        Ok(token)
    }

    /// Drops every cached token, forcing the next call to acquire a new one.
    pub async fn clear(&self) {
        self.tokens.write().await.clear();
    }

    async fn cached(&self, key: &[String]) -> Option<AccessToken> {
        self.tokens
            .read()
            .await
            .get(key)
            .filter(|token| !expires_within(token, REFRESH_WINDOW))
            .cloned()
    }
}

fn expires_within(token: &AccessToken, window: Duration) -> bool {
    token.expires_on <= OffsetDateTime::now_utc() + window
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("credential", &self.credential)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use azure_core::credentials::TokenRequestOptions;

    use super::*;

    #[derive(Debug)]
    struct CountingCredential {
        calls: AtomicUsize,
        lifetime: time::Duration,
        delay: Duration,
    }

    impl CountingCredential {
        fn new(lifetime: time::Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                lifetime,
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl TokenCredential for CountingCredential {
        async fn get_token(
            &self,
            scopes: &[&str],
            _options: Option<TokenRequestOptions<'_>>,
        ) -> azure_core::Result<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(AccessToken::new(
                format!("token-{}-{}", scopes.join(" "), n),
                OffsetDateTime::now_utc() + self.lifetime,
            ))
        }
    }

    #[test]
    fn expiry_window() {
        let token = AccessToken::new(
            "t".to_string(),
            OffsetDateTime::now_utc() + time::Duration::minutes(3),
        );
        assert!(expires_within(&token, REFRESH_WINDOW));
        assert!(!expires_within(&token, Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn returns_cached_token_until_near_expiry() -> crate::Result<()> {
        let credential = Arc::new(CountingCredential::new(time::Duration::hours(1)));
        let cache = TokenCache::new(credential.clone(), Duration::from_secs(5));

        let first = cache.get_token(&["scope/.default"]).await?;
        let second = cache.get_token(&["scope/.default"]).await?;
        assert_eq!(first.token.secret(), second.token.secret());
        assert_eq!(credential.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn refreshes_token_inside_refresh_window() -> crate::Result<()> {
        let credential = Arc::new(CountingCredential::new(time::Duration::minutes(2)));
        let cache = TokenCache::new(credential.clone(), Duration::from_secs(5));

        let first = cache.get_token(&["scope/.default"]).await?;
        let second = cache.get_token(&["scope/.default"]).await?;
        assert_ne!(first.token.secret(), second.token.secret());
        assert_eq!(credential.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn caches_per_scope_set() -> crate::Result<()> {
        let credential = Arc::new(CountingCredential::new(time::Duration::hours(1)));
        let cache = TokenCache::new(credential.clone(), Duration::from_secs(5));

        let a = cache.get_token(&["https://a.documents.azure.com/.default"]).await?;
        let b = cache.get_token(&["https://b.documents.azure.com/.default"]).await?;
        assert_ne!(a.token.secret(), b.token.secret());
        assert_eq!(credential.calls.load(Ordering::SeqCst), 2);

        cache.clear().await;
        cache.get_token(&["https://a.documents.azure.com/.default"]).await?;
        assert_eq!(credential.calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn acquisition_times_out() {
        let credential = Arc::new(CountingCredential {
            delay: Duration::from_secs(60),
            ..CountingCredential::new(time::Duration::hours(1))
        });
        let cache = TokenCache::new(credential, Duration::from_secs(2));

        let err = cache.get_token(&["scope/.default"]).await.unwrap_err();
        assert!(matches!(err, Error::CredentialTimeout(d) if d == Duration::from_secs(2)));
    }
}
