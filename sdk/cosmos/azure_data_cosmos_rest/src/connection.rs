// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
};

use azure_core::{
    credentials::{AccessToken, TokenCredential},
    http::HttpClient,
};
use url::Url;

use crate::{
    batch::BatchExecutor,
    clients::CollectionClient,
    credentials::TokenCache,
    session::SessionStore,
    utils::AppendPathSegments,
    ConnectionOptions, Error, ErrorPolicy,
};

/// A connection to one database of a Cosmos DB account.
///
/// Holds the endpoint, the bound credential, the retry budget and the session tokens of
/// every collection touched through it. Cloning is cheap and clones share all state, so one
/// connection can serve concurrent tasks.
///
/// ```rust,no_run
/// # async fn doc(credential: std::sync::Arc<dyn azure_core::credentials::TokenCredential>) -> azure_data_cosmos_rest::Result<()> {
/// use azure_data_cosmos_rest::CosmosConnection;
///
/// let connection = CosmosConnection::connect("myaccount", "mydb", credential, None)?;
/// let record = connection
///     .collection_client("docs")
///     .read_document::<serde_json::Value>("123", "test-docs", None)
///     .await?;
/// assert!(record.is_success);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CosmosConnection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    account: String,
    database: String,
    endpoint: Url,
    scopes: Vec<String>,
    options: ConnectionOptions,
    tokens: Option<TokenCache>,
    http_client: Arc<dyn HttpClient>,
    sessions: SessionStore,
    max_retries: AtomicU32,
    throttle_rounds: AtomicU64,
}

impl CosmosConnection {
    /// Connects to `database` in `account`, authenticating with `credential`.
    pub fn connect(
        account: impl Into<String>,
        database: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
        options: Option<ConnectionOptions>,
    ) -> crate::Result<Self> {
        let mut builder = Self::builder(account, database).credential(credential);
        if let Some(options) = options {
            builder = builder.options(options);
        }
        builder.build()
    }

    pub fn builder(account: impl Into<String>, database: impl Into<String>) -> ConnectionBuilder {
        ConnectionBuilder {
            account: account.into(),
            database: database.into(),
            credential: None,
            options: ConnectionOptions::default(),
            http_client: None,
        }
    }

    pub fn account(&self) -> &str {
        &self.inner.account
    }

    pub fn database(&self) -> &str {
        &self.inner.database
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    pub fn scopes(&self) -> &[String] {
        &self.inner.scopes
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.inner.options
    }

    pub fn api_version(&self) -> &str {
        &self.inner.options.api_version
    }

    pub fn collect_response_headers(&self) -> bool {
        self.inner.options.collect_response_headers
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.inner.options.error_policy
    }

    /// The throttle retry budget copied into every new request.
    pub fn max_retries(&self) -> u32 {
        self.inner.max_retries.load(Ordering::Relaxed)
    }

    /// Changes the retry budget for requests built from now on.
    pub fn set_max_retries(&self, max_retries: u32) {
        self.inner.max_retries.store(max_retries, Ordering::Relaxed);
    }

    /// Number of throttle retry rounds performed through this connection.
    pub fn throttle_rounds(&self) -> u64 {
        self.inner.throttle_rounds.load(Ordering::Relaxed)
    }

    pub(crate) fn record_throttle_round(&self) {
        self.inner.throttle_rounds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub(crate) fn http_client(&self) -> &Arc<dyn HttpClient> {
        &self.inner.http_client
    }

    /// Gets a valid access token from the bound credential.
    ///
    /// Fails with [`Error::NotInitialized`] when no credential was bound.
    pub async fn access_token(&self) -> crate::Result<AccessToken> {
        let cache = self.inner.tokens.as_ref().ok_or_else(|| {
            Error::NotInitialized(format!(
                "no credential is bound to the connection for account '{}'",
                self.inner.account
            ))
        })?;
        let scopes: Vec<&str> = self.inner.scopes.iter().map(String::as_str).collect();
        cache.get_token(&scopes).await
    }

    pub(crate) fn collection_url(&self, collection: &str) -> Url {
        self.inner
            .endpoint
            .with_path_segments(["dbs", &self.inner.database, "colls", collection])
    }

    /// Gets a [`CollectionClient`] for the collection with the specified name.
    pub fn collection_client(&self, name: impl AsRef<str>) -> CollectionClient {
        CollectionClient::new(self.clone(), name.as_ref())
    }

    /// Starts a batch using the connection's configured width.
    pub fn batch<T>(&self) -> BatchExecutor<T> {
        self.batch_with_width(self.inner.options.batch_width)
    }

    pub fn batch_with_width<T>(&self, width: usize) -> BatchExecutor<T> {
        BatchExecutor::new(self.clone(), width)
    }
}

impl fmt::Debug for CosmosConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosConnection")
            .field("account", &self.inner.account)
            .field("database", &self.inner.database)
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("max_retries", &self.max_retries())
            .field("has_credential", &self.inner.tokens.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder used to construct a [`CosmosConnection`].
///
/// Obtain one by calling [`CosmosConnection::builder()`].
pub struct ConnectionBuilder {
    account: String,
    database: String,
    credential: Option<Arc<dyn TokenCredential>>,
    options: ConnectionOptions,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl ConnectionBuilder {
    pub fn credential(mut self, credential: Arc<dyn TokenCredential>) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the shared default transport.
    pub fn http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn build(self) -> crate::Result<CosmosConnection> {
        if self.account.is_empty() {
            return Err(Error::NotInitialized("account name is empty".into()));
        }
        if self.database.is_empty() {
            return Err(Error::NotInitialized("database name is empty".into()));
        }

        let endpoint: Url = match &self.options.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}.documents.azure.com/", self.account)
                .parse()
                .map_err(|e| {
                    Error::NotInitialized(format!(
                        "account '{}' does not form a valid endpoint: {}",
                        self.account, e
                    ))
                })?,
        };
        let scopes = if self.options.scopes.is_empty() {
            vec![format!("{}/.default", endpoint.as_str().trim_end_matches('/'))]
        } else {
            self.options.scopes.clone()
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => default_http_client()?,
        };
        let tokens = self
            .credential
            .map(|credential| TokenCache::new(credential, self.options.token_timeout));

        tracing::debug!(
            account = %self.account,
            database = %self.database,
            endpoint = %endpoint,
            "connection created"
        );

        Ok(CosmosConnection {
            inner: Arc::new(ConnectionInner {
                max_retries: AtomicU32::new(self.options.max_retries),
                throttle_rounds: AtomicU64::new(0),
                account: self.account,
                database: self.database,
                endpoint,
                scopes,
                options: self.options,
                tokens,
                http_client,
                sessions: SessionStore::new(),
            }),
        })
    }
}

#[cfg(feature = "reqwest")]
fn default_http_client() -> crate::Result<Arc<dyn HttpClient>> {
    Ok(azure_core::http::new_http_client())
}

#[cfg(not(feature = "reqwest"))]
fn default_http_client() -> crate::Result<Arc<dyn HttpClient>> {
    Err(Error::NotInitialized(
        "no HTTP client was supplied and the `reqwest` feature is disabled".into(),
    ))
}
