// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use azure_core::http::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use crate::{
    batch::execute_single,
    constants,
    models::PartitionKeyRange,
    options::{
        DeleteDocumentOptions, PatchDocumentOptions, ProcedureOptions, QueryOptions,
        ReadDocumentOptions, WriteDocumentOptions,
    },
    pager::{fetch_partition_key_ranges, paginate, FeedPager, Pager},
    request::{DescriptorBuilder, OperationKind},
    utils::AppendPathSegments,
    CosmosConnection, PartitionKey, PatchDocument, Query, RequestDescriptor, ResponseRecord,
};

/// A client for the documents, stored procedures and partition key ranges of one collection.
///
/// You can get a `CollectionClient` by calling
/// [`CosmosConnection::collection_client()`](crate::CosmosConnection::collection_client()).
///
/// Every point operation has a `prepare_*` form that returns the [`RequestDescriptor`] instead
/// of sending it, for submission through a [`BatchExecutor`](crate::BatchExecutor).
#[derive(Clone, Debug)]
pub struct CollectionClient {
    connection: CosmosConnection,
    name: String,
    collection_url: Url,
}

impl CollectionClient {
    pub(crate) fn new(connection: CosmosConnection, name: &str) -> Self {
        let collection_url = connection.collection_url(name);
        Self {
            connection,
            name: name.to_string(),
            collection_url,
        }
    }

    /// Returns the name of the collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> &CosmosConnection {
        &self.connection
    }

    fn document_url(&self, id: &str) -> Url {
        self.collection_url.with_path_segments(["docs", id])
    }

    fn builder(&self, kind: OperationKind, method: Method, url: Url) -> DescriptorBuilder {
        RequestDescriptor::builder(kind, self.name.as_str(), method, url)
    }

    pub async fn prepare_read_document(
        &self,
        id: &str,
        partition_key: impl Into<PartitionKey>,
        options: Option<ReadDocumentOptions>,
    ) -> crate::Result<RequestDescriptor> {
        let options = options.unwrap_or_default();
        self.builder(OperationKind::Other, Method::Get, self.document_url(id))
            .partition_key(partition_key)
            .etag(options.if_none_match_etag)
            .priority(options.priority)
            .error_policy(options.error_policy)
            .build(&self.connection)
            .await
    }

    /// Reads a document.
    ///
    /// With an `If-None-Match` ETag, an unchanged document answers 304: a successful record
    /// with no body.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # async fn doc(docs: azure_data_cosmos_rest::clients::CollectionClient) -> azure_data_cosmos_rest::Result<()> {
    /// #[derive(serde::Deserialize)]
    /// struct Product {
    ///     id: String,
    ///     price: f64,
    /// }
    ///
    /// let record = docs.read_document::<Product>("123", "test-docs", None).await?;
    /// if let Some(product) = record.body {
    ///     println!("{} costs {} ({} RU)", product.id, product.price, record.charge);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn read_document<T: DeserializeOwned>(
        &self,
        id: &str,
        partition_key: impl Into<PartitionKey>,
        options: Option<ReadDocumentOptions>,
    ) -> crate::Result<ResponseRecord<T>> {
        let cancellation = options.as_ref().and_then(|o| o.cancellation.clone());
        let descriptor = self.prepare_read_document(id, partition_key, options).await?;
        execute_single(&self.connection, descriptor, cancellation.as_ref()).await
    }

    pub async fn prepare_create_document<D: Serialize>(
        &self,
        document: &D,
        partition_key: impl Into<PartitionKey>,
        options: Option<WriteDocumentOptions>,
    ) -> crate::Result<RequestDescriptor> {
        let options = options.unwrap_or_default();
        let payload = serde_json::to_vec(document)?;
        self.builder(
            OperationKind::Document,
            Method::Post,
            self.collection_url.with_path_segments(["docs"]),
        )
        .partition_key(partition_key)
        .payload(payload)
        .upsert(options.upsert)
        .etag(options.if_match_etag)
        .no_content(options.no_content)
        .priority(options.priority)
        .error_policy(options.error_policy)
        .build(&self.connection)
        .await
    }

    /// Creates a document, or replaces it when [`WriteDocumentOptions::upsert`] is set.
    pub async fn create_document<D>(
        &self,
        document: &D,
        partition_key: impl Into<PartitionKey>,
        options: Option<WriteDocumentOptions>,
    ) -> crate::Result<ResponseRecord<D>>
    where
        D: Serialize + DeserializeOwned,
    {
        let cancellation = options.as_ref().and_then(|o| o.cancellation.clone());
        let descriptor = self
            .prepare_create_document(document, partition_key, options)
            .await?;
        execute_single(&self.connection, descriptor, cancellation.as_ref()).await
    }

    pub async fn prepare_replace_document<D: Serialize>(
        &self,
        id: &str,
        document: &D,
        partition_key: impl Into<PartitionKey>,
        options: Option<WriteDocumentOptions>,
    ) -> crate::Result<RequestDescriptor> {
        let options = options.unwrap_or_default();
        let payload = serde_json::to_vec(document)?;
        self.builder(OperationKind::Document, Method::Put, self.document_url(id))
            .partition_key(partition_key)
            .payload(payload)
            .upsert(options.upsert)
            .etag(options.if_match_etag)
            .no_content(options.no_content)
            .priority(options.priority)
            .error_policy(options.error_policy)
            .build(&self.connection)
            .await
    }

    /// Replaces a document. With an ETag the replace only succeeds if the document is unchanged.
    pub async fn replace_document<D>(
        &self,
        id: &str,
        document: &D,
        partition_key: impl Into<PartitionKey>,
        options: Option<WriteDocumentOptions>,
    ) -> crate::Result<ResponseRecord<D>>
    where
        D: Serialize + DeserializeOwned,
    {
        let cancellation = options.as_ref().and_then(|o| o.cancellation.clone());
        let descriptor = self
            .prepare_replace_document(id, document, partition_key, options)
            .await?;
        execute_single(&self.connection, descriptor, cancellation.as_ref()).await
    }

    pub async fn prepare_delete_document(
        &self,
        id: &str,
        partition_key: impl Into<PartitionKey>,
        options: Option<DeleteDocumentOptions>,
    ) -> crate::Result<RequestDescriptor> {
        let options = options.unwrap_or_default();
        self.builder(OperationKind::Other, Method::Delete, self.document_url(id))
            .partition_key(partition_key)
            .etag(options.if_none_match_etag)
            .priority(options.priority)
            .error_policy(options.error_policy)
            .build(&self.connection)
            .await
    }

    pub async fn delete_document(
        &self,
        id: &str,
        partition_key: impl Into<PartitionKey>,
        options: Option<DeleteDocumentOptions>,
    ) -> crate::Result<ResponseRecord<Value>> {
        let cancellation = options.as_ref().and_then(|o| o.cancellation.clone());
        let descriptor = self
            .prepare_delete_document(id, partition_key, options)
            .await?;
        execute_single(&self.connection, descriptor, cancellation.as_ref()).await
    }

    pub async fn prepare_patch_document(
        &self,
        id: &str,
        partition_key: impl Into<PartitionKey>,
        patch: &PatchDocument,
        options: Option<PatchDocumentOptions>,
    ) -> crate::Result<RequestDescriptor> {
        let options = options.unwrap_or_default();
        let payload = serde_json::to_vec(patch)?;
        self.builder(OperationKind::Document, Method::Patch, self.document_url(id))
            .partition_key(partition_key)
            .payload(payload)
            .content_type(constants::JSON_PATCH_CONTENT_TYPE)
            .etag(options.if_match_etag)
            .no_content(options.no_content)
            .priority(options.priority)
            .error_policy(options.error_policy)
            .build(&self.connection)
            .await
    }

    /// Applies a partial update to a document.
    ///
    /// When the patch condition does not match, the service answers 412 (Precondition
    /// Failed). That failure is never retried.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # async fn doc(docs: azure_data_cosmos_rest::clients::CollectionClient) -> azure_data_cosmos_rest::Result<()> {
    /// use azure_data_cosmos_rest::PatchDocument;
    ///
    /// let patch = PatchDocument::default()
    ///     .with_condition("from c where c.stock > 0")
    ///     .with_increment("/stock", -1)?;
    /// let record = docs
    ///     .patch_document::<serde_json::Value>("123", "test-docs", &patch, None)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn patch_document<T: DeserializeOwned>(
        &self,
        id: &str,
        partition_key: impl Into<PartitionKey>,
        patch: &PatchDocument,
        options: Option<PatchDocumentOptions>,
    ) -> crate::Result<ResponseRecord<T>> {
        let cancellation = options.as_ref().and_then(|o| o.cancellation.clone());
        let descriptor = self
            .prepare_patch_document(id, partition_key, patch, options)
            .await?;
        execute_single(&self.connection, descriptor, cancellation.as_ref()).await
    }

    fn feed_builder(
        &self,
        kind: OperationKind,
        method: Method,
        options: &QueryOptions,
    ) -> DescriptorBuilder {
        self.builder(kind, method, self.collection_url.with_path_segments(["docs"]))
            .partition_key(options.partition_key.clone())
            .partition_key_range_id(options.partition_key_range_id.clone())
            .continuation(options.continuation.clone())
            .max_item_count(options.max_item_count)
            .priority(options.priority)
            .error_policy(options.error_policy)
    }

    /// Reads the documents of the collection, a page at a time.
    pub fn list_documents<T>(&self, options: Option<QueryOptions>) -> FeedPager<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let options = options.unwrap_or_default();
        let builder = self.feed_builder(OperationKind::Other, Method::Get, &options);
        paginate(
            self.connection.clone(),
            builder,
            options.auto_continue,
            options.cancellation,
        )
    }

    pub async fn prepare_query_documents(
        &self,
        query: impl Into<Query>,
        options: Option<QueryOptions>,
    ) -> crate::Result<RequestDescriptor> {
        let options = options.unwrap_or_default();
        let payload = serde_json::to_vec(&query.into())?;
        self.feed_builder(OperationKind::Query, Method::Post, &options)
            .payload(payload)
            .build(&self.connection)
            .await
    }

    /// Executes a query against the collection.
    ///
    /// Each item of the returned stream is one page. Without
    /// [`QueryOptions::auto_continue`] the stream yields a single page; feed its
    /// `continuation` back through [`QueryOptions::continuation`] to get the next one.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # async fn doc(docs: azure_data_cosmos_rest::clients::CollectionClient) -> azure_data_cosmos_rest::Result<()> {
    /// use azure_data_cosmos_rest::{Query, QueryOptions};
    /// use futures::StreamExt;
    ///
    /// let query = Query::from("SELECT * FROM c WHERE c.price > @min").with_parameter("@min", 10)?;
    /// let options = QueryOptions {
    ///     auto_continue: true,
    ///     ..Default::default()
    /// };
    /// let mut pages = docs.query_documents::<serde_json::Value>(query, Some(options))?;
    /// let mut charge = 0;
    /// while let Some(page) = pages.next().await {
    ///     let page = page?;
    ///     charge += page.charge;
    ///     for item in page.body.map(|p| p.into_items()).unwrap_or_default() {
    ///         println!("{}", item);
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn query_documents<T>(
        &self,
        query: impl Into<Query>,
        options: Option<QueryOptions>,
    ) -> crate::Result<FeedPager<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let options = options.unwrap_or_default();
        let payload = serde_json::to_vec(&query.into())?;
        let builder = self
            .feed_builder(OperationKind::Query, Method::Post, &options)
            .payload(payload);
        Ok(paginate(
            self.connection.clone(),
            builder,
            options.auto_continue,
            options.cancellation,
        ))
    }

    fn procedure_builder(
        &self,
        name: &str,
        partition_key: PartitionKey,
        parameters: &[Value],
        options: &ProcedureOptions,
    ) -> crate::Result<DescriptorBuilder> {
        let payload = serde_json::to_vec(parameters)?;
        Ok(self
            .builder(
                OperationKind::ProcedureCall,
                Method::Post,
                self.collection_url.with_path_segments(["sprocs", name]),
            )
            .partition_key(partition_key)
            .payload(payload)
            .continuation(options.continuation.clone())
            .max_item_count(options.max_item_count)
            .priority(options.priority)
            .error_policy(options.error_policy))
    }

    pub async fn prepare_execute_procedure(
        &self,
        name: &str,
        partition_key: impl Into<PartitionKey>,
        parameters: &[Value],
        options: Option<ProcedureOptions>,
    ) -> crate::Result<RequestDescriptor> {
        let options = options.unwrap_or_default();
        self.procedure_builder(name, partition_key.into(), parameters, &options)?
            .build(&self.connection)
            .await
    }

    /// Executes a stored procedure with `parameters` as its argument list.
    ///
    /// Procedures that return a continuation are paged like queries.
    pub fn execute_procedure<T>(
        &self,
        name: &str,
        partition_key: impl Into<PartitionKey>,
        parameters: &[Value],
        options: Option<ProcedureOptions>,
    ) -> crate::Result<Pager<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let options = options.unwrap_or_default();
        let builder = self.procedure_builder(name, partition_key.into(), parameters, &options)?;
        Ok(paginate(
            self.connection.clone(),
            builder,
            options.auto_continue,
            options.cancellation,
        ))
    }

    /// Reads the partition key ranges of the collection.
    pub async fn partition_key_ranges(&self) -> crate::Result<Vec<PartitionKeyRange>> {
        fetch_partition_key_ranges(&self.connection, &self.name, None).await
    }
}
