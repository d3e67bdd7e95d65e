// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Model types sent to and received from the Cosmos DB API.

use serde::{Deserialize, Serialize};

/// A single page of a document feed or query.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FeedPage<T> {
    #[serde(rename = "_rid", default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(rename = "Documents", default = "Vec::new")]
    pub documents: Vec<T>,

    #[serde(rename = "_count", default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl<T> FeedPage<T> {
    /// Gets the items in this page.
    pub fn items(&self) -> &[T] {
        &self.documents
    }

    /// Consumes the page, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.documents
    }
}

/// A physical partition's key range within a collection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKeyRange {
    pub id: String,
    #[serde(default)]
    pub min_inclusive: String,
    #[serde(default)]
    pub max_exclusive: String,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct PartitionKeyRanges {
    #[serde(rename = "PartitionKeyRanges", default)]
    pub partition_key_ranges: Vec<PartitionKeyRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_query_page() {
        let page: FeedPage<serde_json::Value> = serde_json::from_str(
            r#"{"_rid":"abc==","Documents":[{"id":"1"},{"id":"2"}],"_count":2}"#,
        )
        .unwrap();
        assert_eq!(page.resource_id.as_deref(), Some("abc=="));
        assert_eq!(page.count, Some(2));
        assert_eq!(page.into_items().len(), 2);
    }

    #[test]
    fn deserialize_partition_key_ranges() {
        let ranges: PartitionKeyRanges = serde_json::from_str(
            r#"{"_rid":"x","PartitionKeyRanges":[{"id":"0","minInclusive":"","maxExclusive":"FF","ridPrefix":0}],"_count":1}"#,
        )
        .unwrap();
        assert_eq!(
            ranges.partition_key_ranges,
            vec![PartitionKeyRange {
                id: "0".into(),
                min_inclusive: "".into(),
                max_exclusive: "FF".into(),
            }]
        );
    }
}
