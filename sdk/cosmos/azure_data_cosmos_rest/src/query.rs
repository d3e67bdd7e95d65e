// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::Serialize;

/// A Cosmos DB SQL query, with optional named parameters.
///
/// Simple queries can be created directly from a string:
///
/// ```rust
/// use azure_data_cosmos_rest::Query;
///
/// let query = Query::from("SELECT * FROM c");
/// ```
///
/// Parameters are referenced by name from the query text and attached with [`Query::with_parameter`]:
///
/// ```rust
/// # use azure_data_cosmos_rest::Query;
/// let query = Query::from("SELECT * FROM c WHERE c.id = @id AND c.size > @size")
///     .with_parameter("@id", "123")?
///     .with_parameter("@size", 10)?;
/// # Ok::<(), azure_data_cosmos_rest::Error>(())
/// ```
#[derive(Clone, Debug, Serialize)]
pub struct Query {
    #[serde(rename = "query")]
    text: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<QueryParameter>,
}

/// A named parameter of a [`Query`].
#[derive(Clone, Debug, Serialize)]
pub struct QueryParameter {
    name: String,
    value: serde_json::Value,
}

impl Query {
    /// Adds a parameter, serializing its value to JSON.
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Serialize,
    ) -> crate::Result<Self> {
        self.parameters.push(QueryParameter {
            name: name.into(),
            value: serde_json::to_value(value)?,
        });
        Ok(self)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Iterates over the parameters as `(name, value)` pairs.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.parameters.iter().map(|p| (p.name.as_str(), &p.value))
    }
}

impl<T: Into<String>> From<T> for Query {
    fn from(value: T) -> Self {
        Self {
            text: value.into(),
            parameters: Vec::new(),
        }
    }
}
