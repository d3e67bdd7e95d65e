// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::Serialize;
use serde_json::Value;

/// A single partial-update operation.
///
/// Paths are JSON pointers into the document, e.g. `/address/city`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Set { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
    #[serde(rename = "incr")]
    Increment { path: String, value: Value },
    Move { from: String, path: String },
}

/// The body of a patch request: a list of operations applied atomically, optionally guarded
/// by a filter condition.
///
/// When the condition does not match the current document the service answers
/// 412 (Precondition Failed) and the document is left unchanged.
///
/// ```rust
/// use azure_data_cosmos_rest::PatchDocument;
///
/// let patch = PatchDocument::default()
///     .with_condition("from c where c.status = 'open'")
///     .with_set("/status", "closed")?
///     .with_increment("/revision", 1)?
///     .with_remove("/lock");
/// # Ok::<(), azure_data_cosmos_rest::Error>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PatchDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
    operations: Vec<PatchOperation>,
}

impl PatchDocument {
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_operation(mut self, operation: PatchOperation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn with_add(self, path: impl Into<String>, value: impl Serialize) -> crate::Result<Self> {
        let value = serde_json::to_value(value)?;
        Ok(self.with_operation(PatchOperation::Add {
            path: path.into(),
            value,
        }))
    }

    pub fn with_set(self, path: impl Into<String>, value: impl Serialize) -> crate::Result<Self> {
        let value = serde_json::to_value(value)?;
        Ok(self.with_operation(PatchOperation::Set {
            path: path.into(),
            value,
        }))
    }

    pub fn with_replace(
        self,
        path: impl Into<String>,
        value: impl Serialize,
    ) -> crate::Result<Self> {
        let value = serde_json::to_value(value)?;
        Ok(self.with_operation(PatchOperation::Replace {
            path: path.into(),
            value,
        }))
    }

    pub fn with_increment(
        self,
        path: impl Into<String>,
        value: impl Serialize,
    ) -> crate::Result<Self> {
        let value = serde_json::to_value(value)?;
        Ok(self.with_operation(PatchOperation::Increment {
            path: path.into(),
            value,
        }))
    }

    pub fn with_remove(self, path: impl Into<String>) -> Self {
        self.with_operation(PatchOperation::Remove { path: path.into() })
    }

    pub fn with_move(self, from: impl Into<String>, path: impl Into<String>) -> Self {
        self.with_operation(PatchOperation::Move {
            from: from.into(),
            path: path.into(),
        })
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }
}
