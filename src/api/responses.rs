use serde::{Deserialize, Serialize};

use crate::db::models::UpdateOutcome;

/// Response from a successful create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    /// Store-assigned internal id (hex `ObjectId`).
    pub id: String,
}

/// Response from a partial or single-field update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedResponse {
    pub message: String,
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdatedResponse {
    pub fn new(message: String, outcome: UpdateOutcome) -> Self {
        Self {
            message,
            matched_count: outcome.matched,
            modified_count: outcome.modified,
        }
    }
}

/// Response from a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub message: String,
    pub deleted_count: u64,
}
