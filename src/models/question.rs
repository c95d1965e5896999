use serde::{Deserialize, Serialize};

/// A quiz prompt as served by the backend. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub description: String,
    pub frequency_id: i64,
}
