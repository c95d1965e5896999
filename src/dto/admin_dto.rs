use serde::{Deserialize, Serialize};

use crate::models::quiz_response::QuizResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseListParams {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for ResponseListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 50,
            search: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseListPage {
    pub items: Vec<QuizResponse>,
    pub total: u64,
}
