use serde::{Deserialize, Serialize};

use crate::models::answer::Answer;
use crate::models::user::UserData;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponsePayload {
    pub user_data: UserData,
    pub answers: Vec<Answer>,
}

/// Error body shapes the backend is known to return.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}
