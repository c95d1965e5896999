use serde::{Deserialize, Serialize};

use crate::models::tier::Tier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub email: String,
    pub current_tier: Tier,
    pub target_tier: Tier,
    pub response_id: String,
}
