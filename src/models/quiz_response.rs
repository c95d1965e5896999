use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::frequency::{FrequencyResult, FrequencyScores};
use crate::models::tier::Tier;

/// Server-assigned result of a submitted quiz. Never mutated client-side
/// except for the tier after a confirmed upgrade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub frequencies: Vec<FrequencyResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
}

impl QuizResponse {
    pub fn current_tier(&self) -> Tier {
        self.tier.unwrap_or_default()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    pub fn scores(&self) -> Result<FrequencyScores> {
        FrequencyScores::from_results(self.frequencies.iter().cloned())
    }
}
