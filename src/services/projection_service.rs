use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::frequency::{FrequencyResult, FrequencyScores};
use crate::models::quiz_response::QuizResponse;
use crate::models::tier::Tier;

/// The part of a result disclosed at a given rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierProjection {
    pub rank: usize,
    pub cutoff: f64,
    pub frequencies: Vec<FrequencyResult>,
    /// Ranked frequencies left out of this projection.
    pub hidden: Vec<FrequencyResult>,
}

impl TierProjection {
    pub fn names(&self) -> Vec<&str> {
        self.frequencies.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Selects every frequency scoring at least as high as the `rank`-th ranked
/// one. Boundary ties are always kept together, so the result can be longer
/// than `rank`. `rank` is clamped to `1..=len`.
pub fn project(scores: &FrequencyScores, rank: usize) -> Result<TierProjection> {
    let ranked = scores.ranked();
    if ranked.is_empty() {
        return Err(Error::EmptyFrequencies);
    }

    let position = rank.clamp(1, ranked.len()) - 1;
    let cutoff = ranked[position].value;
    let (frequencies, hidden): (Vec<FrequencyResult>, Vec<FrequencyResult>) =
        ranked.iter().cloned().partition(|f| f.value >= cutoff);

    Ok(TierProjection {
        rank,
        cutoff,
        frequencies,
        hidden,
    })
}

pub fn project_response(response: &QuizResponse, tier: Tier) -> Result<TierProjection> {
    let scores = response.scores()?;
    project(&scores, tier.rank())
}
