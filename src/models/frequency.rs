use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{Error, Result};

/// One scored frequency from a quiz response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Frequency name → result, ranked by score descending then name ascending.
///
/// Keys are frequency names as sent by the backend. Entries are validated on
/// construction: names must be non-empty and scores finite. A repeated name
/// keeps the last entry seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyScores {
    ranked: Vec<FrequencyResult>,
}

impl FrequencyScores {
    pub fn from_results<I>(results: I) -> Result<Self>
    where
        I: IntoIterator<Item = FrequencyResult>,
    {
        let mut entries: Vec<FrequencyResult> = Vec::new();
        for result in results {
            let name = result.name.trim();
            if name.is_empty() {
                return Err(Error::InvalidData("Frequency with empty name".to_string()));
            }
            if !result.value.is_finite() {
                return Err(Error::InvalidData(format!(
                    "Frequency '{}' has a non-numeric score",
                    name
                )));
            }
            let result = FrequencyResult {
                name: name.to_string(),
                ..result
            };
            if let Some(pos) = entries.iter().position(|e| e.name == result.name) {
                tracing::warn!(
                    frequency = %result.name,
                    "Duplicate frequency in response, keeping last"
                );
                entries[pos] = result;
            } else {
                entries.push(result);
            }
        }
        entries.sort_by(rank_order);
        Ok(Self { ranked: entries })
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        Self::from_results(pairs.into_iter().map(|(name, value)| FrequencyResult {
            id: None,
            name: name.to_string(),
            value,
            description: None,
        }))
    }

    pub fn ranked(&self) -> &[FrequencyResult] {
        &self.ranked
    }

    pub fn get(&self, name: &str) -> Option<&FrequencyResult> {
        self.ranked.iter().find(|f| f.name == name)
    }

    pub fn top(&self) -> Option<&FrequencyResult> {
        self.ranked.first()
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

fn rank_order(a: &FrequencyResult, b: &FrequencyResult) -> Ordering {
    b.value.total_cmp(&a.value).then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_by_score_then_name() {
        let scores = FrequencyScores::from_pairs([
            ("Dreamer", 40.0),
            ("Catalyst", 55.0),
            ("Anchor", 60.0),
            ("Bridge", 55.0),
        ])
        .unwrap();
        let names: Vec<&str> = scores.ranked().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Anchor", "Bridge", "Catalyst", "Dreamer"]);
    }

    #[test]
    fn rejects_invalid_entries() {
        assert!(FrequencyScores::from_pairs([("", 1.0)]).is_err());
        assert!(FrequencyScores::from_pairs([("Anchor", f64::NAN)]).is_err());
    }

    #[test]
    fn duplicate_names_keep_last() {
        let scores = FrequencyScores::from_pairs([("Anchor", 10.0), ("Anchor", 30.0)]).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores.get("Anchor").unwrap().value, 30.0);
    }
}
