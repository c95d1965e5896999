use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;
use crate::models::question::Question;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A 1..=5 agreement rating. Values outside the range cannot be constructed
/// or deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, Error> {
        Self::try_from(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::BadRequest(format!(
                "Rating must be between {} and {}, got {}",
                MIN_RATING, MAX_RATING, value
            )))
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: i64,
    pub frequency_id: i64,
    pub value: Rating,
}

impl Answer {
    pub fn for_question(question: &Question, value: Rating) -> Self {
        Self {
            question_id: question.id,
            frequency_id: question.frequency_id,
            value,
        }
    }
}

/// Answers keyed by question id. Insertion order is kept so the list can be
/// sent as-is; re-answering replaces the entry where it already sits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(Vec<Answer>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, answer: Answer) {
        if let Some(pos) = self.0.iter().position(|a| a.question_id == answer.question_id) {
            self.0[pos] = answer;
        } else {
            self.0.push(answer);
        }
    }

    pub fn get(&self, question_id: i64) -> Option<&Answer> {
        self.0.iter().find(|a| a.question_id == question_id)
    }

    pub fn contains(&self, question_id: i64) -> bool {
        self.get(question_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Answer> {
        self.0.iter()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn as_slice(&self) -> &[Answer] {
        &self.0
    }
}

impl FromIterator<Answer> for AnswerSet {
    /// Later entries for the same question win.
    fn from_iter<I: IntoIterator<Item = Answer>>(iter: I) -> Self {
        let mut set = AnswerSet::new();
        for answer in iter {
            set.upsert(answer);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(question_id: i64, value: u8) -> Answer {
        Answer {
            question_id,
            frequency_id: 1,
            value: Rating::new(value).unwrap(),
        }
    }

    #[test]
    fn rating_rejects_out_of_range_values() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert_eq!(Rating::new(5).unwrap().value(), 5);
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn upsert_keeps_only_latest_value_per_question() {
        let mut set = AnswerSet::new();
        set.upsert(answer(1, 2));
        set.upsert(answer(2, 3));
        set.upsert(answer(1, 4));
        set.upsert(answer(1, 5));

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1).unwrap().value.value(), 5);
        assert_eq!(set.as_slice()[0].question_id, 1);
    }

    #[test]
    fn answers_serialize_with_wire_field_names() {
        let json = serde_json::to_value(answer(7, 3)).unwrap();
        assert_eq!(json, serde_json::json!({"questionId": 7, "frequencyId": 1, "value": 3}));
    }
}
