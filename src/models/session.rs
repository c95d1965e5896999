use serde::{Deserialize, Serialize};

use crate::models::answer::{Answer, AnswerSet};
use crate::models::question::Question;
use crate::models::quiz_response::QuizResponse;
use crate::models::user::UserData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    AwaitingUserData,
    InProgress,
    Submitting,
    Completed,
    Error,
}

/// Everything one quiz session knows. `is_loading`, `error` and `submitting`
/// are transient and never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizSessionState {
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub answers: AnswerSet,
    pub user_data: Option<UserData>,
    pub quiz_response: Option<QuizResponse>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub submitting: bool,
}

impl QuizSessionState {
    pub fn phase(&self) -> QuizPhase {
        if self.quiz_response.is_some() {
            QuizPhase::Completed
        } else if self.error.is_some() {
            QuizPhase::Error
        } else if self.submitting {
            QuizPhase::Submitting
        } else if self.user_data.is_none() || self.questions.is_empty() {
            QuizPhase::AwaitingUserData
        } else {
            QuizPhase::InProgress
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    pub fn current_answer(&self) -> Option<&Answer> {
        self.current_question()
            .and_then(|q| self.answers.get(q.id))
    }

    pub fn is_complete(&self) -> bool {
        !self.questions.is_empty() && self.current_question_index == self.questions.len()
    }

    pub fn can_go_forward(&self) -> bool {
        self.current_answer().is_some()
    }

    pub fn can_go_back(&self) -> bool {
        self.current_question_index > 0
    }

    /// Fraction of questions answered, 0.0..=1.0.
    pub fn progress(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        let answered = self
            .questions
            .iter()
            .filter(|q| self.answers.contains(q.id))
            .count();
        answered as f64 / self.questions.len() as f64
    }
}
