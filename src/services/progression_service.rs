use tracing::{info, warn};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::answer::{Answer, Rating};
use crate::models::question::Question;
use crate::models::quiz_response::QuizResponse;
use crate::models::session::{QuizPhase, QuizSessionState};
use crate::models::tier::Tier;
use crate::models::user::UserData;
use crate::services::backend::QuizBackend;
use crate::services::persistence_service::{SessionPersistence, SessionStorage};

#[derive(Debug, Clone)]
pub enum QuizAction {
    LoadingStarted,
    /// Installs the participant together with a fresh question list. Answers
    /// and position are discarded since old answers may point at ids that no
    /// longer mean the same thing.
    QuizStarted {
        questions: Vec<Question>,
        user_data: UserData,
    },
    Answered(Rating),
    NextQuestion,
    PreviousQuestion,
    SubmissionStarted,
    SubmissionSucceeded(QuizResponse),
    SubmissionFailed(String),
    Failed(String),
    ErrorCleared,
    TierUpgraded(Tier),
    Reset,
}

/// Applies one action. Actions that are not allowed in the current state
/// leave it untouched.
pub fn reduce(state: &mut QuizSessionState, action: QuizAction) {
    let locked = state.submitting || state.quiz_response.is_some();
    match action {
        QuizAction::LoadingStarted => {
            state.is_loading = true;
            state.error = None;
        }
        QuizAction::QuizStarted {
            questions,
            user_data,
        } => {
            state.questions = questions;
            state.current_question_index = 0;
            state.answers.clear();
            state.user_data = Some(user_data);
            state.is_loading = false;
            state.error = None;
        }
        QuizAction::Answered(value) => {
            if locked {
                return;
            }
            if let Some(answer) = state.current_question().map(|q| Answer::for_question(q, value)) {
                state.answers.upsert(answer);
            }
        }
        QuizAction::NextQuestion => {
            if !locked && state.can_go_forward() {
                state.current_question_index += 1;
            }
        }
        QuizAction::PreviousQuestion => {
            if !locked && state.can_go_back() {
                state.current_question_index -= 1;
            }
        }
        QuizAction::SubmissionStarted => {
            state.submitting = true;
            state.is_loading = true;
            state.error = None;
        }
        QuizAction::SubmissionSucceeded(response) => {
            state.submitting = false;
            state.is_loading = false;
            state.quiz_response = Some(response);
        }
        QuizAction::SubmissionFailed(message) => {
            state.submitting = false;
            state.is_loading = false;
            state.error = Some(message);
        }
        QuizAction::Failed(message) => {
            state.is_loading = false;
            state.error = Some(message);
        }
        QuizAction::ErrorCleared => {
            state.error = None;
        }
        QuizAction::TierUpgraded(tier) => {
            if let Some(response) = state.quiz_response.as_mut() {
                if tier > response.current_tier() {
                    response.tier = Some(tier);
                }
            }
        }
        QuizAction::Reset => {
            *state = QuizSessionState::default();
        }
    }
}

/// State container for one quiz session. Reads go through [`snapshot`],
/// writes through [`dispatch`], which persists after every mutation.
///
/// [`snapshot`]: QuizStore::snapshot
/// [`dispatch`]: QuizStore::dispatch
pub struct QuizStore<S: SessionStorage> {
    state: QuizSessionState,
    persistence: SessionPersistence<S>,
}

impl<S: SessionStorage> QuizStore<S> {
    /// Restores a stored session if one can be read, otherwise starts empty.
    pub fn open(persistence: SessionPersistence<S>) -> Self {
        let state = persistence.load().unwrap_or_default();
        if !state.questions.is_empty() {
            info!(
                questions = state.questions.len(),
                answers = state.answers.len(),
                position = state.current_question_index,
                "Restored quiz session"
            );
        }
        Self { state, persistence }
    }

    pub fn snapshot(&self) -> &QuizSessionState {
        &self.state
    }

    pub fn phase(&self) -> QuizPhase {
        self.state.phase()
    }

    pub fn persistence(&self) -> &SessionPersistence<S> {
        &self.persistence
    }

    pub fn dispatch(&mut self, action: QuizAction) {
        let reset = matches!(action, QuizAction::Reset);
        reduce(&mut self.state, action);

        let written = if reset {
            self.persistence.clear()
        } else {
            self.persistence.save(&self.state)
        };
        if let Err(err) = written {
            warn!(error = %err, "Failed to persist quiz session");
        }
    }

    /// Captures the participant and loads the questions in one persisted step.
    /// Valid until participant details have been recorded; questions left over
    /// from an earlier attempt without a participant are replaced.
    pub async fn start_quiz<B: QuizBackend>(
        &mut self,
        backend: &B,
        user_data: UserData,
    ) -> Result<()> {
        if self.state.user_data.is_some() || self.state.quiz_response.is_some() {
            return Err(Error::InvalidState("Quiz has already been started".to_string()));
        }
        user_data.validate()?;

        self.dispatch(QuizAction::LoadingStarted);
        let questions = match backend.fetch_questions().await {
            Ok(questions) if questions.is_empty() => {
                let err = Error::InvalidData("No questions are available".to_string());
                self.dispatch(QuizAction::Failed(err.user_message()));
                return Err(err);
            }
            Ok(questions) => questions,
            Err(err) => {
                warn!(error = %err, "Failed to load quiz questions");
                self.dispatch(QuizAction::Failed(err.user_message()));
                return Err(err);
            }
        };

        info!(questions = questions.len(), "Quiz started");
        self.dispatch(QuizAction::QuizStarted {
            questions,
            user_data,
        });
        Ok(())
    }

    /// Records a rating for the current question without moving on.
    pub fn answer_question(&mut self, value: u8) -> Result<()> {
        let rating = Rating::new(value)?;
        if self.state.current_question().is_none() {
            return Err(Error::InvalidState("There is no current question to answer".to_string()));
        }
        if self.state.submitting || self.state.quiz_response.is_some() {
            return Err(Error::InvalidState("Quiz has already been submitted".to_string()));
        }
        self.dispatch(QuizAction::Answered(rating));
        Ok(())
    }

    /// Returns whether the pointer moved.
    pub fn go_to_next_question(&mut self) -> bool {
        let before = self.state.current_question_index;
        self.dispatch(QuizAction::NextQuestion);
        self.state.current_question_index != before
    }

    /// Returns whether the pointer moved.
    pub fn go_to_previous_question(&mut self) -> bool {
        let before = self.state.current_question_index;
        self.dispatch(QuizAction::PreviousQuestion);
        self.state.current_question_index != before
    }

    pub fn can_go_forward(&self) -> bool {
        self.state.can_go_forward()
    }

    pub fn can_go_back(&self) -> bool {
        self.state.can_go_back()
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn apply_upgrade(&mut self, tier: Tier) {
        self.dispatch(QuizAction::TierUpgraded(tier));
    }

    pub fn reset(&mut self) {
        info!("Quiz session reset");
        self.dispatch(QuizAction::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::quiz_dto::SubmitResponsePayload;
    use crate::models::license::LicenseValidation;
    use crate::services::persistence_service::{MemoryStorage, SESSION_STORAGE_KEY};
    use chrono::Utc;
    use serde_json::json;

    struct StaticQuestions(Vec<Question>);

    impl QuizBackend for StaticQuestions {
        async fn fetch_questions(&self) -> Result<Vec<Question>> {
            if self.0.is_empty() {
                return Err(Error::Api {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            Ok(self.0.clone())
        }

        async fn submit_response(&self, _payload: &SubmitResponsePayload) -> Result<QuizResponse> {
            Err(Error::Internal("not used".into()))
        }

        async fn validate_license(&self, _license_code: &str) -> Result<LicenseValidation> {
            Err(Error::Internal("not used".into()))
        }
    }

    fn questions(n: i64) -> Vec<Question> {
        (1..=n)
            .map(|id| Question {
                id: id * 10,
                description: format!("Statement {}", id),
                frequency_id: (id % 7) + 1,
            })
            .collect()
    }

    fn user() -> UserData {
        UserData {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            license_code: "TAC-2024".into(),
            consent: true,
            start_time: Utc::now(),
        }
    }

    fn store_with(n: i64) -> QuizStore<MemoryStorage> {
        let mut store = QuizStore::open(SessionPersistence::new(MemoryStorage::new()));
        store.dispatch(QuizAction::QuizStarted {
            questions: questions(n),
            user_data: user(),
        });
        store
    }

    #[test]
    fn answering_does_not_advance() {
        let mut store = store_with(3);
        store.answer_question(4).unwrap();
        assert_eq!(store.snapshot().current_question_index, 0);
        assert!(store.can_go_forward());
    }

    #[test]
    fn repeated_answers_keep_latest() {
        let mut store = store_with(2);
        for value in [1, 5, 2, 3] {
            store.answer_question(value).unwrap();
        }
        assert_eq!(store.snapshot().answers.len(), 1);
        assert_eq!(store.snapshot().answers.get(10).unwrap().value.value(), 3);
    }

    #[test]
    fn navigation_is_a_no_op_when_not_allowed() {
        let mut store = store_with(2);
        assert!(!store.go_to_previous_question());
        assert!(!store.go_to_next_question());
        assert_eq!(store.snapshot().current_question_index, 0);

        store.answer_question(3).unwrap();
        assert!(store.go_to_next_question());
        assert!(store.go_to_previous_question());
        assert_eq!(store.snapshot().current_question_index, 0);
    }

    #[test]
    fn pointer_stays_in_bounds_and_completion_tracks_it() {
        let mut store = store_with(3);
        let script = "annpppananannnpnan";
        for step in script.chars() {
            match step {
                'a' => {
                    let _ = store.answer_question(2);
                }
                'n' => {
                    store.go_to_next_question();
                }
                _ => {
                    store.go_to_previous_question();
                }
            }
            let state = store.snapshot();
            assert!(state.current_question_index <= state.questions.len());
            assert_eq!(
                store.is_complete(),
                state.current_question_index == state.questions.len()
            );
        }
        assert!(store.is_complete());
        assert!(store.answer_question(5).is_err());
    }

    #[test]
    fn reloading_questions_resets_answers_and_pointer() {
        let mut store = store_with(2);
        store.answer_question(4).unwrap();
        store.go_to_next_question();
        store.dispatch(QuizAction::QuizStarted {
            questions: questions(4),
            user_data: user(),
        });
        assert_eq!(store.snapshot().current_question_index, 0);
        assert!(store.snapshot().answers.is_empty());
    }

    #[test]
    fn every_mutation_is_persisted_and_reset_clears_storage() {
        let mut store = store_with(2);
        store.answer_question(5).unwrap();
        store.go_to_next_question();
        let restored = store.persistence().load().unwrap();
        assert_eq!(restored.current_question_index, 1);
        assert_eq!(restored.answers.len(), 1);

        store.reset();
        assert!(store.persistence().load().is_none());
        assert_eq!(store.phase(), QuizPhase::AwaitingUserData);
    }

    #[tokio::test]
    async fn start_quiz_loads_questions_and_user() {
        let mut store = QuizStore::open(SessionPersistence::new(MemoryStorage::new()));
        assert_eq!(store.phase(), QuizPhase::AwaitingUserData);
        store.start_quiz(&StaticQuestions(questions(5)), user()).await.unwrap();
        assert_eq!(store.phase(), QuizPhase::InProgress);
        assert_eq!(store.snapshot().questions.len(), 5);

        let again = store.start_quiz(&StaticQuestions(questions(5)), user()).await;
        assert!(matches!(again, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn failed_fetch_leaves_error_without_user() {
        let mut store = QuizStore::open(SessionPersistence::new(MemoryStorage::new()));
        let result = store.start_quiz(&StaticQuestions(vec![]), user()).await;
        assert!(result.is_err());
        assert_eq!(store.phase(), QuizPhase::Error);
        assert!(store.snapshot().user_data.is_none());
        assert!(!store.snapshot().is_loading);
    }

    #[tokio::test]
    async fn invalid_user_data_is_rejected_before_fetch() {
        let mut store = QuizStore::open(SessionPersistence::new(MemoryStorage::new()));
        let mut data = user();
        data.email = "nope".into();
        let result = store.start_quiz(&StaticQuestions(questions(2)), data).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.phase(), QuizPhase::AwaitingUserData);
    }

    #[tokio::test]
    async fn session_saved_without_participant_can_be_started() {
        let storage = MemoryStorage::new();
        let blob = json!({
            "questions": [
                {"id": 1, "description": "q1", "frequencyId": 1},
                {"id": 2, "description": "q2", "frequencyId": 2}
            ],
            "currentQuestionIndex": 1,
            "answers": [{"questionId": 1, "frequencyId": 1, "value": 4}],
            "userData": null,
            "quizResponse": null
        });
        storage.set(SESSION_STORAGE_KEY, &blob.to_string()).unwrap();

        let mut store = QuizStore::open(SessionPersistence::new(storage));
        assert_eq!(store.phase(), QuizPhase::AwaitingUserData);

        store.start_quiz(&StaticQuestions(questions(3)), user()).await.unwrap();
        assert_eq!(store.phase(), QuizPhase::InProgress);
        assert_eq!(store.snapshot().questions.len(), 3);
        assert_eq!(store.snapshot().current_question_index, 0);
        assert!(store.snapshot().answers.is_empty());

        let restored = store.persistence().load().unwrap();
        assert_eq!(restored.phase(), QuizPhase::InProgress);
        assert_eq!(
            restored.user_data.map(|u| u.email),
            Some("ada@example.com".to_string())
        );
    }
}
