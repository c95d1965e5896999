use std::collections::HashSet;

use tracing::{error, info, instrument, warn};

use crate::dto::quiz_dto::SubmitResponsePayload;
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::quiz_response::QuizResponse;
use crate::models::session::{QuizPhase, QuizSessionState};
use crate::services::backend::QuizBackend;
use crate::services::persistence_service::SessionStorage;
use crate::services::progression_service::{QuizAction, QuizStore};

/// Sends a completed quiz to the backend at most once per session.
#[derive(Clone)]
pub struct SubmissionService<B: QuizBackend> {
    backend: B,
}

impl<B: QuizBackend> SubmissionService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Safe to call on every render: returns `Ok(None)` unless the quiz is
    /// complete and has neither been submitted nor failed. A failed attempt
    /// stays failed until [`retry`](Self::retry) is called.
    #[instrument(skip_all)]
    pub async fn submit_if_complete<S: SessionStorage>(
        &self,
        store: &mut QuizStore<S>,
    ) -> Result<Option<QuizResponse>> {
        let state = store.snapshot();
        if !state.is_complete() {
            return Ok(None);
        }
        match state.phase() {
            QuizPhase::Submitting | QuizPhase::Completed | QuizPhase::Error => return Ok(None),
            QuizPhase::AwaitingUserData | QuizPhase::InProgress => {}
        }

        let user_data = state
            .user_data
            .clone()
            .ok_or_else(|| {
                Error::InvalidState("Cannot submit without participant details".to_string())
            })?;
        let answers = sanitized_answers(state);

        store.dispatch(QuizAction::SubmissionStarted);
        info!(answers = answers.len(), "Submitting quiz response");

        let payload = SubmitResponsePayload { user_data, answers };
        match self.backend.submit_response(&payload).await {
            Ok(response) => {
                info!(response_id = %response.id, "Quiz submission completed");
                store.dispatch(QuizAction::SubmissionSucceeded(response.clone()));
                Ok(Some(response))
            }
            Err(err) => {
                error!(error = %err, "Quiz submission failed");
                store.dispatch(QuizAction::SubmissionFailed(err.user_message()));
                Err(err)
            }
        }
    }

    /// Clears a previous submission error and tries once more.
    pub async fn retry<S: SessionStorage>(
        &self,
        store: &mut QuizStore<S>,
    ) -> Result<Option<QuizResponse>> {
        if store.snapshot().error.is_some() {
            store.dispatch(QuizAction::ErrorCleared);
        }
        self.submit_if_complete(store).await
    }
}

/// Answers that belong to a loaded question. A mismatch with the raw count is
/// logged; it points at stale or corrupt session data.
fn sanitized_answers(state: &QuizSessionState) -> Vec<Answer> {
    let known: HashSet<i64> = state.questions.iter().map(|q| q.id).collect();
    let raw = state.answers.len();
    let answers: Vec<Answer> = state
        .answers
        .iter()
        .filter(|a| known.contains(&a.question_id))
        .cloned()
        .collect();
    if answers.len() != raw {
        warn!(raw, kept = answers.len(), "Answer count mismatch before submission");
    }
    answers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answer::Rating;
    use crate::models::license::LicenseValidation;
    use crate::models::question::Question;
    use crate::models::user::UserData;
    use crate::services::persistence_service::{
        MemoryStorage, SessionPersistence, SessionStorage, SESSION_STORAGE_KEY,
    };
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CountingBackend {
        calls: Arc<AtomicUsize>,
        fail_first: bool,
    }

    impl QuizBackend for CountingBackend {
        async fn fetch_questions(&self) -> Result<Vec<Question>> {
            Ok(two_questions())
        }

        async fn submit_response(&self, payload: &SubmitResponsePayload) -> Result<QuizResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(Error::Api {
                    status: 502,
                    message: "gateway".into(),
                });
            }
            Ok(QuizResponse {
                id: "resp-1".into(),
                first_name: payload.user_data.first_name.clone(),
                last_name: payload.user_data.last_name.clone(),
                email: Some(payload.user_data.email.clone()),
                created_on: Utc::now(),
                frequencies: vec![],
                tier: None,
            })
        }

        async fn validate_license(&self, _license_code: &str) -> Result<LicenseValidation> {
            Err(Error::Internal("not used".into()))
        }
    }

    fn two_questions() -> Vec<Question> {
        vec![
            Question {
                id: 1,
                description: "a".into(),
                frequency_id: 1,
            },
            Question {
                id: 2,
                description: "b".into(),
                frequency_id: 2,
            },
        ]
    }

    fn participant() -> UserData {
        UserData {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            license_code: "TAC-2024".into(),
            consent: true,
            start_time: Utc::now(),
        }
    }

    fn completed_store() -> QuizStore<MemoryStorage> {
        let mut store = QuizStore::open(SessionPersistence::new(MemoryStorage::new()));
        store.dispatch(QuizAction::QuizStarted {
            questions: two_questions(),
            user_data: participant(),
        });
        for value in [3, 4] {
            store.answer_question(value).unwrap();
            assert!(store.go_to_next_question());
        }
        store
    }

    #[tokio::test]
    async fn incomplete_quiz_is_not_submitted() {
        let backend = CountingBackend::default();
        let service = SubmissionService::new(backend.clone());
        let mut store = completed_store();
        store.go_to_previous_question();
        assert_eq!(service.submit_if_complete(&mut store).await.unwrap(), None);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn submits_exactly_once() {
        let backend = CountingBackend::default();
        let service = SubmissionService::new(backend.clone());
        let mut store = completed_store();

        let first = service.submit_if_complete(&mut store).await.unwrap();
        assert!(first.is_some());
        for _ in 0..3 {
            assert!(service.submit_if_complete(&mut store).await.unwrap().is_none());
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.phase(), QuizPhase::Completed);
        assert_eq!(store.snapshot().answers.len(), 2);
    }

    #[tokio::test]
    async fn failure_is_retryable_but_not_retried_automatically() {
        let backend = CountingBackend {
            fail_first: true,
            ..Default::default()
        };
        let service = SubmissionService::new(backend.clone());
        let mut store = completed_store();

        assert!(service.submit_if_complete(&mut store).await.is_err());
        assert_eq!(store.phase(), QuizPhase::Error);
        assert!(service.submit_if_complete(&mut store).await.unwrap().is_none());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let response = service.retry(&mut store).await.unwrap();
        assert_eq!(response.map(|r| r.id), Some("resp-1".to_string()));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn answers_for_unknown_questions_are_dropped() {
        let mut state = QuizSessionState::default();
        state.questions = two_questions();
        state.questions.truncate(1);
        state.answers.upsert(Answer {
            question_id: 1,
            frequency_id: 1,
            value: Rating::new(2).unwrap(),
        });
        state.answers.upsert(Answer {
            question_id: 99,
            frequency_id: 3,
            value: Rating::new(5).unwrap(),
        });
        let answers = sanitized_answers(&state);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].question_id, 1);
    }

    #[tokio::test]
    async fn session_saved_without_participant_still_reaches_submission() {
        let storage = MemoryStorage::new();
        let blob = serde_json::json!({
            "questions": [{"id": 1, "description": "a", "frequencyId": 1}],
            "currentQuestionIndex": 0,
            "answers": [],
            "userData": null
        });
        storage.set(SESSION_STORAGE_KEY, &blob.to_string()).unwrap();
        let backend = CountingBackend::default();
        let service = SubmissionService::new(backend.clone());

        let mut store = QuizStore::open(SessionPersistence::new(storage));
        store.start_quiz(&backend, participant()).await.unwrap();
        for value in [2, 5] {
            store.answer_question(value).unwrap();
            store.go_to_next_question();
        }

        let response = service.submit_if_complete(&mut store).await.unwrap();
        assert_eq!(response.map(|r| r.id), Some("resp-1".to_string()));
        assert_eq!(store.phase(), QuizPhase::Completed);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
