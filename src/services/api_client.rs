use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::dto::admin_dto::{ResponseListPage, ResponseListParams};
use crate::dto::checkout_dto::CreateCheckoutRequest;
use crate::dto::quiz_dto::{ApiErrorBody, SubmitResponsePayload};
use crate::error::{Error, Result};
use crate::models::checkout::{CheckoutSession, CheckoutStatusReport};
use crate::models::license::LicenseValidation;
use crate::models::question::Question;
use crate::models::quiz_response::QuizResponse;
use crate::services::backend::{AdminBackend, CheckoutBackend, QuizBackend};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);
/// Backoff stops doubling after this many retries.
const MAX_BACKOFF_EXPONENT: u32 = 5;

/// Delay before retry number `attempt` (starting at 1).
fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    RETRY_BASE_DELAY * 2u32.pow(exponent)
}

/// HTTP client for the quiz REST backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    get_retries: u32,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout()).build()?;
        Ok(Self::with_client(
            client,
            config.api_base_url.clone(),
            config.http_get_retries,
        ))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, get_retries: u32) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            get_retries,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|e| Error::Config(format!("Invalid endpoint URL {}: {}", raw, e)))
    }

    /// GETs are idempotent, so transport failures and 5xx answers are retried
    /// up to `get_retries` extra times with exponential backoff.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let mut attempt: u32 = 0;
        loop {
            let mut request = self.client.get(url.clone()).query(query);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }
            let result = match request.send().await {
                Ok(response) => read_json::<T>(response).await,
                Err(err) => Err(Error::from(err)),
            };
            match result {
                Err(err) if err.is_retryable() && attempt < self.get_retries => {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    warn!(path, attempt, error = %err, "GET request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self.client.post(url).json(body).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("Request failed").to_string()
            } else {
                trimmed.to_string()
            }
        });

    match status {
        StatusCode::UNAUTHORIZED => Err(Error::Unauthorized(message)),
        StatusCode::NOT_FOUND => Err(Error::NotFound(message)),
        _ => Err(Error::Api {
            status: status.as_u16(),
            message,
        }),
    }
}

impl QuizBackend for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_questions(&self) -> Result<Vec<Question>> {
        let questions: Vec<Question> = self.get_json("questions", &[], None).await?;
        info!(count = questions.len(), "Fetched quiz questions");
        Ok(questions)
    }

    #[instrument(skip(self, payload), fields(answers = payload.answers.len()))]
    async fn submit_response(&self, payload: &SubmitResponsePayload) -> Result<QuizResponse> {
        let response: QuizResponse = self.post_json("responses", payload).await?;
        info!(response_id = %response.id, "Quiz response stored");
        Ok(response)
    }

    #[instrument(skip(self, license_code))]
    async fn validate_license(&self, license_code: &str) -> Result<LicenseValidation> {
        self.get_json(
            "tac-get-code",
            &[("licenseCode", license_code.trim().to_string())],
            None,
        )
        .await
    }
}

impl CheckoutBackend for ApiClient {
    #[instrument(skip(self, request), fields(target_tier = %request.target_tier))]
    async fn create_checkout_session(
        &self,
        request: &CreateCheckoutRequest,
    ) -> Result<CheckoutSession> {
        let session: CheckoutSession = self.post_json("checkout/create-session", request).await?;
        info!(session_id = %session.session_id, "Checkout session created");
        Ok(session)
    }

    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatusReport> {
        self.get_json(
            "checkout/status",
            &[("session_id", session_id.to_string())],
            None,
        )
        .await
    }
}

impl AdminBackend for ApiClient {
    #[instrument(skip(self, token))]
    async fn list_responses(
        &self,
        token: &str,
        params: &ResponseListParams,
    ) -> Result<ResponseListPage> {
        let mut query = vec![
            ("page", params.page.to_string()),
            ("limit", params.limit.to_string()),
        ];
        if let Some(search) = params.search.as_ref().filter(|s| !s.trim().is_empty()) {
            query.push(("search", search.trim().to_string()));
        }
        self.get_json("responses", &query, Some(token)).await
    }

    #[instrument(skip(self, token))]
    async fn get_response(&self, token: &str, response_id: &str) -> Result<QuizResponse> {
        let encoded: String =
            url::form_urlencoded::byte_serialize(response_id.as_bytes()).collect();
        self.get_json(&format!("responses/{}", encoded), &[], Some(token))
            .await
    }
}
