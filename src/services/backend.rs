use std::future::Future;

use crate::dto::admin_dto::{ResponseListPage, ResponseListParams};
use crate::dto::checkout_dto::CreateCheckoutRequest;
use crate::dto::quiz_dto::SubmitResponsePayload;
use crate::error::Result;
use crate::models::checkout::{CheckoutSession, CheckoutStatusReport};
use crate::models::license::LicenseValidation;
use crate::models::question::Question;
use crate::models::quiz_response::QuizResponse;

/// Public quiz endpoints.
pub trait QuizBackend: Send + Sync {
    fn fetch_questions(&self) -> impl Future<Output = Result<Vec<Question>>> + Send;

    fn submit_response(
        &self,
        payload: &SubmitResponsePayload,
    ) -> impl Future<Output = Result<QuizResponse>> + Send;

    fn validate_license(
        &self,
        license_code: &str,
    ) -> impl Future<Output = Result<LicenseValidation>> + Send;
}

/// Checkout session creation and payment status.
pub trait CheckoutBackend: Send + Sync {
    fn create_checkout_session(
        &self,
        request: &CreateCheckoutRequest,
    ) -> impl Future<Output = Result<CheckoutSession>> + Send;

    fn checkout_status(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<CheckoutStatusReport>> + Send;
}

/// Bearer-authenticated admin endpoints.
pub trait AdminBackend: Send + Sync {
    fn list_responses(
        &self,
        token: &str,
        params: &ResponseListParams,
    ) -> impl Future<Output = Result<ResponseListPage>> + Send;

    fn get_response(
        &self,
        token: &str,
        response_id: &str,
    ) -> impl Future<Output = Result<QuizResponse>> + Send;
}
