use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::dto::admin_dto::{ResponseListPage, ResponseListParams};
use crate::error::{Error, Result};
use crate::models::quiz_response::QuizResponse;
use crate::models::tier::Tier;
use crate::services::backend::AdminBackend;
use crate::services::export_service::ExportService;
use crate::services::report_service::{Report, ReportOptions, ReportService};
use crate::utils::token::{decode_admin_claims, AdminClaims};

/// Signed-in admin identity. Cleared on sign-out, on expiry and whenever the
/// backend answers 401.
#[derive(Debug, Clone, Default)]
pub struct AdminSession {
    token: Option<String>,
    claims: Option<AdminClaims>,
}

impl AdminSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, token: impl Into<String>) -> Result<&AdminClaims> {
        let token = token.into();
        let claims = decode_admin_claims(&token).map_err(|err| {
            warn!(error = %err, "Rejected admin token");
            Error::Unauthorized("Invalid or expired sign-in token".to_string())
        })?;
        info!(subject = %claims.sub, "Admin signed in");
        self.token = Some(token);
        Ok(&*self.claims.insert(claims))
    }

    pub fn sign_out(&mut self) {
        if self.token.take().is_some() {
            info!("Admin session cleared");
        }
        self.claims = None;
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn claims(&self) -> Option<&AdminClaims> {
        self.claims.as_ref()
    }

    /// Current bearer token; an expired session is cleared first.
    pub fn bearer(&mut self) -> Result<String> {
        let expired = self
            .claims
            .as_ref()
            .map(|c| (c.exp as i64) <= Utc::now().timestamp())
            .unwrap_or(true);
        match self.token.as_ref() {
            Some(token) if !expired => Ok(token.clone()),
            _ => {
                self.sign_out();
                Err(Error::Unauthorized("Please sign in again".to_string()))
            }
        }
    }
}

/// Admin dashboard operations over the response store.
#[derive(Clone)]
pub struct AdminService<B: AdminBackend> {
    backend: B,
}

impl<B: AdminBackend> AdminService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[instrument(skip(self, session))]
    pub async fn list_responses(
        &self,
        session: &mut AdminSession,
        params: &ResponseListParams,
    ) -> Result<ResponseListPage> {
        let token = session.bearer()?;
        let result = self.backend.list_responses(&token, params).await;
        guard_unauthorized(session, result)
    }

    #[instrument(skip(self, session))]
    pub async fn get_response(
        &self,
        session: &mut AdminSession,
        response_id: &str,
    ) -> Result<QuizResponse> {
        let token = session.bearer()?;
        let result = self.backend.get_response(&token, response_id).await;
        guard_unauthorized(session, result)
    }

    /// Renders what a participant at `tier` would receive.
    pub async fn preview_report(
        &self,
        session: &mut AdminSession,
        response_id: &str,
        tier: Tier,
    ) -> Result<Report> {
        let response = self.get_response(session, response_id).await?;
        ReportService::render_for_tier(&response, ReportOptions { tier, preview: true })
    }

    pub async fn export_responses(
        &self,
        session: &mut AdminSession,
        params: &ResponseListParams,
    ) -> Result<Vec<u8>> {
        let page = self.list_responses(session, params).await?;
        info!(rows = page.items.len(), total = page.total, "Exporting quiz responses");
        ExportService::generate_responses_xlsx(&page.items)
    }
}

fn guard_unauthorized<T>(session: &mut AdminSession, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        if err.is_unauthorized() {
            warn!("Backend rejected admin credentials, signing out");
            session.sign_out();
        }
    }
    result
}
