use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::models::license::LicenseValidation;
use crate::services::backend::QuizBackend;
use crate::utils::validation::validate_license_code;

/// Checks a license code locally, then with the backend.
#[derive(Clone)]
pub struct LicenseService<B: QuizBackend> {
    backend: B,
}

impl<B: QuizBackend> LicenseService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[instrument(skip_all)]
    pub async fn validate(&self, license_code: &str) -> Result<LicenseValidation> {
        if let Err(err) = validate_license_code(license_code) {
            let message = err
                .message
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Invalid license code".to_string());
            return Err(Error::BadRequest(message));
        }

        let validation = self.backend.validate_license(license_code.trim()).await?;
        if validation.is_valid {
            info!("License code accepted");
        } else {
            warn!(message = %validation.message, "License code rejected");
        }
        Ok(validation)
    }

    /// Like [`validate`](Self::validate) but turns a rejected code into an error.
    pub async fn require_valid(&self, license_code: &str) -> Result<LicenseValidation> {
        let validation = self.validate(license_code).await?;
        if !validation.is_valid {
            let message = if validation.message.trim().is_empty() {
                "License code is not valid".to_string()
            } else {
                validation.message.clone()
            };
            return Err(Error::BadRequest(message));
        }
        Ok(validation)
    }
}
