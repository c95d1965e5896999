use validator::ValidationError;

pub const LICENSE_CODE_MIN_LEN: usize = 6;
pub const LICENSE_CODE_MAX_LEN: usize = 32;

pub fn validate_license_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    if code.len() < LICENSE_CODE_MIN_LEN || code.len() > LICENSE_CODE_MAX_LEN {
        let mut err = ValidationError::new("license_code_length");
        err.message = Some(
            format!(
                "License code must be between {} and {} characters",
                LICENSE_CODE_MIN_LEN, LICENSE_CODE_MAX_LEN
            )
            .into(),
        );
        return Err(err);
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        let mut err = ValidationError::new("license_code_charset");
        err.message = Some("License code may only contain letters, digits and dashes".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_consent(consent: &bool) -> Result<(), ValidationError> {
    if *consent {
        Ok(())
    } else {
        let mut err = ValidationError::new("consent_required");
        err.message = Some("Consent is required to take the quiz".into());
        Err(err)
    }
}
