pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    admin_service::AdminService, api_client::ApiClient, license_service::LicenseService,
    submission_service::SubmissionService,
    upgrade_service::{PollSettings, UpgradeService},
};

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub license_service: LicenseService<ApiClient>,
    pub submission_service: SubmissionService<ApiClient>,
    pub upgrade_service: UpgradeService<ApiClient>,
    pub admin_service: AdminService<ApiClient>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let api = ApiClient::new(config)?;
        Ok(Self::with_api(api, PollSettings::from_config(config)))
    }

    pub fn with_api(api: ApiClient, poll: PollSettings) -> Self {
        let license_service = LicenseService::new(api.clone());
        let submission_service = SubmissionService::new(api.clone());
        let upgrade_service = UpgradeService::new(api.clone(), poll);
        let admin_service = AdminService::new(api.clone());

        Self {
            api,
            license_service,
            submission_service,
            upgrade_service,
            admin_service,
        }
    }
}
