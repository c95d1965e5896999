pub mod admin_service;
pub mod api_client;
pub mod backend;
pub mod export_service;
pub mod license_service;
pub mod persistence_service;
pub mod progression_service;
pub mod projection_service;
pub mod report_service;
pub mod submission_service;
pub mod upgrade_service;
