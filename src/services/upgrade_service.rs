use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::dto::checkout_dto::CreateCheckoutRequest;
use crate::error::{Error, Result};
use crate::models::checkout::{CheckoutSession, CheckoutStatus};
use crate::models::quiz_response::QuizResponse;
use crate::models::tier::Tier;
use crate::services::backend::CheckoutBackend;

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.upgrade_poll_interval(),
            max_attempts: config.upgrade_poll_max_attempts.max(1),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UpgradeStatus {
    Verifying {
        attempt: u32,
    },
    Completed {
        new_tier: Tier,
        completed_at: Option<DateTime<Utc>>,
    },
    Failed,
    /// No terminal answer within the attempt cap. The payment may still be
    /// processing on the provider's side.
    GaveUp {
        attempts: u32,
    },
    Cancelled,
}

impl UpgradeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UpgradeStatus::Verifying { .. })
    }
}

/// Creates checkout sessions and hands out pollers for returning shoppers.
#[derive(Clone)]
pub struct UpgradeService<B: CheckoutBackend + Clone> {
    backend: B,
    settings: PollSettings,
}

impl<B: CheckoutBackend + Clone> UpgradeService<B> {
    pub fn new(backend: B, settings: PollSettings) -> Self {
        Self { backend, settings }
    }

    #[instrument(skip(self, email, response), fields(response_id = %response.id))]
    pub async fn start_checkout(
        &self,
        email: &str,
        response: &QuizResponse,
        target_tier: Tier,
    ) -> Result<CheckoutSession> {
        let current_tier = response.current_tier();
        if target_tier <= current_tier {
            return Err(Error::BadRequest(format!(
                "Cannot upgrade from tier {} to tier {}",
                current_tier, target_tier
            )));
        }
        if email.trim().is_empty() {
            return Err(Error::BadRequest("An email address is required for checkout".to_string()));
        }

        let request = CreateCheckoutRequest {
            email: email.trim().to_string(),
            current_tier,
            target_tier,
            response_id: response.id.clone(),
        };
        self.backend.create_checkout_session(&request).await
    }

    pub fn poller(&self, session_id: impl Into<String>) -> UpgradePoller<B> {
        UpgradePoller::new(self.backend.clone(), session_id, self.settings)
    }
}

/// Polls checkout status for one session until a terminal answer, the attempt
/// cap, or cancellation. Status changes are published on a watch channel;
/// nothing is published once the cancel token has fired.
pub struct UpgradePoller<B: CheckoutBackend> {
    backend: B,
    session_id: String,
    settings: PollSettings,
    attempt: u32,
    cancel: CancellationToken,
    status_tx: watch::Sender<UpgradeStatus>,
}

impl<B: CheckoutBackend> UpgradePoller<B> {
    pub fn new(backend: B, session_id: impl Into<String>, settings: PollSettings) -> Self {
        let (status_tx, _) = watch::channel(UpgradeStatus::Verifying { attempt: 0 });
        Self {
            backend,
            session_id: session_id.into(),
            settings,
            attempt: 0,
            cancel: CancellationToken::new(),
            status_tx,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Number of re-checks scheduled so far in the current run.
    pub fn retries(&self) -> u32 {
        self.attempt
    }

    pub fn status(&self) -> UpgradeStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UpgradeStatus> {
        self.status_tx.subscribe()
    }

    /// Token to cancel from the owning view when it is torn down.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Manual "check again": resets the attempt counter and polls anew.
    pub async fn check_again(&mut self) -> UpgradeStatus {
        self.run().await
    }

    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn run(&mut self) -> UpgradeStatus {
        self.attempt = 0;
        loop {
            self.publish(UpgradeStatus::Verifying { attempt: self.attempt });

            let checked = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(),
                checked = self.backend.checkout_status(&self.session_id) => checked,
            };

            match checked {
                Ok(report) => match (report.status, report.target_tier) {
                    (CheckoutStatus::Completed, Some(new_tier)) => {
                        info!(%new_tier, retries = self.attempt, "Upgrade confirmed");
                        return self.finish(UpgradeStatus::Completed {
                            new_tier,
                            completed_at: report.completed_at,
                        });
                    }
                    (CheckoutStatus::Completed, None) => {
                        warn!("Checkout reported completed without a tier, checking again");
                    }
                    (CheckoutStatus::Failed, _) => {
                        error!("Checkout payment failed");
                        return self.finish(UpgradeStatus::Failed);
                    }
                    (CheckoutStatus::Pending, _) => {
                        if self.attempt == 0 {
                            info!("Payment is still processing");
                        }
                    }
                },
                Err(err) => {
                    warn!(error = %err, attempt = self.attempt, "Checkout status check failed");
                }
            }

            self.attempt += 1;
            if self.attempt >= self.settings.max_attempts {
                warn!(attempts = self.attempt, "Giving up on checkout status");
                return self.finish(UpgradeStatus::GaveUp {
                    attempts: self.attempt,
                });
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(),
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }
    }

    fn publish(&self, status: UpgradeStatus) {
        if !self.cancel.is_cancelled() {
            self.status_tx.send_replace(status);
        }
    }

    fn finish(&self, status: UpgradeStatus) -> UpgradeStatus {
        self.publish(status.clone());
        status
    }

    fn cancelled(&self) -> UpgradeStatus {
        info!("Checkout status polling cancelled");
        UpgradeStatus::Cancelled
    }
}
