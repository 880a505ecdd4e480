pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::config::SmtpConfig;
use crate::error::AppError;

pub use templates::OutgoingEmail;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError>;
}

pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<SmtpTransport, AppError> {
        if self.config.username.is_empty() {
            return Ok(SmtpTransport::builder_dangerous(&self.config.host)
                .port(self.config.port)
                .build());
        }

        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());
        Ok(SmtpTransport::relay(&self.config.host)
            .map_err(|e| AppError::Email(format!("Failed to create SMTP relay: {}", e)))?
            .port(self.config.port)
            .credentials(creds)
            .build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, email), fields(to = %email.recipient))]
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let message = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::Email(format!("Invalid from email: {}", e)))?,
            )
            .to(email
                .recipient
                .parse()
                .map_err(|e| AppError::Email(format!("Invalid to email: {}", e)))?)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| AppError::Email(format!("Failed to build email: {}", e)))?;

        let mailer = self.transport()?;

        tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| AppError::Email(format!("Task join error: {}", e)))?
            .map_err(|e| AppError::Email(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

/// Writes every email to the log instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        info!(to = %email.recipient, subject = %email.subject, "email (not delivered, SMTP disabled)");
        Ok(())
    }
}

pub fn from_config(config: &SmtpConfig) -> Arc<dyn Mailer> {
    if config.enabled {
        Arc::new(SmtpMailer::new(config.clone()))
    } else {
        Arc::new(LogMailer)
    }
}

/// Sends one email per recipient. Failures are logged and skipped; returns
/// how many were delivered.
pub async fn send_to_all(mailer: &dyn Mailer, emails: &[OutgoingEmail]) -> usize {
    let mut sent = 0;
    for email in emails {
        match mailer.send(email).await {
            Ok(()) => {
                info!(to = %email.recipient, subject = %email.subject, "email sent");
                sent += 1;
            }
            Err(e) => warn!("failed to send email to {}: {}", email.recipient, e),
        }
    }
    sent
}

/// Sends the emails on a background task so the caller does not wait on
/// SMTP round trips.
pub fn dispatch(mailer: Arc<dyn Mailer>, emails: Vec<OutgoingEmail>) -> JoinHandle<usize> {
    tokio::spawn(async move { send_to_all(mailer.as_ref(), &emails).await })
}
