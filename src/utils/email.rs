// src/utils/email.rs

use std::sync::Arc;

use lettre::message::{Mailbox, Message, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::{config::Config, error::AppError};

/// Async SMTP transport wrapper.
///
/// When no SMTP host is configured the mailer operates in no-op mode and
/// only logs outgoing messages. This keeps development and test
/// environments free of email infrastructure.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AppError::InternalServerError(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            tracing::warn!("SMTP host not configured; mailer will operate in no-op mode");
            None
        } else {
            let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| {
                    AppError::InternalServerError(format!("Failed to configure SMTP transport: {}", e))
                })?
                .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    /// Sends a plain-text message `{to, subject, body}`.
    ///
    /// Transport failures propagate to the caller; the request handling
    /// layer decides how they surface.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let Some(transport) = &self.transport else {
            tracing::info!(to, subject, "mailer in no-op mode, message not sent");
            return Ok(());
        };

        let recipient = to
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::InternalServerError(format!("Failed to build email: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Failed to send email: {}", e)))?;

        tracing::info!(to, subject, "email sent");
        Ok(())
    }
}
