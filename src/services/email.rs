use chrono::Duration;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    services::security::create_access_token,
};

/// Sends account emails over SMTP.
///
/// Token and message construction happen on the request path so failures
/// there surface normally; the actual SMTP send runs on a background task
/// and is only logged, mirroring the availability-first policy everywhere
/// else in the app.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    secret_key: String,
    deployment_url: String,
    frontend_url: String,
    email_token_expire_hours: i64,
}

impl Mailer {
    pub fn new(config: &Config) -> AppResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| AppError::Internal(format!("SMTP transport setup failed: {}", e)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.email_username.clone(),
                config.email_password.clone(),
            ))
            .build();

        let from: Mailbox = config
            .email_from
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid sender address: {}", e)))?;

        Ok(Self {
            transport,
            from,
            secret_key: config.secret_key.clone(),
            deployment_url: config.deployment_url.clone(),
            frontend_url: config.frontend_url.clone(),
            email_token_expire_hours: config.email_token_expire_hours,
        })
    }

    /// Emails a verification link carrying the (possibly new) address
    pub fn dispatch_verification_email(&self, user_id: &str, email: &str) -> AppResult<()> {
        let token = create_access_token(
            &self.secret_key,
            user_id,
            Some(email),
            Duration::hours(self.email_token_expire_hours),
        )?;

        let link = verification_link(&self.deployment_url, &token);
        let body = format!(
            "Hello,\n\n\
             Please verify your email address by clicking on the link below:\n\n\
             {}\n\n\
             If you did not sign up for our service, please ignore this email.\n\n\
             Thank you!",
            link
        );

        self.send_in_background(email, "Verify Your Email Address - MovieCompass", body)
    }

    /// Emails a password reset link pointing at the frontend reset form
    pub fn dispatch_password_reset_email(&self, user_id: &str, email: &str) -> AppResult<()> {
        let token = create_access_token(
            &self.secret_key,
            user_id,
            None,
            Duration::hours(self.email_token_expire_hours),
        )?;

        let link = password_reset_link(&self.frontend_url, &token);
        let body = format!(
            "Hello,\n\n\
             We received a request to reset your password. Click the link below to choose a new one:\n\n\
             {}\n\n\
             If you did not request a password reset, please ignore this email.\n\n\
             Thank you!",
            link
        );

        self.send_in_background(email, "Reset Your Password - MovieCompass", body)
    }

    fn send_in_background(&self, recipient: &str, subject: &str, body: String) -> AppResult<()> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|_| AppError::validation("email", "Invalid email address"))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body)
            .map_err(|e| AppError::Internal(format!("Failed to compose email: {}", e)))?;

        let transport = self.transport.clone();
        let recipient = recipient.to_string();
        tokio::spawn(async move {
            match transport.send(message).await {
                Ok(_) => tracing::info!(recipient = %recipient, "Email sent"),
                Err(e) => {
                    tracing::error!(recipient = %recipient, error = %e, "Failed to send email")
                }
            }
        });

        Ok(())
    }
}

fn verification_link(deployment_url: &str, token: &str) -> String {
    format!("{}/auth/verify-email?token={}", deployment_url, token)
}

fn password_reset_link(frontend_url: &str, token: &str) -> String {
    format!("{}/auth/reset-password?token={}", frontend_url, token)
}
