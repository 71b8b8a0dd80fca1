//! Transactional email
//!
//! [`SmtpMailer`] relays through an SMTP server with lettre's async
//! transport. When no SMTP host is configured the [`OutboxMailer`] logs and
//! keeps messages in memory instead, which is also what tests read.

use anyhow::Result;
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::env;
use tokio::sync::Mutex;
use tracing::info;

const PRODUCT_NAME: &str = "YouTweet";

/// An email ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<()>;
}

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub starttls: bool,
}

impl SmtpConfig {
    /// Create a new SmtpConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SMTP_HOST`: Relay host (default: empty, no relay)
    /// - `SMTP_PORT`: Relay port (default: 587)
    /// - `SMTP_USERNAME`, `SMTP_PASSWORD`: Credentials (optional)
    /// - `SMTP_FROM`: Sender mailbox (default: "YouTweet <no-reply@youtweet.local>")
    /// - `SMTP_STARTTLS`: Use STARTTLS instead of implicit TLS (default: true)
    pub fn from_env() -> Self {
        let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            host: env::var("SMTP_HOST").unwrap_or_default().trim().to_string(),
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: non_empty("SMTP_USERNAME"),
            password: non_empty("SMTP_PASSWORD"),
            from: non_empty("SMTP_FROM")
                .unwrap_or_else(|| "YouTweet <no-reply@youtweet.local>".to_string()),
            starttls: env::var("SMTP_STARTTLS")
                .map(|v| !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.host.is_empty()
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| anyhow::anyhow!("Invalid SMTP_FROM address: {}", e))?;

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        }
        .map_err(|e| anyhow::anyhow!("Failed to configure SMTP transport: {}", e))?
        .port(config.port);

        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        info!("SMTP relay configured for {}:{}", config.host, config.port);
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| anyhow::anyhow!("Invalid recipient {}: {}", message.to, e))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(message.text, message.html))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send email: {}", e))?;

        info!("Sent \"{}\" to {}", message.subject, message.to);
        Ok(())
    }
}

/// Keeps sent messages in memory
#[derive(Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<MailMessage> {
        self.sent.lock().await.clone()
    }

    /// Most recent message sent to `to`
    pub async fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        info!(
            "Outbox mail to {}: {}\n{}",
            message.to, message.subject, message.text
        );
        self.sent.lock().await.push(message);
        Ok(())
    }
}

fn render(to: &str, subject: &str, username: &str, intro: &str, action: &str, link: &str) -> MailMessage {
    let text = format!(
        "Hi {username},\n\n{intro}\n\n{action}: {link}\n\n\
         Need help, or have questions? Just reply to this email, we'd love to help.\n\n\
         {PRODUCT_NAME}"
    );
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <p>Hi {username},</p>
    <p>{intro}</p>
    <p style="margin: 30px 0;">
        <a href="{link}" style="background-color: #22BC66; color: #fff; padding: 14px 28px; text-decoration: none; border-radius: 4px; display: inline-block;">{action}</a>
    </p>
    <p style="color: #666; font-size: 14px;">
        If the button doesn't work, copy this link into your browser:<br>
        <a href="{link}">{link}</a>
    </p>
    <p style="color: #999; font-size: 12px;">Need help, or have questions? Just reply to this email, we'd love to help.</p>
    <p>{PRODUCT_NAME}</p>
</body>
</html>"#
    );

    MailMessage {
        to: to.to_string(),
        subject: subject.to_string(),
        text,
        html,
    }
}

pub fn verification_email(to: &str, username: &str, link: &str) -> MailMessage {
    render(
        to,
        "Please verify your email",
        username,
        "Welcome to YouTweet! We're very excited to have you on board.",
        "Verify Your Email",
        link,
    )
}

pub fn password_reset_email(to: &str, username: &str, link: &str) -> MailMessage {
    render(
        to,
        "Password reset request",
        username,
        "We received a request to reset the password for your account.",
        "Reset Your Password",
        link,
    )
}

/// The plaintext token at the end of a link in a message
pub fn token_from_link(message: &MailMessage) -> Option<String> {
    message
        .text
        .split_whitespace()
        .find(|word| word.starts_with("http"))
        .and_then(|link| link.rsplit('/').next())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    async fn test_outbox_keeps_messages() {
        let outbox = OutboxMailer::new();
        outbox
            .send(verification_email(
                "jane@example.com",
                "janedoe",
                "http://localhost:8000/api/v1/users/verify-email/abc123",
            ))
            .await
            .unwrap();

        let message = outbox.last_to("jane@example.com").await.unwrap();
        assert_eq!(message.subject, "Please verify your email");
        assert!(message.html.contains("Verify Your Email"));
        assert_eq!(token_from_link(&message).as_deref(), Some("abc123"));
        assert!(outbox.last_to("someone@example.com").await.is_none());
    }

    #[test]
    fn test_reset_email_carries_link() {
        let message = password_reset_email("jane@example.com", "janedoe", "http://app/reset/tok");
        assert!(message.text.contains("http://app/reset/tok"));
        assert!(message.text.contains("reset the password"));
    }

    #[test]
    #[serial]
    fn test_smtp_config_without_host() {
        unsafe {
            env::remove_var("SMTP_HOST");
            env::remove_var("SMTP_PORT");
        }
        let config = SmtpConfig::from_env();
        assert!(!config.is_configured());
        assert_eq!(config.port, 587);
        assert!(config.starttls);
    }
}
