use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailCredentials;
use crate::mail::{MailProvider, OutgoingEmail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain connection upgraded with STARTTLS
    StartTls,
    /// TLS from the first byte
    Implicit,
}

/// One SMTP account endpoint
pub struct SmtpProvider {
    name: &'static str,
    host: String,
    port: u16,
    tls: TlsMode,
    credentials: MailCredentials,
}

impl SmtpProvider {
    pub fn new(
        name: &'static str,
        host: impl Into<String>,
        port: u16,
        tls: TlsMode,
        credentials: MailCredentials,
    ) -> Self {
        Self {
            name,
            host: host.into(),
            port,
            tls,
            credentials,
        }
    }

    pub fn office365(credentials: MailCredentials) -> Self {
        Self::new("office365", "smtp.office365.com", 587, TlsMode::StartTls, credentials)
    }

    pub fn gmail(credentials: MailCredentials) -> Self {
        Self::new("gmail", "smtp.gmail.com", 465, TlsMode::Implicit, credentials)
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = match self.tls {
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host),
            TlsMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host),
        }
        .with_context(|| format!("Failed to configure SMTP relay {}", self.host))?;

        Ok(builder
            .port(self.port)
            .credentials(Credentials::new(
                self.credentials.username.clone(),
                self.credentials.password.clone(),
            ))
            .build())
    }

    fn message(&self, email: &OutgoingEmail) -> Result<Message> {
        Message::builder()
            .from(self.credentials.username.parse().context("Invalid sender address")?)
            .to(self.credentials.receiver.parse().context("Invalid receiver address")?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .context("Failed to build email")
    }
}

#[async_trait]
impl MailProvider for SmtpProvider {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<()> {
        let message = self.message(email)?;
        self.transport()?
            .send(message)
            .await
            .with_context(|| format!("SMTP delivery via {}:{} failed", self.host, self.port))?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> MailCredentials {
        MailCredentials {
            username: "office@grouprealestate.gr".into(),
            password: "secret".into(),
            receiver: "info@grouprealestate.gr".into(),
        }
    }

    #[test]
    fn providers_use_the_expected_endpoints() {
        let primary = SmtpProvider::office365(credentials());
        assert_eq!((primary.port, primary.tls), (587, TlsMode::StartTls));
        let fallback = SmtpProvider::gmail(credentials());
        assert_eq!((fallback.port, fallback.tls), (465, TlsMode::Implicit));
        assert!(primary.transport().is_ok());
    }

    #[test]
    fn bad_receiver_address_is_an_error() {
        let mut creds = credentials();
        creds.receiver = "not an address".into();
        let provider = SmtpProvider::office365(creds);
        let email = OutgoingEmail {
            subject: "s".into(),
            body: "b".into(),
        };
        assert!(provider.message(&email).is_err());
    }
}
