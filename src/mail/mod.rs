pub mod smtp;

pub use smtp::SmtpProvider;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::MailCredentials;

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub body: String,
}

/// Something that can deliver an email to the office inbox
#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<()>;

    fn provider_name(&self) -> &'static str;
}

/// Tries each provider in order until one accepts the message.
#[derive(Clone)]
pub struct MailRelay {
    providers: Vec<Arc<dyn MailProvider>>,
}

impl MailRelay {
    pub fn new(providers: Vec<Arc<dyn MailProvider>>) -> Self {
        Self { providers }
    }

    /// Office365 first, Gmail as the fallback; disabled without credentials.
    pub fn from_credentials(credentials: Option<&MailCredentials>) -> Self {
        match credentials {
            Some(creds) => {
                let providers: Vec<Arc<dyn MailProvider>> = vec![
                    Arc::new(SmtpProvider::office365(creds.clone())),
                    Arc::new(SmtpProvider::gmail(creds.clone())),
                ];
                Self::new(providers)
            }
            None => {
                warn!("MAIL_USERNAME or MAIL_PASSWORD not set, email sending disabled");
                Self::new(Vec::new())
            }
        }
    }

    pub async fn send(&self, email: &OutgoingEmail) -> bool {
        if self.providers.is_empty() {
            warn!(subject = %email.subject, "email not sent: no mail account configured");
            return false;
        }

        for provider in &self.providers {
            match provider.deliver(email).await {
                Ok(()) => {
                    info!(provider = provider.provider_name(), "Email sent successfully");
                    return true;
                }
                Err(e) => {
                    error!(provider = provider.provider_name(), error = %e, "Error sending email");
                }
            }
        }
        false
    }
}

pub struct ContactMessage<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
}

/// Sender and listing details shared by inquiries and price offers
pub struct PropertyInquiry<'a> {
    pub property_id: &'a str,
    pub property_title: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
}

pub fn contact_email(msg: &ContactMessage<'_>) -> OutgoingEmail {
    OutgoingEmail {
        subject: format!("Νέο Μήνυμα από Φόρμα Επικοινωνίας: {}", msg.subject),
        body: format!(
            "Έχετε λάβει ένα νέο μήνυμα από την κεντρική φόρμα επικοινωνίας του site.\n\n\
             Στοιχεία Αποστολέα:\n\
             Όνομα: {}\n\
             Email: {}\n\n\
             Θέμα: {}\n\n\
             Μήνυμα:\n{}\n",
            msg.name, msg.email, msg.subject, msg.message
        ),
    }
}

pub fn inquiry_email(inquiry: &PropertyInquiry<'_>, message: &str) -> OutgoingEmail {
    OutgoingEmail {
        subject: format!(
            "Νέο Μήνυμα Ενδιαφέροντος για το Ακίνητο: {}",
            inquiry.property_title
        ),
        body: format!(
            "Έχετε λάβει ένα νέο μήνυμα ενδιαφέροντος.\n\
             Στοιχεία Ακινήτου:\n\
             ID: {} - Τίτλος: {}\n\
             Στοιχεία Αποστολέα:\n\
             Όνομα: {} - Email: {} - Τηλέφωνο: {}\n\
             Μήνυμα:\n{}\n",
            inquiry.property_id,
            inquiry.property_title,
            inquiry.name,
            inquiry.email,
            inquiry.phone,
            message
        ),
    }
}

pub fn offer_email(inquiry: &PropertyInquiry<'_>, proposed_price: &str) -> OutgoingEmail {
    OutgoingEmail {
        subject: format!(
            "ΝΕΑ ΠΡΟΤΑΣΗ ΤΙΜΗΣ για το ακίνητο: {}",
            inquiry.property_title
        ),
        body: format!(
            "Έχετε λάβει μια νέα πρόταση τιμής.\n\
             Στοιχεία Ακινήτου:\n\
             ID: {} - Τίτλος: {}\n\
             Προτεινόμενη Τιμή: €{}\n\
             Στοιχεία Ενδιαφερόμενου:\n\
             Όνομα: {} - Email: {} - Τηλέφωνο: {}\n",
            inquiry.property_id,
            inquiry.property_title,
            proposed_price,
            inquiry.name,
            inquiry.email,
            inquiry.phone
        ),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider that fails or succeeds on demand and remembers what it sent
    pub(crate) struct FakeProvider {
        pub(crate) fail: bool,
        pub(crate) attempts: AtomicUsize,
        pub(crate) sent: Mutex<Vec<OutgoingEmail>>,
    }

    impl FakeProvider {
        pub(crate) fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                attempts: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MailProvider for FakeProvider {
        async fn deliver(&self, email: &OutgoingEmail) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }

        fn provider_name(&self) -> &'static str {
            "fake"
        }
    }

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            subject: "s".into(),
            body: "b".into(),
        }
    }

    #[tokio::test]
    async fn fallback_is_used_when_primary_fails() {
        let primary = FakeProvider::new(true);
        let fallback = FakeProvider::new(false);
        let relay = MailRelay::new(vec![
            primary.clone() as Arc<dyn MailProvider>,
            fallback.clone() as Arc<dyn MailProvider>,
        ]);

        assert!(relay.send(&email()).await);
        assert_eq!(primary.attempts(), 1);
        assert_eq!(fallback.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fallback_is_skipped_when_primary_succeeds() {
        let primary = FakeProvider::new(false);
        let fallback = FakeProvider::new(false);
        let relay = MailRelay::new(vec![
            primary.clone() as Arc<dyn MailProvider>,
            fallback.clone() as Arc<dyn MailProvider>,
        ]);

        assert!(relay.send(&email()).await);
        assert_eq!(fallback.attempts(), 0);
    }

    #[tokio::test]
    async fn both_failing_reports_false() {
        let relay = MailRelay::new(vec![
            FakeProvider::new(true) as Arc<dyn MailProvider>,
            FakeProvider::new(true) as Arc<dyn MailProvider>,
        ]);
        assert!(!relay.send(&email()).await);
    }

    #[tokio::test]
    async fn without_credentials_nothing_is_sent() {
        let relay = MailRelay::from_credentials(None);
        assert!(!relay.send(&email()).await);
    }

    #[test]
    fn offer_email_carries_listing_and_price() {
        let inquiry = PropertyInquiry {
            property_id: "the-twins",
            property_title: "The Twins",
            name: "Maria",
            email: "maria@example.com",
            phone: "N/A",
        };
        let email = offer_email(&inquiry, "240000");
        assert_eq!(email.subject, "ΝΕΑ ΠΡΟΤΑΣΗ ΤΙΜΗΣ για το ακίνητο: The Twins");
        assert!(email.body.contains("ID: the-twins - Τίτλος: The Twins"));
        assert!(email.body.contains("Προτεινόμενη Τιμή: €240000"));
        assert!(email.body.contains("Τηλέφωνο: N/A"));
    }
}
