//! Module dedicated to the mail sender.

use std::fmt;

use mail_send::smtp::message::{Address as SmtpAddress, Message as SmtpMessage};
use tracing::{debug, info};

use crate::{smtp::SmtpClientStream, Email, Error, Result, SmtpConfig};

/// The mail sender.
///
/// Holds the credentials of the account and the configuration of the
/// SMTP relay. Each call to [`MailSender::send`] opens its own SMTP
/// session, nothing is shared between calls.
#[derive(Clone, Eq, PartialEq)]
pub struct MailSender {
    user_address: String,
    user_password: String,
    smtp_config: SmtpConfig,
}

impl MailSender {
    /// Create a new sender for the Gmail relay.
    ///
    /// No connection is made at this moment.
    pub fn new(user_address: impl ToString, user_password: impl ToString) -> Self {
        Self {
            user_address: user_address.to_string(),
            user_password: user_password.to_string(),
            smtp_config: SmtpConfig::default(),
        }
    }

    /// Use another SMTP relay, following the builder pattern.
    pub fn with_smtp_config(mut self, smtp_config: SmtpConfig) -> Self {
        self.smtp_config = smtp_config;
        self
    }

    pub fn user_address(&self) -> &str {
        &self.user_address
    }

    pub fn smtp_config(&self) -> &SmtpConfig {
        &self.smtp_config
    }

    /// Send the given email.
    ///
    /// The email is compiled first, so that unreadable attachments
    /// fail before any connection is opened. Then a session is
    /// opened, the email is submitted to the envelope recipients and
    /// the session is closed. The session is dropped whenever an
    /// error occurs in between.
    pub async fn send(&self, email: &Email) -> Result<()> {
        info!("sending email {:?} from {}", email.subject, email.from);

        let body = email.compile()?;

        let rcpt_to = email.envelope_recipients();
        if rcpt_to.is_empty() {
            return Err(Error::SendEmailMissingRecipientError);
        }
        debug!("envelope recipients: {}", rcpt_to.join(", "));

        let msg = SmtpMessage {
            mail_from: SmtpAddress {
                email: email.from.clone().into(),
                ..Default::default()
            },
            rcpt_to: rcpt_to
                .into_iter()
                .map(|email| SmtpAddress {
                    email: email.into(),
                    ..Default::default()
                })
                .collect(),
            body: body.into(),
        };

        let mut client =
            SmtpClientStream::connect(&self.smtp_config, &self.user_address, &self.user_password)
                .await?;

        client.send(msg).await?;
        client.quit().await?;

        debug!("email successfully sent");
        Ok(())
    }
}

impl fmt::Debug for MailSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSender")
            .field("user_address", &self.user_address)
            .field("smtp_config", &self.smtp_config)
            .finish_non_exhaustive()
    }
}
