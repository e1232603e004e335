//! Module dedicated to the SMTP session.
//!
//! A session is opened for one single email: connect, upgrade to TLS,
//! authenticate, send then quit.

pub mod config;

use mail_send::{smtp::message::Message as SmtpMessage, Credentials, SmtpClientBuilder};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use crate::{Error, Result};

use self::config::SmtpConfig;

/// The SMTP client, over plain TCP or over TLS.
pub enum SmtpClientStream {
    Tcp(mail_send::SmtpClient<TcpStream>),
    Tls(mail_send::SmtpClient<TlsStream<TcpStream>>),
}

impl SmtpClientStream {
    /// Connect to the relay and authenticate with the given
    /// credentials.
    ///
    /// Greeting, EHLO, STARTTLS (when enabled) and AUTH are all
    /// performed at this moment.
    pub async fn connect(config: &SmtpConfig, login: &str, passwd: &str) -> Result<Self> {
        let encryption = config.encryption();
        debug!(
            "connecting to smtp server {}:{} using {encryption}",
            config.host, config.port
        );

        let client_builder = SmtpClientBuilder::new(config.host.clone(), config.port)
            .credentials(Credentials::new(login.to_owned(), passwd.to_owned()))
            .implicit_tls(!config.is_start_tls_encryption_enabled());

        let client = if config.is_encryption_enabled() {
            client_builder
                .connect()
                .await
                .map(Self::Tls)
                .map_err(|err| connect_error(err, config, login, Error::ConnectTlsError))?
        } else {
            client_builder
                .connect_plain()
                .await
                .map(Self::Tcp)
                .map_err(|err| connect_error(err, config, login, Error::ConnectTcpError))?
        };

        Ok(client)
    }

    /// Submit the given message.
    pub async fn send(&mut self, msg: SmtpMessage<'_>) -> Result<()> {
        let res = match self {
            Self::Tcp(client) => client.send(msg).await,
            Self::Tls(client) => client.send(msg).await,
        };

        res.map_err(Error::SendEmailError)
    }

    /// Close the session.
    pub async fn quit(self) -> Result<()> {
        let res = match self {
            Self::Tcp(client) => client.quit().await,
            Self::Tls(client) => client.quit().await,
        };

        res.map_err(Error::QuitError)
    }
}

/// Tell authentication failures apart from other connection
/// failures.
fn connect_error(
    err: mail_send::Error,
    config: &SmtpConfig,
    login: &str,
    otherwise: fn(mail_send::Error, String, u16) -> Error,
) -> Error {
    match err {
        err @ (mail_send::Error::AuthenticationFailed(_)
        | mail_send::Error::UnsupportedAuthMechanism) => {
            Error::AuthenticateError(err, login.to_owned())
        }
        err => otherwise(err, config.host.clone(), config.port),
    }
}
