use std::{io, path::PathBuf};

use thiserror::Error;

/// The global `Result` alias of the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The global `Error` enum of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read attachment at {1:?}")]
    ReadAttachmentError(#[source] io::Error, PathBuf),
    #[error("cannot build email")]
    BuildEmailError(#[source] io::Error),

    #[error("cannot send email without a recipient")]
    SendEmailMissingRecipientError,
    #[error("cannot connect to smtp server {1}:{2} using tcp")]
    ConnectTcpError(#[source] mail_send::Error, String, u16),
    #[error("cannot connect to smtp server {1}:{2} using tls")]
    ConnectTlsError(#[source] mail_send::Error, String, u16),
    #[error("cannot authenticate to smtp server as {1}")]
    AuthenticateError(#[source] mail_send::Error, String),
    #[error("cannot send email")]
    SendEmailError(#[source] mail_send::Error),
    #[error("cannot close smtp session")]
    QuitError(#[source] mail_send::Error),
}

impl Error {
    /// Return `true` if the relay rejected the credentials.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, Self::AuthenticateError(..))
    }

    /// Return `true` if the error comes from the file system.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::ReadAttachmentError(..))
    }
}
