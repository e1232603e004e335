#![doc = include_str!("../README.md")]

pub mod address;
pub mod attachment;
pub mod email;
mod error;
pub mod sender;
pub mod smtp;

#[doc(inline)]
pub use self::{
    address::Addresses,
    attachment::Attachments,
    email::Email,
    error::{Error, Result},
    sender::MailSender,
    smtp::config::{SmtpConfig, SmtpEncryptionKind},
};
