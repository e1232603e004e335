//! Module dedicated to the email to send.
//!
//! The main structure of this module is the [`Email`], which holds
//! the fields given by the caller and knows how to compile them into
//! a MIME document and how to compute the envelope recipients.

use base64::{engine::general_purpose::STANDARD, Engine};
use mail_builder::{
    headers::{date::Date, raw::Raw},
    mime::MimePart,
    MessageBuilder,
};
#[cfg(feature = "derive")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{Addresses, Attachments, Error, Result};

/// The email to send.
///
/// The body is HTML. Addresses and attachments can be either single
/// values or lists, see [`Addresses`] and [`Attachments`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "derive", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "derive", serde(rename_all = "kebab-case"))]
pub struct Email {
    /// The sender address, used for both the From header and the
    /// envelope sender.
    pub from: String,

    /// The primary recipients.
    pub to: Addresses,

    /// The subject line.
    pub subject: String,

    /// The HTML body.
    pub body: String,

    /// The carbon copy recipients.
    #[cfg_attr(feature = "derive", serde(default))]
    pub cc: Option<Addresses>,

    /// The blind carbon copy recipients.
    #[cfg_attr(feature = "derive", serde(default))]
    pub bcc: Option<Addresses>,

    /// The sender display name.
    #[cfg_attr(feature = "derive", serde(default))]
    pub profile: Option<String>,

    /// The files to attach.
    #[cfg_attr(feature = "derive", serde(default))]
    pub attachments: Option<Attachments>,
}

impl Email {
    /// Create a new email with the mandatory fields.
    pub fn new(
        from: impl ToString,
        to: impl Into<Addresses>,
        subject: impl ToString,
        body: impl ToString,
    ) -> Self {
        Self {
            from: from.to_string(),
            to: to.into(),
            subject: subject.to_string(),
            body: body.to_string(),
            ..Default::default()
        }
    }

    /// Set the carbon copy recipients, using the builder pattern.
    pub fn with_cc(mut self, cc: impl Into<Addresses>) -> Self {
        self.cc = Some(cc.into());
        self
    }

    /// Set some carbon copy recipients, using the builder pattern.
    pub fn with_some_cc(mut self, cc: Option<impl Into<Addresses>>) -> Self {
        self.cc = cc.map(Into::into);
        self
    }

    /// Set the blind carbon copy recipients, using the builder
    /// pattern.
    pub fn with_bcc(mut self, bcc: impl Into<Addresses>) -> Self {
        self.bcc = Some(bcc.into());
        self
    }

    /// Set some blind carbon copy recipients, using the builder
    /// pattern.
    pub fn with_some_bcc(mut self, bcc: Option<impl Into<Addresses>>) -> Self {
        self.bcc = bcc.map(Into::into);
        self
    }

    /// Set the sender display name, using the builder pattern.
    pub fn with_profile(mut self, profile: impl ToString) -> Self {
        self.profile = Some(profile.to_string());
        self
    }

    /// Set some sender display name, using the builder pattern.
    pub fn with_some_profile(mut self, profile: Option<impl ToString>) -> Self {
        self.profile = profile.map(|p| p.to_string());
        self
    }

    /// Set the files to attach, using the builder pattern.
    pub fn with_attachments(mut self, attachments: impl Into<Attachments>) -> Self {
        self.attachments = Some(attachments.into());
        self
    }

    /// Set some files to attach, using the builder pattern.
    pub fn with_some_attachments(mut self, attachments: Option<impl Into<Attachments>>) -> Self {
        self.attachments = attachments.map(Into::into);
        self
    }

    /// Compute the list of addresses the email is delivered to.
    ///
    /// The list starts with the primary recipients, followed by the
    /// carbon copy ones. When blind carbon copy recipients are
    /// given, they replace the whole list.
    pub fn envelope_recipients(&self) -> Vec<String> {
        let mut rcpt_to = if self.to.is_empty() {
            Vec::new()
        } else {
            self.to.to_vec()
        };

        if let Some(cc) = non_empty(&self.cc) {
            rcpt_to.extend(cc.to_vec());
        }

        // NOTE: bcc replaces to and cc instead of extending them
        if let Some(bcc) = non_empty(&self.bcc) {
            rcpt_to = bcc.to_vec();
        }

        rcpt_to
    }

    /// Render the From header value.
    ///
    /// The display name, if any, is written as a RFC 2047 UTF-8
    /// base64 encoded word.
    pub fn from_header_value(&self) -> String {
        match self.profile.as_deref() {
            Some(profile) if !profile.is_empty() => {
                format!("{} <{}>", encode_word(profile), self.from)
            }
            _ => self.from.clone(),
        }
    }

    /// Compile the email into a MIME document dated now.
    pub fn compile(&self) -> Result<Vec<u8>> {
        self.compile_at(chrono::Utc::now().timestamp())
    }

    /// Compile the email into a MIME document dated at the given
    /// UNIX timestamp.
    ///
    /// Attachments are read at this moment.
    pub fn compile_at(&self, timestamp: i64) -> Result<Vec<u8>> {
        let body = MimePart::new("text/html", self.body.clone());

        let body = match non_empty(&self.attachments) {
            Some(attachments) => {
                let mut parts = vec![body];
                parts.extend(attachments.to_mime_parts()?);
                debug!("compiling multipart email with {} part(s)", parts.len());
                MimePart::new("multipart/mixed", parts)
            }
            None => {
                debug!("compiling single part email");
                body
            }
        };

        let msg = self
            .write_headers(MessageBuilder::new(), timestamp)
            .body(body)
            .write_to_vec()
            .map_err(Error::BuildEmailError)?;

        trace!("compiled email: {}", String::from_utf8_lossy(&msg));

        Ok(msg)
    }

    /// Write Subject, From, To, Cc, Bcc and Date headers to the
    /// given message builder.
    fn write_headers(
        &self,
        builder: MessageBuilder<'static>,
        timestamp: i64,
    ) -> MessageBuilder<'static> {
        let mut builder = builder
            .subject(self.subject.clone())
            .header("From", single_line(self.from_header_value()))
            .header("To", single_line(self.to.to_header_value()));

        if let Some(cc) = non_empty(&self.cc) {
            builder = builder.header("Cc", single_line(cc.to_header_value()));
        }

        if let Some(bcc) = non_empty(&self.bcc) {
            builder = builder.header("Bcc", single_line(bcc.to_header_value()));
        }

        builder.date(Date::new(timestamp))
    }
}

/// Encode the given text as a RFC 2047 encoded word.
fn encode_word(text: &str) -> String {
    format!("=?utf-8?b?{}?=", STANDARD.encode(text.as_bytes()))
}

/// Build a raw header value out of the given text, with line breaks
/// removed so that it cannot spill over into another header.
fn single_line(mut text: String) -> Raw<'static> {
    text.retain(|c| c != '\r' && c != '\n');
    Raw::new(text)
}

/// Trait shared by optional fields that can hold an empty value.
trait IsEmpty {
    fn is_empty(&self) -> bool;
}

impl IsEmpty for Addresses {
    fn is_empty(&self) -> bool {
        Addresses::is_empty(self)
    }
}

impl IsEmpty for Attachments {
    fn is_empty(&self) -> bool {
        Attachments::is_empty(self)
    }
}

/// Empty values are treated the same way as missing ones.
fn non_empty<T: IsEmpty>(field: &Option<T>) -> Option<&T> {
    field.as_ref().filter(|field| !field.is_empty())
}
