//! Module dedicated to the SMTP relay configuration.

use std::fmt;
#[cfg(feature = "derive")]
use std::{marker::PhantomData, result};

#[cfg(feature = "derive")]
use serde::{de, Deserialize, Deserializer, Serialize};

/// The Gmail SMTP relay host name.
pub const GMAIL_SMTP_HOST: &str = "smtp.gmail.com";

/// The Gmail SMTP submission port.
pub const GMAIL_SMTP_PORT: u16 = 587;

/// The SMTP relay configuration.
///
/// Defaults to the Gmail relay, using STARTTLS on the submission
/// port.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "derive", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "derive", serde(rename_all = "kebab-case"))]
pub struct SmtpConfig {
    /// The SMTP server host name.
    pub host: String,

    /// The SMTP server host port.
    pub port: u16,

    /// The SMTP encryption protocol to use.
    ///
    /// Supported encryption: STARTTLS, SSL/TLS or none. Defaults to
    /// STARTTLS.
    #[cfg_attr(
        feature = "derive",
        serde(default, deserialize_with = "some_bool_or_kind")
    )]
    pub encryption: Option<SmtpEncryptionKind>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: GMAIL_SMTP_HOST.to_owned(),
            port: GMAIL_SMTP_PORT,
            encryption: None,
        }
    }
}

impl SmtpConfig {
    /// Create a new configuration for the given relay.
    pub fn new(host: impl ToString, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            encryption: None,
        }
    }

    /// Set the encryption kind, using the builder pattern.
    pub fn with_encryption(mut self, encryption: impl Into<SmtpEncryptionKind>) -> Self {
        self.encryption = Some(encryption.into());
        self
    }

    /// Get the encryption kind, falling back to the default one.
    pub fn encryption(&self) -> SmtpEncryptionKind {
        self.encryption.clone().unwrap_or_default()
    }

    /// Return `true` if TLS or StartTLS is enabled.
    pub fn is_encryption_enabled(&self) -> bool {
        !self.is_encryption_disabled()
    }

    /// Return `true` if StartTLS is enabled.
    pub fn is_start_tls_encryption_enabled(&self) -> bool {
        matches!(self.encryption(), SmtpEncryptionKind::StartTls)
    }

    /// Return `true` if encryption is disabled.
    pub fn is_encryption_disabled(&self) -> bool {
        matches!(self.encryption(), SmtpEncryptionKind::None)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "derive", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "derive", serde(rename_all = "kebab-case"))]
pub enum SmtpEncryptionKind {
    #[default]
    #[cfg_attr(feature = "derive", serde(alias = "starttls"))]
    StartTls,
    #[cfg_attr(feature = "derive", serde(alias = "ssl"))]
    Tls,
    None,
}

impl fmt::Display for SmtpEncryptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartTls => write!(f, "StartTLS"),
            Self::Tls => write!(f, "SSL/TLS"),
            Self::None => write!(f, "None"),
        }
    }
}

impl From<bool> for SmtpEncryptionKind {
    fn from(value: bool) -> Self {
        if value {
            Self::StartTls
        } else {
            Self::None
        }
    }
}

#[cfg(feature = "derive")]
fn some_bool_or_kind<'de, D>(
    deserializer: D,
) -> result::Result<Option<SmtpEncryptionKind>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SomeBoolOrKind(PhantomData<fn() -> Option<SmtpEncryptionKind>>);

    impl<'de> de::Visitor<'de> for SomeBoolOrKind {
        type Value = Option<SmtpEncryptionKind>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("some or none")
        }

        fn visit_none<E>(self) -> result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> result::Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct BoolOrKind(PhantomData<fn() -> SmtpEncryptionKind>);

            impl<'de> de::Visitor<'de> for BoolOrKind {
                type Value = SmtpEncryptionKind;

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str("boolean or string")
                }

                fn visit_bool<E>(self, v: bool) -> result::Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(v.into())
                }

                fn visit_str<E>(self, v: &str) -> result::Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Deserialize::deserialize(de::value::StrDeserializer::new(v))
                }
            }

            deserializer
                .deserialize_any(BoolOrKind(PhantomData))
                .map(Option::Some)
        }
    }

    deserializer.deserialize_option(SomeBoolOrKind(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::{SmtpConfig, SmtpEncryptionKind};

    #[test]
    fn default_is_gmail_start_tls() {
        let config = SmtpConfig::default();

        assert_eq!(config.host, "smtp.gmail.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.encryption(), SmtpEncryptionKind::StartTls);
        assert!(config.is_encryption_enabled());
        assert!(config.is_start_tls_encryption_enabled());
    }

    #[test]
    fn disabled_encryption() {
        let config = SmtpConfig::new("localhost", 2525).with_encryption(false);

        assert!(config.is_encryption_disabled());
        assert!(!config.is_start_tls_encryption_enabled());
    }

    #[cfg(feature = "derive")]
    #[test]
    fn deserialize_bool_or_kind() {
        let config: SmtpConfig =
            serde_json::from_str(r#"{"host":"localhost","port":25,"encryption":"ssl"}"#).unwrap();
        assert_eq!(config.encryption(), SmtpEncryptionKind::Tls);

        let config: SmtpConfig =
            serde_json::from_str(r#"{"host":"localhost","port":25,"encryption":false}"#).unwrap();
        assert_eq!(config.encryption(), SmtpEncryptionKind::None);

        let config: SmtpConfig =
            serde_json::from_str(r#"{"host":"localhost","port":25}"#).unwrap();
        assert_eq!(config.encryption(), SmtpEncryptionKind::StartTls);
    }
}
