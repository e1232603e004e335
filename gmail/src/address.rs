//! Module dedicated to email addresses.
//!
//! Address fields (to, cc and bcc) accept either one single address
//! or an ordered list of addresses. Both shapes are captured by the
//! [`Addresses`] enum, resolved once when the email is built.

#[cfg(feature = "derive")]
use std::{fmt, marker::PhantomData};

#[cfg(feature = "derive")]
use serde::{de, Deserialize, Deserializer, Serialize};

/// One or many email addresses.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "derive", derive(Serialize))]
#[cfg_attr(feature = "derive", serde(untagged))]
pub enum Addresses {
    /// The single address variant.
    Single(String),

    /// The ordered list of addresses variant.
    Multiple(Vec<String>),
}

impl Addresses {
    /// Normalize addresses into an ordered list.
    ///
    /// A single address gives a list of one element, a list of
    /// addresses is returned as it is, order preserved.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Single(addr) => vec![addr.clone()],
            Self::Multiple(addrs) => addrs.clone(),
        }
    }

    /// Render addresses as a header value.
    ///
    /// Multiple addresses are joined with a comma, without space.
    pub fn to_header_value(&self) -> String {
        match self {
            Self::Single(addr) => addr.clone(),
            Self::Multiple(addrs) => addrs.join(","),
        }
    }

    /// Return `true` if there is no address at all.
    ///
    /// An empty single address counts as no address.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(addr) => addr.is_empty(),
            Self::Multiple(addrs) => addrs.is_empty(),
        }
    }
}

impl Default for Addresses {
    fn default() -> Self {
        Self::Multiple(Vec::new())
    }
}

impl From<String> for Addresses {
    fn from(addr: String) -> Self {
        Self::Single(addr)
    }
}

impl From<&String> for Addresses {
    fn from(addr: &String) -> Self {
        addr.clone().into()
    }
}

impl From<&str> for Addresses {
    fn from(addr: &str) -> Self {
        addr.to_owned().into()
    }
}

impl From<Vec<String>> for Addresses {
    fn from(addrs: Vec<String>) -> Self {
        Self::Multiple(addrs)
    }
}

impl From<Vec<&String>> for Addresses {
    fn from(addrs: Vec<&String>) -> Self {
        Self::Multiple(addrs.into_iter().cloned().collect())
    }
}

impl From<Vec<&str>> for Addresses {
    fn from(addrs: Vec<&str>) -> Self {
        Self::Multiple(addrs.into_iter().map(ToOwned::to_owned).collect())
    }
}

impl From<&[String]> for Addresses {
    fn from(addrs: &[String]) -> Self {
        Self::Multiple(addrs.to_vec())
    }
}

impl From<&[&str]> for Addresses {
    fn from(addrs: &[&str]) -> Self {
        addrs.to_vec().into()
    }
}

impl<const N: usize> From<[&str; N]> for Addresses {
    fn from(addrs: [&str; N]) -> Self {
        Vec::from(addrs).into()
    }
}

impl FromIterator<String> for Addresses {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self::Multiple(iter.into_iter().collect())
    }
}

#[cfg(feature = "derive")]
impl<'de> Deserialize<'de> for Addresses {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StrOrSeq::new(Addresses::Single, Addresses::Multiple))
    }
}

/// Serde visitor accepting either one string or a sequence of
/// strings, rejecting any other shape.
///
/// Shared by [`Addresses`] and
/// [`Attachments`](crate::attachment::Attachments).
#[cfg(feature = "derive")]
pub(crate) struct StrOrSeq<T, S, M> {
    single: S,
    multiple: M,
    marker: PhantomData<fn() -> T>,
}

#[cfg(feature = "derive")]
impl<T, S, M> StrOrSeq<T, S, M>
where
    S: FnOnce(String) -> T,
    M: FnOnce(Vec<String>) -> T,
{
    pub(crate) fn new(single: S, multiple: M) -> Self {
        Self {
            single,
            multiple,
            marker: PhantomData,
        }
    }
}

#[cfg(feature = "derive")]
impl<'de, T, S, M> de::Visitor<'de> for StrOrSeq<T, S, M>
where
    S: FnOnce(String) -> T,
    M: FnOnce(Vec<String>) -> T,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string or a sequence of strings")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok((self.single)(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok((self.single)(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or_default());

        while let Some(item) = seq.next_element::<String>()? {
            items.push(item);
        }

        Ok((self.multiple)(items))
    }
}
