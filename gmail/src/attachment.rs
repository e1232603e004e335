//! Module dedicated to email attachments.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use mail_builder::{headers::content_type::ContentType, mime::MimePart};
#[cfg(feature = "derive")]
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Content type of every attachment part.
///
/// The content of attachments is never sniffed.
const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// File name used when the path has no final component.
const NONAME: &str = "noname";

/// One or many paths of files to attach.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "derive", derive(Serialize))]
#[cfg_attr(feature = "derive", serde(untagged))]
pub enum Attachments {
    /// The single path variant.
    Single(PathBuf),

    /// The ordered list of paths variant.
    Multiple(Vec<PathBuf>),
}

impl Attachments {
    /// Normalize attachments into an ordered list of paths.
    pub fn to_vec(&self) -> Vec<PathBuf> {
        match self {
            Self::Single(path) => vec![path.clone()],
            Self::Multiple(paths) => paths.clone(),
        }
    }

    /// Return `true` if there is nothing to attach.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(path) => path.as_os_str().is_empty(),
            Self::Multiple(paths) => paths.is_empty(),
        }
    }

    /// Read every attachment and turn it into a MIME part, in order.
    pub fn to_mime_parts(&self) -> Result<Vec<MimePart<'static>>> {
        self.to_vec()
            .iter()
            .map(|path| read_mime_part(path))
            .collect()
    }
}

impl From<PathBuf> for Attachments {
    fn from(path: PathBuf) -> Self {
        Self::Single(path)
    }
}

impl From<&Path> for Attachments {
    fn from(path: &Path) -> Self {
        path.to_owned().into()
    }
}

impl From<String> for Attachments {
    fn from(path: String) -> Self {
        PathBuf::from(path).into()
    }
}

impl From<&str> for Attachments {
    fn from(path: &str) -> Self {
        PathBuf::from(path).into()
    }
}

impl From<Vec<PathBuf>> for Attachments {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self::Multiple(paths)
    }
}

impl From<Vec<String>> for Attachments {
    fn from(paths: Vec<String>) -> Self {
        Self::Multiple(paths.into_iter().map(PathBuf::from).collect())
    }
}

impl From<Vec<&str>> for Attachments {
    fn from(paths: Vec<&str>) -> Self {
        Self::Multiple(paths.into_iter().map(PathBuf::from).collect())
    }
}

impl From<&[&str]> for Attachments {
    fn from(paths: &[&str]) -> Self {
        paths.to_vec().into()
    }
}

impl<const N: usize> From<[&str; N]> for Attachments {
    fn from(paths: [&str; N]) -> Self {
        Vec::from(paths).into()
    }
}

impl FromIterator<PathBuf> for Attachments {
    fn from_iter<T: IntoIterator<Item = PathBuf>>(iter: T) -> Self {
        Self::Multiple(iter.into_iter().collect())
    }
}

#[cfg(feature = "derive")]
impl<'de> Deserialize<'de> for Attachments {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use crate::address::StrOrSeq;

        deserializer.deserialize_any(StrOrSeq::new(
            |path| Attachments::Single(path.into()),
            |paths: Vec<String>| paths.into(),
        ))
    }
}

/// Get the file name the recipient sees for the given path.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(OsStr::to_str)
        .unwrap_or(NONAME)
        .to_owned()
}

/// Read the file at the given path and wrap its content into an
/// attachment MIME part.
fn read_mime_part(path: &Path) -> Result<MimePart<'static>> {
    debug!("reading attachment at {}", path.display());

    let contents = fs::read(path).map_err(|err| Error::ReadAttachmentError(err, path.to_owned()))?;
    let fname = file_name(path);

    let ctype = ContentType::new(ATTACHMENT_CONTENT_TYPE).attribute("name", fname.clone());
    let part = MimePart::new(ctype, contents).attachment(fname);

    Ok(part)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{file_name, Attachments};

    #[test]
    fn file_name_is_base_name() {
        assert_eq!(file_name(Path::new("/tmp/reports/report.pdf")), "report.pdf");
        assert_eq!(file_name(Path::new("report.pdf")), "report.pdf");
        assert_eq!(file_name(Path::new("/")), "noname");
    }

    #[test]
    fn single_and_multiple() {
        let attachments = Attachments::from("a.txt");
        assert_eq!(attachments.to_vec(), vec![PathBuf::from("a.txt")]);

        let attachments = Attachments::from(["a.txt", "b.txt"]);
        assert_eq!(
            attachments.to_vec(),
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
        );

        assert!(Attachments::from("").is_empty());
        assert!(Attachments::from(Vec::<PathBuf>::new()).is_empty());
    }

    #[test]
    fn missing_file() {
        let err = Attachments::from("/this/path/does/not/exist.pdf")
            .to_mime_parts()
            .unwrap_err();
        assert!(err.is_io_error());
    }
}
