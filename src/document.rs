//! Placeholder document sharing.
//!
//! Nothing is uploaded. A dropped document contributes its name to a fabricated share link and
//! nothing else; the bytes never leave the intake layer.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::Result;
use crate::intake::DroppedFile;

/// Fixed base of every fabricated share link.
pub const PLACEHOLDER_SHARE_BASE: &str = "https://example.com/shared-document";

/// The selected document, reduced to its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    name: String,
}

impl DocumentRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn from_file(file: &DroppedFile) -> Self {
        Self::new(file.name.clone())
    }

    /// Names a document on disk without reading its contents.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Io`] when `path` does not exist or is not a regular file.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !fs::metadata(path)?.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            )
            .into());
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builds the placeholder link a real upload would have returned.
///
/// The name is appended verbatim. Characters that are not valid in a URL path (spaces, `#`,
/// `?`, `..` segments) pass through untouched.
///
/// # Example
///
/// ```rust
/// use qrcompose::document::placeholder_share_url;
///
/// assert_eq!(
///     placeholder_share_url("report.pdf"),
///     "https://example.com/shared-document/report.pdf"
/// );
/// ```
pub fn placeholder_share_url(name: &str) -> String {
    format!("{}/{}", PLACEHOLDER_SHARE_BASE, name)
}
