//! PDF versions.

use core::fmt::{self, Display, Formatter};
use core::str::FromStr;

/// The version of a PDF file, like `1.7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdfVersion {
    /// The major version.
    pub major: u8,
    /// The minor version.
    pub minor: u8,
}

impl PdfVersion {
    /// Create a new version.
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Read the version from the `%PDF-x.y` header at the start of the data.
    /// Some files have garbage before the header, so the first kilobyte is
    /// searched.
    pub fn from_header(data: &[u8]) -> Option<Self> {
        let window = &data[..data.len().min(1024)];
        let pos = memchr::memmem::find(window, b"%PDF-")?;
        let rest = &window[pos + 5..];
        let end = rest
            .iter()
            .position(|b| !(b.is_ascii_digit() || *b == b'.'))
            .unwrap_or(rest.len());

        core::str::from_utf8(&rest[..end]).ok()?.parse().ok()
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::new(1, 7)
    }
}

impl FromStr for PdfVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s.split_once('.').ok_or(())?;

        Ok(Self::new(
            major.parse().map_err(|_| ())?,
            minor.parse().map_err(|_| ())?,
        ))
    }
}

impl Display for PdfVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use crate::version::PdfVersion;

    #[test]
    fn header() {
        assert_eq!(PdfVersion::from_header(b"%PDF-1.4\n%..."), Some(PdfVersion::new(1, 4)));
        assert_eq!(PdfVersion::from_header(b"junk\n%PDF-2.0\r"), Some(PdfVersion::new(2, 0)));
        assert_eq!(PdfVersion::from_header(b"no header"), None);
    }

    #[test]
    fn ordering() {
        assert!(PdfVersion::new(1, 7) > PdfVersion::new(1, 4));
        assert!(PdfVersion::new(2, 0) > PdfVersion::new(1, 7));
        assert_eq!("1.5".parse::<PdfVersion>(), Ok(PdfVersion::new(1, 5)));
    }
}
