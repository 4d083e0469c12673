//! Name objects.

use crate::byte_reader::Reader;
use crate::object::macros::object;
use crate::reader::{Readable, ReaderContext};
use crate::trivia::is_regular_character;
use core::borrow::Borrow;
use core::fmt::{self, Debug, Display, Formatter};
use core::ops::Deref;
use smallvec::SmallVec;

/// A PDF name, stored without the leading solidus and with `#xx` escapes
/// already decoded.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(SmallVec<[u8; 16]>);

impl Name {
    /// Create a new name from raw, unescaped bytes.
    pub fn new(data: &[u8]) -> Self {
        Self(SmallVec::from_slice(data))
    }

    /// Create a new name from the bytes as they appear in PDF syntax,
    /// decoding `#xx` escape sequences. Returns `None` for an invalid escape.
    pub fn from_escaped(data: &[u8]) -> Option<Self> {
        if !data.contains(&b'#') {
            return Some(Self::new(data));
        }

        let mut cleaned = SmallVec::with_capacity(data.len());
        let mut r = Reader::new(data);

        while let Some(b) = r.read_byte() {
            if b == b'#' {
                let hex = r.read_bytes(2)?;
                cleaned.push(hex_value(hex[0])? << 4 | hex_value(hex[1])?);
            } else {
                cleaned.push(b);
            }
        }

        Some(Self(cleaned))
    }

    /// Return the raw bytes of the name.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return a string representation of the name.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or("{non-utf8 name}")
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'0'..=b'9' => Some(c - b'0'),
        _ => None,
    }
}

impl Deref for Name {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Name {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Name {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<&[u8; N]> for Name {
    fn from(value: &[u8; N]) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Readable for Name {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        r.forward_tag(b"/")?;

        let start = r.offset();

        while let Some(b) = r.eat(is_regular_character) {
            if b == b'#' {
                r.eat(|n| n.is_ascii_hexdigit())?;
                r.eat(|n| n.is_ascii_hexdigit())?;
            }
        }

        Self::from_escaped(r.range(start..r.offset())?)
    }
}

object!(Name, Name);

#[cfg(test)]
mod tests {
    use crate::byte_reader::Reader;
    use crate::object::name::Name;

    fn name(data: &str) -> Option<Name> {
        Reader::new(data.as_bytes()).read_without_context::<Name>()
    }

    #[test]
    fn empty() {
        assert_eq!(name("/").unwrap().as_bytes(), b"");
    }

    #[test]
    fn missing_solidus() {
        assert!(name("dfg").is_none());
    }

    #[test]
    fn invalid_escape() {
        assert!(name("/AB#FG").is_none());
    }

    #[test]
    fn plain() {
        assert_eq!(name("/Name1").unwrap().as_bytes(), b"Name1");
        assert_eq!(
            name("/A;Name_With-Various***Characters?").unwrap().as_bytes(),
            b"A;Name_With-Various***Characters?"
        );
    }

    #[test]
    fn stops_at_delimiter() {
        let mut r = Reader::new(b"/Type/Page");
        assert_eq!(r.read_without_context::<Name>().unwrap().as_str(), "Type");
        assert_eq!(r.read_without_context::<Name>().unwrap().as_str(), "Page");
    }

    #[test]
    fn escapes() {
        assert_eq!(name("/lime#20Green").unwrap().as_bytes(), b"lime Green");
        assert_eq!(name("/The_Key_of_F#23_Minor").unwrap().as_str(), "The_Key_of_F#_Minor");
        assert_eq!(name("/A#42").unwrap(), Name::new(b"AB"));
    }
}
