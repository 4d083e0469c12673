//! String objects.

use crate::byte_reader::Reader;
use crate::filter::ascii_hex::decode_hex_string;
use crate::object::macros::object;
use crate::reader::{Readable, ReaderContext};
use crate::trivia::is_white_space_character;
use core::hash::{Hash, Hasher};
use log::warn;

/// How a string was (or should be) written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StringFormat {
    /// `(...)` syntax.
    #[default]
    Literal,
    /// `<...>` syntax.
    Hex,
}

/// A PDF string.
///
/// The format only determines how the string is serialized, two strings with
/// the same bytes are equal regardless of it.
#[derive(Clone, Debug, Default)]
pub struct PdfString {
    data: Vec<u8>,
    format: StringFormat,
}

impl PdfString {
    /// Create a new literal string.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            format: StringFormat::Literal,
        }
    }

    /// Create a new string that is written in hex syntax.
    pub fn hex(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            format: StringFormat::Hex,
        }
    }

    /// Returns the bytes of the string.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the bytes of the string.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Returns the serialization format of the string.
    pub fn format(&self) -> StringFormat {
        self.format
    }

    /// Change the serialization format of the string.
    pub fn set_format(&mut self, format: StringFormat) {
        self.format = format;
    }
}

impl PartialEq for PdfString {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for PdfString {}

impl Hash for PdfString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
    }
}

impl From<&str> for PdfString {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl Readable for PdfString {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        match r.peek_byte()? {
            b'(' => read_literal(r).map(Self::new),
            b'<' => read_hex(r).map(Self::hex),
            _ => None,
        }
    }
}

object!(PdfString, String);

fn read_hex(r: &mut Reader<'_>) -> Option<Vec<u8>> {
    r.forward_tag(b"<")?;

    let mut cleaned = Vec::new();

    while let Some(b) = r.peek_byte() {
        if b.is_ascii_hexdigit() {
            cleaned.push(b);
        } else if !is_white_space_character(b) {
            break;
        }

        r.forward();
    }

    r.forward_tag(b">")?;

    // Odd lengths are padded with a zero.
    decode_hex_string(&cleaned)
}

fn read_literal(r: &mut Reader<'_>) -> Option<Vec<u8>> {
    r.forward_tag(b"(")?;

    let mut depth = 1_u32;
    let mut cleaned = Vec::new();

    loop {
        let byte = r.read_byte()?;

        match byte {
            b'\\' => read_escape(r, &mut cleaned)?,
            b'(' => {
                depth += 1;
                cleaned.push(byte);
            }
            b')' => {
                depth -= 1;

                if depth == 0 {
                    return Some(cleaned);
                }

                cleaned.push(byte);
            }
            // An unescaped end-of-line marker is always read as a single line feed.
            b'\r' => {
                r.forward_tag(b"\n");
                cleaned.push(b'\n');
            }
            _ => cleaned.push(byte),
        }
    }
}

fn read_escape(r: &mut Reader<'_>, out: &mut Vec<u8>) -> Option<()> {
    let next = r.read_byte()?;

    match next {
        b'0'..=b'7' => {
            let mut value = u16::from(next - b'0');

            for _ in 0..2 {
                match r.eat(is_octal_digit) {
                    Some(d) => value = value * 8 + u16::from(d - b'0'),
                    None => break,
                }
            }

            // High-order overflow is ignored.
            if value > 0xff {
                warn!("overflow in octal escape of literal string");
            }

            out.push((value & 0xff) as u8);
        }
        b'n' => out.push(b'\n'),
        b'r' => out.push(b'\r'),
        b't' => out.push(b'\t'),
        b'b' => out.push(0x08),
        b'f' => out.push(0x0c),
        b'(' | b')' | b'\\' => out.push(next),
        // Line continuation.
        b'\r' => {
            r.forward_tag(b"\n");
        }
        b'\n' => {}
        // The backslash is ignored for unknown escapes.
        other => out.push(other),
    }

    Some(())
}

fn is_octal_digit(byte: u8) -> bool {
    matches!(byte, b'0'..=b'7')
}

#[cfg(test)]
mod tests {
    use crate::byte_reader::Reader;
    use crate::object::string::{PdfString, StringFormat};

    fn string(data: &[u8]) -> Option<PdfString> {
        Reader::new(data).read_without_context::<PdfString>()
    }

    #[test]
    fn hex_simple() {
        let s = string(b"<00010203>").unwrap();
        assert_eq!(s.as_bytes(), &[0x00, 0x01, 0x02, 0x03]);
        assert_eq!(s.format(), StringFormat::Hex);
    }

    #[test]
    fn hex_whitespace_and_padding() {
        assert_eq!(string(b"< 00 01\n 02 03 >").unwrap().as_bytes(), &[0, 1, 2, 3]);
        assert_eq!(string(b"<901FA>").unwrap().as_bytes(), &[0x90, 0x1f, 0xa0]);
    }

    #[test]
    fn hex_invalid() {
        assert!(string(b"<00z1>").is_none());
        assert!(string(b"<0001").is_none());
    }

    #[test]
    fn literal_simple() {
        assert_eq!(string(b"(Hi there.)").unwrap().as_bytes(), b"Hi there.");
    }

    #[test]
    fn literal_balanced_parens() {
        assert_eq!(string(b"(Hi (()) there)").unwrap().as_bytes(), b"Hi (()) there");
        assert!(string(b"(Hi (() there)").is_none());
    }

    #[test]
    fn literal_escapes() {
        assert_eq!(
            string(b"(a\\n\\t\\(b\\)\\\\c)").unwrap().as_bytes(),
            b"a\n\t(b)\\c"
        );
        assert_eq!(string(b"(\\q)").unwrap().as_bytes(), b"q");
    }

    #[test]
    fn literal_octal() {
        assert_eq!(string(b"(\\245)").unwrap().as_bytes(), &[0xa5]);
        assert_eq!(string(b"(\\0053)").unwrap().as_bytes(), &[0x05, b'3']);
        assert_eq!(string(b"(\\5x)").unwrap().as_bytes(), &[0x05, b'x']);
    }

    #[test]
    fn literal_line_continuation() {
        assert_eq!(string(b"(abc\\\r\ndef)").unwrap().as_bytes(), b"abcdef");
        assert_eq!(string(b"(abc\\\ndef)").unwrap().as_bytes(), b"abcdef");
    }

    #[test]
    fn literal_eol_normalization() {
        assert_eq!(string(b"(a\r\nb\rc\nd)").unwrap().as_bytes(), b"a\nb\nc\nd");
    }

    #[test]
    fn equality_ignores_format() {
        assert_eq!(PdfString::new(b"ab".to_vec()), PdfString::hex(b"ab".to_vec()));
    }
}
