//! Serializing objects to PDF syntax.

use crate::object::number::InternalNumber;
use crate::object::{Array, Dict, Name, Number, ObjRef, Object, PdfString, Stream, StringFormat};
use log::warn;

/// Options that affect how tokens are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenOptions {
    /// The number of fractional digits used for reals.
    pub real_precision: usize,
}

impl Default for TokenOptions {
    fn default() -> Self {
        Self { real_precision: 6 }
    }
}

/// Serialize an object with the default options.
pub fn display<T: WriteDirect + ?Sized>(item: &T) -> String {
    let mut buf = Vec::new();
    item.write_direct(&mut buf, TokenOptions::default());

    String::from_utf8_lossy(&buf).into_owned()
}

/// An object that can be written in place, as part of another object.
pub trait WriteDirect {
    /// Append the PDF syntax of the object to `buf`.
    fn write_direct(&self, buf: &mut Vec<u8>, opts: TokenOptions);
}

impl WriteDirect for Object {
    fn write_direct(&self, buf: &mut Vec<u8>, opts: TokenOptions) {
        match self {
            Self::Null => buf.extend_from_slice(b"null"),
            Self::Boolean(b) => b.write_direct(buf, opts),
            Self::Number(n) => n.write_direct(buf, opts),
            Self::String(s) => s.write_direct(buf, opts),
            Self::Name(n) => n.write_direct(buf, opts),
            Self::Array(a) => a.write_direct(buf, opts),
            Self::Dict(d) => d.write_direct(buf, opts),
            Self::Stream(s) => s.write_direct(buf, opts),
            Self::Ref(r) => r.write_direct(buf, opts),
        }
    }
}

impl WriteDirect for bool {
    fn write_direct(&self, buf: &mut Vec<u8>, _: TokenOptions) {
        buf.extend_from_slice(if *self { b"true" } else { b"false" });
    }
}

impl WriteDirect for Number {
    fn write_direct(&self, buf: &mut Vec<u8>, opts: TokenOptions) {
        match self.0 {
            InternalNumber::Integer(i) => buf.extend_from_slice(i.to_string().as_bytes()),
            InternalNumber::Real(r) => write_real(buf, r, opts.real_precision),
        }
    }
}

fn write_real(buf: &mut Vec<u8>, value: f64, precision: usize) {
    if !value.is_finite() {
        warn!("writing non-finite real {value} as 0");
        buf.push(b'0');

        return;
    }

    let formatted = format!("{value:.precision$}");
    let trimmed = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.')
    } else {
        &formatted
    };

    match trimmed {
        "-0" | "" => buf.push(b'0'),
        other => buf.extend_from_slice(other.as_bytes()),
    }
}

impl WriteDirect for Name {
    fn write_direct(&self, buf: &mut Vec<u8>, _: TokenOptions) {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";

        buf.push(b'/');

        for &b in self.as_bytes() {
            let plain = matches!(b, b'!'..=b'~')
                && !matches!(
                    b,
                    b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
                );

            if plain {
                buf.push(b);
            } else {
                buf.extend_from_slice(&[b'#', HEX[usize::from(b >> 4)], HEX[usize::from(b & 0xf)]]);
            }
        }
    }
}

impl WriteDirect for PdfString {
    fn write_direct(&self, buf: &mut Vec<u8>, _: TokenOptions) {
        match self.format() {
            StringFormat::Hex => {
                const HEX: &[u8; 16] = b"0123456789abcdef";

                buf.push(b'<');
                for &b in self.as_bytes() {
                    buf.extend_from_slice(&[HEX[usize::from(b >> 4)], HEX[usize::from(b & 0xf)]]);
                }
                buf.push(b'>');
            }
            StringFormat::Literal => {
                buf.push(b'(');
                for &b in self.as_bytes() {
                    match b {
                        b'(' | b')' | b'\\' => buf.extend_from_slice(&[b'\\', b]),
                        b'\n' => buf.extend_from_slice(b"\\n"),
                        b'\r' => buf.extend_from_slice(b"\\r"),
                        b'\t' => buf.extend_from_slice(b"\\t"),
                        0x08 => buf.extend_from_slice(b"\\b"),
                        0x0c => buf.extend_from_slice(b"\\f"),
                        0x00..=0x1f | 0x7f => {
                            buf.extend_from_slice(format!("\\{b:03o}").as_bytes());
                        }
                        _ => buf.push(b),
                    }
                }
                buf.push(b')');
            }
        }
    }
}

impl WriteDirect for Array {
    fn write_direct(&self, buf: &mut Vec<u8>, opts: TokenOptions) {
        buf.push(b'[');

        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                buf.push(b' ');
            }

            item.write_direct(buf, opts);
        }

        buf.push(b']');
    }
}

impl WriteDirect for Dict {
    fn write_direct(&self, buf: &mut Vec<u8>, opts: TokenOptions) {
        buf.extend_from_slice(b"<<");

        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                buf.push(b' ');
            }

            key.write_direct(buf, opts);
            buf.push(b' ');
            value.write_direct(buf, opts);
        }

        buf.extend_from_slice(b">>");
    }
}

impl WriteDirect for ObjRef {
    fn write_direct(&self, buf: &mut Vec<u8>, _: TokenOptions) {
        buf.extend_from_slice(self.to_string().as_bytes());
    }
}

// A stream can only be written as an indirect object, which needs access
// to its data. Nested streams are a structural error.
impl WriteDirect for Stream {
    fn write_direct(&self, buf: &mut Vec<u8>, opts: TokenOptions) {
        warn!("stream nested inside another object, only writing its dictionary");

        self.dict().write_direct(buf, opts);
    }
}
