//! Indirect objects.

use crate::byte_reader::Reader;
use crate::error::{ParseError, ParseErrorKind};
use crate::object::r#ref::read_number_pair;
use crate::object::{ObjRef, Object};
use crate::reader::{Readable, ReaderContext};
use crate::trivia::is_regular_character;

/// The `n g obj` header of an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectIdentifier {
    /// The object number.
    pub obj_number: u32,
    /// The generation number.
    pub gen_number: u16,
}

impl From<ObjectIdentifier> for ObjRef {
    fn from(value: ObjectIdentifier) -> Self {
        Self::new(value.obj_number, value.gen_number)
    }
}

impl Readable for ObjectIdentifier {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        let (obj_number, gen_number) = read_number_pair(r)?;
        r.skip_white_spaces_and_comments();
        r.forward_tag(b"obj")?;

        if r.peek_byte().is_some_and(is_regular_character) {
            return None;
        }

        Some(Self {
            obj_number,
            gen_number,
        })
    }
}

/// An object together with the identifier it was defined with.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    /// The identifier from the object header.
    pub id: ObjectIdentifier,
    /// The value between `obj` and `endobj`.
    pub object: Object,
}

impl IndirectObject {
    /// Parse the indirect object starting at `offset`.
    pub fn parse_at(
        data: &[u8],
        offset: usize,
        ctx: &ReaderContext<'_>,
    ) -> Result<Self, ParseError> {
        if offset >= data.len() {
            return Err(ParseError::new(offset, ParseErrorKind::UnexpectedEnd));
        }

        let mut r = Reader::new_at(data, offset);
        r.skip_white_spaces_and_comments();

        r.read::<Self>(ctx).ok_or_else(|| {
            let kind = if r.read_without_context::<ObjectIdentifier>().is_some() {
                ParseErrorKind::InvalidObject
            } else {
                ParseErrorKind::InvalidHeader
            };

            ParseError::new(offset, kind)
        })
    }
}

impl Readable for IndirectObject {
    fn read(r: &mut Reader<'_>, ctx: &ReaderContext<'_>) -> Option<Self> {
        let id = r.read::<ObjectIdentifier>(ctx)?;
        r.skip_white_spaces_and_comments();
        let object = r.read::<Object>(ctx)?;
        r.skip_white_spaces_and_comments();
        // We are lenient and don't require it.
        r.forward_tag(b"endobj");

        Some(Self { id, object })
    }
}
