//! The keyword objects `null`, `true` and `false`.

use crate::byte_reader::Reader;
use crate::reader::{Readable, ReaderContext};
use crate::trivia::is_regular_character;

/// Marker for the `null` keyword.
pub(crate) struct Null;

impl Readable for Null {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        keyword(r, b"null").map(|_| Self)
    }
}

impl Readable for bool {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        match r.peek_byte()? {
            b't' => keyword(r, b"true").map(|_| true),
            b'f' => keyword(r, b"false").map(|_| false),
            _ => None,
        }
    }
}

// A keyword must not be followed directly by another regular character,
// otherwise `nullable` would be read as `null`.
fn keyword(r: &mut Reader<'_>, tag: &[u8]) -> Option<()> {
    r.forward_tag(tag)?;

    match r.peek_byte() {
        Some(b) if is_regular_character(b) => None,
        _ => Some(()),
    }
}
