//! Indirect references.

use crate::byte_reader::Reader;
use crate::object::macros::object;
use crate::reader::{Readable, ReaderContext};
use crate::trivia::is_regular_character;
use core::fmt::{self, Display, Formatter};

/// A reference to an indirect object.
///
/// A reference is only a lookup key, it never owns the object it points to.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct ObjRef {
    /// The object number.
    pub obj_number: u32,
    /// The generation number.
    pub gen_number: u16,
}

impl ObjRef {
    /// Create a new reference.
    pub const fn new(obj_number: u32, gen_number: u16) -> Self {
        Self {
            obj_number,
            gen_number,
        }
    }
}

impl Display for ObjRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.obj_number, self.gen_number)
    }
}

impl Readable for ObjRef {
    fn read(r: &mut Reader<'_>, _: &ReaderContext<'_>) -> Option<Self> {
        let (obj_number, gen_number) = read_number_pair(r)?;
        r.skip_white_spaces_and_comments();
        r.forward_tag(b"R")?;

        if r.peek_byte().is_some_and(is_regular_character) {
            return None;
        }

        Some(Self::new(obj_number, gen_number))
    }
}

/// Read the `n g` pair that starts both references and object headers.
pub(crate) fn read_number_pair(r: &mut Reader<'_>) -> Option<(u32, u16)> {
    let obj_number = u32::try_from(r.read_plain_uint()?).ok()?;
    r.skip_white_spaces_and_comments();
    let gen_number = u16::try_from(r.read_plain_uint()?).ok()?;

    Some((obj_number, gen_number))
}

object!(ObjRef, Ref);

#[cfg(test)]
mod tests {
    use crate::byte_reader::Reader;
    use crate::object::r#ref::ObjRef;

    fn obj_ref(data: &[u8]) -> Option<ObjRef> {
        Reader::new(data).read_without_context::<ObjRef>()
    }

    #[test]
    fn simple() {
        assert_eq!(obj_ref(b"34 1 R"), Some(ObjRef::new(34, 1)));
        assert_eq!(obj_ref(b"12\n0\nR>>"), Some(ObjRef::new(12, 0)));
    }

    #[test]
    fn not_a_reference() {
        assert!(obj_ref(b"34 1").is_none());
        assert!(obj_ref(b"34 -1 R").is_none());
        assert!(obj_ref(b"34 1 RG").is_none());
        assert!(obj_ref(b"34 70000 R").is_none());
    }

    #[test]
    fn display() {
        assert_eq!(ObjRef::new(3, 2).to_string(), "3 2 R");
    }
}
