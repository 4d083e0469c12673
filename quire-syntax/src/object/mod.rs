//! PDF objects.

use crate::byte_reader::Reader;
use crate::reader::{Readable, ReaderContext};

pub mod array;
pub mod dict;
pub(crate) mod indirect;
mod keyword;
pub(crate) mod macros;
pub mod name;
pub mod number;
pub mod r#ref;
pub mod stream;
pub mod string;

pub use array::Array;
pub use dict::Dict;
pub use indirect::{IndirectObject, ObjectIdentifier};
pub use name::Name;
pub use number::Number;
pub use r#ref::ObjRef;
pub use stream::{Payload, Stream};
pub use string::{PdfString, StringFormat};

/// A PDF object.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Object {
    /// The null object.
    #[default]
    Null,
    /// A boolean object.
    Boolean(bool),
    /// A number object.
    Number(Number),
    /// A string object.
    String(PdfString),
    /// A name object.
    Name(Name),
    /// An array object.
    Array(Array),
    /// A dictionary object.
    Dict(Dict),
    /// A stream object.
    Stream(Stream),
    /// A reference to an indirect object.
    Ref(ObjRef),
}

/// Resolves indirect references while accessing dictionaries and arrays.
pub trait Resolve {
    /// The error returned if a reference cannot be resolved.
    type Error;

    /// Return an owned copy of the object the reference points to.
    fn resolve_ref(&mut self, r: ObjRef) -> Result<Object, Self::Error>;

    /// Resolve the object if it's a reference, or return a copy of it otherwise.
    fn resolve_object(&mut self, obj: &Object) -> Result<Object, Self::Error> {
        match obj {
            Object::Ref(r) => self.resolve_ref(*r),
            other => Ok(other.clone()),
        }
    }
}

impl Object {
    /// A short name of the object type, used for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Name(_) => "name",
            Self::Array(_) => "array",
            Self::Dict(_) => "dictionary",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "reference",
        }
    }

    /// Whether the object is the null object.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the object may only appear inline and can never become an
    /// indirect object of its own.
    pub fn is_direct_only(&self) -> bool {
        match self {
            Self::Null | Self::Ref(_) => true,
            Self::Array(a) => a.is_direct_only(),
            Self::Dict(d) => d.is_direct_only(),
            _ => false,
        }
    }

    /// The value, if it is a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The value, if it is a number.
    #[inline]
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The value, if it is an integer.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(|n| n.as_integer())
    }

    /// The value as a float, if it is a number.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(|n| n.as_f64())
    }

    /// The value, if it is a name.
    #[inline]
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    /// The value, if it is a string.
    #[inline]
    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value, if it is an array.
    #[inline]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The value, if it is an array, for modification.
    #[inline]
    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Return the dictionary of the object. For streams, this is the
    /// stream dictionary.
    #[inline]
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            Self::Stream(s) => Some(s.dict()),
            _ => None,
        }
    }

    /// Mutable version of [`Object::as_dict`].
    #[inline]
    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Self::Dict(d) => Some(d),
            Self::Stream(s) => Some(s.dict_mut()),
            _ => None,
        }
    }

    /// The value, if it is a stream.
    #[inline]
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// The value, if it is a reference.
    #[inline]
    pub fn as_obj_ref(&self) -> Option<ObjRef> {
        match self {
            Self::Ref(r) => Some(*r),
            _ => None,
        }
    }

    /// Convert into a dictionary, if it is one.
    #[inline]
    pub fn into_dict(self) -> Option<Dict> {
        self.try_into().ok()
    }

    /// Convert into an array, if it is one.
    #[inline]
    pub fn into_array(self) -> Option<Array> {
        self.try_into().ok()
    }

    /// Convert into a stream, if it is one.
    #[inline]
    pub fn into_stream(self) -> Option<Stream> {
        self.try_into().ok()
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Self::Number(Number::from_integer(i64::from(value)))
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::Number(Number::from_integer(value))
    }
}

impl From<u32> for Object {
    fn from(value: u32) -> Self {
        Self::Number(Number::from_integer(i64::from(value)))
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Self::Number(Number::from_real(value))
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Self::Name(Name::new(value.as_bytes()))
    }
}

impl Readable for Object {
    fn read(r: &mut Reader<'_>, ctx: &ReaderContext<'_>) -> Option<Self> {
        let object = match r.peek_byte()? {
            b'n' => {
                r.read::<keyword::Null>(ctx)?;
                Self::Null
            }
            b't' | b'f' => Self::Boolean(r.read::<bool>(ctx)?),
            b'/' => Self::Name(r.read::<Name>(ctx)?),
            b'<' => match r.peek_bytes(2) {
                Some(b"<<") => {
                    let dict = r.read::<Dict>(&ctx.nested()?)?;
                    let mut cloned = r.clone();
                    cloned.skip_white_spaces_and_comments();

                    if cloned.peek_tag(b"stream").is_some() {
                        r.jump(cloned.offset());

                        Self::Stream(stream::read_body(r, dict, ctx)?)
                    } else {
                        Self::Dict(dict)
                    }
                }
                _ => Self::String(r.read::<PdfString>(ctx)?),
            },
            b'(' => Self::String(r.read::<PdfString>(ctx)?),
            b'[' => Self::Array(r.read::<Array>(&ctx.nested()?)?),
            b'0'..=b'9' => {
                if let Some(obj_ref) = r.read::<ObjRef>(ctx) {
                    Self::Ref(obj_ref)
                } else {
                    Self::Number(r.read::<Number>(ctx)?)
                }
            }
            b'.' | b'+' | b'-' => Self::Number(r.read::<Number>(ctx)?),
            _ => return None,
        };

        Some(object)
    }
}
