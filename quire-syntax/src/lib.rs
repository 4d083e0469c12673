/*!
A low-level crate for reading and writing PDF syntax.

This crate contains the owned object model of PDF (see [`object`]), a
tokenizer that parses objects from bytes (see [`reader`]), the registry of
stream filters (see [`filter`]) and a serializer that writes objects back in
canonical syntax (see [`write`]).

It does not know anything about the file structure of a PDF. Cross-reference
tables, object streams and incremental updates are handled by the `quire`
crate, which is built on top of this one.

Parsing is permissive, following the behavior of common PDF readers: garbage
inside dictionaries is skipped, `endobj` is optional and streams with a wrong
`/Length` are recovered by searching for `endstream`.
*/

pub mod byte_reader;
pub mod error;
pub mod filter;
pub mod object;
pub mod reader;
pub(crate) mod trivia;
pub mod write;

pub use error::{FilterError, ParseError, ParseErrorKind};
pub use filter::FilterRegistry;
pub use object::{
    Array, Dict, IndirectObject, Name, Number, ObjRef, Object, ObjectIdentifier, Payload,
    PdfString, Resolve, Stream, StringFormat,
};
