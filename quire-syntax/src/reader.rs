//! Reading PDF objects from bytes.

use crate::byte_reader::Reader;
use crate::object::ObjRef;
use crate::trivia::{is_eol_character, is_white_space_character};
use core::fmt::{Debug, Formatter};

/// Nested arrays and dictionaries beyond this depth are rejected.
pub const MAX_NESTING_DEPTH: u16 = 256;

/// A callback that looks up the value of an indirect `/Length` entry.
///
/// It must read the number directly and must not go through any object cache,
/// so that parsing an object never resolves references recursively.
pub type LengthHook<'a> = &'a dyn Fn(ObjRef) -> Option<usize>;

/// State that is threaded through the parsing of a single object.
#[derive(Clone, Copy)]
pub struct ReaderContext<'a> {
    pub(crate) length_hook: Option<LengthHook<'a>>,
    pub(crate) lazy_streams: bool,
    pub(crate) depth: u16,
}

impl<'a> ReaderContext<'a> {
    /// Create a context that reads stream payloads eagerly and cannot resolve
    /// indirect stream lengths.
    pub fn new() -> Self {
        Self {
            length_hook: None,
            lazy_streams: false,
            depth: 0,
        }
    }

    /// Set the hook used for indirect `/Length` entries.
    pub fn with_length_hook(mut self, hook: LengthHook<'a>) -> Self {
        self.length_hook = Some(hook);
        self
    }

    /// If enabled, stream payloads are not copied and only their location
    /// is recorded.
    pub fn with_lazy_streams(mut self, lazy: bool) -> Self {
        self.lazy_streams = lazy;
        self
    }

    pub(crate) fn nested(&self) -> Option<Self> {
        if self.depth >= MAX_NESTING_DEPTH {
            log::warn!("exceeded maximum nesting depth of {MAX_NESTING_DEPTH}");

            return None;
        }

        let mut ctx = *self;
        ctx.depth += 1;

        Some(ctx)
    }

    pub(crate) fn stream_length(&self, r: ObjRef) -> Option<usize> {
        self.length_hook.and_then(|hook| hook(r))
    }
}

impl Default for ReaderContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ReaderContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReaderContext")
            .field("length_hook", &self.length_hook.is_some())
            .field("lazy_streams", &self.lazy_streams)
            .field("depth", &self.depth)
            .finish()
    }
}

/// A type that can be parsed from PDF syntax.
pub trait Readable: Sized {
    /// Read the object at the current position of the reader. On failure, the
    /// reader might be left at an arbitrary position; use [`Reader::read`]
    /// to restore it automatically.
    fn read(r: &mut Reader<'_>, ctx: &ReaderContext<'_>) -> Option<Self>;

    /// Parse the object from the start of the given bytes.
    fn from_bytes(b: &[u8]) -> Option<Self> {
        let mut r = Reader::new(b);
        r.skip_white_spaces_and_comments();

        Self::read(&mut r, &ReaderContext::new())
    }
}

impl Reader<'_> {
    /// Read an object, restoring the previous offset if it fails.
    #[inline]
    pub fn read<T: Readable>(&mut self, ctx: &ReaderContext<'_>) -> Option<T> {
        let old_offset = self.offset();

        T::read(self, ctx).or_else(|| {
            self.jump(old_offset);

            None
        })
    }

    /// Read an object with a default context.
    #[inline]
    pub fn read_without_context<T: Readable>(&mut self) -> Option<T> {
        self.read::<T>(&ReaderContext::new())
    }

    /// Skip white space characters.
    #[inline]
    pub fn skip_white_spaces(&mut self) {
        self.forward_while(is_white_space_character);
    }

    /// Skip end-of-line characters.
    #[inline]
    pub fn skip_eol_characters(&mut self) {
        self.forward_while(is_eol_character);
    }

    /// Skip a single end-of-line marker (`\r\n`, `\n` or `\r`).
    #[inline]
    pub fn skip_eol(&mut self) -> Option<()> {
        self.forward_tag(b"\r\n")
            .or_else(|| self.forward_tag(b"\n"))
            .or_else(|| self.forward_tag(b"\r"))
    }

    /// Skip white spaces as well as comments.
    #[inline]
    pub fn skip_white_spaces_and_comments(&mut self) {
        while let Some(b) = self.peek_byte() {
            if is_white_space_character(b) {
                self.skip_white_spaces();
            } else if b == b'%' {
                self.forward_while(|b| !is_eol_character(b));
            } else {
                return;
            }
        }
    }

    /// Read an unsigned decimal integer without sign or fraction.
    pub fn read_plain_uint(&mut self) -> Option<u64> {
        let start = self.offset();
        self.forward_while_1(|b| b.is_ascii_digit())?;
        let digits = self.range(start..self.offset())?;

        let mut accum = 0_u64;
        for b in digits {
            accum = accum.checked_mul(10)?.checked_add(u64::from(*b - b'0'))?;
        }

        Some(accum)
    }
}
