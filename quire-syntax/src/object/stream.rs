//! Stream objects.

use crate::byte_reader::Reader;
use crate::object::dict::keys::LENGTH;
use crate::object::macros::object;
use crate::object::{Dict, Object};
use crate::reader::ReaderContext;
use log::warn;
use std::borrow::Cow;

/// The payload of a stream.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// The bytes still live in the source file, at the given offset.
    Pending { offset: usize, len: usize },
    /// The bytes as stored, the filters of the stream dictionary still apply.
    Encoded(Vec<u8>),
    /// Plain bytes. The filters of the stream dictionary are applied when
    /// the stream is written.
    Decoded(Vec<u8>),
}

/// A PDF stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Stream {
    dict: Dict,
    payload: Payload,
}

impl Stream {
    /// Create a new stream from plain bytes.
    pub fn new(dict: Dict, data: Vec<u8>) -> Self {
        Self {
            dict,
            payload: Payload::Decoded(data),
        }
    }

    /// Create a new stream from bytes that are already encoded with the
    /// filters of the dictionary.
    pub fn from_encoded(dict: Dict, data: Vec<u8>) -> Self {
        Self {
            dict,
            payload: Payload::Encoded(data),
        }
    }

    /// The stream dictionary.
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    /// The stream dictionary, for modification.
    pub fn dict_mut(&mut self) -> &mut Dict {
        &mut self.dict
    }

    /// The data of the stream.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Replace the data of the stream.
    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// Replace the data of the stream by plain bytes.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.payload = Payload::Decoded(data);
    }

    /// Split the stream into its dictionary and its data.
    pub fn into_parts(self) -> (Dict, Payload) {
        (self.dict, self.payload)
    }

    /// Return the encoded bytes of the stream, reading pending payloads from
    /// `source`. Returns `None` for decoded payloads and for pending payloads
    /// that are out of range.
    pub fn encoded_data<'a>(&'a self, source: &'a [u8]) -> Option<Cow<'a, [u8]>> {
        match &self.payload {
            Payload::Pending { offset, len } => source
                .get(*offset..offset.checked_add(*len)?)
                .map(Cow::Borrowed),
            Payload::Encoded(data) => Some(Cow::Borrowed(data)),
            Payload::Decoded(_) => None,
        }
    }

    /// Copy a pending payload out of `source`, so that the stream no longer
    /// depends on it.
    pub fn load_pending(&mut self, source: &[u8]) -> Option<()> {
        if let Payload::Pending { offset, len } = self.payload {
            let data = source.get(offset..offset.checked_add(len)?)?;
            self.payload = Payload::Encoded(data.to_vec());
        }

        Some(())
    }
}

object!(Stream, Stream);

/// Read the body of a stream whose dictionary has already been parsed. The
/// reader must be positioned at the `stream` keyword.
pub(crate) fn read_body(r: &mut Reader<'_>, dict: Dict, ctx: &ReaderContext<'_>) -> Option<Stream> {
    r.forward_tag(b"stream")?;
    // Some writers put spaces before the end-of-line marker.
    r.forward_while(|b| b == b' ');
    r.skip_eol();

    let start = r.offset();

    let declared = match dict.get(LENGTH) {
        Some(Object::Number(n)) => n.as_integer().and_then(|l| usize::try_from(l).ok()),
        Some(Object::Ref(obj_ref)) => ctx.stream_length(*obj_ref),
        _ => None,
    };

    let len = match declared.and_then(|len| check_length(r, start, len)) {
        Some(len) => len,
        None => {
            let len = search_length(r, start)?;
            warn!("stream length was invalid, found endstream after {len} bytes");

            len
        }
    };

    r.jump(start);
    let data = r.read_bytes(len)?;
    r.skip_white_spaces();
    r.forward_tag(b"endstream")?;

    let payload = if ctx.lazy_streams {
        Payload::Pending { offset: start, len }
    } else {
        Payload::Encoded(data.to_vec())
    };

    Some(Stream { dict, payload })
}

fn check_length(r: &Reader<'_>, start: usize, len: usize) -> Option<usize> {
    let mut end = Reader::new_at(r.data(), start.checked_add(len)?);
    end.skip_white_spaces();
    end.peek_tag(b"endstream")?;

    Some(len)
}

fn search_length(r: &Reader<'_>, start: usize) -> Option<usize> {
    let end = Reader::new_at(r.data(), start).find(b"endstream")?;
    let data = r.range(start..end)?;

    // The end-of-line marker before `endstream` is not part of the data.
    let trimmed = data
        .strip_suffix(b"\r\n")
        .or_else(|| data.strip_suffix(b"\n"))
        .or_else(|| data.strip_suffix(b"\r"))
        .unwrap_or(data);

    Some(trimmed.len())
}

#[cfg(test)]
mod tests {
    use crate::byte_reader::Reader;
    use crate::object::{ObjRef, Object, Payload};
    use crate::reader::ReaderContext;

    fn read(data: &[u8], ctx: &ReaderContext<'_>) -> Option<Object> {
        Reader::new(data).read::<Object>(ctx)
    }

    fn encoded(obj: &Object) -> &[u8] {
        match obj.as_stream().unwrap().payload() {
            Payload::Encoded(data) => data,
            _ => panic!("expected an encoded payload"),
        }
    }

    #[test]
    fn direct_length() {
        let ctx = ReaderContext::new();
        let obj = read(b"<< /Length 10 >> stream\nabcdefghij\nendstream", &ctx).unwrap();
        assert_eq!(encoded(&obj), b"abcdefghij");
    }

    #[test]
    fn crlf_after_keyword() {
        let ctx = ReaderContext::new();
        let obj = read(b"<< /Length 3 >>\nstream\r\nabc\r\nendstream", &ctx).unwrap();
        assert_eq!(encoded(&obj), b"abc");
    }

    #[test]
    fn wrong_length_falls_back_to_search() {
        let ctx = ReaderContext::new();
        let obj = read(b"<< /Length 2 >> stream\nabcdef\nendstream", &ctx).unwrap();
        assert_eq!(encoded(&obj), b"abcdef");

        let obj = read(b"<< /Length 900 >> stream\nabc\nendstream", &ctx).unwrap();
        assert_eq!(encoded(&obj), b"abc");
    }

    #[test]
    fn missing_length() {
        let obj = read(b"<< >> stream\r\nxyz\r\nendstream", &ReaderContext::new()).unwrap();
        assert_eq!(encoded(&obj), b"xyz");
    }

    #[test]
    fn indirect_length_uses_hook() {
        let hook = |r: ObjRef| (r == ObjRef::new(7, 0)).then_some(9);
        let ctx = ReaderContext::new().with_length_hook(&hook);
        // The data contains `endstream` itself, so only the hook gets it right.
        let obj = read(b"<< /Length 7 0 R >> stream\nendstream\nendstream", &ctx).unwrap();
        assert_eq!(encoded(&obj), b"endstream");
    }

    #[test]
    fn lazy_payload() {
        let data = b"<< /Length 3 >> stream\nabc\nendstream";
        let ctx = ReaderContext::new().with_lazy_streams(true);
        let obj = read(data, &ctx).unwrap();
        let stream = obj.as_stream().unwrap();

        assert_eq!(stream.payload(), &Payload::Pending { offset: 23, len: 3 });
        assert_eq!(&*stream.encoded_data(data).unwrap(), b"abc");
    }

    #[test]
    fn missing_endstream() {
        assert!(read(b"<< /Length 3 >> stream\nabc", &ReaderContext::new()).is_none());
    }
}
