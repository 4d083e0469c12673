//! Object streams.

use log::warn;
use quire_syntax::byte_reader::Reader;
use quire_syntax::object::dict::keys::{FIRST, N};
use quire_syntax::reader::ReaderContext;
use quire_syntax::{Dict, Object};

/// The decoded data of an object stream together with its member offsets.
///
/// The header pairs are parsed once when the stream is loaded, members are
/// parsed on every access and cached by the document.
#[derive(Debug)]
pub(crate) struct ObjectStream {
    data: Vec<u8>,
    offsets: Vec<(u32, usize)>,
}

impl ObjectStream {
    pub(crate) fn new(dict: &Dict, data: Vec<u8>) -> Option<Self> {
        let num_objects = usize::try_from(dict.get_int(N)?).ok()?;
        let first_offset = usize::try_from(dict.get_int(FIRST)?).ok()?;

        let mut r = Reader::new(&data);
        let mut offsets = Vec::with_capacity(num_objects.min(data.len()));

        for _ in 0..num_objects {
            r.skip_white_spaces_and_comments();
            let Some((obj_num, relative_offset)) = read_pair(&mut r) else {
                warn!("object stream header is shorter than /N");
                break;
            };

            offsets.push((obj_num, first_offset.checked_add(relative_offset)?));
        }

        Some(Self { data, offsets })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.offsets.len()
    }

    /// The object numbers of the members, in stream order.
    pub(crate) fn members(&self) -> impl Iterator<Item = u32> + '_ {
        self.offsets.iter().map(|(num, _)| *num)
    }

    /// Parse the member at `index`, checking that it is the object `num`.
    pub(crate) fn get(&self, index: u32, num: u32) -> Option<Object> {
        let (obj_num, offset) = *self.offsets.get(usize::try_from(index).ok()?)?;

        if obj_num != num {
            warn!("object stream contains object {obj_num} at index {index}, expected {num}");

            return None;
        }

        let mut r = Reader::new_at(&self.data, offset);
        r.skip_white_spaces_and_comments();

        match r.read::<Object>(&ReaderContext::new())? {
            // Streams can't be stored in object streams.
            Object::Stream(_) => None,
            obj => Some(obj),
        }
    }
}

fn read_pair(r: &mut Reader<'_>) -> Option<(u32, usize)> {
    let obj_num = u32::try_from(r.read_plain_uint()?).ok()?;
    r.skip_white_spaces_and_comments();
    let offset = usize::try_from(r.read_plain_uint()?).ok()?;

    Some((obj_num, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_syntax::Number;

    fn header(n: i64, first: i64) -> Dict {
        let mut dict = Dict::new();
        dict.insert(&b"Type"[..], Object::Name("ObjStm".into()));
        dict.insert(N, n);
        dict.insert(FIRST, first);
        dict
    }

    #[test]
    fn members() {
        let data = b"11 0 12 9 <</A 1>> [1 2]".to_vec();
        let stream = ObjectStream::new(&header(2, 10), data).unwrap();

        assert_eq!(stream.len(), 2);
        assert_eq!(stream.members().collect::<Vec<_>>(), vec![11, 12]);
        assert_eq!(
            stream.get(0, 11).unwrap().as_dict().unwrap().get_int(b"A"),
            Some(1)
        );
        assert_eq!(
            stream.get(1, 12).unwrap().as_array().unwrap().get(1),
            Some(&Object::Number(Number::from_integer(2)))
        );
    }

    #[test]
    fn wrong_member() {
        let data = b"11 0 42".to_vec();
        let stream = ObjectStream::new(&header(1, 5), data).unwrap();

        assert!(stream.get(0, 12).is_none());
        assert!(stream.get(3, 11).is_none());
        assert_eq!(stream.get(0, 11), Some(Object::from(42)));
    }

    #[test]
    fn short_header() {
        let stream = ObjectStream::new(&header(5, 5), b"11 0 42".to_vec()).unwrap();
        assert_eq!(stream.len(), 1);
    }

    #[test]
    fn missing_first() {
        let mut dict = header(1, 0);
        dict.remove(FIRST);
        assert!(ObjectStream::new(&dict, Vec::new()).is_none());
    }
}
