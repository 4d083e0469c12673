//! Dictionary objects.

use crate::byte_reader::Reader;
use crate::object::macros::object;
use crate::object::{Array, Name, ObjRef, Object, PdfString, Resolve};
use crate::reader::{Readable, ReaderContext};
use log::warn;
use std::collections::BTreeMap;
use std::collections::btree_map;

/// A PDF dictionary.
///
/// Keys are unique and iteration is in key order. Values are stored as they
/// were read: references are never resolved or written back implicitly.
#[derive(Clone, Debug, Default)]
pub struct Dict {
    entries: BTreeMap<Name, Object>,
    direct_only: bool,
}

impl Dict {
    /// Create a new empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dictionary that may never become an indirect object.
    pub fn new_direct_only() -> Self {
        Self {
            entries: BTreeMap::new(),
            direct_only: true,
        }
    }

    /// Whether the dictionary must never become an indirect object.
    pub fn is_direct_only(&self) -> bool {
        self.direct_only
    }

    /// Mark the dictionary as direct-only.
    pub fn set_direct_only(&mut self, direct_only: bool) {
        self.direct_only = direct_only;
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether there is an entry for the key.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Return the raw value of the entry.
    pub fn get(&self, key: &[u8]) -> Option<&Object> {
        self.entries.get(key)
    }

    /// The value of the key, for modification.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Object> {
        self.entries.get_mut(key)
    }

    /// Insert an entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<Name>, value: impl Into<Object>) -> Option<Object> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove the entry and return its value.
    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.entries.remove(key)
    }

    /// Keep only the entries for which the predicate returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&Name, &mut Object) -> bool) {
        self.entries.retain(|k, v| f(k, v));
    }

    /// The keys, in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.entries.keys()
    }

    /// Iterate over the entries, in ascending key order.
    pub fn iter(&self) -> btree_map::Iter<'_, Name, Object> {
        self.entries.iter()
    }

    /// Iterate over the entries, for modification.
    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, Name, Object> {
        self.entries.iter_mut()
    }

    /// The value of the key, if it is a name.
    pub fn get_name(&self, key: &[u8]) -> Option<&Name> {
        self.get(key)?.as_name()
    }

    /// The value of the key, if it is an integer.
    pub fn get_int(&self, key: &[u8]) -> Option<i64> {
        self.get(key)?.as_i64()
    }

    /// The value of the key as a float, if it is a number.
    pub fn get_f64(&self, key: &[u8]) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    /// The value of the key, if it is a boolean.
    pub fn get_bool(&self, key: &[u8]) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    /// The value of the key, if it is a reference.
    pub fn get_ref(&self, key: &[u8]) -> Option<ObjRef> {
        self.get(key)?.as_obj_ref()
    }

    /// The value of the key, if it is a string.
    pub fn get_string(&self, key: &[u8]) -> Option<&PdfString> {
        self.get(key)?.as_string()
    }

    /// The value of the key, if it is an array.
    pub fn get_array(&self, key: &[u8]) -> Option<&Array> {
        self.get(key)?.as_array()
    }

    /// The value of the key, if it is a dictionary.
    pub fn get_dict(&self, key: &[u8]) -> Option<&Self> {
        match self.get(key)? {
            Object::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Whether `/Type` is the given name.
    pub fn is_type(&self, ty: &[u8]) -> bool {
        self.get_name(keys::TYPE).is_some_and(|n| n.as_bytes() == ty)
    }

    /// Return the value of the entry, following it if it is a reference. The
    /// dictionary itself is not changed.
    pub fn get_resolved<R: Resolve>(
        &self,
        key: &[u8],
        resolver: &mut R,
    ) -> Result<Option<Object>, R::Error> {
        self.get(key)
            .map(|obj| resolver.resolve_object(obj))
            .transpose()
    }

    /// Replace a reference stored under the key by the value it points to.
    ///
    /// Streams can't be stored directly inside another object, so a reference
    /// to a stream is left untouched.
    pub fn inline<R: Resolve>(
        &mut self,
        key: &[u8],
        resolver: &mut R,
    ) -> Result<Option<&Object>, R::Error> {
        if let Some(Object::Ref(r)) = self.entries.get(key) {
            let resolved = resolver.resolve_ref(*r)?;

            if matches!(resolved, Object::Stream(_)) {
                warn!("refusing to inline stream {r}");
            } else if let Some(slot) = self.entries.get_mut(key) {
                *slot = resolved;
            }
        }

        Ok(self.entries.get(key))
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl FromIterator<(Name, Object)> for Dict {
    fn from_iter<T: IntoIterator<Item = (Name, Object)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            direct_only: false,
        }
    }
}

impl IntoIterator for Dict {
    type Item = (Name, Object);
    type IntoIter = btree_map::IntoIter<Name, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dict {
    type Item = (&'a Name, &'a Object);
    type IntoIter = btree_map::Iter<'a, Name, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

object!(Dict, Dict);

impl Readable for Dict {
    fn read(r: &mut Reader<'_>, ctx: &ReaderContext<'_>) -> Option<Self> {
        r.forward_tag(b"<<")?;

        let mut dict = Self::new();

        loop {
            r.skip_white_spaces_and_comments();

            if let Some(()) = r.forward_tag(b">>") {
                return Some(dict);
            }

            let Some(name) = r.read::<Name>(ctx) else {
                // Be lenient with garbage between entries and just skip it.
                let garbage = r.offset();
                r.read::<Object>(ctx)?;
                warn!("skipped a value without key in dictionary at offset {garbage}");

                continue;
            };

            r.skip_white_spaces_and_comments();

            if r.peek_tag(b">>").is_some() {
                warn!("dictionary key {name} has no value");
                dict.insert(name, Object::Null);

                continue;
            }

            let value = r.read::<Object>(ctx)?;

            // A later duplicate key overrides the first one.
            dict.insert(name, value);
        }
    }
}

/// Dictionary keys and name values used throughout the crate.
#[allow(missing_docs)]
pub mod keys {
    macro_rules! key {
        ($i:ident, $e:expr) => {
            pub const $i: &'static [u8] = $e;
        };
    }

    // Structure
    key!(TYPE, b"Type");
    key!(SUBTYPE, b"Subtype");
    key!(ROOT, b"Root");
    key!(INFO, b"Info");
    key!(ID, b"ID");
    key!(ENCRYPT, b"Encrypt");
    key!(PREV, b"Prev");
    key!(SIZE, b"Size");
    key!(INDEX, b"Index");
    key!(W, b"W");
    key!(XREF_STM, b"XRefStm");
    key!(VERSION, b"Version");
    key!(PAGES, b"Pages");
    key!(KIDS, b"Kids");
    key!(COUNT, b"Count");
    key!(PARENT, b"Parent");
    key!(CONTENTS, b"Contents");
    key!(RESOURCES, b"Resources");

    // Types
    key!(CATALOG, b"Catalog");
    key!(PAGE, b"Page");
    key!(XREF, b"XRef");
    key!(OBJ_STM, b"ObjStm");

    // Streams
    key!(LENGTH, b"Length");
    key!(FILTER, b"Filter");
    key!(DECODE_PARMS, b"DecodeParms");
    key!(DL, b"DL");
    key!(N, b"N");
    key!(FIRST, b"First");
    key!(EXTENDS, b"Extends");

    // Filters and their parameters
    key!(FLATE_DECODE, b"FlateDecode");
    key!(FLATE_DECODE_ABBREVIATION, b"Fl");
    key!(ASCII_HEX_DECODE, b"ASCIIHexDecode");
    key!(ASCII_HEX_DECODE_ABBREVIATION, b"AHx");
    key!(ASCII85_DECODE, b"ASCII85Decode");
    key!(ASCII85_DECODE_ABBREVIATION, b"A85");
    key!(RUN_LENGTH_DECODE, b"RunLengthDecode");
    key!(RUN_LENGTH_DECODE_ABBREVIATION, b"RL");
    key!(PREDICTOR, b"Predictor");
    key!(COLORS, b"Colors");
    key!(BITS_PER_COMPONENT, b"BitsPerComponent");
    key!(COLUMNS, b"Columns");
}
