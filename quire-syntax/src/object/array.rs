//! Array objects.

use crate::byte_reader::Reader;
use crate::object::macros::object;
use crate::object::{Object, Resolve};
use crate::reader::{Readable, ReaderContext};

/// A PDF array.
#[derive(Clone, Debug, Default)]
pub struct Array {
    items: Vec<Object>,
    direct_only: bool,
}

impl Array {
    /// Create a new empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an array that may never become an indirect object.
    pub fn new_direct_only() -> Self {
        Self {
            items: Vec::new(),
            direct_only: true,
        }
    }

    /// Whether the array must never become an indirect object.
    pub fn is_direct_only(&self) -> bool {
        self.direct_only
    }

    /// Mark the array as direct-only.
    pub fn set_direct_only(&mut self, direct_only: bool) {
        self.direct_only = direct_only;
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Return the item at the index, without resolving references.
    pub fn get(&self, index: usize) -> Option<&Object> {
        self.items.get(index)
    }

    /// The element at `index`, for modification.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.items.get_mut(index)
    }

    /// Return the item at the index, following it if it is a reference.
    pub fn get_resolved<R: Resolve>(
        &self,
        index: usize,
        resolver: &mut R,
    ) -> Result<Option<Object>, R::Error> {
        self.items
            .get(index)
            .map(|obj| resolver.resolve_object(obj))
            .transpose()
    }

    /// Append an element.
    pub fn push(&mut self, value: impl Into<Object>) {
        self.items.push(value.into());
    }

    /// Replace the item at the index, returning the old one. Returns `None`
    /// and leaves the array untouched if the index is out of bounds.
    pub fn set(&mut self, index: usize, value: impl Into<Object>) -> Option<Object> {
        let slot = self.items.get_mut(index)?;

        Some(core::mem::replace(slot, value.into()))
    }

    /// Remove the element at `index`, shifting the following ones.
    pub fn remove(&mut self, index: usize) -> Option<Object> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> core::slice::Iter<'_, Object> {
        self.items.iter()
    }

    /// Iterate over the elements, for modification.
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, Object> {
        self.items.iter_mut()
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[Object] {
        &self.items
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl From<Vec<Object>> for Array {
    fn from(items: Vec<Object>) -> Self {
        Self {
            items,
            direct_only: false,
        }
    }
}

impl FromIterator<Object> for Array {
    fn from_iter<T: IntoIterator<Item = Object>>(iter: T) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl IntoIterator for Array {
    type Item = Object;
    type IntoIter = std::vec::IntoIter<Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Object;
    type IntoIter = core::slice::Iter<'a, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

object!(Array, Array);

impl Readable for Array {
    fn read(r: &mut Reader<'_>, ctx: &ReaderContext<'_>) -> Option<Self> {
        r.forward_tag(b"[")?;

        let mut items = Vec::new();

        loop {
            r.skip_white_spaces_and_comments();

            if let Some(()) = r.forward_tag(b"]") {
                return Some(Self::from(items));
            }

            items.push(r.read::<Object>(ctx)?);
        }
    }
}
