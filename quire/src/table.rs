//! The table of indirect objects.

use crate::error::{Error, Result};
use log::{debug, warn};
use quire_syntax::{ObjRef, Object};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Generations can't grow beyond this, an entry that reaches it is never
/// reused.
pub const MAX_GENERATION: u16 = 65535;

/// The highest object number that is accepted. Entries above it are dropped
/// when they are read, and no object beyond it is ever allocated.
pub const MAX_OBJECT_NUMBER: u32 = 8_388_607;

/// Where the value of an object in use lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The object was created in memory and has no other source.
    Memory,
    /// The object is defined at this offset of the source data.
    Offset(usize),
    /// The object is member `index` of the object stream `stream`.
    Compressed { stream: u32, index: u32 },
    /// The object was written to the output at this offset and released.
    Flushed(u64),
    /// The cross-reference data points nowhere useful.
    Broken,
}

/// An object that is in use.
#[derive(Debug, Clone)]
pub struct InUse {
    /// The generation of the object.
    pub generation: u16,
    /// Where the value can be read from.
    pub location: Location,
    /// The parsed value, if it is resident.
    pub cached: Option<Object>,
    /// Whether the value differs from `location`.
    pub modified: bool,
}

impl InUse {
    pub(crate) fn at(generation: u16, location: Location) -> Self {
        Self {
            generation,
            location,
            cached: None,
            modified: false,
        }
    }

    /// Whether the cached value can be dropped and read again later.
    pub fn is_rereadable(&self) -> bool {
        !self.modified && matches!(self.location, Location::Offset(_) | Location::Compressed { .. })
    }
}

/// An entry of the table.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A free entry. `generation` is the generation that the next object with
    /// this number gets.
    Free { generation: u16, modified: bool },
    /// An entry that is in use.
    InUse(InUse),
}

impl Entry {
    /// The generation of the object, or the generation that the next object
    /// with this number gets if the entry is free.
    pub fn generation(&self) -> u16 {
        match self {
            Self::Free { generation, .. } => *generation,
            Self::InUse(e) => e.generation,
        }
    }

    /// Whether the entry changed since the source was read.
    pub fn is_modified(&self) -> bool {
        match self {
            Self::Free { modified, .. } => *modified,
            Self::InUse(e) => e.modified,
        }
    }
}

/// Maps object numbers to entries.
///
/// Object 0 is always the head of the free list and is never handed out.
#[derive(Debug, Clone)]
pub struct RefTable {
    entries: FxHashMap<u32, Entry>,
    // Free numbers that can be reused, lowest first.
    reusable: BTreeSet<u32>,
    len: u32,
}

impl RefTable {
    /// Create a table that only holds the head of the free list.
    pub fn new() -> Self {
        let mut table = Self {
            entries: FxHashMap::default(),
            reusable: BTreeSet::new(),
            len: 0,
        };

        table.set(
            0,
            Entry::Free {
                generation: MAX_GENERATION,
                modified: false,
            },
        );

        table
    }

    /// The number of slots, which is one more than the highest object number.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether the table holds nothing besides object 0.
    pub fn is_empty(&self) -> bool {
        self.len <= 1
    }

    /// The entry of an object number.
    pub fn get(&self, num: u32) -> Option<&Entry> {
        self.entries.get(&num)
    }

    /// The entry of an object number, for modification.
    pub fn get_mut(&mut self, num: u32) -> Option<&mut Entry> {
        self.entries.get_mut(&num)
    }

    /// Return the entry if it is in use with the generation of the reference.
    pub fn in_use(&self, r: ObjRef) -> Result<&InUse> {
        match self.entries.get(&r.obj_number) {
            Some(Entry::InUse(e)) if e.generation == r.gen_number => Ok(e),
            _ => Err(Error::FreedReference(r)),
        }
    }

    /// Like [`RefTable::in_use`], for modification.
    pub fn in_use_mut(&mut self, r: ObjRef) -> Result<&mut InUse> {
        match self.entries.get_mut(&r.obj_number) {
            Some(Entry::InUse(e)) if e.generation == r.gen_number => Ok(e),
            _ => Err(Error::FreedReference(r)),
        }
    }

    /// Replace the entry of an object number. Numbers above
    /// [`MAX_OBJECT_NUMBER`] are ignored.
    pub fn set(&mut self, num: u32, entry: Entry) {
        if num > MAX_OBJECT_NUMBER {
            warn!("ignoring entry for object number {num}, which is out of range");

            return;
        }

        match &entry {
            Entry::Free { generation, .. } if num != 0 && *generation < MAX_GENERATION => {
                self.reusable.insert(num);
            }
            _ => {
                self.reusable.remove(&num);
            }
        }

        self.entries.insert(num, entry);
        self.len = self.len.max(num + 1);
    }

    /// How many objects can still be allocated.
    pub fn remaining(&self) -> usize {
        let fresh = (MAX_OBJECT_NUMBER + 1).saturating_sub(self.len);

        self.reusable.len() + fresh as usize
    }

    /// Store a new object, reusing the lowest free number if there is one.
    pub fn allocate(&mut self, value: Object) -> Result<ObjRef> {
        let (num, generation) = match self.reusable.pop_first() {
            Some(num) => (num, self.entries.get(&num).map_or(0, Entry::generation)),
            None if self.len <= MAX_OBJECT_NUMBER => (self.len, 0),
            None => return Err(Error::Structure("no object numbers left")),
        };

        debug!("allocated object {num} {generation}");

        self.set(
            num,
            Entry::InUse(InUse {
                generation,
                location: Location::Memory,
                cached: Some(value),
                modified: true,
            }),
        );

        Ok(ObjRef::new(num, generation))
    }

    /// Free the object, so that references to it become stale.
    pub fn free(&mut self, r: ObjRef) -> Result<()> {
        if r.obj_number == 0 {
            return Err(Error::FreedReference(r));
        }

        let generation = self.in_use(r)?.generation;

        self.set(
            r.obj_number,
            Entry::Free {
                generation: generation.saturating_add(1),
                modified: true,
            },
        );

        Ok(())
    }

    /// All object numbers that have an entry, in ascending order.
    pub fn numbers(&self) -> Vec<u32> {
        let mut numbers = self.entries.keys().copied().collect::<Vec<_>>();
        numbers.sort_unstable();

        numbers
    }

    /// References to all objects in use, in ascending order.
    pub fn live_refs(&self) -> Vec<ObjRef> {
        self.numbers()
            .into_iter()
            .filter_map(|num| match &self.entries[&num] {
                Entry::InUse(e) => Some(ObjRef::new(num, e.generation)),
                Entry::Free { .. } => None,
            })
            .collect()
    }

    /// Drop all entries.
    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for RefTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::table::{Entry, InUse, Location, MAX_GENERATION, MAX_OBJECT_NUMBER, RefTable};
    use quire_syntax::{ObjRef, Object};

    #[test]
    fn object_zero_is_never_allocated() {
        let mut table = RefTable::new();
        assert_eq!(table.allocate(Object::from(1)).unwrap(), ObjRef::new(1, 0));
        assert_eq!(table.allocate(Object::from(2)).unwrap(), ObjRef::new(2, 0));
        assert!(matches!(table.free(ObjRef::new(0, 65535)), Err(Error::FreedReference(_))));
    }

    #[test]
    fn free_bumps_generation_and_is_reused() {
        let mut table = RefTable::new();
        let a = table.allocate(Object::from(1)).unwrap();
        let _b = table.allocate(Object::from(2)).unwrap();

        table.free(a).unwrap();
        assert!(matches!(table.in_use(a), Err(Error::FreedReference(_))));
        assert_eq!(table.get(1).unwrap().generation(), 1);

        assert_eq!(table.allocate(Object::from(3)).unwrap(), ObjRef::new(1, 1));
        assert_eq!(table.allocate(Object::from(4)).unwrap(), ObjRef::new(3, 0));
    }

    #[test]
    fn lowest_free_number_first() {
        let mut table = RefTable::new();
        let refs = (0..5).map(|i| table.allocate(Object::from(i)).unwrap()).collect::<Vec<_>>();
        table.free(refs[3]).unwrap();
        table.free(refs[1]).unwrap();

        assert_eq!(table.allocate(Object::Null).unwrap().obj_number, 2);
        assert_eq!(table.allocate(Object::Null).unwrap().obj_number, 4);
    }

    #[test]
    fn exhausted_generation_is_not_reused() {
        let mut table = RefTable::new();
        table.set(1, Entry::InUse(InUse::at(MAX_GENERATION - 1, Location::Offset(10))));
        table.free(ObjRef::new(1, MAX_GENERATION - 1)).unwrap();

        assert_eq!(table.allocate(Object::Null).unwrap(), ObjRef::new(2, 0));
    }

    #[test]
    fn stale_generation() {
        let mut table = RefTable::new();
        table.set(4, Entry::InUse(InUse::at(2, Location::Offset(10))));

        assert!(table.in_use(ObjRef::new(4, 2)).is_ok());
        assert!(matches!(table.in_use(ObjRef::new(4, 1)), Err(Error::FreedReference(_))));
        assert!(matches!(table.in_use(ObjRef::new(9, 0)), Err(Error::FreedReference(_))));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn out_of_range_numbers() {
        let mut table = RefTable::new();
        table.set(u32::MAX, Entry::InUse(InUse::at(0, Location::Offset(10))));
        assert!(table.get(u32::MAX).is_none());
        assert_eq!(table.len(), 1);

        table.set(MAX_OBJECT_NUMBER, Entry::InUse(InUse::at(0, Location::Offset(10))));
        assert_eq!(table.len(), MAX_OBJECT_NUMBER + 1);
        assert_eq!(table.remaining(), 0);
        assert!(matches!(table.allocate(Object::Null), Err(Error::Structure(_))));

        table.free(ObjRef::new(MAX_OBJECT_NUMBER, 0)).unwrap();
        assert_eq!(table.remaining(), 1);
        assert_eq!(table.allocate(Object::Null).unwrap(), ObjRef::new(MAX_OBJECT_NUMBER, 1));
    }
}
