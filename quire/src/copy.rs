//! Copying objects between documents.
//!
//! The copy is done in two passes. The first one walks the source and builds
//! the copied values, with references numbered in visiting order. Only if
//! that succeeds, numbers are allocated in the destination and the
//! references are renumbered, so a failed copy leaves the destination
//! untouched.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::settings::{Tolerance, Warning};
use log::{debug, warn};
use quire_syntax::{Array, Dict, Name, ObjRef, Object, Stream};
use rustc_hash::FxHashMap;

struct CopyContext<'a, F> {
    source: &'a mut Document,
    filter: F,
    // Maps source references to their position in `copied`.
    ref_map: FxHashMap<ObjRef, u32>,
    to_visit: Vec<(ObjRef, u32)>,
    copied: Vec<Object>,
}

impl<F: FnMut(&Name, &Object) -> bool> CopyContext<'_, F> {
    // Return a placeholder reference whose number is the position of the
    // copied object, queueing the object on first sight so that cycles end up
    // pointing at the same object.
    fn map_ref(&mut self, r: ObjRef) -> Result<Object> {
        if let Some(index) = self.ref_map.get(&r) {
            return Ok(Object::Ref(ObjRef::new(*index, 0)));
        }

        if let Err(e) = self.source.table().in_use(r) {
            if self.source.settings().tolerance == Tolerance::Strict {
                return Err(e);
            }

            warn!("copying freed reference {r} as null");
            (self.source.settings().warning_sink)(Warning::UnreadableObject(r));

            return Ok(Object::Null);
        }

        let index = u32::try_from(self.copied.len()).map_err(|_| Error::CyclicCopyOverflow)?;
        self.copied.push(Object::Null);
        self.ref_map.insert(r, index);
        self.to_visit.push((r, index));

        Ok(Object::Ref(ObjRef::new(index, 0)))
    }

    fn copy_value(&mut self, value: &Object) -> Result<Object> {
        Ok(match value {
            Object::Ref(r) => self.map_ref(*r)?,
            Object::Array(array) => Object::Array(self.copy_array(array)?),
            Object::Dict(dict) => Object::Dict(self.copy_dict(dict)?),
            Object::Stream(stream) => Object::Stream(self.copy_stream(stream)?),
            other => other.clone(),
        })
    }

    fn copy_array(&mut self, array: &Array) -> Result<Array> {
        let mut copied = array
            .iter()
            .map(|item| self.copy_value(item))
            .collect::<Result<Array>>()?;
        copied.set_direct_only(array.is_direct_only());

        Ok(copied)
    }

    fn copy_dict(&mut self, dict: &Dict) -> Result<Dict> {
        let mut copied = Dict::new();
        copied.set_direct_only(dict.is_direct_only());

        for (key, value) in dict {
            if (self.filter)(key, value) {
                copied.insert(key.clone(), self.copy_value(value)?);
            }
        }

        Ok(copied)
    }

    // Payloads are copied as they are stored, without decoding them.
    fn copy_stream(&mut self, stream: &Stream) -> Result<Stream> {
        let mut payload = stream.clone();
        payload
            .load_pending(self.source.source_bytes())
            .ok_or(Error::Structure("stream data lies outside of the source"))?;

        let dict = self.copy_dict(stream.dict())?;
        let (_, payload) = payload.into_parts();

        let mut copied = Stream::new(dict, Vec::new());
        copied.set_payload(payload);

        Ok(copied)
    }
}

// Replace placeholder references by the allocated ones.
fn renumber(value: &mut Object, refs: &[ObjRef]) {
    match value {
        Object::Ref(r) => {
            if let Some(mapped) = usize::try_from(r.obj_number).ok().and_then(|i| refs.get(i)) {
                *r = *mapped;
            }
        }
        Object::Array(array) => array.iter_mut().for_each(|item| renumber(item, refs)),
        Object::Dict(dict) => dict.iter_mut().for_each(|(_, item)| renumber(item, refs)),
        Object::Stream(stream) => {
            stream.dict_mut().iter_mut().for_each(|(_, item)| renumber(item, refs));
        }
        _ => {}
    }
}

/// Copy a value and everything it references from `source` into `dest`.
///
/// References are mapped to newly allocated objects in `dest`, every source
/// object is copied at most once, so cycles are preserved. Dictionary entries
/// for which `filter` returns `false` are dropped. Returns the copied value,
/// which is a reference into `dest` if `value` is a reference.
///
/// If an error occurs, `dest` is left unchanged.
pub fn copy_subgraph(
    value: &Object,
    source: &mut Document,
    dest: &mut Document,
    filter: impl FnMut(&Name, &Object) -> bool,
) -> Result<Object> {
    dest.check_open()?;

    let limit = source.len() as usize;

    let mut ctx = CopyContext {
        source,
        filter,
        ref_map: FxHashMap::default(),
        to_visit: Vec::new(),
        copied: Vec::new(),
    };

    let mut root = ctx.copy_value(value)?;
    let mut visited = 0;

    while let Some((from, index)) = ctx.to_visit.pop() {
        visited += 1;

        if visited > limit {
            return Err(Error::CyclicCopyOverflow);
        }

        let object = ctx.source.get(from)?;
        let object = ctx.copy_value(&object)?;
        ctx.copied[index as usize] = object;
    }

    let mut copied = ctx.copied;

    if dest.table().remaining() < copied.len() {
        return Err(Error::Structure("no object numbers left"));
    }

    let refs = copied.iter().map(|_| dest.reserve()).collect::<Result<Vec<_>>>()?;

    renumber(&mut root, &refs);

    for (object, r) in copied.iter_mut().zip(&refs) {
        renumber(object, &refs);
        dest.fill(*r, std::mem::take(object))?;
    }

    debug!("copied {visited} objects");

    Ok(root)
}
