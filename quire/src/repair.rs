//! Rebuilding the cross-reference table of damaged files.

use crate::object_stream::ObjectStream;
use crate::settings::XRefFormat;
use crate::table::{Entry, InUse, Location, RefTable};
use crate::xref::{XRefData, clean_trailer};
use log::{debug, error, warn};
use memchr::memmem;
use quire_syntax::byte_reader::Reader;
use quire_syntax::object::dict::keys::{CATALOG, OBJ_STM, PAGES, ROOT, SIZE, XREF};
use quire_syntax::reader::ReaderContext;
use quire_syntax::{Dict, FilterRegistry, IndirectObject, ObjRef, Object, Payload};

/// Rebuild the table by scanning the whole file for object headers.
///
/// Later definitions of the same object number replace earlier ones. Members
/// of object streams are registered unless the object was also found as a
/// plain object in the file.
pub(crate) fn repair(data: &[u8], filters: &FilterRegistry) -> Option<XRefData> {
    let mut table = RefTable::new();
    let mut trailers = Vec::new();
    let mut catalog = None;
    let mut members = Vec::new();
    let mut xref_streams = Vec::new();
    let ctx = ReaderContext::new();

    for obj_pos in memmem::find_iter(data, b"obj") {
        let Some(start) = header_start(data, obj_pos) else {
            continue;
        };

        let Ok(obj) = IndirectObject::parse_at(data, start, &ctx) else {
            continue;
        };

        let id = obj.id;

        if id.obj_number == 0 {
            continue;
        }

        table.set(
            id.obj_number,
            Entry::InUse(InUse::at(id.gen_number, Location::Offset(start))),
        );

        match &obj.object {
            Object::Dict(dict) if dict.is_type(CATALOG) => {
                catalog = Some(ObjRef::from(id));
            }
            Object::Stream(stream) if stream.dict().is_type(OBJ_STM) => {
                let Payload::Encoded(encoded) = stream.payload() else {
                    continue;
                };

                match filters.decode_stream(stream.dict(), encoded) {
                    Ok(decoded) => {
                        if let Some(objects) = ObjectStream::new(stream.dict(), decoded) {
                            let container = id.obj_number;
                            members.extend(objects.members().enumerate().filter_map(|(i, num)| {
                                Some((container, u32::try_from(i).ok()?, num))
                            }));
                        }
                    }
                    Err(e) => warn!("failed to decode object stream {}: {e}", ObjRef::from(id)),
                }
            }
            Object::Stream(stream) if stream.dict().is_type(XREF) => {
                xref_streams.push(id.obj_number);

                if stream.dict().contains_key(ROOT) {
                    trailers.push(stream.dict().clone());
                }
            }
            _ => {}
        }
    }

    for (stream, index, num) in members {
        if num == 0 {
            continue;
        }

        let plain = matches!(
            table.get(num),
            Some(Entry::InUse(InUse {
                location: Location::Offset(_),
                ..
            }))
        );

        if !plain {
            table.set(num, Entry::InUse(InUse::at(0, Location::Compressed { stream, index })));
        }
    }

    for trailer_pos in memmem::find_iter(data, b"trailer") {
        let mut r = Reader::new_at(data, trailer_pos + b"trailer".len());
        r.skip_white_spaces_and_comments();

        if let Some(dict) = r.read_without_context::<Dict>()
            && dict.contains_key(ROOT)
        {
            trailers.push(dict);
        }
    }

    let mut trailer = select_trailer(trailers, &table, data)
        .or_else(|| {
            let catalog = catalog?;
            debug!("using catalog {catalog} as root of the rebuilt trailer");

            let mut dict = Dict::new();
            dict.insert(ROOT, catalog);

            Some(dict)
        })
        .or_else(|| {
            error!("couldn't find a trailer or catalog, failed to rebuild the xref table");

            None
        })?;

    clean_trailer(&mut trailer);
    trailer.insert(SIZE, table.len());

    warn!("rebuilt cross-reference table with {} objects", table.live_refs().len());

    Some(XRefData {
        table,
        trailer,
        start_xref: None,
        format: XRefFormat::Table,
        xref_streams,
    })
}

// Prefer the last trailer whose root points to a catalog with pages.
fn select_trailer(trailers: Vec<Dict>, table: &RefTable, data: &[u8]) -> Option<Dict> {
    let is_valid = |dict: &Dict| {
        let Some(root) = dict.get_ref(ROOT) else {
            return false;
        };

        match table.get(root.obj_number) {
            Some(Entry::InUse(InUse {
                location: Location::Offset(offset),
                generation,
                ..
            })) if *generation == root.gen_number => {
                let ctx = ReaderContext::new().with_lazy_streams(true);

                IndirectObject::parse_at(data, *offset, &ctx)
                    .ok()
                    .and_then(|obj| obj.object.as_dict().map(|d| d.contains_key(PAGES)))
                    .unwrap_or(false)
            }
            Some(Entry::InUse(InUse {
                location: Location::Compressed { .. },
                ..
            })) => true,
            _ => false,
        }
    };

    let mut fallback = None;

    for dict in trailers.into_iter().rev() {
        if is_valid(&dict) {
            return Some(dict);
        }

        fallback.get_or_insert(dict);
    }

    fallback
}

// Walk back from `obj` over `<num> <gen> ` and return the offset of `<num>`.
fn header_start(data: &[u8], obj_pos: usize) -> Option<usize> {
    let mut pos = obj_pos;

    let back_while = |pos: &mut usize, f: fn(u8) -> bool| {
        let end = *pos;
        while *pos > 0 && f(data[*pos - 1]) {
            *pos -= 1;
        }
        end - *pos
    };

    let is_space = |b: u8| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\0');

    if back_while(&mut pos, is_space) == 0 {
        return None;
    }
    if back_while(&mut pos, |b| b.is_ascii_digit()) == 0 {
        return None;
    }
    if back_while(&mut pos, is_space) == 0 {
        return None;
    }
    if back_while(&mut pos, |b| b.is_ascii_digit()) == 0 {
        return None;
    }

    match pos.checked_sub(1).map(|p| data[p]) {
        None => Some(pos),
        Some(b) if is_space(b) || matches!(b, b'>' | b')' | b']' | b'%') => Some(pos),
        _ => None,
    }
}
