//! Reading cross-reference sections.
//!
//! Loading walks from the last `startxref` of the file through the `/Prev`
//! chain, collects every section newest-first and then registers their
//! entries in a [`RefTable`], in the order given by [`UpdateOrder`].

use crate::error::{Error, Result};
use crate::settings::{UpdateOrder, XRefFormat};
use crate::table::{Entry, InUse, Location, RefTable};
use log::{debug, warn};
use quire_syntax::byte_reader::Reader;
use quire_syntax::object::dict::keys::{
    DECODE_PARMS, DL, FILTER, FIRST, INDEX, LENGTH, N, PREV, SIZE, TYPE, W, XREF, XREF_STM,
};
use quire_syntax::reader::ReaderContext;
use quire_syntax::{Dict, FilterRegistry, IndirectObject, Object, Payload};
use rustc_hash::FxHashSet;

/// An entry as it is stored in a cross-reference section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionEntry {
    Free { generation: u16 },
    Offset { generation: u16, offset: usize },
    Compressed { stream: u32, index: u32 },
}

#[derive(Debug)]
pub(crate) struct Section {
    entries: Vec<(u32, SectionEntry)>,
    trailer: Dict,
    format: XRefFormat,
    /// The object numbers of the cross-reference streams of this section.
    streams: Vec<u32>,
}

/// The result of reading all sections of a file.
#[derive(Debug)]
pub(crate) struct XRefData {
    pub(crate) table: RefTable,
    pub(crate) trailer: Dict,
    /// The offset of the newest section, `None` for rebuilt tables.
    pub(crate) start_xref: Option<usize>,
    /// The format of the newest section.
    pub(crate) format: XRefFormat,
    /// The object numbers of all cross-reference streams.
    pub(crate) xref_streams: Vec<u32>,
}

#[derive(Debug)]
enum State {
    ScanningTrailer,
    ScanningXRef(usize),
    Registered,
}

/// Read the cross-reference data of the file.
pub(crate) fn load(data: &[u8], order: UpdateOrder, filters: &FilterRegistry) -> Result<XRefData> {
    let mut state = State::ScanningTrailer;
    let mut sections = Vec::new();
    let mut visited = FxHashSet::default();
    let mut start_xref = 0;

    loop {
        state = match state {
            State::ScanningTrailer => {
                start_xref = find_last_xref_pos(data).ok_or(Error::Structure("missing startxref"))?;

                State::ScanningXRef(start_xref)
            }
            State::ScanningXRef(pos) => {
                if !visited.insert(pos) {
                    warn!("loop in /Prev chain at offset {pos}");

                    State::Registered
                } else {
                    let section = read_section(data, pos, filters)?;
                    let prev = section.trailer.get_int(PREV);
                    sections.push(section);

                    match prev.and_then(|p| usize::try_from(p).ok()) {
                        Some(prev) => State::ScanningXRef(prev),
                        None => State::Registered,
                    }
                }
            }
            State::Registered => break,
        };
    }

    debug!("read {} cross-reference sections", sections.len());

    let format = sections
        .first()
        .map_or(XRefFormat::Table, |section| section.format);
    let xref_streams = sections
        .iter()
        .flat_map(|section| section.streams.iter().copied())
        .collect();
    let (table, trailer) = register(sections, order);

    Ok(XRefData {
        table,
        trailer,
        start_xref: Some(start_xref),
        format,
        xref_streams,
    })
}

// Sections are newest-first. Entries applied later override earlier ones.
pub(crate) fn register(sections: Vec<Section>, order: UpdateOrder) -> (RefTable, Dict) {
    let ordered: Box<dyn Iterator<Item = Section>> = match order {
        UpdateOrder::LatestWins => Box::new(sections.into_iter().rev()),
        UpdateOrder::EarliestWins => Box::new(sections.into_iter()),
    };

    let mut table = RefTable::new();
    let mut trailer = Dict::new();
    let mut size = 0;

    for section in ordered {
        for (num, entry) in section.entries {
            // Object 0 always stays the head of the free list.
            if num == 0 {
                continue;
            }

            let entry = match entry {
                SectionEntry::Free { generation } => Entry::Free {
                    generation,
                    modified: false,
                },
                SectionEntry::Offset { generation, offset } => {
                    Entry::InUse(InUse::at(generation, Location::Offset(offset)))
                }
                SectionEntry::Compressed { stream, index } => {
                    Entry::InUse(InUse::at(0, Location::Compressed { stream, index }))
                }
            };

            table.set(num, entry);
        }

        size = size.max(section.trailer.get_int(SIZE).unwrap_or(0));

        for (key, value) in section.trailer {
            trailer.insert(key, value);
        }
    }

    // Only the entries that are actually present count, a larger /Size is
    // not trusted.
    if size > i64::from(table.len()) {
        debug!("/Size {size} exceeds the highest object number {}", table.len());
    }

    clean_trailer(&mut trailer);

    (table, trailer)
}

/// Remove the entries that only describe a single section.
pub(crate) fn clean_trailer(trailer: &mut Dict) {
    for key in [PREV, XREF_STM, TYPE, W, INDEX, LENGTH, FILTER, DECODE_PARMS, DL, N, FIRST] {
        trailer.remove(key);
    }
}

pub(crate) fn find_last_xref_pos(data: &[u8]) -> Option<usize> {
    let pos = Reader::new(data).rfind(b"startxref")?;
    let mut r = Reader::new_at(data, pos + b"startxref".len());
    r.skip_white_spaces_and_comments();

    usize::try_from(r.read_plain_uint()?).ok()
}

fn read_section(data: &[u8], pos: usize, filters: &FilterRegistry) -> Result<Section> {
    let mut r = Reader::new_at(data, pos);
    // In case the position points to before the keyword or the object header.
    r.skip_white_spaces_and_comments();

    if r.peek_tag(b"xref").is_some() {
        let mut section = read_xref_table(&mut r).ok_or(Error::Structure("invalid xref table"))?;

        // In hybrid files, the entries of the stream take precedence over the
        // ones of the table.
        if let Some(stm) = section.trailer.get_int(XREF_STM) {
            let stm = usize::try_from(stm).map_err(|_| Error::Structure("invalid /XRefStm"))?;

            match read_xref_stream(data, stm, filters) {
                Ok(stream_section) => {
                    section.entries.extend(stream_section.entries);
                    section.streams.extend(stream_section.streams);
                }
                Err(e) => warn!("ignoring broken /XRefStm: {e}"),
            }
        }

        Ok(section)
    } else {
        read_xref_stream(data, r.offset(), filters)
    }
}

fn read_xref_table(r: &mut Reader<'_>) -> Option<Section> {
    r.forward_tag(b"xref")?;

    let mut entries = Vec::new();

    loop {
        r.skip_white_spaces_and_comments();

        if r.peek_tag(b"trailer").is_some() {
            break;
        }

        let start = u32::try_from(r.read_plain_uint()?).ok()?;
        r.skip_white_spaces();
        let count = u32::try_from(r.read_plain_uint()?).ok()?;

        let mut subsection = Vec::new();

        for _ in 0..count {
            subsection.push(read_table_entry(r)?);
        }

        // A common mistake is to start the first subsection at 1, even though
        // it contains the entry for object 0.
        let start = match subsection.first() {
            Some(SectionEntry::Free { generation: 65535 }) if start == 1 => {
                warn!("xref subsection starts at 1 but contains object 0");

                0
            }
            _ => start,
        };

        for (i, entry) in subsection.into_iter().enumerate() {
            entries.push((start.checked_add(u32::try_from(i).ok()?)?, entry));
        }
    }

    r.forward_tag(b"trailer")?;
    r.skip_white_spaces_and_comments();
    let trailer = r.read_without_context::<Dict>()?;

    Some(Section {
        entries,
        trailer,
        format: XRefFormat::Table,
        streams: Vec::new(),
    })
}

// Entries should be exactly 20 bytes long, but some writers use other
// separators, so they are read token by token.
fn read_table_entry(r: &mut Reader<'_>) -> Option<SectionEntry> {
    r.skip_white_spaces();
    let offset = r.read_plain_uint()?;
    r.skip_white_spaces();
    let generation = u16::try_from(r.read_plain_uint()?).ok()?;
    r.skip_white_spaces();

    match r.read_byte()? {
        b'n' => Some(SectionEntry::Offset {
            generation,
            offset: usize::try_from(offset).ok()?,
        }),
        b'f' => Some(SectionEntry::Free { generation }),
        _ => None,
    }
}

fn read_xref_stream(data: &[u8], pos: usize, filters: &FilterRegistry) -> Result<Section> {
    let obj = IndirectObject::parse_at(data, pos, &ReaderContext::new()).map_err(|e| {
        warn!("failed to read xref stream: {e}");

        Error::Structure("invalid xref stream")
    })?;
    let Object::Stream(stream) = obj.object else {
        return Err(Error::Structure("xref section is not a stream"));
    };

    if !stream.dict().is_type(XREF) {
        warn!("xref stream at offset {pos} has no /Type /XRef");
    }

    let dict = stream.dict();
    let widths = dict
        .get_array(W)
        .and_then(|a| {
            a.iter()
                .map(|o| o.as_i64().and_then(|n| usize::try_from(n).ok()))
                .collect::<Option<Vec<_>>>()
        })
        .and_then(|w| <[usize; 3]>::try_from(w).ok())
        .ok_or(Error::Structure("invalid /W in xref stream"))?;

    if widths[1] > 8 || widths[2] > 8 || widths[0] > 8 {
        return Err(Error::Structure("xref stream field is too wide"));
    }

    if widths.iter().sum::<usize>() == 0 {
        return Err(Error::Structure("xref stream entries are empty"));
    }

    let size = dict.get_int(SIZE).ok_or(Error::Structure("xref stream has no /Size"))?;
    let index = match dict.get_array(INDEX) {
        Some(a) => a
            .iter()
            .map(|o| o.as_i64().and_then(|n| u32::try_from(n).ok()))
            .collect::<Option<Vec<_>>>()
            .ok_or(Error::Structure("invalid /Index in xref stream"))?,
        None => vec![0, u32::try_from(size).map_err(|_| Error::Structure("invalid /Size"))?],
    };

    let encoded = match stream.payload() {
        Payload::Encoded(bytes) => bytes.as_slice(),
        _ => return Err(Error::Structure("xref stream has no data")),
    };
    let decoded = filters.decode_stream(dict, encoded)?;
    let mut r = Reader::new(&decoded);

    let mut entries = Vec::new();

    for pair in index.chunks(2) {
        let [start, count] = *pair else {
            warn!("odd number of elements in /Index");
            break;
        };

        for i in 0..count {
            let Some(entry) = read_stream_entry(&mut r, widths) else {
                warn!("xref stream is shorter than its /Index claims");
                break;
            };

            if let Some(entry) = entry {
                entries.push((start.saturating_add(i), entry));
            }
        }
    }

    Ok(Section {
        entries,
        trailer: stream.dict().clone(),
        format: XRefFormat::Stream,
        streams: vec![obj.id.obj_number],
    })
}

// Returns `Some(None)` for entries of unknown type, which are skipped.
fn read_stream_entry(r: &mut Reader<'_>, [w1, w2, w3]: [usize; 3]) -> Option<Option<SectionEntry>> {
    let ty = if w1 == 0 { 1 } else { read_be(r.read_bytes(w1)?) };
    let f2 = read_be(r.read_bytes(w2)?);
    let f3 = read_be(r.read_bytes(w3)?);

    let entry = match ty {
        0 => Some(SectionEntry::Free {
            generation: u16::try_from(f3).unwrap_or(u16::MAX),
        }),
        1 => u16::try_from(f3)
            .ok()
            .zip(usize::try_from(f2).ok())
            .map(|(generation, offset)| SectionEntry::Offset { generation, offset }),
        2 => u32::try_from(f2)
            .ok()
            .zip(u32::try_from(f3).ok())
            .map(|(stream, index)| SectionEntry::Compressed { stream, index }),
        other => {
            debug!("skipping xref stream entry of type {other}");

            None
        }
    };

    Some(entry)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, b| acc << 8 | u64::from(*b))
}
