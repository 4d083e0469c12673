//! Writing objects and cross-reference sections to an output.

use crate::error::{Error, Result};
use crate::settings::{WriteSettings, XRefFormat};
use crate::version::PdfVersion;
use log::{debug, trace};
use quire_syntax::object::dict::keys::{
    FILTER, FLATE_DECODE, INDEX, LENGTH, PREV, SIZE, TYPE, W, XREF,
};
use quire_syntax::write::{TokenOptions, WriteDirect};
use quire_syntax::{Array, Dict, FilterRegistry, Name, ObjRef, Object, Payload, Stream};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;

// Holes of complete sections up to this many numbers are written as free
// entries.
const MAX_FILLED_GAP: u32 = 64;

/// How a document is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Write a complete new file.
    #[default]
    Full,
    /// Append an update to the original bytes, which are copied untouched.
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Record {
    InUse { generation: u16, offset: u64 },
    Free { generation: u16 },
}

/// How the cross-reference section of a writer is finished.
#[derive(Debug, Clone, Copy)]
pub struct Finalize {
    /// `Auto` is written as a table.
    pub format: XRefFormat,
    /// The offset of the previous section, for incremental updates.
    pub prev: Option<usize>,
    /// The number of slots of the reference table.
    pub size: u32,
    /// Whether every number below `size` gets an entry, as opposed to only the
    /// recorded ones.
    pub complete: bool,
}

/// Serializes indirect objects and keeps track of their offsets.
///
/// After [`Writer::finalize`], the writer is sealed and every further call
/// fails with [`Error::AlreadyClosed`].
pub struct Writer<W: Write> {
    out: W,
    pos: u64,
    records: BTreeMap<u32, Record>,
    settings: WriteSettings,
    filters: FilterRegistry,
    sealed: bool,
}

impl<W: Write> Writer<W> {
    /// Create a new writer. Nothing is written yet.
    pub fn new(out: W, settings: WriteSettings, filters: FilterRegistry) -> Self {
        Self {
            out,
            pos: 0,
            records: BTreeMap::new(),
            settings,
            filters,
            sealed: false,
        }
    }

    /// The number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Whether the writer was finalized.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// The settings the writer uses.
    pub fn settings(&self) -> &WriteSettings {
        &self.settings
    }

    /// Whether an entry was already recorded for this object number.
    pub fn is_recorded(&self, num: u32) -> bool {
        self.records.contains_key(&num)
    }

    /// Write the file header, including a comment with binary characters.
    pub fn write_header(&mut self, version: PdfVersion) -> Result<()> {
        self.write_raw(format!("%PDF-{version}\n").as_bytes())?;
        self.write_raw(b"%\xE2\xE3\xCF\xD3\n")
    }

    /// Write bytes as they are, for example the original file of an
    /// incremental update.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_open()?;
        self.out.write_all(bytes)?;
        self.pos += bytes.len() as u64;

        Ok(())
    }

    /// Write an indirect object and record its offset.
    ///
    /// `source` is the data pending stream payloads are read from.
    pub fn write_object(&mut self, r: ObjRef, object: &Object, source: &[u8]) -> Result<u64> {
        self.check_open()?;

        let opts = TokenOptions {
            real_precision: self.settings.real_precision,
        };
        let offset = self.pos;

        let mut buf = format!("{} {} obj\n", r.obj_number, r.gen_number).into_bytes();

        match object {
            Object::Stream(stream) => self.write_stream(&mut buf, stream, source, opts)?,
            other => other.write_direct(&mut buf, opts),
        }

        buf.extend_from_slice(b"\nendobj\n");
        self.write_raw(&buf)?;

        trace!("wrote object {r} at offset {offset}");

        self.records.insert(
            r.obj_number,
            Record::InUse {
                generation: r.gen_number,
                offset,
            },
        );

        Ok(offset)
    }

    /// Record an object that is already part of the output, for example an
    /// unchanged object of the original file in an incremental update.
    pub fn record_in_use(&mut self, r: ObjRef, offset: u64) -> Result<()> {
        self.check_open()?;
        self.records.insert(
            r.obj_number,
            Record::InUse {
                generation: r.gen_number,
                offset,
            },
        );

        Ok(())
    }

    /// Record that an object number is free. `generation` is the generation
    /// of the next object with this number.
    pub fn write_free(&mut self, num: u32, generation: u16) -> Result<()> {
        self.check_open()?;
        self.records.insert(num, Record::Free { generation });

        Ok(())
    }

    fn write_stream(
        &self,
        buf: &mut Vec<u8>,
        stream: &Stream,
        source: &[u8],
        opts: TokenOptions,
    ) -> Result<()> {
        let mut dict = stream.dict().clone();

        let data: Cow<'_, [u8]> = match stream.payload() {
            Payload::Decoded(data) => {
                if dict.contains_key(FILTER) {
                    Cow::Owned(self.filters.encode_stream(&dict, data)?)
                } else if self.settings.compress && !data.is_empty() {
                    let flate = Name::new(FLATE_DECODE);
                    let encoded = self.filters.encode(&flate, data, None)?;
                    dict.insert(FILTER, flate);

                    Cow::Owned(encoded)
                } else {
                    Cow::Borrowed(data)
                }
            }
            _ => stream
                .encoded_data(source)
                .ok_or(Error::Structure("stream data lies outside of the source"))?,
        };

        dict.insert(LENGTH, data.len() as i64);
        dict.write_direct(buf, opts);
        buf.extend_from_slice(b"\nstream\n");
        buf.extend_from_slice(&data);
        buf.extend_from_slice(b"\nendstream");

        Ok(())
    }

    /// Write the cross-reference section, the trailer and the end of the file,
    /// then seal the writer.
    pub fn finalize(&mut self, trailer: &Dict, finalize: Finalize) -> Result<()> {
        self.check_open()?;

        if self.pos == 0 {
            return Err(Error::Structure("nothing was written before finalizing"));
        }

        if !self.records.contains_key(&0) {
            self.records.insert(0, Record::Free { generation: 65535 });
        }

        let mut trailer = trailer.clone();
        if let Some(prev) = finalize.prev {
            trailer.insert(PREV, prev as i64);
        }

        let start_xref = match finalize.format {
            XRefFormat::Stream => self.write_xref_stream(trailer, finalize)?,
            XRefFormat::Table | XRefFormat::Auto => self.write_xref_table(trailer, finalize)?,
        };

        self.write_raw(format!("startxref\n{start_xref}\n%%EOF\n").as_bytes())?;
        self.out.flush()?;
        self.sealed = true;

        debug!("finalized file with {} entries", self.records.len());

        Ok(())
    }

    /// Consume the writer and return the output.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn check_open(&self) -> Result<()> {
        if self.sealed {
            Err(Error::AlreadyClosed)
        } else {
            Ok(())
        }
    }

    // Fill up short holes for complete sections and link the free entries.
    // Longer holes are left to separate subsections.
    fn entries(&self, size: u32, complete: bool) -> Vec<(u32, XRefEntry)> {
        let mut records = self.records.clone();

        if complete {
            let mut bounds = self.records.keys().copied().collect::<Vec<_>>();
            bounds.push(size);

            for pair in bounds.windows(2) {
                let (from, to) = (pair[0].saturating_add(1), pair[1]);

                if to.saturating_sub(from) <= MAX_FILLED_GAP {
                    for num in from..to {
                        records.insert(num, Record::Free { generation: 0 });
                    }
                }
            }
        }

        let free = records
            .iter()
            .filter(|(_, r)| matches!(r, Record::Free { .. }))
            .map(|(num, _)| *num)
            .collect::<Vec<_>>();

        let next_free = |num: u32| {
            let pos = free.partition_point(|n| *n <= num);
            free.get(pos).copied().unwrap_or(0)
        };

        records
            .into_iter()
            .map(|(num, record)| {
                let entry = match record {
                    Record::InUse { generation, offset } => XRefEntry::InUse { generation, offset },
                    Record::Free { generation } => XRefEntry::Free {
                        next: next_free(num),
                        generation,
                    },
                };

                (num, entry)
            })
            .collect()
    }

    fn write_xref_table(&mut self, mut trailer: Dict, finalize: Finalize) -> Result<u64> {
        let entries = self.entries(finalize.size, finalize.complete);
        let size = entries
            .last()
            .map_or(0, |(num, _)| num.saturating_add(1))
            .max(finalize.size);
        let start = self.pos;

        let mut buf = b"xref\n".to_vec();

        for subsection in subsections(&entries) {
            let first = subsection[0].0;
            buf.extend_from_slice(format!("{first} {}\n", subsection.len()).as_bytes());

            for (_, entry) in subsection {
                let line = match entry {
                    XRefEntry::InUse { generation, offset } => {
                        format!("{offset:010} {generation:05} n\r\n")
                    }
                    XRefEntry::Free { next, generation } => {
                        format!("{next:010} {generation:05} f\r\n")
                    }
                };
                buf.extend_from_slice(line.as_bytes());
            }
        }

        trailer.insert(SIZE, size);

        buf.extend_from_slice(b"trailer\n");
        trailer.write_direct(&mut buf, TokenOptions::default());
        buf.push(b'\n');
        self.write_raw(&buf)?;

        Ok(start)
    }

    fn write_xref_stream(&mut self, mut dict: Dict, finalize: Finalize) -> Result<u64> {
        // The stream gets the next free number and an entry of its own.
        let own_num = self
            .records
            .keys()
            .next_back()
            .map_or(Some(0), |n| n.checked_add(1))
            .map(|n| n.max(finalize.size))
            .filter(|n| *n < u32::MAX)
            .ok_or(Error::Structure("no object number left for the xref stream"))?;
        let start = self.pos;
        self.records.insert(
            own_num,
            Record::InUse {
                generation: 0,
                offset: start,
            },
        );

        let entries = self.entries(own_num + 1, finalize.complete);

        let largest = entries
            .iter()
            .map(|(_, e)| match e {
                XRefEntry::InUse { offset, .. } => *offset,
                XRefEntry::Free { next, .. } => u64::from(*next),
            })
            .max()
            .unwrap_or(0);
        let width = bytes_needed(largest);

        let mut data = Vec::with_capacity(entries.len() * (3 + width));
        let mut index = Array::new();

        for subsection in subsections(&entries) {
            index.push(subsection[0].0);
            index.push(subsection.len() as i64);

            for (_, entry) in subsection {
                let (ty, f2, f3) = match *entry {
                    XRefEntry::InUse { generation, offset } => (1_u8, offset, generation),
                    XRefEntry::Free { next, generation } => (0_u8, u64::from(next), generation),
                };

                data.push(ty);
                data.extend_from_slice(&f2.to_be_bytes()[8 - width..]);
                data.extend_from_slice(&f3.to_be_bytes());
            }
        }

        dict.insert(TYPE, Name::new(XREF));
        dict.insert(SIZE, own_num + 1);
        dict.insert(
            W,
            [1, width as i64, 2].into_iter().map(Object::from).collect::<Array>(),
        );
        dict.insert(INDEX, index);

        let data = if self.settings.compress && self.filters.contains(FLATE_DECODE) {
            let flate = Name::new(FLATE_DECODE);
            let encoded = self.filters.encode(&flate, &data, None)?;
            dict.insert(FILTER, flate);

            encoded
        } else {
            data
        };

        let stream = Stream::from_encoded(dict, data);
        self.write_object(ObjRef::new(own_num, 0), &Object::Stream(stream), &[])?;

        Ok(start)
    }
}

impl<W: Write> std::fmt::Debug for Writer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("pos", &self.pos)
            .field("records", &self.records.len())
            .field("sealed", &self.sealed)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
enum XRefEntry {
    InUse { generation: u16, offset: u64 },
    Free { next: u32, generation: u16 },
}

// Split sorted entries into runs of consecutive object numbers.
fn subsections(entries: &[(u32, XRefEntry)]) -> impl Iterator<Item = &[(u32, XRefEntry)]> {
    entries.chunk_by(|a, b| a.0.checked_add(1) == Some(b.0))
}

fn bytes_needed(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}
