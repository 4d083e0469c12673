//! The document graph.

use crate::data::PdfData;
use crate::error::{Error, Result};
use crate::object_stream::ObjectStream;
use crate::repair::repair;
use crate::settings::{ReadSettings, Tolerance, Warning, WriteSettings, XRefFormat};
use crate::table::{Entry, InUse, Location, MAX_OBJECT_NUMBER, RefTable};
use crate::version::PdfVersion;
use crate::writer::{Finalize, WriteMode, Writer};
use crate::xref::{self, XRefData};
use log::{debug, trace, warn};
use quire_syntax::object::dict::keys::{DECODE_PARMS, FILTER, PREV, ROOT, SIZE, VERSION};
use quire_syntax::reader::ReaderContext;
use quire_syntax::{
    Dict, IndirectObject, ObjRef, Object, ParseErrorKind, Payload, Resolve, Stream,
};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::io::Write;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NULL: Object = Object::Null;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a document for the lifetime of the process.
///
/// References are plain numbers, so they can't tell which document they
/// belong to. The id can be used to keep references of different documents
/// apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

// Object numbers of object streams that are currently being resolved.
type Chain = SmallVec<[u32; 4]>;

enum WriteState {
    Idle,
    Writing(Box<Writer<Box<dyn Write + Send>>>, WriteMode),
    Finished,
}

/// A graph of indirect objects, loaded lazily from a source file or built
/// from scratch.
///
/// Objects are parsed the first time they are resolved and stay resident
/// until they are released or flushed.
pub struct Document {
    id: GraphId,
    table: RefTable,
    trailer: Dict,
    source: Option<PdfData>,
    settings: ReadSettings,
    version: PdfVersion,
    start_xref: Option<usize>,
    source_format: XRefFormat,
    // Object streams and cross-reference streams of the source.
    containers: FxHashSet<u32>,
    object_streams: FxHashMap<u32, Arc<ObjectStream>>,
    write_settings: WriteSettings,
    write: WriteState,
    repaired: bool,
    closed: bool,
}

impl Document {
    /// Create an empty document without a source.
    pub fn new() -> Self {
        Self::with_settings(ReadSettings::default())
    }

    /// Create an empty document with custom settings.
    pub fn with_settings(settings: ReadSettings) -> Self {
        Self {
            id: GraphId::next(),
            table: RefTable::new(),
            trailer: Dict::new(),
            source: None,
            settings,
            version: PdfVersion::default(),
            start_xref: None,
            source_format: XRefFormat::Table,
            containers: FxHashSet::default(),
            object_streams: FxHashMap::default(),
            write_settings: WriteSettings::default(),
            write: WriteState::Idle,
            repaired: false,
            closed: false,
        }
    }

    /// Load a document with the default settings.
    pub fn load(data: impl Into<PdfData>) -> Result<Self> {
        Self::load_with(data, ReadSettings::default())
    }

    /// Load a document, reading only its cross-reference data. Objects are
    /// parsed when they are first resolved.
    pub fn load_with(data: impl Into<PdfData>, settings: ReadSettings) -> Result<Self> {
        let data = data.into();
        let bytes = data.as_ref();

        let version = PdfVersion::from_header(bytes).unwrap_or_else(|| {
            warn!("missing PDF header, assuming version {}", PdfVersion::default());

            PdfVersion::default()
        });

        let mut repaired = false;

        let xref = match xref::load(bytes, settings.update_order, &settings.filters) {
            Ok(xref) if xref.trailer.contains_key(ROOT) => xref,
            result => {
                match &result {
                    Ok(_) => warn!("trailer has no /Root"),
                    Err(e) => warn!("failed to read cross-reference data: {e}"),
                }

                if !settings.repair {
                    return result.and(Err(Error::Structure("trailer has no /Root")));
                }

                repaired = true;
                (settings.warning_sink)(Warning::XRefRepaired);

                repair(bytes, &settings.filters)
                    .ok_or(Error::Structure("failed to rebuild the cross-reference table"))?
            }
        };

        let XRefData {
            table,
            trailer,
            start_xref,
            format,
            xref_streams,
        } = xref;

        let mut containers = xref_streams.into_iter().collect::<FxHashSet<_>>();
        containers.extend(table.numbers().into_iter().filter_map(|num| match table.get(num) {
            Some(Entry::InUse(InUse {
                location: Location::Compressed { stream, .. },
                ..
            })) => Some(*stream),
            _ => None,
        }));

        debug!("loaded document with {} entries", table.len());

        let mut doc = Self {
            table,
            trailer,
            source: Some(data),
            version,
            start_xref,
            source_format: format,
            containers,
            repaired,
            ..Self::with_settings(settings)
        };

        match doc.get_root().map(|root| root.get_name(VERSION).cloned()) {
            Ok(Some(name)) => match name.as_str().parse::<PdfVersion>() {
                Ok(catalog_version) => doc.version = catalog_version,
                Err(()) => warn!("invalid /Version in catalog: {name:?}"),
            },
            Ok(None) => {}
            Err(e) => warn!("failed to read the catalog: {e}"),
        }

        Ok(doc)
    }

    /// The identity of the document, used to tell graphs apart.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// The version from the file header, or from the catalog if it has a
    /// `/Version` entry.
    pub fn version(&self) -> PdfVersion {
        self.version
    }

    /// Set the version that is written to the header.
    pub fn set_version(&mut self, version: PdfVersion) {
        self.version = version;
    }

    /// The settings the document was loaded with.
    pub fn settings(&self) -> &ReadSettings {
        &self.settings
    }

    /// Whether the cross-reference data was rebuilt by scanning the file.
    pub fn is_repaired(&self) -> bool {
        self.repaired
    }

    /// The table of indirect objects.
    pub fn table(&self) -> &RefTable {
        &self.table
    }

    /// The number of slots of the reference table.
    pub fn len(&self) -> u32 {
        self.table.len()
    }

    /// Whether the document has no objects besides object 0.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// References to all objects that are in use.
    pub fn live_refs(&self) -> Vec<ObjRef> {
        self.table.live_refs()
    }

    /// The trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// The trailer dictionary, for modification.
    pub fn trailer_mut(&mut self) -> &mut Dict {
        &mut self.trailer
    }

    /// The reference to the catalog, if the trailer has one.
    pub fn root_ref(&self) -> Option<ObjRef> {
        self.trailer.get_ref(ROOT)
    }

    /// Make `r` the catalog of the document.
    pub fn set_root(&mut self, r: ObjRef) {
        self.trailer.insert(ROOT, r);
    }

    /// Resolve the catalog.
    pub fn get_root(&mut self) -> Result<&Dict> {
        let root = self.root_ref().ok_or(Error::Structure("trailer has no /Root"))?;

        self.resolve(root)?
            .as_dict()
            .ok_or(Error::Structure("catalog is not a dictionary"))
    }

    /// Resolve a reference, parsing the object if it isn't resident yet.
    ///
    /// Under [`Tolerance::Tolerant`], unreadable, broken and freed references
    /// resolve to `null`.
    pub fn resolve(&mut self, r: ObjRef) -> Result<&Object> {
        self.check_open()?;

        if let Err(e) = self.load_object(r, &mut Chain::new()) {
            self.recover(r, e)?;

            return Ok(&NULL);
        }

        Ok(self.table.in_use(r)?.cached.as_ref().unwrap_or(&NULL))
    }

    /// Return an owned copy of the referenced object.
    pub fn get(&mut self, r: ObjRef) -> Result<Object> {
        self.resolve(r).cloned()
    }

    /// Return the object for modification and mark it as modified.
    ///
    /// Errors are never replaced by `null` here, since the modification would
    /// otherwise be lost.
    pub fn get_mut(&mut self, r: ObjRef) -> Result<&mut Object> {
        self.check_open()?;
        self.load_object(r, &mut Chain::new())?;

        let entry = self.table.in_use_mut(r)?;
        entry.modified = true;

        Ok(entry.cached.get_or_insert(Object::Null))
    }

    /// Follow the value if it is a reference.
    pub fn resolve_value(&mut self, value: &Object) -> Result<Object> {
        match value {
            Object::Ref(r) => self.get(*r),
            other => Ok(other.clone()),
        }
    }

    /// Store a value as a new indirect object.
    pub fn register(&mut self, value: impl Into<Object>) -> Result<ObjRef> {
        self.check_open()?;

        let value = value.into();

        if value.is_direct_only() {
            return Err(Error::DirectOnlyViolation);
        }

        self.table.allocate(value)
    }

    /// Like [`Document::register`], except that direct-only values are kept
    /// as they are instead of failing. Returns a reference to the new object
    /// or the unchanged value.
    pub fn make_indirect(&mut self, value: impl Into<Object>) -> Result<Object> {
        self.check_open()?;

        let value = value.into();

        if value.is_direct_only() {
            warn!("keeping direct-only {} inline", value.type_name());
            (self.settings.warning_sink)(Warning::DirectOnlyKept);

            return Ok(value);
        }

        self.register(value).map(Object::Ref)
    }

    /// Replace the value of an object.
    ///
    /// The reference must either point to an object in use or to a free
    /// entry with the same generation, which is then taken into use.
    pub fn put(&mut self, r: ObjRef, value: impl Into<Object>) -> Result<()> {
        self.check_open()?;

        let value = value.into();

        if value.is_direct_only() {
            return Err(Error::DirectOnlyViolation);
        }

        let reuse = match self.table.get(r.obj_number) {
            Some(Entry::InUse(entry)) if entry.generation == r.gen_number => {
                if let Location::Flushed(_) = entry.location {
                    return Err(Error::Flushed(r));
                }

                false
            }
            Some(Entry::Free { generation, .. }) if *generation == r.gen_number => true,
            None if r.gen_number == 0 => true,
            _ => return Err(Error::FreedReference(r)),
        };

        if r.obj_number == 0 {
            return Err(Error::FreedReference(r));
        }

        if r.obj_number > MAX_OBJECT_NUMBER {
            return Err(Error::Structure("object number out of range"));
        }

        if reuse {
            self.set_memory(r, value);
        } else {
            self.fill(r, value)?;
        }

        self.object_streams.remove(&r.obj_number);

        Ok(())
    }

    fn set_memory(&mut self, r: ObjRef, value: Object) {
        self.table.set(
            r.obj_number,
            Entry::InUse(InUse {
                generation: r.gen_number,
                location: Location::Memory,
                cached: Some(value),
                modified: true,
            }),
        );
    }

    /// Reserve a new object number whose value is filled in later.
    pub(crate) fn reserve(&mut self) -> Result<ObjRef> {
        self.table.allocate(Object::Null)
    }

    pub(crate) fn fill(&mut self, r: ObjRef, value: Object) -> Result<()> {
        let entry = self.table.in_use_mut(r)?;
        entry.cached = Some(value);
        entry.modified = true;

        Ok(())
    }

    /// Free the object. References to it become stale, and the object number
    /// may be reused with the next generation.
    pub fn mark_free(&mut self, r: ObjRef) -> Result<()> {
        self.check_open()?;
        self.table.free(r)?;
        self.object_streams.remove(&r.obj_number);

        debug!("freed object {r}");

        Ok(())
    }

    /// Drop the resident value of an unmodified object that can be read again
    /// from the source. Returns whether the value was dropped.
    pub fn release(&mut self, r: ObjRef) -> Result<bool> {
        self.check_open()?;

        let entry = self.table.in_use_mut(r)?;

        if entry.is_rereadable() && entry.cached.is_some() {
            entry.cached = None;
            self.object_streams.remove(&r.obj_number);
            trace!("released object {r}");

            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Read and decode the data of the referenced stream.
    pub fn stream_data(&mut self, r: ObjRef) -> Result<Vec<u8>> {
        let stream = match self.resolve(r)? {
            Object::Stream(stream) => stream.clone(),
            _ => return Err(Error::Structure("object is not a stream")),
        };

        self.decode_stream(&stream).inspect_err(|e| {
            warn!("failed to decode stream {r}: {e}");
            (self.settings.warning_sink)(Warning::StreamDecodeFailure(r));
        })
    }

    /// Decode the data of a stream with the filters of its dictionary.
    pub fn decode_stream(&mut self, stream: &Stream) -> Result<Vec<u8>> {
        if let Payload::Decoded(data) = stream.payload() {
            return Ok(data.clone());
        }

        let dict = self.direct_filter_entries(stream.dict())?;
        let data = self.raw_stream_data(stream)?;

        Ok(self.settings.filters.decode_stream(&dict, &data)?)
    }

    /// Return the data of a stream as it is stored, without decoding it.
    pub fn raw_stream_data(&self, stream: &Stream) -> Result<Vec<u8>> {
        self.check_open()?;

        match stream.payload() {
            Payload::Decoded(data) => Ok(data.clone()),
            _ => stream
                .encoded_data(self.source_bytes())
                .map(|data| data.into_owned())
                .ok_or(Error::Structure("stream data lies outside of the source")),
        }
    }

    // Filter chains need direct objects, so referenced entries are resolved
    // on a copy of the dictionary.
    fn direct_filter_entries(&mut self, dict: &Dict) -> Result<Dict> {
        let mut dict = dict.clone();

        for key in [FILTER, DECODE_PARMS] {
            dict.inline(key, self)?;

            if let Some(Object::Array(items)) = dict.get_mut(key) {
                for item in items.iter_mut() {
                    if let Object::Ref(r) = item {
                        *item = self.get(*r)?;
                    }
                }
            }
        }

        Ok(dict)
    }

    pub(crate) fn source_bytes(&self) -> &[u8] {
        self.source.as_ref().map_or(&[], |data| data.as_ref())
    }

    /// The settings used by the next write.
    pub fn write_settings(&self) -> &WriteSettings {
        &self.write_settings
    }

    /// Replace the settings used by the next write.
    pub fn set_write_settings(&mut self, settings: WriteSettings) {
        self.write_settings = settings;
    }

    /// Drop all resident state. Every later call fails with
    /// [`Error::UseAfterClose`].
    pub fn close(&mut self) {
        if matches!(self.write, WriteState::Writing(..)) {
            warn!("closing document with an unfinished write");
        }

        self.table.clear();
        self.trailer = Dict::new();
        self.source = None;
        self.containers.clear();
        self.object_streams.clear();
        self.write = WriteState::Idle;
        self.closed = true;
    }

    /// Whether the document was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::UseAfterClose)
        } else {
            Ok(())
        }
    }

    // Turn recoverable errors into `null` under the tolerant policy.
    fn recover(&self, r: ObjRef, err: Error) -> Result<()> {
        if self.settings.tolerance == Tolerance::Strict || !err.is_recoverable() {
            return Err(err);
        }

        warn!("resolving {r} to null: {err}");
        (self.settings.warning_sink)(Warning::UnreadableObject(r));

        Ok(())
    }

    // Make sure the value of the object is resident.
    fn load_object(&mut self, r: ObjRef, chain: &mut Chain) -> Result<()> {
        let entry = self.table.in_use(r)?;

        if entry.cached.is_some() {
            return Ok(());
        }

        let location = entry.location;

        let result = match location {
            Location::Offset(offset) => self.read_at(r, offset),
            Location::Compressed { stream, index } => self.read_compressed(r, stream, index, chain),
            Location::Flushed(_) => return Err(Error::Flushed(r)),
            Location::Memory | Location::Broken => Err(Error::BrokenReference(r)),
        };

        let object = match result {
            Ok(object) => object,
            Err(Error::BrokenReference(_) | Error::Parse(..)) if self.can_repair() => {
                self.repair_table();

                return self.load_object(r, chain);
            }
            Err(e @ Error::BrokenReference(_)) => {
                // Don't look at the same broken location again.
                if !self.can_repair()
                    && let Ok(entry) = self.table.in_use_mut(r)
                    && !entry.modified
                {
                    entry.location = Location::Broken;
                }

                return Err(e);
            }
            Err(e) => return Err(e),
        };

        trace!("loaded object {r}");

        self.table.in_use_mut(r)?.cached = Some(object);

        Ok(())
    }

    fn can_repair(&self) -> bool {
        self.settings.repair && !self.repaired && self.source.is_some()
    }

    // Rebuild the table by scanning the source, keeping every entry that
    // holds a value.
    fn repair_table(&mut self) {
        self.repaired = true;
        // The offsets of the source can't be built upon anymore.
        self.start_xref = None;
        (self.settings.warning_sink)(Warning::XRefRepaired);

        let Some(rebuilt) = repair(self.source_bytes(), &self.settings.filters) else {
            return;
        };

        for num in rebuilt.table.numbers() {
            let keep = match self.table.get(num) {
                Some(Entry::InUse(e)) => {
                    e.cached.is_some() || e.modified || matches!(e.location, Location::Flushed(_))
                }
                Some(Entry::Free { modified, .. }) => *modified,
                None => false,
            };

            if !keep && let Some(entry) = rebuilt.table.get(num) {
                self.table.set(num, entry.clone());
            }
        }

        if !self.trailer.contains_key(ROOT)
            && let Some(root) = rebuilt.trailer.get(ROOT)
        {
            self.trailer.insert(ROOT, root.clone());
        }

        self.containers.extend(rebuilt.xref_streams);
        self.object_streams.clear();
    }

    fn read_at(&self, r: ObjRef, offset: usize) -> Result<Object> {
        let data = self.source_bytes();
        let hook = |length: ObjRef| self.read_length(length);
        let ctx = ReaderContext::new()
            .with_length_hook(&hook)
            .with_lazy_streams(self.settings.lazy_streams);

        let obj = IndirectObject::parse_at(data, offset, &ctx).map_err(|e| match e.kind {
            ParseErrorKind::InvalidObject => Error::Parse(r, e),
            ParseErrorKind::InvalidHeader | ParseErrorKind::UnexpectedEnd => {
                Error::BrokenReference(r)
            }
        })?;

        if ObjRef::from(obj.id) != r {
            warn!("expected object {r} at offset {offset}, found {}", ObjRef::from(obj.id));

            return Err(Error::BrokenReference(r));
        }

        Ok(obj.object)
    }

    // Read an indirect `/Length` without touching the cache.
    fn read_length(&self, r: ObjRef) -> Option<usize> {
        let entry = self.table.in_use(r).ok()?;

        let length = match (&entry.cached, entry.location) {
            (Some(object), _) => object.as_i64(),
            (None, Location::Offset(offset)) => {
                IndirectObject::parse_at(self.source_bytes(), offset, &ReaderContext::new())
                    .ok()
                    .filter(|obj| ObjRef::from(obj.id) == r)?
                    .object
                    .as_i64()
            }
            (None, Location::Compressed { stream, index }) => self
                .object_streams
                .get(&stream)?
                .get(index, r.obj_number)?
                .as_i64(),
            _ => None,
        };

        usize::try_from(length?).ok()
    }

    fn read_compressed(
        &mut self,
        r: ObjRef,
        stream: u32,
        index: u32,
        chain: &mut Chain,
    ) -> Result<Object> {
        if stream == r.obj_number || chain.contains(&stream) {
            warn!("object stream {stream} contains itself");

            return Err(Error::BrokenReference(r));
        }

        chain.push(r.obj_number);
        let objects = self.object_stream(stream, chain);
        chain.pop();

        let objects = objects.map_err(|e| {
            warn!("failed to read object stream {stream}: {e}");

            Error::BrokenReference(r)
        })?;

        objects.get(index, r.obj_number).ok_or(Error::BrokenReference(r))
    }

    fn object_stream(&mut self, num: u32, chain: &mut Chain) -> Result<Arc<ObjectStream>> {
        if let Some(objects) = self.object_streams.get(&num) {
            return Ok(objects.clone());
        }

        let container = ObjRef::new(num, self.table.get(num).map_or(0, Entry::generation));
        self.load_object(container, chain)?;

        let stream = match &self.table.in_use(container)?.cached {
            Some(Object::Stream(stream)) => stream.clone(),
            _ => return Err(Error::Structure("object stream is not a stream")),
        };

        let data = self.decode_stream(&stream)?;
        let objects = Arc::new(
            ObjectStream::new(stream.dict(), data)
                .ok_or(Error::Structure("invalid object stream header"))?,
        );

        self.object_streams.insert(num, objects.clone());

        Ok(objects)
    }

    /// Start writing the document to `out`. Objects can then be written one
    /// by one with [`Document::flush`], the rest is written by
    /// [`Document::finish`].
    pub fn begin_write(&mut self, out: impl Write + Send + 'static, mode: WriteMode) -> Result<()> {
        self.check_open()?;

        match self.write {
            WriteState::Idle => {}
            WriteState::Writing(..) => {
                return Err(Error::Structure("a write is already in progress"));
            }
            WriteState::Finished => return Err(Error::AlreadyClosed),
        }

        let out: Box<dyn Write + Send> = Box::new(out);
        let mut writer = Writer::new(out, self.write_settings, self.settings.filters.clone());
        self.start(&mut writer, mode)?;
        self.write = WriteState::Writing(Box::new(writer), mode);

        Ok(())
    }

    /// Write the object and release it. Flushing an object twice is a no-op.
    pub fn flush(&mut self, r: ObjRef) -> Result<()> {
        self.check_open()?;

        let (mut writer, mode) = match mem::replace(&mut self.write, WriteState::Idle) {
            WriteState::Writing(writer, mode) => (writer, mode),
            WriteState::Finished => {
                self.write = WriteState::Finished;

                return Err(Error::AlreadyClosed);
            }
            WriteState::Idle => return Err(Error::Structure("no write in progress")),
        };

        let result = self.write_entry(&mut *writer, mode, r, true);
        self.write = WriteState::Writing(writer, mode);

        result
    }

    /// Write all remaining objects and the cross-reference section.
    pub fn finish(&mut self) -> Result<()> {
        self.check_open()?;

        let (mut writer, mode) = match mem::replace(&mut self.write, WriteState::Finished) {
            WriteState::Writing(writer, mode) => (writer, mode),
            WriteState::Finished => return Err(Error::AlreadyClosed),
            WriteState::Idle => {
                self.write = WriteState::Idle;

                return Err(Error::Structure("no write in progress"));
            }
        };

        self.write_remaining(&mut *writer, mode, true)
    }

    /// Write the whole document to `out` in one go. Unlike
    /// [`Document::begin_write`], nothing is released.
    pub fn save<W: Write>(&mut self, out: W, mode: WriteMode) -> Result<W> {
        self.check_open()?;

        if !matches!(self.write, WriteState::Idle) {
            return Err(Error::Structure("a write is already in progress"));
        }

        let mut writer = Writer::new(out, self.write_settings, self.settings.filters.clone());
        self.start(&mut writer, mode)?;
        self.write_remaining(&mut writer, mode, false)?;

        Ok(writer.into_inner())
    }

    fn start<W: Write>(&self, writer: &mut Writer<W>, mode: WriteMode) -> Result<()> {
        match mode {
            WriteMode::Full => {
                writer.write_header(self.write_settings.version.unwrap_or(self.version))
            }
            WriteMode::Incremental => {
                let source = self
                    .source
                    .as_ref()
                    .ok_or(Error::Structure("incremental writes need a source file"))?;

                writer.write_raw(source.as_ref())?;

                if !source.as_ref().ends_with(b"\n") && !source.as_ref().ends_with(b"\r") {
                    writer.write_raw(b"\n")?;
                }

                Ok(())
            }
        }
    }

    // Write a single entry that is in use. Objects that were already written
    // are skipped.
    fn write_entry<W: Write>(
        &mut self,
        writer: &mut Writer<W>,
        mode: WriteMode,
        r: ObjRef,
        release: bool,
    ) -> Result<()> {
        let entry = self.table.in_use(r)?;

        if matches!(entry.location, Location::Flushed(_)) || writer.is_recorded(r.obj_number) {
            return Ok(());
        }

        let location = entry.location;
        let unchanged = !entry.modified && location != Location::Memory;

        match mode {
            WriteMode::Full if unchanged && self.containers.contains(&r.obj_number) => {
                // Members of object streams are written as plain objects and
                // the section is rebuilt, so the containers are dropped.
                return writer.write_free(r.obj_number, r.gen_number.saturating_add(1));
            }
            WriteMode::Incremental if unchanged => {
                // Without a previous section to point to, the new one has to
                // describe unchanged objects as well. Compressed ones are
                // written again.
                let rebuild_table = self.start_xref.is_none();

                match location {
                    Location::Offset(offset) if rebuild_table => {
                        writer.record_in_use(r, offset as u64)?;
                    }
                    Location::Compressed { .. } if rebuild_table => {}
                    _ => {
                        if release {
                            self.release(r)?;
                        }

                        return Ok(());
                    }
                }

                if let Location::Offset(_) = location {
                    if release {
                        self.release(r)?;
                    }

                    return Ok(());
                }
            }
            _ => {}
        }

        if let Err(e) = self.load_object(r, &mut Chain::new()) {
            self.recover(r, e)?;
        }

        let object = self.prepare_for_writing(r)?;
        let entry = self.table.in_use(r)?;
        let object = object.as_ref().or(entry.cached.as_ref()).unwrap_or(&NULL);

        let offset = writer.write_object(r, object, self.source_bytes())?;

        if release {
            let entry = self.table.in_use_mut(r)?;
            entry.location = Location::Flushed(offset);
            entry.cached = None;
            entry.modified = false;

            trace!("flushed object {r} at offset {offset}");
        }

        Ok(())
    }

    // Streams with decoded data need direct filter entries to be encoded.
    fn prepare_for_writing(&mut self, r: ObjRef) -> Result<Option<Object>> {
        let stream = match &self.table.in_use(r)?.cached {
            Some(Object::Stream(stream)) if matches!(stream.payload(), Payload::Decoded(_)) => {
                stream.clone()
            }
            _ => return Ok(None),
        };

        let (dict, payload) = stream.into_parts();

        let refs = [FILTER, DECODE_PARMS].iter().any(|key| match dict.get(key) {
            Some(Object::Ref(_)) => true,
            Some(Object::Array(items)) => items.iter().any(|item| matches!(item, Object::Ref(_))),
            _ => false,
        });

        if !refs {
            return Ok(None);
        }

        let mut stream = Stream::new(self.direct_filter_entries(&dict)?, Vec::new());
        stream.set_payload(payload);

        Ok(Some(Object::Stream(stream)))
    }

    fn write_remaining<W: Write>(
        &mut self,
        writer: &mut Writer<W>,
        mode: WriteMode,
        release: bool,
    ) -> Result<()> {
        for r in self.table.live_refs() {
            self.write_entry(writer, mode, r, release)?;
        }

        for num in self.table.numbers() {
            if let Some(Entry::Free { generation, modified }) = self.table.get(num)
                && (mode == WriteMode::Full || *modified)
                && num != 0
            {
                writer.write_free(num, *generation)?;
            }
        }

        let format = match self.write_settings.xref_format {
            XRefFormat::Auto => self.source_format,
            format => format,
        };

        let (prev, complete) = match mode {
            WriteMode::Full => (None, true),
            WriteMode::Incremental => (self.start_xref, self.start_xref.is_none()),
        };

        let mut trailer = self.trailer.clone();
        trailer.remove(PREV);
        trailer.remove(SIZE);

        writer.finalize(
            &trailer,
            Finalize {
                format,
                prev,
                size: self.table.len(),
                complete,
            },
        )?;

        debug!("finished writing document with {} objects", self.table.live_refs().len());

        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("len", &self.table.len())
            .field("source", &self.source)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Resolve for Document {
    type Error = Error;

    fn resolve_ref(&mut self, r: ObjRef) -> Result<Object> {
        self.get(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Warning;
    use quire_syntax::Name;
    use std::sync::Mutex;

    fn catalog() -> Dict {
        let mut dict = Dict::new();
        dict.insert(&b"Type"[..], Name::new(b"Catalog"));
        dict
    }

    #[test]
    fn graph_ids_differ() {
        assert_ne!(Document::new().id(), Document::new().id());
    }

    #[test]
    fn register_and_resolve() {
        let mut doc = Document::new();
        let r = doc.register(catalog()).unwrap();

        assert_eq!(r, ObjRef::new(1, 0));
        assert!(doc.resolve(r).unwrap().as_dict().unwrap().is_type(b"Catalog"));
    }

    #[test]
    fn direct_only_is_rejected() {
        let mut doc = Document::new();

        assert!(matches!(doc.register(Object::Null), Err(Error::DirectOnlyViolation)));
        assert!(matches!(
            doc.register(Dict::new_direct_only()),
            Err(Error::DirectOnlyViolation)
        ));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn make_indirect_keeps_direct_only() {
        let warnings = Arc::new(Mutex::new(Vec::new()));
        let sink = warnings.clone();

        let mut settings = ReadSettings::default();
        settings.warning_sink = Arc::new(move |w| sink.lock().unwrap().push(w));

        let mut doc = Document::with_settings(settings);
        let value = doc.make_indirect(Object::Ref(ObjRef::new(3, 0))).unwrap();

        assert_eq!(value, Object::Ref(ObjRef::new(3, 0)));
        assert_eq!(*warnings.lock().unwrap(), vec![Warning::DirectOnlyKept]);
        assert!(doc.make_indirect(1).unwrap().as_obj_ref().is_some());
    }

    #[test]
    fn freed_reference_tolerance() {
        let mut doc = Document::new();
        let r = doc.register(1).unwrap();
        doc.mark_free(r).unwrap();

        assert_eq!(doc.resolve(r).unwrap(), &Object::Null);

        let mut settings = ReadSettings::default();
        settings.tolerance = Tolerance::Strict;
        let mut doc = Document::with_settings(settings);
        let r = doc.register(1).unwrap();
        doc.mark_free(r).unwrap();

        assert!(matches!(doc.resolve(r), Err(Error::FreedReference(_))));
    }

    #[test]
    fn freed_numbers_are_reused() {
        let mut doc = Document::new();
        let a = doc.register(1).unwrap();
        doc.register(2).unwrap();
        doc.mark_free(a).unwrap();

        let reused = doc.register(3).unwrap();
        assert_eq!(reused, ObjRef::new(1, 1));
        assert_eq!(doc.get(a).unwrap(), Object::Null);
        assert_eq!(doc.get(reused).unwrap(), Object::from(3));
    }

    #[test]
    fn put_and_get_mut() {
        let mut doc = Document::new();
        let r = doc.register(1).unwrap();

        doc.put(r, 2).unwrap();
        assert_eq!(doc.get(r).unwrap(), Object::from(2));

        *doc.get_mut(r).unwrap() = Object::from(3);
        assert_eq!(doc.get(r).unwrap(), Object::from(3));

        doc.put(ObjRef::new(7, 0), 7).unwrap();
        assert_eq!(doc.len(), 8);
        assert!(matches!(doc.put(ObjRef::new(7, 3), 1), Err(Error::FreedReference(_))));

        let far = ObjRef::new(u32::MAX, 0);
        assert!(matches!(doc.put(far, 1), Err(Error::Structure(_))));
        assert_eq!(doc.len(), 8);
    }

    #[test]
    fn closed_document() {
        let mut doc = Document::new();
        let r = doc.register(1).unwrap();
        doc.close();

        assert!(matches!(doc.resolve(r), Err(Error::UseAfterClose)));
        assert!(matches!(doc.register(2), Err(Error::UseAfterClose)));
        assert!(matches!(doc.make_indirect(Object::Null), Err(Error::UseAfterClose)));
        assert!(matches!(doc.save(Vec::new(), WriteMode::Full), Err(Error::UseAfterClose)));
    }

    #[test]
    fn decode_with_referenced_filter() {
        let mut doc = Document::new();
        let filter = doc.register(Name::new(b"ASCIIHexDecode")).unwrap();

        let mut dict = Dict::new();
        dict.insert(FILTER, filter);
        let stream = Stream::from_encoded(dict, b"48 69>".to_vec());

        assert_eq!(doc.decode_stream(&stream).unwrap(), b"Hi");
    }

    #[test]
    fn incremental_needs_source() {
        let mut doc = Document::new();
        assert!(doc.save(Vec::new(), WriteMode::Incremental).is_err());
    }

    #[test]
    fn save_new_document() {
        let mut doc = Document::new();
        let root = doc.register(catalog()).unwrap();
        doc.set_root(root);

        let out = doc.save(Vec::new(), WriteMode::Full).unwrap();
        let mut loaded = Document::load(out).unwrap();

        assert_eq!(loaded.root_ref(), Some(root));
        assert!(loaded.get_root().unwrap().is_type(b"Catalog"));
        assert!(!loaded.is_repaired());
    }
}
