//! Settings for reading and writing documents.

use crate::version::PdfVersion;
use quire_syntax::{FilterRegistry, ObjRef};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// How damaged objects are handled when they are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tolerance {
    /// Unreadable, broken and freed references are errors.
    Strict,
    /// Unreadable, broken and freed references resolve to `null`, and a
    /// warning is emitted.
    #[default]
    Tolerant,
}

/// Which definition wins if several cross-reference sections define the same
/// object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateOrder {
    /// The newest incremental update wins.
    #[default]
    LatestWins,
    /// The original definition wins.
    EarliestWins,
}

/// Warnings that can occur while reading a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// The object could not be read and was replaced by `null`.
    UnreadableObject(ObjRef),
    /// The cross-reference data was damaged and was rebuilt by scanning the file.
    XRefRepaired,
    /// A direct-only value was kept inline instead of becoming an indirect object.
    DirectOnlyKept,
    /// The data of a stream could not be decoded.
    StreamDecodeFailure(ObjRef),
}

/// A callback that receives warnings.
pub type WarningSinkFn = Arc<dyn Fn(Warning) + Send + Sync>;

/// Settings that control how a document is read.
#[derive(Clone)]
pub struct ReadSettings {
    /// How damaged objects are handled.
    pub tolerance: Tolerance,
    /// The precedence of conflicting cross-reference sections.
    pub update_order: UpdateOrder,
    /// Whether the cross-reference data may be rebuilt by scanning the file if
    /// it is missing or damaged.
    pub repair: bool,
    /// If enabled, stream payloads stay in the source data until they are
    /// needed.
    pub lazy_streams: bool,
    /// The filters used to decode and encode stream data.
    pub filters: FilterRegistry,
    /// In addition to being logged, warnings are passed to this callback.
    pub warning_sink: WarningSinkFn,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            update_order: UpdateOrder::default(),
            repair: true,
            lazy_streams: true,
            filters: FilterRegistry::new(),
            warning_sink: Arc::new(|_| {}),
        }
    }
}

impl Debug for ReadSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSettings")
            .field("tolerance", &self.tolerance)
            .field("update_order", &self.update_order)
            .field("repair", &self.repair)
            .field("lazy_streams", &self.lazy_streams)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

/// The kind of cross-reference section that is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XRefFormat {
    /// Use the format of the newest section of the source file, or a table
    /// for new documents.
    #[default]
    Auto,
    /// A classic `xref` table with a `trailer` dictionary.
    Table,
    /// A cross-reference stream.
    Stream,
}

/// Settings that control how a document is written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteSettings {
    /// The format of the cross-reference section.
    pub xref_format: XRefFormat,
    /// Whether unfiltered streams and cross-reference streams are compressed
    /// with Flate.
    pub compress: bool,
    /// The number of fractional digits for real numbers.
    pub real_precision: usize,
    /// Overrides the version in the header of fully written files.
    pub version: Option<PdfVersion>,
}

impl Default for WriteSettings {
    fn default() -> Self {
        Self {
            xref_format: XRefFormat::Auto,
            compress: true,
            real_precision: 6,
            version: None,
        }
    }
}
