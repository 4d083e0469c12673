/*!
Lazy, editable PDF object graphs.

A [`Document`] is loaded from the bytes of a PDF file by reading only its
cross-reference data. Indirect objects are parsed the first time they are
resolved, can be modified, created and freed, and are written back either as
a complete new file or as an incremental update that leaves the original
bytes untouched.

```
use quire::{Document, WriteMode};
use quire::quire_syntax::{Dict, Name};

let mut doc = Document::new();

let mut catalog = Dict::new();
catalog.insert(&b"Type"[..], Name::new(b"Catalog"));
let root = doc.register(catalog)?;
doc.set_root(root);

let bytes = doc.save(Vec::new(), WriteMode::Full)?;
let mut loaded = Document::load(bytes)?;

assert!(loaded.get_root()?.is_type(b"Catalog"));
# Ok::<(), quire::Error>(())
```

Damaged files are handled tolerantly by default: broken cross-reference data
is rebuilt by scanning the file, and unreadable objects resolve to `null`.
See [`ReadSettings`] for how to change this.
*/

mod copy;
mod data;
mod document;
mod error;
mod object_stream;
mod repair;
mod settings;
mod table;
mod version;
mod writer;
mod xref;

pub use copy::copy_subgraph;
pub use data::PdfData;
pub use document::{Document, GraphId};
pub use error::{Error, Result};
pub use settings::{
    ReadSettings, Tolerance, UpdateOrder, Warning, WarningSinkFn, WriteSettings, XRefFormat,
};
pub use table::{Entry, InUse, Location, MAX_GENERATION, MAX_OBJECT_NUMBER, RefTable};
pub use version::PdfVersion;
pub use writer::{Finalize, WriteMode, Writer};

pub use quire_syntax;
