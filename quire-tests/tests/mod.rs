use quire::{ReadSettings, Warning};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

mod repair;
mod roundtrip;
mod xref_stream;

#[derive(Debug, Clone, Copy)]
enum Slot {
    InUse(u16, usize),
    Free(u16),
}

/// Builds PDF files by hand, keeping track of object offsets.
pub(crate) struct PdfBuilder {
    buf: Vec<u8>,
    section: BTreeMap<u32, Slot>,
    size: u32,
    first_section: bool,
}

impl PdfBuilder {
    pub(crate) fn new(version: &str) -> Self {
        Self {
            buf: format!("%PDF-{version}\n%\u{e2}\u{e3}\n").into_bytes(),
            section: BTreeMap::new(),
            size: 1,
            first_section: true,
        }
    }

    /// Continue an existing file with an incremental update.
    pub(crate) fn update(data: Vec<u8>, size: u32) -> Self {
        Self {
            buf: data,
            section: BTreeMap::new(),
            size,
            first_section: false,
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn raw(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    pub(crate) fn object(&mut self, num: u32, generation: u16, body: &str) -> &mut Self {
        self.record(num, generation);
        self.raw(format!("{num} {generation} obj\n{body}\nendobj\n").as_bytes())
    }

    pub(crate) fn stream(&mut self, num: u32, dict: &str, data: &[u8]) -> &mut Self {
        self.record(num, 0);
        self.raw(format!("{num} 0 obj\n<<{dict} /Length {}>>\nstream\n", data.len()).as_bytes());
        self.raw(data);
        self.raw(b"\nendstream\nendobj\n")
    }

    pub(crate) fn free(&mut self, num: u32, generation: u16) -> &mut Self {
        self.section.insert(num, Slot::Free(generation));
        self.size = self.size.max(num + 1);
        self
    }

    fn record(&mut self, num: u32, generation: u16) {
        self.section.insert(num, Slot::InUse(generation, self.pos()));
        self.size = self.size.max(num + 1);
    }

    fn take_section(&mut self) -> BTreeMap<u32, Slot> {
        let mut section = std::mem::take(&mut self.section);

        if self.first_section {
            section.insert(0, Slot::Free(65535));
            self.first_section = false;
        }

        section
    }

    /// Write a classic section. Returns its offset.
    pub(crate) fn xref_table(&mut self, trailer: &str, prev: Option<usize>) -> usize {
        let section = self.take_section();
        let start = self.pos();

        self.raw(b"xref\n");

        for run in runs(&section) {
            self.raw(format!("{} {}\n", run[0].0, run.len()).as_bytes());

            for (_, slot) in run {
                let line = match slot {
                    Slot::InUse(generation, offset) => {
                        format!("{offset:010} {generation:05} n\r\n")
                    }
                    Slot::Free(generation) => format!("{:010} {generation:05} f\r\n", 0),
                };
                self.raw(line.as_bytes());
            }
        }

        let prev = prev.map(|p| format!(" /Prev {p}")).unwrap_or_default();
        let size = self.size;
        self.raw(format!("trailer\n<</Size {size} {trailer}{prev}>>\n").as_bytes());
        self.startxref(start)
    }

    /// Write an uncompressed cross-reference stream with number `num`.
    /// `compressed` lists members of object streams as (num, stream, index).
    pub(crate) fn xref_stream(
        &mut self,
        num: u32,
        trailer: &str,
        prev: Option<usize>,
        compressed: &[(u32, u32, u16)],
    ) -> usize {
        let start = self.pos();
        self.record(num, 0);
        let section = self.take_section();

        let mut rows = BTreeMap::new();
        for (num, slot) in section {
            let row = match slot {
                Slot::InUse(generation, offset) => (1_u8, offset as u32, generation),
                Slot::Free(generation) => (0, 0, generation),
            };
            rows.insert(num, row);
        }
        for (member, stream, index) in compressed {
            rows.insert(*member, (2, *stream, *index));
            self.size = self.size.max(member + 1);
        }

        let mut data = Vec::new();
        let mut index = String::new();
        let rows = rows.into_iter().collect::<Vec<_>>();

        for run in rows.chunk_by(|a, b| a.0 + 1 == b.0) {
            index.push_str(&format!("{} {} ", run[0].0, run.len()));

            for (_, (ty, f2, f3)) in run {
                data.push(*ty);
                data.extend_from_slice(&f2.to_be_bytes());
                data.extend_from_slice(&f3.to_be_bytes());
            }
        }

        let prev = prev.map(|p| format!(" /Prev {p}")).unwrap_or_default();
        let dict = format!(
            "{num} 0 obj\n<</Type /XRef /Size {} /W [1 4 2] /Index [{}] \
             /Length {} {trailer}{prev}>>\nstream\n",
            self.size,
            index.trim_end(),
            data.len()
        );
        self.raw(dict.as_bytes());
        self.raw(&data);
        self.raw(b"\nendstream\nendobj\n");
        self.startxref(start)
    }

    fn startxref(&mut self, start: usize) -> usize {
        self.raw(format!("startxref\n{start}\n%%EOF\n").as_bytes());
        start
    }

    pub(crate) fn size(&self) -> u32 {
        self.size
    }

    pub(crate) fn finish(&self) -> Vec<u8> {
        self.buf.clone()
    }
}

fn runs(section: &BTreeMap<u32, Slot>) -> Vec<Vec<(u32, Slot)>> {
    let entries = section.iter().map(|(n, s)| (*n, *s)).collect::<Vec<_>>();

    entries
        .chunk_by(|a, b| a.0 + 1 == b.0)
        .map(<[_]>::to_vec)
        .collect()
}

/// A minimal file with a catalog (1), a page tree (2) and an integer (3).
pub(crate) fn simple_pdf() -> Vec<u8> {
    let mut b = PdfBuilder::new("1.4");
    b.object(1, 0, "<</Type /Catalog /Pages 2 0 R>>")
        .object(2, 0, "<</Type /Pages /Kids [] /Count 0>>")
        .object(3, 0, "42");
    b.xref_table("/Root 1 0 R", None);

    b.finish()
}

/// An output that can be inspected after it was handed to a document.
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub(crate) fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Settings that collect all warnings.
pub(crate) fn collecting_settings() -> (ReadSettings, Arc<Mutex<Vec<Warning>>>) {
    let warnings = Arc::new(Mutex::new(Vec::new()));
    let sink = warnings.clone();

    let settings = ReadSettings {
        warning_sink: Arc::new(move |w| sink.lock().unwrap().push(w)),
        ..ReadSettings::default()
    };

    (settings, warnings)
}
