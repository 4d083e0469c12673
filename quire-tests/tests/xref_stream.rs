use crate::{PdfBuilder, simple_pdf};
use memchr::memmem;
use quire::quire_syntax::{FilterRegistry, Name, ObjRef, PdfString};
use quire::{Document, WriteMode, WriteSettings, XRefFormat};

fn stream_settings() -> WriteSettings {
    WriteSettings {
        xref_format: XRefFormat::Stream,
        ..WriteSettings::default()
    }
}

fn xref_stream_pdf() -> Vec<u8> {
    let mut b = PdfBuilder::new("1.5");
    b.object(1, 0, "<</Type /Catalog>>").object(2, 0, "(two)");
    b.xref_stream(3, "/Root 1 0 R", None, &[]);

    b.finish()
}

#[test]
fn stream_output_can_be_reloaded() {
    let mut doc = Document::load(simple_pdf()).unwrap();
    doc.set_write_settings(stream_settings());

    let out = doc.save(Vec::new(), WriteMode::Full).unwrap();
    assert!(memmem::find(&out, b"/Type /XRef").is_some());
    assert!(memmem::find(&out, b"trailer").is_none());

    let mut reloaded = Document::load(out).unwrap();
    assert!(!reloaded.is_repaired());
    assert!(reloaded.get_root().unwrap().is_type(b"Catalog"));
    assert_eq!(reloaded.get(ObjRef::new(3, 0)).unwrap().as_i64(), Some(42));
}

#[test]
fn uncompressed_stream_output() {
    let mut doc = Document::load(simple_pdf()).unwrap();
    doc.set_write_settings(WriteSettings {
        compress: false,
        ..stream_settings()
    });

    let out = doc.save(Vec::new(), WriteMode::Full).unwrap();
    assert!(memmem::find(&out, b"/FlateDecode").is_none());

    let mut reloaded = Document::load(out).unwrap();
    assert_eq!(reloaded.get(ObjRef::new(3, 0)).unwrap().as_i64(), Some(42));
}

#[test]
fn incremental_update_keeps_the_stream_format() {
    let source = xref_stream_pdf();
    let mut doc = Document::load(source.clone()).unwrap();
    doc.put(ObjRef::new(2, 0), PdfString::new("updated")).unwrap();

    let out = doc.save(Vec::new(), WriteMode::Incremental).unwrap();
    let update = &out[source.len()..];

    assert!(memmem::find(update, b"/Type /XRef").is_some());
    assert!(memmem::find(update, b"/Prev").is_some());
    assert!(memmem::find(update, b"trailer").is_none());

    let mut reloaded = Document::load(out).unwrap();
    let value = reloaded.get(ObjRef::new(2, 0)).unwrap();
    assert_eq!(value.as_string().unwrap().as_bytes(), b"updated");
    assert!(reloaded.get_root().unwrap().is_type(b"Catalog"));
}

#[test]
fn table_can_be_forced_in_updates() {
    let source = xref_stream_pdf();
    let mut doc = Document::load(source.clone()).unwrap();
    doc.set_write_settings(WriteSettings {
        xref_format: XRefFormat::Table,
        ..WriteSettings::default()
    });
    doc.register(PdfString::new("new")).unwrap();

    let out = doc.save(Vec::new(), WriteMode::Incremental).unwrap();
    assert!(memmem::find(&out[source.len()..], b"trailer").is_some());

    let mut reloaded = Document::load(out).unwrap();
    assert_eq!(reloaded.get(ObjRef::new(4, 0)).unwrap().as_string().unwrap().as_bytes(), b"new");
}

#[test]
fn png_predicted_stream() {
    let mut b = PdfBuilder::new("1.5");
    let catalog = b.pos();
    b.object(1, 0, "<</Type /Catalog>>");
    let integer = b.pos();
    b.object(2, 0, "17");
    let xref = b.pos();

    let rows = [
        [0_u8, 0, 0, 255],
        [1, (catalog >> 8) as u8, catalog as u8, 0],
        [1, (integer >> 8) as u8, integer as u8, 0],
        [1, (xref >> 8) as u8, xref as u8, 0],
    ];

    // Every row uses the "up" filter.
    let mut predicted = Vec::new();
    let mut previous = [0_u8; 4];
    for row in rows {
        predicted.push(2);
        predicted.extend(row.iter().zip(previous).map(|(b, p)| b.wrapping_sub(p)));
        previous = row;
    }

    let data = FilterRegistry::new()
        .encode(&Name::new(b"FlateDecode"), &predicted, None)
        .unwrap();

    b.raw(
        format!(
            "3 0 obj\n<</Type /XRef /Size 4 /W [1 2 1] /Root 1 0 R /Filter /FlateDecode \
             /DecodeParms <</Predictor 12 /Columns 4>> /Length {}>>\nstream\n",
            data.len()
        )
        .as_bytes(),
    )
    .raw(&data)
    .raw(format!("\nendstream\nendobj\nstartxref\n{xref}\n%%EOF\n").as_bytes());

    let mut doc = Document::load(b.finish()).unwrap();

    assert!(!doc.is_repaired());
    assert_eq!(doc.get(ObjRef::new(2, 0)).unwrap().as_i64(), Some(17));
    assert!(doc.get_root().unwrap().is_type(b"Catalog"));
}
