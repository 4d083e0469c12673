use crate::{PdfBuilder, simple_pdf};
use quire::quire_syntax::{Array, Dict, Name, ObjRef, Object, PdfString, Stream};
use quire::{Document, WriteMode, WriteSettings};

const VALUE: &str = concat!(
    r"<</A#20B (par\(en\)s \\ back\r) /Hex <DEADBEEF> /Real -3.25 ",
    r"/Nested [1 [2 [true null]] /Deep] /Esc /a#2Fb /Ref 2 0 R>>"
);

fn reload(doc: &mut Document, mode: WriteMode) -> Document {
    let out = doc.save(Vec::new(), mode).unwrap();

    Document::load(out).unwrap()
}

#[test]
fn parsed_values_survive_a_full_save() {
    let mut b = PdfBuilder::new("1.5");
    b.object(1, 0, "<</Type /Catalog>>").object(2, 0, VALUE);
    b.xref_table("/Root 1 0 R", None);

    let mut doc = Document::load(b.finish()).unwrap();
    let original = doc.get(ObjRef::new(2, 0)).unwrap();

    let mut reloaded = reload(&mut doc, WriteMode::Full);
    let value = reloaded.get(ObjRef::new(2, 0)).unwrap();

    assert_eq!(value, original);

    let dict = value.as_dict().unwrap();
    assert_eq!(dict.get_string(b"A B").unwrap().as_bytes(), b"par(en)s \\ back\r");
    assert_eq!(dict.get_string(b"Hex").unwrap().as_bytes(), [0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(dict.get_name(b"Esc").unwrap().as_bytes(), b"a/b");
    assert_eq!(dict.get_f64(b"Real"), Some(-3.25));
}

#[test]
fn built_values_survive_a_full_save() {
    let mut doc = Document::new();

    let mut nested = Array::new();
    nested.push(1.5);
    nested.push(PdfString::new(&b"\x00\xff"[..]));
    nested.push(Name::new(b"with space"));

    let mut dict = Dict::new();
    dict.insert(&b"Type"[..], Name::new(b"Catalog"));
    dict.insert(&b"Items"[..], nested);
    dict.insert(&b"Flag"[..], false);
    let root = doc.register(dict).unwrap();
    doc.set_root(root);

    let original = doc.get(root).unwrap();
    let mut reloaded = reload(&mut doc, WriteMode::Full);

    assert_eq!(reloaded.get(root).unwrap(), original);
}

#[test]
fn reals_use_the_configured_precision() {
    let mut doc = Document::new();
    let root = doc.register(Array::from(vec![Object::from(1.23456), Object::from(0.5)])).unwrap();
    doc.set_root(root);
    doc.set_write_settings(WriteSettings {
        real_precision: 2,
        ..WriteSettings::default()
    });

    let out = doc.save(Vec::new(), WriteMode::Full).unwrap();
    assert!(memchr::memmem::find(&out, b"[1.23 0.5]").is_some());
}

#[test]
fn decoded_streams_are_compressed() {
    let data = b"0 0 m 100 100 l S ".repeat(100);

    let mut doc = Document::new();
    let stream = doc.register(Stream::new(Dict::new(), data.clone())).unwrap();
    doc.set_root(stream);

    let out = doc.save(Vec::new(), WriteMode::Full).unwrap();
    assert!(memchr::memmem::find(&out, b"/FlateDecode").is_some());
    assert!(out.len() < data.len());

    let mut reloaded = Document::load(out).unwrap();
    assert_eq!(reloaded.stream_data(stream).unwrap(), data);
}

#[test]
fn streams_stay_plain_without_compression() {
    let mut doc = Document::new();
    let stream = doc.register(Stream::new(Dict::new(), b"plain content".to_vec())).unwrap();
    doc.set_root(stream);
    doc.set_write_settings(WriteSettings {
        compress: false,
        ..WriteSettings::default()
    });

    let out = doc.save(Vec::new(), WriteMode::Full).unwrap();
    assert!(memchr::memmem::find(&out, b"stream\nplain content\nendstream").is_some());
}

#[test]
fn encoded_streams_are_copied_unchanged() {
    let mut b = PdfBuilder::new("1.4");
    b.object(1, 0, "<</Type /Catalog>>")
        .stream(2, "/Filter /ASCIIHexDecode", b"48656C6C6F>");
    b.xref_table("/Root 1 0 R", None);

    let mut doc = Document::load(b.finish()).unwrap();
    let out = doc.save(Vec::new(), WriteMode::Full).unwrap();
    assert!(memchr::memmem::find(&out, b"48656C6C6F>").is_some());

    let mut reloaded = Document::load(out).unwrap();
    assert_eq!(reloaded.stream_data(ObjRef::new(2, 0)).unwrap(), b"Hello");
}

#[test]
fn version_is_kept() {
    let mut b = PdfBuilder::new("1.6");
    b.object(1, 0, "<</Type /Catalog>>");
    b.xref_table("/Root 1 0 R", None);

    let mut doc = Document::load(b.finish()).unwrap();
    let out = doc.save(Vec::new(), WriteMode::Full).unwrap();

    assert!(out.starts_with(b"%PDF-1.6\n"));
}

#[test]
fn declared_size_does_not_inflate_a_full_save() {
    let mut data = simple_pdf();
    let pos = memchr::memmem::rfind(&data, b"/Size 4").unwrap();
    data.splice(pos..pos + "/Size 4".len(), b"/Size 5000000".iter().copied());

    let mut doc = Document::load(data).unwrap();
    assert!(!doc.is_repaired());
    assert_eq!(doc.len(), 4);

    let out = doc.save(Vec::new(), WriteMode::Full).unwrap();
    assert!(out.len() < 4096);

    let mut reloaded = Document::load(out).unwrap();
    assert_eq!(reloaded.get(ObjRef::new(3, 0)).unwrap().as_i64(), Some(42));
}

#[test]
fn huge_object_numbers_are_dropped() {
    let mut b = PdfBuilder::new("1.4");
    b.object(1, 0, "<</Type /Catalog /Pages 2 0 R>>")
        .object(2, 0, "<</Type /Pages /Kids [] /Count 0>>")
        .raw(b"4294967295 0 obj\n(far)\nendobj\n")
        .raw(b"8388608 0 obj\n(too far)\nendobj\n");

    let mut doc = Document::load(b.finish()).unwrap();
    assert!(doc.is_repaired());
    assert_eq!(doc.len(), 3);

    let out = doc.save(Vec::new(), WriteMode::Full).unwrap();
    assert!(out.len() < 4096);

    let mut reloaded = Document::load(out).unwrap();
    assert!(reloaded.get_root().unwrap().is_type(b"Catalog"));
    assert_eq!(reloaded.len(), 3);
}
