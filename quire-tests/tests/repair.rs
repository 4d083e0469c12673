use crate::{PdfBuilder, collecting_settings, simple_pdf};
use quire::quire_syntax::{ObjRef, Object, PdfString};
use quire::{Document, ReadSettings, Warning, WriteMode};

fn broken_startxref() -> Vec<u8> {
    let mut data = simple_pdf();
    let pos = memchr::memmem::rfind(&data, b"startxref\n").unwrap() + "startxref\n".len();
    let end = pos + data[pos..].iter().position(|b| *b == b'\n').unwrap();
    data.splice(pos..end, b"987654".iter().copied());

    data
}

/// The xref entry of object 3 points two bytes into its header.
fn shifted_offset() -> Vec<u8> {
    let mut b = PdfBuilder::new("1.4");
    b.object(1, 0, "<</Type /Catalog /Pages 2 0 R>>")
        .object(2, 0, "<</Type /Pages /Kids [] /Count 0>>")
        .object(3, 0, "(three)");
    b.xref_table("/Root 1 0 R", None);
    let mut data = b.finish();

    let table = memchr::memmem::rfind(&data, b"xref\n").unwrap();
    let entry = table + "xref\n0 4\n".len() + 3 * 20;
    let offset = std::str::from_utf8(&data[entry..entry + 10]).unwrap().parse::<usize>().unwrap();
    data[entry..entry + 10].copy_from_slice(format!("{:010}", offset + 2).as_bytes());

    data
}

#[test]
fn broken_startxref_is_repaired() {
    let (settings, warnings) = collecting_settings();
    let mut doc = Document::load_with(broken_startxref(), settings).unwrap();

    assert!(doc.is_repaired());
    assert_eq!(*warnings.lock().unwrap(), vec![Warning::XRefRepaired]);
    assert!(doc.get_root().unwrap().is_type(b"Catalog"));
    assert_eq!(doc.get(ObjRef::new(3, 0)).unwrap().as_i64(), Some(42));
}

#[test]
fn missing_xref_is_repaired() {
    let mut b = PdfBuilder::new("1.7");
    b.object(1, 0, "<</Type /Catalog /Pages 2 0 R>>")
        .object(2, 0, "<</Type /Pages /Kids [] /Count 0>>")
        .object(7, 0, "(seven)");

    let mut doc = Document::load(b.finish()).unwrap();

    assert!(doc.is_repaired());
    assert_eq!(doc.root_ref(), Some(ObjRef::new(1, 0)));
    assert_eq!(doc.get(ObjRef::new(7, 0)).unwrap().as_string().unwrap().as_bytes(), b"seven");
}

#[test]
fn later_definitions_win_when_repairing() {
    let mut b = PdfBuilder::new("1.4");
    b.object(1, 0, "<</Type /Catalog /Pages 2 0 R>>")
        .object(2, 0, "<</Type /Pages /Kids [] /Count 0>>")
        .object(3, 0, "1")
        .object(3, 0, "2");

    let mut doc = Document::load(b.finish()).unwrap();

    assert_eq!(doc.get(ObjRef::new(3, 0)).unwrap().as_i64(), Some(2));
}

#[test]
fn load_fails_without_repair() {
    let settings = ReadSettings {
        repair: false,
        ..ReadSettings::default()
    };

    assert!(Document::load_with(broken_startxref(), settings).is_err());
}

#[test]
fn nothing_to_repair() {
    assert!(Document::load(b"%PDF-1.4\nnot a pdf at all\n".to_vec()).is_err());
}

#[test]
fn repaired_document_can_be_updated() {
    let mut doc = Document::load(broken_startxref()).unwrap();
    doc.put(ObjRef::new(3, 0), PdfString::new("updated")).unwrap();

    let out = doc.save(Vec::new(), WriteMode::Incremental).unwrap();
    assert!(out.starts_with(&broken_startxref()));

    let settings = ReadSettings {
        repair: false,
        ..ReadSettings::default()
    };
    let mut reloaded = Document::load_with(out, settings).unwrap();

    assert!(!reloaded.is_repaired());
    assert!(reloaded.get_root().unwrap().is_type(b"Catalog"));
    assert!(reloaded.get(ObjRef::new(2, 0)).unwrap().as_dict().unwrap().is_type(b"Pages"));
    assert_eq!(
        reloaded.get(ObjRef::new(3, 0)).unwrap().as_string().unwrap().as_bytes(),
        b"updated"
    );
}

#[test]
fn lazily_repaired_document_can_be_updated() {
    let mut doc = Document::load(shifted_offset()).unwrap();
    assert!(!doc.is_repaired());

    let three = doc.get(ObjRef::new(3, 0)).unwrap();
    assert_eq!(three.as_string().unwrap().as_bytes(), b"three");
    assert!(doc.is_repaired());

    if let Object::Dict(catalog) = doc.get_mut(ObjRef::new(1, 0)).unwrap() {
        catalog.insert(&b"Lang"[..], PdfString::new("en"));
    }

    let out = doc.save(Vec::new(), WriteMode::Incremental).unwrap();

    let settings = ReadSettings {
        repair: false,
        ..ReadSettings::default()
    };
    let mut reloaded = Document::load_with(out, settings).unwrap();

    assert!(!reloaded.is_repaired());
    assert!(reloaded.get_root().unwrap().get_string(b"Lang").is_some());

    let three = reloaded.get(ObjRef::new(3, 0)).unwrap();
    assert_ne!(three, Object::Null);
    assert_eq!(three.as_string().unwrap().as_bytes(), b"three");
}
