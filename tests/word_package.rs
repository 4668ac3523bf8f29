mod common;

use std::path::Path;

use common::{DOCUMENT_XML, SETTINGS_XML, build_docx, build_zip, read_part};
use officeconv::ooxml::WordPackage;
use officeconv::package::LoadedDocument;
use officeconv::{ConversionTask, DocumentFamily, Error, FormatRegistry, OfficeDocument, PropertySet, PropertyValue};

const WML: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

fn modify(package: &mut WordPackage, line_numbers: bool) {
    let pdf = FormatRegistry::standard()
        .format_by_extension("pdf")
        .cloned()
        .unwrap();
    ConversionTask::new(Path::new("in.docx"), Path::new("out.pdf"), pdf)
        .modify_document(package, line_numbers);
}

#[test]
fn initial_state_from_body_section() {
    let package = WordPackage::from_bytes(&build_docx(DOCUMENT_XML, Some(SETTINGS_XML))).unwrap();

    assert_eq!(package.family(), Some(DocumentFamily::Text));
    assert!(!package.line_numbering_settings().is_on);
    assert_eq!(package.page_style().name(), "Default Style");
    assert!(package.page_style().header_is_on);
    assert!(package.page_style().footer_is_on);
    assert!(!package.updates_fields());
}

#[test]
fn existing_line_numbering_is_read() {
    let xml = format!(
        r#"<w:document {WML}><w:body><w:p/><w:sectPr><w:lnNumType w:countBy="5" w:restart="newPage"/></w:sectPr></w:body></w:document>"#
    );
    let package = WordPackage::from_bytes(&build_docx(&xml, None)).unwrap();

    let numbering = package.line_numbering_settings();
    assert!(numbering.is_on);
    assert_eq!(numbering.interval, 5);
    assert!(numbering.restart_at_each_page);
    assert!(!package.page_style().header_is_on);
}

#[test]
fn modified_package_round_trips() {
    let mut package = WordPackage::from_bytes(&build_docx(DOCUMENT_XML, Some(SETTINGS_XML))).unwrap();
    modify(&mut package, true);
    let bytes = package.to_bytes().unwrap();

    let document = read_part(&bytes, "word/document.xml");
    assert!(!document.contains("headerReference"));
    assert!(!document.contains("footerReference"));
    assert_eq!(document.matches("<w:lnNumType").count(), 2);
    // body section: inserted ahead of w:cols
    assert!(document.contains(r#"<w:lnNumType w:countBy="1" w:restart="continuous"/><w:cols w:space="720"/>"#));
    // first section has no later siblings: appended
    assert!(document.contains(r#"<w:pgSz w:w="12240" w:h="15840"/><w:lnNumType w:countBy="1" w:restart="continuous"/></w:sectPr></w:pPr>"#));
    assert!(document.contains("<w:t>Hello</w:t>"));

    let settings = read_part(&bytes, "word/settings.xml");
    assert!(settings.contains(r#"<w:updateFields w:val="true"/><w:compat/>"#));

    let reopened = WordPackage::from_bytes(&bytes).unwrap();
    assert!(reopened.line_numbering_settings().is_on);
    assert_eq!(reopened.line_numbering_settings().interval, 1);
    assert!(!reopened.line_numbering_settings().restart_at_each_page);
    assert!(!reopened.page_style().header_is_on);
    assert!(!reopened.page_style().footer_is_on);
    assert!(reopened.updates_fields());
}

#[test]
fn untouched_package_keeps_document_bytes() {
    let package = WordPackage::from_bytes(&build_docx(DOCUMENT_XML, Some(SETTINGS_XML))).unwrap();
    let bytes = package.to_bytes().unwrap();

    assert_eq!(read_part(&bytes, "word/document.xml"), DOCUMENT_XML);
    assert_eq!(read_part(&bytes, "word/settings.xml"), SETTINGS_XML);
    assert_eq!(
        package.part_names().collect::<Vec<_>>(),
        ["[Content_Types].xml", "word/document.xml", "word/settings.xml"]
    );
}

#[test]
fn existing_line_numbering_kept_when_not_requested() {
    let xml = format!(
        r#"<w:document {WML}><w:body><w:p/><w:sectPr><w:headerReference w:type="default"/><w:lnNumType w:countBy="5"/></w:sectPr></w:body></w:document>"#
    );
    let mut package = WordPackage::from_bytes(&build_docx(&xml, None)).unwrap();
    modify(&mut package, false);

    let document = read_part(&package.to_bytes().unwrap(), "word/document.xml");
    assert!(document.contains(r#"<w:sectPr><w:lnNumType w:countBy="5"/></w:sectPr>"#));
}

#[test]
fn existing_line_numbering_replaced() {
    let xml = format!(
        r#"<w:document {WML}><w:body><w:p/><w:sectPr><w:lnNumType w:countBy="5" w:restart="newPage"/><w:docGrid w:linePitch="360"/></w:sectPr></w:body></w:document>"#
    );
    let mut package = WordPackage::from_bytes(&build_docx(&xml, None)).unwrap();
    modify(&mut package, true);

    let document = read_part(&package.to_bytes().unwrap(), "word/document.xml");
    assert_eq!(
        document,
        format!(
            r#"<w:document {WML}><w:body><w:p/><w:sectPr><w:lnNumType w:countBy="1" w:restart="continuous"/><w:docGrid w:linePitch="360"/></w:sectPr></w:body></w:document>"#
        )
    );
}

#[test]
fn self_closing_section_is_expanded() {
    let xml = format!(r#"<w:document {WML}><w:body><w:p/><w:sectPr/></w:body></w:document>"#);
    let mut package = WordPackage::from_bytes(&build_docx(&xml, None)).unwrap();
    modify(&mut package, true);

    let document = read_part(&package.to_bytes().unwrap(), "word/document.xml");
    assert!(document.contains(
        r#"<w:sectPr><w:lnNumType w:countBy="1" w:restart="continuous"/></w:sectPr>"#
    ));
}

#[test]
fn custom_prefix_is_reused() {
    let xml = r#"<x:document xmlns:x="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><x:body><x:sectPr><x:cols/></x:sectPr></x:body></x:document>"#;
    let mut package = WordPackage::from_bytes(&build_docx(xml, None)).unwrap();
    modify(&mut package, true);

    let document = read_part(&package.to_bytes().unwrap(), "word/document.xml");
    assert!(document.contains(r#"<x:lnNumType x:countBy="1" x:restart="continuous"/><x:cols/>"#));
}

#[test]
fn revision_sections_are_not_touched() {
    let xml = format!(
        r#"<w:document {WML}><w:body><w:sectPr><w:headerReference w:type="default"/><w:sectPrChange w:id="1"><w:sectPr><w:headerReference w:type="first"/></w:sectPr></w:sectPrChange></w:sectPr></w:body></w:document>"#
    );
    let mut package = WordPackage::from_bytes(&build_docx(&xml, None)).unwrap();
    modify(&mut package, false);

    let document = read_part(&package.to_bytes().unwrap(), "word/document.xml");
    assert!(!document.contains(r#"w:type="default""#));
    assert!(document.contains(r#"<w:sectPrChange w:id="1"><w:sectPr><w:headerReference w:type="first"/></w:sectPr></w:sectPrChange>"#));
}

#[test]
fn disabled_update_fields_is_switched_on() {
    let settings = format!(r#"<w:settings {WML}><w:updateFields w:val="false"/></w:settings>"#);
    let mut package = WordPackage::from_bytes(&build_docx(DOCUMENT_XML, Some(&settings))).unwrap();
    assert!(!package.updates_fields());
    modify(&mut package, false);

    let written = read_part(&package.to_bytes().unwrap(), "word/settings.xml");
    assert_eq!(written, format!(r#"<w:settings {WML}><w:updateFields w:val="true"/></w:settings>"#));
}

#[test]
fn settings_without_anchor_get_update_fields_appended() {
    let settings = format!(r#"<w:settings {WML}><w:zoom w:percent="100"/></w:settings>"#);
    let mut package = WordPackage::from_bytes(&build_docx(DOCUMENT_XML, Some(&settings))).unwrap();
    modify(&mut package, false);

    let written = read_part(&package.to_bytes().unwrap(), "word/settings.xml");
    assert!(written.ends_with(r#"<w:zoom w:percent="100"/><w:updateFields w:val="true"/></w:settings>"#));
}

#[test]
fn line_numbering_property_validation() {
    let mut package = WordPackage::from_bytes(&build_docx(DOCUMENT_XML, None)).unwrap();
    let props = package.line_numbering().unwrap();

    assert!(matches!(
        props.set_property("Interval", PropertyValue::Short(0)),
        Err(Error::IllegalArgument(_))
    ));
    assert!(matches!(
        props.set_property("IsOn", PropertyValue::Long(1)),
        Err(Error::IllegalArgument(_))
    ));
    assert!(matches!(
        props.set_property("Distance", PropertyValue::Long(10)),
        Err(Error::UnknownProperty(_))
    ));
    props.set_property("Interval", PropertyValue::Long(3)).unwrap();
    assert_eq!(props.property("Interval").unwrap(), PropertyValue::Short(3));
}

#[test]
fn page_style_lookup() {
    let mut package = WordPackage::from_bytes(&build_docx(DOCUMENT_XML, None)).unwrap();
    let styles = package.style_families().unwrap();

    assert!(styles.has_style("PageStyles", "Default Style"));
    assert!(!styles.has_style("PageStyles", "Default"));
    assert!(matches!(
        styles.style_mut("ParagraphStyles", "Default Style"),
        Err(Error::NoSuchElement(_))
    ));

    let style = styles.style_mut("PageStyles", "Default Style").unwrap();
    assert_eq!(
        style.property("DisplayName").unwrap().as_str(),
        Some("Default Style")
    );
    assert!(style.set_property("DisplayName", "x".into()).is_err());
}

#[test]
fn missing_document_part_is_rejected() {
    let bytes = build_zip(&[("word/styles.xml", "<w:styles/>")]);
    assert!(matches!(WordPackage::from_bytes(&bytes), Err(Error::InvalidDocx(_))));
}

#[test]
fn loaded_document_opens_docx_as_word_package() {
    let bytes = build_docx(DOCUMENT_XML, None);
    let mut doc = LoadedDocument::from_bytes("report.docx", bytes).unwrap();
    assert!(matches!(doc, LoadedDocument::Word(_)));
    assert!(doc.line_numbering().is_some());
    assert!(doc.refreshable().is_some());

    let spreadsheet = build_zip(&[("xl/workbook.xml", "<workbook/>")]);
    let doc = LoadedDocument::from_bytes("book.bin", spreadsheet).unwrap();
    assert_eq!(doc.family(), Some(DocumentFamily::Spreadsheet));
    assert!(matches!(doc, LoadedDocument::Opaque(_)));
}

#[test]
fn refresh_creates_missing_settings_part() {
    let mut package = WordPackage::from_bytes(&build_docx(DOCUMENT_XML, None)).unwrap();
    modify(&mut package, false);
    assert!(package.updates_fields());
    let bytes = package.to_bytes().unwrap();

    let settings = read_part(&bytes, "word/settings.xml");
    assert!(settings.contains(r#"<w:updateFields w:val="true"/>"#));
    let content_types = read_part(&bytes, "[Content_Types].xml");
    assert!(content_types.contains(
        r#"<Override PartName="/word/settings.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml"/></Types>"#
    ));
    let rels = read_part(&bytes, "word/_rels/document.xml.rels");
    assert!(rels.contains(r#"Id="rId1""#));
    assert!(rels.contains(r#"Target="settings.xml""#));

    let reopened = WordPackage::from_bytes(&bytes).unwrap();
    assert!(reopened.updates_fields());
}

#[test]
fn settings_relationship_gets_a_free_id() {
    let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/></Relationships>"#;
    let content_types = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;
    let bytes = build_zip(&[
        ("[Content_Types].xml", content_types),
        ("word/document.xml", DOCUMENT_XML),
        ("word/_rels/document.xml.rels", rels),
    ]);
    let mut package = WordPackage::from_bytes(&bytes).unwrap();
    modify(&mut package, false);
    let bytes = package.to_bytes().unwrap();

    let written = read_part(&bytes, "word/_rels/document.xml.rels");
    assert!(written.contains(r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings" Target="settings.xml"/></Relationships>"#));
    assert!(written.contains(r#"Id="rId2""#));
    let types = read_part(&bytes, "[Content_Types].xml");
    assert!(types.contains(r#"<Override PartName="/word/settings.xml""#));
    assert!(types.ends_with("</Types>"));
}

#[test]
fn untouched_package_without_settings_gains_no_parts() {
    let package = WordPackage::from_bytes(&build_docx(DOCUMENT_XML, None)).unwrap();
    let bytes = package.to_bytes().unwrap();
    let reopened = WordPackage::from_bytes(&bytes).unwrap();
    assert_eq!(
        reopened.part_names().collect::<Vec<_>>(),
        ["[Content_Types].xml", "word/document.xml"]
    );
}

#[test]
fn revision_references_do_not_count_as_header() {
    let xml = format!(
        r#"<w:document {WML}><w:body><w:sectPr><w:pgSz w:w="12240"/><w:sectPrChange w:id="1"><w:sectPr><w:headerReference w:type="default"/><w:footerReference w:type="default"/></w:sectPr></w:sectPrChange></w:sectPr></w:body></w:document>"#
    );
    let package = WordPackage::from_bytes(&build_docx(&xml, None)).unwrap();
    assert!(!package.page_style().header_is_on);
    assert!(!package.page_style().footer_is_on);
}

/// Rewrites every central directory entry to claim a near-4 GiB uncompressed size.
fn declare_huge_sizes(mut zip: Vec<u8>) -> Vec<u8> {
    for i in 0..zip.len().saturating_sub(28) {
        if zip[i..i + 4] == [0x50, 0x4b, 0x01, 0x02] {
            zip[i + 24..i + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        }
    }
    zip
}

#[test]
fn declared_part_size_is_not_trusted() {
    let bytes = declare_huge_sizes(build_docx(DOCUMENT_XML, Some(SETTINGS_XML)));
    match WordPackage::from_bytes(&bytes) {
        Ok(package) => assert!(package.page_style().header_is_on),
        Err(e) => assert!(
            matches!(e, Error::Zip(_) | Error::Io(_) | Error::InvalidDocx(_)),
            "{e}"
        ),
    }
}
