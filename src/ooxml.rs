//! In-memory WordprocessingML (DOCX) package with the capabilities the
//! conversion task needs.
//!
//! Only `word/document.xml` section properties and `word/settings.xml` are
//! ever rewritten, and only when a setting actually changed. A package without
//! a settings part gets one, registered in `[Content_Types].xml` and the
//! document relationships, when field updates are requested. Edits are
//! spliced into the source XML text, so everything else in the package
//! round-trips byte for byte.

use std::io::{Cursor, Read, Write};
use std::ops::Range;
use std::path::Path;

use crate::document::{OfficeDocument, PAGE_STYLES, Refreshable, StyleFamilies};
use crate::error::Error;
use crate::format::DocumentFamily;
use crate::props::{PropertySet, PropertyValue, expect_bool};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const DOCUMENT_PART: &str = "word/document.xml";
const SETTINGS_PART: &str = "word/settings.xml";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

const SETTINGS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml";
const SETTINGS_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
const PACKAGE_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Name under which the body's page setup is exposed as a page style.
pub const PAGE_STYLE_NAME: &str = "Default Style";

/// `w:sectPr` children that must follow `w:lnNumType`.
const AFTER_LN_NUM_TYPE: &[&str] = &[
    "pgNumType",
    "cols",
    "formProt",
    "vAlign",
    "noEndnote",
    "titlePg",
    "textDirection",
    "bidi",
    "rtlGutter",
    "docGrid",
    "printerSettings",
    "sectPrChange",
];

/// `w:settings` children that must follow `w:updateFields`.
const AFTER_UPDATE_FIELDS: &[&str] = &[
    "hdrShapeDefaults",
    "footnotePr",
    "endnotePr",
    "compat",
    "docVars",
    "rsids",
    "mathPr",
    "attachedSchema",
    "themeFontLang",
    "clrSchemeMapping",
    "doNotIncludeSubdocsInStats",
    "doNotAutoCompressPictures",
    "forceUpgrade",
    "captions",
    "readModeInkLockDown",
    "smartTagType",
    "schemaLibrary",
    "shapeDefaults",
    "doNotEmbedSmartTags",
    "decimalSymbol",
    "listSeparator",
];

fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| is_wml(*n, name))
}

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

/// Section properties in effect; those recorded inside `w:sectPrChange`
/// revision marks are history and never count or change.
fn live_sections<'a, 'input: 'a>(
    xml: &'a roxmltree::Document<'input>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    xml.descendants().filter(|n| {
        is_wml(*n, "sectPr") && !n.parent().is_some_and(|p| is_wml(p, "sectPrChange"))
    })
}

fn is_on_off(val: Option<&str>) -> bool {
    !matches!(val, Some("false" | "0" | "off"))
}

/// Line numbering settings applied to every section of the document.
#[derive(Clone, Debug, PartialEq)]
pub struct LineNumbering {
    pub is_on: bool,
    /// Kept for the office suite's property model; WordprocessingML has no
    /// equivalent, so it is not written back.
    pub count_empty_lines: bool,
    pub restart_at_each_page: bool,
    pub interval: i16,
    changed: bool,
}

impl Default for LineNumbering {
    fn default() -> Self {
        LineNumbering {
            is_on: false,
            count_empty_lines: true,
            restart_at_each_page: false,
            interval: 1,
            changed: false,
        }
    }
}

impl PropertySet for LineNumbering {
    fn property(&self, name: &str) -> Result<PropertyValue, Error> {
        match name {
            "IsOn" => Ok(self.is_on.into()),
            "CountEmptyLines" => Ok(self.count_empty_lines.into()),
            "RestartAtEachPage" => Ok(self.restart_at_each_page.into()),
            "Interval" => Ok(self.interval.into()),
            _ => Err(Error::UnknownProperty(name.to_string())),
        }
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), Error> {
        match name {
            "IsOn" => self.is_on = expect_bool(name, &value)?,
            "CountEmptyLines" => self.count_empty_lines = expect_bool(name, &value)?,
            "RestartAtEachPage" => self.restart_at_each_page = expect_bool(name, &value)?,
            "Interval" => {
                self.interval = value
                    .as_short()
                    .filter(|v| *v >= 1)
                    .ok_or_else(|| Error::IllegalArgument(format!("Interval must be >= 1, got {value}")))?;
            }
            _ => return Err(Error::UnknownProperty(name.to_string())),
        }
        self.changed = true;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageStyle {
    name: String,
    pub header_is_on: bool,
    pub footer_is_on: bool,
}

impl PageStyle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PropertySet for PageStyle {
    fn property(&self, name: &str) -> Result<PropertyValue, Error> {
        match name {
            "DisplayName" => Ok(self.name.as_str().into()),
            "HeaderIsOn" => Ok(self.header_is_on.into()),
            "FooterIsOn" => Ok(self.footer_is_on.into()),
            _ => Err(Error::UnknownProperty(name.to_string())),
        }
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), Error> {
        match name {
            "HeaderIsOn" => self.header_is_on = expect_bool(name, &value)?,
            "FooterIsOn" => self.footer_is_on = expect_bool(name, &value)?,
            "DisplayName" => {
                return Err(Error::IllegalArgument("DisplayName is read-only".into()));
            }
            _ => return Err(Error::UnknownProperty(name.to_string())),
        }
        Ok(())
    }
}

/// DOCX has one page setup per section; all of them share this page style.
#[derive(Clone, Debug)]
struct WordStyles {
    page: PageStyle,
}

impl StyleFamilies for WordStyles {
    fn has_style(&self, family: &str, name: &str) -> bool {
        family == PAGE_STYLES && name == self.page.name
    }

    fn style_mut(&mut self, family: &str, name: &str) -> Result<&mut dyn PropertySet, Error> {
        if family != PAGE_STYLES {
            return Err(Error::NoSuchElement(family.to_string()));
        }
        if name != self.page.name {
            return Err(Error::NoSuchElement(name.to_string()));
        }
        Ok(&mut self.page)
    }
}

/// Asks the consuming application to update all fields on open.
#[derive(Clone, Debug, Default)]
struct FieldUpdate {
    already_set: bool,
    requested: bool,
}

impl Refreshable for FieldUpdate {
    fn refresh(&mut self) {
        self.requested = true;
    }
}

#[derive(Clone, Debug)]
struct Part {
    name: String,
    data: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct WordPackage {
    parts: Vec<Part>,
    line_numbering: LineNumbering,
    styles: WordStyles,
    fields: FieldUpdate,
}

impl WordPackage {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;

        let mut parts = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            parts.push(Part { name: file.name().to_string(), data });
        }

        let (line_numbering, header_is_on, footer_is_on) = {
            let document_xml = part_text(&parts, DOCUMENT_PART)?
                .ok_or_else(|| Error::InvalidDocx(format!("missing {DOCUMENT_PART}")))?;
            let xml = roxmltree::Document::parse(document_xml)?;
            let body = wml(xml.root_element(), "body")
                .ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

            let mut line_numbering = LineNumbering::default();
            if let Some(ln) = wml(body, "sectPr").and_then(|sect| wml(sect, "lnNumType")) {
                line_numbering.is_on = true;
                line_numbering.interval = ln
                    .attribute((WML_NS, "countBy"))
                    .and_then(|v| v.parse::<i16>().ok())
                    .filter(|v| *v >= 1)
                    .unwrap_or(1);
                line_numbering.restart_at_each_page =
                    ln.attribute((WML_NS, "restart")) == Some("newPage");
            }

            let has_reference = |name: &str| {
                live_sections(&xml).any(|sect| sect.children().any(|n| is_wml(n, name)))
            };
            (
                line_numbering,
                has_reference("headerReference"),
                has_reference("footerReference"),
            )
        };

        let already_set = match part_text(&parts, SETTINGS_PART)? {
            Some(settings_xml) => {
                let settings = roxmltree::Document::parse(settings_xml)?;
                wml(settings.root_element(), "updateFields")
                    .is_some_and(|n| is_on_off(n.attribute((WML_NS, "val"))))
            }
            None => false,
        };

        log::debug!(
            "loaded DOCX package: {} parts, line numbering {}, header {}, footer {}",
            parts.len(),
            line_numbering.is_on,
            header_is_on,
            footer_is_on
        );

        Ok(WordPackage {
            parts,
            line_numbering,
            styles: WordStyles {
                page: PageStyle {
                    name: PAGE_STYLE_NAME.to_string(),
                    header_is_on,
                    footer_is_on,
                },
            },
            fields: FieldUpdate { already_set, requested: false },
        })
    }

    pub fn line_numbering_settings(&self) -> &LineNumbering {
        &self.line_numbering
    }

    pub fn page_style(&self) -> &PageStyle {
        &self.styles.page
    }

    pub fn updates_fields(&self) -> bool {
        self.fields.already_set || self.fields.requested
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    /// Raw bytes of a package part as loaded.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// Serializes the package with all pending changes applied.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = || {
            zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated)
        };

        // a package without a settings part gets one when fields must update
        let add_settings = self.settings_part_needed();
        if add_settings {
            log::debug!("adding {SETTINGS_PART} to request field updates");
        }

        for part in &self.parts {
            writer.start_file(part.name.as_str(), options())?;

            let rewritten = match part.name.as_str() {
                DOCUMENT_PART => self.rewrite_document(&part.data)?,
                SETTINGS_PART => self.rewrite_settings(&part.data)?,
                CONTENT_TYPES_PART if add_settings => add_settings_content_type(&part.data)?,
                DOCUMENT_RELS_PART if add_settings => add_settings_relationship(&part.data)?,
                _ => None,
            };
            writer.write_all(rewritten.as_deref().map_or(&part.data[..], str::as_bytes))?;
        }

        if add_settings {
            if self.part(DOCUMENT_RELS_PART).is_none() {
                writer.start_file(DOCUMENT_RELS_PART, options())?;
                writer.write_all(new_document_rels().as_bytes())?;
            }
            writer.start_file(SETTINGS_PART, options())?;
            writer.write_all(new_settings().as_bytes())?;
        }

        Ok(writer.finish()?.into_inner())
    }

    fn settings_part_needed(&self) -> bool {
        self.fields.requested && !self.fields.already_set && self.part(SETTINGS_PART).is_none()
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        std::fs::write(path, self.to_bytes()?).map_err(Error::Io)
    }

    fn rewrite_document(&self, data: &[u8]) -> Result<Option<String>, Error> {
        let page = &self.styles.page;
        let numbering = &self.line_numbering;
        if !numbering.changed && page.header_is_on && page.footer_is_on {
            return Ok(None);
        }
        if numbering.changed && numbering.count_empty_lines {
            log::debug!("CountEmptyLines has no WordprocessingML equivalent; ignored");
        }

        let source = utf8(data, DOCUMENT_PART)?;
        let xml = roxmltree::Document::parse(source)?;
        let mut edits = Vec::new();

        for sect in live_sections(&xml) {
            for child in sect.children().filter(|n| n.is_element()) {
                let remove = (numbering.changed && is_wml(child, "lnNumType"))
                    || (!page.header_is_on && is_wml(child, "headerReference"))
                    || (!page.footer_is_on && is_wml(child, "footerReference"));
                if remove {
                    edits.push(Edit::remove(child.range()));
                }
            }

            if numbering.changed && numbering.is_on {
                let prefix = wml_prefix(source, sect);
                let restart = if numbering.restart_at_each_page { "newPage" } else { "continuous" };
                let element = format!(
                    "<{prefix}lnNumType {prefix}countBy=\"{}\" {prefix}restart=\"{restart}\"/>",
                    numbering.interval
                );
                edits.push(insert_child(source, sect, AFTER_LN_NUM_TYPE, element));
            }
        }

        Ok(Some(apply_edits(source, edits)))
    }

    fn rewrite_settings(&self, data: &[u8]) -> Result<Option<String>, Error> {
        if !self.fields.requested || self.fields.already_set {
            return Ok(None);
        }

        let source = utf8(data, SETTINGS_PART)?;
        let xml = roxmltree::Document::parse(source)?;
        let root = xml.root_element();
        let prefix = wml_prefix(source, root);
        let element = format!("<{prefix}updateFields {prefix}val=\"true\"/>");

        let edit = match wml(root, "updateFields") {
            // present but switched off
            Some(existing) => Edit { range: existing.range(), text: element },
            None => insert_child(source, root, AFTER_UPDATE_FIELDS, element),
        };
        Ok(Some(apply_edits(source, vec![edit])))
    }
}

impl OfficeDocument for WordPackage {
    fn family(&self) -> Option<DocumentFamily> {
        Some(DocumentFamily::Text)
    }

    fn line_numbering(&mut self) -> Option<&mut dyn PropertySet> {
        Some(&mut self.line_numbering)
    }

    fn style_families(&mut self) -> Option<&mut dyn StyleFamilies> {
        Some(&mut self.styles)
    }

    fn refreshable(&mut self) -> Option<&mut dyn Refreshable> {
        Some(&mut self.fields)
    }
}

fn new_settings() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:settings xmlns:w=\"{WML_NS}\"><w:updateFields w:val=\"true\"/></w:settings>"
    )
}

fn settings_relationship(id: &str) -> String {
    format!(r#"<Relationship Id="{id}" Type="{SETTINGS_REL_TYPE}" Target="settings.xml"/>"#)
}

fn new_document_rels() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"{PACKAGE_RELS_NS}\">{}</Relationships>",
        settings_relationship("rId1")
    )
}

/// Adds the settings part override to `[Content_Types].xml` unless present.
fn add_settings_content_type(data: &[u8]) -> Result<Option<String>, Error> {
    let source = utf8(data, CONTENT_TYPES_PART)?;
    let xml = roxmltree::Document::parse(source)?;
    let root = xml.root_element();
    let part_name = format!("/{SETTINGS_PART}");
    if root
        .children()
        .any(|n| n.has_tag_name("Override") && n.attribute("PartName") == Some(part_name.as_str()))
    {
        return Ok(None);
    }

    let element = format!(r#"<Override PartName="{part_name}" ContentType="{SETTINGS_CONTENT_TYPE}"/>"#);
    Ok(Some(apply_edits(source, vec![insert_child(source, root, &[], element)])))
}

/// Adds a settings relationship to the main document part unless present.
fn add_settings_relationship(data: &[u8]) -> Result<Option<String>, Error> {
    let source = utf8(data, DOCUMENT_RELS_PART)?;
    let xml = roxmltree::Document::parse(source)?;
    let root = xml.root_element();
    let relationships: Vec<_> = root
        .children()
        .filter(|n| n.has_tag_name("Relationship"))
        .collect();
    if relationships
        .iter()
        .any(|n| n.attribute("Type") == Some(SETTINGS_REL_TYPE))
    {
        return Ok(None);
    }

    let taken = |id: &str| relationships.iter().any(|n| n.attribute("Id") == Some(id));
    let id = (1..)
        .map(|n| format!("rId{n}"))
        .find(|id| !taken(id.as_str()))
        .unwrap_or_default();
    let element = settings_relationship(&id);
    Ok(Some(apply_edits(source, vec![insert_child(source, root, &[], element)])))
}

fn part_text<'a>(parts: &'a [Part], name: &str) -> Result<Option<&'a str>, Error> {
    parts
        .iter()
        .find(|p| p.name == name)
        .map(|p| utf8(&p.data, name))
        .transpose()
}

fn utf8<'a>(data: &'a [u8], part: &str) -> Result<&'a str, Error> {
    std::str::from_utf8(data).map_err(|e| Error::InvalidDocx(format!("{part} is not UTF-8: {e}")))
}

struct Edit {
    range: Range<usize>,
    text: String,
}

impl Edit {
    fn remove(range: Range<usize>) -> Self {
        Edit { range, text: String::new() }
    }
}

/// Applies non-overlapping edits to `source`.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.range.start, e.range.end));
    let mut out = String::with_capacity(source.len() + 64);
    let mut pos = 0;
    for edit in edits {
        out.push_str(&source[pos..edit.range.start]);
        out.push_str(&edit.text);
        pos = edit.range.end;
    }
    out.push_str(&source[pos..]);
    out
}

/// Qualified-name prefix (with trailing colon) used for the element in the source text.
fn wml_prefix(source: &str, node: roxmltree::Node) -> String {
    let start = node.range().start + 1;
    let qname: String = source[start..]
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
        .collect();
    match qname.split_once(':') {
        Some((prefix, _)) => format!("{prefix}:"),
        None => node
            .lookup_prefix(WML_NS)
            .map(|p| format!("{p}:"))
            .unwrap_or_default(),
    }
}

/// Inserts `element` as a child of `parent`, before the first child named in
/// `followers`, or as the last child.
fn insert_child(source: &str, parent: roxmltree::Node, followers: &[&str], element: String) -> Edit {
    if let Some(anchor) = parent
        .children()
        .find(|n| followers.iter().any(|name| is_wml(*n, name)))
    {
        let at = anchor.range().start;
        return Edit { range: at..at, text: element };
    }

    let range = parent.range();
    let text = &source[range.clone()];
    if text.ends_with("/>") {
        // <w:sectPr/> has no closing tag to insert before
        let qname = text[1..]
            .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .next()
            .unwrap_or_default();
        let open = &text[..text.len() - 2];
        return Edit {
            range,
            text: format!("{open}>{element}</{qname}>"),
        };
    }

    let close = text.rfind("</").map_or(range.end, |i| range.start + i);
    Edit { range: close..close, text: element }
}
