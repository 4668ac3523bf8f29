#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use officeconv::{
    DocumentFamily, DocumentFormat, Error, OfficeContext, OfficeDocument, PropertyMap, PropertySet, PropertyValue,
    Refreshable, StyleFamilies,
};

pub const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<w:body>
<w:p><w:pPr><w:sectPr><w:headerReference w:type="default" r:id="rId7"/><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:pPr><w:r><w:t>First section</w:t></w:r></w:p>
<w:p><w:r><w:t>Hello</w:t></w:r></w:p>
<w:sectPr><w:headerReference w:type="default" r:id="rId8"/><w:footerReference w:type="default" r:id="rId9"/><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/><w:cols w:space="720"/><w:docGrid w:linePitch="360"/></w:sectPr>
</w:body>
</w:document>"#;

pub const SETTINGS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:zoom w:percent="100"/><w:defaultTabStop w:val="720"/><w:compat/></w:settings>"#;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

/// Builds a minimal DOCX package in memory.
pub fn build_docx(document_xml: &str, settings_xml: Option<&str>) -> Vec<u8> {
    let mut parts = vec![
        ("[Content_Types].xml", CONTENT_TYPES),
        ("word/document.xml", document_xml),
    ];
    if let Some(settings) = settings_xml {
        parts.push(("word/settings.xml", settings));
    }
    build_zip(&parts)
}

pub fn build_zip(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn read_part(package: &[u8], name: &str) -> String {
    let mut zip = zip::ZipArchive::new(Cursor::new(package)).unwrap();
    let mut text = String::new();
    zip.by_name(name).unwrap().read_to_string(&mut text).unwrap();
    text
}

/// Property set that records what was set and can refuse one property.
#[derive(Default)]
pub struct RecordingProps {
    pub values: PropertyMap,
    pub refuse: Option<&'static str>,
}

impl PropertySet for RecordingProps {
    fn property(&self, name: &str) -> Result<PropertyValue, Error> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownProperty(name.to_string()))
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), Error> {
        if self.refuse == Some(name) {
            return Err(Error::UnknownProperty(name.to_string()));
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockStyles {
    pub families: HashMap<String, HashMap<String, RecordingProps>>,
}

impl MockStyles {
    pub fn with_page_styles(names: &[&str]) -> Self {
        let styles = names
            .iter()
            .map(|name| (name.to_string(), RecordingProps::default()))
            .collect();
        let mut families = HashMap::new();
        families.insert("PageStyles".to_string(), styles);
        MockStyles { families }
    }

    pub fn page_style(&self, name: &str) -> &RecordingProps {
        &self.families["PageStyles"][name]
    }
}

impl StyleFamilies for MockStyles {
    fn has_style(&self, family: &str, name: &str) -> bool {
        self.families
            .get(family)
            .is_some_and(|styles| styles.contains_key(name))
    }

    fn style_mut(&mut self, family: &str, name: &str) -> Result<&mut dyn PropertySet, Error> {
        let styles = self
            .families
            .get_mut(family)
            .ok_or_else(|| Error::NoSuchElement(family.to_string()))?;
        let style = styles
            .get_mut(name)
            .ok_or_else(|| Error::NoSuchElement(name.to_string()))?;
        Ok(style)
    }
}

#[derive(Default)]
pub struct RefreshCounter(pub u32);

impl Refreshable for RefreshCounter {
    fn refresh(&mut self) {
        self.0 += 1;
    }
}

/// A document whose capabilities are switched on one by one.
#[derive(Default)]
pub struct MockDocument {
    pub family: Option<DocumentFamily>,
    pub line_numbering: Option<RecordingProps>,
    pub styles: Option<MockStyles>,
    pub refresh: Option<RefreshCounter>,
}

impl MockDocument {
    /// A text document supporting every capability, with a "Default Style" page style.
    pub fn text() -> Self {
        MockDocument {
            family: Some(DocumentFamily::Text),
            line_numbering: Some(RecordingProps::default()),
            styles: Some(MockStyles::with_page_styles(&["Default Style"])),
            refresh: Some(RefreshCounter::default()),
        }
    }

    pub fn of_family(family: DocumentFamily) -> Self {
        MockDocument {
            family: Some(family),
            ..Default::default()
        }
    }
}

impl OfficeDocument for MockDocument {
    fn family(&self) -> Option<DocumentFamily> {
        self.family
    }

    fn line_numbering(&mut self) -> Option<&mut dyn PropertySet> {
        self.line_numbering
            .as_mut()
            .map(|props| props as &mut dyn PropertySet)
    }

    fn style_families(&mut self) -> Option<&mut dyn StyleFamilies> {
        self.styles
            .as_mut()
            .map(|styles| styles as &mut dyn StyleFamilies)
    }

    fn refreshable(&mut self) -> Option<&mut dyn Refreshable> {
        self.refresh
            .as_mut()
            .map(|counter| counter as &mut dyn Refreshable)
    }
}

/// Office context that hands out mock documents and records every call.
pub struct MockContext {
    pub family: Option<DocumentFamily>,
    pub fail_store: bool,
    pub loaded: Vec<(PathBuf, PropertyMap)>,
    pub stored: Vec<(PathBuf, PropertyMap)>,
    pub stored_extensions: Vec<String>,
    pub line_numbering_seen: Vec<PropertyMap>,
    pub closed: usize,
}

impl MockContext {
    pub fn new(family: Option<DocumentFamily>) -> Self {
        MockContext {
            family,
            fail_store: false,
            loaded: Vec::new(),
            stored: Vec::new(),
            stored_extensions: Vec::new(),
            line_numbering_seen: Vec::new(),
            closed: 0,
        }
    }
}

impl OfficeContext for MockContext {
    type Document = MockDocument;

    fn load(&mut self, input: &Path, properties: &PropertyMap) -> Result<MockDocument, Error> {
        self.loaded.push((input.to_path_buf(), properties.clone()));
        let mut document = MockDocument::text();
        document.family = self.family;
        Ok(document)
    }

    fn store(
        &mut self,
        document: &MockDocument,
        output: &Path,
        output_format: &DocumentFormat,
        properties: &PropertyMap,
    ) -> Result<(), Error> {
        if let Some(props) = &document.line_numbering {
            self.line_numbering_seen.push(props.values.clone());
        }
        if self.fail_store {
            return Err(Error::Store("refused".into()));
        }
        self.stored.push((output.to_path_buf(), properties.clone()));
        self.stored_extensions.push(output_format.extension.clone());
        Ok(())
    }

    fn close(&mut self, _document: MockDocument) {
        self.closed += 1;
    }
}

/// An existing scratch file with the given extension.
pub fn scratch_input(extension: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{extension}"))
        .tempfile()
        .unwrap();
    file.write_all(b"placeholder").unwrap();
    file
}
