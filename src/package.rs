use std::io::{Cursor, Read};
use std::path::Path;

use crate::document::{OfficeDocument, Refreshable, StyleFamilies};
use crate::error::Error;
use crate::format::DocumentFamily;
use crate::ooxml::WordPackage;
use crate::props::PropertySet;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Family of a document from its content, falling back to its file name.
pub fn detect_family(file_name: &str, bytes: &[u8]) -> Option<DocumentFamily> {
    if bytes.starts_with(ZIP_MAGIC)
        && let Some(family) = family_from_package(bytes)
    {
        return Some(family);
    }
    family_from_extension(file_name)
}

fn family_from_package(bytes: &[u8]) -> Option<DocumentFamily> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;

    // ODF: the first entry is an uncompressed "mimetype"
    if let Ok(mut file) = zip.by_name("mimetype") {
        let mut mimetype = String::new();
        if file.read_to_string(&mut mimetype).is_ok() {
            let mimetype = mimetype.trim();
            let family = match mimetype.strip_prefix("application/vnd.oasis.opendocument.") {
                Some(kind) if kind.starts_with("text") => Some(DocumentFamily::Text),
                Some(kind) if kind.starts_with("spreadsheet") => Some(DocumentFamily::Spreadsheet),
                Some(kind) if kind.starts_with("presentation") => Some(DocumentFamily::Presentation),
                Some(kind) if kind.starts_with("graphics") => Some(DocumentFamily::Drawing),
                _ => None,
            };
            if family.is_some() {
                return family;
            }
        }
    }

    // OOXML: look for the main part of each application
    let names: Vec<&str> = zip.file_names().collect();
    if names.contains(&"word/document.xml") {
        Some(DocumentFamily::Text)
    } else if names.contains(&"xl/workbook.xml") {
        Some(DocumentFamily::Spreadsheet)
    } else if names.contains(&"ppt/presentation.xml") {
        Some(DocumentFamily::Presentation)
    } else {
        None
    }
}

fn family_from_extension(file_name: &str) -> Option<DocumentFamily> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    match ext.as_str() {
        "doc" | "docx" | "docm" | "dot" | "dotx" | "odt" | "ott" | "sxw" | "rtf" | "txt"
        | "html" | "htm" | "xhtml" | "wpd" | "wps" | "wiki" | "fodt" => Some(DocumentFamily::Text),
        "xls" | "xlsx" | "xlsm" | "xlt" | "xltx" | "ods" | "ots" | "sxc" | "csv" | "tsv"
        | "fods" => Some(DocumentFamily::Spreadsheet),
        "ppt" | "pptx" | "pptm" | "pps" | "ppsx" | "pot" | "potx" | "odp" | "otp" | "sxi"
        | "fodp" => Some(DocumentFamily::Presentation),
        "odg" | "otg" | "sxd" | "vsd" | "vsdx" | "fodg" => Some(DocumentFamily::Drawing),
        _ => None,
    }
}

/// A document the office suite will open unchanged.
#[derive(Clone, Debug)]
pub struct OpaquePackage {
    data: Vec<u8>,
    family: Option<DocumentFamily>,
}

impl OpaquePackage {
    pub fn new(data: Vec<u8>, family: Option<DocumentFamily>) -> Self {
        OpaquePackage { data, family }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl OfficeDocument for OpaquePackage {
    fn family(&self) -> Option<DocumentFamily> {
        self.family
    }
}

/// A document as held by [`crate::office::SofficeContext`] between load and store.
#[derive(Clone, Debug)]
pub enum LoadedDocument {
    Word(WordPackage),
    Opaque(OpaquePackage),
}

impl LoadedDocument {
    /// Reads `path`, opening WordprocessingML packages so they can be modified.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_bytes(&file_name, bytes)
    }

    pub fn from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Self, Error> {
        let family = detect_family(file_name, &bytes);
        if family == Some(DocumentFamily::Text) && bytes.starts_with(ZIP_MAGIC) && is_wordprocessing(&bytes) {
            return WordPackage::from_bytes(&bytes).map(LoadedDocument::Word);
        }
        log::debug!("{file_name}: opaque {} document", family.map_or("unknown", |f| f.as_str()));
        Ok(LoadedDocument::Opaque(OpaquePackage::new(bytes, family)))
    }

    /// Bytes to hand to the office suite, with modifications applied.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        match self {
            LoadedDocument::Word(package) => package.to_bytes(),
            LoadedDocument::Opaque(package) => Ok(package.data().to_vec()),
        }
    }

    fn inner_mut(&mut self) -> &mut dyn OfficeDocument {
        match self {
            LoadedDocument::Word(package) => package,
            LoadedDocument::Opaque(package) => package,
        }
    }
}

fn is_wordprocessing(bytes: &[u8]) -> bool {
    zip::ZipArchive::new(Cursor::new(bytes))
        .map(|zip| zip.file_names().any(|n| n == "word/document.xml"))
        .unwrap_or(false)
}

impl OfficeDocument for LoadedDocument {
    fn family(&self) -> Option<DocumentFamily> {
        match self {
            LoadedDocument::Word(package) => package.family(),
            LoadedDocument::Opaque(package) => package.family(),
        }
    }

    fn line_numbering(&mut self) -> Option<&mut dyn PropertySet> {
        self.inner_mut().line_numbering()
    }

    fn style_families(&mut self) -> Option<&mut dyn StyleFamilies> {
        self.inner_mut().style_families()
    }

    fn refreshable(&mut self) -> Option<&mut dyn Refreshable> {
        self.inner_mut().refreshable()
    }
}
