use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::format::DocumentFamily;

#[derive(Debug)]
pub enum Error {
    InvalidDocx(String),
    Zip(zip::result::ZipError),
    Xml(roxmltree::Error),
    Json(serde_json::Error),
    Io(std::io::Error),
    InputNotFound(PathBuf),
    OutputIsInput(PathBuf),
    UnsupportedFormat(String),
    UnknownFamily,
    UnsupportedConversion { family: DocumentFamily, format: String },
    UnknownProperty(String),
    IllegalArgument(String),
    NoSuchElement(String),
    Load(String),
    Store(String),
    OfficeNotFound,
    Office(String),
    Timeout(Duration),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDocx(reason) => write!(f, "not a valid DOCX file: {reason}"),
            Error::Zip(e) => write!(f, "ZIP error: {e}"),
            Error::Xml(e) => write!(f, "XML error: {e}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::InputNotFound(path) => write!(f, "input document not found: {}", path.display()),
            Error::OutputIsInput(path) => {
                write!(f, "output would overwrite the input document: {}", path.display())
            }
            Error::UnsupportedFormat(ext) => write!(f, "unsupported document format: {ext}"),
            Error::UnknownFamily => write!(f, "document of unknown family"),
            Error::UnsupportedConversion { family, format } => {
                write!(f, "unsupported conversion: {family} document to {format}")
            }
            Error::UnknownProperty(name) => write!(f, "unknown property: {name}"),
            Error::IllegalArgument(reason) => write!(f, "illegal argument: {reason}"),
            Error::NoSuchElement(name) => write!(f, "no such element: {name}"),
            Error::Load(reason) => write!(f, "could not load document: {reason}"),
            Error::Store(reason) => write!(f, "could not store document: {reason}"),
            Error::OfficeNotFound => write!(f, "no office installation found (set OFFICE_HOME)"),
            Error::Office(reason) => write!(f, "office process failed: {reason}"),
            Error::Timeout(limit) => {
                write!(f, "office task did not complete within {}s", limit.as_secs())
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Xml(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
