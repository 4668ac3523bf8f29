pub mod converter;
pub mod document;
mod error;
pub mod format;
pub mod office;
pub mod ooxml;
pub mod package;
pub mod props;
pub mod registry;
pub mod task;

pub use converter::DocumentConverter;
pub use document::{OfficeDocument, Refreshable, StyleFamilies};
pub use error::Error;
pub use format::{DocumentFamily, DocumentFormat};
pub use office::{OfficeConfig, SofficeContext};
pub use props::{PropertyMap, PropertySet, PropertyValue};
pub use registry::FormatRegistry;
pub use task::{ConversionTask, OfficeContext};

use std::path::Path;

/// Converts `input` to the format given by `output`'s extension using the
/// office installation found from the environment.
pub fn convert(input: &Path, output: &Path) -> Result<(), Error> {
    let context = SofficeContext::new(&OfficeConfig::from_env())?;
    DocumentConverter::new(context).convert(input, output)
}
