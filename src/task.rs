use std::path::{Path, PathBuf};

use crate::document::{OfficeDocument, PAGE_STYLES};
use crate::error::Error;
use crate::format::DocumentFormat;
use crate::props::{PropertyMap, PropertySet, PropertyValue};

/// Page style names tried in order; the default page style is called
/// "Default Style" in newer suites and "Default" in older ones.
const DEFAULT_PAGE_STYLE: &str = "Default Style";
const FALLBACK_PAGE_STYLE: &str = "Default";

/// Access to a running office suite, as far as one conversion needs it.
pub trait OfficeContext {
    type Document: OfficeDocument;

    fn load(&mut self, input: &Path, properties: &PropertyMap) -> Result<Self::Document, Error>;

    /// Stores `document` at `output` in `output_format`. The format decides
    /// what is produced; `output` is only the destination path.
    fn store(
        &mut self,
        document: &Self::Document,
        output: &Path,
        output_format: &DocumentFormat,
        properties: &PropertyMap,
    ) -> Result<(), Error>;

    /// Releases the document. Called once per loaded document, also after a failed store.
    fn close(&mut self, document: Self::Document) {
        drop(document);
    }
}

/// Converts one input file to one output file in a given format.
#[derive(Clone, Debug)]
pub struct ConversionTask {
    input: PathBuf,
    output: PathBuf,
    output_format: DocumentFormat,
    input_format: Option<DocumentFormat>,
    default_load_properties: Option<PropertyMap>,
    line_numbering: bool,
}

impl ConversionTask {
    pub fn new(input: &Path, output: &Path, output_format: DocumentFormat) -> Self {
        ConversionTask {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            output_format,
            input_format: None,
            default_load_properties: None,
            line_numbering: false,
        }
    }

    pub fn set_default_load_properties(&mut self, properties: PropertyMap) {
        self.default_load_properties = Some(properties);
    }

    pub fn set_input_format(&mut self, format: DocumentFormat) {
        self.input_format = Some(format);
    }

    pub fn set_line_numbering(&mut self, enabled: bool) {
        self.line_numbering = enabled;
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn output_format(&self) -> &DocumentFormat {
        &self.output_format
    }

    /// Loads, modifies and stores the document. The document is closed even
    /// when storing fails.
    pub fn execute<C: OfficeContext>(&self, context: &mut C) -> Result<(), Error> {
        if !self.input.exists() {
            return Err(Error::InputNotFound(self.input.clone()));
        }
        if same_file(&self.input, &self.output) {
            return Err(Error::OutputIsInput(self.output.clone()));
        }

        log::info!(
            "converting {} to {} ({})",
            self.input.display(),
            self.output.display(),
            self.output_format.name
        );

        let load_properties = self.load_properties();
        let mut document = context.load(&self.input, &load_properties)?;

        self.modify_document(&mut document, self.line_numbering);

        let result = self
            .store_properties(&document)
            .and_then(|properties| {
                context.store(&document, &self.output, &self.output_format, properties)
            });
        context.close(document);
        result
    }

    /// Post-load mutations. Failures are logged and never abort the conversion.
    pub fn modify_document(&self, document: &mut dyn OfficeDocument, enable_line_numbering: bool) {
        if enable_line_numbering {
            match document.line_numbering() {
                Some(props) => {
                    if let Err(e) = enable_line_numbers(props) {
                        log::warn!("could not set line numbering: {e}");
                    }
                }
                None => log::warn!("document does not support line numbering"),
            }
        }

        if let Err(e) = hide_header_and_footer(document) {
            log::warn!("could not turn off header and footer: {e}");
        }

        if let Some(refreshable) = document.refreshable() {
            refreshable.refresh();
        }
    }

    /// Default load properties overlaid with the input format's own; the
    /// format-specific entries win.
    pub fn load_properties(&self) -> PropertyMap {
        let mut properties = self.default_load_properties.clone().unwrap_or_default();
        if let Some(format_properties) = self
            .input_format
            .as_ref()
            .and_then(|f| f.load_properties.as_ref())
        {
            properties.extend(
                format_properties
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            );
        }
        properties
    }

    /// Store properties of the output format for the loaded document's family.
    pub fn store_properties(&self, document: &dyn OfficeDocument) -> Result<&PropertyMap, Error> {
        let family = document.family().ok_or(Error::UnknownFamily)?;
        self.output_format
            .store_properties(family)
            .ok_or_else(|| Error::UnsupportedConversion {
                family,
                format: self.output_format.name.clone(),
            })
    }
}

/// Whether `a` and `b` name the same file. A path that does not exist yet
/// is never the same as another.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn enable_line_numbers(props: &mut dyn PropertySet) -> Result<(), Error> {
    props.set_property("IsOn", PropertyValue::Bool(true))?;
    props.set_property("CountEmptyLines", PropertyValue::Bool(false))?;
    props.set_property("RestartAtEachPage", PropertyValue::Bool(false))?;
    props.set_property("Interval", PropertyValue::Short(1))?;
    Ok(())
}

fn hide_header_and_footer(document: &mut dyn OfficeDocument) -> Result<(), Error> {
    let families = document
        .style_families()
        .ok_or_else(|| Error::NoSuchElement("style families".into()))?;

    let name = if families.has_style(PAGE_STYLES, DEFAULT_PAGE_STYLE) {
        DEFAULT_PAGE_STYLE
    } else {
        FALLBACK_PAGE_STYLE
    };
    let style = families.style_mut(PAGE_STYLES, name)?;
    log::debug!("switching off header and footer on page style {name:?}");

    style.set_property("HeaderIsOn", PropertyValue::Bool(false))?;
    style.set_property("FooterIsOn", PropertyValue::Bool(false))?;
    Ok(())
}
