use std::path::Path;

use crate::error::Error;
use crate::format::DocumentFormat;
use crate::props::{PropertyMap, PropertyValue};
use crate::registry::FormatRegistry;
use crate::task::{ConversionTask, OfficeContext};

/// `UpdateDocMode` value that updates links without asking.
pub const QUIET_UPDATE: i16 = 1;

/// Load properties applied to every input before format-specific ones.
pub fn default_load_properties() -> PropertyMap {
    let mut properties = PropertyMap::new();
    properties.insert("Hidden".into(), PropertyValue::Bool(true));
    properties.insert("ReadOnly".into(), PropertyValue::Bool(true));
    properties.insert("UpdateDocMode".into(), PropertyValue::Short(QUIET_UPDATE));
    properties
}

/// Picks formats by file extension and runs conversion tasks on an office context.
pub struct DocumentConverter<C> {
    context: C,
    registry: FormatRegistry,
    default_load_properties: PropertyMap,
    line_numbering: bool,
}

impl<C: OfficeContext> DocumentConverter<C> {
    pub fn new(context: C) -> Self {
        DocumentConverter {
            context,
            registry: FormatRegistry::standard(),
            default_load_properties: default_load_properties(),
            line_numbering: false,
        }
    }

    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_line_numbering(mut self, enabled: bool) -> Self {
        self.line_numbering = enabled;
        self
    }

    pub fn set_default_load_properties(&mut self, properties: PropertyMap) {
        self.default_load_properties = properties;
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    /// Converts `input` to the format named by `output`'s extension.
    pub fn convert(&mut self, input: &Path, output: &Path) -> Result<(), Error> {
        let output_format = self
            .registry
            .format_for_path(output)
            .cloned()
            .ok_or_else(|| Error::UnsupportedFormat(extension_of(output)))?;
        self.convert_to(input, output, &output_format)
    }

    pub fn convert_to(
        &mut self,
        input: &Path,
        output: &Path,
        output_format: &DocumentFormat,
    ) -> Result<(), Error> {
        let mut task = ConversionTask::new(input, output, output_format.clone());
        task.set_default_load_properties(self.default_load_properties.clone());
        task.set_line_numbering(self.line_numbering);
        match self.registry.format_for_path(input) {
            Some(input_format) => task.set_input_format(input_format.clone()),
            None => log::debug!("no known format for {}; the office will detect it", input.display()),
        }
        task.execute(&mut self.context)
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
