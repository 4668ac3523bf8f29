//! Known document formats and the filters the office suite uses for them.

use std::path::Path;

use crate::error::Error;
use crate::format::{DocumentFamily, DocumentFormat};
use crate::props::{PropertyMap, property_map};

#[derive(Clone, Debug)]
pub struct FormatRegistry {
    formats: Vec<DocumentFormat>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        FormatRegistry::standard()
    }
}

fn filter(name: &str) -> PropertyMap {
    property_map([("FilterName", name)])
}

fn filter_with_options(name: &str, options: &str) -> PropertyMap {
    property_map([("FilterName", name), ("FilterOptions", options)])
}

impl FormatRegistry {
    pub fn empty() -> Self {
        FormatRegistry { formats: Vec::new() }
    }

    /// The formats LibreOffice and OpenOffice can import and export out of the box.
    pub fn standard() -> Self {
        use DocumentFamily::*;

        let mut registry = FormatRegistry::empty();

        registry.add_format(
            DocumentFormat::new("Portable Document Format", "pdf", "application/pdf")
                .with_store_properties(Text, filter("writer_pdf_Export"))
                .with_store_properties(Spreadsheet, filter("calc_pdf_Export"))
                .with_store_properties(Presentation, filter("impress_pdf_Export"))
                .with_store_properties(Drawing, filter("draw_pdf_Export")),
        );
        registry.add_format(
            DocumentFormat::new("Macromedia Flash", "swf", "application/x-shockwave-flash")
                .with_store_properties(Presentation, filter("impress_flash_Export"))
                .with_store_properties(Drawing, filter("draw_flash_Export")),
        );
        // HTML can be imported as text or spreadsheet; text is the common case
        registry.add_format(
            DocumentFormat::new("HTML", "html", "text/html")
                .with_input_family(Text)
                .with_store_properties(Text, filter("HTML (StarWriter)"))
                .with_store_properties(Spreadsheet, filter("HTML (StarCalc)"))
                .with_store_properties(Presentation, filter("impress_html_Export")),
        );

        registry.add_format(
            DocumentFormat::new("OpenDocument Text", "odt", "application/vnd.oasis.opendocument.text")
                .with_input_family(Text)
                .with_store_properties(Text, filter("writer8")),
        );
        registry.add_format(
            DocumentFormat::new("OpenOffice.org 1.0 Text Document", "sxw", "application/vnd.sun.xml.writer")
                .with_input_family(Text)
                .with_store_properties(Text, filter("StarOffice XML (Writer)")),
        );
        registry.add_format(
            DocumentFormat::new("Microsoft Word", "doc", "application/msword")
                .with_input_family(Text)
                .with_store_properties(Text, filter("MS Word 97")),
        );
        registry.add_format(
            DocumentFormat::new(
                "Microsoft Word 2007-2013 XML",
                "docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            )
            .with_input_family(Text)
            .with_store_properties(Text, filter("MS Word 2007 XML")),
        );
        registry.add_format(
            DocumentFormat::new("Rich Text Format", "rtf", "text/rtf")
                .with_input_family(Text)
                .with_store_properties(Text, filter("Rich Text Format")),
        );
        registry.add_format(
            DocumentFormat::new("WordPerfect", "wpd", "application/wordperfect").with_input_family(Text),
        );
        registry.add_format(
            DocumentFormat::new("Plain Text", "txt", "text/plain")
                .with_input_family(Text)
                .with_load_properties(filter_with_options("Text (encoded)", "utf8"))
                .with_store_properties(Text, filter_with_options("Text (encoded)", "utf8")),
        );
        registry.add_format(
            DocumentFormat::new("MediaWiki wikitext", "wiki", "text/x-wiki")
                .with_store_properties(Text, filter("MediaWiki")),
        );

        registry.add_format(
            DocumentFormat::new(
                "OpenDocument Spreadsheet",
                "ods",
                "application/vnd.oasis.opendocument.spreadsheet",
            )
            .with_input_family(Spreadsheet)
            .with_store_properties(Spreadsheet, filter("calc8")),
        );
        registry.add_format(
            DocumentFormat::new("OpenOffice.org 1.0 Spreadsheet", "sxc", "application/vnd.sun.xml.calc")
                .with_input_family(Spreadsheet)
                .with_store_properties(Spreadsheet, filter("StarOffice XML (Calc)")),
        );
        registry.add_format(
            DocumentFormat::new("Microsoft Excel", "xls", "application/vnd.ms-excel")
                .with_input_family(Spreadsheet)
                .with_store_properties(Spreadsheet, filter("MS Excel 97")),
        );
        registry.add_format(
            DocumentFormat::new(
                "Microsoft Excel 2007-2013 XML",
                "xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            )
            .with_input_family(Spreadsheet)
            .with_store_properties(Spreadsheet, filter("Calc MS Excel 2007 XML")),
        );
        // FilterOptions: field separator, text delimiter, charset (0 = system)
        registry.add_format(
            DocumentFormat::new("Comma Separated Values", "csv", "text/csv")
                .with_input_family(Spreadsheet)
                .with_load_properties(filter_with_options("Text - txt - csv (StarCalc)", "44,34,0"))
                .with_store_properties(
                    Spreadsheet,
                    filter_with_options("Text - txt - csv (StarCalc)", "44,34,0"),
                ),
        );
        registry.add_format(
            DocumentFormat::new("Tab Separated Values", "tsv", "text/tab-separated-values")
                .with_input_family(Spreadsheet)
                .with_load_properties(filter_with_options("Text - txt - csv (StarCalc)", "9,34,0"))
                .with_store_properties(
                    Spreadsheet,
                    filter_with_options("Text - txt - csv (StarCalc)", "9,34,0"),
                ),
        );

        registry.add_format(
            DocumentFormat::new(
                "OpenDocument Presentation",
                "odp",
                "application/vnd.oasis.opendocument.presentation",
            )
            .with_input_family(Presentation)
            .with_store_properties(Presentation, filter("impress8")),
        );
        registry.add_format(
            DocumentFormat::new("OpenOffice.org 1.0 Presentation", "sxi", "application/vnd.sun.xml.impress")
                .with_input_family(Presentation)
                .with_store_properties(Presentation, filter("StarOffice XML (Impress)")),
        );
        registry.add_format(
            DocumentFormat::new("Microsoft PowerPoint", "ppt", "application/vnd.ms-powerpoint")
                .with_input_family(Presentation)
                .with_store_properties(Presentation, filter("MS PowerPoint 97")),
        );
        registry.add_format(
            DocumentFormat::new(
                "Microsoft PowerPoint 2007-2013 XML",
                "pptx",
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            )
            .with_input_family(Presentation)
            .with_store_properties(Presentation, filter("Impress MS PowerPoint 2007 XML")),
        );

        registry.add_format(
            DocumentFormat::new("OpenDocument Drawing", "odg", "application/vnd.oasis.opendocument.graphics")
                .with_input_family(Drawing)
                .with_store_properties(Drawing, filter("draw8")),
        );
        registry.add_format(
            DocumentFormat::new("Scalable Vector Graphics", "svg", "image/svg+xml")
                .with_store_properties(Drawing, filter("draw_svg_Export")),
        );
        registry.add_format(
            DocumentFormat::new("Portable Network Graphic", "png", "image/png")
                .with_store_properties(Presentation, filter("impress_png_Export"))
                .with_store_properties(Drawing, filter("draw_png_Export")),
        );

        registry
    }

    /// Parses a registry from a JSON array of formats.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let formats: Vec<DocumentFormat> = serde_json::from_str(json)?;
        let mut registry = FormatRegistry::empty();
        for format in formats {
            registry.add_format(format);
        }
        Ok(registry)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        let registry = Self::from_json(&json)?;
        log::debug!("loaded {} formats from {}", registry.formats.len(), path.display());
        Ok(registry)
    }

    /// Adds a format; a later format with the same extension replaces the earlier one.
    pub fn add_format(&mut self, format: DocumentFormat) {
        self.formats
            .retain(|f| !f.extension.eq_ignore_ascii_case(&format.extension));
        self.formats.push(format);
    }

    pub fn format_by_extension(&self, extension: &str) -> Option<&DocumentFormat> {
        let extension = extension.trim_start_matches('.');
        self.formats
            .iter()
            .find(|f| f.extension.eq_ignore_ascii_case(extension))
    }

    pub fn format_by_media_type(&self, media_type: &str) -> Option<&DocumentFormat> {
        self.formats
            .iter()
            .find(|f| f.media_type.eq_ignore_ascii_case(media_type))
    }

    /// Format for a file path, by its extension.
    pub fn format_for_path(&self, path: &Path) -> Option<&DocumentFormat> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.format_by_extension(ext))
    }

    pub fn output_formats(&self, family: DocumentFamily) -> Vec<&DocumentFormat> {
        self.formats.iter().filter(|f| f.is_output_for(family)).collect()
    }

    pub fn formats(&self) -> &[DocumentFormat] {
        &self.formats
    }
}
