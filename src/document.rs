//! What a loaded document can do.
//!
//! A loaded document exposes a small, fixed set of optional capabilities.
//! Each accessor returns `None` when the document does not support it, so
//! callers never have to inspect concrete types.

use crate::error::Error;
use crate::format::DocumentFamily;
use crate::props::PropertySet;

/// Style family holding page styles.
pub const PAGE_STYLES: &str = "PageStyles";

pub trait OfficeDocument {
    /// Family of the loaded document, if it could be determined.
    fn family(&self) -> Option<DocumentFamily>;

    /// Document-wide line numbering settings (text documents).
    fn line_numbering(&mut self) -> Option<&mut dyn PropertySet> {
        None
    }

    fn style_families(&mut self) -> Option<&mut dyn StyleFamilies> {
        None
    }

    fn refreshable(&mut self) -> Option<&mut dyn Refreshable> {
        None
    }
}

/// Named styles grouped by family (`PageStyles`, `ParagraphStyles`, ...).
pub trait StyleFamilies {
    fn has_style(&self, family: &str, name: &str) -> bool;

    /// Fails with [`Error::NoSuchElement`] if either the family or the style is missing.
    fn style_mut(&mut self, family: &str, name: &str) -> Result<&mut dyn PropertySet, Error>;
}

/// Recomputes derived content (fields, indexes) after the document changed.
pub trait Refreshable {
    fn refresh(&mut self);
}
