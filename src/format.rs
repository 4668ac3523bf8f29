use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::props::PropertyMap;

/// Coarse classification of a document, used to pick export filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentFamily {
    Text,
    Spreadsheet,
    Presentation,
    Drawing,
}

impl DocumentFamily {
    pub const ALL: [DocumentFamily; 4] = [
        DocumentFamily::Text,
        DocumentFamily::Spreadsheet,
        DocumentFamily::Presentation,
        DocumentFamily::Drawing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFamily::Text => "text",
            DocumentFamily::Spreadsheet => "spreadsheet",
            DocumentFamily::Presentation => "presentation",
            DocumentFamily::Drawing => "drawing",
        }
    }

    pub fn from_name(name: &str) -> Option<DocumentFamily> {
        Self::ALL
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for DocumentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFormat {
    pub name: String,
    pub extension: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_family: Option<DocumentFamily>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_properties: Option<PropertyMap>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub store_properties_by_family: HashMap<DocumentFamily, PropertyMap>,
}

impl DocumentFormat {
    pub fn new(name: &str, extension: &str, media_type: &str) -> Self {
        DocumentFormat {
            name: name.to_string(),
            extension: extension.to_string(),
            media_type: media_type.to_string(),
            input_family: None,
            load_properties: None,
            store_properties_by_family: HashMap::new(),
        }
    }

    pub fn with_input_family(mut self, family: DocumentFamily) -> Self {
        self.input_family = Some(family);
        self
    }

    pub fn with_load_properties(mut self, properties: PropertyMap) -> Self {
        self.load_properties = Some(properties);
        self
    }

    pub fn with_store_properties(mut self, family: DocumentFamily, properties: PropertyMap) -> Self {
        self.store_properties_by_family.insert(family, properties);
        self
    }

    pub fn set_store_properties(&mut self, family: DocumentFamily, properties: PropertyMap) {
        self.store_properties_by_family.insert(family, properties);
    }

    /// Store options for a document of `family`, or `None` if this format
    /// cannot be produced from that family.
    pub fn store_properties(&self, family: DocumentFamily) -> Option<&PropertyMap> {
        self.store_properties_by_family.get(&family)
    }

    pub fn is_output_for(&self, family: DocumentFamily) -> bool {
        self.store_properties_by_family.contains_key(&family)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (.{})", self.name, self.extension)
    }
}
