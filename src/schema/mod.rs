//! Pre-upload checks for a core's configuration set.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::notify::{LogEntry, SharedNotifier};

/// Oldest schema version accepted
pub const MIN_SCHEMA_VERSION: &str = "1.6";

/// Files every configuration set must contain
pub const REQUIRED_FILES: [&str; 2] = ["schema.xml", "solrconfig.xml"];

const REQUIRED_ELEMENTS: [&str; 3] = ["schema", "fields", "types"];

/// Configuration files by name.
pub type SchemaFiles = BTreeMap<String, String>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaValidationError {
    #[error("Missing required file: {0}")]
    MissingFile(String),

    #[error("Incompatible schema version: {}", .0.as_deref().unwrap_or("none"))]
    IncompatibleVersion(Option<String>),

    #[error("Invalid schema structure: {0}")]
    InvalidStructure(String),
}

/// Read every regular file in `dir` into a [`SchemaFiles`] map.
pub fn load_dir(dir: &Path) -> std::io::Result<SchemaFiles> {
    let mut files = SchemaFiles::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        files.insert(name, std::fs::read_to_string(entry.path())?);
    }
    Ok(files)
}

/// `version` attribute of the root element, if any.
pub fn extract_schema_version(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return attribute(&e, b"version").filter(|v| !v.is_empty());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

/// Compare dotted versions component by component.
///
/// Numeric components compare as numbers, anything else as text. Missing
/// trailing components count as zero, so `1.6` equals `1.6.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let split = |v: &str| -> Vec<String> {
        v.trim()
            .split(['.', '-', '_', '+'])
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    };
    let (left, right) = (split(a), split(b));

    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).map(String::as_str).unwrap_or("0");
        let r = right.get(i).map(String::as_str).unwrap_or("0");

        let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => l.cmp(r),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Checks a configuration set before it is uploaded.
pub struct SchemaValidator {
    notifier: SharedNotifier,
}

impl SchemaValidator {
    pub fn new(notifier: SharedNotifier) -> Self {
        Self { notifier }
    }

    /// Check required files, the schema version and the schema structure.
    pub fn validate_schema_compatibility(
        &self,
        files: &SchemaFiles,
    ) -> Result<(), SchemaValidationError> {
        for name in REQUIRED_FILES {
            if !files.contains_key(name) {
                return Err(SchemaValidationError::MissingFile(name.to_string()));
            }
        }

        let schema = files
            .get("schema.xml")
            .ok_or_else(|| SchemaValidationError::MissingFile("schema.xml".to_string()))?;

        let version = extract_schema_version(schema);
        if !is_compatible_version(version.as_deref()) {
            return Err(SchemaValidationError::IncompatibleVersion(version));
        }

        self.validate_schema_structure(schema)
    }

    fn validate_schema_structure(&self, schema: &str) -> Result<(), SchemaValidationError> {
        let outline = match Outline::parse(schema) {
            Ok(outline) => outline,
            Err(message) => {
                self.notifier.log(
                    LogEntry::error("Schema validation failed: @message").with("message", &message),
                );
                return Err(SchemaValidationError::InvalidStructure(message));
            }
        };

        for element in REQUIRED_ELEMENTS {
            if !outline.elements.contains(element) {
                self.notifier.log(
                    LogEntry::error("Missing required schema element: @element")
                        .with("element", element),
                );
                return Err(SchemaValidationError::InvalidStructure(format!(
                    "missing element <{element}>"
                )));
            }
        }

        for field_type in &outline.field_types {
            if !outline.declared_types.contains(field_type) {
                self.notifier.log(
                    LogEntry::error("Invalid field type reference: @type").with("type", field_type),
                );
                return Err(SchemaValidationError::InvalidStructure(format!(
                    "field references undeclared type '{field_type}'"
                )));
            }
        }

        Ok(())
    }
}

fn is_compatible_version(version: Option<&str>) -> bool {
    version.is_some_and(|v| compare_versions(v, MIN_SCHEMA_VERSION) != Ordering::Less)
}

/// Element names, field type references and declared types of a schema.
#[derive(Debug, Default)]
struct Outline {
    elements: HashSet<String>,
    /// `type` of every `<field>`, in document order
    field_types: Vec<String>,
    /// `name` of every `<fieldType>`
    declared_types: HashSet<String>,
}

impl Outline {
    fn parse(xml: &str) -> Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut outline = Outline::default();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    match name.as_str() {
                        "field" => {
                            outline
                                .field_types
                                .push(attribute(&e, b"type").unwrap_or_default());
                        }
                        "fieldType" => {
                            if let Some(declared) = attribute(&e, b"name") {
                                outline.declared_types.insert(declared);
                            }
                        }
                        _ => {}
                    }
                    outline.elements.insert(name);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(format!(
                        "XML parse error at position {}: {e}",
                        reader.buffer_position()
                    ))
                }
                _ => {}
            }
        }

        if outline.elements.is_empty() {
            return Err("document has no elements".to_string());
        }
        Ok(outline)
    }
}
